use std::time::Duration;

use ln_core::config::Config;
use reqwest::Client;
use tracing::{debug, warn};
use url::form_urlencoded::byte_serialize;

use crate::sources::SourceError;

/// Placeholder replaced by the URL-encoded target in a relay template.
pub const URL_PLACEHOLDER: &str = "{url}";

/// HTTP GET helper shared by every source.
///
/// With relays configured, the target is wrapped into each relay template
/// in turn and the first successful response wins. Without relays the
/// target is fetched directly.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    relays: Vec<String>,
}

impl Fetcher {
    pub fn new(config: &Config) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(config.http_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| SourceError::Http {
                url: String::new(),
                source: e,
            })?;
        Ok(Self {
            client,
            relays: config.relays.clone(),
        })
    }

    /// Direct fetcher with reqwest defaults and a fixed timeout.
    pub fn direct() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_default();
        Self {
            client,
            relays: Vec::new(),
        }
    }

    pub fn with_relays(mut self, relays: Vec<String>) -> Self {
        self.relays = relays;
        self
    }

    pub fn relays(&self) -> &[String] {
        &self.relays
    }

    /// URLs tried for `target`, in order.
    pub fn candidates(&self, target: &str) -> Vec<String> {
        if self.relays.is_empty() {
            return vec![target.to_string()];
        }
        let encoded: String = byte_serialize(target.as_bytes()).collect();
        self.relays
            .iter()
            .map(|template| {
                if template.contains(URL_PLACEHOLDER) {
                    template.replace(URL_PLACEHOLDER, &encoded)
                } else {
                    format!("{}{}", template, encoded)
                }
            })
            .collect()
    }

    async fn get_once(&self, url: &str) -> Result<String, SourceError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SourceError::Http {
                url: url.to_string(),
                source: e,
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        response.text().await.map_err(|e| SourceError::Http {
            url: url.to_string(),
            source: e,
        })
    }

    pub async fn get_text(&self, target: &str) -> Result<String, SourceError> {
        let mut last_error = None;
        for candidate in self.candidates(target) {
            debug!("🌐 GET {}", candidate);
            match self.get_once(&candidate).await {
                Ok(body) => return Ok(body),
                Err(e) => {
                    if !self.relays.is_empty() {
                        warn!("Relay attempt failed for {}: {}", target, e);
                    }
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| SourceError::Empty(target.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_fetch_has_single_candidate() {
        let fetcher = Fetcher::direct();
        assert_eq!(
            fetcher.candidates("https://news.example.com/feed"),
            vec!["https://news.example.com/feed".to_string()]
        );
    }

    #[test]
    fn test_relays_are_tried_in_order_with_encoded_target() {
        let fetcher = Fetcher::direct().with_relays(vec![
            "https://relay-one.example/raw?url={url}".to_string(),
            "https://relay-two.example/".to_string(),
        ]);
        let candidates = fetcher.candidates("https://news.example.com/a?b=1");
        assert_eq!(
            candidates,
            vec![
                "https://relay-one.example/raw?url=https%3A%2F%2Fnews.example.com%2Fa%3Fb%3D1".to_string(),
                "https://relay-two.example/https%3A%2F%2Fnews.example.com%2Fa%3Fb%3D1".to_string(),
            ]
        );
    }

    #[test]
    fn test_fetcher_from_config() {
        let mut config = Config::default();
        config.relays = vec!["https://relay.example/?{url}".to_string()];
        let fetcher = Fetcher::new(&config).unwrap();
        assert_eq!(fetcher.relays().len(), 1);
    }
}
