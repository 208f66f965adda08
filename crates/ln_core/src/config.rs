use std::env;
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = "localnews/0.1 (+https://localhost)";

/// Runtime settings shared by the binary, the web app and the pollers.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub admin_username: String,
    pub admin_password: String,
    /// How often pending scheduled posts are checked.
    pub schedule_check_interval: Duration,
    /// How often the auto-import poller wakes up to look at its settings.
    pub import_tick_interval: Duration,
    pub max_imported: usize,
    pub http_timeout: Duration,
    pub user_agent: String,
    /// CORS relay templates with a `{url}` placeholder, tried in order.
    pub relays: Vec<String>,
    pub classifier: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            admin_username: "admin".to_string(),
            admin_password: "admin123".to_string(),
            schedule_check_interval: Duration::from_secs(60),
            import_tick_interval: Duration::from_secs(60),
            max_imported: 200,
            http_timeout: Duration::from_secs(15),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            relays: Vec::new(),
            classifier: "keyword".to_string(),
        }
    }
}

fn env_string(name: &str) -> Option<String> {
    env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn env_u64(name: &str) -> Option<u64> {
    let raw = env_string(name)?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("Ignoring {}={:?}: not a number", name, raw);
            None
        }
    }
}

impl Config {
    /// Defaults overridden by `LN_*` environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(v) = env_string("LN_ADMIN_USERNAME") {
            config.admin_username = v;
        }
        if let Some(v) = env_string("LN_ADMIN_PASSWORD") {
            config.admin_password = v;
        }
        if let Some(v) = env_u64("LN_SCHEDULE_CHECK_SECS") {
            config.schedule_check_interval = Duration::from_secs(v.max(1));
        }
        if let Some(v) = env_u64("LN_IMPORT_TICK_SECS") {
            config.import_tick_interval = Duration::from_secs(v.max(1));
        }
        if let Some(v) = env_u64("LN_MAX_IMPORTED") {
            config.max_imported = v as usize;
        }
        if let Some(v) = env_u64("LN_HTTP_TIMEOUT_SECS") {
            config.http_timeout = Duration::from_secs(v.max(1));
        }
        if let Some(v) = env_string("LN_USER_AGENT") {
            config.user_agent = v;
        }
        if let Some(v) = env_string("LN_RELAYS") {
            config.relays = parse_relays(&v);
        }
        if let Some(v) = env_string("LN_CLASSIFIER") {
            config.classifier = v;
        }
        config
    }

    pub fn credentials_match(&self, username: &str, password: &str) -> bool {
        self.admin_username == username && self.admin_password == password
    }
}

/// Splits a comma separated relay list, dropping entries without a `{url}` placeholder.
pub fn parse_relays(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .filter(|r| {
            let ok = r.contains("{url}");
            if !ok {
                tracing::warn!("Ignoring relay without {{url}} placeholder: {}", r);
            }
            ok
        })
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_relays() {
        let relays = parse_relays("https://a.example/raw?url={url}, nope ,https://b.example/{url}");
        assert_eq!(
            relays,
            vec![
                "https://a.example/raw?url={url}".to_string(),
                "https://b.example/{url}".to_string()
            ]
        );
    }

    #[test]
    fn test_credentials() {
        let config = Config::default();
        assert!(config.credentials_match("admin", "admin123"));
        assert!(!config.credentials_match("admin", "wrong"));
    }
}
