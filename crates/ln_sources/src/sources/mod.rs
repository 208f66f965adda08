use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ln_core::{dates, slug::slugify, Article};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::relay::Fetcher;

pub mod html;
pub mod json;
pub mod jsonld;
pub mod page;
pub mod rss;

pub use html::{HtmlSource, SelectorSet};
pub use json::JsonSource;
pub use page::PageImporter;
pub use rss::RssSource;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },

    #[error("could not parse {what}: {message}")]
    Parse { what: String, message: String },

    #[error("{0} returned no items")]
    Empty(String),

    #[error("invalid selector '{0}'")]
    Selector(String),

    #[error("invalid source URL: {0}")]
    InvalidUrl(String),
}

impl SourceError {
    /// Network-level failures that may clear up by the next cycle. Everything
    /// else points at a broken source definition or a changed site layout.
    pub fn is_transient(&self) -> bool {
        matches!(self, SourceError::Http { .. } | SourceError::Status { .. })
    }
}

impl SourceError {
    pub(crate) fn parse(what: impl Into<String>, message: impl fmt::Display) -> Self {
        SourceError::Parse {
            what: what.into(),
            message: message.to_string(),
        }
    }
}

impl From<SourceError> for ln_core::Error {
    fn from(e: SourceError) -> Self {
        match e {
            SourceError::InvalidUrl(url) => ln_core::Error::InvalidUrl(url),
            other => ln_core::Error::Source(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Json,
    Html,
    Rss,
}

impl SourceKind {
    pub fn emoji(&self) -> &'static str {
        match self {
            SourceKind::Json => "🧾",
            SourceKind::Html => "🕸️",
            SourceKind::Rss => "📡",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SourceKind::Json => "json",
            SourceKind::Html => "html",
            SourceKind::Rss => "rss",
        };
        f.write_str(s)
    }
}

impl FromStr for SourceKind {
    type Err = ln_core::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(SourceKind::Json),
            "html" => Ok(SourceKind::Html),
            "rss" | "xml" => Ok(SourceKind::Rss),
            other => Err(ln_core::Error::InvalidInput(format!("Unknown source kind: {}", other))),
        }
    }
}

/// One external site that produces articles.
#[async_trait]
pub trait ContentSource: Send + Sync {
    fn name(&self) -> &str;

    fn kind(&self) -> SourceKind;

    /// Address fetched by the default `fetch`.
    fn endpoint(&self) -> &str;

    /// Turns a response body into articles. Items that cannot be read are skipped.
    fn parse(&self, body: &str, now: DateTime<Utc>) -> Result<Vec<Article>, SourceError>;

    async fn fetch(&self, fetcher: &Fetcher) -> Result<Vec<Article>, SourceError> {
        let body = fetcher.get_text(self.endpoint()).await?;
        self.parse(&body, Utc::now())
    }
}

/// Stable id for an imported item: source slug plus a digest of its link (or title).
pub fn source_article_id(source_name: &str, key: &str) -> String {
    let digest = format!("{:x}", Sha256::digest(key.as_bytes()));
    format!("{}-{}", slugify(source_name), &digest[..12])
}

/// Fields pulled out of one feed record before it becomes an [`Article`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawItem {
    pub title: String,
    pub excerpt: Option<String>,
    pub body: Option<String>,
    pub image: Option<String>,
    pub link: Option<String>,
    pub date: Option<String>,
    pub author: Option<String>,
}

impl RawItem {
    /// `None` when the record has no title.
    pub fn into_article(
        self,
        source_name: &str,
        community: Option<&str>,
        now: DateTime<Utc>,
    ) -> Option<Article> {
        let title = utils::clean_text(&self.title);
        if title.is_empty() {
            return None;
        }
        let id = source_article_id(source_name, self.link.as_deref().unwrap_or(&title));
        let published_at = dates::parse_or(self.date.as_deref(), now);
        let mut article = Article::new(id, title, published_at);
        let excerpt = self.excerpt.map(|e| utils::clean_text(&utils::strip_markup(&e)));
        article.body = self
            .body
            .filter(|b| !b.trim().is_empty())
            .or_else(|| excerpt.clone())
            .unwrap_or_default();
        article.excerpt = excerpt.map(|e| utils::truncate(&e, 280)).unwrap_or_default();
        article.image_url = self.image.filter(|i| !i.trim().is_empty());
        article.url = self.link;
        article.author = self
            .author
            .map(|a| utils::clean_text(&a))
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| source_name.to_string());
        article.source = source_name.to_string();
        article.community = community.map(str::to_string);
        Some(article)
    }
}

/// Serialized form of a configured source, as found in a sources file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceDefinition {
    Json {
        name: String,
        url: String,
        #[serde(default)]
        community: Option<String>,
    },
    Html {
        name: String,
        url: String,
        #[serde(default)]
        selectors: Vec<SelectorSet>,
        #[serde(default)]
        community: Option<String>,
    },
    Rss {
        name: String,
        url: String,
        #[serde(default)]
        community: Option<String>,
    },
}

impl SourceDefinition {
    pub fn name(&self) -> &str {
        match self {
            SourceDefinition::Json { name, .. }
            | SourceDefinition::Html { name, .. }
            | SourceDefinition::Rss { name, .. } => name,
        }
    }

    pub fn build(&self) -> Result<Arc<dyn ContentSource>, SourceError> {
        let source: Arc<dyn ContentSource> = match self {
            SourceDefinition::Json { name, url, community } => {
                Arc::new(JsonSource::new(name, utils::parse_url(url)?).with_community(community.clone()))
            }
            SourceDefinition::Html {
                name,
                url,
                selectors,
                community,
            } => {
                let mut source = HtmlSource::new(name, utils::parse_url(url)?);
                if !selectors.is_empty() {
                    source = source.with_selector_sets(selectors.clone());
                }
                Arc::new(source.with_community(community.clone()))
            }
            SourceDefinition::Rss { name, url, community } => {
                Arc::new(RssSource::new(name, utils::parse_url(url)?).with_community(community.clone()))
            }
        };
        Ok(source)
    }
}

/// Reads a JSON array of [`SourceDefinition`]s.
pub fn load_definitions(path: &Path) -> ln_core::Result<Vec<SourceDefinition>> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

pub fn build_sources(definitions: &[SourceDefinition]) -> Result<Vec<Arc<dyn ContentSource>>, SourceError> {
    definitions.iter().map(SourceDefinition::build).collect()
}

/// Common utilities for sources
pub(crate) mod utils {
    use scraper::{ElementRef, Html, Selector};
    use url::Url;

    use super::SourceError;

    pub fn parse_url(url: &str) -> Result<Url, SourceError> {
        let parsed = Url::parse(url).map_err(|e| SourceError::InvalidUrl(format!("{}: {}", url, e)))?;
        match parsed.scheme() {
            "http" | "https" => Ok(parsed),
            other => Err(SourceError::InvalidUrl(format!("unsupported scheme {}", other))),
        }
    }

    pub fn selector(raw: &str) -> Result<Selector, SourceError> {
        Selector::parse(raw).map_err(|_| SourceError::Selector(raw.to_string()))
    }

    /// Collapses whitespace runs to single spaces.
    pub fn clean_text(text: &str) -> String {
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    pub fn element_text(element: &ElementRef) -> String {
        clean_text(&element.text().collect::<String>())
    }

    pub fn extract_text(document: &Html, selector: &Selector) -> Option<String> {
        document
            .select(selector)
            .map(|el| element_text(&el))
            .find(|t| !t.is_empty())
    }

    /// `content` of the first matching `<meta>`.
    pub fn meta_content(document: &Html, raw_selector: &str) -> Option<String> {
        let selector = Selector::parse(raw_selector).ok()?;
        document
            .select(&selector)
            .filter_map(|el| el.value().attr("content"))
            .map(clean_text)
            .find(|c| !c.is_empty())
    }

    pub fn strip_markup(markup: &str) -> String {
        if !markup.contains('<') {
            return markup.to_string();
        }
        let fragment = Html::parse_fragment(markup);
        fragment.root_element().text().collect::<Vec<_>>().join(" ")
    }

    pub fn truncate(text: &str, max_chars: usize) -> String {
        if text.chars().count() <= max_chars {
            return text.to_string();
        }
        let cut: String = text.chars().take(max_chars).collect();
        match cut.rfind(' ') {
            Some(i) if i > 0 => format!("{}…", &cut[..i]),
            _ => format!("{}…", cut),
        }
    }

    /// Resolves `href` against `base`; absolute links pass through.
    pub fn absolutize(base: &Url, href: &str) -> Option<String> {
        let href = href.trim();
        if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
            return None;
        }
        base.join(href).ok().map(String::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use scraper::Html;

    #[test]
    fn test_parse_url() {
        assert!(utils::parse_url("https://example.com").is_ok());
        assert!(utils::parse_url("invalid-url").is_err());
        assert!(utils::parse_url("ftp://example.com/feed").is_err());
    }

    #[test]
    fn test_extract_text() {
        let html = r#"
            <div class="title">  Test
              Title </div>
            <div class="content">Test Content</div>
        "#;
        let document = Html::parse_document(html);
        let title = utils::selector(".title").unwrap();
        let missing = utils::selector(".invalid").unwrap();
        assert_eq!(utils::extract_text(&document, &title).unwrap(), "Test Title");
        assert!(utils::extract_text(&document, &missing).is_none());
        assert!(utils::selector("div[").is_err());
    }

    #[test]
    fn test_truncate_and_strip() {
        assert_eq!(utils::truncate("one two three", 8), "one two…");
        assert_eq!(utils::truncate("short", 8), "short");
        assert_eq!(utils::clean_text(&utils::strip_markup("<p>Hello <b>there</b></p>")), "Hello there");
    }

    #[test]
    fn test_only_network_failures_are_transient() {
        let status = SourceError::Status {
            url: "https://news.example.com".to_string(),
            status: 503,
        };
        assert!(status.is_transient());
        assert!(!SourceError::Empty("city-desk".to_string()).is_transient());
        assert!(!SourceError::Selector("div[".to_string()).is_transient());
        assert!(!SourceError::Parse {
            what: "feed".to_string(),
            message: "eof".to_string(),
        }
        .is_transient());
    }

    #[test]
    fn test_source_article_id_is_stable() {
        let a = source_article_id("City Desk", "https://news.example.com/a");
        let b = source_article_id("City Desk", "https://news.example.com/a");
        let c = source_article_id("City Desk", "https://news.example.com/b");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("city-desk-"));
        assert_eq!(a.len(), "city-desk-".len() + 12);
    }

    #[test]
    fn test_raw_item_defaults() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let item = RawItem {
            title: "  Bridge   reopens ".to_string(),
            excerpt: Some("<p>Traffic returns.</p>".to_string()),
            date: Some("not a date".to_string()),
            ..Default::default()
        };
        let article = item.into_article("City Desk", Some("Riverside"), now).unwrap();
        assert_eq!(article.title, "Bridge reopens");
        assert_eq!(article.slug, "bridge-reopens");
        assert_eq!(article.excerpt, "Traffic returns.");
        assert_eq!(article.body, "Traffic returns.");
        assert_eq!(article.published_at, now);
        assert_eq!(article.author, "City Desk");
        assert_eq!(article.community.as_deref(), Some("Riverside"));

        let untitled = RawItem::default();
        assert!(untitled.into_article("City Desk", None, now).is_none());
    }

    #[test]
    fn test_definitions_deserialize_and_build() {
        let raw = r#"[
            {"kind": "json", "name": "City Desk", "url": "https://news.example.com/api/articles"},
            {"kind": "rss", "name": "Riverside Gazette", "url": "https://gazette.example.com/feed.xml", "community": "Riverside"},
            {"kind": "html", "name": "Northgate Notes", "url": "https://northgate.example.com/",
             "selectors": [{"item": ".post", "title": "h2"}]}
        ]"#;
        let definitions: Vec<SourceDefinition> = serde_json::from_str(raw).unwrap();
        assert_eq!(definitions.len(), 3);
        let sources = build_sources(&definitions).unwrap();
        let kinds: Vec<SourceKind> = sources.iter().map(|s| s.kind()).collect();
        assert_eq!(kinds, vec![SourceKind::Json, SourceKind::Rss, SourceKind::Html]);
        assert_eq!(sources[1].name(), "Riverside Gazette");

        let bad = SourceDefinition::Json {
            name: "Broken".to_string(),
            url: "not a url".to_string(),
            community: None,
        };
        assert!(matches!(bad.build(), Err(SourceError::InvalidUrl(_))));
    }

    #[test]
    fn test_load_definitions_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sources.json");
        std::fs::write(
            &path,
            r#"[{"kind": "rss", "name": "Gazette", "url": "https://gazette.example.com/feed.xml"}]"#,
        )
        .unwrap();
        let definitions = load_definitions(&path).unwrap();
        assert_eq!(definitions[0].name(), "Gazette");
    }
}
