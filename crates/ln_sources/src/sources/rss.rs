use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ln_core::Article;
use url::Url;

use super::{utils, ContentSource, RawItem, SourceError, SourceKind};

/// An RSS 2.0 feed.
#[derive(Debug, Clone)]
pub struct RssSource {
    name: String,
    url: Url,
    community: Option<String>,
}

impl RssSource {
    pub fn new(name: impl Into<String>, url: Url) -> Self {
        Self {
            name: name.into(),
            url,
            community: None,
        }
    }

    pub fn with_community(mut self, community: Option<String>) -> Self {
        self.community = community;
        self
    }
}

fn raw_item(item: &rss::Item) -> RawItem {
    let author = item.author().map(str::to_string).or_else(|| {
        item.dublin_core_ext()
            .and_then(|dc| dc.creators().first().cloned())
    });
    let image = item
        .enclosure()
        .filter(|e| e.mime_type().starts_with("image/"))
        .map(|e| e.url().to_string());
    RawItem {
        title: item.title().unwrap_or_default().to_string(),
        excerpt: item.description().map(str::to_string),
        body: item.content().map(str::to_string),
        image,
        link: item.link().map(str::to_string),
        date: item.pub_date().map(str::to_string),
        author,
    }
}

#[async_trait]
impl ContentSource for RssSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Rss
    }

    fn endpoint(&self) -> &str {
        self.url.as_str()
    }

    fn parse(&self, body: &str, now: DateTime<Utc>) -> Result<Vec<Article>, SourceError> {
        let channel = rss::Channel::read_from(body.as_bytes()).map_err(|e| SourceError::parse(&self.name, e))?;
        Ok(channel
            .items()
            .iter()
            .filter_map(|item| {
                let mut raw = raw_item(item);
                raw.link = raw.link.and_then(|l| utils::absolutize(&self.url, &l));
                raw.into_article(&self.name, self.community.as_deref(), now)
            })
            .collect())
    }
}
