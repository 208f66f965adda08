use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ln_core::Article;
use serde_json::Value;
use url::Url;

use super::{utils, ContentSource, RawItem, SourceError, SourceKind};

/// Keys under which a JSON API commonly nests its article list.
pub const RECORD_KEYS: &[&str] = &["articles", "items", "data", "results", "posts", "stories"];

const TITLE_FIELDS: &[&str] = &["title", "headline", "name"];
const EXCERPT_FIELDS: &[&str] = &["excerpt", "description", "summary", "abstract"];
const BODY_FIELDS: &[&str] = &["body", "content", "text", "description"];
const IMAGE_FIELDS: &[&str] = &["image", "imageUrl", "image_url", "urlToImage", "thumbnail", "enclosure"];
const DATE_FIELDS: &[&str] = &["publishedAt", "published_at", "pubDate", "date", "datePublished", "created_at"];
const LINK_FIELDS: &[&str] = &["url", "link", "href"];
const AUTHOR_FIELDS: &[&str] = &["author", "byline", "source.name", "source"];

/// A JSON endpoint returning a list of article-like records.
///
/// Field names vary wildly between APIs, so every article field is looked
/// up through a list of common spellings and the first non-empty one wins.
#[derive(Debug, Clone)]
pub struct JsonSource {
    name: String,
    url: Url,
    community: Option<String>,
}

impl JsonSource {
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

    fn item(&self, record: &Value) -> RawItem {
        RawItem {
            title: first_text(record, TITLE_FIELDS).unwrap_or_default(),
            excerpt: first_text(record, EXCERPT_FIELDS),
            body: first_text(record, BODY_FIELDS),
            image: first_text(record, IMAGE_FIELDS),
            link: first_text(record, LINK_FIELDS).and_then(|l| utils::absolutize(&self.url, &l)),
            date: first_text(record, DATE_FIELDS),
            author: first_text(record, AUTHOR_FIELDS),
        }
    }
}

/// Follows a dotted path such as `source.name`.
fn lookup<'a>(record: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(record, |value, key| value.get(key))
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        // {"url": ...} for images, {"name": ...} for authors
        Value::Object(map) => ["url", "href", "name"]
            .iter()
            .find_map(|k| map.get(*k))
            .and_then(text_of),
        Value::Array(items) => items.iter().find_map(text_of),
        _ => None,
    }
    .filter(|s| !s.is_empty())
}

fn first_text(record: &Value, fields: &[&str]) -> Option<String> {
    fields
        .iter()
        .find_map(|field| lookup(record, field).and_then(text_of))
}

/// The article list: the root array or the first known key holding one.
pub fn records(root: &Value) -> Option<&Vec<Value>> {
    if let Some(list) = root.as_array() {
        return Some(list);
    }
    RECORD_KEYS
        .iter()
        .find_map(|key| root.get(*key).and_then(Value::as_array))
}

#[async_trait]
impl ContentSource for JsonSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Json
    }

    fn endpoint(&self) -> &str {
        self.url.as_str()
    }

    fn parse(&self, body: &str, now: DateTime<Utc>) -> Result<Vec<Article>, SourceError> {
        let root: Value = serde_json::from_str(body).map_err(|e| SourceError::parse(&self.name, e))?;
        let list = records(&root).ok_or_else(|| SourceError::parse(&self.name, "no article list in response"))?;
        Ok(list
            .iter()
            .filter(|record| record.is_object())
            .filter_map(|record| {
                self.item(record)
                    .into_article(&self.name, self.community.as_deref(), now)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn source() -> JsonSource {
        JsonSource::new("City Desk", Url::parse("https://news.example.com/api/").unwrap())
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_newsapi_style_payload() {
        let body = json!({
            "status": "ok",
            "articles": [{
                "title": "Council approves new bike lanes",
                "description": "Work begins next month on Main Street.",
                "content": "<p>The council voted 5-2.</p>",
                "urlToImage": "https://cdn.example.com/bike.jpg",
                "publishedAt": "2024-04-30T09:15:00Z",
                "url": "https://news.example.com/bike-lanes",
                "source": {"id": null, "name": "City Desk Wire"}
            }]
        })
        .to_string();
        let articles = source().parse(&body, now()).unwrap();
        assert_eq!(articles.len(), 1);
        let article = &articles[0];
        assert_eq!(article.title, "Council approves new bike lanes");
        assert_eq!(article.excerpt, "Work begins next month on Main Street.");
        assert_eq!(article.body, "<p>The council voted 5-2.</p>");
        assert_eq!(article.image_url.as_deref(), Some("https://cdn.example.com/bike.jpg"));
        assert_eq!(article.url.as_deref(), Some("https://news.example.com/bike-lanes"));
        assert_eq!(article.author, "City Desk Wire");
        assert_eq!(article.source, "City Desk");
        assert_eq!(
            article.published_at,
            Utc.with_ymd_and_hms(2024, 4, 30, 9, 15, 0).unwrap()
        );
    }

    #[test]
    fn test_root_array_with_alternate_spellings() {
        let body = json!([
            {"headline": "Library extends hours", "summary": "Open late on Fridays.",
             "image": {"url": "https://cdn.example.com/lib.jpg"}, "link": "/library",
             "byline": "Dana Reyes", "date": "2024-04-29"},
            {"name": "Farmers market returns", "pubDate": "garbage"},
            {"description": "no title here"},
            "not an object"
        ])
        .to_string();
        let articles = source().parse(&body, now()).unwrap();
        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].image_url.as_deref(), Some("https://cdn.example.com/lib.jpg"));
        assert_eq!(articles[0].url.as_deref(), Some("https://news.example.com/library"));
        assert_eq!(articles[0].author, "Dana Reyes");
        assert_eq!(articles[1].title, "Farmers market returns");
        assert_eq!(articles[1].published_at, now());
        assert_eq!(articles[1].author, "City Desk");
    }

    #[test]
    fn test_nested_under_data_key() {
        let body = r#"{"data": [{"title": "Road closure on Elm"}]}"#;
        assert_eq!(source().parse(body, now()).unwrap().len(), 1);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            source().parse("<html>", now()),
            Err(SourceError::Parse { .. })
        ));
        assert!(matches!(
            source().parse(r#"{"meta": {}}"#, now()),
            Err(SourceError::Parse { .. })
        ));
    }
}
