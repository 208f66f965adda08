use chrono::{DateTime, Utc};
use ln_core::Article;
use scraper::{Html, Selector};
use url::Url;

use super::{jsonld, utils, RawItem, SourceError};
use crate::relay::Fetcher;

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Builds a draft article from a single web page.
///
/// Fields are taken from Open Graph and plain meta tags first, then
/// JSON-LD, then the visible markup (`<h1>`, `<title>`, paragraphs).
/// The result is uncategorized; callers run their classifier on it.
#[derive(Debug, Clone, Default)]
pub struct PageImporter;

impl PageImporter {
    pub fn new() -> Self {
        Self
    }

    pub async fn import(&self, fetcher: &Fetcher, url: &str, now: DateTime<Utc>) -> Result<Article, SourceError> {
        let parsed = utils::parse_url(url)?;
        let body = fetcher.get_text(parsed.as_str()).await?;
        self.parse(&body, &parsed, now)
    }

    pub fn parse(&self, html: &str, url: &Url, now: DateTime<Utc>) -> Result<Article, SourceError> {
        let document = Html::parse_document(html);
        let ld = jsonld::extract(&document);
        let h1 = utils::selector("h1")?;
        let title_tag = utils::selector("title")?;

        let title = utils::meta_content(&document, "meta[property='og:title']")
            .or_else(|| ld.headline.clone())
            .or_else(|| utils::extract_text(&document, &h1))
            .or_else(|| utils::extract_text(&document, &title_tag))
            .ok_or_else(|| SourceError::parse(url.as_str(), "page has no title"))?;

        let paragraphs = self.paragraphs(&document)?;
        let excerpt = utils::meta_content(&document, "meta[property='og:description']")
            .or_else(|| utils::meta_content(&document, "meta[name='description']"))
            .or_else(|| ld.description.clone())
            .or_else(|| paragraphs.first().cloned());
        let image = utils::meta_content(&document, "meta[property='og:image']")
            .or_else(|| utils::meta_content(&document, "meta[name='twitter:image']"))
            .or_else(|| ld.image.clone())
            .and_then(|src| utils::absolutize(url, &src));
        let author = if ld.authors.is_empty() {
            utils::meta_content(&document, "meta[name='author']")
        } else {
            Some(ld.authors.join(", "))
        };
        let date = utils::meta_content(&document, "meta[property='article:published_time']")
            .or_else(|| ld.date_published.clone())
            .or_else(|| {
                let time = utils::selector("time[datetime]").ok()?;
                document
                    .select(&time)
                    .find_map(|e| e.value().attr("datetime").map(str::to_string))
            });
        let body = paragraphs
            .iter()
            .map(|p| format!("<p>{}</p>", escape(p)))
            .collect::<Vec<_>>()
            .join("\n");

        let site = url.host_str().unwrap_or("import").trim_start_matches("www.").to_string();
        let item = RawItem {
            title,
            excerpt,
            body: Some(body),
            image,
            link: Some(url.to_string()),
            date,
            author,
        };
        item.into_article(&site, None, now)
            .ok_or_else(|| SourceError::parse(url.as_str(), "page has no title"))
    }

    /// Paragraph text inside the first `<article>`, or anywhere when there is none.
    fn paragraphs(&self, document: &Html) -> Result<Vec<String>, SourceError> {
        let scoped = utils::selector("article p")?;
        let all = utils::selector("p")?;
        let collect = |selector: &Selector| -> Vec<String> {
            document
                .select(selector)
                .map(|e| utils::element_text(&e))
                .filter(|t| !t.is_empty())
                .collect()
        };
        let inside = collect(&scoped);
        Ok(if inside.is_empty() { collect(&all) } else { inside })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_open_graph_page() {
        let html = r#"
            <html><head>
              <title>Ignored | Site</title>
              <meta property="og:title" content="Schools add late bus routes">
              <meta property="og:description" content="Three new routes start Monday.">
              <meta property="og:image" content="/img/bus.jpg">
              <meta property="article:published_time" content="2024-04-30T07:00:00Z">
              <script type="application/ld+json">{"@type": "NewsArticle", "author": {"name": "Pat Kim"}}</script>
            </head><body>
              <nav><p>Menu</p></nav>
              <article><h1>Schools add late bus routes</h1><p>Students in after-school programs & clubs benefit.</p><p>Routes run until 6pm.</p></article>
            </body></html>
        "#;
        let url = Url::parse("https://www.valleynews.example.com/schools/late-bus").unwrap();
        let article = PageImporter::new().parse(html, &url, now()).unwrap();
        assert_eq!(article.title, "Schools add late bus routes");
        assert_eq!(article.excerpt, "Three new routes start Monday.");
        assert_eq!(article.image_url.as_deref(), Some("https://www.valleynews.example.com/img/bus.jpg"));
        assert_eq!(article.author, "Pat Kim");
        assert_eq!(article.source, "valleynews.example.com");
        assert_eq!(article.url.as_deref(), Some(url.as_str()));
        assert_eq!(article.published_at, Utc.with_ymd_and_hms(2024, 4, 30, 7, 0, 0).unwrap());
        assert_eq!(
            article.body,
            "<p>Students in after-school programs &amp; clubs benefit.</p>\n<p>Routes run until 6pm.</p>"
        );
    }

    #[test]
    fn test_falls_back_to_markup() {
        let html = "<html><body><h1>Park cleanup Saturday</h1><p>Bring gloves.</p></body></html>";
        let url = Url::parse("https://blog.example.org/cleanup").unwrap();
        let article = PageImporter::new().parse(html, &url, now()).unwrap();
        assert_eq!(article.title, "Park cleanup Saturday");
        assert_eq!(article.excerpt, "Bring gloves.");
        assert_eq!(article.published_at, now());
        assert_eq!(article.author, "blog.example.org");
    }

    #[test]
    fn test_page_without_title_fails() {
        let url = Url::parse("https://blog.example.org/empty").unwrap();
        let result = PageImporter::new().parse("<html><body></body></html>", &url, now());
        assert!(matches!(result, Err(SourceError::Parse { .. })));
    }
}
