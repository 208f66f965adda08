use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use ln_core::Article;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use url::Url;

use super::{utils, ContentSource, RawItem, SourceError, SourceKind};

/// CSS selectors describing one listing layout. All but `item` and
/// `title` are looked up inside each matched item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorSet {
    pub item: String,
    pub title: String,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

impl SelectorSet {
    pub fn new(item: &str, title: &str) -> Self {
        Self {
            item: item.to_string(),
            title: title.to_string(),
            link: None,
            excerpt: None,
            image: None,
            date: None,
        }
    }

    pub fn link(mut self, selector: &str) -> Self {
        self.link = Some(selector.to_string());
        self
    }

    pub fn excerpt(mut self, selector: &str) -> Self {
        self.excerpt = Some(selector.to_string());
        self
    }

    pub fn image(mut self, selector: &str) -> Self {
        self.image = Some(selector.to_string());
        self
    }

    pub fn date(mut self, selector: &str) -> Self {
        self.date = Some(selector.to_string());
        self
    }
}

lazy_static! {
    /// Tried in order until one of them finds items.
    pub static ref DEFAULT_SELECTOR_SETS: Vec<SelectorSet> = vec![
        SelectorSet::new("article", "h1, h2, h3")
            .link("a[href]")
            .excerpt("p")
            .image("img")
            .date("time"),
        SelectorSet::new(".story, .news-item, .post, .entry", ".headline, .title, h2, h3, a")
            .link("a[href]")
            .excerpt(".summary, .excerpt, p")
            .image("img")
            .date("time, .date"),
        SelectorSet::new(".card, li.item", "a")
            .link("a[href]")
            .excerpt("p")
            .image("img"),
    ];
}

struct CompiledSet {
    item: Selector,
    title: Selector,
    link: Option<Selector>,
    excerpt: Option<Selector>,
    image: Option<Selector>,
    date: Option<Selector>,
}

impl CompiledSet {
    fn compile(set: &SelectorSet) -> Result<Self, SourceError> {
        let optional = |raw: &Option<String>| raw.as_deref().map(utils::selector).transpose();
        Ok(Self {
            item: utils::selector(&set.item)?,
            title: utils::selector(&set.title)?,
            link: optional(&set.link)?,
            excerpt: optional(&set.excerpt)?,
            image: optional(&set.image)?,
            date: optional(&set.date)?,
        })
    }
}

fn first_text(element: &ElementRef, selector: &Selector) -> Option<String> {
    element
        .select(selector)
        .map(|e| utils::element_text(&e))
        .find(|t| !t.is_empty())
}

/// A plain HTML listing page scraped with CSS selectors.
#[derive(Debug, Clone)]
pub struct HtmlSource {
    name: String,
    url: Url,
    selector_sets: Vec<SelectorSet>,
    community: Option<String>,
}

impl HtmlSource {
    pub fn new(name: impl Into<String>, url: Url) -> Self {
        Self {
            name: name.into(),
            url,
            selector_sets: DEFAULT_SELECTOR_SETS.clone(),
            community: None,
        }
    }

    pub fn with_selector_sets(mut self, sets: Vec<SelectorSet>) -> Self {
        self.selector_sets = sets;
        self
    }

    pub fn with_community(mut self, community: Option<String>) -> Self {
        self.community = community;
        self
    }

    fn extract(&self, document: &Html, set: &CompiledSet) -> Vec<RawItem> {
        document
            .select(&set.item)
            .filter_map(|element| {
                let title = first_text(&element, &set.title)?;
                let href = set
                    .link
                    .as_ref()
                    .and_then(|s| element.select(s).find_map(|e| e.value().attr("href")))
                    .or_else(|| element.value().attr("href"));
                let image = set.image.as_ref().and_then(|s| {
                    element
                        .select(s)
                        .find_map(|e| e.value().attr("src").or_else(|| e.value().attr("data-src")))
                });
                let date = set.date.as_ref().and_then(|s| {
                    element.select(s).find_map(|e| {
                        e.value()
                            .attr("datetime")
                            .map(str::to_string)
                            .or_else(|| Some(utils::element_text(&e)))
                    })
                });
                Some(RawItem {
                    title,
                    excerpt: set.excerpt.as_ref().and_then(|s| first_text(&element, s)),
                    body: None,
                    image: image.and_then(|src| utils::absolutize(&self.url, src)),
                    link: href.and_then(|h| utils::absolutize(&self.url, h)),
                    date,
                    author: None,
                })
            })
            .collect()
    }
}

#[async_trait]
impl ContentSource for HtmlSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Html
    }

    fn endpoint(&self) -> &str {
        self.url.as_str()
    }

    fn parse(&self, body: &str, now: DateTime<Utc>) -> Result<Vec<Article>, SourceError> {
        let document = Html::parse_document(body);
        for (i, set) in self.selector_sets.iter().enumerate() {
            let compiled = CompiledSet::compile(set)?;
            let items = self.extract(&document, &compiled);
            if items.is_empty() {
                tracing::debug!("{}: selector set {} found nothing", self.name, i);
                continue;
            }
            return Ok(items
                .into_iter()
                .filter_map(|item| item.into_article(&self.name, self.community.as_deref(), now))
                .collect());
        }
        Err(SourceError::Empty(self.name.clone()))
    }
}
