use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use ln_core::repository::keys;
use ln_core::{Article, Classifier, Repository, Result};
use serde::Serialize;
use tracing::info;

use crate::logging::Logger;
use crate::relay::Fetcher;
use crate::sources::{ContentSource, JsonSource, PageImporter, RssSource, SourceError};

pub const DEFAULT_MAX_IMPORTED: usize = 200;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceFailure {
    pub source: String,
    pub error: String,
}

/// Result of fetching every source once.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    pub articles: Vec<Article>,
    pub failures: Vec<SourceFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub fetched: usize,
    pub stored: usize,
    pub failures: Vec<SourceFailure>,
    pub finished_at: DateTime<Utc>,
}

/// Newest first. The sort is stable, so equal timestamps keep their input order.
pub fn sort_newest_first(articles: &mut [Article]) {
    articles.sort_by(|a, b| b.published_at.cmp(&a.published_at));
}

/// Merges a fresh fetch into the stored imported list.
///
/// Stored items whose id appears in `fresh` are replaced. The result is
/// sorted newest first and cut to `cap`.
pub fn merge_imported(existing: Vec<Article>, fresh: &[Article], cap: usize) -> Vec<Article> {
    let fresh_ids: HashSet<&str> = fresh.iter().map(|a| a.id.as_str()).collect();
    let mut merged: Vec<Article> = fresh.to_vec();
    merged.extend(existing.into_iter().filter(|a| !fresh_ids.contains(a.id.as_str())));
    sort_newest_first(&mut merged);
    merged.truncate(cap);
    merged
}

/// Fetches the configured sources, tags each item and stores the result.
#[derive(Clone)]
pub struct Ingestor {
    sources: Vec<Arc<dyn ContentSource>>,
    classifier: Arc<dyn Classifier>,
    fetcher: Fetcher,
    repo: Repository,
    max_imported: usize,
}

impl Ingestor {
    pub fn new(repo: Repository, classifier: Arc<dyn Classifier>, fetcher: Fetcher) -> Self {
        Self {
            sources: Vec::new(),
            classifier,
            fetcher,
            repo,
            max_imported: DEFAULT_MAX_IMPORTED,
        }
    }

    pub fn with_sources(mut self, sources: Vec<Arc<dyn ContentSource>>) -> Self {
        self.sources = sources;
        self
    }

    pub fn with_max_imported(mut self, max_imported: usize) -> Self {
        self.max_imported = max_imported.max(1);
        self
    }

    pub fn add_source(&mut self, source: Arc<dyn ContentSource>) {
        self.sources.push(source);
    }

    pub fn sources(&self) -> &[Arc<dyn ContentSource>] {
        &self.sources
    }

    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    pub fn repo(&self) -> &Repository {
        &self.repo
    }

    pub fn classifier(&self) -> &Arc<dyn Classifier> {
        &self.classifier
    }

    /// Re-tags articles from their title and excerpt, ignoring any category they came with.
    pub fn classify_all(&self, articles: &mut [Article]) {
        for article in articles.iter_mut() {
            article.category = self.classifier.classify(&article.classification_text());
        }
    }

    fn logger(source: &dyn ContentSource) -> Logger {
        Logger::new()
            .with_prefix(source.kind().emoji())
            .with_prefix(source.name())
    }

    /// Fetches every source concurrently.
    ///
    /// A failing source is logged and skipped for this cycle. The surviving
    /// results are concatenated in source order and sorted newest first.
    /// Items are not de-duplicated across sources.
    pub async fn fetch_all(&self) -> IngestReport {
        let fetches = self.sources.iter().map(|source| {
            let fetcher = &self.fetcher;
            async move { (source, source.fetch(fetcher).await) }
        });

        let mut report = IngestReport::default();
        for (source, result) in join_all(fetches).await {
            let logger = Self::logger(source.as_ref());
            match result {
                Ok(mut articles) => {
                    logger.info(&format!("fetched {} items", articles.len()));
                    for article in &articles {
                        logger.debug(&format!("• {}", article.title));
                    }
                    report.articles.append(&mut articles);
                }
                Err(e) => {
                    if e.is_transient() {
                        logger.warn(&format!("fetch failed: {}", e));
                    } else {
                        logger.error(&format!("source is broken: {}", e));
                    }
                    report.failures.push(SourceFailure {
                        source: source.name().to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }
        self.classify_all(&mut report.articles);
        sort_newest_first(&mut report.articles);
        report
    }

    /// One import cycle: fetch everything, merge into storage, stamp `last_fetched`.
    pub async fn run_cycle(&self, now: DateTime<Utc>) -> Result<CycleReport> {
        let report = self.fetch_all().await;
        let cap = self.max_imported;
        let fresh = &report.articles;
        let stored = self
            .repo
            .update(keys::IMPORTED, |existing: &mut Vec<Article>| {
                *existing = merge_imported(std::mem::take(existing), fresh, cap);
                existing.len()
            })
            .await?;
        self.repo.set_last_fetched(now).await?;
        info!(
            "📥 Import cycle done: {} fetched, {} stored, {} sources failed",
            report.articles.len(),
            stored,
            report.failures.len()
        );
        Ok(CycleReport {
            fetched: report.articles.len(),
            stored,
            failures: report.failures,
            finished_at: now,
        })
    }

    /// Fetches a single configured source by name.
    pub async fn fetch_source(&self, name: &str) -> Result<Vec<Article>> {
        let source = self
            .sources
            .iter()
            .find(|s| s.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| ln_core::Error::NotFound(format!("source '{}'", name)))?;
        let mut articles = source.fetch(&self.fetcher).await?;
        self.classify_all(&mut articles);
        sort_newest_first(&mut articles);
        Ok(articles)
    }

    /// Fetches an ad-hoc feed URL, JSON or RSS, without storing anything.
    pub async fn preview_feed(&self, url: &str, now: DateTime<Utc>) -> Result<Vec<Article>> {
        let parsed = crate::sources::utils::parse_url(url)?;
        let body = self.fetcher.get_text(parsed.as_str()).await?;
        let name = parsed.host_str().unwrap_or("feed").trim_start_matches("www.").to_string();
        let mut articles = parse_feed_body(&name, parsed, &body, now)?;
        self.classify_all(&mut articles);
        sort_newest_first(&mut articles);
        Ok(articles)
    }

    /// Builds a classified draft from a single page.
    pub async fn import_page(&self, url: &str, now: DateTime<Utc>) -> Result<Article> {
        let mut article = PageImporter::new().import(&self.fetcher, url, now).await?;
        self.classify_all(std::slice::from_mut(&mut article));
        Ok(article)
    }
}

/// Picks the parser by sniffing the body: JSON when it opens with `{` or `[`, RSS otherwise.
pub fn parse_feed_body(
    name: &str,
    url: url::Url,
    body: &str,
    now: DateTime<Utc>,
) -> std::result::Result<Vec<Article>, SourceError> {
    let trimmed = body.trim_start();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        JsonSource::new(name, url).parse(body, now)
    } else {
        RssSource::new(name, url).parse(body, now)
    }
}
