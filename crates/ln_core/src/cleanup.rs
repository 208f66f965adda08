use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::info;

use crate::repository::{keys, Repository};
use crate::types::Article;
use crate::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CleanupReport {
    pub cutoff: Option<DateTime<Utc>>,
    pub admin_removed: usize,
    pub imported_removed: usize,
}

impl CleanupReport {
    pub fn total(&self) -> usize {
        self.admin_removed + self.imported_removed
    }
}

/// `now` minus the given number of days. Spans reaching past the earliest
/// representable date are rejected.
pub fn cutoff(now: DateTime<Utc>, older_than_days: u32) -> Result<DateTime<Utc>> {
    Duration::try_days(i64::from(older_than_days))
        .and_then(|span| now.checked_sub_signed(span))
        .ok_or_else(|| {
            Error::InvalidInput(format!("{} days reaches past the earliest supported date", older_than_days))
        })
}

/// Drops articles published strictly before `cutoff`; returns how many were dropped.
pub fn retain_since(items: &mut Vec<Article>, cutoff: DateTime<Utc>) -> usize {
    let before = items.len();
    items.retain(|a| a.published_at >= cutoff);
    before - items.len()
}

/// Removes stale admin stories and imported articles. Removal is permanent.
pub async fn cleanup_stored(repo: &Repository, cutoff: DateTime<Utc>) -> Result<CleanupReport> {
    let admin_removed = repo
        .update(keys::ADMIN_STORIES, |items: &mut Vec<Article>| retain_since(items, cutoff))
        .await?;
    let imported_removed = repo
        .update(keys::IMPORTED, |items: &mut Vec<Article>| retain_since(items, cutoff))
        .await?;
    let report = CleanupReport {
        cutoff: Some(cutoff),
        admin_removed,
        imported_removed,
    };
    info!(
        "🧹 Cleanup before {} removed {} articles",
        cutoff.to_rfc3339(),
        report.total()
    );
    Ok(report)
}
