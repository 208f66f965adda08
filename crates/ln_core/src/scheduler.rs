use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::repository::{keys, Repository};
use crate::types::{Article, ScheduledPublish};
use crate::Result;

#[derive(Debug, Clone, PartialEq)]
pub enum ScheduleOutcome {
    /// `publish_at` was not in the future; the article went straight to the published list.
    Published(Article),
    Pending(ScheduledPublish),
}

/// Splits `pending` into `(due, not_due)` at `now`, preserving order.
pub fn partition_due(
    pending: Vec<ScheduledPublish>,
    now: DateTime<Utc>,
) -> (Vec<ScheduledPublish>, Vec<ScheduledPublish>) {
    pending.into_iter().partition(|record| record.is_due(now))
}

/// Appends `article` unless an article with the same id is already published.
fn append_once(published: &mut Vec<Article>, article: &Article) -> bool {
    if published.iter().any(|a| a.id == article.id) {
        return false;
    }
    published.push(article.clone());
    true
}

/// Moves scheduled articles into the published admin stories once due.
///
/// A promotion writes the published list before trimming the pending list.
/// If the second write never happens, the next check finds the article
/// already published and only trims.
#[derive(Clone)]
pub struct Scheduler {
    repo: Repository,
}

impl Scheduler {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    pub async fn schedule(
        &self,
        article: Article,
        publish_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<ScheduleOutcome> {
        if publish_at <= now {
            let mut article = article;
            article.published_at = publish_at;
            self.repo
                .update(keys::ADMIN_STORIES, |published: &mut Vec<Article>| {
                    append_once(published, &article)
                })
                .await?;
            info!("📰 Published '{}' immediately (publish time already passed)", article.title);
            return Ok(ScheduleOutcome::Published(article));
        }

        let record = ScheduledPublish {
            article,
            publish_at,
            scheduled_at: now,
        };
        self.repo
            .update(keys::SCHEDULED, |pending: &mut Vec<ScheduledPublish>| {
                pending.push(record.clone())
            })
            .await?;
        info!("⏰ Scheduled '{}' for {}", record.article.title, publish_at.to_rfc3339());
        Ok(ScheduleOutcome::Pending(record))
    }

    /// Promotes every pending record due at `now` and returns the newly published articles.
    pub async fn check_due(&self, now: DateTime<Utc>) -> Result<Vec<Article>> {
        let (due, _) = partition_due(self.repo.scheduled().await?, now);
        if due.is_empty() {
            return Ok(Vec::new());
        }

        let due_articles: Vec<Article> = due
            .into_iter()
            .map(|record| {
                let mut article = record.article;
                article.published_at = record.publish_at;
                article
            })
            .collect();

        let promoted = self
            .repo
            .update(keys::ADMIN_STORIES, |published: &mut Vec<Article>| {
                due_articles
                    .iter()
                    .filter(|article| append_once(published, article))
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .await?;

        let due_ids: HashSet<&str> = due_articles.iter().map(|a| a.id.as_str()).collect();
        self.repo
            .update(keys::SCHEDULED, |pending: &mut Vec<ScheduledPublish>| {
                pending.retain(|r| !(r.is_due(now) && due_ids.contains(r.article.id.as_str())))
            })
            .await?;

        for article in &promoted {
            info!("📰 Published scheduled article '{}'", article.title);
        }
        Ok(promoted)
    }

    pub async fn list(&self) -> Result<Vec<ScheduledPublish>> {
        let mut pending = self.repo.scheduled().await?;
        pending.sort_by(|a, b| a.publish_at.cmp(&b.publish_at));
        Ok(pending)
    }

    /// Drops the pending record for `id`. Returns false when nothing was scheduled under it.
    pub async fn cancel(&self, id: &str) -> Result<bool> {
        self.repo
            .update(keys::SCHEDULED, |pending: &mut Vec<ScheduledPublish>| {
                let before = pending.len();
                pending.retain(|r| r.article.id != id);
                pending.len() != before
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::repository::test_support::MockStore;
    use chrono::{Duration, TimeZone};

    fn setup() -> (Repository, Scheduler) {
        let repo = Repository::new(Arc::new(MockStore::default()));
        (repo.clone(), Scheduler::new(repo))
    }

    fn article(id: &str) -> Article {
        Article::new(id, format!("Story {}", id), Utc::now())
    }

    #[tokio::test]
    async fn test_past_publish_time_publishes_immediately() {
        let (repo, scheduler) = setup();
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();

        let outcome = scheduler
            .schedule(article("a"), now - Duration::minutes(1), now)
            .await
            .unwrap();

        assert!(matches!(outcome, ScheduleOutcome::Published(_)));
        let stories = repo.admin_stories().await.unwrap();
        assert_eq!(stories.len(), 1);
        assert_eq!(stories[0].id, "a");
        assert!(repo.scheduled().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_future_record_waits_until_due() {
        let (repo, scheduler) = setup();
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
        let publish_at = now + Duration::hours(1);

        scheduler.schedule(article("b"), publish_at, now).await.unwrap();
        assert_eq!(repo.scheduled().await.unwrap().len(), 1);

        let promoted = scheduler.check_due(publish_at - Duration::seconds(1)).await.unwrap();
        assert!(promoted.is_empty());
        assert_eq!(repo.scheduled().await.unwrap().len(), 1);
        assert!(repo.admin_stories().await.unwrap().is_empty());

        let promoted = scheduler.check_due(publish_at).await.unwrap();
        assert_eq!(promoted.len(), 1);
        assert_eq!(promoted[0].published_at, publish_at);
        assert!(repo.scheduled().await.unwrap().is_empty());
        assert_eq!(repo.admin_stories().await.unwrap().len(), 1);

        let promoted = scheduler.check_due(publish_at + Duration::hours(2)).await.unwrap();
        assert!(promoted.is_empty());
        assert_eq!(repo.admin_stories().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_only_due_records_are_promoted() {
        let (repo, scheduler) = setup();
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
        scheduler.schedule(article("soon"), now + Duration::minutes(5), now).await.unwrap();
        scheduler.schedule(article("later"), now + Duration::days(1), now).await.unwrap();

        let promoted = scheduler.check_due(now + Duration::minutes(10)).await.unwrap();
        assert_eq!(promoted.iter().map(|a| a.id.as_str()).collect::<Vec<_>>(), vec!["soon"]);
        let pending = repo.scheduled().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].article.id, "later");
    }

    #[tokio::test]
    async fn test_interrupted_promotion_is_repaired_without_duplicates() {
        let (repo, scheduler) = setup();
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
        scheduler.schedule(article("c"), now + Duration::minutes(1), now).await.unwrap();

        // Simulate a crash after the published write: the article is published
        // but still pending.
        let mut published = article("c");
        published.published_at = now + Duration::minutes(1);
        repo.write(keys::ADMIN_STORIES, &vec![published]).await.unwrap();

        let promoted = scheduler.check_due(now + Duration::minutes(2)).await.unwrap();
        assert!(promoted.is_empty());
        assert_eq!(repo.admin_stories().await.unwrap().len(), 1);
        assert!(repo.scheduled().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancel() {
        let (_, scheduler) = setup();
        let now = Utc::now();
        scheduler.schedule(article("d"), now + Duration::hours(1), now).await.unwrap();
        assert!(scheduler.cancel("d").await.unwrap());
        assert!(!scheduler.cancel("d").await.unwrap());
        assert!(scheduler.list().await.unwrap().is_empty());
    }

    #[test]
    fn test_partition_due_boundary() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
        let record = |id: &str, at| ScheduledPublish {
            article: article(id),
            publish_at: at,
            scheduled_at: now,
        };
        let (due, rest) = partition_due(
            vec![record("exact", now), record("future", now + Duration::seconds(1))],
            now,
        );
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].article.id, "exact");
        assert_eq!(rest[0].article.id, "future");
    }
}
