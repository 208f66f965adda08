use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use ln_core::scheduler::Scheduler;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::manager::Ingestor;

/// Owns the periodic jobs of a running site.
///
/// Each job is a tokio task ticking on its own interval. `stop` flips a
/// shared watch flag; a job that is mid-cycle is dropped at its next
/// await point rather than run to completion.
pub struct BackgroundTasks {
    shutdown: watch::Sender<bool>,
    handles: Vec<(String, JoinHandle<()>)>,
}

impl Default for BackgroundTasks {
    fn default() -> Self {
        Self::new()
    }
}

impl BackgroundTasks {
    pub fn new() -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            shutdown,
            handles: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.handles.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Runs `job` every `period`, starting immediately.
    pub fn spawn_periodic<F, Fut>(&mut self, name: &str, period: Duration, job: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut shutdown = self.shutdown.subscribe();
        let task_name = name.to_string();
        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                if *shutdown.borrow() {
                    break;
                }
                tokio::select! {
                    _ = shutdown.changed() => break,
                    _ = ticker.tick() => {}
                }
                debug!("⏱️ {} tick", task_name);
                tokio::select! {
                    _ = shutdown.changed() => {
                        info!("🛑 {} cancelled mid-cycle", task_name);
                        break;
                    }
                    _ = job() => {}
                }
            }
            debug!("{} stopped", task_name);
        });
        info!("▶️ Started {} every {:?}", name, period);
        self.handles.push((name.to_string(), handle));
    }

    /// Promotes due scheduled articles every `period`.
    pub fn start_scheduler(&mut self, scheduler: Scheduler, period: Duration) {
        self.spawn_periodic("schedule-check", period, move || {
            let scheduler = scheduler.clone();
            async move {
                match scheduler.check_due(Utc::now()).await {
                    Ok(published) if !published.is_empty() => {
                        info!("🗓️ Published {} scheduled articles", published.len())
                    }
                    Ok(_) => {}
                    Err(e) => error!("Scheduled publish check failed: {}", e),
                }
            }
        });
    }

    /// Checks the stored auto-import settings every `tick` and runs an
    /// import cycle when enabled and due.
    pub fn start_auto_import(&mut self, ingestor: Arc<Ingestor>, tick: Duration) {
        self.spawn_periodic("auto-import", tick, move || {
            let ingestor = ingestor.clone();
            async move {
                let now = Utc::now();
                let settings = match ingestor.repo().auto_import_settings().await {
                    Ok(settings) => settings,
                    Err(e) => {
                        warn!("Could not read auto-import settings: {}", e);
                        return;
                    }
                };
                if !settings.is_due(now) {
                    return;
                }
                if let Err(e) = ingestor.run_cycle(now).await {
                    error!("Auto-import cycle failed: {}", e);
                }
            }
        });
    }

    /// Signals every job and waits for them to exit.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        for (name, handle) in self.handles {
            if let Err(e) = handle.await {
                error!("Background task {} ended abnormally: {}", name, e);
            }
        }
        info!("🛑 Background tasks stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::Fetcher;
    use crate::sources::{ContentSource, SourceError, SourceKind};
    use async_trait::async_trait;
    use chrono::{DateTime, Duration as ChronoDuration};
    use ln_core::{Article, Repository};
    use ln_inference::KeywordClassifier;
    use ln_storage::backends::memory::MemoryStorage;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn repo() -> Repository {
        Repository::new(Arc::new(MemoryStorage::new()))
    }

    #[tokio::test]
    async fn test_periodic_job_runs_until_stopped() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut tasks = BackgroundTasks::new();
        let seen = counter.clone();
        tasks.spawn_periodic("counter", Duration::from_millis(10), move || {
            let seen = seen.clone();
            async move {
                seen.fetch_add(1, Ordering::SeqCst);
            }
        });
        assert_eq!(tasks.names(), vec!["counter"]);

        tokio::time::sleep(Duration::from_millis(60)).await;
        tasks.stop().await;
        let after_stop = counter.load(Ordering::SeqCst);
        assert!(after_stop >= 2, "ran {} times", after_stop);

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(counter.load(Ordering::SeqCst), after_stop);
    }

    #[tokio::test]
    async fn test_stop_cancels_in_flight_cycle() {
        let finished = Arc::new(AtomicUsize::new(0));
        let mut tasks = BackgroundTasks::new();
        let done = finished.clone();
        tasks.spawn_periodic("slow", Duration::from_millis(5), move || {
            let done = done.clone();
            async move {
                tokio::time::sleep(Duration::from_secs(30)).await;
                done.fetch_add(1, Ordering::SeqCst);
            }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        let stopped = tokio::time::timeout(Duration::from_secs(2), tasks.stop()).await;
        assert!(stopped.is_ok(), "stop waited for the slow cycle");
        assert_eq!(finished.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_scheduler_job_publishes_due_articles() {
        let repo = repo();
        let scheduler = Scheduler::new(repo.clone());
        let now = Utc::now();
        scheduler
            .schedule(
                Article::new("later", "Parade route announced", now),
                now + ChronoDuration::milliseconds(50),
                now,
            )
            .await
            .unwrap();

        let mut tasks = BackgroundTasks::new();
        tasks.start_scheduler(scheduler.clone(), Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(200)).await;
        tasks.stop().await;

        let published = repo.admin_stories().await.unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].id, "later");
        assert!(scheduler.list().await.unwrap().is_empty());
    }

    struct StaticSource;

    #[async_trait]
    impl ContentSource for StaticSource {
        fn name(&self) -> &str {
            "static"
        }

        fn kind(&self) -> SourceKind {
            SourceKind::Rss
        }

        fn endpoint(&self) -> &str {
            "https://static.invalid/"
        }

        fn parse(&self, _body: &str, now: DateTime<Utc>) -> Result<Vec<Article>, SourceError> {
            Ok(vec![Article::new("static-1", "Snow closes schools", now)])
        }

        async fn fetch(&self, _fetcher: &Fetcher) -> Result<Vec<Article>, SourceError> {
            self.parse("", Utc::now())
        }
    }

    fn ingestor(repo: Repository) -> Arc<Ingestor> {
        Arc::new(
            Ingestor::new(repo, Arc::new(KeywordClassifier::default()), Fetcher::direct())
                .with_sources(vec![Arc::new(StaticSource)]),
        )
    }

    #[tokio::test]
    async fn test_auto_import_respects_enabled_flag() {
        let repo = repo();
        let mut tasks = BackgroundTasks::new();
        tasks.start_auto_import(ingestor(repo.clone()), Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(repo.imported().await.unwrap().is_empty());

        // Settings are re-read on every tick.
        repo.set_auto_import(true, 30).await.unwrap();
        tokio::time::sleep(Duration::from_millis(80)).await;
        tasks.stop().await;

        let imported = repo.imported().await.unwrap();
        assert_eq!(imported.len(), 1);
        assert!(repo.auto_import_settings().await.unwrap().last_fetched.is_some());
    }

    #[tokio::test]
    async fn test_auto_import_waits_for_interval() {
        let repo = repo();
        repo.set_auto_import(true, 30).await.unwrap();
        let stamp = Utc::now();
        repo.set_last_fetched(stamp).await.unwrap();

        let mut tasks = BackgroundTasks::new();
        tasks.start_auto_import(ingestor(repo.clone()), Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(50)).await;
        tasks.stop().await;

        assert!(repo.imported().await.unwrap().is_empty());
        assert_eq!(repo.auto_import_settings().await.unwrap().last_fetched, Some(stamp));
    }
}
