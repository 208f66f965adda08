use std::sync::Arc;

use ln_core::config::Config;
use ln_core::scheduler::Scheduler;
use ln_core::{Classifier, Repository};
use ln_inference::SeoAnalyzer;
use ln_sources::Ingestor;

/// Shared handles behind every route.
#[derive(Clone)]
pub struct AppState {
    pub repo: Repository,
    pub scheduler: Scheduler,
    pub ingestor: Arc<Ingestor>,
    pub classifier: Arc<dyn Classifier>,
    pub seo: SeoAnalyzer,
    pub config: Arc<Config>,
}

impl AppState {
    /// Repository and classifier are taken from the ingestor so all paths share them.
    pub fn new(ingestor: Arc<Ingestor>, config: Config) -> Self {
        let repo = ingestor.repo().clone();
        Self {
            scheduler: Scheduler::new(repo.clone()),
            classifier: ingestor.classifier().clone(),
            repo,
            ingestor,
            seo: SeoAnalyzer::default(),
            config: Arc::new(config),
        }
    }

    pub fn classify(&self, text: &str) -> ln_core::Category {
        self.classifier.classify(text)
    }
}
