pub mod models;
pub mod readability;
pub mod seo;

pub use models::{create_classifier, FixedClassifier, KeywordClassifier};
pub use readability::{readability, ReadabilityReport};
pub use seo::{SeoAnalyzer, SeoReport};

pub mod prelude {
    pub use super::models::create_classifier;
    pub use super::seo::SeoAnalyzer;
    pub use ln_core::{Article, Category, Classifier, Error, Result};
}
