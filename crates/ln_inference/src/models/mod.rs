use std::sync::Arc;

use ln_core::{Category, Classifier, Error, Result};

pub mod dummy;
pub mod keyword;

pub use dummy::FixedClassifier;
pub use keyword::KeywordClassifier;

/// Builds a classifier from its configured name.
///
/// `keyword` selects the bundled keyword table, `fixed:<category>` always
/// answers with that category.
pub fn create_classifier(name: &str) -> Result<Arc<dyn Classifier>> {
    let name = name.trim();
    if name.is_empty() || name.eq_ignore_ascii_case("keyword") {
        return Ok(Arc::new(KeywordClassifier::default()));
    }
    if let Some(category) = name.strip_prefix("fixed:") {
        let category: Category = category.parse()?;
        return Ok(Arc::new(FixedClassifier::new(category)));
    }
    Err(Error::InvalidInput(format!(
        "Unknown classifier '{}'. Available classifiers: keyword, fixed:<category>",
        name
    )))
}
