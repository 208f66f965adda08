use crate::types::Category;

/// Maps free text to one category label.
///
/// Implementations must be deterministic: the same text always yields the
/// same category.
pub trait Classifier: Send + Sync {
    fn name(&self) -> &str;

    fn classify(&self, text: &str) -> Category;
}
