pub mod bulk;
pub mod cleanup;
pub mod config;
pub mod dates;
pub mod error;
pub mod models;
pub mod repository;
pub mod scheduler;
pub mod seed;
pub mod slug;
pub mod storage;
pub mod types;

pub use error::{Error, Result};
pub use models::Classifier;
pub use repository::Repository;
pub use storage::{KeyValueStore, Versioned};
pub use types::{Article, Category, ScheduledPublish};

pub mod prelude {
    pub use super::types::{Article, Category, ScheduledPublish};
    pub use super::{Classifier, Error, KeyValueStore, Repository, Result};
}
