pub mod cli;
pub mod logging;
pub mod manager;
pub mod poller;
pub mod relay;
pub mod sources;

pub use cli::{handle_command, SourceArgs, SourceCommands};
pub use logging::{init_logging, Logger};
pub use manager::{CycleReport, IngestReport, Ingestor, SourceFailure};
pub use poller::BackgroundTasks;
pub use relay::Fetcher;
pub use sources::{
    build_sources, load_definitions, ContentSource, SourceDefinition, SourceError, SourceKind,
};

pub mod prelude {
    pub use super::sources::ContentSource;
    pub use super::{Fetcher, Ingestor};
    pub use ln_core::{Article, Error, Result};
}
