pub mod config;
pub mod db;
pub mod error;
pub mod import;
pub mod merge;
pub mod normalize;
pub mod pipeline;
pub mod queue;
pub mod record;
pub mod sources;

pub use config::{load_config, Config};
pub use db::{Card, CardStore, Database, MemoryStore};
pub use error::{ConfigError, ImportError, LexiError, QueueError, Result};
pub use import::{import_words, ImportFormat};
pub use merge::{merge, ReconciliationError};
pub use normalize::{NormalizeOutcome, Normalizer};
pub use pipeline::{FetchPipeline, PhraseProcessor, PipelineConfig, PipelineError};
pub use queue::{EnqueueOutcome, PhraseStateMap, QueueState, StateSink, WorkQueue};
pub use record::{Field, FieldRecord, FieldValue, SearchTerm};
pub use sources::{FetchError, SourceAdapter, SourceId, SourceRegistry};
