//! The worker body: fetch one phrase from all sources, merge and store it.

pub mod config;
pub mod context;
pub mod error;
pub mod runner;

pub use config::PipelineConfig;
pub use context::FetchContext;
pub use error::{PipelineError, PipelineWarning};
pub use runner::{FetchPipeline, PhraseProcessor};
