use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LexiError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] crate::pipeline::PipelineError),

    #[error("Import error: {0}")]
    Import(#[from] ImportError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },

    #[error("Unknown source '{name}' (available: {available})")]
    UnknownSource { name: String, available: String },

    #[error("Failed to set up HTTP transport: {0}")]
    Transport(#[from] crate::sources::TransportError),
}

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Unsupported import format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to read import file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed annotation file '{path}': {message}")]
    Malformed { path: PathBuf, message: String },
}

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Failed to spawn worker: {0}")]
    SpawnFailed(String),
}

pub type Result<T> = std::result::Result<T, LexiError>;
