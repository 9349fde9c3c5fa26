use thiserror::Error;

use crate::db::DatabaseError;
use crate::merge::ReconciliationError;
use crate::sources::{FetchError, SourceId};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{0}")]
    Fetch(FetchError),

    /// A required source had nothing for the phrase.
    #[error("No match in source '{source_id}'{}", format_suggestions(.suggestions))]
    NoMatch {
        source_id: SourceId,
        suggestions: Vec<String>,
    },

    #[error("All sources failed: {}", join_failures(.failures))]
    AllSourcesFailed { failures: Vec<FetchError> },

    #[error("Reconciliation failed: {0}")]
    Reconciliation(#[from] ReconciliationError),

    #[error("Card store failed: {0}")]
    Store(#[from] DatabaseError),

    #[error("Runtime error: {0}")]
    Runtime(String),
}

fn format_suggestions(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!(" (did you mean: {})", suggestions.join(", "))
    }
}

fn join_failures(failures: &[FetchError]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl PipelineError {
    /// Reconciliation errors mean adapters disagree on the field contract.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, PipelineError::Reconciliation(_))
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            PipelineError::Fetch(e) => e.is_retryable(),
            PipelineError::AllSourcesFailed { failures } => {
                failures.iter().any(FetchError::is_retryable)
            }
            PipelineError::Store(_) => true,
            _ => false,
        }
    }

    pub fn is_no_match(&self) -> bool {
        match self {
            PipelineError::NoMatch { .. } => true,
            PipelineError::Fetch(e) => e.is_no_match(),
            PipelineError::AllSourcesFailed { failures } => {
                !failures.is_empty() && failures.iter().all(FetchError::is_no_match)
            }
            _ => false,
        }
    }

    /// Spelling suggestions carried by a `NoMatch`.
    pub fn suggestions(&self) -> &[String] {
        match self {
            PipelineError::NoMatch { suggestions, .. } => suggestions,
            _ => &[],
        }
    }
}

impl From<FetchError> for PipelineError {
    fn from(error: FetchError) -> Self {
        match error {
            FetchError::NoMatch { source_id } => PipelineError::NoMatch {
                source_id,
                suggestions: Vec::new(),
            },
            other => PipelineError::Fetch(other),
        }
    }
}

#[derive(Debug, Clone)]
pub enum PipelineWarning {
    SourceFailed { source_id: SourceId, error: String },
}
