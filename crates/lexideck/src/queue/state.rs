use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::{FieldRecord, SearchTerm};

/// UI-visible processing state of a phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueState {
    #[default]
    Waiting,
    Queued,
    Loading,
    Ready,
    Error,
}

impl QueueState {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueState::Waiting => "waiting",
            QueueState::Queued => "queued",
            QueueState::Loading => "loading",
            QueueState::Ready => "ready",
            QueueState::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "waiting" => Some(QueueState::Waiting),
            "queued" => Some(QueueState::Queued),
            "loading" => Some(QueueState::Loading),
            "ready" => Some(QueueState::Ready),
            "error" => Some(QueueState::Error),
            _ => None,
        }
    }

    /// Queued or loading: the phrase occupies the queue.
    pub fn is_active(&self) -> bool {
        matches!(self, QueueState::Queued | QueueState::Loading)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, QueueState::Ready | QueueState::Error)
    }
}

impl std::fmt::Display for QueueState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Latest known status of one phrase, as published to the presentation
/// layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhraseStatus {
    pub state: QueueState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record: Option<FieldRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl PhraseStatus {
    pub fn new(state: QueueState) -> Self {
        Self {
            state,
            record: None,
            error: None,
            updated_at: Utc::now(),
        }
    }
}

/// A change broadcast by the state map.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StateEvent {
    StateChanged {
        phrase: SearchTerm,
        state: QueueState,
    },
    RecordReady {
        phrase: SearchTerm,
        record: FieldRecord,
    },
    Failed {
        phrase: SearchTerm,
        error: String,
    },
}

impl StateEvent {
    pub fn phrase(&self) -> &SearchTerm {
        match self {
            StateEvent::StateChanged { phrase, .. }
            | StateEvent::RecordReady { phrase, .. }
            | StateEvent::Failed { phrase, .. } => phrase,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_names_round_trip() {
        for state in [
            QueueState::Waiting,
            QueueState::Queued,
            QueueState::Loading,
            QueueState::Ready,
            QueueState::Error,
        ] {
            assert_eq!(QueueState::parse(state.as_str()), Some(state));
            assert_eq!(
                serde_json::to_value(state).unwrap(),
                serde_json::Value::String(state.as_str().to_string())
            );
        }
        assert_eq!(QueueState::parse("stale"), None);
    }

    #[test]
    fn test_state_classes() {
        assert!(QueueState::Queued.is_active());
        assert!(QueueState::Loading.is_active());
        assert!(!QueueState::Waiting.is_active());
        assert!(QueueState::Error.is_terminal());
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = StateEvent::StateChanged {
            phrase: SearchTerm::new("casa"),
            state: QueueState::Queued,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "state_changed");
        assert_eq!(json["phrase"], "casa");
        assert_eq!(json["state"], "queued");
    }
}
