//! Per-phrase status map shared with the presentation layer.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use tokio::sync::broadcast;

use super::state::{PhraseStatus, QueueState, StateEvent};
use crate::record::{FieldRecord, SearchTerm};

/// Where the queue and worker publish phrase states and results.
pub trait StateSink: Send + Sync {
    fn set_state(&self, phrase: &SearchTerm, state: QueueState);

    /// Stores the record and marks the phrase ready.
    fn publish_record(&self, phrase: &SearchTerm, record: FieldRecord);

    /// Stores the error message and marks the phrase failed.
    fn publish_error(&self, phrase: &SearchTerm, error: String);

    fn state_of(&self, phrase: &SearchTerm) -> Option<QueueState>;

    fn phrases_in(&self, state: QueueState) -> Vec<SearchTerm>;
}

/// In-memory state map with change notifications.
///
/// Readers get snapshots; writers hold the lock only for the map update.
/// Events are sent after the lock is released.
#[derive(Clone)]
pub struct PhraseStateMap {
    statuses: Arc<RwLock<HashMap<SearchTerm, PhraseStatus>>>,
    sender: Arc<broadcast::Sender<StateEvent>>,
}

impl PhraseStateMap {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            statuses: Arc::new(RwLock::new(HashMap::new())),
            sender: Arc::new(sender),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StateEvent> {
        self.sender.subscribe()
    }

    pub fn get(&self, phrase: &SearchTerm) -> Option<PhraseStatus> {
        self.read().get(phrase).cloned()
    }

    /// Copy of every known status.
    pub fn snapshot(&self) -> HashMap<SearchTerm, PhraseStatus> {
        self.read().clone()
    }

    /// Registers a phrase as waiting unless it is already known.
    pub fn track(&self, phrase: &SearchTerm) {
        let inserted = {
            let mut statuses = self.write();
            if statuses.contains_key(phrase) {
                false
            } else {
                statuses.insert(phrase.clone(), PhraseStatus::new(QueueState::Waiting));
                true
            }
        };
        if inserted {
            self.send(StateEvent::StateChanged {
                phrase: phrase.clone(),
                state: QueueState::Waiting,
            });
        }
    }

    pub fn remove(&self, phrase: &SearchTerm) -> Option<PhraseStatus> {
        self.write().remove(phrase)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<SearchTerm, PhraseStatus>> {
        match self.statuses.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Phrase state map lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<SearchTerm, PhraseStatus>> {
        match self.statuses.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Phrase state map lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn send(&self, event: StateEvent) {
        // No active receivers is fine.
        let _ = self.sender.send(event);
    }

    fn update(&self, phrase: &SearchTerm, f: impl FnOnce(&mut PhraseStatus)) {
        let mut statuses = self.write();
        let status = statuses
            .entry(phrase.clone())
            .or_insert_with(|| PhraseStatus::new(QueueState::Waiting));
        f(status);
        status.updated_at = Utc::now();
    }
}

impl Default for PhraseStateMap {
    fn default() -> Self {
        Self::new(256)
    }
}

impl StateSink for PhraseStateMap {
    fn set_state(&self, phrase: &SearchTerm, state: QueueState) {
        self.update(phrase, |status| {
            status.state = state;
            if state != QueueState::Error {
                status.error = None;
            }
        });
        self.send(StateEvent::StateChanged {
            phrase: phrase.clone(),
            state,
        });
    }

    fn publish_record(&self, phrase: &SearchTerm, record: FieldRecord) {
        self.update(phrase, |status| {
            status.state = QueueState::Ready;
            status.record = Some(record.clone());
            status.error = None;
        });
        self.send(StateEvent::RecordReady {
            phrase: phrase.clone(),
            record,
        });
    }

    fn publish_error(&self, phrase: &SearchTerm, error: String) {
        self.update(phrase, |status| {
            status.state = QueueState::Error;
            status.error = Some(error.clone());
        });
        self.send(StateEvent::Failed {
            phrase: phrase.clone(),
            error,
        });
    }

    fn state_of(&self, phrase: &SearchTerm) -> Option<QueueState> {
        self.read().get(phrase).map(|s| s.state)
    }

    fn phrases_in(&self, state: QueueState) -> Vec<SearchTerm> {
        let mut phrases: Vec<SearchTerm> = self
            .read()
            .iter()
            .filter(|(_, status)| status.state == state)
            .map(|(phrase, _)| phrase.clone())
            .collect();
        phrases.sort();
        phrases
    }
}
