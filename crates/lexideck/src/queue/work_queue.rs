//! FIFO of phrases drained by a single background worker.
//!
//! All queue bookkeeping lives behind one mutex, so duplicate checks and
//! stale marks never race with the worker. A dequeued phrase is not
//! removed from the FIFO; it is marked stale and skipped when popped, and
//! a result that arrives for a phrase dequeued while loading is dropped.

use std::any::Any;
use std::collections::{HashSet, VecDeque};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::state::QueueState;
use super::state_map::StateSink;
use crate::db::{CardStore, DatabaseError};
use crate::error::QueueError;
use crate::pipeline::{PhraseProcessor, PipelineError};
use crate::record::{FieldRecord, SearchTerm};

const WORKER_THREAD_NAME: &str = "lexideck-worker";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    Queued,
    /// Already queued, loading or fetched; nothing changed.
    Duplicate,
    /// The phrase was empty after normalization.
    Ignored,
}

/// Point-in-time view of the queue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueSnapshot {
    pub queued: Vec<SearchTerm>,
    pub loading: Option<SearchTerm>,
    pub stale: Vec<SearchTerm>,
    pub running: bool,
}

#[derive(Default)]
struct QueueInner {
    fifo: VecDeque<SearchTerm>,
    /// Terms physically present in `fifo`, stale or not.
    members: HashSet<SearchTerm>,
    stale: HashSet<SearchTerm>,
    loading: Option<SearchTerm>,
    worker: Option<JoinHandle<()>>,
}

impl QueueInner {
    fn is_active(&self, phrase: &SearchTerm) -> bool {
        (self.members.contains(phrase) || self.loading.as_ref() == Some(phrase))
            && !self.stale.contains(phrase)
    }

    fn is_idle(&self) -> bool {
        self.worker.is_none() && self.fifo.is_empty()
    }
}

struct Shared {
    inner: Mutex<QueueInner>,
    idle: Condvar,
    processor: Arc<dyn PhraseProcessor>,
    sink: Arc<dyn StateSink>,
    done: Arc<dyn CardStore>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, QueueInner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Work queue lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Mirrors a state change into the card store. Failures only cost
    /// persistence of the state, so they are logged.
    fn persist_state(&self, phrase: &SearchTerm, state: QueueState) {
        let result = self
            .done
            .add_card(phrase)
            .and_then(|_| self.done.set_state(phrase, state));
        if let Err(e) = result {
            warn!(phrase = %phrase, state = %state, error = %e, "Failed to persist card state");
        }
    }

    fn set_state(&self, phrase: &SearchTerm, state: QueueState) {
        self.sink.set_state(phrase, state);
        self.persist_state(phrase, state);
    }

    /// Writes a finished record back. Called under the queue lock, after
    /// the stale check, so a discarded result never reaches the store.
    fn store_record(&self, phrase: &SearchTerm, record: &FieldRecord) -> Result<(), DatabaseError> {
        self.done.add_card(phrase)?;
        self.done.set_base_data(phrase, record)
    }

    fn stored_record(&self, phrase: &SearchTerm) -> Option<FieldRecord> {
        match self.done.get_card(phrase) {
            Ok(card) => card.and_then(|c| c.base_data),
            Err(e) => {
                warn!(phrase = %phrase, error = %e, "Failed to read card store");
                None
            }
        }
    }
}

/// The work queue. Cloning yields another handle to the same queue.
#[derive(Clone)]
pub struct WorkQueue {
    shared: Arc<Shared>,
}

impl WorkQueue {
    pub fn new(
        processor: Arc<dyn PhraseProcessor>,
        sink: Arc<dyn StateSink>,
        done: Arc<dyn CardStore>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(QueueInner::default()),
                idle: Condvar::new(),
                processor,
                sink,
                done,
            }),
        }
    }

    /// Adds a phrase and makes sure the worker runs.
    pub fn enqueue(&self, phrase: impl Into<SearchTerm>) -> Result<EnqueueOutcome, QueueError> {
        let phrase = phrase.into();
        if phrase.is_empty() {
            return Ok(EnqueueOutcome::Ignored);
        }

        let mut inner = self.shared.lock();
        if let Some(record) = self.shared.stored_record(&phrase) {
            debug!(phrase = %phrase, "Phrase already fetched");
            self.shared.sink.publish_record(&phrase, record);
            return Ok(EnqueueOutcome::Duplicate);
        }
        if inner.is_active(&phrase) {
            debug!(phrase = %phrase, "Phrase already queued");
            return Ok(EnqueueOutcome::Duplicate);
        }

        inner.stale.remove(&phrase);
        if inner.loading.as_ref() == Some(&phrase) {
            // Dequeued while loading: the in-flight result is valid again.
            self.shared.set_state(&phrase, QueueState::Loading);
            return Ok(EnqueueOutcome::Queued);
        }
        if inner.members.insert(phrase.clone()) {
            inner.fifo.push_back(phrase.clone());
        }
        self.shared.set_state(&phrase, QueueState::Queued);
        debug!(phrase = %phrase, queued = inner.fifo.len(), "Enqueued phrase");

        self.ensure_worker(&mut inner)?;
        Ok(EnqueueOutcome::Queued)
    }

    pub fn enqueue_all<I, S>(&self, phrases: I) -> Result<usize, QueueError>
    where
        I: IntoIterator<Item = S>,
        S: Into<SearchTerm>,
    {
        let mut queued = 0;
        for phrase in phrases {
            if self.enqueue(phrase)? == EnqueueOutcome::Queued {
                queued += 1;
            }
        }
        Ok(queued)
    }

    /// Sets the phrase back to waiting. Returns true if it was queued or
    /// loading, in which case it is marked stale.
    pub fn dequeue(&self, phrase: &SearchTerm) -> bool {
        let mut inner = self.shared.lock();
        let was_active = inner.is_active(phrase);
        if inner.members.contains(phrase) || inner.loading.as_ref() == Some(phrase) {
            inner.stale.insert(phrase.clone());
        }
        self.shared.set_state(phrase, QueueState::Waiting);
        if was_active {
            debug!(phrase = %phrase, "Dequeued phrase");
        }
        was_active
    }

    /// Dequeues every queued or loading phrase.
    pub fn dequeue_all(&self) -> usize {
        let mut phrases: Vec<SearchTerm> = {
            let inner = self.shared.lock();
            inner.fifo.iter().chain(inner.loading.iter()).cloned().collect()
        };
        phrases.extend(self.shared.sink.phrases_in(QueueState::Queued));
        phrases.extend(self.shared.sink.phrases_in(QueueState::Loading));
        phrases.sort();
        phrases.dedup();

        phrases.iter().filter(|p| self.dequeue(p)).count()
    }

    /// Drains the FIFO. Drained phrases go back to waiting; the phrase
    /// being loaded finishes normally.
    pub fn pause(&self) -> usize {
        let mut inner = self.shared.lock();
        let drained: Vec<SearchTerm> = inner.fifo.drain(..).collect();
        inner.members.clear();

        let mut paused = 0;
        for phrase in drained {
            if inner.stale.remove(&phrase) {
                continue;
            }
            self.shared.set_state(&phrase, QueueState::Waiting);
            paused += 1;
        }
        info!(paused, "Paused work queue");
        paused
    }

    /// Re-enqueues every phrase the sink reports as queued.
    pub fn resume(&self) -> Result<usize, QueueError> {
        // A queued-state phrase can be missing from the FIFO after a
        // restart; enqueue only adds what is not already there.
        let count = self.enqueue_all(self.shared.sink.phrases_in(QueueState::Queued))?;
        info!(count, "Resumed work queue");
        Ok(count)
    }

    /// Blocks until the FIFO is empty and no worker runs. Returns false on
    /// timeout.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let inner = self.shared.lock();
        let result = self
            .shared
            .idle
            .wait_timeout_while(inner, timeout, |inner| !inner.is_idle());
        match result {
            Ok((_, timeout)) => !timeout.timed_out(),
            Err(poisoned) => {
                log::warn!("Work queue lock was poisoned, recovering");
                let (inner, _) = poisoned.into_inner();
                inner.is_idle()
            }
        }
    }

    /// Number of queued, non-stale phrases.
    pub fn len(&self) -> usize {
        let inner = self.shared.lock();
        inner
            .fifo
            .iter()
            .filter(|p| !inner.stale.contains(*p))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_running(&self) -> bool {
        self.shared.lock().worker.is_some()
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        let inner = self.shared.lock();
        let mut stale: Vec<SearchTerm> = inner.stale.iter().cloned().collect();
        stale.sort();
        QueueSnapshot {
            queued: inner
                .fifo
                .iter()
                .filter(|p| !inner.stale.contains(*p))
                .cloned()
                .collect(),
            loading: inner.loading.clone(),
            stale,
            running: inner.worker.is_some(),
        }
    }

    fn ensure_worker(&self, inner: &mut QueueInner) -> Result<(), QueueError> {
        if inner.worker.is_some() {
            return Ok(());
        }
        let shared = Arc::clone(&self.shared);
        let handle = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || run_worker(shared))
            .map_err(|e| QueueError::SpawnFailed(e.to_string()))?;
        inner.worker = Some(handle);
        debug!("Started queue worker");
        Ok(())
    }
}

fn run_worker(shared: Arc<Shared>) {
    debug!("Worker started");

    loop {
        let phrase = {
            let mut inner = shared.lock();
            let Some(phrase) = inner.fifo.pop_front() else {
                // Dropping our own handle detaches the thread, which is
                // about to return anyway.
                inner.worker = None;
                shared.idle.notify_all();
                break;
            };
            inner.members.remove(&phrase);
            if inner.stale.remove(&phrase) {
                debug!(phrase = %phrase, "Skipping stale phrase");
                continue;
            }
            inner.loading = Some(phrase.clone());
            shared.set_state(&phrase, QueueState::Loading);
            phrase
        };

        let outcome =
            panic::catch_unwind(AssertUnwindSafe(|| shared.processor.process(&phrase)));

        let mut inner = shared.lock();
        inner.loading = None;
        if inner.stale.remove(&phrase) {
            debug!(phrase = %phrase, "Discarding result of dequeued phrase");
            continue;
        }

        match outcome {
            Ok(Ok(record)) => match shared.store_record(&phrase, &record) {
                Ok(()) => {
                    debug!(phrase = %phrase, fields = record.len(), "Phrase ready");
                    shared.sink.publish_record(&phrase, record);
                }
                Err(e) => {
                    error!(phrase = %phrase, error = %e, "Failed to store fetched record");
                    shared
                        .sink
                        .publish_error(&phrase, format!("Failed to store record: {}", e));
                    shared.persist_state(&phrase, QueueState::Error);
                }
            },
            Ok(Err(e)) => {
                log_failure(&phrase, &e);
                shared.sink.publish_error(&phrase, e.to_string());
                shared.persist_state(&phrase, QueueState::Error);
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(phrase = %phrase, panic = %message, "Processor panicked");
                shared
                    .sink
                    .publish_error(&phrase, format!("Processing panicked: {}", message));
                shared.persist_state(&phrase, QueueState::Error);
            }
        }
    }

    debug!("Worker stopped");
}

fn log_failure(phrase: &SearchTerm, error: &PipelineError) {
    if error.is_contract_violation() {
        error!(
            phrase = %phrase,
            kind = "contract_violation",
            error = %error,
            "Sources disagree on a field"
        );
    } else if error.is_no_match() {
        info!(phrase = %phrase, error = %error, "No data for phrase");
    } else {
        warn!(
            phrase = %phrase,
            retryable = error.is_retryable(),
            error = %error,
            "Failed to fetch phrase"
        );
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
