//! Reporting sink for probe records.
//!
//! The driver hands every completed probe to a [`Recorder`]. The policy never
//! aggregates; a recorder decides what to do with each record.

use std::sync::Mutex;

use crate::probe::ProbeRecord;

/// Receives one record per completed probe, from many users concurrently.
pub trait Recorder: Send + Sync {
    fn record(&self, record: &ProbeRecord);

    fn user_started(&self, _user_id: usize) {}

    fn user_stopped(&self, _user_id: usize) {}
}

/// Keeps every record in memory, in arrival order.
#[derive(Debug, Default)]
pub struct MemoryRecorder {
    records: Mutex<Vec<ProbeRecord>>,
    started: Mutex<Vec<usize>>,
    stopped: Mutex<Vec<usize>>,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the records received so far.
    pub fn records(&self) -> Vec<ProbeRecord> {
        lock(&self.records).clone()
    }

    pub fn len(&self) -> usize {
        lock(&self.records).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn started_users(&self) -> Vec<usize> {
        lock(&self.started).clone()
    }

    pub fn stopped_users(&self) -> Vec<usize> {
        lock(&self.stopped).clone()
    }
}

impl Recorder for MemoryRecorder {
    fn record(&self, record: &ProbeRecord) {
        lock(&self.records).push(record.clone());
    }

    fn user_started(&self, user_id: usize) {
        lock(&self.started).push(user_id);
    }

    fn user_stopped(&self, user_id: usize) {
        lock(&self.stopped).push(user_id);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
