//! Append-only event log.

use serde::Serialize;

use super::types::{Event, EventKind};

/// Time-ordered sequence of emitted events.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, time_occurred: i64, kind: EventKind) {
        self.events.push(Event::new(time_occurred, kind));
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Events appended since the log had `len` entries.
    pub fn since(&self, len: usize) -> &[Event] {
        self.events.get(len..).unwrap_or(&[])
    }

    /// Take every event out of the log, oldest first.
    pub fn drain(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    /// Drop events appended after the log had `len` entries.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.events.truncate(len);
    }

    /// Remove events that occurred strictly before `cutoff`.
    ///
    /// Returns the number of events removed.
    pub fn prune_older_than(&mut self, cutoff: i64) -> usize {
        let before = self.events.len();
        self.events.retain(|e| e.time_occurred >= cutoff);
        before - self.events.len()
    }
}
