//! Pending-request queue.
//!
//! Entries are kept in admission order: higher priority first, FIFO within
//! a priority class. A new entry is inserted directly behind the last entry
//! of equal or higher priority.

use std::collections::VecDeque;

use crate::request::{Priority, RequestId};

/// Priority-ordered FIFO of pending request ids.
#[derive(Clone, Debug, Default)]
pub struct PendingQueue {
    entries: VecDeque<(RequestId, Priority)>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `id` behind every entry of priority `>= priority`.
    pub fn push(&mut self, id: RequestId, priority: Priority) {
        let pos = self
            .entries
            .iter()
            .rposition(|(_, p)| *p >= priority)
            .map_or(0, |i| i + 1);
        self.entries.insert(pos, (id, priority));
    }

    /// Take the next id to admit.
    pub fn pop(&mut self) -> Option<RequestId> {
        self.entries.pop_front().map(|(id, _)| id)
    }

    pub fn peek(&self) -> Option<RequestId> {
        self.entries.front().map(|(id, _)| *id)
    }

    /// Remove `id`. Returns `false` if it was not queued.
    pub fn remove(&mut self, id: RequestId) -> bool {
        match self.entries.iter().position(|(e, _)| *e == id) {
            Some(i) => {
                self.entries.remove(i);
                true
            }
            None => false,
        }
    }

    /// Keep only the ids for which `keep` returns `true`.
    pub fn retain(&mut self, mut keep: impl FnMut(RequestId) -> bool) {
        self.entries.retain(|(id, _)| keep(*id));
    }

    pub fn contains(&self, id: RequestId) -> bool {
        self.entries.iter().any(|(e, _)| *e == id)
    }

    /// Queued ids in admission order.
    pub fn ids(&self) -> impl Iterator<Item = RequestId> + '_ {
        self.entries.iter().map(|(id, _)| *id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn capacity(&self) -> usize {
        self.entries.capacity()
    }
}
