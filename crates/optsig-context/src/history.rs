//! Append-only log of resolved messages.
//!
//! Entries are addressed by a logical index that never changes, even when a
//! capacity limit evicts the oldest entries. For every record that has been
//! resolved against the log, a cursor remembers the lowest index already
//! proven to hold no eligible donor (`checked_index`), so repeated
//! resolutions resume below it instead of re-walking.

use std::collections::{HashMap, VecDeque};

use optsig_core::{Instruction, MessageRecord};
use tracing::trace;

/// A resolved message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub record: MessageRecord,
    pub instruction: Instruction,
}

/// Scan progress for one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanCursor {
    /// Exclusive upper bound of every scan for this record.
    pub anchor: usize,
    /// Entries in `checked_index..anchor` hold no eligible donor.
    pub checked_index: usize,
    /// The same-thread walk reached its boundary without a donor.
    pub thread_exhausted: bool,
}

/// Caller-owned history of resolved instructions.
#[derive(Debug, Default)]
pub struct HistoryBuffer {
    entries: VecDeque<HistoryEntry>,
    /// Logical index of `entries[0]`.
    base: usize,
    /// Max retained entries; 0 keeps everything.
    capacity: usize,
    index_by_id: HashMap<String, usize>,
    cursors: HashMap<String, ScanCursor>,
}

impl HistoryBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer retaining at most `capacity` entries (0 = unbounded).
    #[must_use]
    pub fn with_capacity_limit(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    /// Logical length: one past the newest index.
    #[inline]
    pub fn len(&self) -> usize {
        self.base + self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Lowest index still retained.
    #[inline]
    pub fn first_index(&self) -> usize {
        self.base
    }

    pub fn get(&self, index: usize) -> Option<&HistoryEntry> {
        index
            .checked_sub(self.base)
            .and_then(|offset| self.entries.get(offset))
    }

    pub fn index_of(&self, record_id: &str) -> Option<usize> {
        self.index_by_id.get(record_id).copied()
    }

    /// Retained entries, oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    /// Append a resolved record and return its index.
    pub fn append(&mut self, record: MessageRecord, instruction: Instruction) -> usize {
        let index = self.len();
        self.index_by_id.insert(record.id.clone(), index);
        self.entries.push_back(HistoryEntry {
            record,
            instruction,
        });
        self.evict();
        index
    }

    fn evict(&mut self) {
        if self.capacity == 0 {
            return;
        }
        while self.entries.len() > self.capacity {
            if let Some(old) = self.entries.pop_front() {
                if self.index_by_id.get(&old.record.id) == Some(&self.base) {
                    self.index_by_id.remove(&old.record.id);
                }
                self.cursors.remove(&old.record.id);
                self.base += 1;
            }
        }
    }

    /// Upper bound for scans on behalf of `record_id`: its own index when
    /// already appended, otherwise the current length.
    pub fn anchor_for(&self, record_id: &str) -> usize {
        self.index_of(record_id).unwrap_or_else(|| self.len())
    }

    /// Current cursor for a record, creating an unscanned one if needed.
    pub fn cursor(&mut self, record_id: &str) -> ScanCursor {
        let anchor = self.anchor_for(record_id);
        *self
            .cursors
            .entry(record_id.to_string())
            .or_insert(ScanCursor {
                anchor,
                checked_index: anchor,
                thread_exhausted: false,
            })
    }

    /// Lowest index proven empty for `record_id`, if it has been scanned.
    pub fn checked_index(&self, record_id: &str) -> Option<usize> {
        self.cursors.get(record_id).map(|c| c.checked_index)
    }

    /// Record that `low..anchor` holds no eligible donor for `record_id`.
    ///
    /// `checked_index` only ever moves down.
    pub fn mark_checked(&mut self, record_id: &str, low: usize) {
        let mut cursor = self.cursor(record_id);
        if low < cursor.checked_index {
            cursor.checked_index = low;
            trace!(record_id, checked_index = low, "Advanced scan cursor");
        }
        self.cursors.insert(record_id.to_string(), cursor);
    }

    /// Record that the same-thread walk for `record_id` found nothing.
    pub fn mark_thread_exhausted(&mut self, record_id: &str) {
        let mut cursor = self.cursor(record_id);
        cursor.thread_exhausted = true;
        self.cursors.insert(record_id.to_string(), cursor);
    }
}
