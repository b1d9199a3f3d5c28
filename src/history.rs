use std::collections::VecDeque;

use crate::model::{Connector, Shape};

pub const HISTORY_CAPACITY: usize = 50;

/// Immutable copy of the shapes and connectors at one point in time.
#[derive(Clone, Debug, PartialEq)]
pub struct HistorySnapshot {
    shapes: Vec<Shape>,
    connectors: Vec<Connector>,
}

impl HistorySnapshot {
    pub fn new(shapes: Vec<Shape>, connectors: Vec<Connector>) -> Self {
        Self { shapes, connectors }
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn connectors(&self) -> &[Connector] {
        &self.connectors
    }
}

/// Bounded linear undo history.
///
/// `cursor` indexes the snapshot matching live state. Recording after an undo discards the
/// undone branch; recording past capacity evicts the oldest snapshot. The state before the
/// first recorded mutation is never stored, so it cannot be undone back to.
#[derive(Debug)]
pub struct History {
    entries: VecDeque<HistorySnapshot>,
    cursor: Option<usize>,
    capacity: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }
}

impl History {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            cursor: None,
            capacity,
        }
    }

    pub fn record(&mut self, snapshot: HistorySnapshot) {
        match self.cursor {
            Some(cursor) => self.entries.truncate(cursor + 1),
            None => self.entries.clear(),
        }
        self.entries.push_back(snapshot);
        if self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
        self.cursor = Some(self.entries.len() - 1);
    }

    /// Steps back one snapshot and returns it for replay.
    pub fn undo(&mut self) -> Option<HistorySnapshot> {
        let cursor = self.cursor.filter(|c| *c > 0)?;
        self.cursor = Some(cursor - 1);
        self.entries.get(cursor - 1).cloned()
    }

    /// Steps forward one snapshot and returns it for replay.
    pub fn redo(&mut self) -> Option<HistorySnapshot> {
        let cursor = self.cursor?;
        if cursor + 1 >= self.entries.len() {
            return None;
        }
        self.cursor = Some(cursor + 1);
        self.entries.get(cursor + 1).cloned()
    }

    pub fn can_undo(&self) -> bool {
        self.cursor.is_some_and(|c| c > 0)
    }

    pub fn can_redo(&self) -> bool {
        self.cursor.is_some_and(|c| c + 1 < self.entries.len())
    }

    pub fn current(&self) -> Option<&HistorySnapshot> {
        self.cursor.and_then(|c| self.entries.get(c))
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = None;
    }
}
