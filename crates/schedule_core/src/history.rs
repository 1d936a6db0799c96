//! crates/schedule_core/src/history.rs
//!
//! Linear undo/redo history over full document snapshots.

use crate::domain::AppData;

/// Maximum number of snapshots kept; the oldest entry is evicted first.
pub const HISTORY_LIMIT: usize = 50;

/// An ordered sequence of [`AppData`] snapshots with a pointer.
///
/// Invariants: the pointer is always within `[-1, len - 1]` (`-1` only while
/// empty), and the length never exceeds [`HISTORY_LIMIT`].
#[derive(Debug, Clone)]
pub struct History {
    entries: Vec<AppData>,
    pointer: isize,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            pointer: -1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn pointer(&self) -> isize {
        self.pointer
    }

    /// Replaces the history with a single snapshot. Used for the first
    /// loaded document and for explicit read-only snapshots.
    pub fn seed(&mut self, snapshot: AppData) {
        self.entries = vec![snapshot];
        self.pointer = 0;
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.pointer = -1;
    }

    /// Appends a snapshot: forward history past the pointer is discarded,
    /// the oldest entry is evicted once the cap is exceeded, and the
    /// pointer moves to the new tail.
    pub fn push(&mut self, snapshot: AppData) {
        self.entries.truncate((self.pointer + 1) as usize);
        self.entries.push(snapshot);
        if self.entries.len() > HISTORY_LIMIT {
            self.entries.remove(0);
        }
        self.pointer = self.entries.len() as isize - 1;
    }

    pub fn can_undo(&self) -> bool {
        self.pointer > 0
    }

    pub fn can_redo(&self) -> bool {
        self.pointer + 1 < self.entries.len() as isize
    }

    /// Steps the pointer back and returns that snapshot; `None` at the start.
    pub fn undo(&mut self) -> Option<&AppData> {
        if !self.can_undo() {
            return None;
        }
        self.pointer -= 1;
        self.entries.get(self.pointer as usize)
    }

    /// Steps the pointer forward and returns that snapshot; `None` at the tail.
    pub fn redo(&mut self) -> Option<&AppData> {
        if !self.can_redo() {
            return None;
        }
        self.pointer += 1;
        self.entries.get(self.pointer as usize)
    }

    /// The snapshot the pointer currently rests on.
    pub fn current(&self) -> Option<&AppData> {
        if self.pointer < 0 {
            return None;
        }
        self.entries.get(self.pointer as usize)
    }
}
