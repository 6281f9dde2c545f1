//! Undo history.
//!
//! A single list of committed transactions with a cursor. Everything
//! before the cursor is applied; everything at and after it has been
//! undone. Committing while the cursor is mid-list truncates the redo
//! tail, which is the usual linear-history behavior.

use crate::Transaction;

#[derive(Debug)]
pub struct History {
    list: Vec<Transaction>,
    /// Number of applied transactions; also the index of the first
    /// undone one.
    cursor: usize,
    /// Zero means unlimited.
    max_depth: usize,
    disabled: bool,
}

impl History {
    pub fn new(max_depth: usize) -> Self {
        Self {
            list: Vec::new(),
            cursor: 0,
            max_depth,
            disabled: false,
        }
    }

    /// Record a committed transaction, dropping any redo tail. The oldest
    /// entry falls off when the depth limit is exceeded.
    pub fn record(&mut self, transaction: Transaction) {
        if self.disabled {
            return;
        }
        self.list.truncate(self.cursor);
        self.list.push(transaction);
        self.cursor += 1;
        if self.max_depth > 0 && self.list.len() > self.max_depth {
            self.list.remove(0);
            self.cursor -= 1;
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.disabled && self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        !self.disabled && self.cursor < self.list.len()
    }

    /// The transaction an undo would revert.
    pub fn peek_undo(&self) -> Option<&Transaction> {
        if !self.can_undo() {
            return None;
        }
        self.list.get(self.cursor - 1)
    }

    /// The transaction a redo would reapply.
    pub fn peek_redo(&self) -> Option<&Transaction> {
        if !self.can_redo() {
            return None;
        }
        self.list.get(self.cursor)
    }

    /// Move the cursor back after a successful undo replay.
    pub fn confirm_undo(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
        }
    }

    /// Move the cursor forward after a successful redo replay.
    pub fn confirm_redo(&mut self) {
        if self.cursor < self.list.len() {
            self.cursor += 1;
        }
    }

    pub fn undo_label(&self) -> Option<&str> {
        self.peek_undo().map(Transaction::label)
    }

    pub fn redo_label(&self) -> Option<&str> {
        self.peek_redo().map(Transaction::label)
    }

    pub fn undo_depth(&self) -> usize {
        if self.disabled {
            0
        } else {
            self.cursor
        }
    }

    pub fn redo_depth(&self) -> usize {
        if self.disabled {
            0
        } else {
            self.list.len() - self.cursor
        }
    }

    /// Permanently disable the history. Called when a replay failed
    /// mid-way and the applied/undone bookkeeping can no longer be
    /// trusted. Live editing keeps working; undo and redo do not.
    pub fn disable(&mut self) {
        self.disabled = true;
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }
}
