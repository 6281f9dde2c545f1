//! Transactions: labelled groups of recorded mutation steps.

use crate::MutationEvent;
use serde::{Deserialize, Serialize};

/// One recorded primitive change together with its precomputed inverse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedStep {
    pub event: MutationEvent,
    pub inverse: MutationEvent,
}

/// An ordered list of recorded steps under a user-facing label.
///
/// A transaction undoes by replaying the inverses in reverse order and
/// redoes by replaying the events forward. It is a pure record; applying
/// it is the document editor's job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    label: String,
    /// Tree generation when the transaction opened.
    generation: u64,
    steps: Vec<RecordedStep>,
}

impl Transaction {
    pub fn new(label: impl Into<String>, generation: u64) -> Self {
        Self {
            label: label.into(),
            generation,
            steps: Vec::new(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn opened_at(&self) -> u64 {
        self.generation
    }

    pub fn record(&mut self, event: MutationEvent) {
        self.steps.push(RecordedStep {
            inverse: event.inverse(),
            event,
        });
    }

    pub fn steps(&self) -> &[RecordedStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
