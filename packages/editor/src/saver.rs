//! Saving back to storage.
//!
//! The core never talks to a network or a filesystem; it hands the
//! serialized document to a [`Saver`] and interprets the outcome as a
//! status value. Retry policy and user interaction belong to the
//! embedding application.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveKind {
    /// The user asked for a save.
    Manual,
    /// Periodic background save.
    Auto,
    /// Last-ditch save while tearing the session down.
    Recover,
}

/// What a save attempt came to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The document is stored.
    Saved,
    /// The backend rejected the document for good; retrying the same
    /// content cannot succeed.
    Fatal(String),
    /// A passing failure. Retrying later may succeed.
    Transient(String),
    /// The stored copy changed under us; saving would clobber someone
    /// else's work.
    Edited,
    /// This client's version of the backend protocol is too old.
    TooOld,
}

impl SaveOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, SaveOutcome::Saved)
    }

    /// Whether retrying the same save can possibly help.
    pub fn is_retriable(&self) -> bool {
        matches!(self, SaveOutcome::Transient(_))
    }
}

pub trait Saver {
    fn save(&mut self, kind: SaveKind, serialized: &str) -> SaveOutcome;
}

/// A saver writing into an in-process buffer. Mostly for tests and
/// ephemeral documents; the stored values are the successive saved
/// serializations.
#[derive(Debug, Default)]
pub struct MemorySaver {
    saved: Vec<(SaveKind, String)>,
    next_outcome: Option<SaveOutcome>,
}

impl MemorySaver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn saved(&self) -> &[(SaveKind, String)] {
        &self.saved
    }

    pub fn last_saved(&self) -> Option<&str> {
        self.saved.last().map(|(_, text)| text.as_str())
    }

    /// Make the next save attempt return `outcome` instead of storing.
    pub fn fail_next(&mut self, outcome: SaveOutcome) {
        self.next_outcome = Some(outcome);
    }
}

impl Saver for MemorySaver {
    fn save(&mut self, kind: SaveKind, serialized: &str) -> SaveOutcome {
        if let Some(outcome) = self.next_outcome.take() {
            return outcome;
        }
        self.saved.push((kind, serialized.to_string()));
        SaveOutcome::Saved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_saver_stores_and_injects_failures() {
        let mut saver = MemorySaver::new();
        assert_eq!(saver.save(SaveKind::Manual, "<doc/>"), SaveOutcome::Saved);
        assert_eq!(saver.last_saved(), Some("<doc/>"));

        saver.fail_next(SaveOutcome::Transient("offline".into()));
        let outcome = saver.save(SaveKind::Auto, "<doc>x</doc>");
        assert!(outcome.is_retriable());
        // The failed attempt stored nothing.
        assert_eq!(saver.saved().len(), 1);

        assert_eq!(saver.save(SaveKind::Auto, "<doc>x</doc>"), SaveOutcome::Saved);
    }
}
