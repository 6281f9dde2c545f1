//! The validation error controller and its two drain tasks.
//!
//! Errors arrive from an external validator as `(message, anchor)`
//! pairs. The controller assigns them stable ids and the tasks turn
//! them into markers through a [`MarkerSink`]:
//!
//! * [`ProcessErrorsTask`] places markers for errors that do not have
//!   one yet.
//! * [`RefreshErrorsTask`] repositions markers that already exist,
//!   after layout-affecting edits.
//!
//! Both work from a snapshot of error ids taken at `reset()`. An error
//! resolved mid-drain is simply absent when its id comes up and is
//! skipped. A stale anchor is data, not a fault: the error is skipped
//! for the current cycle and reconsidered on the next snapshot.

use crate::Task;
use tracing::trace;
use weft_dom::{Location, Tree};

pub const DEFAULT_BATCH_SIZE: usize = 24;

/// Stable handle for a reported error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorId(u64);

/// Handle for a placed marker, minted by the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MarkerId(pub u64);

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub message: String,
    pub anchor: Location,
}

#[derive(Debug)]
pub struct ErrorEntry {
    pub id: ErrorId,
    pub error: ValidationError,
    pub marker: Option<MarkerId>,
}

/// Where markers materialize. The session implements this against the
/// GUI tree; tests record calls.
pub trait MarkerSink {
    fn place_marker(&mut self, message: &str, anchor: Location) -> MarkerId;
    fn move_marker(&mut self, marker: MarkerId, anchor: Location);
    fn remove_marker(&mut self, marker: MarkerId);
}

#[derive(Debug, Default)]
pub struct ValidationController {
    entries: Vec<ErrorEntry>,
    next_id: u64,
}

impl ValidationController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&mut self, error: ValidationError) -> ErrorId {
        let id = ErrorId(self.next_id);
        self.next_id += 1;
        self.entries.push(ErrorEntry {
            id,
            error,
            marker: None,
        });
        id
    }

    /// Drop one error, removing its marker if it had one. Called when
    /// the validator reports the error fixed.
    pub fn resolve(&mut self, id: ErrorId, sink: &mut dyn MarkerSink) {
        if let Some(pos) = self.entries.iter().position(|e| e.id == id) {
            let entry = self.entries.remove(pos);
            if let Some(marker) = entry.marker {
                sink.remove_marker(marker);
            }
        }
    }

    /// Revalidation restart: every marker comes down, every entry goes.
    pub fn clear_errors(&mut self, sink: &mut dyn MarkerSink) {
        for entry in self.entries.drain(..) {
            if let Some(marker) = entry.marker {
                sink.remove_marker(marker);
            }
        }
    }

    pub fn entries(&self) -> &[ErrorEntry] {
        &self.entries
    }

    fn entry_mut(&mut self, id: ErrorId) -> Option<&mut ErrorEntry> {
        self.entries.iter_mut().find(|e| e.id == id)
    }

    fn ids<F>(&self, filter: F) -> Vec<ErrorId>
    where
        F: Fn(&ErrorEntry) -> bool,
    {
        self.entries.iter().filter(|e| filter(e)).map(|e| e.id).collect()
    }
}

/// Everything a validation task may touch during a cycle.
pub struct ValidationContext<'a> {
    pub controller: &'a mut ValidationController,
    pub tree: &'a Tree,
    pub sink: &'a mut dyn MarkerSink,
}

/// Places markers for errors reported since the last drain.
#[derive(Debug)]
pub struct ProcessErrorsTask {
    batch_size: usize,
    snapshot: Vec<ErrorId>,
}

impl ProcessErrorsTask {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
            snapshot: Vec::new(),
        }
    }
}

impl Default for ProcessErrorsTask {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_SIZE)
    }
}

impl<'a> Task<ValidationContext<'a>> for ProcessErrorsTask {
    fn reset(&mut self, ctx: &mut ValidationContext<'a>) {
        self.snapshot = ctx.controller.ids(|e| e.marker.is_none());
        trace!(pending = self.snapshot.len(), "process-errors snapshot");
    }

    fn cycle(&mut self, ctx: &mut ValidationContext<'a>) -> bool {
        let batch = self.snapshot.len().min(self.batch_size);
        for id in self.snapshot.drain(..batch) {
            let Some(entry) = ctx.controller.entry_mut(id) else {
                continue;
            };
            if entry.marker.is_some() {
                continue;
            }
            if !entry.error.anchor.is_valid(ctx.tree) {
                trace!(?id, "stale anchor, skipping this cycle");
                continue;
            }
            entry.marker = Some(ctx.sink.place_marker(&entry.error.message, entry.error.anchor));
        }
        !self.snapshot.is_empty()
    }
}

/// Repositions the markers of already-rendered errors.
#[derive(Debug)]
pub struct RefreshErrorsTask {
    batch_size: usize,
    snapshot: Vec<ErrorId>,
}

impl RefreshErrorsTask {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
            snapshot: Vec::new(),
        }
    }
}

impl Default for RefreshErrorsTask {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_SIZE)
    }
}

impl<'a> Task<ValidationContext<'a>> for RefreshErrorsTask {
    fn reset(&mut self, ctx: &mut ValidationContext<'a>) {
        self.snapshot = ctx.controller.ids(|e| e.marker.is_some());
    }

    fn cycle(&mut self, ctx: &mut ValidationContext<'a>) -> bool {
        let batch = self.snapshot.len().min(self.batch_size);
        for id in self.snapshot.drain(..batch) {
            let Some(entry) = ctx.controller.entry_mut(id) else {
                continue;
            };
            let Some(marker) = entry.marker else {
                continue;
            };
            if !entry.error.anchor.is_valid(ctx.tree) {
                continue;
            }
            ctx.sink.move_marker(marker, entry.error.anchor);
        }
        !self.snapshot.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use weft_dom::QName;

    #[derive(Debug, Default)]
    struct RecordingSink {
        next: u64,
        placed: Vec<(MarkerId, String, Location)>,
        moved: Vec<(MarkerId, Location)>,
        removed: Vec<MarkerId>,
    }

    impl MarkerSink for RecordingSink {
        fn place_marker(&mut self, message: &str, anchor: Location) -> MarkerId {
            let id = MarkerId(self.next);
            self.next += 1;
            self.placed.push((id, message.to_string(), anchor));
            id
        }

        fn move_marker(&mut self, marker: MarkerId, anchor: Location) {
            self.moved.push((marker, anchor));
        }

        fn remove_marker(&mut self, marker: MarkerId) {
            self.removed.push(marker);
        }
    }

    fn doc_with_text() -> (Tree, weft_dom::NodeId) {
        let mut tree = Tree::new(QName::local("doc"));
        let p = tree.new_element(QName::local("p"), BTreeMap::new());
        let t = tree.new_text("hello");
        tree.attach(tree.root(), 0, p).unwrap();
        tree.attach(p, 0, t).unwrap();
        (tree, t)
    }

    fn report_n(controller: &mut ValidationController, tree: &Tree, anchor: weft_dom::NodeId, n: usize) -> Vec<ErrorId> {
        (0..n)
            .map(|i| {
                controller.report(ValidationError {
                    message: format!("error {i}"),
                    anchor: Location::make(tree, anchor, 0).unwrap(),
                })
            })
            .collect()
    }

    #[test]
    fn test_drain_takes_ceil_of_batches() {
        let (tree, t) = doc_with_text();
        let mut controller = ValidationController::new();
        report_n(&mut controller, &tree, t, 50);
        let mut sink = RecordingSink::default();

        let mut task = ProcessErrorsTask::new(24);
        let mut ctx = ValidationContext {
            controller: &mut controller,
            tree: &tree,
            sink: &mut sink,
        };
        task.reset(&mut ctx);
        let mut cycles = 0;
        while {
            cycles += 1;
            task.cycle(&mut ctx)
        } {}
        // ceil(50 / 24)
        assert_eq!(cycles, 3);
        assert_eq!(sink.placed.len(), 50);
        assert!(controller.entries().iter().all(|e| e.marker.is_some()));
    }

    #[test]
    fn test_reset_mid_drain_skips_fixed_errors() {
        let (tree, t) = doc_with_text();
        let mut controller = ValidationController::new();
        let ids = report_n(&mut controller, &tree, t, 3);
        let mut sink = RecordingSink::default();

        let mut task = ProcessErrorsTask::new(1);
        {
            let mut ctx = ValidationContext {
                controller: &mut controller,
                tree: &tree,
                sink: &mut sink,
            };
            task.reset(&mut ctx);
            assert!(task.cycle(&mut ctx));
        }
        assert_eq!(sink.placed.len(), 1);

        // The second error gets fixed while the drain is parked.
        controller.resolve(ids[1], &mut sink);

        let mut ctx = ValidationContext {
            controller: &mut controller,
            tree: &tree,
            sink: &mut sink,
        };
        task.reset(&mut ctx);
        while task.cycle(&mut ctx) {}

        assert_eq!(sink.placed.len(), 2);
        let marked: Vec<_> = controller.entries().iter().map(|e| e.id).collect();
        assert_eq!(marked, vec![ids[0], ids[2]]);
        assert!(controller.entries().iter().all(|e| e.marker.is_some()));
    }

    #[test]
    fn test_stale_anchor_skipped_without_marker() {
        let (mut tree, t) = doc_with_text();
        let mut controller = ValidationController::new();
        report_n(&mut controller, &tree, t, 1);
        let other = tree.new_text("later");
        let p = tree.parent(t).unwrap();
        tree.attach(p, 1, other).unwrap();
        controller.report(ValidationError {
            message: "dangling".into(),
            anchor: Location::make(&tree, other, 0).unwrap(),
        });
        tree.detach(other).unwrap();

        let mut sink = RecordingSink::default();
        let mut task = ProcessErrorsTask::new(24);
        {
            let mut ctx = ValidationContext {
                controller: &mut controller,
                tree: &tree,
                sink: &mut sink,
            };
            task.reset(&mut ctx);
            while task.cycle(&mut ctx) {}
        }

        assert_eq!(sink.placed.len(), 1);
        let dangling = &controller.entries()[1];
        assert!(dangling.marker.is_none());

        // Still pending: the next snapshot picks it up again.
        let mut ctx = ValidationContext {
            controller: &mut controller,
            tree: &tree,
            sink: &mut sink,
        };
        task.reset(&mut ctx);
        assert_eq!(task.snapshot.len(), 1);
    }

    #[test]
    fn test_refresh_moves_only_marked_errors() {
        let (tree, t) = doc_with_text();
        let mut controller = ValidationController::new();
        report_n(&mut controller, &tree, t, 3);
        let mut sink = RecordingSink::default();

        let mut process = ProcessErrorsTask::new(2);
        {
            let mut ctx = ValidationContext {
                controller: &mut controller,
                tree: &tree,
                sink: &mut sink,
            };
            process.reset(&mut ctx);
            // One cycle: two of three errors marked.
            assert!(process.cycle(&mut ctx));
        }
        assert_eq!(sink.placed.len(), 2);

        let mut refresh = RefreshErrorsTask::new(24);
        let mut ctx = ValidationContext {
            controller: &mut controller,
            tree: &tree,
            sink: &mut sink,
        };
        refresh.reset(&mut ctx);
        while refresh.cycle(&mut ctx) {}
        assert_eq!(sink.moved.len(), 2);
    }

    #[test]
    fn test_clear_errors_removes_markers() {
        let (tree, t) = doc_with_text();
        let mut controller = ValidationController::new();
        report_n(&mut controller, &tree, t, 2);
        let mut sink = RecordingSink::default();

        let mut task = ProcessErrorsTask::default();
        let mut ctx = ValidationContext {
            controller: &mut controller,
            tree: &tree,
            sink: &mut sink,
        };
        task.reset(&mut ctx);
        while task.cycle(&mut ctx) {}

        controller.clear_errors(&mut sink);
        assert!(controller.entries().is_empty());
        assert_eq!(sink.removed.len(), 2);
    }
}
