//! The editing session: one document, both trees, all managers.
//!
//! A session runs on a single logical thread. Every entry point that
//! edits follows the same pipeline:
//!
//! 1. the transformation fires inside a transaction on the data tree,
//! 2. the emitted data events replay onto the GUI mirror,
//! 3. the mirror's GUI events go out through the listener,
//! 4. edits queued by handlers run as the next turn, back at step 1,
//! 5. once no turn produced new work, caret notifications flush.
//!
//! Handlers never mutate mid-dispatch; they push [`QueuedInvoke`]
//! records onto the shared queue and the session runs them between
//! turns.

use crate::{MarkerStore, SessionError, SessionOptions};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, warn};
use weft_dom::{serialize, Location, Tree};
use weft_editor::{
    DocumentEditor, SaveKind, SaveOutcome, Saver, TransformationData, TransformationRegistry,
};
use weft_tasks::{
    ErrorId, ProcessErrorsTask, RefreshErrorsTask, TaskRunner, ValidationContext,
    ValidationController, ValidationError,
};
use weft_view::{
    data_to_gui, gui_to_data, Caret, CaretManager, EventClass, Listener, ListenerHandler, Mirror,
    Mode, Selector,
};

/// An edit requested by a listener handler, deferred to the next turn.
pub struct QueuedInvoke {
    pub name: String,
    pub data: TransformationData,
}

/// Shared with handlers; they push, the session drains between turns.
pub type InvokeQueue = Rc<RefCell<Vec<QueuedInvoke>>>;

/// Turns the delivery pipeline is allowed to take before the session
/// concludes handlers are feeding each other forever.
const MAX_TURNS: usize = 32;

pub struct Session<M: Mode, S: Saver> {
    editor: DocumentEditor,
    mirror: Mirror,
    mode: M,
    listener: Listener,
    caret: CaretManager,
    caret_observers: Vec<Box<dyn FnMut(&Caret)>>,
    registry: TransformationRegistry,
    queue: InvokeQueue,
    saver: S,
    controller: ValidationController,
    process: TaskRunner<ProcessErrorsTask>,
    refresh: TaskRunner<RefreshErrorsTask>,
    markers: MarkerStore,
    options: SessionOptions,
    saved_generation: u64,
    edits_since_save: usize,
    /// Layout changed since the markers were last repositioned.
    refresh_pending: bool,
}

impl<M: Mode, S: Saver> Session<M, S> {
    pub fn new(tree: Tree, mode: M, saver: S, options: SessionOptions) -> Result<Self, SessionError> {
        let mirror = Mirror::new(&tree, &mode)?;
        let saved_generation = tree.generation();
        let editor = DocumentEditor::new(tree, options.max_undo_levels);
        let process = TaskRunner::new(
            ProcessErrorsTask::new(options.task_batch_size),
            options.max_cycles_per_step,
        );
        let refresh = TaskRunner::new(
            RefreshErrorsTask::new(options.task_batch_size),
            options.max_cycles_per_step,
        );
        Ok(Self {
            editor,
            mirror,
            mode,
            listener: Listener::new(),
            caret: CaretManager::new(),
            caret_observers: Vec::new(),
            registry: TransformationRegistry::with_builtins(),
            queue: Rc::new(RefCell::new(Vec::new())),
            saver,
            controller: ValidationController::new(),
            process,
            refresh,
            markers: MarkerStore::new(),
            options,
            saved_generation,
            edits_since_save: 0,
            refresh_pending: false,
        })
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn document(&self) -> &Tree {
        self.editor.tree()
    }

    pub fn gui(&self) -> &Tree {
        self.mirror.gui()
    }

    pub fn mirror(&self) -> &Mirror {
        &self.mirror
    }

    pub fn editor(&self) -> &DocumentEditor {
        &self.editor
    }

    pub fn registry_mut(&mut self) -> &mut TransformationRegistry {
        &mut self.registry
    }

    pub fn markers(&self) -> &MarkerStore {
        &self.markers
    }

    pub fn saver(&self) -> &S {
        &self.saver
    }

    pub fn saver_mut(&mut self) -> &mut S {
        &mut self.saver
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn add_handler(&mut self, class: EventClass, selector: Selector, handler: ListenerHandler) {
        self.listener.add_handler(class, selector, handler);
    }

    /// The queue handlers push deferred edits onto.
    pub fn invoke_queue(&self) -> InvokeQueue {
        Rc::clone(&self.queue)
    }

    // ------------------------------------------------------------------
    // Editing
    // ------------------------------------------------------------------

    /// Fire a registered transformation and deliver its consequences.
    ///
    /// On handler failure the transaction rolls back; the rollback's
    /// events still go through the mirror and listener, so downstream
    /// state converges on the reverted document before the error
    /// propagates.
    pub fn invoke(
        &mut self,
        name: &str,
        data: &TransformationData,
    ) -> Result<Option<Location>, SessionError> {
        let fired = self.registry.fire(name, &mut self.editor, data);
        let synced = self.sync();
        let location = fired?;
        synced?;
        self.note_committed_edit();
        Ok(location)
    }

    pub fn can_undo(&self) -> bool {
        self.editor.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.editor.can_redo()
    }

    pub fn undo(&mut self) -> Result<bool, SessionError> {
        let undone = self.editor.undo();
        let synced = self.sync();
        let undone = undone?;
        synced?;
        if undone {
            self.note_committed_edit();
        }
        Ok(undone)
    }

    pub fn redo(&mut self) -> Result<bool, SessionError> {
        let redone = self.editor.redo();
        let synced = self.sync();
        let redone = redone?;
        synced?;
        if redone {
            self.note_committed_edit();
        }
        Ok(redone)
    }

    /// Deliver anything still queued: the initial render, caret moves
    /// made outside an edit.
    pub fn flush(&mut self) -> Result<(), SessionError> {
        self.sync()
    }

    fn sync(&mut self) -> Result<(), SessionError> {
        for _ in 0..MAX_TURNS {
            let events = self.editor.take_events();
            if !events.is_empty() {
                self.mirror.apply_all(self.editor.tree(), &events, &self.mode)?;
            }
            let gui_events = self.mirror.take_gui_events();
            if !gui_events.is_empty() {
                self.listener.dispatch(self.mirror.gui(), &gui_events);
                if !self.markers.is_empty() {
                    self.refresh_pending = true;
                }
            }
            let queued: Vec<QueuedInvoke> = self.queue.borrow_mut().drain(..).collect();
            if gui_events.is_empty() && queued.is_empty() {
                self.caret.refresh(self.mirror.gui());
                self.flush_caret_notifications();
                return Ok(());
            }
            for edit in queued {
                self.registry.fire(&edit.name, &mut self.editor, &edit.data)?;
            }
        }
        Err(SessionError::HandlerLoop(MAX_TURNS))
    }

    // ------------------------------------------------------------------
    // Caret
    // ------------------------------------------------------------------

    pub fn caret(&self) -> &Caret {
        self.caret.caret()
    }

    /// Collapse the caret to a GUI location.
    pub fn collapse_to(&mut self, gui: Location) {
        self.caret.set(gui);
    }

    /// Collapse the caret to a data location, translated to its GUI
    /// rendition.
    pub fn collapse_to_data(&mut self, data: Location) -> Result<(), SessionError> {
        let gui = data_to_gui(&self.mirror, self.editor.tree(), data)?;
        self.caret.set(gui);
        Ok(())
    }

    pub fn extend_to(&mut self, anchor: Location, focus: Location) {
        self.caret.set_range(anchor, focus);
    }

    pub fn clear_caret(&mut self) {
        self.caret.clear();
    }

    /// The caret's focus in data coordinates; the authoritative position
    /// for commands.
    pub fn data_caret(&self) -> Result<Option<Location>, SessionError> {
        Ok(self.caret.data_focus(&self.mirror, self.editor.tree())?)
    }

    /// Translate an arbitrary GUI location to data coordinates.
    pub fn to_data_location(&self, gui: Location) -> Result<Location, SessionError> {
        Ok(gui_to_data(&self.mirror, self.editor.tree(), gui)?)
    }

    pub fn on_caret_change(&mut self, observer: impl FnMut(&Caret) + 'static) {
        self.caret_observers.push(Box::new(observer));
    }

    fn flush_caret_notifications(&mut self) {
        if let Some(caret) = self.caret.take_change() {
            for observer in &mut self.caret_observers {
                observer(&caret);
            }
        }
    }

    // ------------------------------------------------------------------
    // Saving
    // ------------------------------------------------------------------

    pub fn is_dirty(&self) -> bool {
        self.editor.tree().generation() != self.saved_generation
    }

    pub fn save(&mut self, kind: SaveKind) -> SaveOutcome {
        let serialized = serialize(self.editor.tree());
        let outcome = self.saver.save(kind, &serialized);
        match &outcome {
            SaveOutcome::Saved => {
                self.saved_generation = self.editor.tree().generation();
                self.edits_since_save = 0;
                debug!(?kind, "document saved");
            }
            other => warn!(?kind, outcome = ?other, "save did not take"),
        }
        outcome
    }

    fn note_committed_edit(&mut self) {
        self.edits_since_save += 1;
        if self.options.autosave_every > 0 && self.edits_since_save >= self.options.autosave_every
        {
            self.save(SaveKind::Auto);
        }
    }

    /// Terminate background work and attempt a last save of unsaved
    /// changes.
    pub fn shutdown(&mut self) -> SaveOutcome {
        self.process.terminate();
        self.refresh.terminate();
        if self.is_dirty() {
            self.save(SaveKind::Recover)
        } else {
            SaveOutcome::Saved
        }
    }

    // ------------------------------------------------------------------
    // Validation
    // ------------------------------------------------------------------

    /// Accept an error from the external validator stream.
    pub fn report_error(&mut self, message: impl Into<String>, anchor: Location) -> ErrorId {
        self.controller.report(ValidationError {
            message: message.into(),
            anchor,
        })
    }

    /// The validator reports an error fixed; its marker comes down.
    pub fn resolve_error(&mut self, id: ErrorId) {
        self.controller.resolve(id, &mut self.markers);
    }

    /// Revalidation from scratch: drop every error and marker.
    pub fn restart_validation(&mut self) {
        self.controller.clear_errors(&mut self.markers);
    }

    /// The host's idle tick: drives both validation runners one bounded
    /// step. Returns `true` while background work remains.
    pub fn idle_tick(&mut self) -> bool {
        let has_pending = self
            .controller
            .entries()
            .iter()
            .any(|entry| entry.marker.is_none());
        let has_marked = self
            .controller
            .entries()
            .iter()
            .any(|entry| entry.marker.is_some());

        let mut ctx = ValidationContext {
            controller: &mut self.controller,
            tree: self.editor.tree(),
            sink: &mut self.markers,
        };
        if has_pending && !self.process.is_running() {
            self.process.start(&mut ctx);
        }
        if self.refresh_pending {
            if has_marked && !self.refresh.is_running() {
                self.refresh.start(&mut ctx);
            }
            self.refresh_pending = false;
        }
        let processing = self.process.step(&mut ctx);
        let refreshing = self.refresh.step(&mut ctx);
        processing || refreshing
    }
}
