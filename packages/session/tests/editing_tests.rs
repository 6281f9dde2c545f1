//! End-to-end session scenarios: edits flowing from transformation to
//! mirror to listener, with undo, saving and validation on top.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use weft_dom::{serialize, Location, NodeId, QName, Tree};
use weft_editor::{
    DocumentEditor, EditorError, MemorySaver, SaveKind, SaveOutcome, Transformation,
    TransformationData, TransformationKind,
};
use weft_session::{QueuedInvoke, Session, SessionOptions};
use weft_view::{Caret, Delivery, EventClass, GenericMode, Selector};

fn sample_tree() -> (Tree, NodeId, NodeId) {
    let mut tree = Tree::new(QName::local("doc"));
    let p = tree.new_element(QName::local("p"), BTreeMap::new());
    let t = tree.new_text("The quick fox");
    tree.attach(tree.root(), 0, p).unwrap();
    tree.attach(p, 0, t).unwrap();
    (tree, p, t)
}

fn session_over(
    tree: Tree,
    options: SessionOptions,
) -> Session<GenericMode, MemorySaver> {
    Session::new(tree, GenericMode::new(), MemorySaver::new(), options).unwrap()
}

fn wrap_data(tree: &Tree, t: NodeId, from: usize, to: usize) -> TransformationData {
    TransformationData::range(
        Location::make(tree, t, from).unwrap(),
        Location::make(tree, t, to).unwrap(),
    )
    .with_name(QName::local("note"))
}

#[test]
fn test_wrap_reaches_both_trees() {
    let (tree, _, t) = sample_tree();
    let mut session = session_over(tree, SessionOptions::default());

    let data = wrap_data(session.document(), t, 4, 7);
    let caret = session.invoke("wrap", &data).unwrap();
    assert!(caret.is_some());

    let expected = "<doc><p>The <note>qui</note>ck fox</p></doc>";
    assert_eq!(serialize(session.document()), expected);
    assert_eq!(serialize(session.gui()), expected);
    assert!(session.mirror().index().is_consistent());
}

#[test]
fn test_undo_redo_converge_everywhere() {
    let (tree, p, t) = sample_tree();
    let mut session = session_over(tree, SessionOptions::default());
    let original = serialize(session.document());

    let data = wrap_data(session.document(), t, 4, 7);
    session.invoke("wrap", &data).unwrap();

    assert!(session.undo().unwrap());
    assert_eq!(serialize(session.document()), original);
    assert_eq!(serialize(session.gui()), original);
    // One text child again, and only doc + p left in the index.
    assert_eq!(session.document().children(p), &[t]);
    assert_eq!(session.mirror().index().len(), 2);
    assert!(session.mirror().index().is_consistent());

    assert!(session.redo().unwrap());
    let wrapped = "<doc><p>The <note>qui</note>ck fox</p></doc>";
    assert_eq!(serialize(session.document()), wrapped);
    assert_eq!(serialize(session.gui()), wrapped);
    assert!(session.mirror().index().is_consistent());
}

#[test]
fn test_failed_transformation_leaves_no_trace() {
    let (tree, _, t) = sample_tree();
    let mut session = session_over(tree, SessionOptions::default());
    let original = serialize(session.document());

    // Reversed range: the wrap fails validation inside its transaction.
    let data = TransformationData::range(
        Location::make(session.document(), t, 7).unwrap(),
        Location::make(session.document(), t, 4).unwrap(),
    )
    .with_name(QName::local("note"));
    assert!(session.invoke("wrap", &data).is_err());

    assert_eq!(serialize(session.document()), original);
    assert_eq!(serialize(session.gui()), original);
    assert!(!session.can_undo());
    assert!(!session.editor().has_open_transaction());
}

fn append_bang(
    editor: &mut DocumentEditor,
    _data: &TransformationData,
) -> Result<Option<Location>, EditorError> {
    let root = editor.tree().root();
    let p = editor.tree().children(root)[0];
    let last = *editor.tree().children(p).last().unwrap();
    let end = Location::make(editor.tree(), last, editor.tree().len(last))?;
    let insertion = editor.insert_text(end, "!")?;
    Ok(Some(insertion.end))
}

#[test]
fn test_handler_edit_defers_to_next_turn() {
    let (tree, _, t) = sample_tree();
    let mut session = session_over(tree, SessionOptions::default());
    session.registry_mut().register(Transformation::new(
        "append-bang",
        TransformationKind::Insert,
        "append bang",
        append_bang,
    ));

    let queue = session.invoke_queue();
    session.add_handler(
        EventClass::Added,
        Selector::named(QName::local("note")),
        Box::new(move |_tree, delivery| {
            if matches!(delivery, Delivery::Added { .. }) {
                queue.borrow_mut().push(QueuedInvoke {
                    name: "append-bang".into(),
                    data: TransformationData::default(),
                });
            }
        }),
    );

    let data = wrap_data(session.document(), t, 4, 7);
    session.invoke("wrap", &data).unwrap();

    // The handler's edit landed in a follow-up turn of the same call.
    let expected = "<doc><p>The <note>qui</note>ck fox!</p></doc>";
    assert_eq!(serialize(session.document()), expected);
    assert_eq!(serialize(session.gui()), expected);

    // Two separate undo steps: the deferred edit committed on its own.
    assert!(session.undo().unwrap());
    assert_eq!(
        serialize(session.document()),
        "<doc><p>The <note>qui</note>ck fox</p></doc>"
    );
    assert!(session.undo().unwrap());
    assert_eq!(serialize(session.document()), "<doc><p>The quick fox</p></doc>");
}

#[test]
fn test_caret_notifications_flush_after_delivery() {
    let (tree, _, t) = sample_tree();
    let mut session = session_over(tree, SessionOptions::default());

    let seen: Rc<RefCell<Vec<Caret>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    session.on_caret_change(move |caret| sink.borrow_mut().push(caret.clone()));

    let end = Location::make(session.document(), t, 13).unwrap();
    session.collapse_to_data(end).unwrap();
    // Queued, not delivered, until the pipeline settles.
    assert!(seen.borrow().is_empty());
    session.flush().unwrap();
    assert_eq!(seen.borrow().len(), 1);
    assert!(matches!(seen.borrow()[0], Caret::Collapsed(_)));

    // The wrap shortens the caret's text node to "The "; offset 13 no
    // longer exists, so delivery ends with a cleared caret.
    let data = wrap_data(session.document(), t, 4, 7);
    session.invoke("wrap", &data).unwrap();
    assert_eq!(seen.borrow().len(), 2);
    assert_eq!(seen.borrow()[1], Caret::None);
}

#[test]
fn test_autosave_and_save_outcomes() {
    let (tree, _, t) = sample_tree();
    let mut options = SessionOptions::default();
    options.autosave_every = 2;
    let mut session = session_over(tree, options);
    assert!(!session.is_dirty());

    let end = Location::make(session.document(), t, 13).unwrap();
    let data = TransformationData::at(end).with_text("!");
    session.invoke("insert-text", &data).unwrap();
    assert!(session.is_dirty());
    assert!(session.saver().saved().is_empty());

    let end = Location::make(session.document(), t, 14).unwrap();
    let data = TransformationData::at(end).with_text("?");
    session.invoke("insert-text", &data).unwrap();

    // Second committed edit triggered the autosave.
    assert_eq!(session.saver().saved().len(), 1);
    assert_eq!(session.saver().saved()[0].0, SaveKind::Auto);
    assert_eq!(
        session.saver().last_saved(),
        Some("<doc><p>The quick fox!?</p></doc>")
    );
    assert!(!session.is_dirty());

    session.saver_mut().fail_next(SaveOutcome::Transient("offline".into()));
    let end = Location::make(session.document(), t, 15).unwrap();
    let data = TransformationData::at(end).with_text(".");
    session.invoke("insert-text", &data).unwrap();
    let outcome = session.save(SaveKind::Manual);
    assert!(outcome.is_retriable());
    assert!(session.is_dirty());

    assert!(session.save(SaveKind::Manual).is_saved());
    assert!(!session.is_dirty());
}

#[test]
fn test_validation_markers_through_idle_ticks() {
    let (tree, _, t) = sample_tree();
    let mut session = session_over(tree, SessionOptions::default());

    let anchor = Location::make(session.document(), t, 4).unwrap();
    let ids: Vec<_> = (0..3)
        .map(|i| session.report_error(format!("problem {i}"), anchor))
        .collect();
    assert!(session.markers().is_empty());

    // Default batch of 24 drains all three in one tick.
    session.idle_tick();
    assert_eq!(session.markers().len(), 3);

    // A fixed error takes its marker down with it.
    session.resolve_error(ids[1]);
    assert_eq!(session.markers().len(), 2);

    // An edit schedules a refresh pass over the surviving markers.
    let end = Location::make(session.document(), t, 13).unwrap();
    let data = TransformationData::at(end).with_text("!");
    session.invoke("insert-text", &data).unwrap();
    session.idle_tick();
    assert_eq!(session.markers().len(), 2);

    session.restart_validation();
    assert!(session.markers().is_empty());

    let outcome = session.shutdown();
    assert!(outcome.is_saved());
}
