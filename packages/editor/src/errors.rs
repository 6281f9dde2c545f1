//! Error types for the editor

use thiserror::Error;
use weft_dom::{LocationError, NodeId, TreeError};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditorError {
    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error(transparent)]
    Location(#[from] LocationError),

    #[error("no transaction is open")]
    NoOpenTransaction,

    #[error("a transaction is already open: {0:?}")]
    TransactionAlreadyOpen(String),

    #[error("invalid range: {0}")]
    InvalidRange(String),

    #[error("node {0:?} is not of the kind this operation requires")]
    WrongNodeKind(NodeId),

    #[error("transformation {0:?} needs {1} but none was supplied")]
    MissingInput(String, &'static str),

    #[error("unknown transformation: {0:?}")]
    UnknownTransformation(String),

    #[error("undo history is disabled after an earlier consistency failure")]
    HistoryDisabled,

    #[error("undo consistency failure: {0}")]
    UndoConsistency(String),
}
