use crate::id::NodeId;
use crate::schema::NodeKind;
use thiserror::Error;

/// A caller broke a precondition of the mutation engine. The document is
/// left exactly as it was.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error("no live node at this index")]
    UnknownNode,

    #[error("{0:?} is fixed and cannot be moved")]
    Fixed(NodeId),

    #[error("{0:?} is not attached to anything")]
    NotAttached(NodeId),

    #[error("{0:?} is still attached; detach it first")]
    StillAttached(NodeId),

    #[error("{kind} has no child slot named {slot:?}")]
    NoSuchSlot { kind: NodeKind, slot: String },

    #[error("slot {slot:?} has no position {index}")]
    IndexOutOfRange { slot: String, index: usize },

    #[error("slot {slot:?} position {index} is already occupied")]
    Occupied { slot: String, index: usize },

    #[error("{0:?} cannot be placed inside its own subtree")]
    Cycle(NodeId),

    #[error("{0:?} has already been placed; only fresh nodes can be discarded")]
    NotFresh(NodeId),

    #[error("{kind} has no parameter named {attr:?}")]
    NoSuchParam { kind: NodeKind, attr: String },

    #[error("parameter {attr:?} of {kind} is a fixed constant")]
    ReadOnlyParam { kind: NodeKind, attr: String },

    #[error("value not allowed for parameter {attr:?} of {kind}")]
    InvalidValue { kind: NodeKind, attr: String },

    #[error("no template at this palette position")]
    UnknownTemplate,
}

/// The text handed to an import could not be parsed as JSON.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
}
