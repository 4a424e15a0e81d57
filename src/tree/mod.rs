//! The composite tree index and the pieces it is made of.

pub mod column;
pub mod combined;
pub mod fixed;
pub mod iter;
pub mod propagate;
pub mod segment;
pub mod source;

pub use column::{Column, ColumnSet};
pub use combined::{CombinedTree, Listener, ListenerId};
pub use fixed::FixedList;
pub use iter::{Stamp, TreeIter};
pub use propagate::TreeEvent;
pub use segment::{Segment, SegmentId, SegmentTable};
pub use source::{Emitter, EventSink, NodeKey, SinkId, SourceEvent, SourceRef, TreeSource};

use crate::model::{TreePath, ValueKind};

/// Error type for composite tree operations
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    #[error("index {index} out of range (0..{size})")]
    IndexOutOfRange { index: usize, size: usize },
    #[error("no row at path {0}")]
    NoSuchRow(TreePath),
    #[error("the root path does not address a row")]
    EmptyPath,
    #[error("source is already registered as {0}")]
    DuplicateSource(SegmentId),
    #[error("source is not registered")]
    UnknownSource,
    #[error("unknown {0}")]
    UnknownSegment(SegmentId),
    #[error("invalid position {position} (0..={len})")]
    InvalidPosition { position: usize, len: usize },
    #[error("{0} would shrink below zero rows")]
    SegmentUnderflow(SegmentId),
    #[error("stale iterator: stamp {iter} does not match current stamp {current}")]
    StaleIter { iter: Stamp, current: Stamp },
    #[error("invalid reorder: {0}")]
    InvalidReorder(String),
    #[error("inconsistent segment table: {0}")]
    Inconsistent(String),
    #[error("a column set needs at least one column")]
    NoColumns,
    #[error("column {column} out of range (0..{n_columns})")]
    ColumnOutOfRange { column: usize, n_columns: usize },
    #[error("column {column} holds {expected} values, projection produced {found}")]
    ValueKindMismatch {
        column: usize,
        expected: ValueKind,
        found: ValueKind,
    },
    #[error("listener failed: {0}")]
    Listener(Box<dyn std::error::Error>),
}
