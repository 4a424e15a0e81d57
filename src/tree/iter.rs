use std::fmt;

use crate::model::TreePath;

use super::segment::SegmentId;
use super::source::NodeKey;

/// Validity epoch of the handles a composite gives out.
///
/// Advances on every structural change. Wraps through the whole `i32` range
/// and never takes the value 0, which marks an invalid handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Stamp(i32);

impl Stamp {
    pub const INVALID: Stamp = Stamp(0);
    pub const INITIAL: Stamp = Stamp(1);

    pub fn get(self) -> i32 {
        self.0
    }

    pub fn is_valid(self) -> bool {
        self != Stamp::INVALID
    }

    /// The stamp following this one
    pub fn next(self) -> Stamp {
        match self.0.wrapping_add(1) {
            0 => Stamp(1),
            n => Stamp(n),
        }
    }
}

impl Default for Stamp {
    fn default() -> Self {
        Stamp::INITIAL
    }
}

impl fmt::Display for Stamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle to a resolved row of a composite tree.
///
/// Only valid while the composite's stamp equals the one recorded here.
/// Two handles for the same row issued under the same stamp compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TreeIter {
    pub(crate) stamp: Stamp,
    pub(crate) segment: SegmentId,
    pub(crate) node: NodeKey,
    /// Path inside the owning source
    pub(crate) local: TreePath,
}

impl TreeIter {
    pub fn stamp(&self) -> Stamp {
        self.stamp
    }

    pub fn segment(&self) -> SegmentId {
        self.segment
    }

    /// The source's own handle for this row
    pub fn node(&self) -> NodeKey {
        self.node
    }

    pub fn local_path(&self) -> &TreePath {
        &self.local
    }
}
