use serde::Serialize;

use crate::model::TreePath;

use super::combined::CombinedTree;
use super::iter::TreeIter;
use super::segment::SegmentId;
use super::source::SourceEvent;
use super::TreeError;

/// A change re-emitted by the composite, in virtual addressing.
///
/// Handles are built from the node the source named, so they reach the
/// right row even when later changes of the same source are still queued.
/// A reorder of the virtual root has no handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TreeEvent {
    RowChanged {
        path: TreePath,
        #[serde(skip)]
        iter: TreeIter,
    },
    RowDeleted {
        path: TreePath,
    },
    RowInserted {
        path: TreePath,
        #[serde(skip)]
        iter: TreeIter,
    },
    HasChildToggled {
        path: TreePath,
        #[serde(skip)]
        iter: TreeIter,
    },
    /// `new_order[new_position] = old_position` over all children of `path`
    RowsReordered {
        path: TreePath,
        #[serde(skip)]
        iter: Option<TreeIter>,
        new_order: Vec<usize>,
    },
}

impl TreeEvent {
    pub fn path(&self) -> &TreePath {
        match self {
            TreeEvent::RowChanged { path, .. }
            | TreeEvent::RowDeleted { path }
            | TreeEvent::RowInserted { path, .. }
            | TreeEvent::HasChildToggled { path, .. }
            | TreeEvent::RowsReordered { path, .. } => path,
        }
    }

    /// Whether the event changed the shape of the tree (and the stamp)
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            TreeEvent::RowDeleted { .. }
                | TreeEvent::RowInserted { .. }
                | TreeEvent::RowsReordered { .. }
        )
    }
}

impl<T> CombinedTree<T> {
    /// Apply one source event: update the segment table, invalidate handles
    /// if the shape changed, then re-emit the event in virtual addressing.
    pub fn handle_event(&mut self, segment: SegmentId, event: SourceEvent) -> Result<TreeEvent, TreeError> {
        let span = self.span.clone();
        let _enter = span.enter();

        if let Err(e) = self.segments.get(segment) {
            tracing::error!(%segment, ?event, "event from a source that is not registered");
            return Err(e);
        }

        let translated = match event {
            SourceEvent::RowChanged { path: local, node } => {
                let path = self.virtual_row_path(segment, &local)?;
                let iter = self.handle_for(segment, node, local);
                TreeEvent::RowChanged { path, iter }
            }
            SourceEvent::RowInserted { path: local, node } => {
                let path = self.virtual_row_path(segment, &local)?;
                if local.depth() == 1 {
                    self.segments.resize(segment, 1)?;
                }
                self.invalidate();
                let iter = self.handle_for(segment, node, local);
                TreeEvent::RowInserted { path, iter }
            }
            SourceEvent::RowDeleted { path: local } => {
                let path = self.virtual_row_path(segment, &local)?;
                if local.depth() == 1 {
                    self.segments.resize(segment, -1)?;
                }
                self.invalidate();
                TreeEvent::RowDeleted { path }
            }
            SourceEvent::HasChildToggled { path: local, node } => {
                let path = self.virtual_row_path(segment, &local)?;
                let node = node.ok_or_else(|| TreeError::NoSuchRow(path.clone()))?;
                let iter = self.handle_for(segment, node, local);
                TreeEvent::HasChildToggled { path, iter }
            }
            SourceEvent::RowsReordered {
                path: local,
                node,
                new_order,
            } => {
                let path = self.segments.to_virtual_path(segment, &local)?;
                let new_order = if local.is_root() {
                    self.widen_root_order(segment, &new_order)?
                } else {
                    new_order
                };
                self.invalidate();
                let iter = match node {
                    Some(node) if !local.is_root() => Some(self.handle_for(segment, node, local)),
                    _ => None,
                };
                TreeEvent::RowsReordered {
                    path,
                    iter,
                    new_order,
                }
            }
        };

        tracing::debug!(%segment, event = ?translated, stamp = %self.stamp, "propagating");
        self.emit(&translated)?;
        Ok(translated)
    }

    /// Drain every queued source event, in arrival order. Returns how many
    /// events were applied. Events after a failing one stay queued.
    ///
    /// Once this returns `Ok` the table matches every source again.
    pub fn pump(&mut self) -> Result<usize, TreeError> {
        let mut handled = 0;
        while let Ok((segment, event)) = self.events.try_recv() {
            self.handle_event(segment, event)?;
            handled += 1;
        }
        Ok(handled)
    }

    fn virtual_row_path(&self, segment: SegmentId, local: &TreePath) -> Result<TreePath, TreeError> {
        if local.is_root() {
            return Err(TreeError::EmptyPath);
        }
        self.segments.to_virtual_path(segment, local)
    }

    /// Turn a permutation of one segment's rows into a permutation of the
    /// whole root level, leaving every other segment's rows in place.
    fn widen_root_order(&self, segment: SegmentId, new_order: &[usize]) -> Result<Vec<usize>, TreeError> {
        let seg = self.segments.get(segment)?;
        if new_order.len() != seg.size() {
            return Err(TreeError::InvalidReorder(format!(
                "{} entries for the {} rows of {}",
                new_order.len(),
                seg.size(),
                segment
            )));
        }
        let mut seen = vec![false; seg.size()];
        for &old in new_order {
            if old >= seen.len() || seen[old] {
                return Err(TreeError::InvalidReorder(format!(
                    "{:?} is not a permutation",
                    new_order
                )));
            }
            seen[old] = true;
        }

        let mut order: Vec<usize> = (0..self.segments.total_size()).collect();
        for (i, old) in new_order.iter().enumerate() {
            order[seg.start() + i] = old + seg.start();
        }
        Ok(order)
    }
}
