use std::fmt;
use std::sync::mpsc;

use crate::model::{TreePath, Value, ValueKind};

use super::column::ColumnSet;
use super::iter::{Stamp, TreeIter};
use super::propagate::TreeEvent;
use super::segment::{contract_violation, SegmentId, SegmentTable};
use super::source::{NodeKey, SourceEvent, SourceRef};
use super::TreeError;

/// Callback notified of every event the composite emits.
///
/// Runs after all bookkeeping for the event is done, with read access to the
/// composite. The segment table then agrees with every event delivered so
/// far. Sources may already be further along when more events are still
/// queued behind this one, so handles carried by the event are the reliable
/// way to reach its row.
pub type Listener<T> =
    Box<dyn FnMut(&TreeEvent, &CombinedTree<T>) -> Result<(), Box<dyn std::error::Error>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u32);

/// Several sources presented as one tree.
///
/// Root-level rows are the concatenation of every source's root rows, in
/// registration order. Everything below a root row is the owning source's
/// own subtree, addressed exactly as the source addresses it.
pub struct CombinedTree<T> {
    pub(crate) segments: SegmentTable<T>,
    columns: ColumnSet<T>,
    pub(crate) stamp: Stamp,
    pub(crate) events: mpsc::Receiver<(SegmentId, SourceEvent)>,
    pub(crate) listeners: Vec<(ListenerId, Listener<T>)>,
    next_listener: u32,
    pub(crate) span: tracing::Span,
}

impl<T> CombinedTree<T> {
    /// An empty composite exposing `columns`
    pub fn new(columns: ColumnSet<T>) -> Self {
        let (tx, rx) = mpsc::channel();
        CombinedTree {
            segments: SegmentTable::new(tx),
            columns,
            stamp: Stamp::INITIAL,
            events: rx,
            listeners: Vec::new(),
            next_listener: 0,
            span: tracing::debug_span!("combined_tree"),
        }
    }

    /// Build a composite over `sources`, in order. Nothing is emitted while
    /// building.
    pub fn with_sources(
        columns: ColumnSet<T>,
        sources: impl IntoIterator<Item = SourceRef<T>>,
    ) -> Result<Self, TreeError> {
        let mut tree = CombinedTree::new(columns);
        for source in sources {
            let position = tree.segments.len();
            tree.segments.register(source, position)?;
        }
        Ok(tree)
    }

    /// Log everything this composite does inside `span`
    pub fn with_span(mut self, span: tracing::Span) -> Self {
        self.span = span;
        self
    }

    pub fn stamp(&self) -> Stamp {
        self.stamp
    }

    pub fn segments(&self) -> &SegmentTable<T> {
        &self.segments
    }

    pub fn columns(&self) -> &ColumnSet<T> {
        &self.columns
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn column_kind(&self, column: usize) -> Result<ValueKind, TreeError> {
        self.columns.kind(column)
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    /// Add `source` at `position` while the tree is live.
    ///
    /// The new segment grows one row at a time and every row is announced
    /// with its own `RowInserted`.
    pub fn register(&mut self, source: SourceRef<T>, position: usize) -> Result<SegmentId, TreeError> {
        let span = self.span.clone();
        let _enter = span.enter();
        self.pump()?;

        let size = source.n_children(None);
        let id = self.segments.insert(source, position, 0)?;
        for _ in 0..size {
            self.segments.resize(id, 1)?;
            self.invalidate();
            let path = TreePath::from([self.segments.get(id)?.end() - 1]);
            let iter = self.get_iter(&path)?;
            self.emit(&TreeEvent::RowInserted { path, iter })?;
        }
        Ok(id)
    }

    /// Remove `source` while the tree is live, announcing every root row it
    /// took away, last row first.
    pub fn unregister(&mut self, source: &SourceRef<T>) -> Result<SegmentId, TreeError> {
        let span = self.span.clone();
        let _enter = span.enter();
        self.pump()?;

        let id = match self.segments.segment_for_source(source) {
            Ok(segment) => segment.id(),
            Err(e) => return Err(contract_violation(e)),
        };
        while self.segments.get(id)?.size() > 0 {
            self.segments.resize(id, -1)?;
            self.invalidate();
            let path = TreePath::from([self.segments.get(id)?.end()]);
            self.emit(&TreeEvent::RowDeleted { path })?;
        }
        self.segments.remove(id)?;
        self.invalidate();
        Ok(id)
    }

    // -----------------------------------------------------------------------
    // Listeners
    // -----------------------------------------------------------------------

    pub fn connect(
        &mut self,
        listener: impl FnMut(&TreeEvent, &CombinedTree<T>) -> Result<(), Box<dyn std::error::Error>>
        + 'static,
    ) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns false if no such listener was connected
    pub fn disconnect(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(l, _)| *l != id);
        self.listeners.len() != before
    }

    /// Run every listener on `event`, in connection order. Stops at the
    /// first failing listener.
    pub(crate) fn emit(&mut self, event: &TreeEvent) -> Result<(), TreeError> {
        let mut listeners = std::mem::take(&mut self.listeners);
        let this: &Self = self;
        let result = listeners
            .iter_mut()
            .try_for_each(|(_, listener)| listener(event, this).map_err(TreeError::Listener));
        self.listeners = listeners;
        result
    }

    /// Advance the stamp and drop every cached handle
    pub(crate) fn invalidate(&mut self) {
        self.stamp = self.stamp.next();
        self.segments.clear_caches();
        tracing::trace!(stamp = %self.stamp, "handles invalidated");
    }

    // -----------------------------------------------------------------------
    // Resolution
    // -----------------------------------------------------------------------

    /// Resolve a virtual path to a handle. Repeated lookups under the same
    /// stamp return the cached handle.
    pub fn get_iter(&self, path: &TreePath) -> Result<TreeIter, TreeError> {
        let (id, local) = self
            .segments
            .to_source_path(path)?
            .ok_or(TreeError::EmptyPath)?;
        let segment = self.segments.get(id)?;
        if let Some(iter) = segment.cached(&local) {
            return Ok(iter);
        }
        let node = segment
            .source()
            .lookup(&local)
            .ok_or_else(|| TreeError::NoSuchRow(path.clone()))?;
        let iter = TreeIter {
            stamp: self.stamp,
            segment: id,
            node,
            local,
        };
        segment.remember(iter.clone());
        Ok(iter)
    }

    /// A handle for a node a source named in an event, valid under the
    /// current stamp. Not cached: the path is the one the event reported.
    pub(crate) fn handle_for(&self, segment: SegmentId, node: NodeKey, local: TreePath) -> TreeIter {
        TreeIter {
            stamp: self.stamp,
            segment,
            node,
            local,
        }
    }

    pub fn is_valid(&self, iter: &TreeIter) -> bool {
        iter.stamp == self.stamp
    }

    fn check_iter(&self, iter: &TreeIter) -> Result<(), TreeError> {
        if iter.stamp != self.stamp {
            return Err(TreeError::StaleIter {
                iter: iter.stamp,
                current: self.stamp,
            });
        }
        Ok(())
    }

    /// The virtual path of a handle
    pub fn get_path(&self, iter: &TreeIter) -> Result<TreePath, TreeError> {
        self.check_iter(iter)?;
        self.segments.to_virtual_path(iter.segment, &iter.local)
    }

    pub fn row(&self, iter: &TreeIter) -> Result<T, TreeError> {
        self.check_iter(iter)?;
        let segment = self.segments.get(iter.segment)?;
        match segment.source().row(iter.node) {
            Some(row) => Ok(row),
            None => Err(TreeError::NoSuchRow(self.get_path(iter)?)),
        }
    }

    /// Shorthand for `get_iter` + `row`
    pub fn row_at(&self, path: &TreePath) -> Result<T, TreeError> {
        let iter = self.get_iter(path)?;
        self.row(&iter)
    }

    pub fn value(&self, iter: &TreeIter, column: usize) -> Result<Value, TreeError> {
        let row = self.row(iter)?;
        self.columns.extract(&row, column)
    }

    /// Children of `parent`, or of the virtual root for `None`
    pub fn n_children(&self, parent: Option<&TreeIter>) -> Result<usize, TreeError> {
        match parent {
            None => Ok(self.segments.total_size()),
            Some(iter) => {
                self.check_iter(iter)?;
                let segment = self.segments.get(iter.segment)?;
                Ok(segment.source().n_children(Some(iter.node)))
            }
        }
    }

    /// Children of the node at `path` (the root for the empty path)
    pub fn n_children_at(&self, path: &TreePath) -> Result<usize, TreeError> {
        if path.is_root() {
            return Ok(self.segments.total_size());
        }
        let iter = self.get_iter(path)?;
        self.n_children(Some(&iter))
    }

    pub fn has_children(&self, iter: &TreeIter) -> Result<bool, TreeError> {
        self.check_iter(iter)?;
        let segment = self.segments.get(iter.segment)?;
        Ok(segment.source().has_children(iter.node))
    }

    // -----------------------------------------------------------------------
    // Navigation
    // -----------------------------------------------------------------------

    pub fn iter_first(&self) -> Result<Option<TreeIter>, TreeError> {
        self.iter_nth_child(None, 0)
    }

    pub fn iter_children(&self, parent: Option<&TreeIter>) -> Result<Option<TreeIter>, TreeError> {
        self.iter_nth_child(parent, 0)
    }

    pub fn iter_nth_child(
        &self,
        parent: Option<&TreeIter>,
        n: usize,
    ) -> Result<Option<TreeIter>, TreeError> {
        let parent_path = match parent {
            Some(iter) => self.get_path(iter)?,
            None => TreePath::root(),
        };
        if n >= self.n_children(parent)? {
            return Ok(None);
        }
        self.get_iter(&parent_path.child(n)).map(Some)
    }

    /// The next sibling. On the root level this crosses from one source's
    /// rows into the next source's.
    pub fn iter_next(&self, iter: &TreeIter) -> Result<Option<TreeIter>, TreeError> {
        let path = self.get_path(iter)?;
        let last = path.last().ok_or(TreeError::EmptyPath)?;
        if last + 1 >= self.n_children_at(&path.parent())? {
            return Ok(None);
        }
        match path.with_last(last + 1) {
            Some(next) => self.get_iter(&next).map(Some),
            None => Ok(None),
        }
    }

    pub fn iter_previous(&self, iter: &TreeIter) -> Result<Option<TreeIter>, TreeError> {
        let path = self.get_path(iter)?;
        let last = path.last().ok_or(TreeError::EmptyPath)?;
        if last == 0 {
            return Ok(None);
        }
        match path.with_last(last - 1) {
            Some(prev) => self.get_iter(&prev).map(Some),
            None => Ok(None),
        }
    }

    /// The parent row, `None` for root-level rows
    pub fn iter_parent(&self, iter: &TreeIter) -> Result<Option<TreeIter>, TreeError> {
        let path = self.get_path(iter)?;
        if path.depth() <= 1 {
            return Ok(None);
        }
        self.get_iter(&path.parent()).map(Some)
    }

    /// Check the partition invariant and that every segment is as large as
    /// its source's root level.
    ///
    /// The size half holds once `pump` has drained the queue. A listener
    /// running while events are still queued can see a source that is
    /// already ahead of the table.
    pub fn check_consistency(&self) -> Result<(), TreeError> {
        self.segments.check()?;
        for segment in self.segments.iter() {
            let actual = segment.source().n_children(None);
            if actual != segment.size() {
                return Err(TreeError::Inconsistent(format!(
                    "{} covers {} rows, its source has {}",
                    segment.id(),
                    segment.size(),
                    actual
                )));
            }
        }
        Ok(())
    }
}

impl<T> fmt::Debug for CombinedTree<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CombinedTree")
            .field("stamp", &self.stamp)
            .field("segments", &self.segments)
            .field("columns", &self.columns.kinds())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
