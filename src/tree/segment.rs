use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;

use indexmap::IndexMap;

use crate::model::TreePath;

use super::iter::TreeIter;
use super::source::{same_source, EventSink, SinkId, SourceEvent, SourceRef};
use super::TreeError;

/// Identity of one registered source inside a composite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SegmentId(pub(crate) u32);

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "segment #{}", self.0)
    }
}

/// The virtual root range `[start, end)` one source occupies, plus the
/// handles resolved inside it.
pub struct Segment<T> {
    id: SegmentId,
    source: SourceRef<T>,
    start: usize,
    end: usize,
    /// Local path → handle, emptied on every stamp advance
    cache: RefCell<HashMap<TreePath, TreeIter>>,
}

impl<T> Segment<T> {
    pub fn id(&self) -> SegmentId {
        self.id
    }

    pub fn source(&self) -> &SourceRef<T> {
        &self.source
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn size(&self) -> usize {
        self.end - self.start
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn contains(&self, index: usize) -> bool {
        self.start <= index && index < self.end
    }

    pub fn cached_len(&self) -> usize {
        self.cache.borrow().len()
    }

    pub(crate) fn cached(&self, local: &TreePath) -> Option<TreeIter> {
        self.cache.borrow().get(local).cloned()
    }

    pub(crate) fn remember(&self, iter: TreeIter) {
        self.cache.borrow_mut().insert(iter.local.clone(), iter);
    }

    pub(crate) fn forget_all(&self) {
        self.cache.borrow_mut().clear();
    }
}

impl<T> fmt::Debug for Segment<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Segment")
            .field("id", &self.id)
            .field("start", &self.start)
            .field("end", &self.end)
            .field("cached", &self.cached_len())
            .finish()
    }
}

static NEXT_TABLE: AtomicU64 = AtomicU64::new(0);

/// Registration errors break the caller's contract: fatal in debug builds,
/// logged and returned otherwise.
pub(crate) fn contract_violation(err: TreeError) -> TreeError {
    tracing::error!(%err, "registration contract violated");
    if cfg!(debug_assertions) {
        panic!("registration contract violated: {err}");
    }
    err
}

/// Ordered segments partitioning the virtual root level.
///
/// Invariant after every call: the first segment starts at 0 and each
/// segment ends where the next one starts.
pub struct SegmentTable<T> {
    /// Process-unique, tells this table's sinks from other tables' sinks
    table: u64,
    segments: IndexMap<SegmentId, Segment<T>>,
    next_id: u32,
    tx: mpsc::Sender<(SegmentId, SourceEvent)>,
}

impl<T> SegmentTable<T> {
    /// A table whose sources will report to `tx`
    pub fn new(tx: mpsc::Sender<(SegmentId, SourceEvent)>) -> Self {
        SegmentTable {
            table: NEXT_TABLE.fetch_add(1, Ordering::Relaxed),
            segments: IndexMap::new(),
            next_id: 0,
            tx,
        }
    }

    /// Register `source` at `position` among the segments, sized to its
    /// current root child count.
    pub fn register(&mut self, source: SourceRef<T>, position: usize) -> Result<SegmentId, TreeError> {
        let size = source.n_children(None);
        self.insert(source, position, size)
    }

    /// Register `source` with an explicit initial size
    pub(crate) fn insert(
        &mut self,
        source: SourceRef<T>,
        position: usize,
        size: usize,
    ) -> Result<SegmentId, TreeError> {
        if let Some(existing) = self.find(&source) {
            return Err(contract_violation(TreeError::DuplicateSource(existing)));
        }
        if position > self.segments.len() {
            return Err(TreeError::InvalidPosition {
                position,
                len: self.segments.len(),
            });
        }

        let start = match position.checked_sub(1) {
            Some(prev) => self.segments.get_index(prev).map_or(0, |(_, s)| s.end),
            None => 0,
        };
        let id = SegmentId(self.next_id);
        self.next_id += 1;

        for next in self.segments.values_mut().skip(position) {
            next.start += size;
            next.end += size;
        }

        source.connect(EventSink::new(self.sink_id(id), self.tx.clone()));
        self.segments.shift_insert(
            position,
            id,
            Segment {
                id,
                source,
                start,
                end: start + size,
                cache: RefCell::new(HashMap::new()),
            },
        );
        tracing::debug!(segment = %id, position, start, size, "registered source");
        Ok(id)
    }

    /// Remove the segment of `source`, closing the gap it leaves.
    pub fn unregister(&mut self, source: &SourceRef<T>) -> Result<SegmentId, TreeError> {
        let Some(id) = self.find(source) else {
            return Err(contract_violation(TreeError::UnknownSource));
        };
        self.remove(id)?;
        Ok(id)
    }

    pub(crate) fn remove(&mut self, id: SegmentId) -> Result<(), TreeError> {
        let position = self.position(id)?;
        let size = self.segments[position].size();
        for next in self.segments.values_mut().skip(position + 1) {
            next.start -= size;
            next.end -= size;
        }
        if let Some((_, segment)) = self.segments.shift_remove_index(position) {
            segment.source.disconnect(self.sink_id(id));
        }
        tracing::debug!(segment = %id, size, "unregistered source");
        Ok(())
    }

    /// The sink identity handed to the source of segment `id`
    pub fn sink_id(&self, id: SegmentId) -> SinkId {
        SinkId {
            table: self.table,
            segment: id,
        }
    }

    /// Grow or shrink one segment by `delta` rows and shift every segment
    /// after it by the same amount.
    pub fn resize(&mut self, id: SegmentId, delta: isize) -> Result<(), TreeError> {
        let position = self.position(id)?;
        let mut segments = self.segments.values_mut().skip(position);
        let Some(segment) = segments.next() else {
            return Err(TreeError::UnknownSegment(id));
        };
        segment.end = segment
            .end
            .checked_add_signed(delta)
            .filter(|end| *end >= segment.start)
            .ok_or(TreeError::SegmentUnderflow(id))?;
        for next in segments {
            next.start = offset(next.start, delta)?;
            next.end = offset(next.end, delta)?;
        }
        Ok(())
    }

    /// The segment whose range holds virtual root index `index`.
    ///
    /// A linear scan: fine for the handful of sources a sidebar has.
    pub fn segment_for_index(&self, index: usize) -> Result<&Segment<T>, TreeError> {
        self.segments
            .values()
            .find(|s| s.contains(index))
            .ok_or(TreeError::IndexOutOfRange {
                index,
                size: self.total_size(),
            })
    }

    pub fn segment_for_source(&self, source: &SourceRef<T>) -> Result<&Segment<T>, TreeError> {
        self.segments
            .values()
            .find(|s| same_source(&s.source, source))
            .ok_or(TreeError::UnknownSource)
    }

    fn find(&self, source: &SourceRef<T>) -> Option<SegmentId> {
        self.segment_for_source(source).ok().map(Segment::id)
    }

    pub fn get(&self, id: SegmentId) -> Result<&Segment<T>, TreeError> {
        self.segments.get(&id).ok_or(TreeError::UnknownSegment(id))
    }

    /// Index of the segment in registration order
    pub fn position(&self, id: SegmentId) -> Result<usize, TreeError> {
        self.segments
            .get_index_of(&id)
            .ok_or(TreeError::UnknownSegment(id))
    }

    /// Number of rows on the virtual root level
    pub fn total_size(&self) -> usize {
        self.segments.last().map_or(0, |(_, s)| s.end)
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Segment<T>> {
        self.segments.values()
    }

    pub fn clear_caches(&self) {
        for segment in self.segments.values() {
            segment.forget_all();
        }
    }

    /// Verify the partition invariant
    pub fn check(&self) -> Result<(), TreeError> {
        let mut expected_start = 0;
        for segment in self.segments.values() {
            if segment.start != expected_start {
                return Err(TreeError::Inconsistent(format!(
                    "{} starts at {}, expected {}",
                    segment.id, segment.start, expected_start
                )));
            }
            if segment.end < segment.start {
                return Err(TreeError::Inconsistent(format!(
                    "{} ends at {} before its start {}",
                    segment.id, segment.end, segment.start
                )));
            }
            expected_start = segment.end;
        }
        Ok(())
    }

    /// Split a virtual path into its segment and the source-local path.
    ///
    /// `Ok(None)` for the root path, which belongs to no segment. Only the
    /// first index is rewritten; deeper levels belong to the source.
    pub fn to_source_path(&self, path: &TreePath) -> Result<Option<(SegmentId, TreePath)>, TreeError> {
        let Some(first) = path.first() else {
            return Ok(None);
        };
        let segment = self.segment_for_index(first)?;
        let local = path
            .with_first(first - segment.start)
            .unwrap_or_default();
        Ok(Some((segment.id, local)))
    }

    /// Inverse of [`to_source_path`](Self::to_source_path)
    pub fn to_virtual_path(&self, id: SegmentId, local: &TreePath) -> Result<TreePath, TreeError> {
        let segment = self.get(id)?;
        Ok(match local.first() {
            Some(first) => local
                .with_first(first + segment.start)
                .unwrap_or_default(),
            None => TreePath::root(),
        })
    }
}

impl<T> fmt::Debug for SegmentTable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.segments.values()).finish()
    }
}

fn offset(value: usize, delta: isize) -> Result<usize, TreeError> {
    value
        .checked_add_signed(delta)
        .ok_or_else(|| TreeError::Inconsistent(format!("cannot shift {} by {}", value, delta)))
}
