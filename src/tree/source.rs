use std::cell::RefCell;
use std::rc::Rc;
use std::sync::mpsc;

use crate::model::TreePath;

use super::segment::SegmentId;

/// Opaque handle a source gives out for one of its nodes.
///
/// Only meaningful to the source that issued it. A source may reuse a key
/// after a structural change, the composite never holds one across a stamp
/// advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey(pub u64);

/// A change a source reports in its own (local) addressing.
///
/// Events that name a surviving row carry its key, so the receiver can
/// build a handle without resolving the path again: by the time a queued
/// event is applied the source may already have moved on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceEvent {
    /// The row's value changed, shape did not
    RowChanged { path: TreePath, node: NodeKey },
    /// The row at this path is gone (with its subtree)
    RowDeleted { path: TreePath },
    /// A row now exists at this path
    RowInserted { path: TreePath, node: NodeKey },
    /// The row gained its first child or lost its last one. `None` with the
    /// root path when the source's own top level did.
    HasChildToggled {
        path: TreePath,
        node: Option<NodeKey>,
    },
    /// Children of `path` were permuted: `new_order[new_position] = old_position`
    RowsReordered {
        path: TreePath,
        node: Option<NodeKey>,
        new_order: Vec<usize>,
    },
}

impl SourceEvent {
    pub fn path(&self) -> &TreePath {
        match self {
            SourceEvent::RowChanged { path, .. }
            | SourceEvent::RowDeleted { path }
            | SourceEvent::RowInserted { path, .. }
            | SourceEvent::HasChildToggled { path, .. }
            | SourceEvent::RowsReordered { path, .. } => path,
        }
    }

    fn is_root_toggle(&self) -> bool {
        matches!(self, SourceEvent::HasChildToggled { path, .. } if path.is_root())
    }

    fn path_mut(&mut self) -> &mut TreePath {
        match self {
            SourceEvent::RowChanged { path, .. }
            | SourceEvent::RowDeleted { path }
            | SourceEvent::RowInserted { path, .. }
            | SourceEvent::HasChildToggled { path, .. }
            | SourceEvent::RowsReordered { path, .. } => path,
        }
    }

    /// The same event as seen from below `mount`: paths get its path in
    /// front, and an event about the source root is about the mount row.
    fn mounted(mut self, mount: &Mount) -> SourceEvent {
        if let SourceEvent::HasChildToggled { path, node }
        | SourceEvent::RowsReordered { path, node, .. } = &mut self
            && path.is_root()
        {
            *node = Some(mount.node);
        }
        let path = self.path_mut();
        *path = path.prefixed(&mount.path);
        self
    }
}

/// Which composite, and which segment inside it, a sink reports to.
///
/// Segment ids are only unique within one composite; a source shown by
/// several composites tells their sinks apart by the table half.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SinkId {
    pub(crate) table: u64,
    pub(crate) segment: SegmentId,
}

impl SinkId {
    pub fn segment(&self) -> SegmentId {
        self.segment
    }
}

/// The row a wrapped source hangs below
#[derive(Debug, Clone, PartialEq, Eq)]
struct Mount {
    path: TreePath,
    node: NodeKey,
}

/// The endpoint a source reports its events to.
///
/// Handed to the source when it is registered with a composite. Every event
/// is tagged with the segment it came from.
#[derive(Debug, Clone)]
pub struct EventSink {
    id: SinkId,
    mount: Option<Mount>,
    tx: mpsc::Sender<(SegmentId, SourceEvent)>,
}

impl EventSink {
    pub fn new(id: SinkId, tx: mpsc::Sender<(SegmentId, SourceEvent)>) -> Self {
        EventSink { id, mount: None, tx }
    }

    pub fn id(&self) -> SinkId {
        self.id
    }

    pub fn segment(&self) -> SegmentId {
        self.id.segment
    }

    /// A sink that mounts the events of a wrapped source below the row
    /// `node` at `path`
    pub fn nested(&self, path: &TreePath, node: NodeKey) -> EventSink {
        let path = match &self.mount {
            Some(outer) => path.prefixed(&outer.path),
            None => path.clone(),
        };
        EventSink {
            id: self.id,
            mount: Some(Mount { path, node }),
            tx: self.tx.clone(),
        }
    }

    /// Deliver an event. Returns false once the receiving composite is gone.
    pub fn send(&self, event: SourceEvent) -> bool {
        let event = match &self.mount {
            Some(mount) => event.mounted(mount),
            // the top level of an unmounted source is no row of ours
            None if event.is_root_toggle() => return true,
            None => event,
        };
        self.tx.send((self.id.segment, event)).is_ok()
    }
}

/// Capability contract every source of a composite tree satisfies.
///
/// Methods take `&self`: a source is shared between its owner and any
/// composite displaying it, and the composite only ever reads.
pub trait TreeSource {
    type Row;

    /// Resolve a local path to a node. `None` for the root path or a path
    /// that addresses nothing.
    fn lookup(&self, path: &TreePath) -> Option<NodeKey>;

    /// Number of children of `node`, or of the source root for `None`
    fn n_children(&self, node: Option<NodeKey>) -> usize;

    fn has_children(&self, node: NodeKey) -> bool {
        self.n_children(Some(node)) > 0
    }

    /// The row stored at `node`
    fn row(&self, node: NodeKey) -> Option<Self::Row>;

    /// True for flat sources whose rows never have children
    fn is_list_only(&self) -> bool {
        false
    }

    /// Start reporting events to `sink`
    fn connect(&self, sink: EventSink);

    /// Stop reporting events to the sink `sink`
    fn disconnect(&self, sink: SinkId);
}

/// Shared, non-owning reference to a source as the composite holds it
pub type SourceRef<T> = Rc<dyn TreeSource<Row = T>>;

/// Whether two source references point at the same source
pub(crate) fn same_source<T>(a: &SourceRef<T>, b: &SourceRef<T>) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}

/// Fan-out of one source's events to every connected sink, in connection order.
#[derive(Debug, Default)]
pub struct Emitter {
    sinks: RefCell<Vec<EventSink>>,
}

impl Emitter {
    pub fn new() -> Self {
        Emitter::default()
    }

    pub fn connect(&self, sink: EventSink) {
        self.sinks.borrow_mut().push(sink);
    }

    pub fn disconnect(&self, sink: SinkId) {
        self.sinks.borrow_mut().retain(|s| s.id() != sink);
    }

    /// Send `event` to every sink, dropping sinks whose composite is gone.
    pub fn emit(&self, event: SourceEvent) {
        self.sinks.borrow_mut().retain(|sink| sink.send(event.clone()));
    }

    pub fn len(&self) -> usize {
        self.sinks.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.borrow().is_empty()
    }
}
