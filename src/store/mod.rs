//! In-memory hierarchical stores that report their changes as source events.

pub mod saved_searches;
pub mod tags;

pub use saved_searches::SavedSearchStore;
pub use tags::TagStore;

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

use crate::model::TreePath;
use crate::tree::{Emitter, EventSink, NodeKey, SinkId, SourceEvent, TreeSource};

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("node not found: {0:?}")]
    NotFound(NodeKey),
    #[error("invalid position {position} (0..={len})")]
    InvalidPosition { position: usize, len: usize },
    #[error("already exists: {0}")]
    Duplicate(String),
}

struct Node<T> {
    value: T,
    parent: Option<NodeKey>,
    children: Vec<NodeKey>,
}

struct Arena<T> {
    nodes: HashMap<NodeKey, Node<T>>,
    roots: Vec<NodeKey>,
    next_key: u64,
}

impl<T> Arena<T> {
    fn siblings(&self, parent: Option<NodeKey>) -> Result<&Vec<NodeKey>, StoreError> {
        match parent {
            None => Ok(&self.roots),
            Some(p) => self
                .nodes
                .get(&p)
                .map(|n| &n.children)
                .ok_or(StoreError::NotFound(p)),
        }
    }

    fn siblings_mut(&mut self, parent: Option<NodeKey>) -> Result<&mut Vec<NodeKey>, StoreError> {
        match parent {
            None => Ok(&mut self.roots),
            Some(p) => self
                .nodes
                .get_mut(&p)
                .map(|n| &mut n.children)
                .ok_or(StoreError::NotFound(p)),
        }
    }

    fn path_of(&self, key: NodeKey) -> Option<TreePath> {
        let mut indices = Vec::new();
        let mut current = key;
        loop {
            let node = self.nodes.get(&current)?;
            let siblings = match node.parent {
                None => &self.roots,
                Some(p) => &self.nodes.get(&p)?.children,
            };
            indices.push(siblings.iter().position(|k| *k == current)?);
            match node.parent {
                Some(p) => current = p,
                None => break,
            }
        }
        indices.reverse();
        Some(TreePath::new(indices))
    }

    fn lookup(&self, path: &TreePath) -> Option<NodeKey> {
        let mut siblings = &self.roots;
        let mut found = None;
        for &index in path.indices() {
            let key = *siblings.get(index)?;
            siblings = &self.nodes.get(&key)?.children;
            found = Some(key);
        }
        found
    }

    fn remove_subtree(&mut self, key: NodeKey) -> Option<Node<T>> {
        let node = self.nodes.remove(&key)?;
        for child in &node.children {
            self.remove_subtree(*child);
        }
        Some(node)
    }

    /// The toggle for `parent` gaining its first child or losing its last.
    /// `None` is the top level, reported at the root path.
    fn toggle(&self, parent: Option<NodeKey>) -> Option<SourceEvent> {
        let path = match parent {
            Some(p) => self.path_of(p)?,
            None => TreePath::root(),
        };
        Some(SourceEvent::HasChildToggled { path, node: parent })
    }

    /// Depth-first, parents before children
    fn walk(&self, keys: &[NodeKey], visit: &mut impl FnMut(NodeKey, &T) -> bool) -> Option<NodeKey> {
        for key in keys {
            let node = self.nodes.get(key)?;
            if visit(*key, &node.value) {
                return Some(*key);
            }
            if let Some(found) = self.walk(&node.children, visit) {
                return Some(found);
            }
        }
        None
    }
}

/// An arena-backed tree of rows.
///
/// Owned through an `Rc` and shared with any composite that displays it.
/// Every mutation is reported to connected sinks once the store is back in
/// a consistent state.
pub struct TreeStore<T> {
    arena: RefCell<Arena<T>>,
    emitter: Emitter,
}

impl<T> TreeStore<T> {
    pub fn new() -> Self {
        TreeStore {
            arena: RefCell::new(Arena {
                nodes: HashMap::new(),
                roots: Vec::new(),
                next_key: 0,
            }),
            emitter: Emitter::new(),
        }
    }

    /// Insert `value` under `parent` (`None` = top level) at `position`
    /// (`None` = after the last child).
    pub fn insert(
        &self,
        parent: Option<NodeKey>,
        position: Option<usize>,
        value: T,
    ) -> Result<NodeKey, StoreError> {
        let (key, path, toggled) = {
            let mut arena = self.arena.borrow_mut();
            let len = arena.siblings(parent)?.len();
            let position = position.unwrap_or(len);
            if position > len {
                return Err(StoreError::InvalidPosition { position, len });
            }

            let key = NodeKey(arena.next_key);
            arena.next_key += 1;
            arena.nodes.insert(
                key,
                Node {
                    value,
                    parent,
                    children: Vec::new(),
                },
            );
            arena.siblings_mut(parent)?.insert(position, key);

            let path = arena.path_of(key).ok_or(StoreError::NotFound(key))?;
            let toggled = if len == 0 {
                arena.toggle(parent)
            } else {
                None
            };
            (key, path, toggled)
        };

        self.emitter.emit(SourceEvent::RowInserted { path, node: key });
        if let Some(event) = toggled {
            self.emitter.emit(event);
        }
        Ok(key)
    }

    pub fn append(&self, parent: Option<NodeKey>, value: T) -> Result<NodeKey, StoreError> {
        self.insert(parent, None, value)
    }

    /// Remove a node together with its subtree, returning its value
    pub fn remove(&self, key: NodeKey) -> Result<T, StoreError> {
        let (value, path, toggled) = {
            let mut arena = self.arena.borrow_mut();
            let path = arena.path_of(key).ok_or(StoreError::NotFound(key))?;
            let parent = arena
                .nodes
                .get(&key)
                .ok_or(StoreError::NotFound(key))?
                .parent;

            let siblings = arena.siblings_mut(parent)?;
            siblings.retain(|k| *k != key);
            let remaining = siblings.len();
            let node = arena.remove_subtree(key).ok_or(StoreError::NotFound(key))?;

            let toggled = if remaining == 0 {
                arena.toggle(parent)
            } else {
                None
            };
            (node.value, path, toggled)
        };

        self.emitter.emit(SourceEvent::RowDeleted { path });
        if let Some(event) = toggled {
            self.emitter.emit(event);
        }
        Ok(value)
    }

    /// Replace a node's value, returning the old one
    pub fn set(&self, key: NodeKey, value: T) -> Result<T, StoreError> {
        let (old, path) = {
            let mut arena = self.arena.borrow_mut();
            let node = arena.nodes.get_mut(&key).ok_or(StoreError::NotFound(key))?;
            let old = std::mem::replace(&mut node.value, value);
            (old, arena.path_of(key).ok_or(StoreError::NotFound(key))?)
        };
        self.emitter.emit(SourceEvent::RowChanged { path, node: key });
        Ok(old)
    }

    /// Modify a node's value in place
    pub fn update(&self, key: NodeKey, f: impl FnOnce(&mut T)) -> Result<(), StoreError> {
        let path = {
            let mut arena = self.arena.borrow_mut();
            let node = arena.nodes.get_mut(&key).ok_or(StoreError::NotFound(key))?;
            f(&mut node.value);
            arena.path_of(key).ok_or(StoreError::NotFound(key))?
        };
        self.emitter.emit(SourceEvent::RowChanged { path, node: key });
        Ok(())
    }

    /// Stable-sort the children of `parent`. Reports a reorder only if the
    /// order actually changed.
    pub fn sort_children(
        &self,
        parent: Option<NodeKey>,
        mut compare: impl FnMut(&T, &T) -> Ordering,
    ) -> Result<(), StoreError> {
        let (path, new_order) = {
            let mut arena = self.arena.borrow_mut();
            let old = arena.siblings(parent)?.clone();
            let mut order: Vec<usize> = (0..old.len()).collect();
            {
                let values: Vec<&T> = old
                    .iter()
                    .map(|k| arena.nodes.get(k).map(|n| &n.value).ok_or(StoreError::NotFound(*k)))
                    .collect::<Result<_, _>>()?;
                order.sort_by(|&a, &b| compare(values[a], values[b]));
            }
            if order.iter().enumerate().all(|(new, old)| new == *old) {
                return Ok(());
            }

            *arena.siblings_mut(parent)? = order.iter().map(|&i| old[i]).collect();
            let path = match parent {
                Some(p) => arena.path_of(p).ok_or(StoreError::NotFound(p))?,
                None => TreePath::root(),
            };
            (path, order)
        };

        self.emitter.emit(SourceEvent::RowsReordered {
            path,
            node: parent,
            new_order,
        });
        Ok(())
    }

    /// Run `f` on a node's value
    pub fn with<R>(&self, key: NodeKey, f: impl FnOnce(&T) -> R) -> Option<R> {
        self.arena.borrow().nodes.get(&key).map(|n| f(&n.value))
    }

    pub fn path_of(&self, key: NodeKey) -> Option<TreePath> {
        self.arena.borrow().path_of(key)
    }

    pub fn parent(&self, key: NodeKey) -> Option<NodeKey> {
        self.arena.borrow().nodes.get(&key)?.parent
    }

    pub fn children(&self, parent: Option<NodeKey>) -> Vec<NodeKey> {
        self.arena
            .borrow()
            .siblings(parent)
            .cloned()
            .unwrap_or_default()
    }

    /// First node, depth-first, whose value satisfies `predicate`
    pub fn find(&self, mut predicate: impl FnMut(&T) -> bool) -> Option<NodeKey> {
        let arena = self.arena.borrow();
        arena.walk(&arena.roots, &mut |_, value| predicate(value))
    }

    /// Total number of nodes at every depth
    pub fn len(&self) -> usize {
        self.arena.borrow().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.borrow().nodes.is_empty()
    }
}

impl<T: Clone> TreeStore<T> {
    pub fn get(&self, key: NodeKey) -> Option<T> {
        self.with(key, T::clone)
    }
}

impl<T> Default for TreeStore<T> {
    fn default() -> Self {
        TreeStore::new()
    }
}

impl<T> fmt::Debug for TreeStore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeStore")
            .field("nodes", &self.len())
            .field("sinks", &self.emitter.len())
            .finish()
    }
}

impl<T: Clone> TreeSource for TreeStore<T> {
    type Row = T;

    fn lookup(&self, path: &TreePath) -> Option<NodeKey> {
        self.arena.borrow().lookup(path)
    }

    fn n_children(&self, node: Option<NodeKey>) -> usize {
        self.arena.borrow().siblings(node).map_or(0, Vec::len)
    }

    fn row(&self, node: NodeKey) -> Option<T> {
        self.get(node)
    }

    fn connect(&self, sink: EventSink) {
        self.emitter.connect(sink);
    }

    fn disconnect(&self, sink: SinkId) {
        self.emitter.disconnect(sink);
    }
}
