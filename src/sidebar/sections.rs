use std::rc::Rc;

use crate::model::{SidebarEntry, TreePath, Value, ValueKind};
use crate::store::{SavedSearchStore, TagStore};
use crate::tree::{Column, ColumnSet, EventSink, NodeKey, SinkId, TreeError, TreeSource};

/// Column holding the label
pub const NAME_COLUMN: usize = 0;
/// Column that is true for the divider row
pub const SEPARATOR_COLUMN: usize = 1;
pub const ICON_COLUMN: usize = 2;

/// Key of the group row. Store keys count up from zero and never get here.
const GROUP: NodeKey = NodeKey(u64::MAX);

pub fn sidebar_columns() -> Result<ColumnSet<SidebarEntry>, TreeError> {
    ColumnSet::new(vec![
        Column::new(ValueKind::Text, |e: &SidebarEntry| Value::from(e.display_name())),
        Column::new(ValueKind::Boolean, |e: &SidebarEntry| Value::from(e.is_separator())),
        Column::new(ValueKind::Text, |e: &SidebarEntry| Value::from(e.icon())),
    ])
}

/// The saved searches, hung below a single "Saved searches" row
#[derive(Debug)]
pub struct SavedSearchSection {
    store: Rc<SavedSearchStore>,
}

impl SavedSearchSection {
    pub fn new(store: Rc<SavedSearchStore>) -> Self {
        SavedSearchSection { store }
    }
}

impl TreeSource for SavedSearchSection {
    type Row = SidebarEntry;

    fn lookup(&self, path: &TreePath) -> Option<NodeKey> {
        match path.indices() {
            [0] => Some(GROUP),
            [0, ..] => self.store.tree().lookup(&path.tail()),
            _ => None,
        }
    }

    fn n_children(&self, node: Option<NodeKey>) -> usize {
        match node {
            None => 1,
            Some(GROUP) => self.store.tree().n_children(None),
            Some(key) => self.store.tree().n_children(Some(key)),
        }
    }

    fn row(&self, node: NodeKey) -> Option<SidebarEntry> {
        if node == GROUP {
            return Some(SidebarEntry::SavedSearchesGroup);
        }
        self.store.get(node).map(SidebarEntry::SavedSearch)
    }

    /// The store's top level hangs below the group row, so its first and
    /// last root rows toggle the group's expander
    fn connect(&self, sink: EventSink) {
        self.store
            .tree()
            .connect(sink.nested(&TreePath::from([0]), GROUP));
    }

    fn disconnect(&self, sink: SinkId) {
        self.store.tree().disconnect(sink);
    }
}

/// The tag tree, rows mapped to sidebar entries
#[derive(Debug)]
pub struct TagSection {
    store: Rc<TagStore>,
}

impl TagSection {
    pub fn new(store: Rc<TagStore>) -> Self {
        TagSection { store }
    }
}

impl TreeSource for TagSection {
    type Row = SidebarEntry;

    fn lookup(&self, path: &TreePath) -> Option<NodeKey> {
        self.store.tree().lookup(path)
    }

    fn n_children(&self, node: Option<NodeKey>) -> usize {
        self.store.tree().n_children(node)
    }

    fn row(&self, node: NodeKey) -> Option<SidebarEntry> {
        self.store.get(node).map(SidebarEntry::Tag)
    }

    fn connect(&self, sink: EventSink) {
        self.store.tree().connect(sink);
    }

    fn disconnect(&self, sink: SinkId) {
        self.store.tree().disconnect(sink);
    }
}
