use crate::model::{TreePath, Value};

use super::column::ColumnSet;
use super::source::{EventSink, NodeKey, SinkId, TreeSource};
use super::TreeError;

/// A read-only flat list of rows.
///
/// Rows never have children and the list never changes, so it has no
/// events to report.
#[derive(Debug)]
pub struct FixedList<T> {
    items: Vec<T>,
    columns: ColumnSet<T>,
}

impl<T> FixedList<T> {
    pub fn new(items: impl IntoIterator<Item = T>, columns: ColumnSet<T>) -> Self {
        FixedList {
            items: items.into_iter().collect(),
            columns,
        }
    }

    pub fn get(&self, index: usize) -> Result<&T, TreeError> {
        self.items.get(index).ok_or(TreeError::IndexOutOfRange {
            index,
            size: self.items.len(),
        })
    }

    pub fn column_value(&self, index: usize, column: usize) -> Result<Value, TreeError> {
        let item = self.get(index)?;
        self.columns.extract(item, column)
    }

    pub fn columns(&self) -> &ColumnSet<T> {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }
}

impl<T: Clone> TreeSource for FixedList<T> {
    type Row = T;

    fn lookup(&self, path: &TreePath) -> Option<NodeKey> {
        match path.indices() {
            [index] if *index < self.items.len() => Some(NodeKey(*index as u64)),
            _ => None,
        }
    }

    fn n_children(&self, node: Option<NodeKey>) -> usize {
        match node {
            None => self.items.len(),
            Some(_) => 0,
        }
    }

    fn has_children(&self, _node: NodeKey) -> bool {
        false
    }

    fn row(&self, node: NodeKey) -> Option<T> {
        let index = usize::try_from(node.0).ok()?;
        self.items.get(index).cloned()
    }

    fn is_list_only(&self) -> bool {
        true
    }

    fn connect(&self, _sink: EventSink) {}

    fn disconnect(&self, _sink: SinkId) {}
}
