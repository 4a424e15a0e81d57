use crate::model::Tag;
use crate::tree::NodeKey;

use super::{StoreError, TreeStore};

/// Tags, unique by name, optionally nested
#[derive(Debug, Default)]
pub struct TagStore {
    tree: TreeStore<Tag>,
}

impl TagStore {
    pub fn new() -> Self {
        TagStore::default()
    }

    pub fn tree(&self) -> &TreeStore<Tag> {
        &self.tree
    }

    /// Add a tag. Fails if a tag with the same name exists anywhere in the store.
    pub fn add(&self, name: impl Into<String>, parent: Option<NodeKey>) -> Result<NodeKey, StoreError> {
        let name = name.into();
        if self.find(&name).is_some() {
            return Err(StoreError::Duplicate(name));
        }
        tracing::debug!(%name, ?parent, "adding tag");
        self.tree.append(parent, Tag::new(name))
    }

    pub fn find(&self, name: &str) -> Option<NodeKey> {
        self.tree.find(|t| t.name == name)
    }

    pub fn get(&self, key: NodeKey) -> Option<Tag> {
        self.tree.get(key)
    }

    pub fn rename(&self, key: NodeKey, name: impl Into<String>) -> Result<(), StoreError> {
        let name = name.into();
        match self.find(&name) {
            Some(existing) if existing != key => Err(StoreError::Duplicate(name)),
            _ => self.tree.update(key, |t| t.name = name),
        }
    }

    pub fn set_color(&self, key: NodeKey, color: Option<String>) -> Result<(), StoreError> {
        self.tree.update(key, |t| t.color = color)
    }

    pub fn set_icon(&self, key: NodeKey, icon: Option<String>) -> Result<(), StoreError> {
        self.tree.update(key, |t| t.icon = icon)
    }

    /// Remove a tag together with its child tags
    pub fn remove(&self, key: NodeKey) -> Result<Tag, StoreError> {
        let removed = self.tree.remove(key)?;
        tracing::debug!(name = %removed.name, "removed tag");
        Ok(removed)
    }

    pub fn sort_by_name(&self, parent: Option<NodeKey>) -> Result<(), StoreError> {
        self.tree
            .sort_children(parent, |a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }
}
