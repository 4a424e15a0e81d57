use std::fmt;

use crate::model::SavedSearch;
use crate::tree::NodeKey;

use super::{StoreError, TreeStore};

/// The user's saved searches, optionally nested under one another
#[derive(Debug, Default)]
pub struct SavedSearchStore {
    tree: TreeStore<SavedSearch>,
}

impl SavedSearchStore {
    pub fn new() -> Self {
        SavedSearchStore::default()
    }

    /// The underlying tree, for registering with a composite
    pub fn tree(&self) -> &TreeStore<SavedSearch> {
        &self.tree
    }

    pub fn add(&self, search: SavedSearch, parent: Option<NodeKey>) -> Result<NodeKey, StoreError> {
        tracing::debug!(%search, ?parent, "adding saved search");
        self.tree.append(parent, search)
    }

    /// Create a search from its parts and add it
    pub fn new_search(
        &self,
        name: impl Into<String>,
        query: impl Into<String>,
        parent: Option<NodeKey>,
    ) -> Result<NodeKey, StoreError> {
        self.add(SavedSearch::new(name, query), parent)
    }

    /// First search whose shown name is `name`
    pub fn find(&self, name: &str) -> Option<NodeKey> {
        self.tree.find(|s| s.display_name() == name)
    }

    pub fn get(&self, key: NodeKey) -> Option<SavedSearch> {
        self.tree.get(key)
    }

    pub fn rename(&self, key: NodeKey, name: impl Into<String>) -> Result<(), StoreError> {
        let name = name.into();
        self.tree.update(key, |s| s.name = name)
    }

    pub fn set_query(&self, key: NodeKey, query: impl Into<String>) -> Result<(), StoreError> {
        let query = query.into();
        self.tree.update(key, |s| s.query = query)
    }

    pub fn set_icon(&self, key: NodeKey, icon: Option<String>) -> Result<(), StoreError> {
        self.tree.update(key, |s| s.icon = icon)
    }

    /// Remove a search and every search nested below it
    pub fn remove(&self, key: NodeKey) -> Result<SavedSearch, StoreError> {
        let removed = self.tree.remove(key)?;
        tracing::debug!(search = %removed, "removed saved search");
        Ok(removed)
    }

    /// Sort the children of `parent` by shown name, ignoring case
    pub fn sort_by_name(&self, parent: Option<NodeKey>) -> Result<(), StoreError> {
        self.tree.sort_children(parent, |a, b| {
            a.display_name()
                .to_lowercase()
                .cmp(&b.display_name().to_lowercase())
        })
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }
}

impl fmt::Display for SavedSearchStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Saved Search Store. Holds {} search(es)", self.len())
    }
}
