//! The task organizer's sidebar: fixed entries, saved searches and tags as
//! one composite tree.

pub mod sections;

pub use sections::{
    ICON_COLUMN, NAME_COLUMN, SEPARATOR_COLUMN, SavedSearchSection, TagSection, sidebar_columns,
};

use std::rc::Rc;

use serde::Serialize;

use crate::model::{SidebarConfig, SidebarEntry, TreePath};
use crate::store::{SavedSearchStore, TagStore};
use crate::tree::{CombinedTree, FixedList, SourceRef, TreeError, TreeIter};
use crate::util::unicode::fit_to_width;

#[derive(Debug, thiserror::Error)]
pub enum SidebarError {
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error("could not serialize sidebar: {0}")]
    Json(#[from] serde_json::Error),
}

/// One row of a sidebar snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SidebarRow {
    pub path: TreePath,
    pub depth: usize,
    #[serde(flatten)]
    pub entry: SidebarEntry,
}

/// Sidebar rows, top to bottom: "All tasks", the saved searches group,
/// "Tasks with no tags", a separator, then the tags. The fixed rows can be
/// switched off in the config.
pub struct Sidebar {
    tree: CombinedTree<SidebarEntry>,
    config: SidebarConfig,
    saved_searches: Rc<SavedSearchStore>,
    tags: Rc<TagStore>,
    saved_section: SourceRef<SidebarEntry>,
    tag_section: SourceRef<SidebarEntry>,
}

impl Sidebar {
    pub fn new(
        config: SidebarConfig,
        saved_searches: Rc<SavedSearchStore>,
        tags: Rc<TagStore>,
    ) -> Result<Self, SidebarError> {
        let saved_section: SourceRef<SidebarEntry> =
            Rc::new(SavedSearchSection::new(saved_searches.clone()));
        let tag_section: SourceRef<SidebarEntry> = Rc::new(TagSection::new(tags.clone()));

        let mut sources = Vec::new();
        if config.show_all_tasks {
            sources.push(fixed([SidebarEntry::AllTasks])?);
        }
        sources.push(saved_section.clone());
        let middle: Vec<_> = [
            config.show_no_tags.then_some(SidebarEntry::NoTags),
            config.show_separator.then_some(SidebarEntry::Separator),
        ]
        .into_iter()
        .flatten()
        .collect();
        if !middle.is_empty() {
            sources.push(fixed(middle)?);
        }
        sources.push(tag_section.clone());

        let tree = CombinedTree::with_sources(sidebar_columns()?, sources)?
            .with_span(tracing::debug_span!("sidebar"));
        tracing::debug!(rows = tree.segments().total_size(), "sidebar built");

        Ok(Sidebar {
            tree,
            config,
            saved_searches,
            tags,
            saved_section,
            tag_section,
        })
    }

    pub fn tree(&self) -> &CombinedTree<SidebarEntry> {
        &self.tree
    }

    /// Mutable access, for connecting listeners
    pub fn tree_mut(&mut self) -> &mut CombinedTree<SidebarEntry> {
        &mut self.tree
    }

    pub fn config(&self) -> &SidebarConfig {
        &self.config
    }

    pub fn saved_searches(&self) -> &Rc<SavedSearchStore> {
        &self.saved_searches
    }

    pub fn tags(&self) -> &Rc<TagStore> {
        &self.tags
    }

    /// Apply every change the stores reported since the last call
    pub fn pump(&mut self) -> Result<usize, SidebarError> {
        Ok(self.tree.pump()?)
    }

    /// Show a different saved-search store in place of the current one
    pub fn set_saved_searches(&mut self, store: Rc<SavedSearchStore>) -> Result<(), SidebarError> {
        let section: SourceRef<SidebarEntry> = Rc::new(SavedSearchSection::new(store.clone()));
        let old = self.saved_section.clone();
        self.replace_section(&old, section.clone())?;
        self.saved_section = section;
        self.saved_searches = store;
        Ok(())
    }

    /// Show a different tag store in place of the current one
    pub fn set_tags(&mut self, store: Rc<TagStore>) -> Result<(), SidebarError> {
        let section: SourceRef<SidebarEntry> = Rc::new(TagSection::new(store.clone()));
        let old = self.tag_section.clone();
        self.replace_section(&old, section.clone())?;
        self.tag_section = section;
        self.tags = store;
        Ok(())
    }

    fn replace_section(
        &mut self,
        old: &SourceRef<SidebarEntry>,
        new: SourceRef<SidebarEntry>,
    ) -> Result<(), SidebarError> {
        let id = self.tree.segments().segment_for_source(old)?.id();
        let position = self.tree.segments().position(id)?;
        self.tree.unregister(old)?;
        self.tree.register(new, position)?;
        Ok(())
    }

    pub fn display_name(&self, path: &TreePath) -> Result<String, SidebarError> {
        let iter = self.tree.get_iter(path)?;
        let value = self.tree.value(&iter, NAME_COLUMN)?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    pub fn is_separator(&self, path: &TreePath) -> Result<bool, SidebarError> {
        let iter = self.tree.get_iter(path)?;
        let value = self.tree.value(&iter, SEPARATOR_COLUMN)?;
        Ok(value.as_bool().unwrap_or(false))
    }

    /// Every row, depth first
    pub fn snapshot(&self) -> Result<Vec<SidebarRow>, SidebarError> {
        let mut rows = Vec::new();
        self.collect(None, 0, &mut rows)?;
        Ok(rows)
    }

    fn collect(
        &self,
        parent: Option<&TreeIter>,
        depth: usize,
        rows: &mut Vec<SidebarRow>,
    ) -> Result<(), TreeError> {
        let mut cursor = self.tree.iter_children(parent)?;
        while let Some(iter) = cursor {
            rows.push(SidebarRow {
                path: self.tree.get_path(&iter)?,
                depth,
                entry: self.tree.row(&iter)?,
            });
            self.collect(Some(&iter), depth + 1, rows)?;
            cursor = self.tree.iter_next(&iter)?;
        }
        Ok(())
    }

    /// Plain-text rendering, two spaces of indent per level, labels cut to
    /// `label_width` cells
    pub fn outline(&self) -> Result<String, SidebarError> {
        let width = self.config.label_width;
        let mut out = String::new();
        for row in self.snapshot()? {
            out.push_str(&"  ".repeat(row.depth));
            if row.entry.is_separator() {
                out.push_str(&"─".repeat(width.min(16)));
            } else {
                if let Some(icon) = row.entry.icon() {
                    out.push_str(icon);
                    out.push(' ');
                }
                out.push_str(&fit_to_width(row.entry.display_name(), width));
            }
            out.push('\n');
        }
        Ok(out)
    }

    pub fn to_json(&self) -> Result<String, SidebarError> {
        Ok(serde_json::to_string_pretty(&self.snapshot()?)?)
    }
}

impl std::fmt::Debug for Sidebar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sidebar")
            .field("tree", &self.tree)
            .field("config", &self.config)
            .finish()
    }
}

fn fixed(
    entries: impl IntoIterator<Item = SidebarEntry>,
) -> Result<SourceRef<SidebarEntry>, TreeError> {
    Ok(Rc::new(FixedList::new(entries, sidebar_columns()?)))
}
