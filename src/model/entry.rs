use serde::Serialize;

use super::saved_search::SavedSearch;
use super::tag::Tag;

/// One row of the sidebar
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum SidebarEntry {
    Tag(Tag),
    SavedSearch(SavedSearch),
    /// Non-interactive divider line
    Separator,
    /// Shows every task
    AllTasks,
    /// Parent row the saved searches are grouped under
    SavedSearchesGroup,
    /// Shows tasks without any tag
    NoTags,
}

impl SidebarEntry {
    /// The label shown for this entry
    pub fn display_name(&self) -> &str {
        match self {
            SidebarEntry::Tag(tag) => &tag.name,
            SidebarEntry::SavedSearch(search) => search.display_name(),
            SidebarEntry::Separator => "",
            SidebarEntry::AllTasks => "All tasks",
            SidebarEntry::SavedSearchesGroup => "Saved searches",
            SidebarEntry::NoTags => "Tasks with no tags",
        }
    }

    pub fn icon(&self) -> Option<&str> {
        match self {
            SidebarEntry::Tag(tag) => tag.icon.as_deref(),
            SidebarEntry::SavedSearch(search) => search.icon.as_deref(),
            _ => None,
        }
    }

    pub fn is_separator(&self) -> bool {
        matches!(self, SidebarEntry::Separator)
    }

    /// Entries that don't stand for user data
    pub fn is_special(&self) -> bool {
        !matches!(self, SidebarEntry::Tag(_) | SidebarEntry::SavedSearch(_))
    }
}
