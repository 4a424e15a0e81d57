use serde::{Deserialize, Serialize};
use std::fmt;

/// A search query the user saved for later recall
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedSearch {
    /// User-facing name (may be empty)
    pub name: String,
    /// The query string, in search syntax
    pub query: String,
    /// Icon to show next to the name, an emoji like tags use
    #[serde(default)]
    pub icon: Option<String>,
}

impl SavedSearch {
    pub fn new(name: impl Into<String>, query: impl Into<String>) -> Self {
        SavedSearch {
            name: name.into(),
            query: query.into(),
            icon: None,
        }
    }

    /// The name, or the query itself when no name was given
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.query
        } else {
            &self.name
        }
    }
}

impl fmt::Display for SavedSearch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Saved Search: {}", self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_falls_back_to_query() {
        assert_eq!(SavedSearch::new("Urgent", "@urgent").display_name(), "Urgent");
        assert_eq!(SavedSearch::new("", "@urgent !today").display_name(), "@urgent !today");
    }

    #[test]
    fn display() {
        let search = SavedSearch::new("", "@work");
        assert_eq!(search.to_string(), "Saved Search: @work");
    }
}
