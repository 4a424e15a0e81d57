use serde::{Deserialize, Serialize};

/// A tag as shown in the sidebar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Tag name, including the leading `@`
    pub name: String,
    /// Background color as a hex string (`#729fcf`)
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
}

impl Tag {
    pub fn new(name: impl Into<String>) -> Self {
        Tag {
            name: name.into(),
            color: None,
            icon: None,
        }
    }
}
