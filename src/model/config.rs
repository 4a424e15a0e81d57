use serde::{Deserialize, Serialize};

/// Configuration from sidebar.toml
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub sidebar: SidebarConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Enable debug output for the whole process. Read once at startup.
    #[serde(default)]
    pub debug: bool,
    /// Explicit filter directive (`sidebar_tree=trace`). Wins over `debug`.
    #[serde(default)]
    pub filter: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SidebarConfig {
    #[serde(default = "default_true")]
    pub show_all_tasks: bool,
    #[serde(default = "default_true")]
    pub show_no_tags: bool,
    #[serde(default = "default_true")]
    pub show_separator: bool,
    /// Maximum label width in terminal cells for rendered outlines
    #[serde(default = "default_label_width")]
    pub label_width: usize,
}

impl Default for SidebarConfig {
    fn default() -> Self {
        SidebarConfig {
            show_all_tasks: true,
            show_no_tags: true,
            show_separator: true,
            label_width: 32,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_label_width() -> usize {
    32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert!(config.sidebar.show_separator);
        assert_eq!(config.sidebar.label_width, 32);
        assert!(!config.log.debug);
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let config: Config = toml::from_str("[sidebar]\nshow_no_tags = false\n").unwrap();
        assert!(!config.sidebar.show_no_tags);
        assert!(config.sidebar.show_all_tasks);
        assert_eq!(config.sidebar.label_width, 32);
    }
}
