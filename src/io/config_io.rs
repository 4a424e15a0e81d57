use std::fs;
use std::path::{Path, PathBuf};

use crate::model::Config;

pub const CONFIG_FILE: &str = "sidebar.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not write {path}: {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse sidebar.toml: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("could not parse sidebar.toml for editing: {0}")]
    EditError(#[from] toml_edit::TomlError),
}

/// Read the config at `path`, returning the parsed config and the raw
/// document for format-preserving edits.
pub fn read_config(path: &Path) -> Result<(Config, toml_edit::DocumentMut), ConfigError> {
    let text = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    let config: Config = toml::from_str(&text)?;
    let doc: toml_edit::DocumentMut = text.parse()?;
    Ok((config, doc))
}

/// Like `read_config`, but a missing file yields the defaults and an empty
/// document.
pub fn load_config(path: &Path) -> Result<(Config, toml_edit::DocumentMut), ConfigError> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        return Ok((Config::default(), toml_edit::DocumentMut::new()));
    }
    read_config(path)
}

/// Write the document back to disk, preserving formatting
pub fn write_config(path: &Path, doc: &toml_edit::DocumentMut) -> Result<(), ConfigError> {
    fs::write(path, doc.to_string()).map_err(|e| ConfigError::WriteError {
        path: path.to_path_buf(),
        source: e,
    })
}

fn ensure_table(doc: &mut toml_edit::DocumentMut, name: &str) {
    if !doc.contains_key(name) {
        doc[name] = toml_edit::Item::Table(toml_edit::Table::new());
    }
}

/// Set `log.debug`. Takes effect on the next start.
pub fn set_debug(doc: &mut toml_edit::DocumentMut, debug: bool) {
    ensure_table(doc, "log");
    doc["log"]["debug"] = toml_edit::value(debug);
}

pub fn set_label_width(doc: &mut toml_edit::DocumentMut, width: usize) {
    ensure_table(doc, "sidebar");
    doc["sidebar"]["label_width"] = toml_edit::value(i64::try_from(width).unwrap_or(i64::MAX));
}
