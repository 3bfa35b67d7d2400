use std::fs;
use std::path::{Path, PathBuf};

use crate::model::config::SyncConfig;

pub const CONFIG_FILE: &str = "relsync.toml";

/// Error type for config I/O
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no relsync.toml found here or in any parent directory (run `relsync init`)")]
    NotFound,
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
    #[error("could not parse relsync.toml: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("could not edit relsync.toml: {0}")]
    EditError(#[from] toml_edit::TomlError),
    #[error("unknown config key \"{0}\" (expected section.key, e.g. sheet.active_tab)")]
    UnknownKey(String),
}

/// Walk up from `start` looking for relsync.toml; returns the directory
/// holding it.
pub fn discover_config(start: &Path) -> Result<PathBuf, ConfigError> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(CONFIG_FILE).is_file() {
            return Ok(current);
        }
        if !current.pop() {
            return Err(ConfigError::NotFound);
        }
    }
}

/// Load relsync.toml from `dir`.
pub fn load_config(dir: &Path) -> Result<SyncConfig, ConfigError> {
    Ok(read_config(dir)?.0)
}

/// Read the config, returning both the parsed config and the raw toml_edit
/// document for round-trip-safe editing.
pub fn read_config(dir: &Path) -> Result<(SyncConfig, toml_edit::DocumentMut), ConfigError> {
    let path = dir.join(CONFIG_FILE);
    let text = fs::read_to_string(&path).map_err(|e| ConfigError::ReadError {
        path: path.clone(),
        source: e,
    })?;
    let config: SyncConfig = toml::from_str(&text)?;
    let doc: toml_edit::DocumentMut = text.parse()?;
    Ok((config, doc))
}

/// Write the document back, preserving comments and layout.
pub fn write_config(dir: &Path, doc: &toml_edit::DocumentMut) -> Result<(), ConfigError> {
    let path = dir.join(CONFIG_FILE);
    fs::write(&path, doc.to_string()).map_err(|e| ConfigError::WriteError { path, source: e })
}

fn split_key(key: &str) -> Result<(&str, &str), ConfigError> {
    match key.split_once('.') {
        Some((section, field)) if !section.is_empty() && !field.is_empty() => {
            Ok((section, field))
        }
        _ => Err(ConfigError::UnknownKey(key.to_string())),
    }
}

/// Read `section.key` as a display string. Arrays are comma-joined.
pub fn get_value(doc: &toml_edit::DocumentMut, key: &str) -> Result<Option<String>, ConfigError> {
    let (section, field) = split_key(key)?;
    let Some(item) = doc.get(section).and_then(|s| s.get(field)) else {
        return Ok(None);
    };
    if let Some(s) = item.as_str() {
        return Ok(Some(s.to_string()));
    }
    if let Some(arr) = item.as_array() {
        let parts: Vec<String> = arr
            .iter()
            .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
            .collect();
        return Ok(Some(parts.join(",")));
    }
    Ok(Some(item.to_string().trim().to_string()))
}

/// Set `section.key`. `keys.prefixes` takes a comma-separated list; every
/// other key is stored as a string.
pub fn set_value(doc: &mut toml_edit::DocumentMut, key: &str, value: &str) -> Result<(), ConfigError> {
    let (section, field) = split_key(key)?;
    if !doc.contains_key(section) {
        doc[section] = toml_edit::Item::Table(toml_edit::Table::new());
    }
    if section == "keys" && field == "prefixes" {
        let mut arr = toml_edit::Array::new();
        for part in value.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            arr.push(part);
        }
        doc[section][field] = toml_edit::value(arr);
    } else {
        doc[section][field] = toml_edit::value(value);
    }
    // Reject edits that no longer deserialize
    toml::from_str::<SyncConfig>(&doc.to_string())?;
    Ok(())
}
