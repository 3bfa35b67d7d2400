use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tempfile::NamedTempFile;

/// Self-documenting header written at the top of a new recovery log.
const FILE_HEADER: &str = "\
<!-- relsync recovery log: append-only record of interrupted runs
     Each entry lists the sheet writes that were planned but not applied.
     Re-running the same sync applies them again.
     View with: relsync recovery
     Safe to delete once the workbook is back in shape. -->

---
";

/// Category of a recovery entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryCategory {
    /// Issue row writes that did not reach the store
    Write,
    /// A rotation stopped part way
    Rotation,
}

impl fmt::Display for RecoveryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecoveryCategory::Write => write!(f, "write"),
            RecoveryCategory::Rotation => write!(f, "rotation"),
        }
    }
}

/// A single entry in the recovery log.
#[derive(Debug, Clone)]
pub struct RecoveryEntry {
    pub timestamp: DateTime<Utc>,
    pub category: RecoveryCategory,
    pub description: String,
    pub fields: Vec<(String, String)>,
    pub body: String,
}

/// Return the path to the recovery log file.
pub fn recovery_log_path(config_dir: &Path) -> PathBuf {
    config_dir.join(".relsync-recovery.log")
}

/// Write `content` to `path` atomically using a temp file + rename.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

impl RecoveryEntry {
    /// Format this entry as a markdown block for the recovery log.
    fn to_markdown(&self) -> String {
        let mut out = format!(
            "## {} {}: {}\n\n",
            self.timestamp
                .to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            self.category,
            self.description,
        );
        for (key, value) in &self.fields {
            out.push_str(&format!("{}: {}\n", key, value));
        }
        if !self.body.is_empty() {
            out.push_str("\n```text\n");
            out.push_str(&self.body);
            if !self.body.ends_with('\n') {
                out.push('\n');
            }
            out.push_str("```\n");
        }
        out.push_str("\n---\n");
        out
    }
}

/// Append a recovery entry to the log. Errors are reported, not returned:
/// the run has already failed and that error takes precedence.
pub fn log_recovery(config_dir: &Path, entry: RecoveryEntry) {
    if let Err(e) = log_recovery_inner(config_dir, entry) {
        tracing::warn!("could not write to recovery log: {}", e);
    }
}

fn log_recovery_inner(config_dir: &Path, entry: RecoveryEntry) -> io::Result<()> {
    let path = recovery_log_path(config_dir);
    let needs_header = std::fs::metadata(&path).map_or(true, |m| m.len() == 0);
    let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
    if needs_header {
        file.write_all(FILE_HEADER.as_bytes())?;
    }
    file.write_all(entry.to_markdown().as_bytes())?;
    Ok(())
}

/// Read the raw recovery log, or `None` if there is none.
pub fn read_recovery_log(config_dir: &Path) -> io::Result<Option<String>> {
    let path = recovery_log_path(config_dir);
    match std::fs::read_to_string(&path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Split a log into its entry blocks (header dropped), oldest first.
pub fn split_entries(log: &str) -> Vec<String> {
    log.split("\n---\n")
        .map(str::trim)
        .filter(|block| block.starts_with("## "))
        .map(|block| block.to_string())
        .collect()
}
