use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use crate::model::issue::IssueRecord;
use crate::parse::ticket_key::TicketKeyParser;

/// Where the records of one run come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordSource {
    /// Explicit issue keys
    Keys(Vec<String>),
    /// Free text (commit log, PR body, ...) scanned for keys
    Text(String),
    /// JSON array of issue records
    File(PathBuf),
}

/// Field values applied to records that leave them empty
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordDefaults {
    pub environment: String,
    pub app: String,
    pub author: String,
}

/// Error type for loading records
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse records in {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl RecordSource {
    /// Short description for logs and reports.
    pub fn label(&self) -> String {
        match self {
            RecordSource::Keys(keys) => format!("{} explicit key(s)", keys.len()),
            RecordSource::Text(text) => format!("{} bytes of text", text.len()),
            RecordSource::File(path) => path.display().to_string(),
        }
    }

    /// Produce the run's records, deduplicated by key (first occurrence
    /// wins). Entries whose key does not parse are skipped with a warning.
    pub fn load(
        &self,
        parser: &TicketKeyParser,
        defaults: &RecordDefaults,
    ) -> Result<Vec<IssueRecord>, SourceError> {
        let candidates: Vec<IssueRecord> = match self {
            RecordSource::Keys(keys) => keys
                .iter()
                .filter_map(|raw| match parser.whole_key(raw) {
                    Some(key) => Some(IssueRecord::new(&key, "", "")),
                    None => {
                        tracing::warn!(key = %raw, "skipping invalid issue key");
                        None
                    }
                })
                .collect(),
            RecordSource::Text(text) => parser
                .extract(text)
                .into_iter()
                .map(|key| IssueRecord::new(&key, "", ""))
                .collect(),
            RecordSource::File(path) => {
                let text = fs::read_to_string(path).map_err(|e| SourceError::ReadError {
                    path: path.clone(),
                    source: e,
                })?;
                let records: Vec<IssueRecord> =
                    serde_json::from_str(&text).map_err(|e| SourceError::ParseError {
                        path: path.clone(),
                        source: e,
                    })?;
                records
                    .into_iter()
                    .filter_map(|mut record| match parser.whole_key(&record.issue_key) {
                        Some(key) => {
                            record.issue_key = key;
                            Some(record)
                        }
                        None => {
                            tracing::warn!(
                                key = %record.issue_key,
                                file = %path.display(),
                                "skipping record with invalid issue key"
                            );
                            None
                        }
                    })
                    .collect()
            }
        };

        let mut seen = HashSet::new();
        let mut records = Vec::with_capacity(candidates.len());
        for mut record in candidates {
            if !seen.insert(record.issue_key.clone()) {
                tracing::debug!(key = %record.issue_key, "dropping repeated record");
                continue;
            }
            fill(&mut record.environment, &defaults.environment);
            fill(&mut record.app, &defaults.app);
            fill(&mut record.author, &defaults.author);
            records.push(record);
        }
        tracing::debug!(source = %self.label(), records = records.len(), "loaded records");
        Ok(records)
    }
}

fn fill(field: &mut String, default: &str) {
    if field.trim().is_empty() {
        *field = default.to_string();
    }
}
