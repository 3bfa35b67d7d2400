use serde::Serialize;

use crate::model::sheet::TabInfo;
use crate::ops::indexer::SheetIndex;
use crate::ops::rotate::RotationOutcome;
use crate::ops::sync::SyncReport;
use crate::ops::upsert::{CellWrite, WriteKind};

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct IndexJson {
    pub tab: String,
    pub header_row: Option<u32>,
    pub next_insert_row: u32,
    pub reusable_rows: usize,
    pub keys: Vec<IndexEntryJson>,
}

#[derive(Serialize)]
pub struct IndexEntryJson {
    pub key: String,
    pub row: u32,
}

#[derive(Serialize)]
pub struct TabListJson {
    pub active: String,
    pub tabs: Vec<TabInfo>,
}

#[derive(Serialize)]
pub struct KeysJson {
    pub keys: Vec<String>,
}

#[derive(Serialize)]
pub struct RecoveryJson {
    pub path: String,
    pub entries: Vec<String>,
}

pub fn index_to_json(tab: &str, index: &SheetIndex) -> IndexJson {
    IndexJson {
        tab: tab.to_string(),
        header_row: index.header_row,
        next_insert_row: index.cursor.peek(),
        reusable_rows: index.cursor.reusable(),
        keys: index
            .rows
            .iter()
            .map(|(key, row)| IndexEntryJson {
                key: key.to_string(),
                row,
            })
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// Text formatting
// ---------------------------------------------------------------------------

/// `+ ADV-5  A2:E2  <formula> | Pending | ...`
pub fn format_write_line(write: &CellWrite) -> String {
    let marker = match write.kind {
        WriteKind::Insert => '+',
        WriteKind::Update => '~',
    };
    format!("{} {}  {}", marker, write.key, write.summary())
}

pub fn format_rotation(outcome: &RotationOutcome) -> Vec<String> {
    let mut lines = vec![format!(
        "archived as \"{}\"; new \"{}\" at position {}",
        outcome.archive_name,
        outcome.active.name,
        outcome.active.index + 1
    )];
    if let Some(ref value) = outcome.carried {
        lines.push(format!("carried: {}", value));
    }
    lines
}

pub fn format_sync_report(report: &SyncReport) -> Vec<String> {
    let mut lines = Vec::new();
    let verb = if report.dry_run { "would sync" } else { "synced" };
    let mut summary = format!(
        "{} {}: {} inserted, {} updated",
        verb, report.tab, report.inserted, report.updated
    );
    if report.skipped > 0 {
        summary.push_str(&format!(", {} skipped", report.skipped));
    }
    lines.push(summary);
    for write in &report.writes {
        lines.push(format!("  {}", format_write_line(write)));
    }
    if let Some(ref outcome) = report.rotation {
        lines.extend(format_rotation(outcome));
    }
    if let Some(ref name) = report.planned_archive {
        lines.push(format!("would archive as \"{}\"", name));
    }
    lines
}

pub fn format_index(tab: &str, index: &SheetIndex) -> Vec<String> {
    let header = match index.header_row {
        Some(row) => format!("header row {}", row),
        None => "no header row".to_string(),
    };
    let mut lines = vec![format!(
        "{}: {} keys, {}, next insert row {}",
        tab,
        index.rows.len(),
        header,
        index.cursor.peek()
    )];
    let width = index.rows.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
    for (key, row) in index.rows.iter() {
        lines.push(format!("  {:<width$}  {}", key, row, width = width));
    }
    lines
}

pub fn format_tab_listing(tabs: &[TabInfo], active: &str) -> Vec<String> {
    tabs.iter()
        .map(|t| {
            let marker = if t.name == active { '*' } else { ' ' };
            format!("{} {}", marker, t.name)
        })
        .collect()
}
