use serde::Serialize;

use crate::io::store::{SheetStore, StoreError};
use crate::model::config::{LabelConfig, SyncConfig};
use crate::model::issue::IssueRecord;
use crate::model::sheet::{APP_COLUMN, ENVIRONMENT_COLUMN, ISSUE_COLUMN};
use crate::ops::indexer::SheetIndex;
use crate::parse::a1::{CellRange, CellRef};
use crate::parse::ticket_key::hyperlink_formula;

/// Values the engine needs beyond the records themselves
#[derive(Debug, Clone)]
pub struct UpsertSettings {
    pub base_url: String,
    pub initial_status: String,
    pub labels: LabelConfig,
}

impl From<&SyncConfig> for UpsertSettings {
    fn from(config: &SyncConfig) -> Self {
        UpsertSettings {
            base_url: config.links.base_url.clone(),
            initial_status: config.sheet.initial_status.clone(),
            labels: config.labels.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteKind {
    Insert,
    Update,
}

/// One column-scoped write against the active tab
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CellWrite {
    pub key: String,
    pub kind: WriteKind,
    pub row: u32,
    pub range: CellRange,
    pub values: Vec<Vec<String>>,
}

impl CellWrite {
    /// `D4 <- Production` style one-liner for logs.
    pub fn summary(&self) -> String {
        let values: Vec<String> = self.values.iter().map(|r| r.join(" | ")).collect();
        format!("{} <- {}", self.range, values.join(" / "))
    }
}

/// Ordered writes for one batch of records
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpsertPlan {
    pub writes: Vec<CellWrite>,
    pub inserted: usize,
    pub updated: usize,
    /// Records dropped because their key was blank
    pub skipped: usize,
}

/// Error from applying a plan part way
#[derive(Debug, thiserror::Error)]
#[error("write {failed} of {total} ({range}) failed: {source}")]
pub struct ApplyError {
    /// Writes that completed before the failure
    pub applied: usize,
    /// 1-based position of the failing write
    pub failed: usize,
    pub total: usize,
    pub range: String,
    pub source: StoreError,
}

/// Decide insert vs. update for every record, in input order.
///
/// An existing key only has its environment cell rewritten. A new key takes
/// the next row from the index cursor and gets the full row payload; the
/// index is updated immediately, so a key repeated later in the same batch
/// becomes an update of that row.
pub fn plan_upserts(
    records: &[IssueRecord],
    index: &mut SheetIndex,
    settings: &UpsertSettings,
) -> UpsertPlan {
    let mut plan = UpsertPlan::default();

    for record in records {
        let key = record.normalized_key();
        if key.is_empty() {
            tracing::warn!("skipping record with an empty issue key");
            plan.skipped += 1;
            continue;
        }
        let environment = settings.labels.environment_label(&record.environment);

        if let Some(row) = index.rows.get(&key) {
            plan.writes.push(CellWrite {
                key,
                kind: WriteKind::Update,
                row,
                range: CellRange::cell(CellRef::new(ENVIRONMENT_COLUMN, row)),
                values: vec![vec![environment]],
            });
            plan.updated += 1;
            continue;
        }

        let row = index.cursor.take();
        let values = vec![
            hyperlink_formula(&settings.base_url, &key),
            settings.initial_status.clone(),
            record.author.clone(),
            environment,
            settings.labels.app_label(&record.app),
        ];
        index.rows.insert(key.clone(), row);
        plan.writes.push(CellWrite {
            key,
            kind: WriteKind::Insert,
            row,
            range: CellRange::row_span(ISSUE_COLUMN, APP_COLUMN, row),
            values: vec![values],
        });
        plan.inserted += 1;
    }

    plan
}

/// Execute the plan's writes in order, stopping at the first failure.
/// Returns the number of writes applied.
pub fn apply_plan<S: SheetStore + ?Sized>(
    store: &mut S,
    tab: &str,
    plan: &UpsertPlan,
) -> Result<usize, ApplyError> {
    let total = plan.writes.len();
    for (i, write) in plan.writes.iter().enumerate() {
        tracing::debug!(key = %write.key, kind = ?write.kind, "{}", write.summary());
        if let Err(source) = store.write_range(tab, &write.range, &write.values) {
            return Err(ApplyError {
                applied: i,
                failed: i + 1,
                total,
                range: write.range.to_string(),
                source,
            });
        }
    }
    Ok(total)
}
