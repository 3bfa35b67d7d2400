//! One sync run: index the active tab, upsert the records, and rotate when
//! the run's environment is the terminal one.

use chrono::NaiveDate;
use serde::Serialize;

use crate::io::store::{SheetStore, StoreError};
use crate::model::config::SyncConfig;
use crate::model::issue::IssueRecord;
use crate::ops::indexer::index_tab;
use crate::ops::rotate::{RotateError, RotationOutcome, RotationSettings, archive_name_for, rotate};
use crate::ops::upsert::{ApplyError, CellWrite, UpsertSettings, apply_plan, plan_upserts};
use crate::parse::a1::RangeParseError;
use crate::parse::ticket_key::{KeyPatternError, TicketKeyParser};

#[derive(Debug, Clone)]
pub struct SyncRequest {
    pub records: Vec<IssueRecord>,
    /// Environment of this run; compared against the terminal environment
    pub environment: String,
    pub today: NaiveDate,
    /// Value carried into the fresh active tab, overriding the configured cell
    pub carry: Option<String>,
    /// When false, a terminal-environment run does not rotate
    pub rotate: bool,
    /// Plan only; the store is not written
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub tab: String,
    pub header_row: Option<u32>,
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
    pub writes: Vec<CellWrite>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation: Option<RotationOutcome>,
    /// Archive name a dry run would have used
    #[serde(skip_serializing_if = "Option::is_none")]
    pub planned_archive: Option<String>,
    pub dry_run: bool,
}

/// Error type for a sync run
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("required tab \"{0}\" is missing from the workbook")]
    MissingTab(String),
    #[error(transparent)]
    KeyPattern(#[from] KeyPatternError),
    #[error("invalid carry cell in config: {0}")]
    Range(#[from] RangeParseError),
    #[error("could not index tab \"{tab}\": {source}")]
    Index { tab: String, source: StoreError },
    #[error("{source}")]
    Apply {
        source: ApplyError,
        /// Writes not applied, starting with the failing one
        pending: Vec<CellWrite>,
    },
    #[error(transparent)]
    Rotate(#[from] RotateError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

fn require_tab<S: SheetStore + ?Sized>(store: &S, name: &str) -> Result<(), SyncError> {
    match store.find_tab(name)? {
        Some(_) => Ok(()),
        None => Err(SyncError::MissingTab(name.to_string())),
    }
}

/// Rewrite each record's key into the form the indexer reads back. Records
/// whose key the parser rejects are dropped and counted.
fn canonical_records(
    records: &[IssueRecord],
    parser: &TicketKeyParser,
) -> (Vec<IssueRecord>, usize) {
    let mut kept = Vec::with_capacity(records.len());
    let mut rejected = 0;
    for record in records {
        if record.issue_key.trim().is_empty() {
            // plan_upserts counts blank keys itself
            kept.push(record.clone());
            continue;
        }
        match parser.whole_key(&record.issue_key) {
            Some(key) => kept.push(IssueRecord {
                issue_key: key,
                ..record.clone()
            }),
            None => {
                tracing::warn!(key = %record.issue_key, "skipping record: not a recognised issue key");
                rejected += 1;
            }
        }
    }
    (kept, rejected)
}

/// Run one sync against `store`.
pub fn run_sync<S: SheetStore + ?Sized>(
    store: &mut S,
    config: &SyncConfig,
    request: &SyncRequest,
) -> Result<SyncReport, SyncError> {
    let tab = config.sheet.active_tab.as_str();
    let rotating = request.rotate && config.rotation.is_terminal(&request.environment);
    let rotation = RotationSettings::from_config(config)?;

    require_tab(&*store, tab)?;
    if rotating {
        require_tab(&*store, &rotation.template_tab)?;
    }

    let parser = TicketKeyParser::new(&config.keys.prefixes)?;
    let mut index = index_tab(&*store, tab, &parser).map_err(|source| SyncError::Index {
        tab: tab.to_string(),
        source,
    })?;
    let (records, rejected) = canonical_records(&request.records, &parser);
    let plan = plan_upserts(&records, &mut index, &UpsertSettings::from(config));

    let mut report = SyncReport {
        tab: tab.to_string(),
        header_row: index.header_row,
        inserted: plan.inserted,
        updated: plan.updated,
        skipped: plan.skipped + rejected,
        writes: plan.writes.clone(),
        rotation: None,
        planned_archive: None,
        dry_run: request.dry_run,
    };

    if request.dry_run {
        if rotating {
            report.planned_archive = Some(archive_name_for(request.today, &store.tab_names()?));
        }
        tracing::info!(
            inserted = plan.inserted,
            updated = plan.updated,
            "dry run; nothing written"
        );
        return Ok(report);
    }

    apply_plan(store, tab, &plan).map_err(|source| SyncError::Apply {
        pending: plan.writes[source.applied..].to_vec(),
        source,
    })?;
    tracing::info!(
        tab,
        inserted = plan.inserted,
        updated = plan.updated,
        skipped = plan.skipped + rejected,
        "synced records"
    );

    if rotating {
        let outcome = rotate(store, &rotation, request.carry.as_deref(), request.today)?;
        report.rotation = Some(outcome);
    } else if config.rotation.is_terminal(&request.environment) {
        tracing::info!("rotation skipped by request");
    }

    Ok(report)
}
