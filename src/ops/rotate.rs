use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use crate::io::store::{SheetStore, StoreError};
use crate::model::config::SyncConfig;
use crate::model::sheet::{TEMPLATE_TAB, TabInfo};
use crate::ops::unique_name::resolve_unique_name;
use crate::parse::a1::{CellRange, CellRef, RangeParseError};

/// Tabs and cells involved in a rotation
#[derive(Debug, Clone)]
pub struct RotationSettings {
    pub active_tab: String,
    pub template_tab: String,
    /// Cell of the outgoing active tab holding the value to carry
    pub carry_from: Option<CellRef>,
    /// Cell of the fresh active tab receiving it
    pub carry_to: Option<CellRef>,
}

impl RotationSettings {
    pub fn from_config(config: &SyncConfig) -> Result<Self, RangeParseError> {
        let carry_from: Option<CellRef> = config
            .rotation
            .carry_from
            .as_deref()
            .map(str::parse)
            .transpose()?;
        let carry_to = match config.rotation.carry_to.as_deref() {
            Some(cell) => Some(cell.parse()?),
            None => carry_from,
        };
        Ok(RotationSettings {
            active_tab: config.sheet.active_tab.clone(),
            template_tab: TEMPLATE_TAB.to_string(),
            carry_from,
            carry_to,
        })
    }
}

/// Rotation steps, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationStep {
    ReadCarry,
    ListTabs,
    ArchiveActive,
    DuplicateTemplate,
    RenameCopy,
    MoveToFront,
    WriteCarry,
}

impl fmt::Display for RotationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RotationStep::ReadCarry => "read carry value",
            RotationStep::ListTabs => "list tabs",
            RotationStep::ArchiveActive => "archive active tab",
            RotationStep::DuplicateTemplate => "duplicate template",
            RotationStep::RenameCopy => "rename template copy",
            RotationStep::MoveToFront => "move new tab to front",
            RotationStep::WriteCarry => "write carry value",
        };
        write!(f, "{}", s)
    }
}

/// A rotation that stopped part way. Earlier steps stay applied.
#[derive(Debug, thiserror::Error)]
#[error("rotation failed at step \"{step}\": {source}")]
pub struct RotateError {
    pub step: RotationStep,
    /// Set once the active tab has been renamed
    pub archive_name: Option<String>,
    pub source: StoreError,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RotationOutcome {
    pub archive_name: String,
    /// The fresh active tab
    pub active: TabInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub carried: Option<String>,
}

fn failed_at(step: RotationStep, archive_name: Option<String>) -> impl FnOnce(StoreError) -> RotateError {
    move |source| RotateError {
        step,
        archive_name,
        source,
    }
}

/// Archive name for `today`, free among `existing`.
pub fn archive_name_for(today: NaiveDate, existing: &[String]) -> String {
    resolve_unique_name(&today.format("%Y-%m-%d").to_string(), existing)
}

/// Archive the active tab and seed a new one from the template.
///
/// 1. capture the carry value (explicit override, else the `carry_from` cell)
/// 2. list tabs and pick the archive name
/// 3. rename the active tab to the archive name
/// 4. duplicate the template
/// 5. rename the copy to the active tab's name
/// 6. move it to the front
/// 7. write the carry value into the new tab
///
/// Steps run strictly in order. A failure aborts without undoing earlier
/// steps, leaving the workbook in a state that shows where it stopped.
pub fn rotate<S: SheetStore + ?Sized>(
    store: &mut S,
    settings: &RotationSettings,
    carry_override: Option<&str>,
    today: NaiveDate,
) -> Result<RotationOutcome, RotateError> {
    let active = settings.active_tab.as_str();

    let carried = match (carry_override, settings.carry_from) {
        (Some(value), _) => Some(value.to_string()),
        (None, Some(cell)) => {
            let value = store
                .read_cell(active, cell)
                .map_err(failed_at(RotationStep::ReadCarry, None))?;
            let value = value.trim().to_string();
            (!value.is_empty()).then_some(value)
        }
        (None, None) => None,
    };

    let names = store
        .tab_names()
        .map_err(failed_at(RotationStep::ListTabs, None))?;
    let archive_name = archive_name_for(today, &names);

    store
        .rename_tab(active, &archive_name)
        .map_err(failed_at(RotationStep::ArchiveActive, None))?;
    tracing::info!(from = active, to = %archive_name, "archived active tab");

    let copy = store
        .duplicate_tab(&settings.template_tab)
        .map_err(failed_at(RotationStep::DuplicateTemplate, Some(archive_name.clone())))?;
    store
        .rename_tab(&copy.name, active)
        .map_err(failed_at(RotationStep::RenameCopy, Some(archive_name.clone())))?;
    let info = store
        .move_tab(active, 0)
        .map_err(failed_at(RotationStep::MoveToFront, Some(archive_name.clone())))?;
    tracing::info!(tab = active, id = info.id, "created active tab from template");

    if let (Some(value), Some(cell)) = (&carried, settings.carry_to) {
        store
            .write_range(active, &CellRange::cell(cell), &[vec![value.clone()]])
            .map_err(failed_at(RotationStep::WriteCarry, Some(archive_name.clone())))?;
        tracing::info!(cell = %cell, value = %value, "carried value into new tab");
    }

    Ok(RotationOutcome {
        archive_name,
        active: info,
        carried,
    })
}
