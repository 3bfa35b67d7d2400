//! The narrow capability interface the sync engine needs from a tabular
//! store, and its implementation over an in-memory [`Workbook`].

use std::path::PathBuf;

use crate::model::sheet::TabInfo;
use crate::model::workbook::Workbook;
use crate::ops::unique_name::resolve_unique_name;
use crate::parse::a1::{CellRange, CellRef};

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("tab \"{0}\" not found")]
    TabNotFound(String),
    #[error("a tab named \"{0}\" already exists")]
    TabExists(String),
    #[error("{rows}x{cols} values do not fit range {range}")]
    RangeMismatch {
        range: String,
        rows: usize,
        cols: usize,
    },
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
    #[error("could not parse workbook {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("could not serialize workbook: {0}")]
    SerializeError(#[from] serde_json::Error),
}

/// Operations against a workbook-like store. Tabs are addressed by name,
/// cells by A1 range. Every call is one complete round-trip: when it
/// returns, its effect is visible to the next call.
pub trait SheetStore {
    /// All tabs in display order.
    fn tabs(&self) -> Result<Vec<TabInfo>, StoreError>;

    /// Cell values inside `range`. Trailing empty cells of each row and
    /// trailing empty rows are omitted; row `i` of the result is physical
    /// row `range.first_row() + i`.
    fn read_range(&self, tab: &str, range: &CellRange) -> Result<Vec<Vec<String>>, StoreError>;

    /// Write `values` with their top-left corner at the range start. The
    /// values must fit inside `range`.
    fn write_range(
        &mut self,
        tab: &str,
        range: &CellRange,
        values: &[Vec<String>],
    ) -> Result<(), StoreError>;

    /// Write `values` into the row after the last used row; returns its number.
    fn append_row(&mut self, tab: &str, values: &[String]) -> Result<u32, StoreError>;

    fn rename_tab(&mut self, tab: &str, new_name: &str) -> Result<TabInfo, StoreError>;

    /// Copy a tab (contents included) under a fresh name placed right after
    /// the source.
    fn duplicate_tab(&mut self, tab: &str) -> Result<TabInfo, StoreError>;

    /// Move a tab to display position `index` (clamped to the last position).
    fn move_tab(&mut self, tab: &str, index: usize) -> Result<TabInfo, StoreError>;

    fn tab_names(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.tabs()?.into_iter().map(|t| t.name).collect())
    }

    fn find_tab(&self, name: &str) -> Result<Option<TabInfo>, StoreError> {
        Ok(self.tabs()?.into_iter().find(|t| t.name == name))
    }

    /// Value of a single cell, empty when unset.
    fn read_cell(&self, tab: &str, cell: CellRef) -> Result<String, StoreError> {
        let rows = self.read_range(tab, &CellRange::cell(cell))?;
        Ok(rows
            .into_iter()
            .next()
            .and_then(|row| row.into_iter().next())
            .unwrap_or_default())
    }
}

impl SheetStore for Workbook {
    fn tabs(&self) -> Result<Vec<TabInfo>, StoreError> {
        Ok((0..self.tabs.len()).map(|i| self.info(i)).collect())
    }

    fn read_range(&self, tab: &str, range: &CellRange) -> Result<Vec<Vec<String>>, StoreError> {
        let tab = self
            .tab(tab)
            .ok_or_else(|| StoreError::TabNotFound(tab.to_string()))?;
        let first = range.first_row();
        let last = match range.end_row {
            Some(end) => end.min(tab.last_used_row()),
            None => tab.last_used_row(),
        };

        let mut out = Vec::new();
        for row in first..=last {
            let mut cells: Vec<String> = (range.start_col..=range.end_col)
                .map(|col| tab.cell(col, row).unwrap_or("").to_string())
                .collect();
            while cells.last().is_some_and(|c| c.is_empty()) {
                cells.pop();
            }
            out.push(cells);
        }
        while out.last().is_some_and(|r| r.is_empty()) {
            out.pop();
        }
        Ok(out)
    }

    fn write_range(
        &mut self,
        tab: &str,
        range: &CellRange,
        values: &[Vec<String>],
    ) -> Result<(), StoreError> {
        let widest = values.iter().map(|r| r.len()).max().unwrap_or(0);
        let fits_rows = range.height().is_none_or(|h| values.len() <= h);
        if widest > range.width() || !fits_rows {
            return Err(StoreError::RangeMismatch {
                range: range.to_string(),
                rows: values.len(),
                cols: widest,
            });
        }
        let target = self
            .tab_mut(tab)
            .ok_or_else(|| StoreError::TabNotFound(tab.to_string()))?;
        let first = range.first_row();
        for (r, row_values) in values.iter().enumerate() {
            for (c, value) in row_values.iter().enumerate() {
                target.set_cell(range.start_col + c, first + r as u32, value.clone());
            }
        }
        Ok(())
    }

    fn append_row(&mut self, tab: &str, values: &[String]) -> Result<u32, StoreError> {
        let target = self
            .tab_mut(tab)
            .ok_or_else(|| StoreError::TabNotFound(tab.to_string()))?;
        let row = target.last_used_row() + 1;
        for (col, value) in values.iter().enumerate() {
            target.set_cell(col, row, value.clone());
        }
        Ok(row)
    }

    fn rename_tab(&mut self, tab: &str, new_name: &str) -> Result<TabInfo, StoreError> {
        let index = self
            .position(tab)
            .ok_or_else(|| StoreError::TabNotFound(tab.to_string()))?;
        if tab != new_name && self.position(new_name).is_some() {
            return Err(StoreError::TabExists(new_name.to_string()));
        }
        self.tabs[index].name = new_name.to_string();
        Ok(self.info(index))
    }

    fn duplicate_tab(&mut self, tab: &str) -> Result<TabInfo, StoreError> {
        let index = self
            .position(tab)
            .ok_or_else(|| StoreError::TabNotFound(tab.to_string()))?;
        let name = resolve_unique_name(&format!("Copy of {}", tab), &self.names());
        let mut copy = self.tabs[index].clone();
        copy.id = self.allocate_id();
        copy.name = name;
        self.tabs.insert(index + 1, copy);
        Ok(self.info(index + 1))
    }

    fn move_tab(&mut self, tab: &str, index: usize) -> Result<TabInfo, StoreError> {
        let from = self
            .position(tab)
            .ok_or_else(|| StoreError::TabNotFound(tab.to_string()))?;
        let moved = self.tabs.remove(from);
        let to = index.min(self.tabs.len());
        self.tabs.insert(to, moved);
        Ok(self.info(to))
    }
}
