use std::collections::VecDeque;

use indexmap::IndexMap;
use serde::Serialize;

use crate::io::store::{SheetStore, StoreError};
use crate::model::sheet::{HEADER_LABEL, ISSUE_COLUMN, LAST_COLUMN};
use crate::parse::a1::CellRange;
use crate::parse::ticket_key::TicketKeyParser;

/// Issue key → 1-based physical row, valid for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RowIndex {
    rows: IndexMap<String, u32>,
}

impl RowIndex {
    pub fn get(&self, key: &str) -> Option<u32> {
        self.rows.get(key).copied()
    }

    /// Record `key` at `row`, returning the row it previously pointed at.
    pub fn insert(&mut self, key: String, row: u32) -> Option<u32> {
        self.rows.insert(key, row)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.rows.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// Where inserts go. Blank rows found by the scan are reused first, in
/// order; after that rows are taken consecutively past the scanned range.
/// Advances in memory only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmptyRowCursor {
    blanks: VecDeque<u32>,
    next_fresh: u32,
}

impl EmptyRowCursor {
    pub fn new(blanks: Vec<u32>, next_fresh: u32) -> Self {
        EmptyRowCursor {
            blanks: blanks.into(),
            next_fresh,
        }
    }

    /// Row the next insert will land on.
    pub fn peek(&self) -> u32 {
        self.blanks.front().copied().unwrap_or(self.next_fresh)
    }

    /// Consume the next insert row.
    pub fn take(&mut self) -> u32 {
        match self.blanks.pop_front() {
            Some(row) => row,
            None => {
                let row = self.next_fresh;
                self.next_fresh += 1;
                row
            }
        }
    }

    /// Blank rows still available before the fresh region.
    pub fn reusable(&self) -> usize {
        self.blanks.len()
    }
}

/// State derived from one scan of the active tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SheetIndex {
    /// Row holding the header label, `None` when the tab has no header and
    /// every row is treated as data.
    pub header_row: Option<u32>,
    pub rows: RowIndex,
    pub cursor: EmptyRowCursor,
}

impl SheetIndex {
    /// First row below the header.
    pub fn first_data_row(&self) -> u32 {
        self.header_row.map_or(1, |h| h + 1)
    }
}

/// Build the index from a tab's rows; `rows[i]` is physical row `i + 1`.
pub fn index_rows(rows: &[Vec<String>], issue_column: usize, parser: &TicketKeyParser) -> SheetIndex {
    let cell = |row: &Vec<String>| -> String {
        row.get(issue_column)
            .map(|c| c.trim().to_string())
            .unwrap_or_default()
    };

    let header_pos = rows
        .iter()
        .position(|row| cell(row).to_lowercase() == HEADER_LABEL);
    if header_pos.is_none() {
        tracing::warn!(
            "no \"{}\" header found in column {}; treating every row as data",
            HEADER_LABEL,
            crate::parse::a1::column_letters(issue_column)
        );
    }
    let header_row = header_pos.map(|i| i as u32 + 1);
    let start = header_pos.map_or(0, |i| i + 1);

    let mut index = RowIndex::default();
    let mut blanks = Vec::new();
    for (i, row) in rows.iter().enumerate().skip(start) {
        let physical = i as u32 + 1;
        let value = cell(row);
        if value.is_empty() {
            blanks.push(physical);
            continue;
        }
        if let Some(key) = parser.parse_cell(&value) {
            if let Some(previous) = index.insert(key.clone(), physical) {
                tracing::debug!(
                    key = %key,
                    previous,
                    row = physical,
                    "duplicate issue row; last occurrence wins"
                );
            }
        }
    }

    SheetIndex {
        header_row,
        rows: index,
        cursor: EmptyRowCursor::new(blanks, rows.len() as u32 + 1),
    }
}

/// Read the active tab and index it.
pub fn index_tab<S: SheetStore + ?Sized>(
    store: &S,
    tab: &str,
    parser: &TicketKeyParser,
) -> Result<SheetIndex, StoreError> {
    let rows = store.read_range(tab, &CellRange::columns(ISSUE_COLUMN, LAST_COLUMN))?;
    let index = index_rows(&rows, ISSUE_COLUMN, parser);
    tracing::debug!(
        tab,
        scanned = rows.len(),
        keys = index.rows.len(),
        next_insert = index.cursor.peek(),
        "indexed tab"
    );
    Ok(index)
}
