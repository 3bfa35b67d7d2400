//! A1-style cell addressing.
//!
//! Supported forms: a single cell (`D4`), a bounded range (`A2:E2`), whole
//! columns (`A:K`) and a range open at the bottom (`A2:K`). Columns are
//! zero-based internally, rows are 1-based physical rows.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

/// Error returned when an A1 reference cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid cell reference \"{0}\"")]
pub struct RangeParseError(pub String);

/// Convert a zero-based column index to its letters (0 → `A`, 26 → `AA`).
pub fn column_letters(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Convert column letters to a zero-based index. Case-insensitive.
pub fn column_index(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }
    let mut acc: usize = 0;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let digit = (c.to_ascii_uppercase() as u8 - b'A') as usize + 1;
        acc = acc.checked_mul(26)?.checked_add(digit)?;
    }
    Some(acc - 1)
}

/// Split `"AB12"` into `("AB", Some(12))`, `"AB"` into `("AB", None)`.
fn split_part(part: &str) -> Option<(usize, Option<u32>)> {
    let split = part
        .find(|c: char| c.is_ascii_digit())
        .unwrap_or(part.len());
    let (letters, digits) = part.split_at(split);
    let col = column_index(letters)?;
    if digits.is_empty() {
        return Some((col, None));
    }
    let row: u32 = digits.parse().ok()?;
    if row == 0 {
        return None;
    }
    Some((col, Some(row)))
}

/// A single cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRef {
    pub col: usize,
    pub row: u32,
}

impl CellRef {
    pub fn new(col: usize, row: u32) -> Self {
        CellRef { col, row }
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_letters(self.col), self.row)
    }
}

impl FromStr for CellRef {
    type Err = RangeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match split_part(s.trim()) {
            Some((col, Some(row))) => Ok(CellRef { col, row }),
            _ => Err(RangeParseError(s.to_string())),
        }
    }
}

/// A rectangular range. `None` rows mean "unbounded" on that side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRange {
    pub start_col: usize,
    pub start_row: Option<u32>,
    pub end_col: usize,
    pub end_row: Option<u32>,
}

impl CellRange {
    pub fn cell(cell: CellRef) -> Self {
        CellRange {
            start_col: cell.col,
            start_row: Some(cell.row),
            end_col: cell.col,
            end_row: Some(cell.row),
        }
    }

    /// Columns `start_col..=end_col` of a single row.
    pub fn row_span(start_col: usize, end_col: usize, row: u32) -> Self {
        CellRange {
            start_col,
            start_row: Some(row),
            end_col,
            end_row: Some(row),
        }
    }

    /// Whole columns, every row.
    pub fn columns(start_col: usize, end_col: usize) -> Self {
        CellRange {
            start_col,
            start_row: None,
            end_col,
            end_row: None,
        }
    }

    pub fn width(&self) -> usize {
        self.end_col - self.start_col + 1
    }

    /// First row covered (rows are 1-based).
    pub fn first_row(&self) -> u32 {
        self.start_row.unwrap_or(1)
    }

    /// Number of rows covered, or `None` when open at the bottom.
    pub fn height(&self) -> Option<usize> {
        self.end_row
            .map(|end| (end - self.first_row()) as usize + 1)
    }

    pub fn is_single_cell(&self) -> bool {
        self.width() == 1 && self.height() == Some(1)
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let start = column_letters(self.start_col);
        let end = column_letters(self.end_col);
        let row = |r: Option<u32>| r.map(|r| r.to_string()).unwrap_or_default();
        if self.is_single_cell() {
            return write!(f, "{}{}", start, row(self.start_row));
        }
        write!(
            f,
            "{}{}:{}{}",
            start,
            row(self.start_row),
            end,
            row(self.end_row)
        )
    }
}

impl FromStr for CellRange {
    type Err = RangeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || RangeParseError(s.to_string());
        let trimmed = s.trim();
        let (first, second) = match trimmed.split_once(':') {
            Some((a, b)) => (a, Some(b)),
            None => (trimmed, None),
        };
        let (start_col, start_row) = split_part(first).ok_or_else(err)?;
        let Some(second) = second else {
            // A lone part must name a cell; a lone column is ambiguous
            let row = start_row.ok_or_else(err)?;
            return Ok(CellRange::cell(CellRef::new(start_col, row)));
        };
        let (end_col, end_row) = split_part(second).ok_or_else(err)?;
        if end_col < start_col {
            return Err(err());
        }
        match (start_row, end_row) {
            (Some(a), Some(b)) if b < a => return Err(err()),
            (None, Some(_)) => return Err(err()),
            _ => {}
        }
        Ok(CellRange {
            start_col,
            start_row,
            end_col,
            end_row,
        })
    }
}

impl Serialize for CellRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_letters() {
        assert_eq!(column_letters(0), "A");
        assert_eq!(column_letters(3), "D");
        assert_eq!(column_letters(25), "Z");
        assert_eq!(column_letters(26), "AA");
        assert_eq!(column_letters(27), "AB");
        assert_eq!(column_letters(701), "ZZ");
        assert_eq!(column_letters(702), "AAA");
    }

    #[test]
    fn test_column_index() {
        assert_eq!(column_index("A"), Some(0));
        assert_eq!(column_index("k"), Some(10));
        assert_eq!(column_index("AA"), Some(26));
        assert_eq!(column_index("ZZ"), Some(701));
        assert_eq!(column_index(""), None);
        assert_eq!(column_index("A1"), None);
    }

    #[test]
    fn test_parse_cell() {
        let cell: CellRef = "D4".parse().unwrap();
        assert_eq!(cell, CellRef::new(3, 4));
        assert!("D".parse::<CellRef>().is_err());
        assert!("D0".parse::<CellRef>().is_err());
        assert!("4".parse::<CellRef>().is_err());
    }

    #[test]
    fn test_parse_ranges() {
        let r: CellRange = "A2:E2".parse().unwrap();
        assert_eq!(r, CellRange::row_span(0, 4, 2));
        assert_eq!(r.width(), 5);
        assert_eq!(r.height(), Some(1));

        let r: CellRange = "A:K".parse().unwrap();
        assert_eq!(r, CellRange::columns(0, 10));
        assert_eq!(r.first_row(), 1);
        assert_eq!(r.height(), None);

        let r: CellRange = "A2:K".parse().unwrap();
        assert_eq!(r.start_row, Some(2));
        assert_eq!(r.end_row, None);

        let r: CellRange = "d7".parse().unwrap();
        assert!(r.is_single_cell());
    }

    #[test]
    fn test_parse_rejects_inverted_ranges() {
        assert!("E2:A2".parse::<CellRange>().is_err());
        assert!("A5:A2".parse::<CellRange>().is_err());
        assert!("A:K5".parse::<CellRange>().is_err());
        assert!("A".parse::<CellRange>().is_err());
        assert!("".parse::<CellRange>().is_err());
    }

    #[test]
    fn test_display_round_trips() {
        for text in ["D4", "A2:E2", "A:K", "A2:K", "AA10:AB12"] {
            let r: CellRange = text.parse().unwrap();
            assert_eq!(r.to_string(), text);
        }
    }
}
