use serde::{Deserialize, Serialize};

use crate::model::sheet::TabInfo;

/// A workbook: tabs in display order, each a grid of string cells.
///
/// Formulas are stored verbatim as strings beginning with `=`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workbook {
    #[serde(default)]
    pub next_tab_id: u32,
    #[serde(default)]
    pub tabs: Vec<Tab>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tab {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub rows: Vec<Vec<String>>,
}

impl Tab {
    /// 1-based number of the last row holding any non-empty cell (0 if none).
    pub fn last_used_row(&self) -> u32 {
        self.rows
            .iter()
            .rposition(|row| row.iter().any(|c| !c.is_empty()))
            .map_or(0, |i| i as u32 + 1)
    }

    pub fn cell(&self, col: usize, row: u32) -> Option<&str> {
        let r = row.checked_sub(1)? as usize;
        self.rows.get(r)?.get(col).map(|s| s.as_str())
    }

    pub fn set_cell(&mut self, col: usize, row: u32, value: String) {
        let r = row.saturating_sub(1) as usize;
        if self.rows.len() <= r {
            self.rows.resize_with(r + 1, Vec::new);
        }
        let cells = &mut self.rows[r];
        if cells.len() <= col {
            cells.resize(col + 1, String::new());
        }
        cells[col] = value;
    }
}

impl Workbook {
    pub fn new() -> Self {
        Workbook::default()
    }

    /// Workbook with empty tabs of the given names, in order.
    pub fn with_tabs(names: &[&str]) -> Self {
        let mut book = Workbook::new();
        for name in names {
            book.push_tab(name, Vec::new());
        }
        book
    }

    /// Append a tab without checking for a name clash.
    pub fn push_tab(&mut self, name: &str, rows: Vec<Vec<String>>) -> TabInfo {
        let id = self.allocate_id();
        self.tabs.push(Tab {
            id,
            name: name.to_string(),
            rows,
        });
        self.info(self.tabs.len() - 1)
    }

    /// Next unused tab id. Tolerates hand-edited files whose counter lags.
    pub fn allocate_id(&mut self) -> u32 {
        let max_seen = self.tabs.iter().map(|t| t.id + 1).max().unwrap_or(0);
        let id = self.next_tab_id.max(max_seen);
        self.next_tab_id = id + 1;
        id
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.tabs.iter().position(|t| t.name == name)
    }

    pub fn tab(&self, name: &str) -> Option<&Tab> {
        self.tabs.iter().find(|t| t.name == name)
    }

    pub fn tab_mut(&mut self, name: &str) -> Option<&mut Tab> {
        self.tabs.iter_mut().find(|t| t.name == name)
    }

    pub fn names(&self) -> Vec<String> {
        self.tabs.iter().map(|t| t.name.clone()).collect()
    }

    pub fn info(&self, index: usize) -> TabInfo {
        let tab = &self.tabs[index];
        TabInfo {
            id: tab.id,
            name: tab.name.clone(),
            index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_cell_grows_grid() {
        let mut tab = Tab {
            id: 0,
            name: "Next".to_string(),
            rows: Vec::new(),
        };
        tab.set_cell(3, 4, "Stage".to_string());
        assert_eq!(tab.rows.len(), 4);
        assert_eq!(tab.rows[3].len(), 4);
        assert_eq!(tab.cell(3, 4), Some("Stage"));
        assert_eq!(tab.cell(0, 4), Some(""));
        assert_eq!(tab.cell(0, 9), None);
        assert_eq!(tab.last_used_row(), 4);
    }

    #[test]
    fn test_last_used_row_ignores_blank_tail() {
        let tab = Tab {
            id: 0,
            name: "Next".to_string(),
            rows: vec![
                vec!["Issue".to_string()],
                vec!["ADV-1".to_string()],
                vec![String::new(), String::new()],
                vec![],
            ],
        };
        assert_eq!(tab.last_used_row(), 2);
    }

    #[test]
    fn test_allocate_id_skips_existing_ids() {
        let mut book: Workbook = serde_json::from_str(
            r#"{"tabs":[{"id":4,"name":"Next"},{"id":1,"name":"Template"}]}"#,
        )
        .unwrap();
        assert_eq!(book.allocate_id(), 5);
        assert_eq!(book.allocate_id(), 6);
    }

    #[test]
    fn test_with_tabs_assigns_sequential_ids() {
        let book = Workbook::with_tabs(&["Next", "Template"]);
        assert_eq!(book.names(), vec!["Next", "Template"]);
        assert_eq!(book.info(1).id, 1);
        assert_eq!(book.next_tab_id, 2);
    }
}
