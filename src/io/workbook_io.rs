use std::fs;
use std::path::{Path, PathBuf};

use crate::io::recovery::atomic_write;
use crate::io::store::{SheetStore, StoreError};
use crate::model::sheet::TabInfo;
use crate::model::workbook::Workbook;
use crate::parse::a1::CellRange;

/// Load a workbook from its JSON file.
pub fn load_workbook(path: &Path) -> Result<Workbook, StoreError> {
    let text = fs::read_to_string(path).map_err(|e| StoreError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    serde_json::from_str(&text).map_err(|e| StoreError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Save a workbook atomically.
pub fn save_workbook(path: &Path, book: &Workbook) -> Result<(), StoreError> {
    let mut content = serde_json::to_string_pretty(book)?;
    content.push('\n');
    atomic_write(path, content.as_bytes()).map_err(|e| StoreError::WriteError {
        path: path.to_path_buf(),
        source: e,
    })
}

/// A workbook backed by a JSON file. Every mutating operation is persisted
/// before it returns, so a run that stops early leaves the file holding
/// exactly the operations that completed.
#[derive(Debug)]
pub struct WorkbookFile {
    path: PathBuf,
    book: Workbook,
}

impl WorkbookFile {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Ok(WorkbookFile {
            path: path.to_path_buf(),
            book: load_workbook(path)?,
        })
    }

    /// Write `book` to `path` (replacing any file there) and open it.
    pub fn create(path: &Path, book: Workbook) -> Result<Self, StoreError> {
        save_workbook(path, &book)?;
        Ok(WorkbookFile {
            path: path.to_path_buf(),
            book,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn book(&self) -> &Workbook {
        &self.book
    }

    fn persist(&self) -> Result<(), StoreError> {
        save_workbook(&self.path, &self.book)
    }
}

impl SheetStore for WorkbookFile {
    fn tabs(&self) -> Result<Vec<TabInfo>, StoreError> {
        self.book.tabs()
    }

    fn read_range(&self, tab: &str, range: &CellRange) -> Result<Vec<Vec<String>>, StoreError> {
        self.book.read_range(tab, range)
    }

    fn write_range(
        &mut self,
        tab: &str,
        range: &CellRange,
        values: &[Vec<String>],
    ) -> Result<(), StoreError> {
        self.book.write_range(tab, range, values)?;
        self.persist()
    }

    fn append_row(&mut self, tab: &str, values: &[String]) -> Result<u32, StoreError> {
        let row = self.book.append_row(tab, values)?;
        self.persist()?;
        Ok(row)
    }

    fn rename_tab(&mut self, tab: &str, new_name: &str) -> Result<TabInfo, StoreError> {
        let info = self.book.rename_tab(tab, new_name)?;
        self.persist()?;
        Ok(info)
    }

    fn duplicate_tab(&mut self, tab: &str) -> Result<TabInfo, StoreError> {
        let info = self.book.duplicate_tab(tab)?;
        self.persist()?;
        Ok(info)
    }

    fn move_tab(&mut self, tab: &str, index: usize) -> Result<TabInfo, StoreError> {
        let info = self.book.move_tab(tab, index)?;
        self.persist()?;
        Ok(info)
    }
}
