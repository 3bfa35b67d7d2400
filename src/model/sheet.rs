use serde::Serialize;

/// Header label matched (trimmed, lowercased) in the issue column.
pub const HEADER_LABEL: &str = "issue";

/// Name of the tab duplicated to seed a fresh active tab.
pub const TEMPLATE_TAB: &str = "Template";

// Fixed column layout of an issue tab (zero-based).
pub const ISSUE_COLUMN: usize = 0;
pub const STATUS_COLUMN: usize = 1;
pub const AUTHOR_COLUMN: usize = 2;
pub const ENVIRONMENT_COLUMN: usize = 3;
pub const APP_COLUMN: usize = 4;
/// Column K; F through K hold collaborator-owned notes.
pub const LAST_COLUMN: usize = 10;

/// Header row written into new tabs by `relsync init`.
pub const HEADER_ROW: [&str; 6] = ["Issue", "Status", "Author", "Environment", "App", "Notes"];

/// Tab metadata as reported by a store
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TabInfo {
    /// Stable across renames and moves
    pub id: u32,
    pub name: String,
    /// Display position, 0 = first
    pub index: usize,
}
