pub mod config;
pub mod issue;
pub mod sheet;
pub mod workbook;

pub use config::*;
pub use issue::*;
pub use sheet::*;
pub use workbook::*;
