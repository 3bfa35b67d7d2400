pub mod config_io;
pub mod lock;
pub mod recovery;
pub mod store;
pub mod workbook_io;

pub use store::{SheetStore, StoreError};
pub use workbook_io::WorkbookFile;
