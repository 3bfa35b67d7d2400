pub mod a1;
pub mod ticket_key;

pub use a1::{CellRange, CellRef, RangeParseError, column_index, column_letters};
pub use ticket_key::{KeyPatternError, TicketKeyParser, hyperlink_formula};
