pub mod indexer;
pub mod rotate;
pub mod source;
pub mod sync;
pub mod unique_name;
pub mod upsert;
