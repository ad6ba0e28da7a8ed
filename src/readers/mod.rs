pub mod delimited;
pub mod table;

pub use delimited::DelimitedNormalizer;
pub use table::{read_table, write_table, MISSING_MARKER, TIME_COLUMN};
