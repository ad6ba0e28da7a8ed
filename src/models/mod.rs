pub mod item;
pub mod record;
pub mod station;

pub use item::{FilePattern, RemoteItem};
pub use record::{split_by_year, Record};
pub use station::StationConfig;
