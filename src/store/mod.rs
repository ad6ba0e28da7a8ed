pub mod merge;
pub mod partition;
pub mod watermark;

pub use merge::{join_by_time, merge_last_wins};
pub use partition::PartitionStore;
pub use watermark::{contiguous_watermark, ItemOutcome, WatermarkTracker};
