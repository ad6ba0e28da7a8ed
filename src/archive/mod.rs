pub mod consolidator;

pub use consolidator::ArchiveConsolidator;
