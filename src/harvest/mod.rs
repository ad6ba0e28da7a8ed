pub mod coordinator;
pub mod ingest;
pub mod mirror;
pub mod station;

use std::time::Duration;

use crate::archive::ArchiveConsolidator;
use crate::config::{FeedConfig, HarvestConfig, SourceConfig};
use crate::error::Result;
use crate::sources::{DirectoryFetcher, HttpClient, DEFAULT_IDENT_PATTERN};
use crate::store::{PartitionStore, WatermarkTracker};

pub use coordinator::BatchRunner;
pub use ingest::IngestJob;
pub use mirror::MirrorJob;
pub use station::StationJob;

/// Wire one configured source to its job shape and run it. Returns the
/// source's aggregate error if any of its entities failed.
pub fn run_source(config: &HarvestConfig, source: &SourceConfig) -> Result<()> {
    let root = config.storage_root.as_path();

    match &source.feed {
        FeedConfig::Directory {
            path,
            pattern,
            ident_pattern,
            table,
        } => {
            let store = PartitionStore::new(root, &source.name, &source.dataset);
            let tracker = WatermarkTracker::new(store.dataset_dir());
            let fetcher = DirectoryFetcher::new(path, pattern, ident_pattern)?;
            let normalizer = table.normalizer(None)?;
            IngestJob::new(&fetcher, &normalizer, &store, &tracker).run()
        }

        FeedConfig::HttpStations {
            feeds,
            stations,
            table,
            timeout_secs,
        } => {
            let store = PartitionStore::new(root, &source.name, &source.dataset);
            let client = HttpClient::new(Duration::from_secs(*timeout_secs))?;
            StationJob::new(&client, feeds, table, &store).run(stations)
        }

        FeedConfig::Mirror {
            path,
            patterns,
            member_suffix,
        } => {
            let consolidator = ArchiveConsolidator::with_member_suffix(member_suffix);
            let dataset_dir = root.join(&source.name).join(&source.dataset);
            let mut runner = BatchRunner::new();
            for pattern in patterns {
                let fetcher = DirectoryFetcher::new(path, pattern, DEFAULT_IDENT_PATTERN)?;
                let dest_dir = dataset_dir.join(&pattern.folder);
                MirrorJob::new(&fetcher, dest_dir, &consolidator, &pattern.folder)
                    .run(&mut runner);
            }
            runner.finish()
        }
    }
}
