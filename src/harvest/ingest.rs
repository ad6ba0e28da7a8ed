use crate::error::Result;
use crate::harvest::BatchRunner;
use crate::models::{split_by_year, RemoteItem};
use crate::sources::{Fetcher, Normalizer};
use crate::store::{contiguous_watermark, ItemOutcome, PartitionStore, WatermarkTracker};

/// Watermark-gated incremental feed: each run lists the remote items, skips
/// everything at or below the committed watermark, merges the rest into the
/// partition store and advances the watermark past the contiguous run of
/// successes.
///
/// A failed item is retried on the next run because the watermark never
/// moves past it; re-fetched successors deduplicate in the merge.
pub struct IngestJob<'a, F: Fetcher, N: Normalizer> {
    fetcher: &'a F,
    normalizer: &'a N,
    store: &'a PartitionStore,
    tracker: &'a WatermarkTracker,
}

impl<'a, F: Fetcher, N: Normalizer> IngestJob<'a, F, N> {
    pub fn new(
        fetcher: &'a F,
        normalizer: &'a N,
        store: &'a PartitionStore,
        tracker: &'a WatermarkTracker,
    ) -> Self {
        Self {
            fetcher,
            normalizer,
            store,
            tracker,
        }
    }

    pub fn run(&self) -> Result<()> {
        let mut items = self.fetcher.list_available()?;
        items.sort_by(|a, b| a.ident.cmp(&b.ident));

        let watermark = self.tracker.read();
        let pending: Vec<RemoteItem> = match &watermark {
            Some(mark) => items
                .into_iter()
                .filter(|item| item.ident.as_str() > mark.as_str())
                .collect(),
            None => items,
        };

        if pending.is_empty() {
            tracing::info!("no new files to process");
            return Ok(());
        }
        tracing::info!(count = pending.len(), "processing new files");

        let mut runner = BatchRunner::new();
        let mut outcomes = Vec::with_capacity(pending.len());
        for item in &pending {
            match self.process_item(item) {
                Ok(rows) => {
                    tracing::info!(file = %item.name, rows, "merged");
                    outcomes.push(ItemOutcome::new(item.ident.as_str(), true));
                }
                Err(error) => {
                    runner.record_failure(item.name.as_str(), &error);
                    outcomes.push(ItemOutcome::new(item.ident.as_str(), false));
                }
            }
        }

        if let Some(mark) = contiguous_watermark(&outcomes) {
            self.tracker.write(mark)?;
        }

        runner.finish()
    }

    /// Fetch, normalize, split per station and year, merge. Returns the
    /// total partition row count touched.
    fn process_item(&self, item: &RemoteItem) -> Result<usize> {
        let raw = self.fetcher.fetch(item)?;
        let by_station = self.normalizer.normalize(&raw)?;

        let mut rows = 0;
        for (station, records) in by_station {
            for (year, group) in split_by_year(records) {
                rows += self.store.merge(&station, year, &group)?;
            }
        }
        Ok(rows)
    }
}
