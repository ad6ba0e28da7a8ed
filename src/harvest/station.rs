use crate::config::{ParameterFeed, TableFormat};
use crate::error::Result;
use crate::harvest::BatchRunner;
use crate::models::{split_by_year, StationConfig};
use crate::sources::{station_url, Normalizer, UrlFetcher};
use crate::store::{join_by_time, PartitionStore};

/// Per-station harvest over HTTP parameter feeds: each station's subscribed
/// feeds are fetched, outer-joined on time and merged into the store.
///
/// There is no watermark here — the feeds republish a rolling recent window
/// and the merge dedup makes refetching idempotent. Failure isolation is
/// per station.
pub struct StationJob<'a, C: UrlFetcher> {
    client: &'a C,
    feeds: &'a [ParameterFeed],
    table: &'a TableFormat,
    store: &'a PartitionStore,
}

impl<'a, C: UrlFetcher> StationJob<'a, C> {
    pub fn new(
        client: &'a C,
        feeds: &'a [ParameterFeed],
        table: &'a TableFormat,
        store: &'a PartitionStore,
    ) -> Self {
        Self {
            client,
            feeds,
            table,
            store,
        }
    }

    pub fn run(&self, stations: &[StationConfig]) -> Result<()> {
        let mut runner = BatchRunner::new();
        runner.run(
            stations,
            |station| station.id.clone(),
            |station| self.process_station(station),
        );
        runner.finish()
    }

    fn process_station(&self, station: &StationConfig) -> Result<()> {
        tracing::info!(station = %station.id, "downloading station data");

        let mut series = Vec::new();
        for feed in self
            .feeds
            .iter()
            .filter(|feed| station.subscribes_to(&feed.name))
        {
            let url = station_url(&feed.url_template, &station.id)?;
            let raw = self.client.get(&url)?;
            let normalizer = self
                .table
                .normalizer(Some(&station.id))?
                .with_fields(&feed.fields);
            let mut by_station = normalizer.normalize(&raw)?;
            series.push(by_station.remove(&station.id).unwrap_or_default());
        }

        let joined = join_by_time(series);
        if joined.is_empty() {
            tracing::warn!(station = %station.id, "feeds returned no rows");
            return Ok(());
        }

        for (year, group) in split_by_year(joined) {
            self.store.merge(&station.id, year, &group)?;
        }
        Ok(())
    }
}
