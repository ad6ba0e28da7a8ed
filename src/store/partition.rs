use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{HarvestError, Result};
use crate::models::Record;
use crate::readers::table;
use crate::store::merge::merge_last_wins;

/// Durable per-station, per-year storage under
/// `<root>/<source>/<dataset>/<station-id>/<year>.csv`.
///
/// Partitions are created lazily on first write and only ever replaced by a
/// full rewrite of the merged row set.
pub struct PartitionStore {
    dataset_dir: PathBuf,
}

impl PartitionStore {
    pub fn new(root: &Path, source: &str, dataset: &str) -> Self {
        Self {
            dataset_dir: root.join(source).join(dataset),
        }
    }

    pub fn dataset_dir(&self) -> &Path {
        &self.dataset_dir
    }

    pub fn partition_path(&self, station: &str, year: i32) -> PathBuf {
        self.dataset_dir.join(station).join(format!("{year}.csv"))
    }

    /// Merge records into one partition. Callers split multi-year payloads
    /// with `split_by_year` first; every record here must belong to `year`.
    ///
    /// Existing rows are read back in full, incoming rows win on timestamp
    /// collision, and the partition is rewritten sorted ascending. A
    /// partition that exists but cannot be read fails the merge before
    /// anything is written.
    pub fn merge(&self, station: &str, year: i32, incoming: &[Record]) -> Result<usize> {
        let path = self.partition_path(station, year);

        let existing = if path.exists() {
            table::read_table(&path).map_err(|err| HarvestError::storage(&path, err))?
        } else {
            Vec::new()
        };

        let merged = merge_last_wins(existing, incoming);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| HarvestError::storage(parent, err))?;
        }
        table::write_table(&path, &merged).map_err(|err| HarvestError::storage(&path, err))?;

        Ok(merged.len())
    }

    /// Station directories present in the store, sorted. An absent dataset
    /// directory reads as an empty store.
    pub fn stations(&self) -> Result<Vec<String>> {
        let mut stations = Vec::new();
        let entries = match fs::read_dir(&self.dataset_dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(stations),
            Err(err) => return Err(HarvestError::storage(&self.dataset_dir, err)),
        };
        for entry in entries {
            let entry = entry?;
            if entry.path().is_dir() {
                stations.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        stations.sort();
        Ok(stations)
    }

    /// Years with a partition file for one station, sorted.
    pub fn partition_years(&self, station: &str) -> Result<Vec<i32>> {
        let station_dir = self.dataset_dir.join(station);
        let mut years = Vec::new();
        let entries = match fs::read_dir(&station_dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(years),
            Err(err) => return Err(HarvestError::storage(&station_dir, err)),
        };
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            if path.extension().map_or(false, |ext| ext == "csv") {
                if let Some(year) = path
                    .file_stem()
                    .and_then(|stem| stem.to_str())
                    .and_then(|stem| stem.parse::<i32>().ok())
                {
                    years.push(year);
                }
            }
        }
        years.sort_unstable();
        Ok(years)
    }
}
