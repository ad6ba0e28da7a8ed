//! Collaborator seams supplied per source: listing/fetching remote items and
//! normalizing raw payloads into time-keyed records. The engine only ever
//! sees these traits; wire formats and protocols live behind them.

pub mod directory;
pub mod http;

use std::collections::BTreeMap;

use crate::error::Result;
use crate::models::{Record, RemoteItem};

pub use directory::{DirectoryFetcher, DEFAULT_IDENT_PATTERN};
pub use http::{station_url, HttpClient, UrlFeed, UrlFetcher};

/// A remote feed offering named, identifier-ordered items.
pub trait Fetcher {
    /// Enumerate the items currently offered. Transport failures are
    /// entity-level failures, not fatal to the run.
    fn list_available(&self) -> Result<Vec<RemoteItem>>;

    /// Retrieve one item's raw payload.
    fn fetch(&self, item: &RemoteItem) -> Result<Vec<u8>>;
}

/// Converts one raw payload into per-station record series. Single-station
/// payloads produce one entry; payloads carrying several stations (one file
/// per day, all stations) produce one entry per station.
pub trait Normalizer {
    fn normalize(&self, raw: &[u8]) -> Result<BTreeMap<String, Vec<Record>>>;
}
