//! Run configuration: one JSON document naming the storage root and every
//! feed to harvest. Parsed and validated before any entity loop starts; a
//! bad configuration is fatal immediately, unlike entity failures. The
//! parsed value is passed down explicitly, there is no global state.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{HarvestError, Result};
use crate::models::{FilePattern, StationConfig};
use crate::readers::DelimitedNormalizer;
use crate::sources::DEFAULT_IDENT_PATTERN;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct HarvestConfig {
    /// Root of the partitioned store.
    pub storage_root: PathBuf,

    #[validate(length(min = 1), nested)]
    pub sources: Vec<SourceConfig>,
}

impl HarvestConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|err| {
            HarvestError::Config(format!("cannot read {}: {err}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|err| {
            HarvestError::Config(format!("cannot parse {}: {err}", path.display()))
        })?;
        config.validate()?;
        for source in &config.sources {
            source.validate_feed()?;
        }
        Ok(config)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SourceConfig {
    /// Provider name, first path segment under the storage root.
    #[validate(length(min = 1))]
    pub name: String,

    /// Dataset name, second path segment.
    #[validate(length(min = 1))]
    pub dataset: String,

    pub feed: FeedConfig,
}

impl SourceConfig {
    pub fn label(&self) -> String {
        format!("{}/{}", self.name, self.dataset)
    }

    /// Feed-enum fields the derive cannot reach.
    fn validate_feed(&self) -> Result<()> {
        match &self.feed {
            FeedConfig::Directory { pattern, table, .. } => {
                pattern.validate()?;
                table.validate_for_ingest(&self.label())?;
            }
            FeedConfig::HttpStations {
                feeds, stations, ..
            } => {
                if feeds.is_empty() {
                    return Err(HarvestError::Config(format!(
                        "{}: no parameter feeds configured",
                        self.label()
                    )));
                }
                for feed in feeds {
                    crate::sources::station_url(&feed.url_template, "0")?;
                }
                if stations.is_empty() {
                    return Err(HarvestError::Config(format!(
                        "{}: no stations configured",
                        self.label()
                    )));
                }
                for station in stations {
                    station.validate()?;
                }
            }
            FeedConfig::Mirror { patterns, .. } => {
                if patterns.is_empty() {
                    return Err(HarvestError::Config(format!(
                        "{}: no file patterns configured",
                        self.label()
                    )));
                }
                for pattern in patterns {
                    pattern.validate()?;
                }
            }
        }
        Ok(())
    }
}

/// Which job shape a source runs, and its feed-specific settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeedConfig {
    /// Watermark-gated incremental ingest from a mounted feed directory.
    Directory {
        path: PathBuf,
        pattern: FilePattern,
        #[serde(default = "default_ident_pattern")]
        ident_pattern: String,
        table: TableFormat,
    },

    /// Per-station parameter feeds fetched over HTTP and joined on time.
    HttpStations {
        feeds: Vec<ParameterFeed>,
        stations: Vec<StationConfig>,
        table: TableFormat,
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },

    /// Archive mirror: copy remote file groups and consolidate `.zip`s.
    Mirror {
        path: PathBuf,
        patterns: Vec<FilePattern>,
        #[serde(default = "default_member_suffix")]
        member_suffix: String,
    },
}

fn default_ident_pattern() -> String {
    DEFAULT_IDENT_PATTERN.to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_member_suffix() -> String {
    "csv".to_string()
}

/// One HTTP parameter feed of a station job, e.g. the wind or precipitation
/// endpoint of a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterFeed {
    pub name: String,

    /// URL with a `{station}` placeholder.
    pub url_template: String,

    /// Parameter columns to keep from this feed's payload.
    #[serde(default)]
    pub fields: Vec<String>,
}

/// Shape of a feed's delimited payloads; builds the normalizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableFormat {
    #[serde(default = "default_delimiter")]
    pub delimiter: String,

    pub time_column: String,

    /// strftime-style format of the time column, e.g. `%Y%m%d%H`.
    pub time_format: String,

    /// Column naming the station a row belongs to, for payloads carrying
    /// several stations.
    #[serde(default)]
    pub station_column: Option<String>,

    #[serde(default = "default_missing_markers")]
    pub missing_markers: Vec<String>,

    /// Payload is a zip container with a single delimited member.
    #[serde(default)]
    pub zipped: bool,
}

fn default_delimiter() -> String {
    ";".to_string()
}

fn default_missing_markers() -> Vec<String> {
    vec!["-".to_string(), "-999".to_string()]
}

impl TableFormat {
    pub fn delimiter_byte(&self) -> Result<u8> {
        let bytes = self.delimiter.as_bytes();
        if bytes.len() != 1 {
            return Err(HarvestError::Config(format!(
                "delimiter must be a single byte, got '{}'",
                self.delimiter
            )));
        }
        Ok(bytes[0])
    }

    /// Normalizer for a multi-station or single-station payload; exactly one
    /// of the station column and the default station id applies.
    pub fn normalizer(&self, default_station: Option<&str>) -> Result<DelimitedNormalizer> {
        let mut normalizer = DelimitedNormalizer::new(&self.time_column, &self.time_format)
            .with_delimiter(self.delimiter_byte()?)
            .with_missing_markers(&self.missing_markers)
            .with_zipped(self.zipped);
        if let Some(column) = &self.station_column {
            normalizer = normalizer.with_station_column(column);
        }
        if let Some(station) = default_station {
            normalizer = normalizer.with_default_station(station);
        }
        Ok(normalizer)
    }

    fn validate_for_ingest(&self, label: &str) -> Result<()> {
        self.delimiter_byte()?;
        if self.station_column.is_none() {
            return Err(HarvestError::Config(format!(
                "{label}: directory feeds need a station_column to split rows by station"
            )));
        }
        Ok(())
    }
}
