use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;

use crate::error::{HarvestError, Result};
use crate::models::{FilePattern, RemoteItem};
use crate::sources::Fetcher;
use crate::utils::patterns::{extract_ident, ident_regex, wildcard_regex};

/// Items taken from the first run of eight digits in the file name, the
/// date chunk the feeds embed (`VQCA44.2024030100.csv` → `20240301`).
pub const DEFAULT_IDENT_PATTERN: &str = r"(\d{8})";

/// Feed over a local or mounted directory: file names filtered by a wildcard
/// pattern, payloads read straight from disk.
pub struct DirectoryFetcher {
    dir: PathBuf,
    name_filter: Regex,
    ident: Regex,
}

impl DirectoryFetcher {
    pub fn new(feed_root: &Path, pattern: &FilePattern, ident_pattern: &str) -> Result<Self> {
        let dir = if pattern.parent.is_empty() {
            feed_root.to_path_buf()
        } else {
            feed_root.join(&pattern.parent)
        };
        Ok(Self {
            dir,
            name_filter: wildcard_regex(&pattern.pattern)?,
            ident: ident_regex(ident_pattern)?,
        })
    }
}

impl Fetcher for DirectoryFetcher {
    fn list_available(&self) -> Result<Vec<RemoteItem>> {
        let entries = fs::read_dir(&self.dir).map_err(|err| {
            HarvestError::Transport(format!("cannot list {}: {err}", self.dir.display()))
        })?;

        let mut items = Vec::new();
        for entry in entries {
            let entry =
                entry.map_err(|err| HarvestError::Transport(format!("listing failed: {err}")))?;
            if !entry.path().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if self.name_filter.is_match(&name) {
                let ident = extract_ident(&self.ident, &name);
                items.push(RemoteItem::new(name, ident));
            }
        }
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }

    fn fetch(&self, item: &RemoteItem) -> Result<Vec<u8>> {
        let path = self.dir.join(&item.name);
        fs::read(&path).map_err(|err| {
            HarvestError::Transport(format!("cannot fetch {}: {err}", path.display()))
        })
    }
}
