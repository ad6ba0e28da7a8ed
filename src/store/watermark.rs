use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{HarvestError, Result};

pub const WATERMARK_FILE: &str = "last_update.txt";

/// Persisted marker of the newest fully-processed remote item for one feed,
/// a single text line in the dataset directory.
pub struct WatermarkTracker {
    path: PathBuf,
}

impl WatermarkTracker {
    pub fn new(dataset_dir: &Path) -> Self {
        Self {
            path: dataset_dir.join(WATERMARK_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The committed watermark, or `None` if none was ever written. An
    /// unreadable file also reads as `None`: the run then processes every
    /// available item, which the merge dedup makes safe.
    pub fn read(&self) -> Option<String> {
        match fs::read_to_string(&self.path) {
            Ok(content) => {
                let ident = content.lines().next().unwrap_or("").trim();
                if ident.is_empty() {
                    tracing::warn!(path = %self.path.display(), "empty watermark file, processing all files");
                    None
                } else {
                    Some(ident.to_string())
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
            Err(err) => {
                tracing::warn!(path = %self.path.display(), %err, "failed to read watermark, processing all files");
                None
            }
        }
    }

    /// Commit a watermark. Invoked at most once per run, only with an
    /// identifier every earlier item of which has been fully processed.
    pub fn write(&self, ident: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|err| HarvestError::storage(parent, err))?;
        }
        fs::write(&self.path, format!("{ident}\n"))
            .map_err(|err| HarvestError::storage(&self.path, err))
    }
}

/// Outcome of one attempted remote item, in feed order.
#[derive(Debug, Clone)]
pub struct ItemOutcome {
    pub ident: String,
    pub ok: bool,
}

impl ItemOutcome {
    pub fn new(ident: impl Into<String>, ok: bool) -> Self {
        Self {
            ident: ident.into(),
            ok,
        }
    }
}

/// Highest identifier safe to commit: the end of the contiguous run of
/// successes at the head of the attempt list.
///
/// Advancing past a failed item would skip it forever on retry, so a failure
/// pins the watermark even when later items succeeded; those later items are
/// re-fetched next run and deduplicated by the merge.
pub fn contiguous_watermark(outcomes: &[ItemOutcome]) -> Option<&str> {
    let mut committed = None;
    for outcome in outcomes {
        if !outcome.ok {
            break;
        }
        committed = Some(outcome.ident.as_str());
    }
    committed
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_returns_none_before_first_commit() {
        let dir = TempDir::new().unwrap();
        let tracker = WatermarkTracker::new(dir.path());
        assert_eq!(tracker.read(), None);
    }

    #[test]
    fn test_write_then_read_round_trips() {
        let dir = TempDir::new().unwrap();
        let tracker = WatermarkTracker::new(dir.path());

        tracker.write("20240102").unwrap();
        assert_eq!(tracker.read(), Some("20240102".to_string()));
    }

    #[test]
    fn test_empty_watermark_file_reads_as_absent() {
        let dir = TempDir::new().unwrap();
        let tracker = WatermarkTracker::new(dir.path());
        fs::write(tracker.path(), "\n").unwrap();
        assert_eq!(tracker.read(), None);
    }

    #[test]
    fn test_all_successes_commit_the_maximum() {
        let outcomes = vec![
            ItemOutcome::new("20240101", true),
            ItemOutcome::new("20240102", true),
            ItemOutcome::new("20240103", true),
        ];
        assert_eq!(contiguous_watermark(&outcomes), Some("20240103"));
    }

    #[test]
    fn test_middle_failure_pins_watermark_before_the_gap() {
        let outcomes = vec![
            ItemOutcome::new("20240101", true),
            ItemOutcome::new("20240102", false),
            ItemOutcome::new("20240103", true),
        ];
        assert_eq!(contiguous_watermark(&outcomes), Some("20240101"));
    }

    #[test]
    fn test_first_failure_commits_nothing() {
        let outcomes = vec![
            ItemOutcome::new("20240101", false),
            ItemOutcome::new("20240102", true),
        ];
        assert_eq!(contiguous_watermark(&outcomes), None);
    }
}
