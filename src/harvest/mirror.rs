use std::fs;
use std::io::Write;
use std::path::PathBuf;

use tempfile::NamedTempFile;

use crate::archive::ArchiveConsolidator;
use crate::error::{HarvestError, Result};
use crate::harvest::BatchRunner;
use crate::models::RemoteItem;
use crate::sources::Fetcher;

/// Mirrors one remote file group into a local folder: already-present files
/// are skipped, downloads are staged through a temp file, and `.zip` items
/// are consolidated into their canonical single-file form.
///
/// Re-running converges: a file that failed mid-download leaves nothing
/// behind, an archive that failed consolidation is picked up again, and a
/// consolidated file is never fetched twice.
pub struct MirrorJob<'a, F: Fetcher> {
    fetcher: &'a F,
    dest_dir: PathBuf,
    consolidator: &'a ArchiveConsolidator,
    label: String,
}

impl<'a, F: Fetcher> MirrorJob<'a, F> {
    pub fn new(
        fetcher: &'a F,
        dest_dir: PathBuf,
        consolidator: &'a ArchiveConsolidator,
        label: &str,
    ) -> Self {
        Self {
            fetcher,
            dest_dir,
            consolidator,
            label: label.to_string(),
        }
    }

    /// Mirror every listed item, recording per-file failures into the
    /// caller's runner. A listing failure fails the whole group.
    pub fn run(&self, runner: &mut BatchRunner) {
        if let Err(error) = fs::create_dir_all(&self.dest_dir) {
            runner.record_failure(
                self.label.as_str(),
                &HarvestError::storage(&self.dest_dir, error),
            );
            return;
        }

        let mut items = match self.fetcher.list_available() {
            Ok(items) => items,
            Err(error) => {
                runner.record_failure(self.label.as_str(), &error);
                return;
            }
        };
        items.sort_by(|a, b| a.name.cmp(&b.name));
        tracing::info!(group = %self.label, count = items.len(), "mirroring files");

        runner.run(&items, |item| item.name.clone(), |item| self.process_item(item));
    }

    fn process_item(&self, item: &RemoteItem) -> Result<()> {
        let local = self.dest_dir.join(&item.name);
        let is_archive = local.extension().map_or(false, |ext| ext == "zip");
        let canonical = if is_archive {
            local.with_extension("csv")
        } else {
            local.clone()
        };

        if canonical.exists() {
            tracing::debug!(file = %item.name, "already downloaded, skipping");
            return Ok(());
        }

        if is_archive && local.exists() {
            // Downloaded earlier but consolidation never finished.
            tracing::info!(file = %item.name, "already downloaded, consolidating");
            self.consolidator.consolidate(&local)?;
            return Ok(());
        }

        tracing::info!(file = %item.name, "downloading");
        let raw = self.fetcher.fetch(item)?;

        // Stage in the destination directory; a failure before persist
        // leaves no partial file behind.
        let mut staged = NamedTempFile::new_in(&self.dest_dir)?;
        staged.write_all(&raw)?;
        staged
            .persist(&local)
            .map_err(|err| HarvestError::Io(err.error))?;

        if is_archive {
            self.consolidator.consolidate(&local)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::io::Cursor;
    use tempfile::TempDir;
    use zip::write::FileOptions;
    use zip::ZipWriter;

    struct StubFetcher {
        items: Vec<(RemoteItem, Vec<u8>)>,
        fetched: RefCell<Vec<String>>,
    }

    impl StubFetcher {
        fn new() -> Self {
            Self {
                items: Vec::new(),
                fetched: RefCell::new(Vec::new()),
            }
        }

        fn item(mut self, name: &str, payload: Vec<u8>) -> Self {
            self.items.push((RemoteItem::new(name, name), payload));
            self
        }
    }

    impl Fetcher for StubFetcher {
        fn list_available(&self) -> Result<Vec<RemoteItem>> {
            Ok(self.items.iter().map(|(item, _)| item.clone()).collect())
        }

        fn fetch(&self, item: &RemoteItem) -> Result<Vec<u8>> {
            self.fetched.borrow_mut().push(item.name.clone());
            Ok(self
                .items
                .iter()
                .find(|(known, _)| known.name == item.name)
                .map(|(_, payload)| payload.clone())
                .unwrap())
        }
    }

    fn zip_payload(members: &[(&str, &str)]) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut writer = ZipWriter::new(&mut buffer);
            for (name, content) in members {
                writer.start_file(*name, FileOptions::default()).unwrap();
                writer.write_all(content.as_bytes()).unwrap();
            }
            writer.finish().unwrap();
        }
        buffer.into_inner()
    }

    #[test]
    fn test_mirrors_plain_file_and_consolidates_archive() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("VNXZ32");
        let fetcher = StubFetcher::new()
            .item("VNXQ94.202403010000.csv", b"time,ta\n2024-03-01T00:00:00Z,1.0\n".to_vec())
            .item(
                "VNXZ32.202403010000.zip",
                zip_payload(&[("member.csv", "time,ta\n2024-03-01T00:00:00Z,2.0\n")]),
            );
        let consolidator = ArchiveConsolidator::new();
        let job = MirrorJob::new(&fetcher, dest.clone(), &consolidator, "VNXZ32.*");

        let mut runner = BatchRunner::new();
        job.run(&mut runner);
        runner.finish().unwrap();

        assert!(dest.join("VNXQ94.202403010000.csv").exists());
        assert!(dest.join("VNXZ32.202403010000.csv").exists());
        assert!(!dest.join("VNXZ32.202403010000.zip").exists());
    }

    #[test]
    fn test_present_files_are_not_fetched_again() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("VNXQ94");
        fs::create_dir_all(&dest).unwrap();
        fs::write(dest.join("VNXQ94.202403010000.csv"), "done").unwrap();

        let fetcher =
            StubFetcher::new().item("VNXQ94.202403010000.csv", b"fresh".to_vec());
        let consolidator = ArchiveConsolidator::new();
        let job = MirrorJob::new(&fetcher, dest.clone(), &consolidator, "VNXQ94.*");

        let mut runner = BatchRunner::new();
        job.run(&mut runner);
        runner.finish().unwrap();

        assert!(fetcher.fetched.borrow().is_empty());
        assert_eq!(fs::read_to_string(dest.join("VNXQ94.202403010000.csv")).unwrap(), "done");
    }

    #[test]
    fn test_leftover_archive_is_consolidated_without_refetch() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("VNXZ32");
        fs::create_dir_all(&dest).unwrap();
        fs::write(
            dest.join("VNXZ32.202403010000.zip"),
            zip_payload(&[("member.csv", "time,ta\n2024-03-01T00:00:00Z,2.0\n")]),
        )
        .unwrap();

        let fetcher = StubFetcher::new().item("VNXZ32.202403010000.zip", Vec::new());
        let consolidator = ArchiveConsolidator::new();
        let job = MirrorJob::new(&fetcher, dest.clone(), &consolidator, "VNXZ32.*");

        let mut runner = BatchRunner::new();
        job.run(&mut runner);
        runner.finish().unwrap();

        assert!(fetcher.fetched.borrow().is_empty());
        assert!(dest.join("VNXZ32.202403010000.csv").exists());
        assert!(!dest.join("VNXZ32.202403010000.zip").exists());
    }

    #[test]
    fn test_corrupt_archive_payload_is_recorded_not_fatal() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("VNXZ32");
        let fetcher = StubFetcher::new()
            .item("VNXZ32.202403010000.zip", b"not a zip".to_vec())
            .item("VNXZ32.202403020000.zip", zip_payload(&[(
                "member.csv",
                "time,ta\n2024-03-02T00:00:00Z,2.0\n",
            )]));
        let consolidator = ArchiveConsolidator::new();
        let job = MirrorJob::new(&fetcher, dest.clone(), &consolidator, "VNXZ32.*");

        let mut runner = BatchRunner::new();
        job.run(&mut runner);

        match runner.finish() {
            Err(HarvestError::Aggregate(failed)) => {
                assert_eq!(failed, vec!["VNXZ32.202403010000.zip".to_string()]);
            }
            other => panic!("expected aggregate error, got {other:?}"),
        }
        // The later archive was still mirrored and consolidated.
        assert!(dest.join("VNXZ32.202403020000.csv").exists());
    }
}
