use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use zip::ZipArchive;

use crate::error::{HarvestError, Result};
use crate::readers::table;

/// Turns a multi-member zip archive into a single canonical time-ordered
/// file, all-or-nothing.
///
/// On success the archive is replaced by `<stem>.<member_suffix>` and the
/// working directory is gone. On failure the working directory and any
/// partial canonical file are removed and the archive is left untouched, so
/// the operation is safely retryable; a caller never observes both files
/// missing or a truncated canonical file.
pub struct ArchiveConsolidator {
    member_suffix: String,
}

impl Default for ArchiveConsolidator {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveConsolidator {
    pub fn new() -> Self {
        Self {
            member_suffix: "csv".to_string(),
        }
    }

    pub fn with_member_suffix(suffix: &str) -> Self {
        Self {
            member_suffix: suffix.trim_start_matches('.').to_string(),
        }
    }

    pub fn consolidate(&self, archive_path: &Path) -> Result<PathBuf> {
        if archive_path.extension().map_or(true, |ext| ext != "zip") {
            return Err(HarvestError::UnsupportedArchive(archive_path.to_path_buf()));
        }

        // Deterministic working directory next to the archive; a stale one
        // from an aborted run is wiped before use.
        let work_dir = archive_path.with_extension("");
        let canonical_path = archive_path.with_extension(&self.member_suffix);
        if work_dir.exists() {
            fs::remove_dir_all(&work_dir)?;
        }
        fs::create_dir_all(&work_dir)?;

        match self.extract_and_concatenate(archive_path, &work_dir, &canonical_path) {
            Ok(()) => {
                fs::remove_dir_all(&work_dir)?;
                fs::remove_file(archive_path)?;
                tracing::debug!(
                    archive = %archive_path.display(),
                    canonical = %canonical_path.display(),
                    "consolidated archive"
                );
                Ok(canonical_path)
            }
            Err(err) => {
                let _ = fs::remove_dir_all(&work_dir);
                if canonical_path.exists() {
                    let _ = fs::remove_file(&canonical_path);
                }
                Err(err)
            }
        }
    }

    fn extract_and_concatenate(
        &self,
        archive_path: &Path,
        work_dir: &Path,
        canonical_path: &Path,
    ) -> Result<()> {
        let members = self.extract_members(archive_path, work_dir)?;
        if members.is_empty() {
            return Err(HarvestError::EmptyArchive {
                archive: archive_path.to_path_buf(),
                suffix: self.member_suffix.clone(),
            });
        }

        let mut rows = Vec::new();
        for member in &members {
            rows.extend(table::read_table(member)?);
        }
        // Stable sort keeps member-name order as the tiebreak for equal
        // timestamps; consolidation reassembles, it does not deduplicate.
        rows.sort_by_key(|row| row.time);

        // Stage inside the working directory and rename into place, so a
        // partially written canonical file is never visible.
        let staged = work_dir.join("consolidated.part");
        table::write_table(&staged, &rows)?;
        fs::rename(&staged, canonical_path)?;
        Ok(())
    }

    /// Extract file members into the working directory, flattened to their
    /// base names, returning the suffix-matching ones sorted by name.
    fn extract_members(&self, archive_path: &Path, work_dir: &Path) -> Result<Vec<PathBuf>> {
        let file = File::open(archive_path)?;
        let mut archive = ZipArchive::new(file)?;

        let mut members = Vec::new();
        for index in 0..archive.len() {
            let mut entry = archive.by_index(index)?;
            if !entry.is_file() {
                continue;
            }
            let Some(base_name) = entry
                .enclosed_name()
                .and_then(|p| p.file_name().map(|n| n.to_os_string()))
            else {
                continue;
            };

            let dest = work_dir.join(&base_name);
            let mut writer = BufWriter::new(File::create(&dest)?);
            std::io::copy(&mut entry, &mut writer)?;
            writer.flush()?;

            if dest
                .extension()
                .map_or(false, |ext| ext == self.member_suffix.as_str())
            {
                members.push(dest);
            }
        }

        members.sort();
        Ok(members)
    }
}
