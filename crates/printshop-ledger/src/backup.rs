//! Startup snapshots of the record collections.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::error::Result;
use crate::store::Collection;

/// Directory (inside the data directory) that holds backup archives.
pub const BACKUP_DIR: &str = "Backups";

const PREFIX: &str = "AutoBackup_";

/// Zip whichever collection files exist in `data_dir` into
/// `Backups/AutoBackup_<timestamp>.zip`, then prune to the newest `keep`.
///
/// Returns `None` when there was nothing to back up.
pub fn create_backup(data_dir: &Path, now: NaiveDateTime, keep: usize) -> Result<Option<PathBuf>> {
    let sources: Vec<(Collection, PathBuf)> = Collection::ALL
        .iter()
        .map(|c| (*c, data_dir.join(c.file_name())))
        .filter(|(_, path)| path.exists())
        .collect();

    if sources.is_empty() {
        return Ok(None);
    }

    let backup_dir = data_dir.join(BACKUP_DIR);
    fs::create_dir_all(&backup_dir)?;
    let zip_path = backup_dir.join(format!("{PREFIX}{}.zip", now.format("%Y%m%d_%H%M%S")));

    let mut zip = ZipWriter::new(File::create(&zip_path)?);
    let options = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .compression_level(Some(6));

    for (collection, path) in &sources {
        zip.start_file(collection.file_name(), options)?;
        zip.write_all(&fs::read(path)?)?;
    }
    zip.finish()?;

    let removed = prune(&backup_dir, keep)?;
    tracing::info!(path = %zip_path.display(), files = sources.len(), removed, "backup written");
    Ok(Some(zip_path))
}

/// Backup run at startup; failures are logged and swallowed.
pub fn auto_backup(data_dir: &Path, now: NaiveDateTime, keep: usize) -> Option<PathBuf> {
    match create_backup(data_dir, now, keep) {
        Ok(path) => path,
        Err(e) => {
            tracing::warn!(error = %e, "automatic backup failed");
            None
        }
    }
}

fn prune(backup_dir: &Path, keep: usize) -> Result<usize> {
    let mut archives: Vec<PathBuf> = fs::read_dir(backup_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(PREFIX) && n.ends_with(".zip"))
        })
        .collect();

    // Timestamped names sort chronologically.
    archives.sort();
    let excess = archives.len().saturating_sub(keep);
    for path in &archives[..excess] {
        fs::remove_file(path)?;
    }
    Ok(excess)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(second: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 14)
            .and_then(|d| d.and_hms_opt(9, 26, second))
            .unwrap()
    }

    #[test]
    fn test_nothing_to_back_up() {
        let dir = tempfile::tempdir().unwrap();
        assert!(create_backup(dir.path(), at(0), 5).unwrap().is_none());
        assert!(!dir.path().join(BACKUP_DIR).exists());
    }

    #[test]
    fn test_backup_is_zip() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("filament_inventory.json"), "[]").unwrap();

        let path = create_backup(dir.path(), at(0), 5).unwrap().unwrap();
        assert!(path.ends_with("AutoBackup_20260314_092600.zip"));
        let bytes = fs::read(path).unwrap();
        assert_eq!(&bytes[0..2], b"PK");
    }

    #[test]
    fn test_prunes_to_newest() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("sales_history.json"), "[]").unwrap();

        for s in 0..7 {
            create_backup(dir.path(), at(s), 5).unwrap();
        }
        let mut names: Vec<String> = fs::read_dir(dir.path().join(BACKUP_DIR))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names.len(), 5);
        assert_eq!(names[0], "AutoBackup_20260314_092602.zip");
    }
}
