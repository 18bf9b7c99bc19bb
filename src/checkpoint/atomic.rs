//! Write-then-rename file replacement.
//!
//! Content goes to a uniquely named hidden sibling first. Only `commit`
//! moves it over the target, so readers observe either the old file or the
//! complete new one.

use crate::models::{CtlBreakError, Result};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Glob pattern matching temp files that `AtomicWrite` may leave for `target`.
pub(crate) fn orphan_pattern(target: &Path) -> String {
    let dir = target.parent().unwrap_or_else(|| Path::new(""));
    let escaped_dir = glob::Pattern::escape(&dir.to_string_lossy());
    let name = glob::Pattern::escape(&file_name(target));
    Path::new(&escaped_dir)
        .join(format!(".{name}.*.tmp"))
        .to_string_lossy()
        .into_owned()
}

fn file_name(target: &Path) -> String {
    target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string())
}

/// Pending replacement of a single file.
pub struct AtomicWrite {
    target: PathBuf,
    temp_path: PathBuf,
    writer: Option<BufWriter<File>>,
    committed: bool,
}

impl AtomicWrite {
    /// Begin a replacement of `target`.
    ///
    /// Creates the parent directory if needed.
    pub fn begin(target: &Path) -> Result<Self> {
        if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| CtlBreakError::io(format!("creating {}", parent.display()), e))?;
        }

        let temp_name = format!(".{}.{}.tmp", file_name(target), uuid::Uuid::new_v4());
        let temp_path = target.with_file_name(temp_name);
        let file = File::create(&temp_path)
            .map_err(|e| CtlBreakError::io(format!("creating {}", temp_path.display()), e))?;

        debug!(path = %target.display(), temp = %temp_path.display(), "Atomic write started");
        Ok(Self {
            target: target.to_path_buf(),
            temp_path,
            writer: Some(BufWriter::new(file)),
            committed: false,
        })
    }

    /// Writer for the pending content.
    pub fn writer(&mut self) -> &mut BufWriter<File> {
        self.writer
            .as_mut()
            .expect("writer is present until commit or abort")
    }

    /// Flush, fsync and rename the pending content over the target.
    pub fn commit(mut self) -> Result<()> {
        let writer = self
            .writer
            .take()
            .ok_or_else(|| CtlBreakError::Internal("Atomic write already finished".to_string()))?;

        let file = writer
            .into_inner()
            .map_err(|e| CtlBreakError::io("flushing temp file", e.into_error()))?;
        file.sync_all()
            .map_err(|e| CtlBreakError::io("syncing temp file", e))?;
        drop(file);

        fs::rename(&self.temp_path, &self.target).map_err(|e| {
            CtlBreakError::io(format!("renaming over {}", self.target.display()), e)
        })?;
        self.committed = true;

        #[cfg(unix)]
        {
            // Best effort: makes the rename itself durable on most filesystems.
            if let Some(parent) = self.target.parent().filter(|p| !p.as_os_str().is_empty()) {
                if let Ok(dir) = File::open(parent) {
                    let _ = dir.sync_all();
                }
            }
        }

        debug!(path = %self.target.display(), "Atomic write committed");
        Ok(())
    }

    /// Discard the pending content, leaving the target untouched.
    pub fn abort(mut self) -> Result<()> {
        self.writer.take();
        remove_if_exists(&self.temp_path)
    }
}

impl Drop for AtomicWrite {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        if self.writer.take().is_some() {
            warn!(
                path = %self.target.display(),
                "Atomic write dropped without commit/abort, discarding temp file"
            );
        }
        // Also covers a commit that failed after the writer was taken.
        let _ = fs::remove_file(&self.temp_path);
    }
}

/// Remove a file, treating "not found" as success.
pub(crate) fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(CtlBreakError::io(format!("removing {}", path.display()), e)),
    }
}

/// Write `data` to `target` atomically.
pub fn atomic_write(target: &Path, data: &[u8]) -> Result<()> {
    let mut tx = AtomicWrite::begin(target)?;
    if let Err(e) = tx.writer().write_all(data) {
        tx.abort()?;
        return Err(CtlBreakError::io("writing temp file", e));
    }
    tx.commit()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_files(target: &Path) -> Vec<PathBuf> {
        glob::glob(&orphan_pattern(target))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect()
    }

    #[test]
    fn test_commit_replaces_target() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("out.csv");
        fs::write(&target, "old").unwrap();

        atomic_write(&target, b"new").unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), "new");
        assert!(temp_files(&target).is_empty());
    }

    #[test]
    fn test_abort_leaves_target_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("out.csv");
        fs::write(&target, "old").unwrap();

        let mut tx = AtomicWrite::begin(&target).unwrap();
        tx.writer().write_all(b"partial").unwrap();
        assert_eq!(temp_files(&target).len(), 1);
        tx.abort().unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), "old");
        assert!(temp_files(&target).is_empty());
    }

    #[test]
    fn test_drop_discards_temp_file() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("out.csv");

        {
            let mut tx = AtomicWrite::begin(&target).unwrap();
            tx.writer().write_all(b"partial").unwrap();
        }

        assert!(!target.exists());
        assert!(temp_files(&target).is_empty());
    }

    #[test]
    fn test_creates_parent_dir() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("nested").join("state.json");

        atomic_write(&target, b"{}").unwrap();
        assert!(target.exists());
    }

    #[test]
    fn test_remove_if_exists_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("gone");
        remove_if_exists(&path).unwrap();
        fs::write(&path, "x").unwrap();
        remove_if_exists(&path).unwrap();
        assert!(!path.exists());
    }
}
