//! Per-call transaction bookkeeping with a sibling `.bak` backup.
//!
//! `begin` copies the target to `<path>.bak` and records its blake3 digest.
//! `commit` deletes the backup; `rollback` verifies the digest, restores the
//! target and deletes the backup. A context dropped before either call
//! rolls back.

use blake3::Hasher as Blake3;
use std::{
    ffi::OsString,
    fs::{self, File},
    io::Read,
    path::{Path, PathBuf},
};

use crate::core::error::{PatchError, PatchResultOf};

/// Lifecycle of an [`AtomicContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Idle,
    BackedUp,
    Committed,
    RolledBack,
}

#[derive(Debug)]
struct BackupRecord {
    path: PathBuf,
    checksum: String, // blake3:<hex>
}

#[derive(Debug)]
pub struct AtomicContext {
    target: PathBuf,
    backup: Option<BackupRecord>,
    state: ContextState,
}

/// `<path>.bak` next to the target.
pub fn backup_path_for(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(OsString::from)
        .unwrap_or_default();
    name.push(".bak");
    target.with_file_name(name)
}

/// Stream a file into a blake3 digest as `blake3:<hex>`.
fn stream_blake3(path: &Path) -> std::io::Result<String> {
    let mut f = File::open(path)?;
    let mut hasher = Blake3::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = f.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("blake3:{}", hasher.finalize().to_hex()))
}

impl AtomicContext {
    /// Open a context; with `create_backup` an existing target is copied aside.
    pub fn begin(target: &Path, create_backup: bool) -> PatchResultOf<Self> {
        let mut ctx = Self {
            target: target.to_path_buf(),
            backup: None,
            state: ContextState::Idle,
        };

        if create_backup && target.exists() {
            let path = backup_path_for(target);
            let backup_err = |e: std::io::Error| PatchError::Backup {
                path: target.to_path_buf(),
                message: e.to_string(),
            };

            fs::copy(target, &path).map_err(backup_err)?;
            let checksum = stream_blake3(&path).map_err(backup_err)?;
            tracing::debug!(backup = %path.display(), %checksum, "backup created");

            ctx.backup = Some(BackupRecord { path, checksum });
            ctx.state = ContextState::BackedUp;
        }

        Ok(ctx)
    }

    pub fn state(&self) -> ContextState {
        self.state
    }

    pub fn backup_path(&self) -> Option<&Path> {
        self.backup.as_ref().map(|b| b.path.as_path())
    }

    fn is_open(&self) -> bool {
        matches!(self.state, ContextState::Idle | ContextState::BackedUp)
    }

    /// Keep the new content and discard the backup.
    pub fn commit(&mut self) -> PatchResultOf<()> {
        if !self.is_open() {
            return Ok(());
        }

        if let Some(backup) = &self.backup {
            fs::remove_file(&backup.path).map_err(|e| PatchError::Backup {
                path: self.target.clone(),
                message: format!("failed to remove backup: {e}"),
            })?;
        }

        self.state = ContextState::Committed;
        Ok(())
    }

    /// Restore the target from the verified backup and discard it.
    pub fn rollback(&mut self) -> PatchResultOf<()> {
        if !self.is_open() {
            return Ok(());
        }
        // Closed even if the restore below fails
        self.state = ContextState::RolledBack;

        let Some(backup) = &self.backup else {
            return Ok(());
        };
        let restore_err = |message: String| PatchError::Restore {
            path: self.target.clone(),
            message,
        };

        let actual = stream_blake3(&backup.path).map_err(|e| restore_err(e.to_string()))?;
        if actual != backup.checksum {
            return Err(restore_err(format!(
                "backup checksum mismatch: expected {}, got {actual}",
                backup.checksum
            )));
        }

        fs::copy(&backup.path, &self.target).map_err(|e| restore_err(e.to_string()))?;
        fs::remove_file(&backup.path).map_err(|e| restore_err(e.to_string()))?;

        tracing::info!(path = %self.target.display(), "rolled back from backup");
        Ok(())
    }
}

impl Drop for AtomicContext {
    fn drop(&mut self) {
        if self.is_open() {
            tracing::warn!(path = %self.target.display(), "unfinished context, rolling back");
            if let Err(e) = self.rollback() {
                tracing::error!(error = %e, "rollback on drop failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fixture(content: &str) -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("file.txt");
        fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn backup_path_appends_suffix() {
        assert_eq!(
            backup_path_for(Path::new("src/lib.rs")),
            PathBuf::from("src/lib.rs.bak")
        );
    }

    #[test]
    fn commit_removes_backup() {
        let (_dir, path) = fixture("original\n");
        let mut ctx = AtomicContext::begin(&path, true).unwrap();
        let bak = ctx.backup_path().unwrap().to_path_buf();
        assert!(bak.exists());
        assert_eq!(ctx.state(), ContextState::BackedUp);

        fs::write(&path, "changed\n").unwrap();
        ctx.commit().unwrap();

        assert_eq!(ctx.state(), ContextState::Committed);
        assert!(!bak.exists());
        assert_eq!(fs::read_to_string(&path).unwrap(), "changed\n");
    }

    #[test]
    fn rollback_restores_original() {
        let (_dir, path) = fixture("original\n");
        let mut ctx = AtomicContext::begin(&path, true).unwrap();
        let bak = ctx.backup_path().unwrap().to_path_buf();

        fs::write(&path, "changed\n").unwrap();
        ctx.rollback().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "original\n");
        assert!(!bak.exists());
        assert_eq!(ctx.state(), ContextState::RolledBack);
    }

    #[test]
    fn drop_rolls_back_unfinished_context() {
        let (_dir, path) = fixture("original\n");
        {
            let _ctx = AtomicContext::begin(&path, true).unwrap();
            fs::write(&path, "changed\n").unwrap();
        }
        assert_eq!(fs::read_to_string(&path).unwrap(), "original\n");
        assert!(!backup_path_for(&path).exists());
    }

    #[test]
    fn tampered_backup_is_not_restored() {
        let (_dir, path) = fixture("original\n");
        let mut ctx = AtomicContext::begin(&path, true).unwrap();
        fs::write(ctx.backup_path().unwrap(), "tampered\n").unwrap();
        fs::write(&path, "changed\n").unwrap();

        let err = ctx.rollback().unwrap_err();
        assert_eq!(err.code_str(), "rpatch::restore_failed");
        assert_eq!(fs::read_to_string(&path).unwrap(), "changed\n");
    }

    #[test]
    fn no_backup_for_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("new.txt");
        let mut ctx = AtomicContext::begin(&path, true).unwrap();

        assert!(ctx.backup_path().is_none());
        ctx.commit().unwrap();
    }
}
