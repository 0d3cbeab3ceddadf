// TabHost State Store
// Owns the on-disk layout of the profile directory: where the aggregate state,
// language file, window sequence and per-window snapshots live, how they are
// written (atomically), and where restored snapshots are moved to.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::types::errors::PersistenceError;

pub const STATE_FILE: &str = "tabhost-state";
pub const LANG_FILE: &str = "tabhost-lang";
pub const SEQUENCE_FILE: &str = "tabhost-window-seq";
/// Snapshot files are named `<SNAPSHOT_PREFIX>-window-<n>`.
pub const SNAPSHOT_PREFIX: &str = STATE_FILE;

/// Profile-directory file access.
#[derive(Debug, Clone)]
pub struct StateStore {
    profile_dir: PathBuf,
    relocation_dir: PathBuf,
}

impl StateStore {
    /// Creates a store rooted at `profile_dir`. Restored snapshots are moved
    /// into `relocation_dir`.
    pub fn new(profile_dir: impl Into<PathBuf>, relocation_dir: impl Into<PathBuf>) -> Self {
        Self {
            profile_dir: profile_dir.into(),
            relocation_dir: relocation_dir.into(),
        }
    }

    pub fn profile_dir(&self) -> &Path {
        &self.profile_dir
    }

    pub fn relocation_dir(&self) -> &Path {
        &self.relocation_dir
    }

    pub fn state_path(&self) -> PathBuf {
        self.profile_dir.join(STATE_FILE)
    }

    pub fn language_path(&self) -> PathBuf {
        self.profile_dir.join(LANG_FILE)
    }

    pub fn sequence_path(&self) -> PathBuf {
        self.profile_dir.join(SEQUENCE_FILE)
    }

    pub fn snapshot_path(&self, sequence: u64) -> PathBuf {
        self.profile_dir.join(snapshot_file_name(sequence))
    }

    /// Reads a file; a missing file is `Ok(None)`.
    pub fn read(&self, path: &Path) -> Result<Option<Vec<u8>>, PersistenceError> {
        match fs::read(path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PersistenceError::Io(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    /// Writes `bytes` to `path` through a temp file in the same directory
    /// and a rename, so readers never see a partial file.
    pub fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<(), PersistenceError> {
        let dir = path.parent().unwrap_or(&self.profile_dir);
        fs::create_dir_all(dir).map_err(|e| {
            PersistenceError::Io(format!("Failed to create {}: {}", dir.display(), e))
        })?;

        let mut tmp = NamedTempFile::new_in(dir)
            .map_err(|e| PersistenceError::Io(format!("Failed to create temp file: {}", e)))?;
        tmp.write_all(bytes)
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| PersistenceError::Io(format!("Failed to write temp file: {}", e)))?;
        tmp.persist(path).map_err(|e| {
            PersistenceError::Io(format!("Failed to replace {}: {}", path.display(), e.error))
        })?;
        Ok(())
    }

    /// Lists `(sequence, path)` for every snapshot file in the profile
    /// directory, unordered. Files not matching the naming pattern are skipped.
    pub fn snapshot_files(&self) -> Result<Vec<(u64, PathBuf)>, PersistenceError> {
        let entries = match fs::read_dir(&self.profile_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(PersistenceError::Io(format!(
                    "Failed to scan {}: {}",
                    self.profile_dir.display(),
                    e
                )))
            }
        };

        let mut found = Vec::new();
        for entry in entries.flatten() {
            let name = entry.file_name();
            if let Some(sequence) = name.to_str().and_then(parse_snapshot_sequence) {
                found.push((sequence, entry.path()));
            }
        }
        Ok(found)
    }

    /// Moves a consumed snapshot out of the profile directory.
    pub fn relocate(&self, path: &Path) -> Result<PathBuf, PersistenceError> {
        let name = path
            .file_name()
            .ok_or_else(|| PersistenceError::Io(format!("Not a file: {}", path.display())))?;
        let target = self.relocation_dir.join(name);
        fs::create_dir_all(&self.relocation_dir).map_err(|e| {
            PersistenceError::Io(format!(
                "Failed to create {}: {}",
                self.relocation_dir.display(),
                e
            ))
        })?;

        if fs::rename(path, &target).is_err() {
            // Rename fails across filesystems; copy first so the original
            // survives if the copy does not.
            fs::copy(path, &target)
                .and_then(|_| fs::remove_file(path))
                .map_err(|e| {
                    PersistenceError::Io(format!(
                        "Failed to relocate {}: {}",
                        path.display(),
                        e
                    ))
                })?;
        }
        Ok(target)
    }
}

pub fn snapshot_file_name(sequence: u64) -> String {
    format!("{}-window-{}", SNAPSHOT_PREFIX, sequence)
}

/// Extracts `n` from `<prefix>-window-<n>`.
pub fn parse_snapshot_sequence(name: &str) -> Option<u64> {
    let digits = name.strip_prefix(SNAPSHOT_PREFIX)?.strip_prefix("-window-")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
