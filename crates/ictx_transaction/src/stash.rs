//! The per-transaction stash of original output files.
//!
//! Before an output file is first mutated, the stash records how to undo that
//! mutation: a backup copy of the file's bytes if it existed, or a marker that
//! it was newly created. The first registration of a path wins; later
//! registrations of the same path never overwrite the recorded state, so a
//! rollback always returns to the pre-transaction bytes.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use ictx_common::ContentHash;
use ictx_report::{BuildReporter, BuildTime, ReporterExt};

use crate::error::StashError;

/// Extension of backup copies inside the stash directory.
const BACKUP_EXT: &str = "backup";

/// How to undo the mutation of one output file.
#[derive(Debug, Clone, PartialEq, Eq)]
enum StashEntry {
    /// The file existed; its original bytes live at `stashed`.
    Backup {
        stashed: PathBuf,
        checksum: Option<ContentHash>,
    },
    /// The file did not exist; undo by deleting it.
    Created,
}

/// A private directory holding backups of output files for one transaction.
pub struct StashArea {
    dir: PathBuf,
    entries: BTreeMap<PathBuf, StashEntry>,
    next_backup: usize,
    verify_backups: bool,
    reporter: Arc<dyn BuildReporter>,
}

impl StashArea {
    /// Creates a stash backed by `dir`.
    ///
    /// The directory must be empty or absent and must not be shared with any
    /// other transaction. It is created on first use.
    pub fn new(dir: PathBuf, reporter: Arc<dyn BuildReporter>) -> Self {
        Self {
            dir,
            entries: BTreeMap::new(),
            next_backup: 0,
            verify_backups: false,
            reporter,
        }
    }

    /// Creates a stash in a fresh, uniquely named directory
    /// `<root>/<prefix>XXXXXX`. `root` defaults to the system temp directory.
    pub fn in_temp_dir(
        root: Option<&Path>,
        prefix: &str,
        reporter: Arc<dyn BuildReporter>,
    ) -> Result<Self, StashError> {
        let root = root.map_or_else(std::env::temp_dir, Path::to_path_buf);
        fs::create_dir_all(&root).map_err(StashError::io(&root))?;
        let dir = tempfile::Builder::new()
            .prefix(prefix)
            .tempdir_in(&root)
            .map_err(StashError::io(&root))?
            .keep();
        Ok(Self::new(dir, reporter))
    }

    /// Enables checksum verification of backups before they are restored.
    pub fn with_verification(mut self, verify_backups: bool) -> Self {
        self.verify_backups = verify_backups;
        self
    }

    /// The stash directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Number of output files with a recorded undo action.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no output file has been stashed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` if `path` already has a recorded undo action.
    pub fn contains(&self, path: &Path) -> bool {
        stash_key(path).is_ok_and(|key| self.entries.contains_key(&key))
    }

    /// Records the current state of `path` before the caller mutates it.
    ///
    /// An existing file is copied into the stash; a missing one is recorded as
    /// newly created. Does nothing if `path` was already recorded.
    pub fn stash(&mut self, path: &Path) -> Result<(), StashError> {
        let key = stash_key(path)?;
        if self.entries.contains_key(&key) {
            return Ok(());
        }
        let reporter = Arc::clone(&self.reporter);
        let entry = reporter.measure(BuildTime::StashFile, || -> Result<_, StashError> {
            if !is_existing_file(&key)? {
                self.reporter
                    .debug(|| format!("Marking the {} file as newly added", key.display()));
                return Ok(StashEntry::Created);
            }
            let stashed = self.next_backup_path()?;
            self.reporter.debug(|| {
                format!(
                    "Copying the {} file to the stash as {}",
                    key.display(),
                    stashed.display()
                )
            });
            fs::copy(&key, &stashed).map_err(StashError::io(&key))?;
            let checksum = self.checksum_of(&stashed)?;
            Ok(StashEntry::Backup { stashed, checksum })
        })?;
        self.entries.insert(key, entry);
        Ok(())
    }

    /// Records the current state of `path`, then deletes it.
    ///
    /// An existing, not yet recorded file is moved into the stash rather than
    /// copied. Deleting a missing file is not an error.
    pub fn delete(&mut self, path: &Path) -> Result<(), StashError> {
        let key = stash_key(path)?;
        if self.entries.contains_key(&key) {
            return remove_if_exists(&key);
        }
        let reporter = Arc::clone(&self.reporter);
        let entry = reporter.measure(BuildTime::StashFile, || -> Result<_, StashError> {
            if !is_existing_file(&key)? {
                self.reporter.debug(|| {
                    format!("Deleting the {} file, which does not exist", key.display())
                });
                return Ok(StashEntry::Created);
            }
            let stashed = self.next_backup_path()?;
            self.reporter.debug(|| {
                format!(
                    "Moving the {} file to the stash as {}",
                    key.display(),
                    stashed.display()
                )
            });
            let checksum = self.checksum_of(&key)?;
            relocate(&key, &stashed)?;
            Ok(StashEntry::Backup { stashed, checksum })
        })?;
        self.entries.insert(key, entry);
        Ok(())
    }

    /// Undoes every recorded mutation.
    ///
    /// Backups are moved back over their original paths, recreating parent
    /// directories if the caller removed them; newly created files are
    /// deleted. Restoration continues past a failing entry so as many files as
    /// possible are recovered; the first failure is returned and the failing
    /// entries stay recorded.
    pub fn restore_all(&mut self) -> Result<(), StashError> {
        let reporter = Arc::clone(&self.reporter);
        reporter.measure(BuildTime::RestoreOutputFromBackup, || {
            let mut first_error = None;
            let entries = std::mem::take(&mut self.entries);
            for (original, entry) in entries {
                if let Err(e) = self.restore_one(&original, &entry) {
                    self.reporter
                        .warn(|| format!("Failed to restore {}: {e}", original.display()));
                    first_error.get_or_insert(e);
                    self.entries.insert(original, entry);
                }
            }
            first_error.map_or(Ok(()), Err)
        })
    }

    /// Removes the stash directory and everything in it.
    ///
    /// [`RecoverableCompilationTransaction`](crate::RecoverableCompilationTransaction)
    /// skips this after a failed [`restore_all`](Self::restore_all), so the
    /// stash outlives the transaction instead of being released on every
    /// outcome and the remaining backups can be recovered by hand.
    pub fn discard(&mut self) -> Result<(), StashError> {
        let reporter = Arc::clone(&self.reporter);
        reporter.measure(BuildTime::CleanBackupStash, || {
            self.reporter
                .debug(|| format!("Removing the stash directory {}", self.dir.display()));
            self.entries.clear();
            match fs::remove_dir_all(&self.dir) {
                Err(e) if e.kind() != io::ErrorKind::NotFound => Err(StashError::Io {
                    path: self.dir.clone(),
                    source: e,
                }),
                _ => Ok(()),
            }
        })
    }

    fn restore_one(&self, original: &Path, entry: &StashEntry) -> Result<(), StashError> {
        match entry {
            StashEntry::Created => {
                self.reporter
                    .debug(|| format!("Removing the newly added {} file", original.display()));
                remove_if_exists(original)
            }
            StashEntry::Backup { stashed, checksum } => {
                if let Some(expected) = checksum {
                    let actual = ContentHash::from_file(stashed).map_err(StashError::io(stashed))?;
                    if actual != *expected {
                        return Err(StashError::ChecksumMismatch {
                            path: original.to_path_buf(),
                            expected: expected.to_string(),
                            actual: actual.to_string(),
                        });
                    }
                }
                self.reporter.debug(|| {
                    format!(
                        "Restoring the {} file from {}",
                        original.display(),
                        stashed.display()
                    )
                });
                if let Some(parent) = original.parent() {
                    fs::create_dir_all(parent).map_err(StashError::io(parent))?;
                }
                relocate(stashed, original)
            }
        }
    }

    fn next_backup_path(&mut self) -> Result<PathBuf, StashError> {
        fs::create_dir_all(&self.dir).map_err(StashError::io(&self.dir))?;
        let path = self
            .dir
            .join(format!("{}.{BACKUP_EXT}", self.next_backup));
        self.next_backup += 1;
        Ok(path)
    }

    fn checksum_of(&self, file: &Path) -> Result<Option<ContentHash>, StashError> {
        if !self.verify_backups {
            return Ok(None);
        }
        ContentHash::from_file(file)
            .map(Some)
            .map_err(StashError::io(file))
    }
}

/// Maps every spelling of an output path to one stash key.
///
/// The nearest existing ancestor of the file's directory is canonicalized, so
/// `..` segments and symlinked directories resolve to the real location; the
/// components below it are folded lexically. The file name itself is never
/// resolved, so a symlinked output is restored as the link path. When no
/// ancestor can be canonicalized the whole path is folded lexically.
fn stash_key(path: &Path) -> Result<PathBuf, StashError> {
    let absolute = std::path::absolute(path).map_err(StashError::io(path))?;
    let components: Vec<Component<'_>> = absolute.components().collect();
    let dir_len = match components.last() {
        Some(Component::Normal(_)) => components.len() - 1,
        _ => components.len(),
    };
    for split in (1..=dir_len).rev() {
        let ancestor: PathBuf = components[..split].iter().collect();
        if let Ok(real) = fs::canonicalize(&ancestor) {
            return Ok(fold_components(real, &components[split..]));
        }
    }
    Ok(fold_components(PathBuf::new(), &components))
}

fn fold_components(mut base: PathBuf, components: &[Component<'_>]) -> PathBuf {
    for component in components {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                base.pop();
            }
            other => base.push(other),
        }
    }
    base
}

fn is_existing_file(path: &Path) -> Result<bool, StashError> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_file() => Ok(true),
        Ok(_) => Err(StashError::NotAFile {
            path: path.to_path_buf(),
        }),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(StashError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

fn remove_if_exists(path: &Path) -> Result<(), StashError> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(StashError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
        _ => Ok(()),
    }
}

/// Moves `from` to `to`, replacing `to`. Falls back to copy and remove when a
/// rename is impossible, e.g. across filesystems.
fn relocate(from: &Path, to: &Path) -> Result<(), StashError> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    fs::copy(from, to).map_err(StashError::io(from))?;
    fs::remove_file(from).map_err(StashError::io(from))
}
