//! Configuration types deserialized from `ictx.toml`.

use ictx_report::ReportLevel;
use serde::Deserialize;
use std::path::PathBuf;

/// Default prefix of per-transaction stash directories.
pub const DEFAULT_STASH_PREFIX: &str = "ictx-backups";

/// The top-level configuration parsed from `ictx.toml`.
///
/// Every section is optional; an empty file yields a non-recoverable
/// transaction with write-through caches.
#[derive(Debug, Default, Deserialize)]
pub struct IctxConfig {
    /// How compilation transactions are opened.
    #[serde(default)]
    pub transaction: TransactionConfig,
    /// Cache storage policy.
    #[serde(default)]
    pub caches: CachesConfig,
    /// Reporting settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// Settings for opening a compilation transaction.
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionConfig {
    /// Which transaction variant to open.
    #[serde(default)]
    pub mode: TransactionMode,
    /// Directory in which per-transaction stash directories are created.
    /// `None` means the system temporary directory.
    #[serde(default)]
    pub stash_root: Option<PathBuf>,
    /// Name prefix of each per-transaction stash directory.
    #[serde(default = "default_stash_prefix")]
    pub stash_prefix: String,
    /// Verify the checksum of every stashed copy before restoring it.
    #[serde(default)]
    pub verify_backups: bool,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            mode: TransactionMode::default(),
            stash_root: None,
            stash_prefix: default_stash_prefix(),
            verify_backups: false,
        }
    }
}

fn default_stash_prefix() -> String {
    DEFAULT_STASH_PREFIX.to_string()
}

/// The transaction variant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransactionMode {
    /// Output files are not backed up; a failed build leaves them as written.
    #[default]
    NonRecoverable,
    /// Output files are stashed before mutation and restored on failure.
    Recoverable,
}

/// Cache storage policy.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct CachesConfig {
    /// Buffer cache mutations in memory until the caches manager is closed,
    /// so a rolled-back transaction can discard them. Meant to be enabled
    /// together with [`TransactionMode::Recoverable`].
    #[serde(default)]
    pub keep_in_memory: bool,
}

/// Reporting settings.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ReportConfig {
    /// Minimum level of forwarded report messages.
    #[serde(default)]
    pub level: ReportLevel,
}
