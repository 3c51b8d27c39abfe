//! Choosing a transaction variant from configuration.

use std::path::Path;
use std::sync::Arc;

use ictx_common::{CachesManager, InMemoryStorageWrapper};
use ictx_config::{IctxConfig, ReportConfig, TransactionMode};
use ictx_report::{BuildReporter, ReporterExt, TracingReporter};

use crate::error::{CloseError, StashError};
use crate::non_recoverable::NonRecoverableCompilationTransaction;
use crate::recoverable::RecoverableCompilationTransaction;
use crate::stash::StashArea;
use crate::transaction::CompilationTransaction;

/// Either transaction variant, chosen at runtime.
///
/// Lets a build driver run the same compilation body regardless of whether
/// precise output backups are enabled.
pub enum Transaction {
    /// Output files are not restored on failure.
    NonRecoverable(NonRecoverableCompilationTransaction),
    /// Output files are stashed and restored on failure.
    Recoverable(RecoverableCompilationTransaction),
}

impl Transaction {
    /// Returns `true` for the recoverable variant.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Transaction::Recoverable(_))
    }
}

/// Opens a transaction as described by `config`.
///
/// Recoverable transactions get a fresh stash directory named after
/// `transaction.stash_prefix` under `transaction.stash_root`.
pub fn create_transaction(
    config: &IctxConfig,
    reporter: Arc<dyn BuildReporter>,
) -> Result<Transaction, StashError> {
    let tx = &config.transaction;
    match tx.mode {
        TransactionMode::NonRecoverable => {
            if config.caches.keep_in_memory {
                reporter.warn(|| {
                    "caches.keep_in_memory has no rollback benefit without a recoverable transaction"
                        .to_string()
                });
            }
            Ok(Transaction::NonRecoverable(
                NonRecoverableCompilationTransaction::with_reporter(reporter),
            ))
        }
        TransactionMode::Recoverable => {
            let stash = StashArea::in_temp_dir(
                tx.stash_root.as_deref(),
                &tx.stash_prefix,
                Arc::clone(&reporter),
            )?
            .with_verification(tx.verify_backups);
            reporter.debug(|| format!("Opened a recoverable transaction in {}", stash.dir().display()));
            Ok(Transaction::Recoverable(
                RecoverableCompilationTransaction::from_stash(reporter, stash),
            ))
        }
    }
}

/// Builds the default reporter for a configuration: everything is forwarded
/// to `tracing` at the configured level and above.
pub fn reporter_for(config: &ReportConfig) -> Arc<dyn BuildReporter> {
    Arc::new(TracingReporter::new(config.level))
}

impl CompilationTransaction for Transaction {
    fn register_added_or_changed_file(&mut self, path: &Path) -> Result<(), StashError> {
        match self {
            Transaction::NonRecoverable(t) => t.register_added_or_changed_file(path),
            Transaction::Recoverable(t) => t.register_added_or_changed_file(path),
        }
    }

    fn delete_file(&mut self, path: &Path) -> Result<(), StashError> {
        match self {
            Transaction::NonRecoverable(t) => t.delete_file(path),
            Transaction::Recoverable(t) => t.delete_file(path),
        }
    }

    fn mark_as_successful(&mut self) {
        match self {
            Transaction::NonRecoverable(t) => t.mark_as_successful(),
            Transaction::Recoverable(t) => t.mark_as_successful(),
        }
    }

    fn is_successful(&self) -> bool {
        match self {
            Transaction::NonRecoverable(t) => t.is_successful(),
            Transaction::Recoverable(t) => t.is_successful(),
        }
    }

    fn set_caches_manager(&mut self, caches: Box<dyn CachesManager>) {
        match self {
            Transaction::NonRecoverable(t) => t.set_caches_manager(caches),
            Transaction::Recoverable(t) => t.set_caches_manager(caches),
        }
    }

    fn register_in_memory_storage_wrapper(&mut self, wrapper: Arc<dyn InMemoryStorageWrapper>) {
        match self {
            Transaction::NonRecoverable(t) => t.register_in_memory_storage_wrapper(wrapper),
            Transaction::Recoverable(t) => t.register_in_memory_storage_wrapper(wrapper),
        }
    }

    fn close(self, body_succeeded: bool) -> Result<(), CloseError> {
        match self {
            Transaction::NonRecoverable(t) => t.close(body_succeeded),
            Transaction::Recoverable(t) => t.close(body_succeeded),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ictx_config::load_config_from_str;
    use ictx_report::RecordingReporter;

    #[test]
    fn default_config_opens_non_recoverable() {
        let config = IctxConfig::default();
        let tx = create_transaction(&config, Arc::new(RecordingReporter::new())).unwrap();
        assert!(!tx.is_recoverable());
        tx.close(true).unwrap();
    }

    #[test]
    fn recoverable_config_opens_stash_under_root() {
        let root = tempfile::tempdir().unwrap();
        let toml = format!(
            "[transaction]\nmode = \"recoverable\"\nstash_root = {:?}\nstash_prefix = \"build-backups\"\n",
            root.path().display().to_string()
        );
        let config = load_config_from_str(&toml).unwrap();
        let tx = create_transaction(&config, Arc::new(RecordingReporter::new())).unwrap();
        let Transaction::Recoverable(inner) = &tx else {
            panic!("expected a recoverable transaction");
        };
        let stash_dir = inner.stash_dir().to_path_buf();
        assert!(stash_dir.starts_with(root.path()));
        assert!(stash_dir
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("build-backups"));
        tx.close(true).unwrap();
        assert!(!stash_dir.exists());
    }

    #[test]
    fn in_memory_caches_without_recovery_warns() {
        let config = load_config_from_str("[caches]\nkeep_in_memory = true\n").unwrap();
        let reporter = Arc::new(RecordingReporter::new());
        let tx = create_transaction(&config, reporter.clone()).unwrap();
        assert!(reporter.contains("keep_in_memory"));
        tx.close(false).unwrap();
    }

    #[test]
    fn reporter_for_uses_configured_level() {
        let config = load_config_from_str("[report]\nlevel = \"warning\"\n").unwrap();
        let reporter = reporter_for(&config.report);
        assert!(!reporter.is_enabled(ictx_report::ReportLevel::Info));
        assert!(reporter.is_enabled(ictx_report::ReportLevel::Error));
    }
}
