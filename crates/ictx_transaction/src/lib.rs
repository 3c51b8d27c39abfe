//! Transactional staging of build outputs and incremental caches.
//!
//! A [`CompilationTransaction`] spans one compilation attempt. The build driver
//! opens one, runs its compilation body through
//! [`run_within`](CompilationTransaction::run_within), registers every output
//! file before writing it, and marks the transaction successful once the
//! output is known to be good. On any other exit the transaction rolls back:
//! registered in-memory cache wrappers discard their pending changes and, for
//! the [`RecoverableCompilationTransaction`], every touched output file is
//! restored from the stash. The caches manager is closed exactly once on every
//! path, and a failure to close it is reported as a distinct error.

#![warn(missing_docs)]

pub mod error;
pub mod mode;
pub mod non_recoverable;
pub mod recoverable;
pub mod stash;
pub mod transaction;
pub mod write;

pub use error::{CachesManagerCloseError, CloseError, StashError, TransactionError};
pub use mode::{create_transaction, reporter_for, Transaction};
pub use non_recoverable::NonRecoverableCompilationTransaction;
pub use recoverable::RecoverableCompilationTransaction;
pub use stash::StashArea;
pub use transaction::CompilationTransaction;
pub use write::{write_bytes, write_text, OutputItem, OutputsRegistrar};
