//! Writing outputs through a transaction.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::StashError;
use crate::transaction::CompilationTransaction;

/// Registers `path` with `transaction`, then writes `bytes` to it, creating
/// parent directories as needed.
pub fn write_bytes<T>(transaction: &mut T, path: &Path, bytes: &[u8]) -> Result<(), StashError>
where
    T: CompilationTransaction + ?Sized,
{
    transaction.register_added_or_changed_file(path)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(StashError::io(parent))?;
    }
    fs::write(path, bytes).map_err(StashError::io(path))
}

/// Text variant of [`write_bytes`].
pub fn write_text<T>(transaction: &mut T, path: &Path, text: &str) -> Result<(), StashError>
where
    T: CompilationTransaction + ?Sized,
{
    write_bytes(transaction, path, text.as_bytes())
}

/// An output file and the source files it was generated from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputItem {
    /// Sources the output depends on.
    pub source_files: Vec<PathBuf>,
    /// The generated file.
    pub output_file: PathBuf,
}

/// Collects the outputs of a compilation, registering each one with the
/// transaction as it is announced.
///
/// Hand this to code that generates outputs but knows nothing about
/// transactions; the recorded items are then available to update the
/// source-to-output mapping after the compilation.
pub struct OutputsRegistrar<'a, T: ?Sized> {
    transaction: &'a mut T,
    outputs: Vec<OutputItem>,
}

impl<'a, T> OutputsRegistrar<'a, T>
where
    T: CompilationTransaction + ?Sized,
{
    /// Creates a registrar over `transaction`.
    pub fn new(transaction: &'a mut T) -> Self {
        Self {
            transaction,
            outputs: Vec::new(),
        }
    }

    /// Registers `output` with the transaction and records it with its
    /// sources. Nothing is recorded if registration fails.
    pub fn add(&mut self, source_files: Vec<PathBuf>, output_file: PathBuf) -> Result<(), StashError> {
        self.transaction.register_added_or_changed_file(&output_file)?;
        self.outputs.push(OutputItem {
            source_files,
            output_file,
        });
        Ok(())
    }

    /// Outputs recorded so far.
    pub fn outputs(&self) -> &[OutputItem] {
        &self.outputs
    }

    /// Consumes the registrar, returning the recorded outputs.
    pub fn into_outputs(self) -> Vec<OutputItem> {
        self.outputs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recoverable::RecoverableCompilationTransaction;
    use ictx_report::NoopReporter;
    use std::sync::Arc;

    fn recoverable(dir: &Path) -> RecoverableCompilationTransaction {
        RecoverableCompilationTransaction::new(Arc::new(NoopReporter), dir.join("stash"))
    }

    #[test]
    fn write_text_creates_parents_and_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("out/nested/a.txt");
        let mut tx = recoverable(dir.path());

        write_text(&mut tx, &file, "generated").unwrap();
        assert_eq!(fs::read_to_string(&file).unwrap(), "generated");
        assert!(tx.stash().contains(&file));

        tx.close(false).unwrap();
        assert!(!file.exists());
    }

    #[test]
    fn write_bytes_overwrites_and_restores() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.bin");
        fs::write(&file, [1u8, 2, 3]).unwrap();
        let mut tx = recoverable(dir.path());

        write_bytes(&mut tx, &file, &[9, 9]).unwrap();
        write_bytes(&mut tx, &file, &[7]).unwrap();
        assert_eq!(fs::read(&file).unwrap(), vec![7]);

        tx.close(false).unwrap();
        assert_eq!(fs::read(&file).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn registrar_records_and_registers() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("A.class");
        let mut tx = recoverable(dir.path());

        let outputs = {
            let mut registrar = OutputsRegistrar::new(&mut tx);
            registrar
                .add(vec![dir.path().join("A.src")], out.clone())
                .unwrap();
            assert_eq!(registrar.outputs().len(), 1);
            registrar.into_outputs()
        };
        assert_eq!(outputs[0].output_file, out);
        assert!(tx.stash().contains(&out));
        tx.close(false).unwrap();
    }

    #[test]
    fn non_recoverable_writes_survive_failure() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("b.txt");
        let mut tx = crate::NonRecoverableCompilationTransaction::new();
        write_text(&mut tx, &file, "kept").unwrap();
        tx.close(false).unwrap();
        assert_eq!(fs::read_to_string(&file).unwrap(), "kept");
    }
}
