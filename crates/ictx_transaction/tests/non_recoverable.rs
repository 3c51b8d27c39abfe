//! The non-recoverable transaction leaves output files as the body left them.

mod common;

use std::fs;

use common::{compilation_failed, non_recoverable, BuildError, CountingWrapper};
use ictx_transaction::{write_text, CompilationTransaction};

#[test]
fn modified_file_not_restored() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("a.txt");
    fs::write(&file, "something").unwrap();
    let wrapper = CountingWrapper::new();

    let result = non_recoverable(dir.path()).run_within(|tx| -> Result<(), BuildError> {
        tx.register_in_memory_storage_wrapper(wrapper.clone());
        write_text(tx, &file, "other")?;
        Err(compilation_failed())
    });
    assert!(result.is_err());
    assert_eq!(fs::read_to_string(&file).unwrap(), "other");
    assert_eq!(wrapper.resets(), 1);
}

#[test]
fn created_file_not_removed() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("new.txt");

    non_recoverable(dir.path())
        .run_within(|tx| {
            write_text(tx, &file, "generated")?;
            Ok::<_, BuildError>(())
        })
        .unwrap();
    assert_eq!(fs::read_to_string(&file).unwrap(), "generated");
}

#[test]
fn deleted_file_not_recreated() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("a.txt");
    fs::write(&file, "something").unwrap();

    non_recoverable(dir.path())
        .run_within(|tx| {
            tx.delete_file(&file)?;
            Ok::<_, BuildError>(())
        })
        .unwrap();
    assert!(!file.exists());
}

#[test]
fn successful_run_keeps_everything() {
    let dir = tempfile::tempdir().unwrap();
    let kept = dir.path().join("kept.txt");
    let gone = dir.path().join("gone.txt");
    fs::write(&gone, "stale").unwrap();

    non_recoverable(dir.path())
        .run_within(|tx| {
            write_text(tx, &kept, "fresh")?;
            tx.delete_file(&gone)?;
            tx.mark_as_successful();
            Ok::<_, BuildError>(())
        })
        .unwrap();
    assert_eq!(fs::read_to_string(&kept).unwrap(), "fresh");
    assert!(!gone.exists());
}
