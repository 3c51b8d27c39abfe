//! Property: any sequence of output operations, rolled back, restores every
//! touched path to its state before the transaction.

mod common;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use common::{recoverable, BuildError};
use ictx_transaction::{write_bytes, CompilationTransaction};
use proptest::prelude::*;

const PATHS: [&str; 4] = ["a.class", "b.class", "nested/c.class", "nested/deeper/d.class"];

#[derive(Debug, Clone)]
enum Op {
    Register(usize),
    Write(usize, Vec<u8>),
    Delete(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..PATHS.len()).prop_map(Op::Register),
        (0..PATHS.len(), proptest::collection::vec(any::<u8>(), 0..32))
            .prop_map(|(i, bytes)| Op::Write(i, bytes)),
        (0..PATHS.len()).prop_map(Op::Delete),
    ]
}

fn snapshot(root: &Path) -> BTreeMap<&'static str, Option<Vec<u8>>> {
    PATHS
        .iter()
        .map(|p| (*p, fs::read(root.join(p)).ok()))
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn rollback_restores_initial_state(
        initial in proptest::collection::vec(proptest::option::of(proptest::collection::vec(any::<u8>(), 0..32)), PATHS.len()),
        ops in proptest::collection::vec(op(), 0..16),
        mark in any::<bool>(),
    ) {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        for (path, content) in PATHS.iter().zip(&initial) {
            if let Some(bytes) = content {
                let file = out.join(path);
                fs::create_dir_all(file.parent().unwrap()).unwrap();
                fs::write(&file, bytes).unwrap();
            }
        }
        let before = snapshot(&out);

        let result = recoverable(dir.path()).run_within(|tx| -> Result<(), BuildError> {
            for op in &ops {
                match op {
                    Op::Register(i) => tx.register_added_or_changed_file(&out.join(PATHS[*i]))?,
                    Op::Write(i, bytes) => write_bytes(tx, &out.join(PATHS[*i]), bytes)?,
                    Op::Delete(i) => tx.delete_file(&out.join(PATHS[*i]))?,
                }
            }
            if mark {
                tx.mark_as_successful();
            }
            Err(BuildError::Compilation)
        });

        prop_assert!(result.is_err());
        prop_assert_eq!(snapshot(&out), before);
    }
}
