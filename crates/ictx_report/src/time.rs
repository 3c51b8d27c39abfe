//! Named timing phases of a transaction.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A phase of the transaction protocol whose duration is reported.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildTime {
    /// Copying or relocating a file into the stash before it is mutated.
    StashFile,
    /// Putting stashed files back during rollback.
    RestoreOutputFromBackup,
    /// Removing the stash directory once the transaction ends.
    CleanBackupStash,
    /// Discarding pending changes of the registered in-memory wrappers.
    ResetInMemoryCaches,
    /// Closing the caches manager.
    CloseCaches,
}

impl BuildTime {
    /// Human-readable name used in logs.
    pub fn name(self) -> &'static str {
        match self {
            BuildTime::StashFile => "stash file",
            BuildTime::RestoreOutputFromBackup => "restore output from backup",
            BuildTime::CleanBackupStash => "clean backup stash",
            BuildTime::ResetInMemoryCaches => "reset in-memory caches",
            BuildTime::CloseCaches => "close caches",
        }
    }
}

impl fmt::Display for BuildTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&BuildTime::RestoreOutputFromBackup).unwrap();
        assert_eq!(json, "\"restore_output_from_backup\"");
    }

    #[test]
    fn display_is_readable() {
        assert_eq!(BuildTime::CleanBackupStash.to_string(), "clean backup stash");
    }
}
