//! Report levels ordered from least to most severe.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The level of a build report message.
///
/// Ordered from least severe (`Debug`) to most severe (`Error`), matching the
/// derived `PartialOrd`/`Ord` implementation based on declaration order.
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ReportLevel {
    /// Step-by-step detail such as individual stash operations.
    Debug,
    /// Normal progress, e.g. a transaction committing.
    #[default]
    Info,
    /// Something unexpected that does not fail the build by itself.
    Warning,
    /// A failure the caller will also see as an error value.
    Error,
}

impl ReportLevel {
    /// Returns `true` if this level is [`Error`](ReportLevel::Error).
    pub fn is_error(self) -> bool {
        self == ReportLevel::Error
    }
}

impl fmt::Display for ReportLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportLevel::Debug => write!(f, "debug"),
            ReportLevel::Info => write!(f, "info"),
            ReportLevel::Warning => write!(f, "warning"),
            ReportLevel::Error => write!(f, "error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering() {
        assert!(ReportLevel::Debug < ReportLevel::Info);
        assert!(ReportLevel::Info < ReportLevel::Warning);
        assert!(ReportLevel::Warning < ReportLevel::Error);
    }

    #[test]
    fn display_matches_serde_names() {
        for level in [
            ReportLevel::Debug,
            ReportLevel::Info,
            ReportLevel::Warning,
            ReportLevel::Error,
        ] {
            let json = serde_json::to_string(&level).unwrap();
            assert_eq!(json, format!("\"{level}\""));
        }
    }

    #[test]
    fn default_is_info() {
        assert_eq!(ReportLevel::default(), ReportLevel::Info);
        assert!(!ReportLevel::default().is_error());
    }
}
