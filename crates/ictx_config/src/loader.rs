//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::IctxConfig;
use std::path::Path;

/// Name of the configuration file looked up in a project directory.
pub const CONFIG_FILE: &str = "ictx.toml";

/// Loads and validates `ictx.toml` from a project directory.
pub fn load_config(project_dir: &Path) -> Result<IctxConfig, ConfigError> {
    let config_path = project_dir.join(CONFIG_FILE);
    let content = std::fs::read_to_string(&config_path)?;
    load_config_from_str(&content)
}

/// Like [`load_config`], but a missing file yields the default configuration.
pub fn load_config_or_default(project_dir: &Path) -> Result<IctxConfig, ConfigError> {
    match load_config(project_dir) {
        Err(ConfigError::IoError(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            Ok(IctxConfig::default())
        }
        other => other,
    }
}

/// Parses and validates an `ictx.toml` configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<IctxConfig, ConfigError> {
    let config: IctxConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Validates values serde cannot check on its own.
fn validate_config(config: &IctxConfig) -> Result<(), ConfigError> {
    let prefix = &config.transaction.stash_prefix;
    if prefix.is_empty() {
        return Err(ConfigError::ValidationError(
            "transaction.stash_prefix must not be empty".to_string(),
        ));
    }
    if prefix.contains(['/', '\\']) {
        return Err(ConfigError::ValidationError(format!(
            "transaction.stash_prefix '{prefix}' must not contain path separators"
        )));
    }
    if let Some(root) = &config.transaction.stash_root {
        if root.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "transaction.stash_root must not be empty".to_string(),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TransactionMode, DEFAULT_STASH_PREFIX};
    use ictx_report::ReportLevel;
    use std::path::PathBuf;

    #[test]
    fn parse_empty_config() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.transaction.mode, TransactionMode::NonRecoverable);
        assert_eq!(config.transaction.stash_prefix, DEFAULT_STASH_PREFIX);
        assert!(config.transaction.stash_root.is_none());
        assert!(!config.transaction.verify_backups);
        assert!(!config.caches.keep_in_memory);
        assert_eq!(config.report.level, ReportLevel::Info);
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
[transaction]
mode = "recoverable"
stash_root = "build/stash"
stash_prefix = "build-backups"
verify_backups = true

[caches]
keep_in_memory = true

[report]
level = "debug"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.transaction.mode, TransactionMode::Recoverable);
        assert_eq!(
            config.transaction.stash_root,
            Some(PathBuf::from("build/stash"))
        );
        assert_eq!(config.transaction.stash_prefix, "build-backups");
        assert!(config.transaction.verify_backups);
        assert!(config.caches.keep_in_memory);
        assert_eq!(config.report.level, ReportLevel::Debug);
    }

    #[test]
    fn unknown_mode_errors() {
        let toml = r#"
[transaction]
mode = "sometimes"
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn empty_prefix_errors() {
        let toml = r#"
[transaction]
stash_prefix = ""
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn prefix_with_separator_errors() {
        let toml = r#"
[transaction]
stash_prefix = "../escape"
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(err.to_string().contains("path separators"));
    }

    #[test]
    fn invalid_toml_errors() {
        let err = load_config_from_str("this is not valid toml {{{}}}").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn load_from_project_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "[transaction]\nmode = \"recoverable\"\n",
        )
        .unwrap();
        let config = load_config(dir.path()).unwrap();
        assert_eq!(config.transaction.mode, TransactionMode::Recoverable);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_config(Path::new("/nonexistent/dir")).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }

    #[test]
    fn missing_file_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_or_default(dir.path()).unwrap();
        assert_eq!(config.transaction.mode, TransactionMode::NonRecoverable);
    }

    #[test]
    fn present_but_invalid_file_still_errors() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "[transaction]\nstash_prefix = \"\"\n")
            .unwrap();
        assert!(load_config_or_default(dir.path()).is_err());
    }
}
