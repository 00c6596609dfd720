//! Audit configuration (`audit.toml`)

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::docs::DocKind;

/// Defaults for the audit commands, all overridable on the command line
///
/// ```toml
/// docs_root = "../docs"
/// output_root = "crates/tessera-mongodb/tests/fixtures"
/// kinds = ["expressions", "stages"]
/// ignored_operators = ["$accumulator", "$function"]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Checkout of the reference manual sources
    pub docs_root: PathBuf,
    /// Where fixture directories are written
    pub output_root: PathBuf,
    /// Operator kinds to scan
    pub kinds: Vec<DocKind>,
    /// Operators left out of extraction and coverage
    pub ignored_operators: Vec<String>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            docs_root: PathBuf::from("docs"),
            output_root: PathBuf::from("crates/tessera-mongodb/tests/fixtures"),
            kinds: vec![DocKind::Expressions, DocKind::Stages],
            ignored_operators: Vec::new(),
        }
    }
}

impl AuditConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).context("invalid audit configuration")
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("in {}", path.display()))
    }

    /// Whether `operator` (with or without `$`) is on the ignore list
    pub fn is_ignored(&self, operator: &str) -> bool {
        let bare = operator.trim_start_matches('$');
        self.ignored_operators
            .iter()
            .any(|ignored| ignored.trim_start_matches('$') == bare)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_fill_missing_keys() {
        let config = AuditConfig::from_toml_str("docs_root = \"/srv/docs\"").unwrap();
        assert_eq!(config.docs_root, PathBuf::from("/srv/docs"));
        assert_eq!(config.kinds, vec![DocKind::Expressions, DocKind::Stages]);
        assert!(config.ignored_operators.is_empty());
    }

    #[test]
    fn test_ignored_operators_match_with_or_without_dollar() {
        let config = AuditConfig::from_toml_str(
            "kinds = [\"filters\"]\nignored_operators = [\"$function\", \"accumulator\"]",
        )
        .unwrap();
        assert_eq!(config.kinds, vec![DocKind::Filters]);
        assert!(config.is_ignored("function"));
        assert!(config.is_ignored("$accumulator"));
        assert!(!config.is_ignored("$firstN"));
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        assert!(AuditConfig::from_toml_str("kinds = [\"triggers\"]").is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "output_root = \"out\"").unwrap();
        let config = AuditConfig::from_file(file.path()).unwrap();
        assert_eq!(config.output_root, PathBuf::from("out"));

        let err = AuditConfig::from_file("/nonexistent/audit.toml").unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }
}
