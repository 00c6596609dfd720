//! Operator page discovery
//!
//! The reference manual keeps one reStructuredText page per operator under
//! `source/reference/operator/aggregation/` (stages and expressions) and
//! `source/reference/operator/query/` (filters). Pages declare what they
//! document with a directive such as `.. pipeline:: $match` or
//! `.. expression:: $firstN`, which decides the kind of an aggregation page.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Instant;

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

/// Directories never descended into
const EXCLUDED_DIRS: &[&str] = &[".git", "node_modules", "build"];

static KIND_DIRECTIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\.\.\s+(pipeline|expression|group|query)::\s*\$").unwrap()
});

static OPERATOR_STEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9]*$").unwrap());

/// Which family of builders an operator belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocKind {
    /// Aggregation expressions and accumulators
    Expressions,
    /// Aggregation pipeline stages
    Stages,
    /// Query filter operators
    Filters,
}

impl DocKind {
    pub const ALL: [DocKind; 3] = [DocKind::Expressions, DocKind::Stages, DocKind::Filters];

    /// Name used for fixture directories and on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            DocKind::Expressions => "expressions",
            DocKind::Stages => "stages",
            DocKind::Filters => "filters",
        }
    }
}

impl fmt::Display for DocKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        DocKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown operator kind '{}' (expected expressions, stages or filters)", s))
    }
}

/// One operator reference page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorDoc {
    /// Operator name including the `$`
    pub name: String,
    pub kind: DocKind,
    pub path: PathBuf,
}

impl OperatorDoc {
    /// Operator name without the `$`, as used for fixture directories
    pub fn bare_name(&self) -> &str {
        self.name.trim_start_matches('$')
    }

    pub fn read(&self) -> Result<String> {
        std::fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))
    }
}

/// Finds every page of `kind` below `root`, sorted by operator name
///
/// `root` may be the docs checkout or any directory inside it that still
/// contains the `aggregation` or `query` directories.
pub fn discover(root: &Path, kind: DocKind) -> Result<Vec<OperatorDoc>> {
    let start = Instant::now();
    let mut docs = Vec::new();
    let mut scanned = 0usize;

    let walker = WalkDir::new(root).follow_links(false).into_iter().filter_entry(|entry| {
        !(entry.file_type().is_dir() && entry.depth() > 0 && is_excluded(entry.file_name().to_string_lossy().as_ref()))
    });

    for entry in walker {
        let entry = entry.with_context(|| format!("failed to walk {}", root.display()))?;
        scanned += 1;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let Some(stem) = operator_stem(path) else {
            continue;
        };
        let parent = path
            .parent()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let found = match parent.as_str() {
            "query" => DocKind::Filters,
            "aggregation" => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                aggregation_kind(&text)
            }
            _ => continue,
        };
        if found == kind {
            docs.push(OperatorDoc {
                name: format!("${}", stem),
                kind,
                path: path.to_path_buf(),
            });
        }
    }

    docs.sort_by(|a, b| a.name.cmp(&b.name));
    tracing::debug!(
        "Discovered {} {} pages ({} entries scanned) in {}ms",
        docs.len(),
        kind,
        scanned,
        start.elapsed().as_millis()
    );
    Ok(docs)
}

/// [`discover`] for several kinds at once
pub fn discover_kinds(root: &Path, kinds: &[DocKind]) -> Result<Vec<OperatorDoc>> {
    let mut docs = Vec::new();
    for kind in kinds {
        docs.extend(discover(root, *kind)?);
    }
    Ok(docs)
}

fn is_excluded(name: &str) -> bool {
    name.starts_with('.') || EXCLUDED_DIRS.contains(&name)
}

/// File stem of an operator page; `None` for index pages and fragments
fn operator_stem(path: &Path) -> Option<&str> {
    if path.extension().and_then(|e| e.to_str()) != Some("txt") {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    if stem == "index" || stem.starts_with('_') || !OPERATOR_STEM.is_match(stem) {
        return None;
    }
    Some(stem)
}

fn aggregation_kind(text: &str) -> DocKind {
    match KIND_DIRECTIVE.captures(text).and_then(|c| c.get(1)) {
        Some(m) if m.as_str() == "pipeline" => DocKind::Stages,
        Some(m) if m.as_str() == "query" => DocKind::Filters,
        _ => DocKind::Expressions,
    }
}
