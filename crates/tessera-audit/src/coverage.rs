//! Documented operators compared with the builders that exist

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tessera_mongodb::aggregation::expressions::EXPRESSION_OPERATORS;
use tessera_mongodb::aggregation::stages::STAGE_OPERATORS;
use tessera_mongodb::validation::QUERY_OPERATORS;

use crate::docs::{DocKind, OperatorDoc};

/// Report output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Plain text for terminals
    #[default]
    Text,
    /// JSON (machine-parseable)
    Json,
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportFormat::Text => write!(f, "text"),
            ReportFormat::Json => write!(f, "json"),
        }
    }
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(ReportFormat::Text),
            "json" => Ok(ReportFormat::Json),
            other => Err(format!("unknown report format '{}' (expected text or json)", other)),
        }
    }
}

/// Operators with a builder, per kind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Implemented {
    pub expressions: BTreeSet<String>,
    pub stages: BTreeSet<String>,
    pub filters: BTreeSet<String>,
}

impl Implemented {
    /// The operators the `tessera-mongodb` builders emit
    pub fn builtin() -> Self {
        let set = |ops: &[&str]| -> BTreeSet<String> { ops.iter().map(|s| s.to_string()).collect() };
        Self {
            expressions: set(EXPRESSION_OPERATORS),
            stages: set(STAGE_OPERATORS),
            filters: set(QUERY_OPERATORS),
        }
    }

    pub fn for_kind(&self, kind: DocKind) -> &BTreeSet<String> {
        match kind {
            DocKind::Expressions => &self.expressions,
            DocKind::Stages => &self.stages,
            DocKind::Filters => &self.filters,
        }
    }
}

/// Coverage of one operator kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KindCoverage {
    pub kind: DocKind,
    pub documented: usize,
    pub implemented: usize,
    /// Documented but without a builder
    pub missing: Vec<String>,
    /// Built but without a reference page
    pub undocumented: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoverageReport {
    pub kinds: Vec<KindCoverage>,
}

impl CoverageReport {
    pub fn missing_count(&self) -> usize {
        self.kinds.iter().map(|k| k.missing.len()).sum()
    }

    pub fn has_missing(&self) -> bool {
        self.missing_count() > 0
    }

    pub fn render(&self, format: ReportFormat) -> serde_json::Result<String> {
        match format {
            ReportFormat::Text => Ok(self.to_string()),
            ReportFormat::Json => serde_json::to_string_pretty(self),
        }
    }
}

impl fmt::Display for CoverageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for coverage in &self.kinds {
            writeln!(
                f,
                "{}: {} documented, {} implemented",
                coverage.kind, coverage.documented, coverage.implemented
            )?;
            if !coverage.missing.is_empty() {
                writeln!(f, "  missing ({}): {}", coverage.missing.len(), coverage.missing.join(", "))?;
            }
            if !coverage.undocumented.is_empty() {
                writeln!(
                    f,
                    "  undocumented ({}): {}",
                    coverage.undocumented.len(),
                    coverage.undocumented.join(", ")
                )?;
            }
        }
        Ok(())
    }
}

/// Compares `docs` with `implemented`, for each kind present in `docs`
pub fn audit(docs: &[OperatorDoc], implemented: &Implemented) -> CoverageReport {
    let kinds = DocKind::ALL
        .into_iter()
        .filter(|kind| docs.iter().any(|d| d.kind == *kind))
        .map(|kind| {
            let documented: BTreeSet<&str> = docs
                .iter()
                .filter(|d| d.kind == kind)
                .map(|d| d.name.as_str())
                .collect();
            let built = implemented.for_kind(kind);
            KindCoverage {
                kind,
                documented: documented.len(),
                implemented: built.len(),
                missing: documented
                    .iter()
                    .filter(|name| !built.contains(**name))
                    .map(|name| name.to_string())
                    .collect(),
                undocumented: built
                    .iter()
                    .filter(|name| !documented.contains(name.as_str()))
                    .cloned()
                    .collect(),
            }
        })
        .collect();
    CoverageReport { kinds }
}
