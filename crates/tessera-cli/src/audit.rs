//! `tess audit` commands

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tessera_audit::{coverage, docs, examples, fixtures, AuditConfig, CoverageReport, DocKind, Implemented, OperatorDoc, WriteOutcome};
use tracing::info;

pub struct ExamplesOptions {
    pub docs: PathBuf,
    pub output: PathBuf,
    pub operator: Option<String>,
    pub kinds: Vec<DocKind>,
    pub force: bool,
}

/// Totals printed after `tess audit examples`
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ExamplesSummary {
    pub operators: usize,
    pub written: usize,
    pub unchanged: usize,
    pub locked: usize,
}

impl fmt::Display for ExamplesSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} operators: {} written, {} unchanged, {} locked",
            self.operators, self.written, self.unchanged, self.locked
        )
    }
}

pub fn run_examples(options: &ExamplesOptions, config: &AuditConfig) -> Result<ExamplesSummary> {
    let wanted = options.operator.as_deref().map(|op| op.trim_start_matches('$'));
    let pages: Vec<OperatorDoc> = operator_pages(&options.docs, &options.kinds, config)?
        .into_iter()
        .filter(|doc| wanted.map_or(true, |op| doc.bare_name() == op))
        .collect();

    if let Some(op) = wanted {
        if pages.is_empty() {
            bail!("no reference page for ${} under {}", op, options.docs.display());
        }
    }

    let mut summary = ExamplesSummary::default();
    for doc in &pages {
        let found = examples::extract(doc)?;
        if found.is_empty() {
            continue;
        }
        summary.operators += 1;
        for (_, outcome) in fixtures::write(&options.output, doc, &found, options.force)? {
            match outcome {
                WriteOutcome::Written => summary.written += 1,
                WriteOutcome::Unchanged => summary.unchanged += 1,
                WriteOutcome::Locked => summary.locked += 1,
            }
        }
    }
    info!("Scanned {} pages under {}", pages.len(), options.docs.display());
    Ok(summary)
}

pub fn run_coverage(docs_root: &Path, config: &AuditConfig) -> Result<CoverageReport> {
    let pages = operator_pages(docs_root, &config.kinds, config)?;
    Ok(coverage::audit(&pages, &Implemented::builtin()))
}

fn operator_pages(root: &Path, kinds: &[DocKind], config: &AuditConfig) -> Result<Vec<OperatorDoc>> {
    if !root.is_dir() {
        bail!("docs root {} is not a directory", root.display());
    }
    let pages = docs::discover_kinds(root, kinds)
        .with_context(|| format!("failed to scan {}", root.display()))?;
    Ok(pages.into_iter().filter(|doc| !config.is_ignored(&doc.name)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const PAGE: &str = "\
.. expression:: $size

Examples
--------

.. code-block:: javascript

   db.inventory.insertOne( { item: 'a', tags: [ 'x', 'y' ] } )
   db.inventory.aggregate( [ { $project: { n: { $size: '$tags' } } } ] )

.. code-block:: javascript
   :copyable: false

   { _id: 1, n: 2 }
";

    fn docs_tree() -> TempDir {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("source/reference/operator/aggregation");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("size.txt"), PAGE).unwrap();
        fs::write(dir.join("median.txt"), ".. group:: $median\n").unwrap();
        tmp
    }

    fn options(docs: &Path, output: &Path) -> ExamplesOptions {
        ExamplesOptions {
            docs: docs.to_path_buf(),
            output: output.to_path_buf(),
            operator: None,
            kinds: vec![DocKind::Expressions],
            force: false,
        }
    }

    #[test]
    fn test_examples_command() {
        let docs = docs_tree();
        let out = TempDir::new().unwrap();
        let summary = run_examples(&options(docs.path(), out.path()), &AuditConfig::default()).unwrap();
        assert_eq!(
            summary,
            ExamplesSummary {
                operators: 1,
                written: 1,
                unchanged: 0,
                locked: 0
            }
        );
        assert!(out.path().join("expressions/size/example1/action.json").exists());
        assert_eq!(summary.to_string(), "1 operators: 1 written, 0 unchanged, 0 locked");
    }

    #[test]
    fn test_operator_filter() {
        let docs = docs_tree();
        let out = TempDir::new().unwrap();
        let mut opts = options(docs.path(), out.path());
        opts.operator = Some("$median".to_string());
        let summary = run_examples(&opts, &AuditConfig::default()).unwrap();
        assert_eq!(summary.operators, 0);

        opts.operator = Some("unknown".to_string());
        assert!(run_examples(&opts, &AuditConfig::default()).is_err());
    }

    #[test]
    fn test_coverage_respects_ignored_operators() {
        let docs = docs_tree();
        let report = run_coverage(docs.path(), &AuditConfig::default()).unwrap();
        assert_eq!(report.kinds[0].documented, 2);

        let config = AuditConfig {
            ignored_operators: vec!["median".to_string()],
            ..AuditConfig::default()
        };
        let report = run_coverage(docs.path(), &config).unwrap();
        assert_eq!(report.kinds[0].documented, 1);
        assert!(report.kinds[0].missing.iter().all(|op| op != "$median"));
    }

    #[test]
    fn test_missing_docs_root() {
        assert!(run_coverage(Path::new("/nonexistent/docs"), &AuditConfig::default()).is_err());
    }
}
