//! Fixture directories
//!
//! Layout: `<out>/<kind>/<operator>/exampleN/{data,action,expected}.json`
//! plus a `name` file with the example title. The operator directory drops
//! the leading `$`. A `lock` file in an example directory marks it as hand
//! edited; it is never touched again.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::docs::OperatorDoc;
use crate::examples::Example;

pub const LOCK_FILE: &str = "lock";

/// What happened to one example directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteOutcome {
    Written,
    /// The directory holds a `lock` file
    Locked,
    /// Already on disk with the same content, or present and `overwrite` is off
    Unchanged,
}

/// `<out>/<kind>/<operator>/example<index>`, `index` starting at 1
pub fn example_dir(out_root: &Path, doc: &OperatorDoc, index: usize) -> PathBuf {
    out_root
        .join(doc.kind.as_str())
        .join(doc.bare_name())
        .join(format!("example{}", index))
}

/// Writes one directory per example, numbered in page order
pub fn write(
    out_root: &Path,
    doc: &OperatorDoc,
    examples: &[Example],
    overwrite: bool,
) -> Result<Vec<(PathBuf, WriteOutcome)>> {
    let mut outcomes = Vec::with_capacity(examples.len());
    for (i, example) in examples.iter().enumerate() {
        let dir = example_dir(out_root, doc, i + 1);
        let outcome = write_example(&dir, example, overwrite)
            .with_context(|| format!("failed to write {}", dir.display()))?;
        match outcome {
            WriteOutcome::Written => info!("Wrote {}", dir.display()),
            other => debug!("{}: {:?}", dir.display(), other),
        }
        outcomes.push((dir, outcome));
    }
    Ok(outcomes)
}

fn write_example(dir: &Path, example: &Example, overwrite: bool) -> Result<WriteOutcome> {
    if dir.join(LOCK_FILE).exists() {
        return Ok(WriteOutcome::Locked);
    }

    let files = [
        ("data.json", to_json(&example.data)?),
        ("action.json", to_json(&example.action)?),
        ("expected.json", to_json(&example.expected)?),
        ("name", example.title.clone()),
    ];

    if dir.exists() {
        let same = files
            .iter()
            .all(|(file, content)| fs::read_to_string(dir.join(file)).is_ok_and(|on_disk| on_disk == *content));
        if same || !overwrite {
            return Ok(WriteOutcome::Unchanged);
        }
    }

    fs::create_dir_all(dir)?;
    for (file, content) in &files {
        fs::write(dir.join(file), content)?;
    }
    Ok(WriteOutcome::Written)
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let mut text = serde_json::to_string_pretty(value)?;
    text.push('\n');
    Ok(text)
}

/// Reads back the pipeline of an existing fixture
pub fn read_action(dir: &Path) -> Result<Value> {
    let path = dir.join("action.json");
    let text = fs::read_to_string(&path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid JSON in {}", path.display()))
}
