//! Example extraction from operator pages
//!
//! Within the "Examples" section (and everything nested under it) a page
//! shows sample data with `insertMany`/`insertOne`, runs `aggregate(...)`
//! and prints the result. Data declared in a parent section applies to the
//! subsections below it until one declares its own.

use anyhow::Result;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::docs::OperatorDoc;
use crate::rst::{self, Block, BlockKind, Section};
use crate::shell;

/// Code languages that hold shell syntax
const SHELL_LANGUAGES: &[&str] = &["javascript", "js", "json", "shell", "sh", "none"];

/// One worked example: documents inserted, pipeline run, documents returned
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Example {
    pub title: String,
    pub data: Vec<Value>,
    /// The pipeline passed to `aggregate`
    pub action: Value,
    pub expected: Vec<Value>,
}

/// Reads `doc` and extracts its examples
pub fn extract(doc: &OperatorDoc) -> Result<Vec<Example>> {
    let text = doc.read()?;
    let examples = extract_from(&rst::parse(&text), &doc.name);
    debug!("{}: {} examples", doc.name, examples.len());
    Ok(examples)
}

/// Extracts examples from parsed sections; `operator` only labels warnings
pub fn extract_from(sections: &[Section], operator: &str) -> Vec<Example> {
    let Some(start) = sections
        .iter()
        .position(|s| s.title.eq_ignore_ascii_case("examples") || s.title.eq_ignore_ascii_case("example"))
    else {
        return Vec::new();
    };
    let root_level = sections[start].level;

    let mut examples = Vec::new();
    // data in scope, keyed by the level of the section declaring it
    let mut scopes: Vec<(usize, Vec<Value>)> = Vec::new();

    for (offset, section) in sections[start..].iter().enumerate() {
        if offset > 0 && section.level <= root_level {
            break;
        }
        while scopes.last().is_some_and(|(level, _)| *level >= section.level) {
            scopes.pop();
        }

        let mut own_data: Option<Vec<Value>> = None;
        let mut pending: Option<Value> = None;

        for block in section.blocks.iter().filter(|b| is_shell(b)) {
            let inserted = inserted_documents(block, operator, &section.title);
            if !inserted.is_empty() {
                own_data.get_or_insert_with(Vec::new).extend(inserted);
            }

            let pipelines = pipelines(block, operator, &section.title);
            let has_calls = !shell::calls(&block.body, "insertMany").is_empty()
                || !shell::calls(&block.body, "insertOne").is_empty()
                || !shell::calls(&block.body, "aggregate").is_empty();

            for pipeline in pipelines {
                if let Some(action) = pending.take() {
                    examples.push(example(section, &own_data, &scopes, action, Vec::new()));
                }
                pending = Some(pipeline);
            }

            if has_calls || pending.is_none() {
                continue;
            }
            if block.kind != BlockKind::Input {
                match shell::documents(&block.body) {
                    Ok(expected) => {
                        if let Some(action) = pending.take() {
                            examples.push(example(section, &own_data, &scopes, action, expected));
                        }
                    }
                    Err(e) => warn!(
                        "{} / {}: skipping unparseable output: {}",
                        operator, section.title, e
                    ),
                }
            }
        }

        if let Some(action) = pending.take() {
            examples.push(example(section, &own_data, &scopes, action, Vec::new()));
        }
        if let Some(data) = own_data {
            scopes.push((section.level, data));
        }
    }

    examples
}

fn is_shell(block: &Block) -> bool {
    match &block.language {
        None => true,
        Some(language) => SHELL_LANGUAGES.contains(&language.to_ascii_lowercase().as_str()),
    }
}

fn example(
    section: &Section,
    own_data: &Option<Vec<Value>>,
    scopes: &[(usize, Vec<Value>)],
    action: Value,
    expected: Vec<Value>,
) -> Example {
    let data = own_data
        .as_ref()
        .or_else(|| scopes.last().map(|(_, data)| data))
        .cloned()
        .unwrap_or_default();
    Example {
        title: section.title.clone(),
        data,
        action,
        expected,
    }
}

fn inserted_documents(block: &Block, operator: &str, title: &str) -> Vec<Value> {
    let mut documents = Vec::new();
    for (method, many) in [("insertMany", true), ("insertOne", false)] {
        for args in shell::calls(&block.body, method) {
            match shell::to_json_list(args).map(|values| values.into_iter().next()) {
                Ok(Some(Value::Array(items))) if many => documents.extend(items),
                Ok(Some(value @ Value::Object(_))) if !many => documents.push(value),
                Ok(other) => warn!(
                    "{} / {}: {} called with unexpected argument {:?}",
                    operator, title, method, other
                ),
                Err(e) => warn!("{} / {}: skipping unparseable {}: {}", operator, title, method, e),
            }
        }
    }
    documents
}

fn pipelines(block: &Block, operator: &str, title: &str) -> Vec<Value> {
    let mut found = Vec::new();
    for args in shell::calls(&block.body, "aggregate") {
        match shell::to_json_list(args).map(|values| values.into_iter().next()) {
            Ok(Some(pipeline @ Value::Array(_))) => found.push(pipeline),
            Ok(Some(stage @ Value::Object(_))) => found.push(Value::Array(vec![stage])),
            Ok(other) => warn!(
                "{} / {}: aggregate called with unexpected argument {:?}",
                operator, title, other
            ),
            Err(e) => warn!("{} / {}: skipping unparseable pipeline: {}", operator, title, e),
        }
    }
    found
}
