//! Input validation for collection names, field names and queries
//!
//! # Checks
//! - Collection names: not empty, length limit, no null bytes, no `system.`
//!   prefix, no `$`
//! - Field names: not empty, length limit, no null bytes, `$` only for known
//!   operators
//! - Queries and pipelines: JavaScript operators (`$where`, `$function`,
//!   `$accumulator`) rejected unless explicitly allowed

use bson::{Bson, Document as BsonDocument};
use tessera_common::TesseraError;
use tracing::warn;

use crate::aggregation::expressions::EXPRESSION_OPERATORS;
use crate::aggregation::stages::STAGE_OPERATORS;
use crate::Result;

/// Maximum allowed length for collection names (MongoDB limit is 255, we're more conservative)
const MAX_COLLECTION_NAME_LENGTH: usize = 120;

/// Maximum allowed length for field names
const MAX_FIELD_NAME_LENGTH: usize = 1024;

/// Operators that run server-side JavaScript
pub const JAVASCRIPT_OPERATORS: &[&str] = &["$where", "$function", "$accumulator"];

/// Query operators the filter builders can produce
pub const QUERY_OPERATORS: &[&str] = &[
    "$all", "$and", "$bitsAllClear", "$bitsAllSet", "$bitsAnyClear", "$bitsAnySet",
    "$comment", "$elemMatch", "$eq", "$exists", "$expr", "$gt", "$gte", "$in",
    "$jsonSchema", "$lt", "$lte", "$mod", "$ne", "$nin", "$nor", "$not", "$options",
    "$or", "$regex", "$size", "$text", "$type", "$where",
];

/// Update operators and their modifiers
pub const UPDATE_OPERATORS: &[&str] = &[
    "$addToSet", "$bit", "$currentDate", "$each", "$inc", "$max", "$min", "$mul",
    "$pop", "$position", "$pull", "$pullAll", "$push", "$rename", "$set",
    "$setOnInsert", "$slice", "$sort", "$unset",
];

/// Validated collection name
///
/// # Guarantees
/// - Not empty
/// - Maximum 120 characters
/// - No null bytes
/// - No "system." prefix (system collections)
/// - No $ characters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedCollectionName {
    name: String,
}

impl ValidatedCollectionName {
    /// Creates a new validated collection name
    ///
    /// # Errors
    /// Returns [`TesseraError::Validation`] if any check fails.
    pub fn new(name: &str) -> Result<Self> {
        if name.is_empty() {
            return Err(TesseraError::Validation(
                "Collection name cannot be empty".to_string(),
            ));
        }

        if name.len() > MAX_COLLECTION_NAME_LENGTH {
            return Err(TesseraError::Validation(format!(
                "Collection name exceeds maximum length of {} characters: '{}'",
                MAX_COLLECTION_NAME_LENGTH, name
            )));
        }

        if name.contains('\0') {
            return Err(TesseraError::Validation(
                "Collection name cannot contain null bytes".to_string(),
            ));
        }

        if name.starts_with("system.") {
            return Err(TesseraError::Validation(format!(
                "Collection name cannot start with 'system.' (reserved): '{}'",
                name
            )));
        }

        if name.contains('$') {
            return Err(TesseraError::Validation(format!(
                "Collection name cannot contain '$' character: '{}'",
                name
            )));
        }

        if name.contains("..") {
            warn!(collection = name, "Collection name contains an empty segment");
        }

        Ok(ValidatedCollectionName {
            name: name.to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.name
    }

    pub fn into_string(self) -> String {
        self.name
    }
}

impl AsRef<str> for ValidatedCollectionName {
    fn as_ref(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Display for ValidatedCollectionName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Validated field name
///
/// # Guarantees
/// - Not empty
/// - Maximum 1024 characters
/// - No null bytes
/// - No $ prefix unless operators are allowed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedFieldName {
    name: String,
}

impl ValidatedFieldName {
    /// Creates a new validated field name
    ///
    /// # Arguments
    /// * `name` - The field name to validate
    /// * `allow_operators` - accept `$`-prefixed names; unknown operators are
    ///   logged but accepted
    pub fn new(name: &str, allow_operators: bool) -> Result<Self> {
        if name.is_empty() {
            return Err(TesseraError::Validation(
                "Field name cannot be empty".to_string(),
            ));
        }

        if name.len() > MAX_FIELD_NAME_LENGTH {
            return Err(TesseraError::Validation(format!(
                "Field name exceeds maximum length of {} characters",
                MAX_FIELD_NAME_LENGTH
            )));
        }

        if name.contains('\0') {
            return Err(TesseraError::Validation(
                "Field name cannot contain null bytes".to_string(),
            ));
        }

        if name.starts_with('$') {
            if !allow_operators {
                return Err(TesseraError::Validation(format!(
                    "Field name cannot start with '$' (reserved for operators): '{}'",
                    name
                )));
            }
            if !is_known_operator(name) {
                warn!(operator = name, "Unknown MongoDB operator");
            }
        }

        Ok(ValidatedFieldName {
            name: name.to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.name
    }

    pub fn into_string(self) -> String {
        self.name
    }
}

impl AsRef<str> for ValidatedFieldName {
    fn as_ref(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Display for ValidatedFieldName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Whether `name` is an operator any builder in this crate can emit
pub fn is_known_operator(name: &str) -> bool {
    QUERY_OPERATORS.contains(&name)
        || UPDATE_OPERATORS.contains(&name)
        || STAGE_OPERATORS.contains(&name)
        || EXPRESSION_OPERATORS.binary_search(&name).is_ok()
}

/// Validates a query document or value for JavaScript operators
///
/// # Errors
/// Returns [`TesseraError::Validation`] naming the first JavaScript operator
/// found at any depth, unless `allow_javascript` is set.
pub fn validate_query(query: &Bson, allow_javascript: bool) -> Result<()> {
    if allow_javascript {
        return Ok(());
    }
    check_javascript(query)
}

/// [`validate_query`] over every stage of a pipeline
pub fn validate_pipeline(pipeline: &[BsonDocument], allow_javascript: bool) -> Result<()> {
    if allow_javascript {
        return Ok(());
    }
    pipeline
        .iter()
        .try_for_each(|stage| check_javascript(&Bson::Document(stage.clone())))
}

fn check_javascript(value: &Bson) -> Result<()> {
    match value {
        Bson::Document(doc) => {
            for (key, value) in doc.iter() {
                if JAVASCRIPT_OPERATORS.contains(&key.as_str()) {
                    return Err(TesseraError::Validation(format!(
                        "JavaScript operator '{}' is not allowed; enable allow_javascript to use it",
                        key
                    )));
                }
                check_javascript(value)?;
            }
            Ok(())
        }
        Bson::Array(arr) => arr.iter().try_for_each(check_javascript),
        _ => Ok(()),
    }
}
