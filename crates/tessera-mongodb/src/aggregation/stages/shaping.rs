//! Stages that reshape documents

use bson::{Bson, Document as BsonDocument};
use tessera_common::TesseraError;

use super::Stage;
use crate::aggregation::expressions::{DocumentExpression, Expression};
use crate::encode::EncodeContext;
use crate::mapping::ID_FIELD;
use crate::Result;

/// `$addFields`
pub fn add_fields() -> AddFields {
    AddFields {
        name: "$addFields",
        fields: DocumentExpression::new(),
    }
}

/// `$set`, the alias of `$addFields`
pub fn set() -> AddFields {
    AddFields {
        name: "$set",
        fields: DocumentExpression::new(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AddFields {
    name: &'static str,
    fields: DocumentExpression,
}

impl AddFields {
    pub fn field(mut self, name: impl Into<String>, value: impl Into<Expression>) -> Self {
        self.fields = self.fields.field(name, value);
        self
    }
}

impl Stage for AddFields {
    fn name(&self) -> &'static str {
        self.name
    }

    fn encode_body(&self, ctx: &EncodeContext<'_>) -> Result<Bson> {
        Ok(Bson::Document(self.fields.encode(ctx)))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Projection {
    Include,
    Exclude,
    Computed(Expression),
}

/// `$project`
pub fn project() -> Project {
    Project {
        fields: Vec::new(),
        suppress_id: false,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    fields: Vec<(String, Projection)>,
    suppress_id: bool,
}

impl Project {
    pub fn include(mut self, field: impl Into<String>) -> Self {
        self.fields.push((field.into(), Projection::Include));
        self
    }

    /// A computed output field
    pub fn include_as(mut self, field: impl Into<String>, value: impl Into<Expression>) -> Self {
        self.fields.push((field.into(), Projection::Computed(value.into())));
        self
    }

    pub fn exclude(mut self, field: impl Into<String>) -> Self {
        self.fields.push((field.into(), Projection::Exclude));
        self
    }

    /// Drop `_id` from the output
    pub fn suppress_id(mut self) -> Self {
        self.suppress_id = true;
        self
    }
}

impl Stage for Project {
    fn name(&self) -> &'static str {
        "$project"
    }

    /// # Errors
    /// Excluding a field other than `_id` next to inclusions is a
    /// [`TesseraError::Query`]; the server rejects the mix.
    fn encode_body(&self, ctx: &EncodeContext<'_>) -> Result<Bson> {
        let excludes = self
            .fields
            .iter()
            .any(|(f, p)| *p == Projection::Exclude && f != ID_FIELD);
        let includes = self
            .fields
            .iter()
            .any(|(_, p)| !matches!(p, Projection::Exclude));
        if excludes && includes {
            return Err(TesseraError::Query(
                "$project cannot mix inclusions and exclusions".to_string(),
            ));
        }

        let lenient = ctx.lenient();
        let mut body = BsonDocument::new();
        if self.suppress_id {
            body.insert(ID_FIELD, 0);
        }
        for (field, projection) in &self.fields {
            let path = lenient.path(field)?;
            let value = match projection {
                Projection::Include => Bson::Int32(1),
                Projection::Exclude => Bson::Int32(0),
                Projection::Computed(expression) => expression.encode(ctx),
            };
            body.insert(path, value);
        }
        Ok(Bson::Document(body))
    }
}

/// `$replaceRoot`
pub fn replace_root(new_root: impl Into<Expression>) -> ReplaceRoot {
    ReplaceRoot {
        new_root: new_root.into(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReplaceRoot {
    new_root: Expression,
}

impl Stage for ReplaceRoot {
    fn name(&self) -> &'static str {
        "$replaceRoot"
    }

    fn encode_body(&self, ctx: &EncodeContext<'_>) -> Result<Bson> {
        let mut body = BsonDocument::new();
        body.insert("newRoot", self.new_root.encode(ctx));
        Ok(Bson::Document(body))
    }
}

/// `$replaceWith`
pub fn replace_with(replacement: impl Into<Expression>) -> ReplaceWith {
    ReplaceWith {
        replacement: replacement.into(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReplaceWith {
    replacement: Expression,
}

impl Stage for ReplaceWith {
    fn name(&self) -> &'static str {
        "$replaceWith"
    }

    fn encode_body(&self, ctx: &EncodeContext<'_>) -> Result<Bson> {
        Ok(self.replacement.encode(ctx))
    }
}

/// `$unset`; one field is written as a string, several as an array
pub fn unset<I, S>(fields: I) -> Unset
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Unset {
        fields: fields.into_iter().map(Into::into).collect(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unset {
    fields: Vec<String>,
}

impl Stage for Unset {
    fn name(&self) -> &'static str {
        "$unset"
    }

    fn encode_body(&self, ctx: &EncodeContext<'_>) -> Result<Bson> {
        let lenient = ctx.lenient();
        let mut paths = self
            .fields
            .iter()
            .map(|f| lenient.path(f).map(Bson::String))
            .collect::<Result<Vec<_>>>()?;
        if paths.len() == 1 {
            Ok(paths.remove(0))
        } else {
            Ok(Bson::Array(paths))
        }
    }
}

/// `$unwind` of an array field
pub fn unwind(path: impl Into<String>) -> Unwind {
    Unwind {
        path: path.into(),
        include_array_index: None,
        preserve_null_and_empty_arrays: None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unwind {
    path: String,
    include_array_index: Option<String>,
    preserve_null_and_empty_arrays: Option<bool>,
}

impl Unwind {
    /// Store the element index under `name`
    pub fn include_array_index(mut self, name: impl Into<String>) -> Self {
        self.include_array_index = Some(name.into());
        self
    }

    pub fn preserve_null_and_empty_arrays(mut self, preserve: bool) -> Self {
        self.preserve_null_and_empty_arrays = Some(preserve);
        self
    }
}

impl Stage for Unwind {
    fn name(&self) -> &'static str {
        "$unwind"
    }

    fn encode_body(&self, ctx: &EncodeContext<'_>) -> Result<Bson> {
        let path = ctx.field_ref(&self.path);
        if self.include_array_index.is_none() && self.preserve_null_and_empty_arrays.is_none() {
            return Ok(Bson::String(path));
        }
        let mut body = BsonDocument::new();
        body.insert("path", path);
        if let Some(index) = &self.include_array_index {
            body.insert("includeArrayIndex", index.clone());
        }
        if let Some(preserve) = self.preserve_null_and_empty_arrays {
            body.insert("preserveNullAndEmptyArrays", preserve);
        }
        Ok(Bson::Document(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::expressions::{arithmetic, field};
    use crate::mapping::EntityModel;
    use bson::doc;

    fn ctx() -> EncodeContext<'static> {
        EncodeContext::detached()
    }

    #[test]
    fn test_add_fields_and_set() {
        let stage = add_fields().field("totalHomework", arithmetic::add(vec![field("a"), field("b")]));
        assert_eq!(
            stage.encode(&ctx()).unwrap(),
            doc! { "$addFields": { "totalHomework": { "$add": ["$a", "$b"] } } }
        );
        assert_eq!(
            set().field("quiz", 1).encode(&ctx()).unwrap(),
            doc! { "$set": { "quiz": 1 } }
        );
    }

    #[test]
    fn test_project() {
        let stage = project()
            .suppress_id()
            .include("title")
            .include_as("lastName", field("author.last"));
        assert_eq!(
            stage.encode(&ctx()).unwrap(),
            doc! { "$project": { "_id": 0, "title": 1, "lastName": "$author.last" } }
        );
    }

    #[test]
    fn test_project_rejects_mixed() {
        assert!(project().include("a").exclude("b").encode(&ctx()).is_err());
        assert!(project().include("a").exclude("_id").encode(&ctx()).is_ok());
    }

    #[test]
    fn test_project_translates_paths() {
        let model = EntityModel::builder("Book")
            .mapped_property("title", "t")
            .build();
        let ctx = EncodeContext::new(&model, true);
        assert_eq!(
            project().include("title").include("computed").encode(&ctx).unwrap(),
            doc! { "$project": { "t": 1, "computed": 1 } }
        );
    }

    #[test]
    fn test_replace_root_and_with() {
        assert_eq!(
            replace_root(field("name")).encode(&ctx()).unwrap(),
            doc! { "$replaceRoot": { "newRoot": "$name" } }
        );
        assert_eq!(
            replace_with(field("name")).encode(&ctx()).unwrap(),
            doc! { "$replaceWith": "$name" }
        );
    }

    #[test]
    fn test_unset_forms() {
        assert_eq!(unset(["copies"]).encode(&ctx()).unwrap(), doc! { "$unset": "copies" });
        assert_eq!(
            unset(["isbn", "copies"]).encode(&ctx()).unwrap(),
            doc! { "$unset": ["isbn", "copies"] }
        );
    }

    #[test]
    fn test_unwind_forms() {
        assert_eq!(unwind("sizes").encode(&ctx()).unwrap(), doc! { "$unwind": "$sizes" });
        assert_eq!(
            unwind("sizes")
                .include_array_index("arrayIndex")
                .preserve_null_and_empty_arrays(true)
                .encode(&ctx())
                .unwrap(),
            doc! {
                "$unwind": {
                    "path": "$sizes",
                    "includeArrayIndex": "arrayIndex",
                    "preserveNullAndEmptyArrays": true
                }
            }
        );
    }
}
