//! Entity models: the declared shape of a mapped type

use std::sync::Arc;

use tessera_common::TesseraError;

use super::{IndexDef, MapperOptions, NamingStrategy};
use crate::Result;

/// Stored name of the identifier field
pub const ID_FIELD: &str = "_id";

/// A single mapped property
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyModel {
    name: String,
    mapped_name: String,
    embedded: Option<Arc<EntityModel>>,
}

impl PropertyModel {
    /// Property name as declared on the Rust type
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Field name in the stored document
    pub fn mapped_name(&self) -> &str {
        &self.mapped_name
    }

    /// Model of the embedded type, if the property holds one
    pub fn embedded(&self) -> Option<&EntityModel> {
        self.embedded.as_deref()
    }
}

/// Mapping metadata for one entity type.
///
/// Built once per type by [`Entity::model`](super::Entity::model) and cached in
/// the [`Mapper`](super::Mapper).
#[derive(Debug, Clone, PartialEq)]
pub struct EntityModel {
    type_name: String,
    collection: Option<String>,
    properties: Vec<PropertyModel>,
    id_property: Option<String>,
    version_property: Option<String>,
    indexes: Vec<IndexDef>,
    discriminator: Option<String>,
}

impl EntityModel {
    pub fn builder(type_name: impl Into<String>) -> EntityModelBuilder {
        EntityModelBuilder {
            model: EntityModel {
                type_name: type_name.into(),
                collection: None,
                properties: Vec::new(),
                id_property: None,
                version_property: None,
                indexes: Vec::new(),
                discriminator: None,
            },
            rename_all: NamingStrategy::Identity,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Collection name: the declared one, or the type name run through the
    /// configured naming strategy
    pub fn collection_name(&self, options: &MapperOptions) -> String {
        match &self.collection {
            Some(name) => name.clone(),
            None => options.collection_naming.apply(&self.type_name),
        }
    }

    pub fn properties(&self) -> &[PropertyModel] {
        &self.properties
    }

    /// Look a property up by declared or stored name
    pub fn property(&self, name: &str) -> Option<&PropertyModel> {
        self.properties
            .iter()
            .find(|p| p.name == name)
            .or_else(|| self.properties.iter().find(|p| p.mapped_name == name))
    }

    pub fn id_property(&self) -> Option<&str> {
        self.id_property.as_deref()
    }

    /// Stored name of the version field, if the model is versioned
    pub fn version_field(&self) -> Option<&str> {
        let name = self.version_property.as_deref()?;
        self.property(name).map(|p| p.mapped_name())
    }

    pub fn indexes(&self) -> &[IndexDef] {
        &self.indexes
    }

    pub fn discriminator(&self) -> Option<&str> {
        self.discriminator.as_deref()
    }

    /// The embedded model reached by following `path`, if every segment is
    /// an embedded property
    pub fn embedded_at(&self, path: &str) -> Option<&EntityModel> {
        let mut current = self;
        for segment in path.split('.') {
            if segment.starts_with('$') || segment.chars().all(|c| c.is_ascii_digit()) {
                continue;
            }
            current = current.property(segment)?.embedded()?;
        }
        Some(current)
    }

    /// Translate a dotted property path into stored field names.
    ///
    /// Numeric segments and `$`-prefixed segments (positional operators) pass
    /// through unchanged. Once a segment resolves to a property without an
    /// embedded model, the rest of the path is passed through as-is.
    ///
    /// # Errors
    /// With `validate` set, an unknown segment is a [`TesseraError::Mapping`].
    /// Without it, the unknown segment and the remainder are kept verbatim.
    pub fn translate_path(&self, path: &str, validate: bool) -> Result<String> {
        if path == ID_FIELD {
            return Ok(ID_FIELD.to_string());
        }

        let mut translated: Vec<&str> = Vec::new();
        let mut current: Option<&EntityModel> = Some(self);

        for segment in path.split('.') {
            if segment.is_empty() {
                return Err(TesseraError::Mapping(format!(
                    "Invalid path '{}' on {}: empty segment",
                    path, self.type_name
                )));
            }

            if segment.starts_with('$') || segment.chars().all(|c| c.is_ascii_digit()) {
                translated.push(segment);
                continue;
            }

            let Some(model) = current else {
                translated.push(segment);
                continue;
            };

            if segment == ID_FIELD && std::ptr::eq(model, self) {
                translated.push(ID_FIELD);
                continue;
            }

            match model.property(segment) {
                Some(property) => {
                    translated.push(property.mapped_name());
                    current = property.embedded();
                }
                None if validate => {
                    return Err(TesseraError::Mapping(format!(
                        "Could not resolve path '{}' on {}: no property '{}' on {}",
                        path, self.type_name, segment, model.type_name
                    )));
                }
                None => {
                    translated.push(segment);
                    current = None;
                }
            }
        }

        Ok(translated.join("."))
    }
}

/// Builder for [`EntityModel`]
#[derive(Debug)]
pub struct EntityModelBuilder {
    model: EntityModel,
    rename_all: NamingStrategy,
}

impl EntityModelBuilder {
    /// Explicit collection name
    pub fn collection(mut self, name: impl Into<String>) -> Self {
        self.model.collection = Some(name.into());
        self
    }

    /// Naming applied to properties declared afterwards without an explicit
    /// stored name; mirror the type's `#[serde(rename_all = ...)]`
    pub fn rename_all(mut self, strategy: NamingStrategy) -> Self {
        self.rename_all = strategy;
        self
    }

    /// A property whose stored name follows `rename_all`
    pub fn property(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        let mapped_name = self.rename_all.apply(&name);
        self.push(name, mapped_name, None);
        self
    }

    /// A property stored under a different name (`#[serde(rename = ...)]`)
    pub fn mapped_property(mut self, name: impl Into<String>, mapped_name: impl Into<String>) -> Self {
        self.push(name.into(), mapped_name.into(), None);
        self
    }

    /// A property holding an embedded document (or array of them)
    pub fn embedded(mut self, name: impl Into<String>, model: EntityModel) -> Self {
        let name = name.into();
        let mapped_name = self.rename_all.apply(&name);
        self.push(name, mapped_name, Some(Arc::new(model)));
        self
    }

    /// The identifier property, stored as `_id`
    pub fn id(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.model.id_property = Some(name.clone());
        self.push(name, ID_FIELD.to_string(), None);
        self
    }

    /// The optimistic-locking version property
    pub fn version(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        let mapped_name = self.rename_all.apply(&name);
        self.model.version_property = Some(name.clone());
        self.push(name, mapped_name, None);
        self
    }

    pub fn index(mut self, index: IndexDef) -> Self {
        self.model.indexes.push(index);
        self
    }

    /// Store a discriminator value with every document of this type
    pub fn discriminator(mut self, value: impl Into<String>) -> Self {
        self.model.discriminator = Some(value.into());
        self
    }

    pub fn build(self) -> EntityModel {
        self.model
    }

    fn push(&mut self, name: String, mapped_name: String, embedded: Option<Arc<EntityModel>>) {
        self.model.properties.retain(|p| p.name != name);
        self.model.properties.push(PropertyModel {
            name,
            mapped_name,
            embedded,
        });
    }
}
