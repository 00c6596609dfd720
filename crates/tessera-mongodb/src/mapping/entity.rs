//! Entity trait for mapped types
//!
//! This module provides the core `Entity` trait that every mapped type
//! implements. Serialization goes through serde/BSON; the trait adds the
//! model declaration, identifier access and lifecycle hooks.

use bson::{Bson, Document as BsonDocument};
use serde::{de::DeserializeOwned, Serialize};
use tessera_common::TesseraError;

use super::EntityModel;
use crate::Result;

/// Core trait for mapped entities
///
/// Implementing types must be Serialize + DeserializeOwned to enable automatic
/// BSON conversion. The model returned by [`Entity::model`] must agree with the
/// serde attributes of the type: renamed fields are declared with
/// `mapped_property`, `rename_all` mirrors `#[serde(rename_all)]`.
///
/// # Example
///
/// ```ignore
/// use bson::{oid::ObjectId, Bson};
/// use serde::{Deserialize, Serialize};
/// use tessera_mongodb::{Entity, EntityModel};
///
/// #[derive(Debug, Serialize, Deserialize)]
/// struct Employee {
///     #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
///     id: Option<ObjectId>,
///     name: String,
///     salary: f64,
/// }
///
/// impl Entity for Employee {
///     fn model() -> EntityModel {
///         EntityModel::builder("Employee")
///             .collection("employees")
///             .id("id")
///             .property("name")
///             .property("salary")
///             .build()
///     }
///
///     fn id(&self) -> Option<Bson> {
///         self.id.map(Bson::ObjectId)
///     }
///
///     fn set_id(&mut self, id: Bson) {
///         self.id = id.as_object_id();
///     }
/// }
/// ```
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + Sized + 'static {
    /// Declare the mapping for this type
    fn model() -> EntityModel;

    /// Get the entity's identifier (if it has one)
    fn id(&self) -> Option<Bson> {
        None
    }

    /// Set the entity's identifier after an insert
    fn set_id(&mut self, _id: Bson) {
        // Default implementation does nothing
        // Override this if your entity has an _id field
    }

    /// Current optimistic-locking version; `None` when never saved
    fn version(&self) -> Option<i64> {
        None
    }

    /// Set the version; `None` returns the entity to the never-saved state
    fn set_version(&mut self, _version: Option<i64>) {}

    /// Called before the entity is encoded for a save
    fn pre_persist(&mut self) {}

    /// Called after a save with the document that was written
    fn post_persist(&self, _document: &BsonDocument) {}

    /// Called after the entity is decoded from a stored document
    fn post_load(&mut self) {}

    /// Convert entity to BSON
    fn to_bson(&self) -> Result<BsonDocument> {
        bson::to_document(self).map_err(|e| TesseraError::Serialization(e.to_string()))
    }

    /// Create entity from BSON
    fn from_bson(doc: BsonDocument) -> Result<Self> {
        bson::from_document(doc).map_err(|e| TesseraError::Deserialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::{doc, oid::ObjectId};
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct TestDoc {
        #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
        id: Option<ObjectId>,
        name: String,
        value: i32,
    }

    impl Entity for TestDoc {
        fn model() -> EntityModel {
            EntityModel::builder("TestDoc")
                .collection("test_docs")
                .id("id")
                .property("name")
                .property("value")
                .build()
        }

        fn id(&self) -> Option<Bson> {
            self.id.map(Bson::ObjectId)
        }

        fn set_id(&mut self, id: Bson) {
            self.id = id.as_object_id();
        }
    }

    #[test]
    fn test_model_declares_collection() {
        let model = TestDoc::model();
        assert_eq!(model.collection_name(&Default::default()), "test_docs");
        assert_eq!(model.id_property(), Some("id"));
    }

    #[test]
    fn test_to_bson() {
        let doc = TestDoc {
            id: None,
            name: "test".to_string(),
            value: 42,
        };

        let bson = doc.to_bson().unwrap();
        assert_eq!(bson.get_str("name").unwrap(), "test");
        assert_eq!(bson.get_i32("value").unwrap(), 42);
        assert!(!bson.contains_key("_id"));
    }

    #[test]
    fn test_from_bson() {
        let bson = doc! {
            "name": "test",
            "value": 42
        };

        let doc = TestDoc::from_bson(bson).unwrap();
        assert_eq!(doc.name, "test");
        assert_eq!(doc.value, 42);
    }

    #[test]
    fn test_from_bson_wrong_type() {
        let bson = doc! { "name": "test", "value": "forty-two" };
        let err = TestDoc::from_bson(bson).unwrap_err();
        assert!(matches!(err, TesseraError::Deserialization(_)));
    }

    #[test]
    fn test_set_id() {
        let mut doc = TestDoc {
            id: None,
            name: "x".to_string(),
            value: 1,
        };
        let oid = ObjectId::new();
        doc.set_id(Bson::ObjectId(oid));
        assert_eq!(doc.id(), Some(Bson::ObjectId(oid)));
    }
}
