//! Shared helpers for the integration tests

#![allow(dead_code)]

use std::path::PathBuf;

use bson::{oid::ObjectId, Bson, Document};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tessera_mongodb::{Entity, EntityModel};

/// Player score in one game, as used by the `$firstN` examples
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub player_id: String,
    pub game_id: String,
    pub score: i32,
}

impl Entity for Game {
    fn model() -> EntityModel {
        EntityModel::builder("Game")
            .collection("games")
            .id("id")
            .property("playerId")
            .property("gameId")
            .property("score")
            .build()
    }

    fn id(&self) -> Option<Bson> {
        self.id.map(Bson::ObjectId)
    }

    fn set_id(&mut self, id: Bson) {
        self.id = id.as_object_id();
    }
}

/// One documented example on disk
pub struct Fixture {
    pub dir: PathBuf,
}

impl Fixture {
    pub fn new(kind: &str, operator: &str, example: usize) -> Self {
        let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures")
            .join(kind)
            .join(operator)
            .join(format!("example{}", example));
        Self { dir }
    }

    pub fn json(&self, file: &str) -> Value {
        let path = self.dir.join(file);
        let text = std::fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("cannot read {}: {}", path.display(), e));
        serde_json::from_str(&text)
            .unwrap_or_else(|e| panic!("invalid JSON in {}: {}", path.display(), e))
    }

    pub fn action(&self) -> Value {
        self.json("action.json")
    }

    pub fn expected(&self) -> Value {
        self.json("expected.json")
    }

    /// `data.json` as documents ready to insert
    pub fn data(&self) -> Vec<Document> {
        match self.json("data.json") {
            Value::Array(items) => items.into_iter().map(to_document).collect(),
            other => panic!("data.json must hold an array, found {}", other),
        }
    }
}

pub fn to_document(value: Value) -> Document {
    match Bson::try_from(value).expect("extended JSON") {
        Bson::Document(document) => document,
        other => panic!("expected a document, found {}", other),
    }
}

/// Encoded stages in relaxed extended JSON, comparable with fixture files
pub fn relaxed(stages: Vec<Document>) -> Value {
    Value::Array(
        stages
            .into_iter()
            .map(|stage| Bson::Document(stage).into_relaxed_extjson())
            .collect(),
    )
}
