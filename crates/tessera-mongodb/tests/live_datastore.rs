//! Datastore tests against a running server.
//!
//! These tests require MongoDB. Set MONGODB_URI (default
//! `mongodb://localhost:27017`) and run with `--ignored`.

mod common;

use bson::{doc, oid::ObjectId, Bson};
use common::{Fixture, Game};
use serde::{Deserialize, Serialize};
use tessera_mongodb::aggregation::expressions::{accumulator, array, field};
use tessera_mongodb::aggregation::stages::{group, match_, sort};
use tessera_mongodb::query::filters::{eq, gt, lte};
use tessera_mongodb::query::updates::inc;
use tessera_mongodb::{
    Datastore, DatastoreConfig, DeleteOptions, Entity, EntityModel, FindOptions, IndexDef,
    IndexDirection, ModifyOptions, TesseraError, UpdateOptions,
};

async fn datastore(database: &str) -> Datastore {
    let uri = std::env::var("MONGODB_URI").unwrap_or_else(|_| "mongodb://localhost:27017".to_string());
    let datastore = Datastore::connect(&DatastoreConfig::new(uri).database(database))
        .await
        .unwrap();
    datastore.drop_database().await.unwrap();
    datastore
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct Employee {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<ObjectId>,
    name: String,
    salary: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<i64>,
}

impl Employee {
    fn new(name: &str, salary: f64) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            salary,
            version: None,
        }
    }
}

impl Entity for Employee {
    fn model() -> EntityModel {
        EntityModel::builder("Employee")
            .collection("employees")
            .id("id")
            .property("name")
            .property("salary")
            .version("version")
            .index(IndexDef::on("name", IndexDirection::Ascending).unique())
            .build()
    }

    fn id(&self) -> Option<Bson> {
        self.id.map(Bson::ObjectId)
    }

    fn set_id(&mut self, id: Bson) {
        self.id = id.as_object_id();
    }

    fn version(&self) -> Option<i64> {
        self.version
    }

    fn set_version(&mut self, version: Option<i64>) {
        self.version = version;
    }
}

#[tokio::test]
#[ignore] // Only run with --ignored flag when a server is available
async fn test_quick_tour() {
    let datastore = datastore("tessera_quick_tour").await;
    datastore.ensure_indexes_for::<Employee>().await.unwrap();

    let mut elmer = Employee::new("Elmer Fudd", 50000.0);
    let mut daffy = Employee::new("Daffy Duck", 40000.0);
    let mut pepe = Employee::new("Pepé Le Pew", 25000.0);
    for employee in [&mut elmer, &mut daffy, &mut pepe] {
        datastore.save(employee).await.unwrap();
        assert!(employee.id.is_some());
        assert_eq!(employee.version, Some(1));
    }

    assert_eq!(datastore.find::<Employee>().count().await.unwrap(), 3);

    let underpaid = datastore.find::<Employee>().filter(lte("salary", 30000));
    assert_eq!(underpaid.count().await.unwrap(), 1);

    let result = underpaid
        .update([inc("salary", 10000)])
        .execute(UpdateOptions::default())
        .await
        .unwrap();
    assert_eq!(result.modified_count, 1);

    let stored = datastore
        .find::<Employee>()
        .filter(eq("name", "Pepé Le Pew"))
        .first()
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.salary, 35000.0);
    // updates on versioned entities bump the version
    assert_eq!(stored.version, Some(2));

    let deleted = datastore
        .find::<Employee>()
        .filter(gt("salary", 100000))
        .find_and_delete()
        .await
        .unwrap();
    assert!(deleted.is_none());
}

#[tokio::test]
#[ignore]
async fn test_version_conflict() {
    let datastore = datastore("tessera_versions").await;

    let mut first = Employee::new("Bugs Bunny", 60000.0);
    datastore.save(&mut first).await.unwrap();
    let mut second = first.clone();

    first.salary = 65000.0;
    datastore.save(&mut first).await.unwrap();
    assert_eq!(first.version, Some(2));

    second.salary = 1.0;
    let err = datastore.save(&mut second).await.unwrap_err();
    assert!(matches!(err, TesseraError::VersionConflict(_)));
    assert_eq!(second.version, Some(1));
}

#[tokio::test]
#[ignore]
async fn test_modify_and_delete() {
    let datastore = datastore("tessera_modify").await;
    let mut employees = vec![
        Employee::new("Porky Pig", 30000.0),
        Employee::new("Tweety", 20000.0),
    ];
    datastore.save_many(&mut employees).await.unwrap();

    let raised = datastore
        .find::<Employee>()
        .filter(eq("name", "Tweety"))
        .modify([inc("salary", 500)])
        .execute(ModifyOptions::default())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(raised.salary, 20500.0);

    let page = datastore
        .find::<Employee>()
        .options(FindOptions::default().sort(tessera_mongodb::query::Sort::descending("salary")).limit(1))
        .to_list()
        .await
        .unwrap();
    assert_eq!(page[0].name, "Porky Pig");

    assert_eq!(datastore.delete(&employees[0]).await.unwrap(), 1);
    let removed = datastore
        .find::<Employee>()
        .delete(DeleteOptions::multi())
        .await
        .unwrap();
    assert_eq!(removed, 1);
}

#[tokio::test]
#[ignore]
async fn test_first_n_examples_run() {
    let datastore = datastore("tessera_first_n").await;
    let fixture = Fixture::new("expressions", "firstN", 3);
    datastore
        .database()
        .collection::<bson::Document>("games")
        .insert_many(fixture.data())
        .await
        .unwrap();

    let results = datastore
        .aggregate::<Game>()
        .stage(sort().descending("score"))
        .stage(group().id(field("gameId")).field(
            "playerId",
            accumulator::first_n(3, array::array(["$playerId", "$score"])),
        ))
        .stage(sort().ascending("_id"))
        .execute_documents()
        .await
        .unwrap();
    assert_eq!(
        results,
        vec![
            doc! { "_id": "G1", "playerId": [["PlayerC", 99], ["PlayerB", 33], ["PlayerA", 31]] },
            doc! { "_id": "G2", "playerId": [["PlayerD", 80], ["PlayerC", 66], ["PlayerB", 14]] },
        ]
    );

    let single = datastore
        .aggregate::<Game>()
        .stage(match_([eq("gameId", "G1")]))
        .stage(group().id(field("gameId")).field("top", accumulator::max(field("score"))))
        .execute_documents()
        .await
        .unwrap();
    assert_eq!(single, vec![doc! { "_id": "G1", "top": 99 }]);
}
