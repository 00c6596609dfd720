//! Object-document mapping for MongoDB
//!
//! Entities declare how they map to documents ([`Entity`], [`EntityModel`]);
//! a [`Datastore`] saves and loads them through the official driver, and the
//! builders in [`query`] and [`aggregation`] turn typed calls into the filter,
//! update and pipeline documents the server expects.
//!
//! # Features
//! - Property paths translated to stored field names
//! - Optimistic locking through a version property
//! - Filter, update, stage and expression builders
//! - Codecs for chrono, URL, binary and typed array values
//! - JavaScript operators rejected unless allowed

pub mod aggregation;
pub mod codecs;
pub mod config;
pub mod connection;
pub mod datastore;
pub mod encode;
pub mod mapping;
pub mod query;
pub mod validation;

pub use aggregation::{Aggregation, AggregationOptions, Pipeline, Stage};
pub use codecs::{Codec, CodecRegistry};
pub use config::DatastoreConfig;
pub use connection::PoolConfig;
pub use datastore::Datastore;
pub use encode::EncodeContext;
pub use mapping::{Entity, EntityModel, IndexDef, IndexDirection, Mapper, MapperOptions, NamingStrategy};
pub use query::{DeleteOptions, Filter, FindOptions, ModifyOptions, Query, UpdateOperator, UpdateOptions};
pub use tessera_common::{Result, TesseraError};
pub use validation::{validate_pipeline, validate_query, ValidatedCollectionName, ValidatedFieldName};
