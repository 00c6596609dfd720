//! Codecs for value types the driver does not map natively
//!
//! A [`CodecRegistry`] is keyed by the Rust type it converts. Entities
//! normally go through serde; the registry serves callers converting
//! individual values, and the [`naive_datetime`] / [`naive_time_millis`]
//! adapters expose the same wire forms to `#[serde(with = ...)]`.

mod time;
mod values;

pub use time::{naive_datetime, naive_time_millis};

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use bson::Bson;
use tessera_common::TesseraError;

use crate::Result;

/// Converts one Rust type to and from BSON.
///
/// Values cross the trait as `dyn Any`; [`CodecRegistry::encode`] and
/// [`CodecRegistry::decode`] restore the static type.
pub trait Codec: Send + Sync {
    /// Name of the converted type, for diagnostics
    fn type_name(&self) -> &'static str;

    fn encode(&self, value: &dyn Any) -> Result<Bson>;

    fn decode(&self, value: &Bson) -> Result<Box<dyn Any>>;
}

/// A [`Codec`] built from a pair of functions
pub struct FnCodec<T> {
    encode: fn(&T) -> Result<Bson>,
    decode: fn(&Bson) -> Result<T>,
}

impl<T> FnCodec<T> {
    pub fn new(encode: fn(&T) -> Result<Bson>, decode: fn(&Bson) -> Result<T>) -> Self {
        Self { encode, decode }
    }
}

impl<T: Any> Codec for FnCodec<T> {
    fn type_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn encode(&self, value: &dyn Any) -> Result<Bson> {
        let value = value.downcast_ref::<T>().ok_or_else(|| {
            TesseraError::Codec(format!("codec for {} got another type", type_name::<T>()))
        })?;
        (self.encode)(value)
    }

    fn decode(&self, value: &Bson) -> Result<Box<dyn Any>> {
        Ok(Box::new((self.decode)(value)?))
    }
}

/// Codecs keyed by the type they convert
#[derive(Clone, Default)]
pub struct CodecRegistry {
    codecs: HashMap<TypeId, Arc<dyn Codec>>,
}

impl std::fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.codecs.values().map(|c| c.type_name()).collect();
        names.sort_unstable();
        f.debug_struct("CodecRegistry").field("codecs", &names).finish()
    }
}

impl CodecRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the date/time, URL, map, binary and typed array codecs
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        time::register(&mut registry);
        values::register(&mut registry);
        registry
    }

    /// Register `codec` for `T`, replacing any earlier one
    pub fn add_codec<T: Any>(&mut self, codec: impl Codec + 'static) -> &mut Self {
        self.codecs.insert(TypeId::of::<T>(), Arc::new(codec));
        self
    }

    /// Register a pair of conversion functions for `T`
    pub fn add_fn<T: Any>(
        &mut self,
        encode: fn(&T) -> Result<Bson>,
        decode: fn(&Bson) -> Result<T>,
    ) -> &mut Self {
        self.add_codec::<T>(FnCodec::new(encode, decode))
    }

    /// The codec for exactly `T`, if any
    pub fn get<T: Any>(&self) -> Option<Arc<dyn Codec>> {
        self.codecs.get(&TypeId::of::<T>()).cloned()
    }

    pub fn contains<T: Any>(&self) -> bool {
        self.codecs.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.codecs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }

    pub fn encode<T: Any>(&self, value: &T) -> Result<Bson> {
        self.require::<T>()?.encode(value)
    }

    pub fn decode<T: Any>(&self, value: &Bson) -> Result<T> {
        let decoded = self.require::<T>()?.decode(value)?;
        decoded
            .downcast::<T>()
            .map(|boxed| *boxed)
            .map_err(|_| {
                TesseraError::Codec(format!("codec for {} returned another type", type_name::<T>()))
            })
    }

    fn require<T: Any>(&self) -> Result<Arc<dyn Codec>> {
        self.get::<T>().ok_or_else(|| {
            TesseraError::Codec(format!("no codec registered for {}", type_name::<T>()))
        })
    }
}

/// Error for a BSON value of the wrong type
pub(crate) fn unexpected(expected: &str, found: &Bson) -> TesseraError {
    TesseraError::Codec(format!(
        "expected {}, found {:?}",
        expected,
        found.element_type()
    ))
}
