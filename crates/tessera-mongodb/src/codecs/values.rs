//! URL, map, binary and typed array codecs

use std::collections::{BTreeMap, HashMap};

use bson::spec::BinarySubtype;
use bson::{Binary, Bson, Document as BsonDocument};
use tessera_common::TesseraError;
use url::Url;

use super::{unexpected, CodecRegistry};
use crate::Result;

pub(super) fn register(registry: &mut CodecRegistry) {
    registry
        .add_fn::<Url>(|url| Ok(Bson::String(url.to_string())), decode_url)
        .add_fn::<HashMap<String, Bson>>(
            |map| Ok(Bson::Document(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())),
            |value| Ok(decode_map(value)?.into_iter().collect()),
        )
        .add_fn::<BTreeMap<String, Bson>>(
            |map| Ok(Bson::Document(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())),
            |value| Ok(decode_map(value)?.into_iter().collect()),
        )
        .add_fn::<Vec<u8>>(encode_binary, decode_binary)
        .add_fn::<Vec<bool>>(encode_array, decode_array)
        .add_fn::<Vec<i16>>(encode_array, decode_array)
        .add_fn::<Vec<i32>>(encode_array, decode_array)
        .add_fn::<Vec<i64>>(encode_array, decode_array)
        .add_fn::<Vec<f32>>(encode_array, decode_array)
        .add_fn::<Vec<f64>>(encode_array, decode_array)
        .add_fn::<Vec<char>>(encode_array, decode_array);
}

fn decode_url(value: &Bson) -> Result<Url> {
    match value {
        Bson::String(s) => {
            Url::parse(s).map_err(|e| TesseraError::Codec(format!("invalid URL '{}': {}", s, e)))
        }
        other => Err(unexpected("string", other)),
    }
}

fn decode_map(value: &Bson) -> Result<BsonDocument> {
    match value {
        Bson::Document(document) => Ok(document.clone()),
        other => Err(unexpected("document", other)),
    }
}

fn encode_binary(bytes: &Vec<u8>) -> Result<Bson> {
    Ok(Bson::Binary(Binary {
        subtype: BinarySubtype::Generic,
        bytes: bytes.clone(),
    }))
}

fn decode_binary(value: &Bson) -> Result<Vec<u8>> {
    match value {
        Bson::Binary(binary) => Ok(binary.bytes.clone()),
        other => Err(unexpected("binary", other)),
    }
}

/// Element types stored as BSON arrays
trait ArrayElement: Sized {
    fn to_bson(&self) -> Bson;
    fn from_bson(value: &Bson) -> Result<Self>;
}

fn out_of_range(value: &Bson, target: &str) -> TesseraError {
    TesseraError::Codec(format!("{} does not fit in {}", value, target))
}

impl ArrayElement for bool {
    fn to_bson(&self) -> Bson {
        Bson::Boolean(*self)
    }

    fn from_bson(value: &Bson) -> Result<Self> {
        match value {
            Bson::Boolean(b) => Ok(*b),
            other => Err(unexpected("boolean", other)),
        }
    }
}

impl ArrayElement for i64 {
    fn to_bson(&self) -> Bson {
        Bson::Int64(*self)
    }

    fn from_bson(value: &Bson) -> Result<Self> {
        match value {
            Bson::Int32(v) => Ok(i64::from(*v)),
            Bson::Int64(v) => Ok(*v),
            other => Err(unexpected("integer", other)),
        }
    }
}

impl ArrayElement for i32 {
    fn to_bson(&self) -> Bson {
        Bson::Int32(*self)
    }

    fn from_bson(value: &Bson) -> Result<Self> {
        i32::try_from(i64::from_bson(value)?).map_err(|_| out_of_range(value, "i32"))
    }
}

impl ArrayElement for i16 {
    fn to_bson(&self) -> Bson {
        Bson::Int32(i32::from(*self))
    }

    fn from_bson(value: &Bson) -> Result<Self> {
        i16::try_from(i64::from_bson(value)?).map_err(|_| out_of_range(value, "i16"))
    }
}

impl ArrayElement for f64 {
    fn to_bson(&self) -> Bson {
        Bson::Double(*self)
    }

    fn from_bson(value: &Bson) -> Result<Self> {
        match value {
            Bson::Double(v) => Ok(*v),
            Bson::Int32(v) => Ok(f64::from(*v)),
            Bson::Int64(v) => Ok(*v as f64),
            other => Err(unexpected("number", other)),
        }
    }
}

impl ArrayElement for f32 {
    fn to_bson(&self) -> Bson {
        Bson::Double(f64::from(*self))
    }

    fn from_bson(value: &Bson) -> Result<Self> {
        f64::from_bson(value).map(|v| v as f32)
    }
}

impl ArrayElement for char {
    fn to_bson(&self) -> Bson {
        Bson::String(self.to_string())
    }

    fn from_bson(value: &Bson) -> Result<Self> {
        let Bson::String(s) = value else {
            return Err(unexpected("string", value));
        };
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(TesseraError::Codec(format!(
                "expected a single character, found '{}'",
                s
            ))),
        }
    }
}

fn encode_array<E: ArrayElement>(items: &Vec<E>) -> Result<Bson> {
    Ok(Bson::Array(items.iter().map(ArrayElement::to_bson).collect()))
}

fn decode_array<E: ArrayElement>(value: &Bson) -> Result<Vec<E>> {
    match value {
        Bson::Array(items) => items.iter().map(E::from_bson).collect(),
        other => Err(unexpected("array", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    fn registry() -> CodecRegistry {
        CodecRegistry::with_defaults()
    }

    #[test]
    fn test_url() {
        let url = Url::parse("https://www.mongodb.com/docs/").unwrap();
        let encoded = registry().encode(&url).unwrap();
        assert_eq!(encoded, Bson::String("https://www.mongodb.com/docs/".to_string()));
        assert_eq!(registry().decode::<Url>(&encoded).unwrap(), url);
        assert!(registry().decode::<Url>(&Bson::String("not a url".into())).is_err());
    }

    #[test]
    fn test_maps_as_documents() {
        let mut map = BTreeMap::new();
        map.insert("a".to_string(), Bson::Int32(1));
        map.insert("b".to_string(), Bson::String("x".into()));
        assert_eq!(
            registry().encode(&map).unwrap(),
            Bson::Document(doc! { "a": 1, "b": "x" })
        );

        let decoded: HashMap<String, Bson> =
            registry().decode(&Bson::Document(doc! { "k": true })).unwrap();
        assert_eq!(decoded.get("k"), Some(&Bson::Boolean(true)));
    }

    #[test]
    fn test_binary() {
        let encoded = registry().encode(&vec![0xde_u8, 0xad]).unwrap();
        match &encoded {
            Bson::Binary(binary) => {
                assert_eq!(binary.subtype, BinarySubtype::Generic);
                assert_eq!(binary.bytes, vec![0xde, 0xad]);
            }
            other => panic!("expected binary, got {:?}", other),
        }
        assert_eq!(registry().decode::<Vec<u8>>(&encoded).unwrap(), vec![0xde, 0xad]);
    }

    #[test]
    fn test_typed_arrays() {
        let registry = registry();
        assert_eq!(
            registry.encode(&vec![1_i16, -2]).unwrap(),
            Bson::Array(vec![Bson::Int32(1), Bson::Int32(-2)])
        );
        assert_eq!(
            registry.encode(&vec![1.5_f32]).unwrap(),
            Bson::Array(vec![Bson::Double(1.5)])
        );
        assert_eq!(
            registry.encode(&vec!['a', 'b']).unwrap(),
            Bson::Array(vec![Bson::String("a".into()), Bson::String("b".into())])
        );
        assert_eq!(
            registry
                .decode::<Vec<i64>>(&Bson::Array(vec![Bson::Int32(1), Bson::Int64(2)]))
                .unwrap(),
            vec![1, 2]
        );
        assert_eq!(
            registry
                .decode::<Vec<bool>>(&Bson::Array(vec![Bson::Boolean(true)]))
                .unwrap(),
            vec![true]
        );
    }

    #[test]
    fn test_array_range_and_type_errors() {
        let registry = registry();
        assert!(registry
            .decode::<Vec<i16>>(&Bson::Array(vec![Bson::Int32(70_000)]))
            .is_err());
        assert!(registry
            .decode::<Vec<char>>(&Bson::Array(vec![Bson::String("ab".into())]))
            .is_err());
        assert!(registry.decode::<Vec<f64>>(&Bson::Int32(1)).is_err());
    }
}
