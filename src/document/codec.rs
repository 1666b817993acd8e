//! Parsing, serialization and typed decoding of structured documents.

use serde::de::value::StringDeserializer;
use serde::de::{self, DeserializeOwned, DeserializeSeed, IntoDeserializer, MapAccess, SeqAccess, Visitor};
use serde::{Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::document::Document;
use crate::error::{ConfigError, Result};

/// Parse UTF-8 JSON bytes into a document. Never partially succeeds.
pub fn parse(bytes: &[u8]) -> Result<Document> {
    serde_json::from_slice(bytes).map_err(|e| ConfigError::Format(e.to_string()))
}

/// Serialize a document, optionally indented.
pub fn serialize(doc: &Document, indented: bool) -> Result<Vec<u8>> {
    let bytes = if indented {
        serde_json::to_vec_pretty(doc)
    } else {
        serde_json::to_vec(doc)
    };
    bytes.map_err(|e| ConfigError::Format(e.to_string()))
}

/// Decode a document into a typed value.
///
/// With `case_insensitive`, object keys are matched against struct field
/// names ignoring case, so `{"Port": 1}` fills a field named `port` and
/// `{"MAXCONNECTIONS": 5}` fills a camelCase `maxConnections`. Keys of
/// map-typed values are passed through unchanged.
pub fn decode<T: DeserializeOwned>(doc: Document, case_insensitive: bool) -> Result<T> {
    let decoded = if case_insensitive {
        T::deserialize(CaseInsensitive(doc))
    } else {
        serde_json::from_value(doc)
    };
    decoded.map_err(|e| ConfigError::Decode(e.to_string()))
}

/// Encode a typed value into a document.
pub fn to_document<T: Serialize>(value: &T) -> Result<Document> {
    serde_json::to_value(value).map_err(|e| ConfigError::Decode(e.to_string()))
}

/// Deserializer over a document that resolves struct fields ignoring case.
///
/// Only `deserialize_struct` renames keys; everything else walks the
/// document as-is, re-wrapping nested values so structs at any depth are
/// matched the same way. Enum payloads are decoded case-sensitively.
struct CaseInsensitive(Value);

impl<'de> Deserializer<'de> for CaseInsensitive {
    type Error = serde_json::Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> std::result::Result<V::Value, Self::Error> {
        match self.0 {
            Value::Object(map) => visitor.visit_map(Entries::new(map.into_iter().collect())),
            Value::Array(items) => visitor.visit_seq(Items(items.into_iter())),
            scalar => scalar.deserialize_any(visitor),
        }
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> std::result::Result<V::Value, Self::Error> {
        match self.0 {
            Value::Object(map) => visitor.visit_map(Entries::new(match_fields(map, fields))),
            other => CaseInsensitive(other).deserialize_any(visitor),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> std::result::Result<V::Value, Self::Error> {
        match self.0 {
            Value::Null => visitor.visit_none(),
            other => visitor.visit_some(CaseInsensitive(other)),
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> std::result::Result<V::Value, Self::Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> std::result::Result<V::Value, Self::Error> {
        self.0.deserialize_enum(name, variants, visitor)
    }

    serde::forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct seq tuple tuple_struct map identifier
        ignored_any
    }
}

/// Rename keys that differ from a field only in case.
///
/// An exact key always wins: `{"port": 1, "Port": 2}` keeps `port` and
/// leaves `Port` as an unknown key.
fn match_fields(map: Map<String, Value>, fields: &'static [&'static str]) -> Vec<(String, Value)> {
    let exact: Vec<&'static str> = fields
        .iter()
        .copied()
        .filter(|field| map.contains_key(*field))
        .collect();

    map.into_iter()
        .map(|(key, value)| {
            if exact.iter().any(|field| *field == key) {
                return (key, value);
            }
            let folded = key.to_lowercase();
            match fields
                .iter()
                .copied()
                .find(|field| !exact.contains(field) && field.to_lowercase() == folded)
            {
                Some(field) => (field.to_string(), value),
                None => (key, value),
            }
        })
        .collect()
}

struct Entries {
    iter: std::vec::IntoIter<(String, Value)>,
    value: Option<Value>,
}

impl Entries {
    fn new(entries: Vec<(String, Value)>) -> Self {
        Self {
            iter: entries.into_iter(),
            value: None,
        }
    }
}

impl<'de> MapAccess<'de> for Entries {
    type Error = serde_json::Error;

    fn next_key_seed<K: DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> std::result::Result<Option<K::Value>, Self::Error> {
        let Some((key, value)) = self.iter.next() else {
            return Ok(None);
        };
        self.value = Some(value);
        let key: StringDeserializer<serde_json::Error> = key.into_deserializer();
        seed.deserialize(key).map(Some)
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> std::result::Result<V::Value, Self::Error> {
        match self.value.take() {
            Some(value) => seed.deserialize(CaseInsensitive(value)),
            None => Err(de::Error::custom("map value requested before its key")),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

struct Items(std::vec::IntoIter<Value>);

impl<'de> SeqAccess<'de> for Items {
    type Error = serde_json::Error;

    fn next_element_seed<T: DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> std::result::Result<Option<T::Value>, Self::Error> {
        self.0
            .next()
            .map(|value| seed.deserialize(CaseInsensitive(value)))
            .transpose()
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.0.len())
    }
}
