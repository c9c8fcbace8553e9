//! JSON partial serializer.
//!
//! Absent fields are never written: `null` members are stripped from the
//! top-level object before output.

use layerconf_core::{PartialSerializer, SourceError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::io::{Read, Write};

const FORMAT: &str = "json";

/// Serializes configuration objects as pretty-printed JSON documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

fn to_object<T: Serialize>(obj: &T) -> Result<Map<String, Value>, SourceError> {
    let value = serde_json::to_value(obj).map_err(|e| SourceError::Serialize {
        format: FORMAT,
        reason: e.to_string(),
    })?;
    match value {
        Value::Object(mut map) => {
            map.retain(|_, v| !v.is_null());
            Ok(map)
        }
        _ => Err(SourceError::Serialize {
            format: FORMAT,
            reason: "expected a JSON object".into(),
        }),
    }
}

fn read_document(reader: &mut dyn Read) -> Result<Value, SourceError> {
    let mut text = String::new();
    reader
        .read_to_string(&mut text)
        .map_err(|e| SourceError::Stream {
            format: FORMAT,
            reason: e.to_string(),
        })?;
    if text.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_str(&text).map_err(|e| SourceError::Parse {
        format: FORMAT,
        reason: e.to_string(),
    })
}

fn write_object(writer: &mut dyn Write, map: Map<String, Value>) -> Result<(), SourceError> {
    let mut text =
        serde_json::to_string_pretty(&Value::Object(map)).map_err(|e| SourceError::Serialize {
            format: FORMAT,
            reason: e.to_string(),
        })?;
    text.push('\n');
    writer
        .write_all(text.as_bytes())
        .map_err(|e| SourceError::Stream {
            format: FORMAT,
            reason: e.to_string(),
        })
}

impl<T> PartialSerializer<T> for JsonSerializer
where
    T: Serialize + DeserializeOwned,
{
    fn format(&self) -> &'static str {
        FORMAT
    }

    fn serialize(&self, writer: &mut dyn Write, obj: &T) -> Result<(), SourceError> {
        write_object(writer, to_object(obj)?)
    }

    fn partial_serialize(
        &self,
        writer: &mut dyn Write,
        obj: &T,
        fields: &[&str],
    ) -> Result<(), SourceError> {
        let mut map = to_object(obj)?;
        map.retain(|key, _| fields.contains(&key.as_str()));
        write_object(writer, map)
    }

    fn deserialize(&self, reader: &mut dyn Read) -> Result<T, SourceError> {
        let document = read_document(reader)?;
        serde_json::from_value(document).map_err(|e| SourceError::Parse {
            format: FORMAT,
            reason: e.to_string(),
        })
    }

    fn partial_update(
        &self,
        existing: &mut dyn Read,
        writer: &mut dyn Write,
        obj: &T,
        fields: &[&str],
    ) -> Result<(), SourceError> {
        let mut document = match read_document(existing)? {
            Value::Object(map) => map,
            _ => {
                return Err(SourceError::Parse {
                    format: FORMAT,
                    reason: "existing document is not a JSON object".into(),
                });
            }
        };
        let updated = to_object(obj)?;
        for &field in fields {
            match updated.get(field) {
                Some(value) => {
                    document.insert(field.to_string(), value.clone());
                }
                None => {
                    document.remove(field);
                }
            }
        }
        write_object(writer, document)
    }
}
