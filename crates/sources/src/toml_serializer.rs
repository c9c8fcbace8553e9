//! TOML partial serializer.
//!
//! Partial output works on the top-level table: only the named keys are
//! written. `partial_update` edits the existing document through
//! `toml_edit`, so comments, key order and table placement outside the named
//! keys come back exactly as they were read.

use layerconf_core::{PartialSerializer, SourceError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::{Read, Write};
use toml_edit::{DocumentMut, Item, Table};

const FORMAT: &str = "toml";

/// Serializes configuration objects as TOML documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct TomlSerializer;

fn to_table<T: Serialize>(obj: &T) -> Result<toml::Table, SourceError> {
    let value = toml::Value::try_from(obj).map_err(|e| SourceError::Serialize {
        format: FORMAT,
        reason: e.to_string(),
    })?;
    match value {
        toml::Value::Table(table) => Ok(table),
        other => Err(SourceError::Serialize {
            format: FORMAT,
            reason: format!("expected a table, found {}", other.type_str()),
        }),
    }
}

fn read_text(reader: &mut dyn Read) -> Result<String, SourceError> {
    let mut text = String::new();
    reader
        .read_to_string(&mut text)
        .map_err(|e| SourceError::Stream {
            format: FORMAT,
            reason: e.to_string(),
        })?;
    Ok(text)
}

fn write_table(writer: &mut dyn Write, table: &toml::Table) -> Result<(), SourceError> {
    let text = toml::to_string_pretty(table).map_err(|e| SourceError::Serialize {
        format: FORMAT,
        reason: e.to_string(),
    })?;
    writer
        .write_all(text.as_bytes())
        .map_err(|e| SourceError::Stream {
            format: FORMAT,
            reason: e.to_string(),
        })
}

fn parse_document(text: &str) -> Result<DocumentMut, SourceError> {
    text.parse::<DocumentMut>().map_err(|e| SourceError::Parse {
        format: FORMAT,
        reason: e.to_string(),
    })
}

/// The item `key` gets in a freshly written document.
fn fresh_item(key: &str, value: &toml::Value) -> Result<Item, SourceError> {
    let mut single = toml::Table::new();
    single.insert(key.to_string(), value.clone());
    let text = toml::to_string(&single).map_err(|e| SourceError::Serialize {
        format: FORMAT,
        reason: e.to_string(),
    })?;
    parse_document(&text)?
        .remove(key)
        .ok_or_else(|| SourceError::Serialize {
            format: FORMAT,
            reason: format!("no `{key}` key in serialized output"),
        })
}

fn position_of(item: &Item) -> Option<usize> {
    match item {
        Item::Table(table) => table.position(),
        Item::ArrayOfTables(array) => array.iter().find_map(Table::position),
        _ => None,
    }
}

fn last_position(table: &Table) -> usize {
    table
        .iter()
        .filter_map(|(_, item)| match item {
            Item::Table(child) => Some(child.position().unwrap_or(0).max(last_position(child))),
            Item::ArrayOfTables(array) => array
                .iter()
                .map(|child| child.position().unwrap_or(0).max(last_position(child)))
                .max(),
            _ => None,
        })
        .max()
        .unwrap_or(0)
}

/// Place `table` and every table below it at `position`.
fn set_position(table: &mut Table, position: usize) {
    table.set_position(position);
    for (_, child) in table.iter_mut() {
        set_item_position(child, position);
    }
}

fn set_item_position(item: &mut Item, position: usize) {
    match item {
        Item::Table(table) => set_position(table, position),
        Item::ArrayOfTables(array) => {
            for table in array.iter_mut() {
                set_position(table, position);
            }
        }
        _ => {}
    }
}

/// Put `item` under `key`, in place when the key exists. A replaced value or
/// table keeps its surrounding comments; new tables go last.
fn replace_item(document: &mut DocumentMut, key: &str, mut item: Item) {
    let next = last_position(document.as_table()) + 1;
    if let Some(slot) = document.get_mut(key) {
        match (&*slot, &mut item) {
            (Item::Value(old), Item::Value(new)) => *new.decor_mut() = old.decor().clone(),
            (Item::Table(old), Item::Table(new)) => *new.decor_mut() = old.decor().clone(),
            _ => {}
        }
        set_item_position(&mut item, position_of(slot).unwrap_or(next));
        *slot = item;
        return;
    }
    set_item_position(&mut item, next);
    document.insert(key, item);
}

impl<T> PartialSerializer<T> for TomlSerializer
where
    T: Serialize + DeserializeOwned,
{
    fn format(&self) -> &'static str {
        FORMAT
    }

    fn serialize(&self, writer: &mut dyn Write, obj: &T) -> Result<(), SourceError> {
        write_table(writer, &to_table(obj)?)
    }

    fn partial_serialize(
        &self,
        writer: &mut dyn Write,
        obj: &T,
        fields: &[&str],
    ) -> Result<(), SourceError> {
        let mut table = to_table(obj)?;
        table.retain(|key, _| fields.contains(&key));
        write_table(writer, &table)
    }

    fn deserialize(&self, reader: &mut dyn Read) -> Result<T, SourceError> {
        let text = read_text(reader)?;
        toml::from_str(&text).map_err(|e| SourceError::Parse {
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
        let text = read_text(existing)?;
        let mut document = parse_document(&text)?;
        let updated = to_table(obj)?;
        for &field in fields {
            match updated.get(field) {
                Some(value) => replace_item(&mut document, field, fresh_item(field, value)?),
                None => {
                    document.remove(field);
                }
            }
        }
        writer
            .write_all(document.to_string().as_bytes())
            .map_err(|e| SourceError::Stream {
                format: FORMAT,
                reason: e.to_string(),
            })
    }
}
