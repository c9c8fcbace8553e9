//! `layerconf set`: assign fields and save the delta to the primary file.
//!
//! Values are parsed as JSON and fall back to a plain string, so `age=30`
//! sets a number and `name=Fred` a string. A dotted key (`server.port=9090`)
//! assigns one sub-field of a nested section.

use super::CommandResult;
use crate::settings::{self, Settings};
use layerconf_core::{ConfigType, Error, Validator};
use serde_json::{Map, Value};
use std::io::Write;
use std::path::PathBuf;
use tracing::debug;

fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Apply one `KEY=VALUE` assignment; returns the top-level field touched.
pub fn assign(
    settings: &mut Settings,
    assignment: &str,
) -> Result<&'static str, Box<dyn std::error::Error>> {
    let (key, raw) = assignment
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{assignment}'"))?;
    let value = parse_value(raw);
    let (head, inner) = match key.split_once('.') {
        Some((head, inner)) => (head, Some(inner)),
        None => (key, None),
    };

    let fields = Settings::fields();
    let field = fields.get(head).ok_or_else(|| Error::UnknownField {
        field: head.to_string(),
    })?;

    match inner {
        None => field.set_value(settings, value)?,
        Some(inner) => {
            let mut section = match field.value(settings)? {
                Value::Object(map) => map,
                Value::Null => Map::new(),
                _ => return Err(format!("field '{head}' has no sub-fields").into()),
            };
            let clearing = value.is_null();
            section.insert(inner.to_string(), value);
            field.set_value(settings, Value::Object(section))?;
            // Unknown sub-fields are dropped by deserialization.
            if !clearing && field.value(settings)?.get(inner).is_none() {
                return Err(Error::UnknownField {
                    field: key.to_string(),
                }
                .into());
            }
        }
    }
    debug!(field = key, "Field assigned");
    Ok(field.name())
}

pub fn run(
    files: &[PathBuf],
    primary: Option<usize>,
    assignments: &[String],
    out: &mut impl Write,
) -> CommandResult {
    let mut manager = super::open(files, primary)?;
    for assignment in assignments {
        assign(manager.out_mut(), assignment)?;
    }
    settings::validator().validate(manager.out())?;

    let target = manager.source_name(manager.primary_index())?;
    let delta = manager.save_delta()?;
    if delta.is_empty() {
        writeln!(out, "No changed fields; {target} left untouched.")?;
        return Ok(());
    }
    let saved = manager.save_changes()?;
    writeln!(out, "Saved {} to {target}", saved.join(", "))?;
    Ok(())
}
