//! Change tracker: which fields of a current object differ from a baseline.
//!
//! "Changed" uses the merge predicate: a field is changed exactly when merging
//! `current` onto `base` would modify it. What a later merge would overwrite
//! and what counts as a user change are therefore the same thing.

use crate::field::ConfigType;
use crate::probe::default_of;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Name → current value of every changed field.
pub type ChangeSet = BTreeMap<String, Value>;

/// Whether a field differs from the baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldStatus {
    Changed,
    Unchanged,
}

/// Every field of `T` paired with its status.
pub fn field_statuses<T: ConfigType>(base: &T, current: &T) -> Vec<(&'static str, FieldStatus)> {
    let defaults = default_of::<T>();
    let fields = T::fields();
    fields
        .iter()
        .map(|field| {
            let status = if field.differs(base, current, &defaults) {
                FieldStatus::Changed
            } else {
                FieldStatus::Unchanged
            };
            (field.name(), status)
        })
        .collect()
}

/// Names of fields that changed between `base` and `current`.
pub fn changed_fields<T: ConfigType>(base: &T, current: &T) -> Vec<&'static str> {
    with_status(base, current, FieldStatus::Changed)
}

/// Names of fields that did not change; the complement of [`changed_fields`].
pub fn unchanged_fields<T: ConfigType>(base: &T, current: &T) -> Vec<&'static str> {
    with_status(base, current, FieldStatus::Unchanged)
}

fn with_status<T: ConfigType>(base: &T, current: &T, wanted: FieldStatus) -> Vec<&'static str> {
    field_statuses(base, current)
        .into_iter()
        .filter(|(_, status)| *status == wanted)
        .map(|(name, _)| name)
        .collect()
}

/// Changed fields with their values in `current`.
pub fn changes_by_name<T: ConfigType>(
    base: &T,
    current: &T,
) -> Result<ChangeSet, serde_json::Error> {
    let defaults = default_of::<T>();
    let fields = T::fields();
    let mut changes = ChangeSet::new();
    for field in fields.iter() {
        if field.differs(base, current, &defaults) {
            changes.insert(field.name().to_string(), field.value(current)?);
        }
    }
    Ok(changes)
}
