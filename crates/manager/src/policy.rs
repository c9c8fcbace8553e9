//! Serialization pins: per-field overrides of the computed save delta.

use layerconf_core::{ConfigType, Error, Result};
use std::collections::BTreeMap;
use std::fmt;

/// How a pinned field is treated when computing the save delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerializePolicy {
    /// Always saved, changed or not.
    Always,
    /// Never saved, even when changed.
    Never,
}

impl fmt::Display for SerializePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SerializePolicy::Always => write!(f, "always"),
            SerializePolicy::Never => write!(f, "never"),
        }
    }
}

/// Pinned fields of one configuration type, keyed by the table's own names.
#[derive(Debug, Clone, Default)]
pub(crate) struct Pins {
    policies: BTreeMap<&'static str, SerializePolicy>,
}

/// Resolve `name` against the field table of `T`.
fn field_name<T: ConfigType>(name: &str) -> Result<&'static str> {
    T::fields()
        .get(name)
        .map(|field| field.name())
        .ok_or_else(|| Error::UnknownField {
            field: name.to_string(),
        })
}

impl Pins {
    pub(crate) fn pin<T: ConfigType>(&mut self, name: &str, policy: SerializePolicy) -> Result<()> {
        let name = field_name::<T>(name)?;
        self.policies.insert(name, policy);
        Ok(())
    }

    pub(crate) fn unpin<T: ConfigType>(&mut self, name: &str) -> Result<Option<SerializePolicy>> {
        let name = field_name::<T>(name)?;
        Ok(self.policies.remove(name))
    }

    pub(crate) fn policy(&self, name: &str) -> Option<SerializePolicy> {
        self.policies.get(name).copied()
    }

    /// Apply the pins to `changed`, keeping field-table order.
    pub(crate) fn apply<T: ConfigType>(&self, changed: &[&'static str]) -> Vec<&'static str> {
        T::field_names()
            .into_iter()
            .filter(|name| match self.policy(name) {
                Some(SerializePolicy::Always) => true,
                Some(SerializePolicy::Never) => false,
                None => changed.contains(name),
            })
            .collect()
    }
}
