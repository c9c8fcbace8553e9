//! Field tables: named, typed access to the fields of a configuration type.
//!
//! A [`ConfigType`] lists its fields once in a [`FieldSet`]. Every field is an
//! `Option<V>`: `None` means "absent", anything else is an explicit value.
//! The merge engine and the change tracker only ever talk to fields through
//! the [`Field`] trait, so they work for any type that provides a table.
//!
//! Tables are usually generated with [`config_fields!`](crate::config_fields):
//!
//! ```
//! use layerconf_core::{config_fields, ConfigType};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
//! struct Server {
//!     host: Option<String>,
//!     port: Option<u16>,
//! }
//!
//! #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
//! struct App {
//!     name: Option<String>,
//!     server: Option<Server>,
//! }
//!
//! config_fields!(Server { host, port });
//! config_fields!(App { name, server as nested });
//!
//! assert_eq!(App::fields().names(), vec!["name", "server"]);
//! ```

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// A structural configuration record.
///
/// `Default` is the zero-configuration constructor. It may pre-populate fields
/// with customized defaults; those values are what "unset" means for the type.
pub trait ConfigType: Default + Clone + PartialEq + fmt::Debug + 'static {
    /// The field table for this type, in declaration order.
    fn fields() -> FieldSet<Self>;

    /// Names of every field, in declaration order.
    fn field_names() -> Vec<&'static str> {
        Self::fields().names()
    }
}

/// Operations on one named field of `T`.
pub trait Field<T> {
    fn name(&self) -> &'static str;

    /// The key this field is written under by serializers. Matches the name
    /// unless the type renames it in serde.
    fn key(&self) -> &'static str {
        self.name()
    }

    /// Whether the field holds a value.
    fn is_set(&self, obj: &T) -> bool;

    /// Apply the merge rule for this field, taking `source`'s value into
    /// `target` when it should win. `defaults` is the default instance of the
    /// concrete type being merged.
    fn merge(&self, target: &mut T, source: &T, defaults: &T);

    /// Whether merging `current` onto `base` would change this field.
    fn differs(&self, base: &T, current: &T, defaults: &T) -> bool;

    /// Overwrite `target`'s value with `source`'s.
    fn copy(&self, target: &mut T, source: &T);

    /// Make the field absent.
    fn clear(&self, target: &mut T);

    /// JSON rendering of the field (`null` when absent).
    fn value(&self, obj: &T) -> Result<Value, serde_json::Error>;

    /// Assign the field from a JSON value (`null` makes it absent).
    fn set_value(&self, target: &mut T, value: Value) -> Result<(), serde_json::Error>;
}

/// The merge predicate: does `incoming` replace `current`?
///
/// An absent value always yields to a present one. Otherwise `incoming` wins
/// only when it differs from `current` and is not the default.
pub(crate) fn overrides<V: PartialEq>(
    current: &Option<V>,
    incoming: &Option<V>,
    default: &Option<V>,
) -> bool {
    match (current, incoming) {
        (None, Some(_)) => true,
        (None, None) => false,
        (Some(_), _) => current != incoming && incoming != default,
    }
}

/// A primitive, string, or other opaque value field.
pub struct Leaf<T, V> {
    name: &'static str,
    key: Option<&'static str>,
    get: fn(&T) -> &Option<V>,
    get_mut: fn(&mut T) -> &mut Option<V>,
}

impl<T, V> Leaf<T, V> {
    pub fn new(
        name: &'static str,
        get: fn(&T) -> &Option<V>,
        get_mut: fn(&mut T) -> &mut Option<V>,
    ) -> Self {
        Self {
            name,
            key: None,
            get,
            get_mut,
        }
    }

    /// Serialize under `key` instead of the field name.
    pub fn with_key(mut self, key: &'static str) -> Self {
        self.key = Some(key);
        self
    }
}

impl<T, V> Field<T> for Leaf<T, V>
where
    V: Clone + PartialEq + Serialize + DeserializeOwned,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn key(&self) -> &'static str {
        self.key.unwrap_or(self.name)
    }

    fn is_set(&self, obj: &T) -> bool {
        (self.get)(obj).is_some()
    }

    fn merge(&self, target: &mut T, source: &T, defaults: &T) {
        let incoming = (self.get)(source);
        if overrides((self.get)(target), incoming, (self.get)(defaults)) {
            *(self.get_mut)(target) = incoming.clone();
        }
    }

    fn differs(&self, base: &T, current: &T, defaults: &T) -> bool {
        overrides((self.get)(base), (self.get)(current), (self.get)(defaults))
    }

    fn copy(&self, target: &mut T, source: &T) {
        *(self.get_mut)(target) = (self.get)(source).clone();
    }

    fn clear(&self, target: &mut T) {
        *(self.get_mut)(target) = None;
    }

    fn value(&self, obj: &T) -> Result<Value, serde_json::Error> {
        serde_json::to_value((self.get)(obj))
    }

    fn set_value(&self, target: &mut T, value: Value) -> Result<(), serde_json::Error> {
        *(self.get_mut)(target) = serde_json::from_value(value)?;
        Ok(())
    }
}

/// A field whose value is itself a [`ConfigType`]; merged and diffed
/// recursively.
pub struct Nested<T, N> {
    name: &'static str,
    key: Option<&'static str>,
    get: fn(&T) -> &Option<N>,
    get_mut: fn(&mut T) -> &mut Option<N>,
}

impl<T, N> Nested<T, N> {
    pub fn new(
        name: &'static str,
        get: fn(&T) -> &Option<N>,
        get_mut: fn(&mut T) -> &mut Option<N>,
    ) -> Self {
        Self {
            name,
            key: None,
            get,
            get_mut,
        }
    }

    /// Serialize under `key` instead of the field name.
    pub fn with_key(mut self, key: &'static str) -> Self {
        self.key = Some(key);
        self
    }
}

/// The defaults a nested value is merged against: the parent default's own
/// nested value when it sets one, the nested type's default otherwise.
fn nested_defaults<N: ConfigType>(parent_default: &Option<N>) -> N {
    parent_default.clone().unwrap_or_default()
}

impl<T, N> Field<T> for Nested<T, N>
where
    N: ConfigType + Serialize + DeserializeOwned,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn key(&self) -> &'static str {
        self.key.unwrap_or(self.name)
    }

    fn is_set(&self, obj: &T) -> bool {
        (self.get)(obj).is_some()
    }

    fn merge(&self, target: &mut T, source: &T, defaults: &T) {
        let incoming = (self.get)(source);
        let default = (self.get)(defaults);
        let slot = (self.get_mut)(target);
        match incoming {
            Some(value) => match slot.as_mut() {
                Some(current) => {
                    crate::merge::merge_with_defaults(current, value, &nested_defaults(default))
                }
                None => *slot = Some(value.clone()),
            },
            // An absent value only wins over a present default.
            None => {
                if slot.is_some() && default.is_some() {
                    *slot = None;
                }
            }
        }
    }

    fn differs(&self, base: &T, current: &T, defaults: &T) -> bool {
        let default = (self.get)(defaults);
        match ((self.get)(base), (self.get)(current)) {
            (None, None) => false,
            (None, Some(_)) => true,
            (Some(_), None) => default.is_some(),
            (Some(base), Some(current)) => {
                let defaults = nested_defaults(default);
                let fields = N::fields();
                fields
                    .iter()
                    .any(|field| field.differs(base, current, &defaults))
            }
        }
    }

    fn copy(&self, target: &mut T, source: &T) {
        *(self.get_mut)(target) = (self.get)(source).clone();
    }

    fn clear(&self, target: &mut T) {
        *(self.get_mut)(target) = None;
    }

    fn value(&self, obj: &T) -> Result<Value, serde_json::Error> {
        serde_json::to_value((self.get)(obj))
    }

    fn set_value(&self, target: &mut T, value: Value) -> Result<(), serde_json::Error> {
        *(self.get_mut)(target) = serde_json::from_value(value)?;
        Ok(())
    }
}

/// The ordered field table of a configuration type.
pub struct FieldSet<T> {
    fields: Vec<Box<dyn Field<T>>>,
}

impl<T: 'static> FieldSet<T> {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Append any field implementation.
    pub fn with(mut self, field: impl Field<T> + 'static) -> Self {
        self.fields.push(Box::new(field));
        self
    }

    /// Append a value field.
    pub fn leaf<V>(
        self,
        name: &'static str,
        get: fn(&T) -> &Option<V>,
        get_mut: fn(&mut T) -> &mut Option<V>,
    ) -> Self
    where
        V: Clone + PartialEq + Serialize + DeserializeOwned + 'static,
    {
        self.with(Leaf::new(name, get, get_mut))
    }

    /// Append a nested configuration field.
    pub fn nested<N>(
        self,
        name: &'static str,
        get: fn(&T) -> &Option<N>,
        get_mut: fn(&mut T) -> &mut Option<N>,
    ) -> Self
    where
        N: ConfigType + Serialize + DeserializeOwned,
    {
        self.with(Nested::new(name, get, get_mut))
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Field<T>> {
        self.fields.iter().map(|field| field.as_ref())
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|field| field.name()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&dyn Field<T>> {
        self.iter().find(|field| field.name() == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<T: 'static> Default for FieldSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> fmt::Debug for FieldSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Implement [`ConfigType`] for a struct from its list of fields.
///
/// Plain fields are listed by name; fields holding another `ConfigType` are
/// marked `as nested`. A field serde renames takes its serialized key after
/// `=`, as in `connection_string = "connection-string"`. Every listed field
/// must be an `Option<_>`.
#[macro_export]
macro_rules! config_fields {
    ($ty:ty { $($field:ident $(as $kind:ident)? $(= $key:literal)?),* $(,)? }) => {
        impl $crate::field::ConfigType for $ty {
            fn fields() -> $crate::field::FieldSet<Self> {
                $crate::field::FieldSet::new()
                    $( .with(
                        $crate::config_fields!(@field $field $(as $kind)?)
                            $(.with_key($key))?
                    ) )*
            }
        }
    };
    (@field $field:ident) => {
        $crate::field::Leaf::new(
            stringify!($field),
            |c: &Self| &c.$field,
            |c: &mut Self| &mut c.$field,
        )
    };
    (@field $field:ident as nested) => {
        $crate::field::Nested::new(
            stringify!($field),
            |c: &Self| &c.$field,
            |c: &mut Self| &mut c.$field,
        )
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Limits {
        max: Option<u32>,
    }

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Job {
        name: Option<String>,
        retries: Option<u32>,
        limits: Option<Limits>,
    }

    crate::config_fields!(Limits { max });
    crate::config_fields!(Job { name, retries, limits as nested });

    #[test]
    fn macro_lists_fields_in_order() {
        assert_eq!(Job::field_names(), vec!["name", "retries", "limits"]);
        assert_eq!(Job::fields().len(), 3);
        assert!(Job::fields().contains("limits"));
        assert!(!Job::fields().contains("missing"));
    }

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "kebab-case")]
    struct Renamed {
        retry_count: Option<u32>,
        limits: Option<Limits>,
    }

    crate::config_fields!(Renamed {
        retry_count = "retry-count",
        limits as nested,
    });

    #[test]
    fn serialized_keys_default_to_names() {
        let fields = Renamed::fields();
        assert_eq!(fields.names(), vec!["retry_count", "limits"]);
        assert_eq!(fields.get("retry_count").unwrap().key(), "retry-count");
        assert_eq!(fields.get("limits").unwrap().key(), "limits");
        assert!(fields.get("retry-count").is_none());
    }

    #[test]
    fn hand_written_table_matches_macro() {
        let fields = FieldSet::<Job>::new()
            .leaf("name", |c: &Job| &c.name, |c: &mut Job| &mut c.name)
            .nested("limits", |c: &Job| &c.limits, |c: &mut Job| &mut c.limits);
        assert_eq!(fields.names(), vec!["name", "limits"]);
        assert_eq!(format!("{fields:?}"), r#"["name", "limits"]"#);
    }

    #[test]
    fn value_and_set_value_use_json() {
        let fields = Job::fields();
        let retries = fields.get("retries").unwrap();
        let mut job = Job::default();

        assert_eq!(retries.value(&job).unwrap(), Value::Null);
        retries.set_value(&mut job, json!(3)).unwrap();
        assert_eq!(job.retries, Some(3));
        assert!(retries.is_set(&job));

        let limits = fields.get("limits").unwrap();
        limits.set_value(&mut job, json!({"max": 9})).unwrap();
        assert_eq!(job.limits, Some(Limits { max: Some(9) }));
        assert_eq!(limits.value(&job).unwrap(), json!({"max": 9}));

        retries.set_value(&mut job, Value::Null).unwrap();
        assert_eq!(job.retries, None);
    }

    #[test]
    fn set_value_rejects_wrong_type() {
        let fields = Job::fields();
        let mut job = Job::default();
        assert!(fields
            .get("retries")
            .unwrap()
            .set_value(&mut job, json!("lots"))
            .is_err());
        assert_eq!(job.retries, None);
    }

    #[test]
    fn copy_and_clear() {
        let fields = Job::fields();
        let name = fields.get("name").unwrap();
        let source = Job {
            name: Some("build".into()),
            ..Job::default()
        };
        let mut target = Job::default();
        name.copy(&mut target, &source);
        assert_eq!(target.name.as_deref(), Some("build"));
        name.clear(&mut target);
        assert!(!name.is_set(&target));
    }

    #[test]
    fn override_predicate() {
        let d: Option<u32> = Some(1);
        assert!(overrides(&None, &Some(1), &d));
        assert!(!overrides(&None::<u32>, &None, &d));
        assert!(!overrides(&Some(5), &Some(1), &d));
        assert!(overrides(&Some(5), &Some(7), &d));
        assert!(!overrides(&Some(5), &Some(5), &d));
        assert!(overrides(&Some(5), &None, &d));
        assert!(!overrides(&Some(5), &None, &None));
    }
}
