//! The configuration manager: owns the source stack and the merged output.
//!
//! Construction loads every source once, merges them in order onto a default
//! instance and validates the result. Afterwards the caller edits the merged
//! object (`Out`) through [`ConfigManager::out_mut`] and saves back only what
//! changed relative to Base, the merge of every non-primary source.

use crate::builder::ConfigManagerBuilder;
use crate::policy::{Pins, SerializePolicy};
use layerconf_core::{
    changed_fields, changes_by_name, default_of, merge_with, unchanged_fields, ChangeSet,
    ConfigSource, ConfigType, Error, Result, Validator,
};
use layerconf_sources::FileSource;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use tracing::{debug, info, warn};

/// Layered configuration over an ordered stack of sources.
pub struct ConfigManager<T: ConfigType> {
    sources: Vec<Box<dyn ConfigSource<T>>>,
    primary: usize,
    out: T,
    pins: Pins,
}

/// Index of the primary source: the single flagged one, else the last.
fn select_primary<T: ConfigType>(sources: &[Box<dyn ConfigSource<T>>]) -> Result<usize> {
    let flagged: Vec<usize> = sources
        .iter()
        .enumerate()
        .filter(|(_, source)| source.is_primary())
        .map(|(index, _)| index)
        .collect();
    match flagged.as_slice() {
        [] => Ok(sources.len() - 1),
        [index] => Ok(*index),
        _ => Err(Error::MultiplePrimarySources { indices: flagged }),
    }
}

impl<T: ConfigType> ConfigManager<T> {
    /// Load `sources` without validators or pins.
    pub fn new(sources: Vec<Box<dyn ConfigSource<T>>>) -> Result<Self> {
        Self::builder().sources(sources).build()
    }

    pub fn builder() -> ConfigManagerBuilder<T> {
        ConfigManagerBuilder::new()
    }

    pub(crate) fn load(
        mut sources: Vec<Box<dyn ConfigSource<T>>>,
        validators: &[Box<dyn Validator<T>>],
        pins: Pins,
    ) -> Result<Self> {
        if sources.is_empty() {
            return Err(Error::NoSources);
        }
        let primary = select_primary(&sources)?;
        let last = sources.len() - 1;
        debug!(
            count = sources.len(),
            primary,
            source = %sources[primary].name(),
            "Primary source selected"
        );

        let mut out = default_of::<T>();
        for (index, source) in sources.iter_mut().enumerate() {
            let name = source.name();
            match source.config()? {
                Some(obj) => {
                    merge_with(&mut out, &obj);
                    debug!(source = %name, index, "Source merged");
                }
                None if source.is_required() => {
                    return Err(Error::RequiredSourceMissing { source_name: name });
                }
                None => info!(source = %name, index, "Source is absent, skipping"),
            }

            for validator in validators {
                if let Err(err) = validator.validate(&out) {
                    if index == last {
                        return Err(err.into());
                    }
                    warn!(
                        source = %name,
                        index,
                        rule = err.rule.as_deref().unwrap_or("-"),
                        error = %err,
                        "Validation failed on intermediate merge"
                    );
                }
            }
        }

        info!(count = sources.len(), primary, "Configuration loaded");
        Ok(Self {
            sources,
            primary,
            out,
            pins,
        })
    }

    /// The merged configuration.
    pub fn out(&self) -> &T {
        &self.out
    }

    /// Mutable access to the merged configuration; edits are what
    /// [`save_changes`](Self::save_changes) persists.
    pub fn out_mut(&mut self) -> &mut T {
        &mut self.out
    }

    pub fn into_out(self) -> T {
        self.out
    }

    pub fn primary_index(&self) -> usize {
        self.primary
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    pub fn source_name(&self, index: usize) -> Result<String> {
        self.sources
            .get(index)
            .map(|source| source.name())
            .ok_or(Error::UnknownSource {
                index,
                count: self.sources.len(),
            })
    }

    /// The merge of every non-primary source, re-read on each call.
    pub fn base(&mut self) -> Result<T> {
        let mut base = default_of::<T>();
        for (index, source) in self.sources.iter_mut().enumerate() {
            if index == self.primary {
                continue;
            }
            if let Some(obj) = source.config()? {
                merge_with(&mut base, &obj);
            }
        }
        Ok(base)
    }

    /// Fields of `Out` that differ from Base.
    pub fn changed_fields(&mut self) -> Result<Vec<&'static str>> {
        let base = self.base()?;
        Ok(changed_fields(&base, &self.out))
    }

    pub fn unchanged_fields(&mut self) -> Result<Vec<&'static str>> {
        let base = self.base()?;
        Ok(unchanged_fields(&base, &self.out))
    }

    /// What the primary source contributes over Base, updated by any edits
    /// made to `Out` since loading.
    pub fn changes_by_name(&mut self) -> Result<ChangeSet> {
        let base = self.base()?;
        let mut report = ChangeSet::new();
        if let Some(primary) = self.sources[self.primary].config()? {
            report.extend(changes_by_name(&base, &primary)?);
        }
        report.extend(changes_by_name(&base, &self.out)?);
        Ok(report)
    }

    /// The fields a save would write: changed fields plus `Always` pins,
    /// minus `Never` pins.
    pub fn save_delta(&mut self) -> Result<Vec<&'static str>> {
        let changed = self.changed_fields()?;
        let delta = self.pins.apply::<T>(&changed);
        debug!(changed = ?changed, delta = ?delta, "Save delta computed");
        Ok(delta)
    }

    /// Persist the save delta to the primary source.
    pub fn save_changes(&mut self) -> Result<Vec<&'static str>> {
        self.save_changes_to(self.primary)
    }

    /// Persist the save delta to the source at `index`. Returns the fields
    /// written.
    pub fn save_changes_to(&mut self, index: usize) -> Result<Vec<&'static str>> {
        let count = self.sources.len();
        let source = self
            .sources
            .get(index)
            .ok_or(Error::UnknownSource { index, count })?;
        if source.is_read_only() {
            return Err(Error::ReadOnlySource {
                source_name: source.name(),
            });
        }

        let delta = self.save_delta()?;
        let source = &mut self.sources[index];
        source.partial_save(&self.out, &delta)?;
        info!(source = %source.name(), index, fields = ?delta, "Changes saved");
        if source.is_persistent() {
            source.invalidate();
        }
        Ok(delta)
    }

    pub fn pin_field(&mut self, field: &str, policy: SerializePolicy) -> Result<()> {
        self.pins.pin::<T>(field, policy)
    }

    pub fn always_serialize(&mut self, field: &str) -> Result<()> {
        self.pin_field(field, SerializePolicy::Always)
    }

    pub fn never_serialize(&mut self, field: &str) -> Result<()> {
        self.pin_field(field, SerializePolicy::Never)
    }

    /// Remove a pin; returns the policy it had, if any.
    pub fn unpin_field(&mut self, field: &str) -> Result<Option<SerializePolicy>> {
        self.pins.unpin::<T>(field)
    }

    /// Drop every source cache; the next query re-reads them.
    pub fn invalidate_sources(&mut self) {
        for source in &mut self.sources {
            source.invalidate();
        }
    }

    /// Change tracking is always on; this is a no-op.
    pub fn enable_change_tracking(&mut self) {}

    /// Fails: change tracking cannot be turned off once a manager exists.
    pub fn disable_change_tracking(&mut self) -> Result<()> {
        Err(Error::ChangeTrackingLocked)
    }
}

impl<T: ConfigType> fmt::Debug for ConfigManager<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sources: Vec<String> = self.sources.iter().map(|source| source.name()).collect();
        f.debug_struct("ConfigManager")
            .field("sources", &sources)
            .field("primary", &self.primary)
            .field("out", &self.out)
            .field("pins", &self.pins)
            .finish()
    }
}

impl<T> ConfigManager<T>
where
    T: ConfigType + Serialize + DeserializeOwned,
{
    /// Load one [`FileSource`] per path, in order; the last is primary.
    pub fn from_paths<P: AsRef<Path>>(paths: impl IntoIterator<Item = P>) -> Result<Self> {
        let sources = paths
            .into_iter()
            .map(|path| {
                Box::new(FileSource::<T>::new(path.as_ref().to_path_buf()))
                    as Box<dyn ConfigSource<T>>
            })
            .collect();
        Self::new(sources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use layerconf_core::{ErrorKind, RuleBasedValidator, SourceError, SourceFlags};
    use layerconf_sources::MemorySource;
    use serde::Deserialize;
    use serde_json::json;
    use std::cell::Cell;
    use std::rc::Rc;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    struct Person {
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        age: Option<u32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        occupation: Option<String>,
    }

    impl Default for Person {
        fn default() -> Self {
            Self {
                name: None,
                age: None,
                occupation: Some("Unemployed".into()),
            }
        }
    }

    layerconf_core::config_fields!(Person { name, age, occupation });

    fn person(name: Option<&str>, age: Option<u32>, occupation: Option<&str>) -> Person {
        Person {
            name: name.map(Into::into),
            age,
            occupation: occupation.map(Into::into),
        }
    }

    fn boxed(source: MemorySource<Person>) -> Box<dyn ConfigSource<Person>> {
        Box::new(source)
    }

    /// S1, S2 (primary), S3 -- the primary is not last.
    fn primary_in_middle(s3_age: Option<u32>) -> ConfigManager<Person> {
        ConfigManager::builder()
            .source(MemorySource::new(person(Some("Matthew"), Some(10), None)))
            .source(MemorySource::new(person(Some("Fred"), None, Some("Homeless"))).primary())
            .source(MemorySource::new(person(None, s3_age, Some("Awesome"))))
            .build()
            .unwrap()
    }

    #[test]
    fn no_sources_is_configuration_error() {
        let err = ConfigManager::<Person>::new(Vec::new()).unwrap_err();
        assert!(matches!(err, Error::NoSources));
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn multiple_primary_sources_are_rejected() {
        let err = ConfigManager::new(vec![
            boxed(MemorySource::new(Person::default()).primary()),
            boxed(MemorySource::new(Person::default())),
            boxed(MemorySource::new(Person::default()).primary()),
        ])
        .unwrap_err();
        assert!(matches!(err, Error::MultiplePrimarySources { indices } if indices == vec![0, 2]));
    }

    #[test]
    fn last_source_is_primary_by_default() {
        let manager = ConfigManager::new(vec![
            boxed(MemorySource::new(Person::default()).named("first")),
            boxed(MemorySource::new(Person::default()).named("second")),
        ])
        .unwrap();
        assert_eq!(manager.primary_index(), 1);
        assert_eq!(manager.source_count(), 2);
        assert_eq!(manager.source_name(1).unwrap(), "second");
        assert!(matches!(
            manager.source_name(5),
            Err(Error::UnknownSource { index: 5, count: 2 })
        ));
    }

    #[test]
    fn primary_not_last_merges_in_order() {
        let manager = primary_in_middle(None);
        assert_eq!(manager.primary_index(), 1);
        assert_eq!(
            manager.out(),
            &person(Some("Fred"), Some(10), Some("Awesome"))
        );
    }

    #[test]
    fn single_absent_source_yields_default() {
        let manager = ConfigManager::new(vec![boxed(MemorySource::empty())]).unwrap();
        assert_eq!(manager.into_out(), Person::default());
    }

    #[test]
    fn absent_required_source_is_error() {
        let err = ConfigManager::new(vec![boxed(
            MemorySource::empty().named("required.toml").required(),
        )])
        .unwrap_err();
        assert!(
            matches!(err, Error::RequiredSourceMissing { ref source_name } if source_name == "required.toml")
        );
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn base_excludes_primary() {
        let mut manager = primary_in_middle(None);
        assert_eq!(
            manager.base().unwrap(),
            person(Some("Matthew"), Some(10), Some("Awesome"))
        );
    }

    #[test]
    fn save_writes_only_the_delta() {
        let primary = MemorySource::new(person(Some("Timothy"), Some(20), None)).primary();
        let secondary = MemorySource::new(person(Some("Fred"), None, None));
        let mut manager = ConfigManager::builder()
            .source(primary.clone())
            .source(secondary)
            .build()
            .unwrap();

        manager.out_mut().age = Some(88);
        assert_eq!(manager.save_delta().unwrap(), vec!["age"]);
        assert_eq!(manager.save_changes().unwrap(), vec!["age"]);

        assert_eq!(primary.save_count(), 1);
        assert_eq!(primary.current(), Some(person(Some("Timothy"), Some(88), None)));
    }

    #[test]
    fn changed_and_unchanged_partition_fields() {
        let mut manager = primary_in_middle(None);
        let changed = manager.changed_fields().unwrap();
        let unchanged = manager.unchanged_fields().unwrap();
        assert_eq!(changed, vec!["name"]);
        assert_eq!(unchanged, vec!["age", "occupation"]);
    }

    #[test]
    fn changes_by_name_reports_primary_contribution() {
        let mut manager = primary_in_middle(None);
        let changes = manager.changes_by_name().unwrap();
        assert_eq!(serde_json::to_value(changes).unwrap(), json!({"name": "Fred", "occupation": "Homeless"}));
    }

    #[test]
    fn changes_by_name_reflects_edits_to_out() {
        let mut manager = primary_in_middle(Some(30));
        manager.out_mut().occupation = Some("Cool".into());
        let changes = manager.changes_by_name().unwrap();
        assert_eq!(serde_json::to_value(changes).unwrap(), json!({"name": "Fred", "occupation": "Cool"}));
    }

    #[test]
    fn always_pin_adds_unchanged_field() {
        let mut manager = primary_in_middle(None);
        manager.always_serialize("age").unwrap();
        assert_eq!(manager.save_delta().unwrap(), vec!["name", "age"]);
    }

    #[test]
    fn never_pin_removes_changed_field() {
        let mut manager = primary_in_middle(None);
        manager.never_serialize("name").unwrap();
        assert!(manager.save_delta().unwrap().is_empty());

        assert_eq!(manager.unpin_field("name").unwrap(), Some(SerializePolicy::Never));
        assert_eq!(manager.save_delta().unwrap(), vec!["name"]);
    }

    #[test]
    fn builder_pins_are_applied() {
        let mut manager = ConfigManager::builder()
            .source(MemorySource::new(person(Some("Fred"), None, Some("Unemployed"))))
            .always_serialize("occupation")
            .build()
            .unwrap();
        assert_eq!(manager.save_delta().unwrap(), vec!["name", "occupation"]);
    }

    #[test]
    fn pinning_unknown_field_is_usage_error() {
        let mut manager = primary_in_middle(None);
        let err = manager.pin_field("height", SerializePolicy::Always).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Usage);

        let err = ConfigManager::builder()
            .source(MemorySource::new(Person::default()))
            .never_serialize("height")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::UnknownField { field } if field == "height"));
    }

    #[test]
    fn disabling_change_tracking_fails() {
        let mut manager = primary_in_middle(None);
        manager.enable_change_tracking();
        let err = manager.disable_change_tracking().unwrap_err();
        assert!(matches!(err, Error::ChangeTrackingLocked));
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn save_to_read_only_source_is_rejected() {
        let locked = MemorySource::new(person(Some("Fred"), None, None)).read_only();
        let mut manager = ConfigManager::builder()
            .source(locked.clone().named("locked"))
            .build()
            .unwrap();
        manager.out_mut().age = Some(1);
        let err = manager.save_changes().unwrap_err();
        assert!(matches!(err, Error::ReadOnlySource { ref source_name } if source_name == "locked"));
        assert_eq!(locked.save_count(), 0);
    }

    #[test]
    fn save_to_unknown_index_is_rejected() {
        let mut manager = primary_in_middle(None);
        let err = manager.save_changes_to(3).unwrap_err();
        assert!(matches!(err, Error::UnknownSource { index: 3, count: 3 }));
    }

    #[test]
    fn save_to_explicit_source() {
        let first = MemorySource::new(person(Some("Matthew"), None, None));
        let mut manager = ConfigManager::builder()
            .source(first.clone())
            .source(MemorySource::new(person(None, Some(40), None)))
            .build()
            .unwrap();
        manager.out_mut().name = Some("Fred".into());
        manager.save_changes_to(0).unwrap();
        assert_eq!(first.current().unwrap().name.as_deref(), Some("Fred"));
    }

    #[test]
    fn final_validation_failure_is_fatal() {
        let err = ConfigManager::builder()
            .source(MemorySource::new(person(None, Some(10), None)))
            .validator(RuleBasedValidator::new().rule("adults_only", |p: &Person| p.age.unwrap_or(0) >= 18))
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(matches!(err, Error::Validation(ref v) if v.rule.as_deref() == Some("adults_only")));
    }

    #[test]
    fn intermediate_validation_failure_is_not_fatal() {
        let manager = ConfigManager::builder()
            .source(MemorySource::new(person(None, Some(10), None)))
            .source(MemorySource::new(person(None, Some(30), None)))
            .validator(RuleBasedValidator::new().rule("adults_only", |p: &Person| p.age.unwrap_or(0) >= 18))
            .build()
            .unwrap();
        assert_eq!(manager.out().age, Some(30));
    }

    #[derive(Default)]
    struct Counters {
        loads: Cell<usize>,
        invalidations: Cell<usize>,
    }

    struct CountingSource {
        inner: MemorySource<Person>,
        counters: Rc<Counters>,
        persistent: bool,
    }

    impl ConfigSource<Person> for CountingSource {
        fn name(&self) -> String {
            "counting".into()
        }

        fn flags(&self) -> SourceFlags {
            SourceFlags {
                persistent: self.persistent,
                ..SourceFlags::default()
            }
        }

        fn config(&mut self) -> std::result::Result<Option<Person>, SourceError> {
            self.counters.loads.set(self.counters.loads.get() + 1);
            self.inner.config()
        }

        fn invalidate(&mut self) {
            let invalidations = &self.counters.invalidations;
            invalidations.set(invalidations.get() + 1);
        }

        fn save(&mut self, obj: &Person) -> std::result::Result<(), SourceError> {
            self.inner.save(obj)
        }

        fn partial_save(&mut self, obj: &Person, fields: &[&str]) -> std::result::Result<(), SourceError> {
            self.inner.partial_save(obj, fields)
        }
    }

    fn counting(persistent: bool) -> (CountingSource, Rc<Counters>) {
        let counters = Rc::new(Counters::default());
        let source = CountingSource {
            inner: MemorySource::new(Person::default()),
            counters: Rc::clone(&counters),
            persistent,
        };
        (source, counters)
    }

    #[test]
    fn persistent_source_is_invalidated_after_save() {
        let (source, counters) = counting(true);
        let mut manager = ConfigManager::builder().source(source).build().unwrap();
        manager.save_changes().unwrap();
        assert_eq!(counters.invalidations.get(), 1);
    }

    #[test]
    fn transient_source_is_not_invalidated_after_save() {
        let (source, counters) = counting(false);
        let mut manager = ConfigManager::builder().source(source).build().unwrap();
        manager.save_changes().unwrap();
        assert_eq!(counters.invalidations.get(), 0);

        manager.invalidate_sources();
        assert_eq!(counters.invalidations.get(), 1);
    }

    #[test]
    fn unknown_pin_fails_before_sources_are_read() {
        let (source, counters) = counting(true);
        let err = ConfigManager::builder()
            .boxed_source(Box::new(source))
            .always_serialize("height")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::UnknownField { field } if field == "height"));
        assert_eq!(counters.loads.get(), 0);
    }

    #[test]
    fn boxed_sources_load_like_plain_ones() {
        let (source, counters) = counting(false);
        let manager = ConfigManager::builder()
            .boxed_source(boxed(MemorySource::new(person(Some("Fred"), None, None))))
            .boxed_source(Box::new(source))
            .build()
            .unwrap();
        assert_eq!(manager.source_count(), 2);
        assert_eq!(manager.source_name(1).unwrap(), "counting");
        assert_eq!(manager.out().name.as_deref(), Some("Fred"));
        assert_eq!(counters.loads.get(), 1);
    }

    #[test]
    fn source_errors_are_propagated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ nope").unwrap();
        let err = ConfigManager::<Person>::from_paths([&path]).err().unwrap();
        assert!(matches!(err, Error::Source(SourceError::Parse { format: "json", .. })));
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn from_paths_round_trip_preserves_unnamed_fields() {
        let dir = TempDir::new().unwrap();
        let defaults = dir.path().join("defaults.toml");
        let user = dir.path().join("user.toml");
        std::fs::write(&defaults, "name = \"Fred\"\n").unwrap();
        std::fs::write(&user, "name = \"Timothy\"\nage = 20\n").unwrap();

        let mut manager = ConfigManager::<Person>::from_paths([&defaults, &user]).unwrap();
        assert_eq!(manager.out().name.as_deref(), Some("Timothy"));
        manager.out_mut().age = Some(88);
        manager.save_changes().unwrap();

        let text = std::fs::read_to_string(&user).unwrap();
        let saved: Person = toml_from(&text);
        assert_eq!(saved.name.as_deref(), Some("Timothy"));
        assert_eq!(saved.age, Some(88));
        assert_eq!(std::fs::read_to_string(&defaults).unwrap(), "name = \"Fred\"\n");
    }

    fn toml_from(text: &str) -> Person {
        use layerconf_core::PartialSerializer;
        layerconf_sources::TomlSerializer
            .deserialize(&mut text.as_bytes())
            .unwrap()
    }
}
