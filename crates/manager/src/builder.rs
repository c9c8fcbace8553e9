//! Builder for [`ConfigManager`].

use crate::manager::ConfigManager;
use crate::policy::{Pins, SerializePolicy};
use layerconf_core::{ConfigSource, ConfigType, Result, Validator};

/// Collects sources, validators and serialization pins, then loads the stack.
///
/// ```
/// use layerconf_core::{config_fields, RuleBasedValidator};
/// use layerconf_manager::ConfigManager;
/// use layerconf_sources::MemorySource;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
/// struct App {
///     name: Option<String>,
///     workers: Option<u32>,
/// }
///
/// config_fields!(App { name, workers });
///
/// let defaults = MemorySource::new(App { name: Some("app".into()), workers: Some(4) });
/// let user = MemorySource::new(App { name: None, workers: Some(8) });
///
/// let manager = ConfigManager::builder()
///     .source(defaults)
///     .source(user)
///     .validator(RuleBasedValidator::new().rule("workers", |a: &App| a.workers != Some(0)))
///     .build()
///     .unwrap();
///
/// assert_eq!(manager.out().workers, Some(8));
/// assert_eq!(manager.out().name.as_deref(), Some("app"));
/// ```
pub struct ConfigManagerBuilder<T: ConfigType> {
    sources: Vec<Box<dyn ConfigSource<T>>>,
    validators: Vec<Box<dyn Validator<T>>>,
    pins: Vec<(String, SerializePolicy)>,
}

impl<T: ConfigType> ConfigManagerBuilder<T> {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            validators: Vec::new(),
            pins: Vec::new(),
        }
    }

    /// Append a source. Later sources take precedence.
    pub fn source(mut self, source: impl ConfigSource<T> + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    /// Append a source that is already boxed, such as one picked at runtime.
    pub fn boxed_source(mut self, source: Box<dyn ConfigSource<T>>) -> Self {
        self.sources.push(source);
        self
    }

    pub fn sources(mut self, sources: impl IntoIterator<Item = Box<dyn ConfigSource<T>>>) -> Self {
        self.sources.extend(sources);
        self
    }

    pub fn validator(mut self, validator: impl Validator<T> + 'static) -> Self {
        self.validators.push(Box::new(validator));
        self
    }

    pub fn pin(mut self, field: impl Into<String>, policy: SerializePolicy) -> Self {
        self.pins.push((field.into(), policy));
        self
    }

    pub fn always_serialize(self, field: impl Into<String>) -> Self {
        self.pin(field, SerializePolicy::Always)
    }

    pub fn never_serialize(self, field: impl Into<String>) -> Self {
        self.pin(field, SerializePolicy::Never)
    }

    /// Resolve the pins, then load every source and produce the manager.
    /// A pin naming an unknown field fails before any source is read.
    pub fn build(self) -> Result<ConfigManager<T>> {
        let mut pins = Pins::default();
        for (field, policy) in &self.pins {
            pins.pin::<T>(field, *policy)?;
        }
        ConfigManager::load(self.sources, &self.validators, pins)
    }
}

impl<T: ConfigType> Default for ConfigManagerBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}
