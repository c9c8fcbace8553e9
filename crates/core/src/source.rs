//! Source trait: one layer of the configuration stack.
//!
//! A source supplies one partially-populated configuration object and knows
//! how to persist changes back. Implementations: file-backed (TOML / JSON),
//! in-memory (for testing and programmatic layers).

use crate::error::SourceError;
use crate::field::ConfigType;

/// Flags describing how the manager treats a source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceFlags {
    /// The save-back destination. At most one per stack; defaults to the last.
    pub primary: bool,
    /// An absent object is a configuration error instead of a no-op.
    pub required: bool,
    /// The backing store outlives the process; the manager reloads it after
    /// saving.
    pub persistent: bool,
    /// Saves are refused.
    pub read_only: bool,
}

/// The core ConfigSource trait.
pub trait ConfigSource<T: ConfigType> {
    /// Human-readable name for logging and errors (e.g. a file path).
    fn name(&self) -> String;

    fn flags(&self) -> SourceFlags;

    /// The source's object, loaded on first access and cached.
    /// `None` when the source has nothing to contribute.
    fn config(&mut self) -> Result<Option<T>, SourceError>;

    /// Drop the cached object so the next [`config`](Self::config) reloads.
    fn invalidate(&mut self);

    /// Overwrite the stored object with `obj`.
    fn save(&mut self, obj: &T) -> Result<(), SourceError>;

    /// Persist only `fields` of `obj`; every other stored field is kept as is.
    fn partial_save(&mut self, obj: &T, fields: &[&str]) -> Result<(), SourceError>;

    fn is_primary(&self) -> bool {
        self.flags().primary
    }

    fn is_required(&self) -> bool {
        self.flags().required
    }

    fn is_persistent(&self) -> bool {
        self.flags().persistent
    }

    fn is_read_only(&self) -> bool {
        self.flags().read_only
    }
}
