//! # layerconf manager
//!
//! Loads an ordered stack of [`ConfigSource`](layerconf_core::ConfigSource)s,
//! merges them into one output object and saves edits back to the primary
//! source as a minimal delta.
//!
//! Precedence follows source order: later sources override earlier ones,
//! whichever source is primary. The primary source only decides where saves
//! go and what Base (the merge of all other sources) excludes.

pub mod builder;
pub mod manager;
pub mod policy;

pub use builder::ConfigManagerBuilder;
pub use manager::ConfigManager;
pub use policy::SerializePolicy;
