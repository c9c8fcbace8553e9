//! # layerconf core
//!
//! The merge and change-tracking engine, plus the capability traits the
//! configuration manager depends on.
//!
//! ## Design Philosophy
//!
//! Configuration types describe their fields once in a [`FieldSet`]; every
//! field is an `Option`, so "absent" is always distinguishable from "set".
//! Merging and diffing are default-aware: a value equal to the type's default
//! instance never overrides an explicit one.
//!
//! Collaborators are traits defined here and implemented elsewhere:
//! - [`ConfigSource`]: one layer of the stack
//! - [`PartialSerializer`]: byte format with field-subset output
//! - [`Validator`]: optional pre-check on loaded objects

pub mod error;
pub mod field;
pub mod probe;
pub mod merge;
pub mod tracker;
pub mod patch;
pub mod source;
pub mod serializer;
pub mod validation;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ErrorKind, Result, SourceError, ValidationError};
pub use field::{ConfigType, Field, FieldSet, Leaf, Nested};
pub use probe::{customized_fields, default_of};
pub use merge::{merge, merge_optional, merge_seeded, merge_with, merge_with_defaults, MergeAll, MergeWith};
pub use tracker::{changed_fields, changes_by_name, field_statuses, unchanged_fields, ChangeSet, FieldStatus};
pub use patch::{blank, copy_fields, patch};
pub use source::{ConfigSource, SourceFlags};
pub use serializer::PartialSerializer;
pub use validation::{RuleBasedValidator, Validator};
