//! The `layerconf` command-line front end: a sample [`Settings`] type and
//! the subcommands that load, report on and edit a stack of files holding
//! it.

pub mod commands;
pub mod settings;

pub use settings::{ServerSettings, Settings};
