//! Subcommand implementations. Each writes its report to the given writer.

pub mod changes;
pub mod set;
pub mod show;

use crate::settings::{self, Settings};
use layerconf_core::Error;
use layerconf_manager::ConfigManager;
use layerconf_sources::FileSource;
use std::path::PathBuf;

pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Load `files` in order. `primary` picks the save target (default: last).
pub fn open(
    files: &[PathBuf],
    primary: Option<usize>,
) -> Result<ConfigManager<Settings>, Box<dyn std::error::Error>> {
    if let Some(index) = primary.filter(|&index| index >= files.len()) {
        return Err(Error::UnknownSource {
            index,
            count: files.len(),
        }
        .into());
    }

    let mut builder = ConfigManager::<Settings>::builder().validator(settings::validator());
    for (index, path) in files.iter().enumerate() {
        let source = FileSource::<Settings>::new(path);
        builder = if primary == Some(index) {
            builder.source(source.primary())
        } else {
            builder.source(source)
        };
    }
    Ok(builder.build()?)
}
