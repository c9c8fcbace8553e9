//! `layerconf show`: print the merged configuration.

use super::CommandResult;
use std::io::Write;
use std::path::PathBuf;

pub fn run(files: &[PathBuf], primary: Option<usize>, out: &mut impl Write) -> CommandResult {
    let manager = super::open(files, primary)?;
    let rendered = toml::to_string_pretty(manager.out())?;
    write!(out, "{rendered}")?;
    Ok(())
}
