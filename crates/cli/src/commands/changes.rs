//! `layerconf changes`: report what the primary file changes over the rest.

use super::CommandResult;
use std::io::Write;
use std::path::PathBuf;

pub fn run(files: &[PathBuf], primary: Option<usize>, out: &mut impl Write) -> CommandResult {
    let mut manager = super::open(files, primary)?;
    let changes = manager.changes_by_name()?;
    if changes.is_empty() {
        writeln!(out, "No changed fields.")?;
        return Ok(());
    }
    for (name, value) in &changes {
        writeln!(out, "{name} = {value}")?;
    }
    Ok(())
}
