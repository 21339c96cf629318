use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tempfile::NamedTempFile;

/// Writes through a temporary file in the destination directory and renames
/// it into place, so readers never observe a partial document.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).with_context(|| format!("failed creating {}", dir.display()))?;

    let mut staged = NamedTempFile::new_in(dir)
        .with_context(|| format!("failed staging write in {}", dir.display()))?;
    staged
        .write_all(data)
        .with_context(|| format!("failed writing staged copy of {}", path.display()))?;
    staged
        .persist(path)
        .map_err(|err| err.error)
        .with_context(|| format!("failed replacing {}", path.display()))?;
    Ok(())
}

/// JSON with sorted keys and a one-space indent, the layout the platform's
/// own tooling writes.
pub fn to_json_document<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b" ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    value
        .serialize(&mut serializer)
        .context("failed serializing JSON document")?;
    buffer.push(b'\n');
    Ok(buffer)
}
