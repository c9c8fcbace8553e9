//! File-backed source: one TOML or JSON document on disk.
//!
//! The document is read lazily on first access and cached until
//! [`invalidate`](ConfigSource::invalidate) or a save. A file that does not
//! exist yet is an absent source; it is created (with parent directories) on
//! the first save.

use crate::json_serializer::JsonSerializer;
use crate::toml_serializer::TomlSerializer;
use layerconf_core::{ConfigSource, ConfigType, PartialSerializer, SourceError, SourceFlags};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A configuration source backed by a single file.
pub struct FileSource<T> {
    path: PathBuf,
    serializer: Box<dyn PartialSerializer<T>>,
    flags: SourceFlags,
    cached: Option<Option<T>>,
}

impl<T> FileSource<T>
where
    T: ConfigType + Serialize + DeserializeOwned,
{
    /// A persistent source at `path`. `.json` files use JSON, everything
    /// else TOML.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let serializer: Box<dyn PartialSerializer<T>> = match path
            .extension()
            .and_then(|ext| ext.to_str())
        {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Box::new(JsonSerializer),
            _ => Box::new(TomlSerializer),
        };
        Self {
            path,
            serializer,
            flags: SourceFlags {
                persistent: true,
                ..SourceFlags::default()
            },
            cached: None,
        }
    }

    /// Override the serializer chosen from the extension.
    pub fn with_serializer(mut self, serializer: impl PartialSerializer<T> + 'static) -> Self {
        self.serializer = Box::new(serializer);
        self.cached = None;
        self
    }

    pub fn primary(mut self) -> Self {
        self.flags.primary = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.flags.required = true;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.flags.read_only = true;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> &'static str {
        self.serializer.format()
    }

    fn load(&self) -> Result<Option<T>, SourceError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %self.path.display(), "Config file not found, treating source as absent");
                return Ok(None);
            }
            Err(e) => {
                return Err(SourceError::Read {
                    path: self.path.clone(),
                    reason: e.to_string(),
                });
            }
        };
        let obj = self.serializer.deserialize(&mut bytes.as_slice())?;
        debug!(
            path = %self.path.display(),
            format = self.serializer.format(),
            "Config file loaded"
        );
        Ok(Some(obj))
    }

    /// Document keys of `fields`, in order.
    fn document_keys(&self, obj: &T, fields: &[&str]) -> Result<Vec<&'static str>, SourceError> {
        let table = T::fields();
        let serialized = serde_json::to_value(obj).map_err(|e| SourceError::Serialize {
            format: self.serializer.format(),
            reason: e.to_string(),
        })?;
        fields
            .iter()
            .map(|&name| {
                let field = table
                    .get(name)
                    .ok_or_else(|| SourceError::UnknownField(name.to_string()))?;
                let key = field.key();
                // A set field has to come out under its key.
                if field.is_set(obj) && serialized.get(key).is_none() {
                    return Err(SourceError::MissingKey {
                        field: name.to_string(),
                        key: key.to_string(),
                    });
                }
                Ok(key)
            })
            .collect()
    }

    fn write(&mut self, content: &[u8]) -> Result<(), SourceError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| SourceError::Write {
                path: parent.to_path_buf(),
                reason: format!("failed to create directory: {e}"),
            })?;
        }
        std::fs::write(&self.path, content).map_err(|e| SourceError::Write {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        self.cached = None;
        Ok(())
    }
}

impl<T> ConfigSource<T> for FileSource<T>
where
    T: ConfigType + Serialize + DeserializeOwned,
{
    fn name(&self) -> String {
        self.path.display().to_string()
    }

    fn flags(&self) -> SourceFlags {
        self.flags
    }

    fn config(&mut self) -> Result<Option<T>, SourceError> {
        if let Some(cached) = &self.cached {
            return Ok(cached.clone());
        }
        let loaded = self.load()?;
        self.cached = Some(loaded.clone());
        Ok(loaded)
    }

    fn invalidate(&mut self) {
        self.cached = None;
    }

    fn save(&mut self, obj: &T) -> Result<(), SourceError> {
        let mut buf = Vec::new();
        self.serializer.serialize(&mut buf, obj)?;
        self.write(&buf)?;
        info!(path = %self.path.display(), "Config file saved");
        Ok(())
    }

    fn partial_save(&mut self, obj: &T, fields: &[&str]) -> Result<(), SourceError> {
        let keys = self.document_keys(obj, fields)?;
        let mut buf = Vec::new();
        match std::fs::read(&self.path) {
            Ok(existing) => {
                self.serializer
                    .partial_update(&mut existing.as_slice(), &mut buf, obj, &keys)?;
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                self.serializer.partial_serialize(&mut buf, obj, &keys)?;
            }
            Err(e) => {
                return Err(SourceError::Read {
                    path: self.path.clone(),
                    reason: e.to_string(),
                });
            }
        }
        self.write(&buf)?;
        info!(
            path = %self.path.display(),
            fields = ?fields,
            "Config file partially saved"
        );
        Ok(())
    }
}
