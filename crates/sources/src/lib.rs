//! Configuration sources and serializers for layerconf.

pub mod in_memory;
pub mod file_source;
pub mod toml_serializer;
pub mod json_serializer;

pub use in_memory::MemorySource;
pub use file_source::FileSource;
pub use toml_serializer::TomlSerializer;
pub use json_serializer::JsonSerializer;
