//! Serializer trait: turns bytes into a typed object and back, optionally
//! restricted to a subset of fields.
//!
//! Field lists passed to a serializer hold document keys
//! ([`Field::key`](crate::Field::key)), not field names.

use crate::error::SourceError;
use std::io::{Read, Write};

/// A serializer that can emit a subset of an object's fields.
pub trait PartialSerializer<T> {
    /// Format name for logging and errors (e.g. "toml").
    fn format(&self) -> &'static str;

    /// Write every field of `obj`.
    fn serialize(&self, writer: &mut dyn Write, obj: &T) -> Result<(), SourceError>;

    /// Write only `fields` of `obj`.
    fn partial_serialize(
        &self,
        writer: &mut dyn Write,
        obj: &T,
        fields: &[&str],
    ) -> Result<(), SourceError>;

    /// Read an object.
    fn deserialize(&self, reader: &mut dyn Read) -> Result<T, SourceError>;

    /// Rewrite the document read from `existing`, replacing only `fields`
    /// with their values in `obj`. Fields absent in `obj` are removed from
    /// the document; everything else is written back unchanged.
    fn partial_update(
        &self,
        existing: &mut dyn Read,
        writer: &mut dyn Write,
        obj: &T,
        fields: &[&str],
    ) -> Result<(), SourceError>;
}
