//! Common traits for SMF encodings.
//!
//! An encoding is described by a [`FormatProvider`]. Providers are collected
//! in a [`crate::FormatRegistry`], which callers construct and pass around
//! explicitly:
//!
//! ```ignore
//! use smf_io::{BinaryFormat, FormatRegistry};
//!
//! let mut registry = FormatRegistry::new();
//! registry.register(Box::new(BinaryFormat))?;
//!
//! let mut file = std::fs::File::open("mesh.smfb")?;
//! let mut mesh = smf_core::MemoryMeshProducer::new();
//! registry.parse(&mut file, Some("mesh.smfb"), &mut mesh)?;
//! ```

use std::fmt;
use std::io::{Read, Write};

use smf_core::{FormatVersion, ParserEvents, Serializer, SmfError, Status};

/// Names and capabilities of an encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FormatDescription {
    /// Short unique name, such as `smf/b`.
    pub name: &'static str,
    pub description: &'static str,
    pub mime_type: &'static str,
    /// File suffix without the dot.
    pub suffix: &'static str,
    /// Whether the encoding supports seeking to individual parts.
    pub random_access: bool,
}

impl fmt::Display for FormatDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.mime_type)
    }
}

/// One SMF encoding: identification, parsing and serialization.
pub trait FormatProvider {
    fn format(&self) -> FormatDescription;

    /// Versions the provider can parse, oldest first.
    fn supported_versions(&self) -> &[FormatVersion];

    /// Number of leading octets [`FormatProvider::probe`] needs.
    fn probe_length(&self) -> usize;

    /// Identifies the encoding and version from a stream prefix.
    ///
    /// Returns `Ok(None)` if the prefix is not this encoding and an error if
    /// it is, but in a version the provider cannot read.
    fn probe(&self, prefix: &[u8]) -> Result<Option<FormatVersion>, SmfError>;

    /// Parses a complete stream into `events`.
    fn parse(
        &self,
        reader: &mut dyn Read,
        source: Option<&str>,
        events: &mut dyn ParserEvents,
    ) -> Status;

    /// Creates a serializer writing `version` to `writer`.
    fn serializer<'a>(
        &self,
        version: FormatVersion,
        writer: Box<dyn Write + 'a>,
    ) -> Result<Box<dyn Serializer + 'a>, SmfError>;
}
