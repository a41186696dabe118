//! Schema identifiers for headers and metadata.

use std::fmt;

use crate::status::SmfError;

/// Maximum length, in octets, of a schema name.
pub const SCHEMA_NAME_MAX_LENGTH: usize = 64;

/// Dotted schema name such as `com.example.mesh_v2`.
///
/// Each dot-separated segment starts with a letter and continues with
/// letters, digits or underscores.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaName(String);

impl SchemaName {
    pub fn new(name: impl Into<String>) -> Result<Self, SmfError> {
        let name = name.into();
        if name.len() > SCHEMA_NAME_MAX_LENGTH {
            return Err(SmfError::invalid(format!(
                "Name length {} is longer than {}",
                name.len(),
                SCHEMA_NAME_MAX_LENGTH
            )));
        }
        if !name.split('.').all(valid_segment) {
            return Err(SmfError::invalid(format!(
                "Schema name must match ([a-zA-Z][a-zA-Z0-9_]*)(\\.[a-zA-Z][a-zA-Z0-9_]*)*\n  Received: {}",
                name
            )));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn valid_segment(segment: &str) -> bool {
    let mut bytes = segment.bytes();
    match bytes.next() {
        Some(first) if first.is_ascii_alphabetic() => {
            bytes.all(|b| b.is_ascii_alphanumeric() || b == b'_')
        }
        _ => false,
    }
}

impl fmt::Display for SchemaName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaIdentifier {
    pub name: SchemaName,
    pub version_major: u32,
    pub version_minor: u32,
}

impl SchemaIdentifier {
    pub fn new(name: SchemaName, version_major: u32, version_minor: u32) -> Self {
        Self {
            name,
            version_major,
            version_minor,
        }
    }
}

impl fmt::Display for SchemaIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}.{}", self.name, self.version_major, self.version_minor)
    }
}
