//! Vertex attribute descriptors.

use std::fmt;

use crate::data_types::ComponentType;
use crate::status::SmfError;

/// Maximum length, in octets, of an attribute name.
pub const ATTRIBUTE_NAME_MAX_LENGTH: usize = 64;

/// Name of a vertex attribute: 1 to 64 characters from `[A-Za-z0-9_.-]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttributeName(String);

impl AttributeName {
    pub fn new(name: impl Into<String>) -> Result<Self, SmfError> {
        let name = name.into();
        let valid = !name.is_empty()
            && name.len() <= ATTRIBUTE_NAME_MAX_LENGTH
            && name
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.'));
        if valid {
            Ok(Self(name))
        } else {
            Err(SmfError::invalid(format!(
                "Attribute name must match [A-Za-z0-9_.-]{{1,{}}}.\n  Received: {}",
                ATTRIBUTE_NAME_MAX_LENGTH, name
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AttributeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A vertex attribute declaration.
///
/// Attributes are identified by name. Renaming or resampling produces a new
/// value through [`Attribute::with_name`] or [`Attribute::with_size_bits`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Attribute {
    name: AttributeName,
    component_type: ComponentType,
    component_count: u32,
    component_size_bits: u32,
}

impl Attribute {
    pub fn new(
        name: AttributeName,
        component_type: ComponentType,
        component_count: u32,
        component_size_bits: u32,
    ) -> Result<Self, SmfError> {
        if !(1..=4).contains(&component_count) {
            return Err(SmfError::invalid(format!(
                "Unsupported component count.\n  Received: {}\n  Supported: 1|2|3|4",
                component_count
            )));
        }
        if !component_type.supported_sizes().contains(&component_size_bits) {
            let supported = component_type
                .supported_sizes()
                .iter()
                .map(u32::to_string)
                .collect::<Vec<_>>()
                .join("|");
            return Err(SmfError::invalid(format!(
                "Unsupported {} size.\n  Received: {}\n  Supported: {}",
                component_type, component_size_bits, supported
            )));
        }
        Ok(Self {
            name,
            component_type,
            component_count,
            component_size_bits,
        })
    }

    pub fn name(&self) -> &AttributeName {
        &self.name
    }

    pub fn component_type(&self) -> ComponentType {
        self.component_type
    }

    pub fn component_count(&self) -> u32 {
        self.component_count
    }

    pub fn component_size_bits(&self) -> u32 {
        self.component_size_bits
    }

    /// Size of one component in octets.
    pub fn component_size_octets(&self) -> u64 {
        (u64::from(self.component_size_bits) + 7) / 8
    }

    /// Size of one element (all components of one vertex) in octets.
    pub fn size_octets(&self) -> u64 {
        self.component_size_octets() * u64::from(self.component_count)
    }

    pub fn with_name(&self, name: AttributeName) -> Self {
        Self {
            name,
            ..self.clone()
        }
    }

    pub fn with_size_bits(&self, component_size_bits: u32) -> Result<Self, SmfError> {
        Self::new(
            self.name.clone(),
            self.component_type,
            self.component_count,
            component_size_bits,
        )
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.name, self.component_type, self.component_count, self.component_size_bits
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> AttributeName {
        AttributeName::new(s).unwrap()
    }

    #[test]
    fn names_accept_the_restricted_charset() {
        assert!(AttributeName::new("POSITION").is_ok());
        assert!(AttributeName::new("uv.0-main_x").is_ok());
        assert!(AttributeName::new("").is_err());
        assert!(AttributeName::new("has space").is_err());
        assert!(AttributeName::new("x".repeat(65)).is_err());
        assert!(AttributeName::new("x".repeat(64)).is_ok());
    }

    #[test]
    fn sizes_depend_on_component_type() {
        let a = Attribute::new(name("n"), ComponentType::Floating, 3, 16).unwrap();
        assert_eq!(a.component_size_octets(), 2);
        assert_eq!(a.size_octets(), 6);

        let e = Attribute::new(name("n"), ComponentType::Floating, 3, 8).unwrap_err();
        assert!(e.to_string().contains("Unsupported float size."));
        assert!(e.to_string().contains("Supported: 16|32|64"));
        assert!(Attribute::new(name("n"), ComponentType::IntegerSigned, 1, 8).is_ok());
    }

    #[test]
    fn component_count_is_bounded() {
        assert!(Attribute::new(name("n"), ComponentType::IntegerUnsigned, 0, 8).is_err());
        assert!(Attribute::new(name("n"), ComponentType::IntegerUnsigned, 5, 8).is_err());
    }

    #[test]
    fn edits_produce_new_values() {
        let a = Attribute::new(name("a"), ComponentType::IntegerUnsigned, 2, 32).unwrap();
        let b = a.with_name(name("b"));
        let c = a.with_size_bits(16).unwrap();
        assert_eq!(a.name().as_str(), "a");
        assert_eq!(b.name().as_str(), "b");
        assert_eq!(c.component_size_bits(), 16);
        assert_eq!(a.component_size_bits(), 32);
    }
}
