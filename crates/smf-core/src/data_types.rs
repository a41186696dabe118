//! Core data types used throughout SMF
//!
//! Component kinds, byte orders and triangle index widths, together with the
//! numeric codes the binary encoding stores for each of them.

use std::fmt;

use crate::status::SmfError;

/// The numeric kind of an attribute component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u32)]
pub enum ComponentType {
    /// Two's complement signed integer
    IntegerSigned = 0,
    /// Unsigned integer
    IntegerUnsigned = 1,
    /// IEEE-754 floating point
    Floating = 2,
}

impl ComponentType {
    /// Returns the code stored in binary attribute records.
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Returns the name of this component type as a string
    pub const fn name(self) -> &'static str {
        match self {
            ComponentType::IntegerSigned => "integer-signed",
            ComponentType::IntegerUnsigned => "integer-unsigned",
            ComponentType::Floating => "float",
        }
    }

    /// Returns the component sizes, in bits, this type may be declared with.
    pub const fn supported_sizes(self) -> &'static [u32] {
        match self {
            ComponentType::IntegerSigned | ComponentType::IntegerUnsigned => &[8, 16, 32, 64],
            ComponentType::Floating => &[16, 32, 64],
        }
    }

    pub fn from_code(code: u32) -> Result<Self, SmfError> {
        match code {
            0 => Ok(ComponentType::IntegerSigned),
            1 => Ok(ComponentType::IntegerUnsigned),
            2 => Ok(ComponentType::Floating),
            _ => Err(SmfError::invalid(format!(
                "Invalid component type value: {}",
                code
            ))),
        }
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Byte order of attribute and triangle payloads.
///
/// Section framing and header fields are always big-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u32)]
pub enum ByteOrder {
    #[default]
    BigEndian = 0,
    LittleEndian = 1,
}

impl ByteOrder {
    pub const fn code(self) -> u32 {
        self as u32
    }

    pub fn from_code(code: u32) -> Result<Self, SmfError> {
        match code {
            0 => Ok(ByteOrder::BigEndian),
            1 => Ok(ByteOrder::LittleEndian),
            _ => Err(SmfError::invalid(format!(
                "Invalid byte order value: {}",
                code
            ))),
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            ByteOrder::BigEndian => "big-endian",
            ByteOrder::LittleEndian => "little-endian",
        }
    }
}

impl fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Bit width used to encode each vertex index of a triangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u32)]
pub enum TriangleWidth {
    Bits8 = 8,
    Bits16 = 16,
    Bits32 = 32,
    Bits64 = 64,
}

impl TriangleWidth {
    /// All widths, narrowest first.
    pub const ALL: [TriangleWidth; 4] = [
        TriangleWidth::Bits8,
        TriangleWidth::Bits16,
        TriangleWidth::Bits32,
        TriangleWidth::Bits64,
    ];

    pub const fn bits(self) -> u32 {
        self as u32
    }

    /// Returns the size of one index in bytes
    pub const fn size(self) -> usize {
        (self as u32 / 8) as usize
    }

    /// Largest index representable at this width.
    pub const fn max_index(self) -> u64 {
        match self {
            TriangleWidth::Bits8 => u8::MAX as u64,
            TriangleWidth::Bits16 => u16::MAX as u64,
            TriangleWidth::Bits32 => u32::MAX as u64,
            TriangleWidth::Bits64 => u64::MAX,
        }
    }

    pub fn from_bits(bits: u32) -> Result<Self, SmfError> {
        match bits {
            8 => Ok(TriangleWidth::Bits8),
            16 => Ok(TriangleWidth::Bits16),
            32 => Ok(TriangleWidth::Bits32),
            64 => Ok(TriangleWidth::Bits64),
            _ => Err(SmfError::invalid(format!(
                "Unsupported triangle index size.\n  Received: {}\n  Supported: 8|16|32|64",
                bits
            ))),
        }
    }
}

impl Default for TriangleWidth {
    fn default() -> Self {
        TriangleWidth::Bits32
    }
}

impl fmt::Display for TriangleWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bits())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_type_codes_round_trip() {
        for ty in [
            ComponentType::IntegerSigned,
            ComponentType::IntegerUnsigned,
            ComponentType::Floating,
        ] {
            assert_eq!(ComponentType::from_code(ty.code()).unwrap(), ty);
        }
        let e = ComponentType::from_code(3).unwrap_err();
        assert!(e.to_string().contains("Invalid component type value: 3"));
    }

    #[test]
    fn floats_have_no_eight_bit_size() {
        assert!(!ComponentType::Floating.supported_sizes().contains(&8));
        assert!(ComponentType::IntegerSigned.supported_sizes().contains(&8));
    }

    #[test]
    fn triangle_widths() {
        assert_eq!(TriangleWidth::Bits16.size(), 2);
        assert_eq!(TriangleWidth::Bits8.max_index(), 255);
        assert_eq!(TriangleWidth::from_bits(64).unwrap(), TriangleWidth::Bits64);
        assert!(TriangleWidth::from_bits(24).is_err());
        assert_eq!(TriangleWidth::default(), TriangleWidth::Bits32);
    }

    #[test]
    fn byte_order_codes() {
        assert_eq!(ByteOrder::from_code(1).unwrap(), ByteOrder::LittleEndian);
        assert!(ByteOrder::from_code(2).is_err());
    }
}
