//! Logical attribute values.
//!
//! Values are carried at their widest logical type regardless of the
//! declared component size: floats as `f64`, signed integers as `i64`,
//! unsigned integers as `u64`. The value codec narrows and widens them.

use crate::data_types::ComponentType;

/// One element of an attribute: `component_count` components of one type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttributeValue {
    Float1(f64),
    Float2([f64; 2]),
    Float3([f64; 3]),
    Float4([f64; 4]),
    Signed1(i64),
    Signed2([i64; 2]),
    Signed3([i64; 3]),
    Signed4([i64; 4]),
    Unsigned1(u64),
    Unsigned2([u64; 2]),
    Unsigned3([u64; 3]),
    Unsigned4([u64; 4]),
}

impl AttributeValue {
    pub fn component_type(&self) -> ComponentType {
        use AttributeValue::*;
        match self {
            Float1(_) | Float2(_) | Float3(_) | Float4(_) => ComponentType::Floating,
            Signed1(_) | Signed2(_) | Signed3(_) | Signed4(_) => ComponentType::IntegerSigned,
            Unsigned1(_) | Unsigned2(_) | Unsigned3(_) | Unsigned4(_) => {
                ComponentType::IntegerUnsigned
            }
        }
    }

    pub fn component_count(&self) -> u32 {
        use AttributeValue::*;
        match self {
            Float1(_) | Signed1(_) | Unsigned1(_) => 1,
            Float2(_) | Signed2(_) | Unsigned2(_) => 2,
            Float3(_) | Signed3(_) | Unsigned3(_) => 3,
            Float4(_) | Signed4(_) | Unsigned4(_) => 4,
        }
    }

    /// Human readable shape, used in type mismatch diagnostics.
    pub fn describe(&self) -> String {
        let count = match self.component_count() {
            1 => "one",
            2 => "two",
            3 => "three",
            _ => "four",
        };
        let kind = match self.component_type() {
            ComponentType::Floating => "floating point",
            ComponentType::IntegerSigned => "signed integer",
            ComponentType::IntegerUnsigned => "unsigned integer",
        };
        if count == "one" {
            format!("A single {} value", kind)
        } else {
            format!("A {} element {} vector", count, kind)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_of_values() {
        let v = AttributeValue::Float4([0.0; 4]);
        assert_eq!(v.component_type(), ComponentType::Floating);
        assert_eq!(v.component_count(), 4);
        assert_eq!(v.describe(), "A four element floating point vector");
        assert_eq!(
            AttributeValue::Unsigned1(3).describe(),
            "A single unsigned integer value"
        );
    }
}
