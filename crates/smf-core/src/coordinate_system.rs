//! Axis conventions and face winding order.

use std::fmt;

use crate::status::SmfError;

/// A signed coordinate axis. Codes are the values stored in binary headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Axis {
    PositiveX = 0,
    PositiveY = 1,
    PositiveZ = 2,
    NegativeX = 3,
    NegativeY = 4,
    NegativeZ = 5,
}

impl Axis {
    pub const fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Result<Self, SmfError> {
        match code {
            0 => Ok(Axis::PositiveX),
            1 => Ok(Axis::PositiveY),
            2 => Ok(Axis::PositiveZ),
            3 => Ok(Axis::NegativeX),
            4 => Ok(Axis::NegativeY),
            5 => Ok(Axis::NegativeZ),
            _ => Err(SmfError::invalid(format!("Invalid axis value: {}", code))),
        }
    }

    /// The unsigned axis: 0 for X, 1 for Y, 2 for Z.
    pub const fn base(self) -> u8 {
        self as u8 % 3
    }

    pub const fn name(self) -> &'static str {
        match self {
            Axis::PositiveX => "+x",
            Axis::PositiveY => "+y",
            Axis::PositiveZ => "+z",
            Axis::NegativeX => "-x",
            Axis::NegativeY => "-y",
            Axis::NegativeZ => "-z",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum WindingOrder {
    Clockwise = 0,
    #[default]
    CounterClockwise = 1,
}

impl WindingOrder {
    pub const fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Result<Self, SmfError> {
        match code {
            0 => Ok(WindingOrder::Clockwise),
            1 => Ok(WindingOrder::CounterClockwise),
            _ => Err(SmfError::invalid(format!(
                "Invalid winding order value: {}",
                code
            ))),
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            WindingOrder::Clockwise => "clockwise",
            WindingOrder::CounterClockwise => "counter-clockwise",
        }
    }
}

/// Right, up and forward axes plus the winding order of front faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CoordinateSystem {
    right: Axis,
    up: Axis,
    forward: Axis,
    winding_order: WindingOrder,
}

impl CoordinateSystem {
    /// Fails unless the three axes are mutually perpendicular.
    pub fn new(
        right: Axis,
        up: Axis,
        forward: Axis,
        winding_order: WindingOrder,
    ) -> Result<Self, SmfError> {
        let (r, u, f) = (right.base(), up.base(), forward.base());
        if r == u || u == f || r == f {
            return Err(SmfError::invalid(format!(
                "Axes must be mutually perpendicular.\n  Right: {}\n  Up: {}\n  Forward: {}",
                right, up, forward
            )));
        }
        Ok(Self {
            right,
            up,
            forward,
            winding_order,
        })
    }

    pub fn right(&self) -> Axis {
        self.right
    }

    pub fn up(&self) -> Axis {
        self.up
    }

    pub fn forward(&self) -> Axis {
        self.forward
    }

    pub fn winding_order(&self) -> WindingOrder {
        self.winding_order
    }
}

impl Default for CoordinateSystem {
    fn default() -> Self {
        Self {
            right: Axis::PositiveX,
            up: Axis::PositiveY,
            forward: Axis::NegativeZ,
            winding_order: WindingOrder::CounterClockwise,
        }
    }
}

impl fmt::Display for CoordinateSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.right,
            self.up,
            self.forward,
            self.winding_order.name()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_right_handed_opengl() {
        let c = CoordinateSystem::default();
        assert_eq!(c.to_string(), "+x +y -z counter-clockwise");
    }

    #[test]
    fn parallel_axes_are_rejected() {
        let e = CoordinateSystem::new(
            Axis::PositiveX,
            Axis::NegativeX,
            Axis::PositiveZ,
            WindingOrder::Clockwise,
        )
        .unwrap_err();
        assert!(e.to_string().contains("perpendicular"));
    }

    #[test]
    fn axis_codes() {
        for code in 0..6u8 {
            assert_eq!(Axis::from_code(code).unwrap().code(), code);
        }
        assert!(Axis::from_code(6).is_err());
        assert!(WindingOrder::from_code(2).is_err());
    }
}
