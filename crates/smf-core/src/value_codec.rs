//! Numeric value codec.
//!
//! Every attribute declares a (component type, component count, component
//! size) triple. [`ElementCodec`] resolves that triple once, when it is
//! built from a validated [`Attribute`], into a [`ScalarFormat`] and an
//! [`Arity`]; decoding and encoding then match exhaustively on those two
//! closed enums, so an unrepresentable combination can never reach a
//! read or write call.
//!
//! Integers are zero- or sign-extended to 64 bits on decode and truncated
//! to their declared width on encode. Floats are widened to `f64` on decode
//! and rounded to nearest-even on encode. Half precision is packed and
//! unpacked by hand; no native half type is assumed.

use std::io::{Read, Write};

use crate::attribute::Attribute;
use crate::data_types::{ByteOrder, ComponentType};
use crate::decoder_stream::DecoderStream;
use crate::encoder_stream::EncoderStream;
use crate::status::SmfError;
use crate::value::AttributeValue;

// =============================================================================
// Half precision
// =============================================================================

/// Converts IEEE-754 binary16 bits to `f64`. Exact for every input.
pub fn unpack_f16(bits: u16) -> f64 {
    f64::from(f16_bits_to_f32(bits))
}

fn f16_bits_to_f32(h: u16) -> f32 {
    let sign = u32::from(h & 0x8000) << 16;
    let exp = u32::from((h >> 10) & 0x1f);
    let mant = u32::from(h & 0x03ff);
    let bits = match (exp, mant) {
        (0, 0) => sign,
        (0, _) => {
            // Subnormal: renormalize into an f32 exponent.
            let mut e: i32 = -14;
            let mut m = mant;
            while m & 0x0400 == 0 {
                m <<= 1;
                e -= 1;
            }
            sign | (((e + 127) as u32) << 23) | ((m & 0x03ff) << 13)
        }
        (0x1f, _) => sign | 0x7f80_0000 | (mant << 13),
        _ => sign | ((exp + 127 - 15) << 23) | (mant << 13),
    };
    f32::from_bits(bits)
}

/// Rounds an `f64` to the nearest IEEE-754 binary16 value, ties to even.
///
/// Values beyond the binary16 range become infinities. NaNs stay NaN and
/// keep the high bits of their payload.
pub fn pack_f16(value: f64) -> u16 {
    let bits = value.to_bits();
    let sign = ((bits >> 48) & 0x8000) as u16;
    let exp = ((bits >> 52) & 0x7ff) as i32;
    let mant = bits & 0x000f_ffff_ffff_ffff;

    if exp == 0x7ff {
        if mant == 0 {
            return sign | 0x7c00;
        }
        return sign | 0x7e00 | ((mant >> 42) as u16 & 0x03ff);
    }

    let e = exp - 1023 + 15;
    if e >= 0x1f {
        return sign | 0x7c00;
    }

    if e <= 0 {
        if e < -10 {
            return sign;
        }
        let m = mant | (1u64 << 52);
        let shift = (43 - e) as u32;
        let kept = m >> shift;
        let rem = m & ((1u64 << shift) - 1);
        let halfway = 1u64 << (shift - 1);
        let rounded = if rem > halfway || (rem == halfway && kept & 1 == 1) {
            kept + 1
        } else {
            kept
        };
        return sign | rounded as u16;
    }

    let kept = (mant >> 42) as u32;
    let rem = mant & ((1u64 << 42) - 1);
    let halfway = 1u64 << 41;
    let mut result = ((e as u32) << 10) | kept;
    if rem > halfway || (rem == halfway && kept & 1 == 1) {
        // A carry out of the mantissa bumps the exponent, up to infinity.
        result += 1;
    }
    sign | result as u16
}

// =============================================================================
// Dispatch table
// =============================================================================

/// Physical encoding of one component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarFormat {
    Signed8,
    Signed16,
    Signed32,
    Signed64,
    Unsigned8,
    Unsigned16,
    Unsigned32,
    Unsigned64,
    Float16,
    Float32,
    Float64,
}

impl ScalarFormat {
    pub fn new(component_type: ComponentType, size_bits: u32) -> Result<Self, SmfError> {
        use ComponentType::*;
        match (component_type, size_bits) {
            (IntegerSigned, 8) => Ok(ScalarFormat::Signed8),
            (IntegerSigned, 16) => Ok(ScalarFormat::Signed16),
            (IntegerSigned, 32) => Ok(ScalarFormat::Signed32),
            (IntegerSigned, 64) => Ok(ScalarFormat::Signed64),
            (IntegerUnsigned, 8) => Ok(ScalarFormat::Unsigned8),
            (IntegerUnsigned, 16) => Ok(ScalarFormat::Unsigned16),
            (IntegerUnsigned, 32) => Ok(ScalarFormat::Unsigned32),
            (IntegerUnsigned, 64) => Ok(ScalarFormat::Unsigned64),
            (Floating, 16) => Ok(ScalarFormat::Float16),
            (Floating, 32) => Ok(ScalarFormat::Float32),
            (Floating, 64) => Ok(ScalarFormat::Float64),
            (ty, bits) => Err(SmfError::invalid(format!(
                "Unsupported {} size.\n  Received: {}",
                ty, bits
            ))),
        }
    }

    pub const fn component_type(self) -> ComponentType {
        use ScalarFormat::*;
        match self {
            Signed8 | Signed16 | Signed32 | Signed64 => ComponentType::IntegerSigned,
            Unsigned8 | Unsigned16 | Unsigned32 | Unsigned64 => ComponentType::IntegerUnsigned,
            Float16 | Float32 | Float64 => ComponentType::Floating,
        }
    }

    pub const fn size_bits(self) -> u32 {
        use ScalarFormat::*;
        match self {
            Signed8 | Unsigned8 => 8,
            Signed16 | Unsigned16 | Float16 => 16,
            Signed32 | Unsigned32 | Float32 => 32,
            Signed64 | Unsigned64 | Float64 => 64,
        }
    }

    pub const fn size_octets(self) -> u64 {
        (self.size_bits() / 8) as u64
    }
}

/// Number of components in one element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arity {
    One = 1,
    Two = 2,
    Three = 3,
    Four = 4,
}

impl Arity {
    pub fn new(count: u32) -> Result<Self, SmfError> {
        match count {
            1 => Ok(Arity::One),
            2 => Ok(Arity::Two),
            3 => Ok(Arity::Three),
            4 => Ok(Arity::Four),
            _ => Err(SmfError::invalid(format!(
                "Unsupported component count.\n  Received: {}",
                count
            ))),
        }
    }

    pub const fn count(self) -> u32 {
        self as u32
    }
}

/// Reader/writer for the elements of one attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementCodec {
    format: ScalarFormat,
    arity: Arity,
    order: ByteOrder,
}

impl ElementCodec {
    pub fn new(format: ScalarFormat, arity: Arity, order: ByteOrder) -> Self {
        Self {
            format,
            arity,
            order,
        }
    }

    pub fn for_attribute(attribute: &Attribute, order: ByteOrder) -> Result<Self, SmfError> {
        Ok(Self {
            format: ScalarFormat::new(attribute.component_type(), attribute.component_size_bits())?,
            arity: Arity::new(attribute.component_count())?,
            order,
        })
    }

    pub fn format(&self) -> ScalarFormat {
        self.format
    }

    pub fn arity(&self) -> Arity {
        self.arity
    }

    pub fn element_size_octets(&self) -> u64 {
        self.format.size_octets() * u64::from(self.arity.count())
    }

    // -------------------------------------------------------------------------
    // Decoding
    // -------------------------------------------------------------------------

    pub fn decode<R: Read>(
        &self,
        input: &mut DecoderStream<R>,
    ) -> Result<AttributeValue, SmfError> {
        use AttributeValue::*;
        Ok(match (self.format.component_type(), self.arity) {
            (ComponentType::Floating, Arity::One) => Float1(self.decode_float(input)?),
            (ComponentType::Floating, Arity::Two) => Float2(self.decode_floats(input)?),
            (ComponentType::Floating, Arity::Three) => Float3(self.decode_floats(input)?),
            (ComponentType::Floating, Arity::Four) => Float4(self.decode_floats(input)?),
            (ComponentType::IntegerSigned, Arity::One) => Signed1(self.decode_signed(input)?),
            (ComponentType::IntegerSigned, Arity::Two) => Signed2(self.decode_signeds(input)?),
            (ComponentType::IntegerSigned, Arity::Three) => Signed3(self.decode_signeds(input)?),
            (ComponentType::IntegerSigned, Arity::Four) => Signed4(self.decode_signeds(input)?),
            (ComponentType::IntegerUnsigned, Arity::One) => Unsigned1(self.decode_unsigned(input)?),
            (ComponentType::IntegerUnsigned, Arity::Two) => {
                Unsigned2(self.decode_unsigneds(input)?)
            }
            (ComponentType::IntegerUnsigned, Arity::Three) => {
                Unsigned3(self.decode_unsigneds(input)?)
            }
            (ComponentType::IntegerUnsigned, Arity::Four) => {
                Unsigned4(self.decode_unsigneds(input)?)
            }
        })
    }

    fn decode_float<R: Read>(&self, input: &mut DecoderStream<R>) -> Result<f64, SmfError> {
        Ok(match self.format {
            ScalarFormat::Float16 => unpack_f16(input.decode_u16(self.order)?),
            ScalarFormat::Float32 => f64::from(f32::from_bits(input.decode_u32(self.order)?)),
            _ => f64::from_bits(input.decode_u64(self.order)?),
        })
    }

    fn decode_signed<R: Read>(&self, input: &mut DecoderStream<R>) -> Result<i64, SmfError> {
        Ok(match self.format {
            ScalarFormat::Signed8 => i64::from(input.decode_u8()? as i8),
            ScalarFormat::Signed16 => i64::from(input.decode_u16(self.order)? as i16),
            ScalarFormat::Signed32 => i64::from(input.decode_u32(self.order)? as i32),
            _ => input.decode_u64(self.order)? as i64,
        })
    }

    fn decode_unsigned<R: Read>(&self, input: &mut DecoderStream<R>) -> Result<u64, SmfError> {
        Ok(match self.format {
            ScalarFormat::Unsigned8 => u64::from(input.decode_u8()?),
            ScalarFormat::Unsigned16 => u64::from(input.decode_u16(self.order)?),
            ScalarFormat::Unsigned32 => u64::from(input.decode_u32(self.order)?),
            _ => input.decode_u64(self.order)?,
        })
    }

    fn decode_floats<R: Read, const N: usize>(
        &self,
        input: &mut DecoderStream<R>,
    ) -> Result<[f64; N], SmfError> {
        let mut out = [0.0; N];
        for v in out.iter_mut() {
            *v = self.decode_float(input)?;
        }
        Ok(out)
    }

    fn decode_signeds<R: Read, const N: usize>(
        &self,
        input: &mut DecoderStream<R>,
    ) -> Result<[i64; N], SmfError> {
        let mut out = [0; N];
        for v in out.iter_mut() {
            *v = self.decode_signed(input)?;
        }
        Ok(out)
    }

    fn decode_unsigneds<R: Read, const N: usize>(
        &self,
        input: &mut DecoderStream<R>,
    ) -> Result<[u64; N], SmfError> {
        let mut out = [0; N];
        for v in out.iter_mut() {
            *v = self.decode_unsigned(input)?;
        }
        Ok(out)
    }

    // -------------------------------------------------------------------------
    // Encoding
    // -------------------------------------------------------------------------

    /// Fails with `SmfError::Contract` unless `value` has this codec's
    /// component type and count.
    pub fn check(&self, value: &AttributeValue) -> Result<(), SmfError> {
        if value.component_type() == self.format.component_type()
            && value.component_count() == self.arity.count()
        {
            return Ok(());
        }
        Err(SmfError::contract(format!(
            "Incorrect type.\n  Expected: {} {} {}\n  Received: {}",
            self.format.component_type(),
            self.arity.count(),
            self.format.size_bits(),
            value.describe()
        )))
    }

    pub fn encode<W: Write>(
        &self,
        out: &mut EncoderStream<W>,
        value: &AttributeValue,
    ) -> Result<(), SmfError> {
        use AttributeValue::*;
        self.check(value)?;
        match value {
            Float1(x) => self.encode_float(out, *x),
            Float2(v) => v.iter().try_for_each(|&x| self.encode_float(out, x)),
            Float3(v) => v.iter().try_for_each(|&x| self.encode_float(out, x)),
            Float4(v) => v.iter().try_for_each(|&x| self.encode_float(out, x)),
            Signed1(x) => self.encode_integer(out, *x as u64),
            Signed2(v) => v.iter().try_for_each(|&x| self.encode_integer(out, x as u64)),
            Signed3(v) => v.iter().try_for_each(|&x| self.encode_integer(out, x as u64)),
            Signed4(v) => v.iter().try_for_each(|&x| self.encode_integer(out, x as u64)),
            Unsigned1(x) => self.encode_integer(out, *x),
            Unsigned2(v) => v.iter().try_for_each(|&x| self.encode_integer(out, x)),
            Unsigned3(v) => v.iter().try_for_each(|&x| self.encode_integer(out, x)),
            Unsigned4(v) => v.iter().try_for_each(|&x| self.encode_integer(out, x)),
        }
    }

    fn encode_float<W: Write>(&self, out: &mut EncoderStream<W>, x: f64) -> Result<(), SmfError> {
        match self.format {
            ScalarFormat::Float16 => out.encode_u16(pack_f16(x), self.order),
            ScalarFormat::Float32 => out.encode_u32((x as f32).to_bits(), self.order),
            _ => out.encode_u64(x.to_bits(), self.order),
        }
    }

    /// Writes the low `size_bits` of a two's complement or unsigned value.
    fn encode_integer<W: Write>(&self, out: &mut EncoderStream<W>, x: u64) -> Result<(), SmfError> {
        match self.format.size_bits() {
            8 => out.encode_u8(x as u8),
            16 => out.encode_u16(x as u16, self.order),
            32 => out.encode_u32(x as u32, self.order),
            _ => out.encode_u64(x, self.order),
        }
    }
}
