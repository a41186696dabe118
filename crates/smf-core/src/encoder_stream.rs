use std::io::Write;

use byteorder::{BigEndian, ByteOrder as _, LittleEndian};

use crate::data_types::ByteOrder;
use crate::status::SmfError;

const ZEROES: [u8; 16] = [0u8; 16];

/// Output stream for writing SMF binary data
/// Tracks the number of octets written so writers can pad to alignment
#[derive(Debug)]
pub struct EncoderStream<W> {
    /// Underlying sink
    inner: W,

    /// Octets written so far
    pos: u64,
}

impl<W: Write> EncoderStream<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, pos: 0 }
    }

    /// Get the number of octets written
    pub fn position(&self) -> u64 {
        self.pos
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    pub fn encode_bytes(&mut self, data: &[u8]) -> Result<(), SmfError> {
        self.inner.write_all(data)?;
        self.pos += data.len() as u64;
        Ok(())
    }

    pub fn encode_u8(&mut self, value: u8) -> Result<(), SmfError> {
        self.encode_bytes(&[value])
    }

    pub fn encode_u16(&mut self, value: u16, order: ByteOrder) -> Result<(), SmfError> {
        let mut b = [0u8; 2];
        match order {
            ByteOrder::BigEndian => BigEndian::write_u16(&mut b, value),
            ByteOrder::LittleEndian => LittleEndian::write_u16(&mut b, value),
        }
        self.encode_bytes(&b)
    }

    pub fn encode_u32(&mut self, value: u32, order: ByteOrder) -> Result<(), SmfError> {
        let mut b = [0u8; 4];
        match order {
            ByteOrder::BigEndian => BigEndian::write_u32(&mut b, value),
            ByteOrder::LittleEndian => LittleEndian::write_u32(&mut b, value),
        }
        self.encode_bytes(&b)
    }

    pub fn encode_u64(&mut self, value: u64, order: ByteOrder) -> Result<(), SmfError> {
        let mut b = [0u8; 8];
        match order {
            ByteOrder::BigEndian => BigEndian::write_u64(&mut b, value),
            ByteOrder::LittleEndian => LittleEndian::write_u64(&mut b, value),
        }
        self.encode_bytes(&b)
    }

    pub fn encode_u32_be(&mut self, value: u32) -> Result<(), SmfError> {
        self.encode_u32(value, ByteOrder::BigEndian)
    }

    pub fn encode_u64_be(&mut self, value: u64) -> Result<(), SmfError> {
        self.encode_u64(value, ByteOrder::BigEndian)
    }

    /// Write `count` zero octets
    pub fn encode_zeroes(&mut self, count: u64) -> Result<(), SmfError> {
        let mut remaining = count;
        while remaining > 0 {
            let n = remaining.min(ZEROES.len() as u64) as usize;
            self.encode_bytes(&ZEROES[..n])?;
            remaining -= n as u64;
        }
        Ok(())
    }

    /// Zero-pad until the absolute position is `offset`
    pub fn pad_to(&mut self, offset: u64) -> Result<(), SmfError> {
        if offset < self.pos {
            return Err(SmfError::contract(format!(
                "Wrote past the end of a region.\n  End: 0x{:x}\n  Position: 0x{:x}",
                offset, self.pos
            )));
        }
        self.encode_zeroes(offset - self.pos)
    }

    /// Zero-pad until the position is a multiple of `alignment`
    pub fn pad_to_alignment(&mut self, alignment: u64) -> Result<(), SmfError> {
        let rem = self.pos % alignment;
        if rem == 0 {
            return Ok(());
        }
        self.encode_zeroes(alignment - rem)
    }

    pub fn flush(&mut self) -> Result<(), SmfError> {
        self.inner.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_in_both_byte_orders() {
        let mut s = EncoderStream::new(Vec::new());
        s.encode_u32(0x01020304, ByteOrder::BigEndian).unwrap();
        s.encode_u16(0x0506, ByteOrder::LittleEndian).unwrap();
        assert_eq!(s.get_ref().as_slice(), &[1, 2, 3, 4, 6, 5]);
        assert_eq!(s.position(), 6);
    }

    #[test]
    fn padding() {
        let mut s = EncoderStream::new(Vec::new());
        s.encode_u8(1).unwrap();
        s.pad_to_alignment(16).unwrap();
        assert_eq!(s.position(), 16);
        s.pad_to_alignment(16).unwrap();
        assert_eq!(s.position(), 16);
        s.pad_to(40).unwrap();
        assert_eq!(s.position(), 40);
        assert!(s.pad_to(39).is_err());
        assert!(s.into_inner()[1..].iter().all(|&b| b == 0));
    }
}
