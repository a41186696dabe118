use std::io::{self, Read, Seek, SeekFrom};

use byteorder::{BigEndian, ByteOrder as _, LittleEndian};

use crate::data_types::ByteOrder;
use crate::status::{LexicalPosition, ParseError, SmfError, SHORT_READ_MESSAGE};

/// Input stream for reading SMF binary data.
///
/// `DecoderStream` wraps any [`Read`] and tracks the absolute byte offset so
/// every error can be reported at the position it happened. Reads either
/// fill the requested number of octets or fail with a format error whose
/// message starts with [`SHORT_READ_MESSAGE`].
///
/// # Example
///
/// ```
/// use smf_core::data_types::ByteOrder;
/// use smf_core::DecoderStream;
///
/// let data: &[u8] = &[0x00, 0x00, 0x01, 0x02, 0xff];
/// let mut stream = DecoderStream::new(data);
///
/// assert_eq!(stream.decode_u32(ByteOrder::BigEndian).unwrap(), 0x0102);
/// assert_eq!(stream.position(), 4);
/// assert!(stream.decode_u16(ByteOrder::BigEndian).is_err());
/// ```
pub struct DecoderStream<R> {
    inner: R,
    pos: u64,
    source: Option<String>,
}

impl<R: Read> DecoderStream<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            pos: 0,
            source: None,
        }
    }

    /// Creates a stream whose diagnostics name `source` (typically a URI).
    pub fn with_source(inner: R, source: impl Into<String>) -> Self {
        Self {
            inner,
            pos: 0,
            source: Some(source.into()),
        }
    }

    /// Returns the current read position in bytes.
    pub fn position(&self) -> u64 {
        self.pos
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Lexical position of the current read offset.
    pub fn lexical(&self) -> LexicalPosition {
        LexicalPosition::at_offset(self.pos, self.source())
    }

    pub fn lexical_at(&self, offset: u64) -> LexicalPosition {
        LexicalPosition::at_offset(offset, self.source())
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    fn short_read(&self, start: u64, needed: u64, what: &str, cause: &io::Error) -> SmfError {
        let message = format!(
            "{}.\n  Reading: {}\n  Required: {}\n  Offset: 0x{:x}",
            SHORT_READ_MESSAGE, what, needed, start
        );
        SmfError::Format(ParseError::new(self.lexical_at(start), message).with_cause(cause))
    }

    /// Fills `buf` completely or fails.
    pub fn decode_bytes(&mut self, buf: &mut [u8], what: &str) -> Result<(), SmfError> {
        let start = self.pos;
        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => {
                    self.pos = start + filled as u64;
                    let eof = io::Error::new(io::ErrorKind::UnexpectedEof, "end of stream");
                    return Err(self.short_read(start, buf.len() as u64, what, &eof));
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.pos = start + filled as u64;
                    return Err(self.short_read(start, buf.len() as u64, what, &e));
                }
            }
        }
        self.pos = start + filled as u64;
        Ok(())
    }

    /// Reads `len` octets. Storage grows with the octets actually read.
    pub fn decode_vec(&mut self, len: usize, what: &str) -> Result<Vec<u8>, SmfError> {
        let start = self.pos;
        let mut data = Vec::new();
        let result = self
            .inner
            .by_ref()
            .take(len as u64)
            .read_to_end(&mut data);
        self.pos = start + data.len() as u64;
        match result {
            Ok(n) if n == len => Ok(data),
            Ok(_) => {
                let eof = io::Error::new(io::ErrorKind::UnexpectedEof, "end of stream");
                Err(self.short_read(start, len as u64, what, &eof))
            }
            Err(e) => Err(self.short_read(start, len as u64, what, &e)),
        }
    }

    pub fn decode_u8(&mut self) -> Result<u8, SmfError> {
        let mut b = [0u8; 1];
        self.decode_bytes(&mut b, "u8")?;
        Ok(b[0])
    }

    pub fn decode_u16(&mut self, order: ByteOrder) -> Result<u16, SmfError> {
        let mut b = [0u8; 2];
        self.decode_bytes(&mut b, "u16")?;
        Ok(match order {
            ByteOrder::BigEndian => BigEndian::read_u16(&b),
            ByteOrder::LittleEndian => LittleEndian::read_u16(&b),
        })
    }

    pub fn decode_u32(&mut self, order: ByteOrder) -> Result<u32, SmfError> {
        let mut b = [0u8; 4];
        self.decode_bytes(&mut b, "u32")?;
        Ok(match order {
            ByteOrder::BigEndian => BigEndian::read_u32(&b),
            ByteOrder::LittleEndian => LittleEndian::read_u32(&b),
        })
    }

    pub fn decode_u64(&mut self, order: ByteOrder) -> Result<u64, SmfError> {
        let mut b = [0u8; 8];
        self.decode_bytes(&mut b, "u64")?;
        Ok(match order {
            ByteOrder::BigEndian => BigEndian::read_u64(&b),
            ByteOrder::LittleEndian => LittleEndian::read_u64(&b),
        })
    }

    pub fn decode_u32_be(&mut self) -> Result<u32, SmfError> {
        self.decode_u32(ByteOrder::BigEndian)
    }

    pub fn decode_u64_be(&mut self) -> Result<u64, SmfError> {
        self.decode_u64(ByteOrder::BigEndian)
    }

    /// Reads a big-endian u64, or returns `None` if the stream ends cleanly
    /// before the first octet.
    pub fn try_decode_u64_be(&mut self, what: &str) -> Result<Option<u64>, SmfError> {
        let start = self.pos;
        let mut b = [0u8; 8];
        let mut filled = 0;
        while filled < b.len() {
            match self.inner.read(&mut b[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.pos = start + filled as u64;
                    return Err(self.short_read(start, 8, what, &e));
                }
            }
        }
        self.pos = start + filled as u64;
        match filled {
            0 => Ok(None),
            8 => Ok(Some(BigEndian::read_u64(&b))),
            _ => {
                let eof = io::Error::new(io::ErrorKind::UnexpectedEof, "end of stream");
                Err(self.short_read(start, 8, what, &eof))
            }
        }
    }

    /// Discards exactly `count` octets.
    pub fn skip(&mut self, count: u64, what: &str) -> Result<(), SmfError> {
        let start = self.pos;
        match io::copy(&mut (&mut self.inner).take(count), &mut io::sink()) {
            Ok(copied) => {
                self.pos = start + copied;
                if copied < count {
                    let eof = io::Error::new(io::ErrorKind::UnexpectedEof, "end of stream");
                    return Err(self.short_read(start, count, what, &eof));
                }
                Ok(())
            }
            Err(e) => Err(self.short_read(start, count, what, &e)),
        }
    }

    /// Skips forward to the absolute `offset`.
    ///
    /// # Errors
    ///
    /// Returns `SmfError::Format` if the stream has already read past `offset`.
    pub fn skip_to(&mut self, offset: u64, what: &str) -> Result<(), SmfError> {
        if offset < self.pos {
            return Err(SmfError::format(
                self.lexical(),
                format!(
                    "Read past the end of {}.\n  End: 0x{:x}\n  Position: 0x{:x}",
                    what, offset, self.pos
                ),
            ));
        }
        self.skip(offset - self.pos, what)
    }
}

impl<R: Read + Seek> DecoderStream<R> {
    /// Sets the read position. Only available for seekable streams.
    pub fn set_position(&mut self, pos: u64) -> Result<(), SmfError> {
        match self.inner.seek(SeekFrom::Start(pos)) {
            Ok(actual) => {
                self.pos = actual;
                Ok(())
            }
            Err(e) => Err(SmfError::Format(
                ParseError::new(
                    self.lexical_at(pos),
                    format!("Failed to seek to offset 0x{:x}", pos),
                )
                .with_cause(&e),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn decodes_in_both_byte_orders() {
        let data = [1u8, 2, 3, 4, 5, 6, 7, 8];
        let mut be = DecoderStream::new(&data[..]);
        assert_eq!(be.decode_u64(ByteOrder::BigEndian).unwrap(), 0x0102030405060708);
        let mut le = DecoderStream::new(&data[..]);
        assert_eq!(le.decode_u32(ByteOrder::LittleEndian).unwrap(), 0x04030201);
        assert_eq!(le.decode_u16(ByteOrder::LittleEndian).unwrap(), 0x0605);
        assert_eq!(le.position(), 6);
    }

    #[test]
    fn short_reads_carry_the_stable_prefix_and_cause() {
        let data = [0u8; 3];
        let mut s = DecoderStream::with_source(&data[..], "mem:test");
        match s.decode_u32_be() {
            Err(SmfError::Format(e)) => {
                assert!(e.message.starts_with(SHORT_READ_MESSAGE));
                assert_eq!(e.position.line, 0);
                assert_eq!(e.position.source.as_deref(), Some("mem:test"));
                assert_eq!(e.cause.unwrap().kind, io::ErrorKind::UnexpectedEof);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn clean_end_of_stream_is_not_an_error() {
        let mut s = DecoderStream::new(&[][..]);
        assert_eq!(s.try_decode_u64_be("magic").unwrap(), None);

        let partial = [0u8; 5];
        let mut s = DecoderStream::new(&partial[..]);
        assert!(s.try_decode_u64_be("magic").is_err());
    }

    #[test]
    fn oversized_vectors_fail_without_reserving() {
        let data = [1u8, 2, 3];
        let mut s = DecoderStream::new(&data[..]);
        match s.decode_vec(usize::MAX / 2, "metadata") {
            Err(SmfError::Format(e)) => assert!(e.message.starts_with(SHORT_READ_MESSAGE)),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(s.position(), 3);

        let mut s = DecoderStream::new(&data[..]);
        assert_eq!(s.decode_vec(2, "metadata").unwrap(), vec![1, 2]);
        assert_eq!(s.position(), 2);
    }

    #[test]
    fn skip_and_seek() {
        let data: Vec<u8> = (0..32).collect();
        let mut s = DecoderStream::new(Cursor::new(data));
        s.skip(10, "padding").unwrap();
        assert_eq!(s.decode_u8().unwrap(), 10);
        s.skip_to(20, "padding").unwrap();
        assert_eq!(s.decode_u8().unwrap(), 20);
        assert!(s.skip_to(4, "padding").is_err());
        s.set_position(4).unwrap();
        assert_eq!(s.decode_u8().unwrap(), 4);
        assert!(s.skip(100, "padding").is_err());
    }
}
