//! Section framing.
//!
//! A binary SMF stream is a sequence of self-describing sections:
//!
//! ```text
//! magic        u64 BE
//! size_of_data u64 BE   (multiple of 16)
//! data         size_of_data octets, zero padded
//! ```
//!
//! Because the 16-octet section header is itself aligned, every section
//! occupies `align16(16 + size_of_data)` octets and the next one starts
//! right after it. Sections are discovered by a linear scan; random-access
//! readers record the offsets from one scan and seek to them later.

use std::fmt;
use std::io::{Read, Write};

use smf_core::{DecoderStream, EncoderStream, SmfError};

/// Size of the magic and size fields that open every section.
pub const SECTION_HEADER_SIZE: u64 = 16;

/// Alignment of section sizes and offsets.
pub const SECTION_ALIGNMENT: u64 = 16;

// =============================================================================
// Known section magics
// =============================================================================

/// `SMF_HEAD`
pub const MAGIC_HEADER: u64 = 0x534D_465F_4845_4144;

/// `SMF_VDNI`: non-interleaved vertex data.
pub const MAGIC_VERTICES_NON_INTERLEAVED: u64 = 0x534D_465F_5644_4E49;

/// `SMF_TRIS`
pub const MAGIC_TRIANGLES: u64 = 0x534D_465F_5452_4953;

/// `SMF_META`
pub const MAGIC_METADATA: u64 = 0x534D_465F_4D45_5441;

/// `SMF_END!`
pub const MAGIC_END: u64 = 0x534D_465F_454E_4421;

/// Rounds `n` up to the next multiple of 16, or `None` on overflow.
pub fn align16(n: u64) -> Option<u64> {
    n.checked_add(SECTION_ALIGNMENT - 1)
        .map(|v| v & !(SECTION_ALIGNMENT - 1))
}

/// Renders a magic as ASCII when printable, otherwise as hex.
pub fn magic_name(magic: u64) -> String {
    let bytes = magic.to_be_bytes();
    if bytes.iter().all(|b| b.is_ascii_graphic()) {
        bytes.iter().map(|&b| b as char).collect()
    } else {
        format!("0x{:016x}", magic)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Section {
    pub magic: u64,
    /// Absolute offset of the section's magic.
    pub offset: u64,
    pub size_of_data: u64,
}

impl Section {
    /// Octets occupied by the section, header included.
    pub fn size_total(&self) -> u64 {
        SECTION_HEADER_SIZE + self.size_of_data
    }

    /// Absolute offset of the first data octet.
    pub fn data_offset(&self) -> u64 {
        self.offset + SECTION_HEADER_SIZE
    }

    /// Absolute offset of the next section.
    pub fn end_offset(&self) -> u64 {
        self.offset + self.size_total()
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of size {}/{} at 0x{:x}",
            magic_name(self.magic),
            self.size_of_data,
            self.size_total(),
            self.offset
        )
    }
}

fn frame<R: Read>(
    stream: &DecoderStream<R>,
    magic: u64,
    offset: u64,
    size_of_data: u64,
) -> Result<Section, SmfError> {
    if size_of_data % SECTION_ALIGNMENT != 0 {
        return Err(SmfError::format(
            stream.lexical_at(offset),
            format!(
                "Section sizes must be multiples of 16\n  Section: {}\n  Size: {}\n  Position: 0x{:x}",
                magic_name(magic),
                size_of_data,
                offset
            ),
        ));
    }
    if offset
        .checked_add(SECTION_HEADER_SIZE)
        .and_then(|v| v.checked_add(size_of_data))
        .is_none()
    {
        return Err(SmfError::format(
            stream.lexical_at(offset),
            format!(
                "Section size overflows the stream\n  Section: {}\n  Size: {}",
                magic_name(magic),
                size_of_data
            ),
        ));
    }
    let section = Section {
        magic,
        offset,
        size_of_data,
    };
    log::trace!("section: {}", section);
    Ok(section)
}

/// Reads one section header at the current position.
///
/// On success the stream is positioned at the section's data.
pub fn read_section<R: Read>(stream: &mut DecoderStream<R>) -> Result<Section, SmfError> {
    let offset = stream.position();
    let magic = stream.decode_u64_be()?;
    let size_of_data = stream.decode_u64_be()?;
    frame(stream, magic, offset, size_of_data)
}

/// Writes a section header. The caller writes exactly `size_of_data`
/// octets of data afterwards.
pub fn write_section_header<W: Write>(
    out: &mut EncoderStream<W>,
    magic: u64,
    size_of_data: u64,
) -> Result<Section, SmfError> {
    if size_of_data % SECTION_ALIGNMENT != 0 {
        return Err(SmfError::contract(format!(
            "Section sizes must be multiples of 16\n  Section: {}\n  Size: {}",
            magic_name(magic),
            size_of_data
        )));
    }
    let section = Section {
        magic,
        offset: out.position(),
        size_of_data,
    };
    log::trace!("section: {}", section);
    out.encode_u64_be(magic)?;
    out.encode_u64_be(size_of_data)?;
    Ok(section)
}

/// Linear section iterator over a forward-only stream.
///
/// Each call to [`SectionScanner::next`] first skips whatever remains of
/// the previous section, so callers may read as little of a section as
/// they like. Scanning stops after an `SMF_END!` section or at a clean end
/// of stream on a section boundary.
#[derive(Debug, Default)]
pub struct SectionScanner {
    next_offset: Option<u64>,
    done: bool,
}

impl SectionScanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next<R: Read>(
        &mut self,
        stream: &mut DecoderStream<R>,
    ) -> Result<Option<Section>, SmfError> {
        if self.done {
            return Ok(None);
        }
        if let Some(next) = self.next_offset {
            stream.skip_to(next, "section")?;
        }
        let offset = stream.position();
        let Some(magic) = stream.try_decode_u64_be("section magic")? else {
            self.done = true;
            return Ok(None);
        };
        let size_of_data = stream.decode_u64_be()?;
        let section = frame(stream, magic, offset, size_of_data)?;
        self.next_offset = Some(section.end_offset());
        if magic == MAGIC_END {
            self.done = true;
        }
        Ok(Some(section))
    }
}

/// Records every section of a stream in order.
pub fn scan_sections<R: Read>(stream: &mut DecoderStream<R>) -> Result<Vec<Section>, SmfError> {
    let mut scanner = SectionScanner::new();
    let mut sections = Vec::new();
    while let Some(section) = scanner.next(stream)? {
        sections.push(section);
    }
    Ok(sections)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align16_rounds_up() {
        assert_eq!(align16(0), Some(0));
        assert_eq!(align16(1), Some(16));
        assert_eq!(align16(16), Some(16));
        assert_eq!(align16(17), Some(32));
        assert_eq!(align16(u64::MAX), None);
    }

    #[test]
    fn magic_names() {
        assert_eq!(magic_name(MAGIC_HEADER), "SMF_HEAD");
        assert_eq!(magic_name(MAGIC_END), "SMF_END!");
        assert_eq!(magic_name(0x1020304050607080), "0x1020304050607080");
    }

    #[test]
    fn written_sections_are_readable() {
        let mut out = EncoderStream::new(Vec::new());
        let written = write_section_header(&mut out, MAGIC_TRIANGLES, 32).unwrap();
        out.encode_zeroes(32).unwrap();
        assert_eq!(written.size_total(), 48);

        let bytes = out.into_inner();
        let mut input = DecoderStream::new(&bytes[..]);
        let read = read_section(&mut input).unwrap();
        assert_eq!(read, written);
        assert_eq!(input.position(), read.data_offset());
    }

    #[test]
    fn unaligned_sizes_are_rejected_on_write() {
        let mut out = EncoderStream::new(Vec::new());
        assert!(write_section_header(&mut out, MAGIC_TRIANGLES, 12).is_err());
        assert_eq!(out.position(), 0);
    }

    #[test]
    fn scanner_skips_unread_data() {
        let mut out = EncoderStream::new(Vec::new());
        write_section_header(&mut out, MAGIC_METADATA, 32).unwrap();
        out.encode_zeroes(32).unwrap();
        write_section_header(&mut out, MAGIC_END, 0).unwrap();
        write_section_header(&mut out, MAGIC_HEADER, 0).unwrap();
        let bytes = out.into_inner();

        let mut input = DecoderStream::new(&bytes[..]);
        let sections = scan_sections(&mut input).unwrap();
        let magics: Vec<_> = sections.iter().map(|s| s.magic).collect();
        assert_eq!(magics, [MAGIC_METADATA, MAGIC_END]);
        assert_eq!(sections[1].offset, 48);
    }
}
