//! Byte layout of the file preamble, the `SMF_HEAD` section and the schema
//! blocks shared with `SMF_META`.
//!
//! Offsets are relative to the first data octet of the section. Every
//! field here is big-endian regardless of the header's data byte order.
//!
//! ```text
//!   0  fields_size            u32   (>= 124)
//!   4  schema block           76 octets
//!  80  vertex_count           u64
//!  88  triangle_count         u64
//!  96  triangle_index_bits    u32
//! 100  attribute_count        u32
//! 104  right, up, forward     u8 x 3
//! 107  winding_order          u8
//! 108  meta_count             u32
//! 112  data_byte_order        u32   (0 = big, 1 = little)
//! 116  reserved               12 octets
//! 128  attribute records      80 octets each
//! ```

use std::io::{Read, Write};

use byteorder::{BigEndian, ByteOrder as _};

use smf_core::{
    Attribute, AttributeName, Axis, ByteOrder, ComponentType, CoordinateSystem, DecoderStream,
    EncoderStream, FormatVersion, Header, LexicalPosition, SchemaIdentifier, SchemaName, SmfError,
    TriangleWidth, Triangles, WindingOrder,
};

use crate::section::{align16, write_section_header, Section, MAGIC_HEADER};

// =============================================================================
// File preamble
// =============================================================================

/// Identifier at the start of every binary SMF file.
pub const FILE_MAGIC: [u8; 8] = [0x89, b'S', b'M', b'F', 0x0D, 0x0A, 0x1A, 0x0A];

/// Magic plus major and minor version.
pub const FILE_PREAMBLE_SIZE: u64 = 16;

// =============================================================================
// Header section
// =============================================================================

pub const HEADER_SIZE: usize = 128;
pub const HEADER_FIELDS_SIZE: u32 = 124;

pub const OFFSET_FIELDS_SIZE: usize = 0;
pub const OFFSET_SCHEMA: usize = 4;
pub const OFFSET_VERTEX_COUNT: usize = 80;
pub const OFFSET_TRIANGLE_COUNT: usize = 88;
pub const OFFSET_TRIANGLE_SIZE: usize = 96;
pub const OFFSET_ATTRIBUTE_COUNT: usize = 100;
pub const OFFSET_COORDINATE_SYSTEM: usize = 104;
pub const OFFSET_META_COUNT: usize = 108;
pub const OFFSET_DATA_BYTE_ORDER: usize = 112;
const FIELDS_END: usize = 116;

/// Name length, name octets, major and minor version.
pub const SCHEMA_BLOCK_SIZE: usize = 76;
const NAME_CAPACITY: usize = 64;

/// Name length, name octets, component type, count and size.
pub const ATTRIBUTE_RECORD_SIZE: usize = 80;

/// Records reserved up front; larger counts grow as records are read.
const RESERVED_ATTRIBUTES: u32 = 1024;

const _: () = assert!(OFFSET_SCHEMA + SCHEMA_BLOCK_SIZE == OFFSET_VERTEX_COUNT);
const _: () = assert!(OFFSET_VERTEX_COUNT % 8 == 0 && OFFSET_TRIANGLE_COUNT % 8 == 0);
const _: () = assert!(OFFSET_TRIANGLE_SIZE % 4 == 0 && OFFSET_META_COUNT % 4 == 0);
const _: () = assert!(FIELDS_END <= HEADER_SIZE && HEADER_SIZE % 16 == 0);
const _: () = assert!(HEADER_FIELDS_SIZE as usize + 4 == HEADER_SIZE);
const _: () = assert!(ATTRIBUTE_RECORD_SIZE % 16 == 0);

/// Size of the header section's data for `attribute_count` attributes.
pub fn header_section_size(attribute_count: usize) -> u64 {
    HEADER_SIZE as u64 + (attribute_count as u64) * ATTRIBUTE_RECORD_SIZE as u64
}

pub fn write_preamble<W: Write>(
    out: &mut EncoderStream<W>,
    version: FormatVersion,
) -> Result<(), SmfError> {
    out.encode_bytes(&FILE_MAGIC)?;
    out.encode_u32_be(version.major)?;
    out.encode_u32_be(version.minor)
}

/// Reads the magic and version at the start of a stream.
pub fn read_preamble<R: Read>(stream: &mut DecoderStream<R>) -> Result<FormatVersion, SmfError> {
    let mut magic = [0u8; 8];
    stream.decode_bytes(&mut magic, "file magic")?;
    if magic != FILE_MAGIC {
        return Err(SmfError::format(
            stream.lexical_at(0),
            format!(
                "Bad magic number.\n  Expected: {}\n  Received: {}",
                hex(&FILE_MAGIC),
                hex(&magic)
            ),
        ));
    }
    let major = stream.decode_u32_be()?;
    let minor = stream.decode_u32_be()?;
    Ok(FormatVersion::new(major, minor))
}

/// Checks a prefix without consuming a stream.
pub fn probe_preamble(prefix: &[u8]) -> Option<FormatVersion> {
    if prefix.len() < FILE_PREAMBLE_SIZE as usize || prefix[..8] != FILE_MAGIC {
        return None;
    }
    Some(FormatVersion::new(
        BigEndian::read_u32(&prefix[8..12]),
        BigEndian::read_u32(&prefix[12..16]),
    ))
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

// =============================================================================
// Names and schema blocks
// =============================================================================

fn write_name(buf: &mut [u8], name: &str) {
    BigEndian::write_u32(&mut buf[0..4], name.len() as u32);
    buf[4..4 + name.len()].copy_from_slice(name.as_bytes());
}

fn read_name(buf: &[u8]) -> Result<String, SmfError> {
    let length = BigEndian::read_u32(&buf[0..4]) as usize;
    if length > NAME_CAPACITY {
        return Err(SmfError::invalid(format!(
            "Name length {} is longer than {}",
            length, NAME_CAPACITY
        )));
    }
    String::from_utf8(buf[4..4 + length].to_vec())
        .map_err(|_| SmfError::invalid("Name is not valid UTF-8"))
}

pub fn encode_schema_block(schema: Option<&SchemaIdentifier>) -> [u8; SCHEMA_BLOCK_SIZE] {
    let mut buf = [0u8; SCHEMA_BLOCK_SIZE];
    if let Some(schema) = schema {
        write_name(&mut buf[0..68], schema.name.as_str());
        BigEndian::write_u32(&mut buf[68..72], schema.version_major);
        BigEndian::write_u32(&mut buf[72..76], schema.version_minor);
    }
    buf
}

/// An empty name means no schema.
pub fn decode_schema_block(buf: &[u8]) -> Result<Option<SchemaIdentifier>, SmfError> {
    let name = read_name(&buf[0..68])?;
    if name.is_empty() {
        return Ok(None);
    }
    Ok(Some(SchemaIdentifier::new(
        SchemaName::new(name)?,
        BigEndian::read_u32(&buf[68..72]),
        BigEndian::read_u32(&buf[72..76]),
    )))
}

// =============================================================================
// Attribute records
// =============================================================================

pub fn encode_attribute_record(attribute: &Attribute) -> [u8; ATTRIBUTE_RECORD_SIZE] {
    let mut buf = [0u8; ATTRIBUTE_RECORD_SIZE];
    write_name(&mut buf[0..68], attribute.name().as_str());
    BigEndian::write_u32(&mut buf[68..72], attribute.component_type().code());
    BigEndian::write_u32(&mut buf[72..76], attribute.component_count());
    BigEndian::write_u32(&mut buf[76..80], attribute.component_size_bits());
    buf
}

pub fn decode_attribute_record(buf: &[u8]) -> Result<Attribute, SmfError> {
    let name = AttributeName::new(read_name(&buf[0..68])?)?;
    let component_type = ComponentType::from_code(BigEndian::read_u32(&buf[68..72]))?;
    Attribute::new(
        name,
        component_type,
        BigEndian::read_u32(&buf[72..76]),
        BigEndian::read_u32(&buf[76..80]),
    )
}

// =============================================================================
// Header view
// =============================================================================

/// Offset-addressed view of the fixed header fields.
#[derive(Debug, Clone, Copy)]
pub struct HeaderView<'a> {
    bytes: &'a [u8; HEADER_SIZE],
}

impl<'a> HeaderView<'a> {
    pub fn new(bytes: &'a [u8; HEADER_SIZE]) -> Self {
        Self { bytes }
    }

    fn u32_at(&self, offset: usize) -> u32 {
        BigEndian::read_u32(&self.bytes[offset..offset + 4])
    }

    fn u64_at(&self, offset: usize) -> u64 {
        BigEndian::read_u64(&self.bytes[offset..offset + 8])
    }

    pub fn fields_size(&self) -> u32 {
        self.u32_at(OFFSET_FIELDS_SIZE)
    }

    pub fn schema_block(&self) -> &'a [u8] {
        &self.bytes[OFFSET_SCHEMA..OFFSET_SCHEMA + SCHEMA_BLOCK_SIZE]
    }

    pub fn vertex_count(&self) -> u64 {
        self.u64_at(OFFSET_VERTEX_COUNT)
    }

    pub fn triangle_count(&self) -> u64 {
        self.u64_at(OFFSET_TRIANGLE_COUNT)
    }

    pub fn triangle_index_size_bits(&self) -> u32 {
        self.u32_at(OFFSET_TRIANGLE_SIZE)
    }

    pub fn attribute_count(&self) -> u32 {
        self.u32_at(OFFSET_ATTRIBUTE_COUNT)
    }

    /// Right, up, forward and winding codes.
    pub fn coordinate_codes(&self) -> [u8; 4] {
        let mut codes = [0u8; 4];
        codes.copy_from_slice(&self.bytes[OFFSET_COORDINATE_SYSTEM..OFFSET_COORDINATE_SYSTEM + 4]);
        codes
    }

    pub fn meta_count(&self) -> u32 {
        self.u32_at(OFFSET_META_COUNT)
    }

    pub fn data_byte_order(&self) -> u32 {
        self.u32_at(OFFSET_DATA_BYTE_ORDER)
    }
}

pub fn encode_header_fields(header: &Header) -> [u8; HEADER_SIZE] {
    let mut buf = [0u8; HEADER_SIZE];
    BigEndian::write_u32(&mut buf[OFFSET_FIELDS_SIZE..], HEADER_FIELDS_SIZE);
    buf[OFFSET_SCHEMA..OFFSET_VERTEX_COUNT]
        .copy_from_slice(&encode_schema_block(header.schema_identifier()));
    BigEndian::write_u64(&mut buf[OFFSET_VERTEX_COUNT..], header.vertex_count());
    let triangles = header.triangles();
    BigEndian::write_u64(&mut buf[OFFSET_TRIANGLE_COUNT..], triangles.count);
    BigEndian::write_u32(&mut buf[OFFSET_TRIANGLE_SIZE..], triangles.index_width.bits());
    BigEndian::write_u32(
        &mut buf[OFFSET_ATTRIBUTE_COUNT..],
        header.attributes_in_order().len() as u32,
    );
    let cs = header.coordinate_system();
    buf[OFFSET_COORDINATE_SYSTEM] = cs.right().code();
    buf[OFFSET_COORDINATE_SYSTEM + 1] = cs.up().code();
    buf[OFFSET_COORDINATE_SYSTEM + 2] = cs.forward().code();
    buf[OFFSET_COORDINATE_SYSTEM + 3] = cs.winding_order().code();
    BigEndian::write_u32(&mut buf[OFFSET_META_COUNT..], header.meta_count());
    BigEndian::write_u32(
        &mut buf[OFFSET_DATA_BYTE_ORDER..],
        header.data_byte_order().code(),
    );
    buf
}

/// Writes a complete `SMF_HEAD` section.
pub fn write_header_section<W: Write>(
    out: &mut EncoderStream<W>,
    header: &Header,
) -> Result<Section, SmfError> {
    let size = header_section_size(header.attributes_in_order().len());
    let section = write_section_header(out, MAGIC_HEADER, size)?;
    out.encode_bytes(&encode_header_fields(header))?;
    for attribute in header.attributes_in_order() {
        out.encode_bytes(&encode_attribute_record(attribute))?;
    }
    out.pad_to(section.end_offset())?;
    Ok(section)
}

/// Decodes the data of an `SMF_HEAD` section. The stream must be at the
/// section's first data octet.
pub fn read_header_section<R: Read>(
    stream: &mut DecoderStream<R>,
    section: &Section,
) -> Result<Header, SmfError> {
    let start = section.data_offset();
    if section.size_of_data < HEADER_SIZE as u64 {
        return Err(SmfError::format(
            stream.lexical_at(start),
            format!(
                "Section is too small to contain a version 1.0 header.\n  Required: {}\n  Received: {}",
                HEADER_SIZE, section.size_of_data
            ),
        ));
    }

    let mut fixed = [0u8; HEADER_SIZE];
    stream.decode_bytes(&mut fixed, "header fields")?;
    let view = HeaderView::new(&fixed);
    let source = stream.source().map(str::to_owned);
    let at =
        |offset: usize| LexicalPosition::at_offset(start + offset as u64, source.as_deref());
    let invalid = |offset: usize, e: SmfError| match e {
        SmfError::InvalidParameter(message) => SmfError::format(at(offset), message),
        other => other,
    };

    let fields_size = view.fields_size();
    if fields_size < HEADER_FIELDS_SIZE {
        return Err(SmfError::format(
            at(OFFSET_FIELDS_SIZE),
            format!(
                "Specified fields size {} is too small (must be at least {})",
                fields_size, HEADER_FIELDS_SIZE
            ),
        ));
    }

    let schema =
        decode_schema_block(view.schema_block()).map_err(|e| invalid(OFFSET_SCHEMA, e))?;
    let index_width = TriangleWidth::from_bits(view.triangle_index_size_bits())
        .map_err(|e| invalid(OFFSET_TRIANGLE_SIZE, e))?;
    let [right, up, forward, winding] = view.coordinate_codes();
    let coordinate_system = Axis::from_code(right)
        .and_then(|right| Ok((right, Axis::from_code(up)?)))
        .and_then(|(right, up)| Ok((right, up, Axis::from_code(forward)?)))
        .and_then(|(right, up, forward)| {
            CoordinateSystem::new(right, up, forward, WindingOrder::from_code(winding)?)
        })
        .map_err(|e| invalid(OFFSET_COORDINATE_SYSTEM, e))?;
    let data_byte_order = ByteOrder::from_code(view.data_byte_order())
        .map_err(|e| invalid(OFFSET_DATA_BYTE_ORDER, e))?;

    // Fields appended by later minor versions are skipped.
    let records_start = align16(u64::from(fields_size) + 4).unwrap_or(u64::MAX);
    let attribute_count = view.attribute_count();
    let required = u64::from(attribute_count)
        .checked_mul(ATTRIBUTE_RECORD_SIZE as u64)
        .and_then(|v| v.checked_add(records_start));
    match required {
        Some(required) if required <= section.size_of_data => {}
        _ => {
            return Err(SmfError::format(
                at(OFFSET_ATTRIBUTE_COUNT),
                format!(
                    "Section is too small to contain the declared attributes.\n  Attributes: {}\n  Section size: {}",
                    attribute_count, section.size_of_data
                ),
            ))
        }
    }
    stream.skip_to(start + records_start, "header fields")?;

    let mut attributes = Vec::with_capacity(attribute_count.min(RESERVED_ATTRIBUTES) as usize);
    let mut record = [0u8; ATTRIBUTE_RECORD_SIZE];
    for _ in 0..attribute_count {
        let offset = stream.position();
        stream.decode_bytes(&mut record, "attribute record")?;
        let attribute = decode_attribute_record(&record).map_err(|e| match e {
            SmfError::InvalidParameter(message) => {
                SmfError::format(stream.lexical_at(offset), message)
            }
            other => other,
        })?;
        attributes.push(attribute);
    }

    Header::builder()
        .vertex_count(view.vertex_count())
        .triangles(Triangles::new(view.triangle_count(), index_width))
        .attributes(attributes)
        .coordinate_system(coordinate_system)
        .schema_identifier(schema)
        .meta_count(view.meta_count())
        .data_byte_order(data_byte_order)
        .build()
        .map_err(|e| invalid(OFFSET_ATTRIBUTE_COUNT, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::section::read_section;

    fn sample_header() -> Header {
        Header::builder()
            .vertex_count(3)
            .triangles(Triangles::new(1, TriangleWidth::Bits16))
            .attribute(
                Attribute::new(
                    AttributeName::new("POSITION").unwrap(),
                    ComponentType::Floating,
                    3,
                    32,
                )
                .unwrap(),
            )
            .schema_identifier(Some(SchemaIdentifier::new(
                SchemaName::new("com.example.mesh").unwrap(),
                2,
                1,
            )))
            .meta_count(1)
            .data_byte_order(ByteOrder::LittleEndian)
            .build()
            .unwrap()
    }

    #[test]
    fn header_section_round_trip() {
        let header = sample_header();
        let mut out = EncoderStream::new(Vec::new());
        let written = write_header_section(&mut out, &header).unwrap();
        assert_eq!(written.size_of_data, 128 + 80);
        let bytes = out.into_inner();
        assert_eq!(bytes.len() as u64, written.size_total());

        let mut input = DecoderStream::new(&bytes[..]);
        let section = read_section(&mut input).unwrap();
        assert_eq!(read_header_section(&mut input, &section).unwrap(), header);
    }

    #[test]
    fn fields_are_big_endian_at_fixed_offsets() {
        let fields = encode_header_fields(&sample_header());
        assert_eq!(&fields[0..4], &[0, 0, 0, 124]);
        assert_eq!(&fields[80..88], &[0, 0, 0, 0, 0, 0, 0, 3]);
        assert_eq!(&fields[96..100], &[0, 0, 0, 16]);
        assert_eq!(&fields[104..108], &[0, 1, 5, 1]);
        assert_eq!(&fields[112..116], &[0, 0, 0, 1]);
        assert!(fields[116..].iter().all(|&b| b == 0));
    }

    #[test]
    fn undersized_fields_are_rejected() {
        let mut out = EncoderStream::new(Vec::new());
        write_header_section(&mut out, &sample_header()).unwrap();
        let mut bytes = out.into_inner();
        bytes[16 + 3] = 100;

        let mut input = DecoderStream::new(&bytes[..]);
        let section = read_section(&mut input).unwrap();
        let err = read_header_section(&mut input, &section).unwrap_err();
        assert!(err
            .to_string()
            .contains("Specified fields size 100 is too small (must be at least 124)"));
    }

    #[test]
    fn small_sections_are_rejected() {
        let mut out = EncoderStream::new(Vec::new());
        write_section_header(&mut out, MAGIC_HEADER, 64).unwrap();
        out.encode_zeroes(64).unwrap();
        let bytes = out.into_inner();

        let mut input = DecoderStream::new(&bytes[..]);
        let section = read_section(&mut input).unwrap();
        let err = read_header_section(&mut input, &section).unwrap_err();
        assert!(err
            .to_string()
            .contains("Section is too small to contain a version 1.0 header."));
    }

    #[test]
    fn probe_reads_the_version() {
        let mut out = EncoderStream::new(Vec::new());
        write_preamble(&mut out, FormatVersion::new(1, 0)).unwrap();
        let bytes = out.into_inner();
        assert_eq!(probe_preamble(&bytes), Some(FormatVersion::new(1, 0)));
        assert_eq!(probe_preamble(&bytes[..12]), None);
        assert_eq!(probe_preamble(b"not an smf file!"), None);
    }
}
