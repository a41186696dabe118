//! Attribute and triangle blocks.
//!
//! Each attribute occupies one block of `vertex_count` packed elements
//! padded to 16 octets; an `SMF_VDNI` section holds one block per declared
//! attribute in header order. `SMF_TRIS` holds one block of packed index
//! triples. Block payloads use the header's data byte order.

use std::io::{Read, Write};

use smf_core::{
    Attribute, ByteOrder, DecoderStream, ElementCodec, EncoderStream, Header, ParserEvents,
    SmfError, TriangleWidth, Triangles,
};

use crate::section::align16;

fn too_large(what: &str) -> SmfError {
    SmfError::invalid(format!("{} does not fit in a 64-bit stream", what))
}

/// Padded size of one attribute's block.
pub fn attribute_block_size(attribute: &Attribute, vertex_count: u64) -> Result<u64, SmfError> {
    vertex_count
        .checked_mul(attribute.size_octets())
        .and_then(align16)
        .ok_or_else(|| too_large("Attribute data"))
}

/// Size of the `SMF_VDNI` section data implied by `header`.
pub fn vertices_section_size(header: &Header) -> Result<u64, SmfError> {
    header
        .attributes_in_order()
        .iter()
        .try_fold(0u64, |total, attribute| {
            let block = attribute_block_size(attribute, header.vertex_count())?;
            total.checked_add(block).ok_or_else(|| too_large("Vertex data"))
        })
}

/// Size of the `SMF_TRIS` section data implied by `triangles`.
pub fn triangles_section_size(triangles: Triangles) -> Result<u64, SmfError> {
    triangles
        .count
        .checked_mul(triangles.triangle_size_octets())
        .and_then(align16)
        .ok_or_else(|| too_large("Triangle data"))
}

// =============================================================================
// Triangles
// =============================================================================

pub fn read_index<R: Read>(
    stream: &mut DecoderStream<R>,
    width: TriangleWidth,
    order: ByteOrder,
) -> Result<u64, SmfError> {
    Ok(match width {
        TriangleWidth::Bits8 => u64::from(stream.decode_u8()?),
        TriangleWidth::Bits16 => u64::from(stream.decode_u16(order)?),
        TriangleWidth::Bits32 => u64::from(stream.decode_u32(order)?),
        TriangleWidth::Bits64 => stream.decode_u64(order)?,
    })
}

/// Writes one index, truncated to `width`. Callers check the range first.
pub fn write_index<W: Write>(
    out: &mut EncoderStream<W>,
    width: TriangleWidth,
    order: ByteOrder,
    index: u64,
) -> Result<(), SmfError> {
    match width {
        TriangleWidth::Bits8 => out.encode_u8(index as u8),
        TriangleWidth::Bits16 => out.encode_u16(index as u16, order),
        TriangleWidth::Bits32 => out.encode_u32(index as u32, order),
        TriangleWidth::Bits64 => out.encode_u64(index, order),
    }
}

/// Reads `triangles.count` triangles into `sink`, then skips the padding
/// up to `block_end`.
pub fn read_triangle_block<R: Read>(
    stream: &mut DecoderStream<R>,
    triangles: Triangles,
    order: ByteOrder,
    block_end: u64,
    sink: &mut dyn ParserEvents,
) -> Result<(), SmfError> {
    let width = triangles.index_width;
    for _ in 0..triangles.count {
        let v0 = read_index(stream, width, order)?;
        let v1 = read_index(stream, width, order)?;
        let v2 = read_index(stream, width, order)?;
        sink.on_data_triangle(v0, v1, v2);
    }
    stream.skip_to(block_end, "triangle padding")
}

// =============================================================================
// Attributes
// =============================================================================

/// Reads `vertex_count` elements into `sink`, then skips the padding up to
/// `block_end`.
pub fn read_attribute_block<R: Read>(
    stream: &mut DecoderStream<R>,
    codec: &ElementCodec,
    vertex_count: u64,
    block_end: u64,
    sink: &mut dyn ParserEvents,
) -> Result<(), SmfError> {
    for _ in 0..vertex_count {
        sink.on_data_attribute_value(codec.decode(stream)?);
    }
    stream.skip_to(block_end, "attribute padding")
}

#[cfg(test)]
mod tests {
    use super::*;
    use smf_core::{AttributeName, ComponentType, IgnoringEvents, ParseError, ParseWarning};

    #[derive(Default)]
    struct Triples(Vec<[u64; 3]>);

    impl ParserEvents for Triples {
        fn on_error(&mut self, _error: ParseError) {}
        fn on_warning(&mut self, _warning: ParseWarning) {}
        fn on_data_triangle(&mut self, v0: u64, v1: u64, v2: u64) {
            self.0.push([v0, v1, v2]);
        }
    }

    #[test]
    fn block_sizes_are_padded() {
        let attribute = Attribute::new(
            AttributeName::new("x").unwrap(),
            ComponentType::Floating,
            3,
            16,
        )
        .unwrap();
        assert_eq!(attribute_block_size(&attribute, 3).unwrap(), 32);
        assert_eq!(attribute_block_size(&attribute, 0).unwrap(), 0);
        assert!(attribute_block_size(&attribute, u64::MAX).is_err());

        let t = Triangles::new(2, TriangleWidth::Bits16);
        assert_eq!(triangles_section_size(t).unwrap(), 16);
        let t = Triangles::new(3, TriangleWidth::Bits32);
        assert_eq!(triangles_section_size(t).unwrap(), 48);
    }

    #[test]
    fn triangles_use_the_data_byte_order() {
        let mut out = EncoderStream::new(Vec::new());
        for v in [1u64, 2, 0x0300] {
            write_index(&mut out, TriangleWidth::Bits16, ByteOrder::LittleEndian, v).unwrap();
        }
        out.pad_to(16).unwrap();
        let bytes = out.into_inner();
        assert_eq!(&bytes[..6], &[1, 0, 2, 0, 0, 3]);

        let mut input = DecoderStream::new(&bytes[..]);
        let mut triples = Triples::default();
        read_triangle_block(
            &mut input,
            Triangles::new(1, TriangleWidth::Bits16),
            ByteOrder::LittleEndian,
            16,
            &mut triples,
        )
        .unwrap();
        assert_eq!(triples.0, [[1, 2, 0x0300]]);
        assert_eq!(input.position(), 16);
    }

    #[test]
    fn truncated_blocks_fail() {
        let bytes = [0u8; 5];
        let mut input = DecoderStream::new(&bytes[..]);
        let err = read_triangle_block(
            &mut input,
            Triangles::new(1, TriangleWidth::Bits16),
            ByteOrder::BigEndian,
            16,
            &mut IgnoringEvents,
        )
        .unwrap_err();
        assert!(err.to_string().contains(smf_core::status::SHORT_READ_MESSAGE));
    }
}
