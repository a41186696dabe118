use std::collections::BTreeMap;

use smf_core::status::SHORT_READ_MESSAGE;
use smf_core::tracker::{MISSING_TRIANGLES, MISSING_VERTICES};
use smf_core::{
    serialize_mesh, Attribute, AttributeArray, AttributeName, AttributeValue, ByteOrder,
    ComponentType, DecoderStream, EncoderStream, Header, IgnoringEvents, Interest, MemoryMesh,
    MemoryMeshProducer, MetadataValue, ParseError, ParseWarning, ParserEvents, SchemaIdentifier,
    SchemaName, Serializer, SmfError, TriangleWidth, Triangles,
};
use smf_io::header_layout::write_preamble;
use smf_io::section::{
    scan_sections, write_section_header, MAGIC_END, MAGIC_HEADER, MAGIC_METADATA,
    MAGIC_TRIANGLES,
};
use smf_io::{BinaryParser, BinarySerializer, ParserState};

// =============================================================================
// Helpers
// =============================================================================

fn attr(name: &str, ty: ComponentType, count: u32, bits: u32) -> Attribute {
    Attribute::new(AttributeName::new(name).unwrap(), ty, count, bits).unwrap()
}

fn schema(name: &str) -> SchemaIdentifier {
    SchemaIdentifier::new(SchemaName::new(name).unwrap(), 1, 0)
}

/// Records events as readable lines.
#[derive(Default)]
struct Recorder {
    log: Vec<String>,
    errors: Vec<ParseError>,
    warnings: Vec<ParseWarning>,
    accept_triangles: bool,
}

impl ParserEvents for Recorder {
    fn on_error(&mut self, error: ParseError) {
        self.errors.push(error);
    }

    fn on_warning(&mut self, warning: ParseWarning) {
        self.warnings.push(warning);
    }

    fn on_version_received(&mut self, _version: smf_core::FormatVersion) -> Interest {
        Interest::Accept
    }

    fn on_header_parsed(&mut self, _header: &Header) -> Interest {
        Interest::Accept
    }

    fn on_attributes_non_interleaved(&mut self) -> Interest {
        Interest::Accept
    }

    fn on_data_attribute_start(&mut self, attribute: &Attribute) -> Interest {
        self.log.push(format!("start {}", attribute.name()));
        Interest::Accept
    }

    fn on_data_attribute_value(&mut self, value: AttributeValue) {
        self.log.push(format!("value {:?}", value));
    }

    fn on_data_attribute_value_finish(&mut self) {
        self.log.push("finish".to_string());
    }

    fn on_triangles(&mut self) -> Interest {
        Interest::from_bool(self.accept_triangles)
    }

    fn on_data_triangle(&mut self, v0: u64, v1: u64, v2: u64) {
        self.log.push(format!("triangle {} {} {}", v0, v1, v2));
    }

    fn on_meta(&mut self, _schema: &SchemaIdentifier) -> Interest {
        Interest::Accept
    }

    fn on_meta_data(&mut self, schema: &SchemaIdentifier, data: &[u8]) {
        self.log.push(format!("meta {} {:?}", schema, data));
    }
}

fn parse(bytes: &[u8], events: &mut dyn ParserEvents) -> (Result<(), SmfError>, ParserState) {
    let mut parser = BinaryParser::with_source(bytes, "mem:test");
    let result = parser.parse(events);
    (result, parser.state())
}

fn sample_mesh() -> MemoryMesh {
    let position = attr("POSITION", ComponentType::Floating, 3, 32);
    let uv = attr("UV", ComponentType::Floating, 2, 16);
    let group = attr("group", ComponentType::IntegerSigned, 1, 8);
    let index = attr("index", ComponentType::IntegerUnsigned, 4, 64);
    let header = Header::builder()
        .vertex_count(3)
        .triangles(Triangles::new(2, TriangleWidth::Bits16))
        .attributes(vec![position.clone(), uv.clone(), group.clone(), index.clone()])
        .schema_identifier(Some(schema("com.example.test")))
        .meta_count(2)
        .data_byte_order(ByteOrder::LittleEndian)
        .build()
        .unwrap();

    let mut arrays = BTreeMap::new();
    arrays.insert(
        position.name().clone(),
        AttributeArray::Float3(vec![[0.0, 0.0, 0.0], [1.0, 0.5, -2.0], [0.25, 1.0, 3.0]]),
    );
    arrays.insert(
        uv.name().clone(),
        AttributeArray::Float2(vec![[0.0, 1.0], [0.5, 0.5], [1.0, -1.0]]),
    );
    arrays.insert(group.name().clone(), AttributeArray::Signed1(vec![-128, 0, 127]));
    arrays.insert(
        index.name().clone(),
        AttributeArray::Unsigned4(vec![[0, 1, 2, 3], [u64::MAX, 0, 7, 9], [1, 1, 1, 1]]),
    );
    MemoryMesh::new(
        header,
        arrays,
        vec![[0, 1, 2], [2, 1, 0]],
        vec![
            MetadataValue::new(schema("com.example.a"), b"hello".to_vec()),
            MetadataValue::new(schema("com.example.b"), vec![0u8; 33]),
        ],
    )
    .unwrap()
}

fn write_mesh(mesh: &MemoryMesh) -> Vec<u8> {
    let mut serializer = BinarySerializer::new(Vec::new());
    serialize_mesh(mesh, &mut serializer).unwrap();
    serializer.finish().unwrap();
    serializer.into_inner()
}

// =============================================================================
// Framing
// =============================================================================

#[test]
fn sections_are_found_at_aligned_offsets() {
    let magics = [
        0x1020304050607080u64,
        0x1121314151617181,
        0x1222324252627282,
        0x1323334353637383,
        0x1424344454647484,
    ];
    let mut out = EncoderStream::new(Vec::new());
    for magic in magics {
        write_section_header(&mut out, magic, 0).unwrap();
    }
    let bytes = out.into_inner();

    let mut input = DecoderStream::new(&bytes[..]);
    let sections = scan_sections(&mut input).unwrap();
    assert_eq!(sections.len(), 5);
    for (i, section) in sections.iter().enumerate() {
        assert_eq!(section.magic, magics[i]);
        assert_eq!(section.offset, 16 * i as u64);
        assert_eq!(section.size_of_data, 0);
        assert_eq!(section.size_total(), 16);
    }
}

#[test]
fn written_sections_are_sixteen_octet_aligned() {
    let bytes = write_mesh(&sample_mesh());
    assert_eq!(bytes.len() % 16, 0);

    let mut input = DecoderStream::new(&bytes[..]);
    input.skip(16, "preamble").unwrap();
    let sections = scan_sections(&mut input).unwrap();
    assert_eq!(sections.first().map(|s| s.magic), Some(MAGIC_HEADER));
    assert_eq!(sections.last().map(|s| s.magic), Some(MAGIC_END));
    for section in &sections {
        assert_eq!(section.offset % 16, 0);
        assert_eq!(section.size_of_data % 16, 0);
    }
}

#[test]
fn decode_rejects_unaligned_section_sizes() {
    let mut out = EncoderStream::new(Vec::new());
    write_preamble(&mut out, smf_core::FormatVersion::new(1, 0)).unwrap();
    out.encode_u64_be(MAGIC_HEADER).unwrap();
    out.encode_u64_be(12).unwrap();
    out.encode_zeroes(12).unwrap();
    let bytes = out.into_inner();

    let mut recorder = Recorder::default();
    let (result, state) = parse(&bytes, &mut recorder);
    match result {
        Err(SmfError::Format(e)) => {
            assert!(e.message.contains("Section sizes must be multiples of 16"));
            assert_eq!(e.position.line, 16);
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(state, ParserState::Failed);
    assert_eq!(recorder.errors.len(), 1);
}

#[test]
fn decode_rejects_invalid_magic() {
    let mut bytes = write_mesh(&sample_mesh());
    bytes[1] = b'X';
    let mut recorder = Recorder::default();
    let (result, _) = parse(&bytes, &mut recorder);
    let message = result.unwrap_err().to_string();
    assert!(message.contains("Bad magic number."));
    assert!(message.contains("Expected: 89534d460d0a1a0a"));
    assert!(message.contains("Received: 89584d460d0a1a0a"));
}

#[test]
fn decode_rejects_unsupported_versions() {
    let mut bytes = write_mesh(&sample_mesh());
    bytes[11] = 2;
    let (result, _) = parse(&bytes, &mut IgnoringEvents);
    assert!(matches!(result, Err(SmfError::UnsupportedVersion(_))));
}

#[test]
fn decode_rejects_truncated_streams() {
    let bytes = write_mesh(&sample_mesh());
    let truncated = &bytes[..bytes.len() - 72];
    let mut recorder = Recorder::default();
    let (result, state) = parse(truncated, &mut recorder);
    match result {
        Err(SmfError::Format(e)) => {
            assert!(e.message.starts_with(SHORT_READ_MESSAGE));
            assert!(e.cause.is_some());
            assert_eq!(e.position.source.as_deref(), Some("mem:test"));
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(state, ParserState::Failed);
}

fn header_only_mesh(meta_count: u32) -> MemoryMesh {
    let header = Header::builder().meta_count(meta_count).build().unwrap();
    let metadata = (0..meta_count)
        .map(|_| MetadataValue::new(schema("com.example.m"), b"data".to_vec()))
        .collect();
    MemoryMesh::new(header, BTreeMap::new(), Vec::new(), metadata).unwrap()
}

#[test]
fn decode_rejects_huge_attribute_counts_in_short_streams() {
    let mut bytes = write_mesh(&header_only_mesh(0));
    bytes.truncate(160);
    bytes[24..32].copy_from_slice(&(1u64 << 62).to_be_bytes());
    bytes[132..136].copy_from_slice(&u32::MAX.to_be_bytes());

    let (result, state) = parse(&bytes, &mut IgnoringEvents);
    match result {
        Err(SmfError::Format(e)) => assert!(e.message.starts_with(SHORT_READ_MESSAGE)),
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(state, ParserState::Failed);
}

#[test]
fn decode_rejects_huge_metadata_sizes_in_short_streams() {
    let mut bytes = write_mesh(&header_only_mesh(1));
    let meta = scan_sections(&mut DecoderStream::new(&bytes[..]))
        .unwrap()
        .into_iter()
        .find(|s| s.magic == MAGIC_METADATA)
        .unwrap();
    let size_at = meta.offset as usize + 8;
    let length_at = meta.data_offset() as usize + 76;
    bytes[size_at..size_at + 8].copy_from_slice(&(1u64 << 40).to_be_bytes());
    bytes[length_at..length_at + 4].copy_from_slice(&u32::MAX.to_be_bytes());
    bytes.truncate(length_at + 8);

    let mut recorder = Recorder::default();
    let (result, state) = parse(&bytes, &mut recorder);
    match result {
        Err(SmfError::Format(e)) => assert!(e.message.starts_with(SHORT_READ_MESSAGE)),
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(state, ParserState::Failed);
}

#[test]
fn streams_must_start_with_a_header() {
    let mut out = EncoderStream::new(Vec::new());
    write_preamble(&mut out, smf_core::FormatVersion::new(1, 0)).unwrap();
    write_section_header(&mut out, MAGIC_TRIANGLES, 0).unwrap();
    write_section_header(&mut out, MAGIC_END, 0).unwrap();
    let (result, _) = parse(&out.into_inner(), &mut IgnoringEvents);
    assert!(result
        .unwrap_err()
        .to_string()
        .contains("Files must begin with an SMF_HEAD section."));
}

#[test]
fn unknown_sections_are_skipped_with_a_warning() {
    let mesh = sample_mesh();
    let mut serializer = BinarySerializer::new(Vec::new());
    serialize_mesh(&mesh, &mut serializer).unwrap();
    let mut bytes = serializer.into_inner();

    let mut out = EncoderStream::new(Vec::new());
    write_section_header(&mut out, 0x1020304050607080, 32).unwrap();
    out.encode_bytes(&[0xff; 32]).unwrap();
    write_section_header(&mut out, MAGIC_END, 0).unwrap();
    bytes.extend_from_slice(&out.into_inner());

    let mut producer = MemoryMeshProducer::new();
    let (result, state) = parse(&bytes, &mut producer);
    result.unwrap();
    assert_eq!(state, ParserState::Finished);
    assert_eq!(producer.warnings().len(), 1);
    assert!(producer.warnings()[0]
        .message
        .contains("Unrecognized section type."));
    assert_eq!(producer.into_mesh().unwrap(), mesh);
}

// =============================================================================
// Events
// =============================================================================

#[test]
fn float4_values_are_delivered_in_order() {
    let values = [
        [1.0, 2.0, 3.0, 4.0],
        [-0.5, 1e300, f64::MIN_POSITIVE, 0.1],
        [f64::MAX, -0.0, 7.25, -123456.789],
    ];
    let header = Header::builder()
        .vertex_count(3)
        .attribute(attr("v", ComponentType::Floating, 4, 64))
        .build()
        .unwrap();

    let mut serializer = BinarySerializer::new(Vec::new());
    serializer.serialize_header(&header).unwrap();
    serializer.serialize_vertex_data_non_interleaved_start().unwrap();
    serializer
        .serialize_data(&AttributeName::new("v").unwrap())
        .unwrap();
    for v in values {
        serializer
            .serialize_value(&AttributeValue::Float4(v))
            .unwrap();
    }
    serializer
        .serialize_vertex_data_non_interleaved_finish()
        .unwrap();
    serializer.finish().unwrap();

    let mut recorder = Recorder::default();
    let (result, state) = parse(&serializer.into_inner(), &mut recorder);
    result.unwrap();
    assert_eq!(state, ParserState::Finished);
    assert!(recorder.errors.is_empty());

    let mut expected = vec!["start v".to_string()];
    for v in values {
        expected.push(format!("value {:?}", AttributeValue::Float4(v)));
    }
    expected.push("finish".to_string());
    assert_eq!(recorder.log, expected);
}

#[test]
fn declined_triangles_do_not_disturb_metadata() {
    let mesh = sample_mesh();
    let bytes = write_mesh(&mesh);

    let mut recorder = Recorder::default();
    let (result, state) = parse(&bytes, &mut recorder);
    result.unwrap();
    assert_eq!(state, ParserState::Finished);
    assert!(recorder.errors.is_empty());
    assert!(recorder.warnings.is_empty());
    assert!(!recorder.log.iter().any(|l| l.starts_with("triangle")));

    let meta: Vec<_> = recorder
        .log
        .iter()
        .filter(|l| l.starts_with("meta"))
        .cloned()
        .collect();
    assert_eq!(
        meta,
        [
            format!("meta com.example.a 1.0 {:?}", b"hello"),
            format!("meta com.example.b 1.0 {:?}", [0u8; 33]),
        ]
    );
}

#[test]
fn accepted_triangles_are_delivered() {
    let mut recorder = Recorder {
        accept_triangles: true,
        ..Recorder::default()
    };
    let (result, _) = parse(&write_mesh(&sample_mesh()), &mut recorder);
    result.unwrap();
    let triangles: Vec<_> = recorder
        .log
        .iter()
        .filter(|l| l.starts_with("triangle"))
        .cloned()
        .collect();
    assert_eq!(triangles, ["triangle 0 1 2", "triangle 2 1 0"]);
}

#[test]
fn ignoring_consumers_still_validate_the_stream() {
    let bytes = write_mesh(&sample_mesh());
    let (result, state) = parse(&bytes, &mut IgnoringEvents);
    result.unwrap();
    assert_eq!(state, ParserState::Finished);

    let (result, _) = parse(&bytes[..bytes.len() - 40], &mut IgnoringEvents);
    assert!(result.is_err());
}

// =============================================================================
// Structural checks
// =============================================================================

#[test]
fn missing_triangles_are_reported() {
    let header = Header::builder()
        .triangles(Triangles::new(1, TriangleWidth::Bits8))
        .build()
        .unwrap();
    let mut serializer = BinarySerializer::new(Vec::new());
    serializer.serialize_header(&header).unwrap();
    serializer.finish().unwrap();

    let mut recorder = Recorder::default();
    let (result, state) = parse(&serializer.into_inner(), &mut recorder);
    result.unwrap();
    assert_eq!(state, ParserState::Failed);
    assert_eq!(recorder.errors.len(), 1);
    assert_eq!(recorder.errors[0].message, MISSING_TRIANGLES);
}

#[test]
fn missing_vertices_are_reported() {
    let header = Header::builder()
        .vertex_count(2)
        .attribute(attr("x", ComponentType::IntegerUnsigned, 1, 32))
        .build()
        .unwrap();
    let mut serializer = BinarySerializer::new(Vec::new());
    serializer.serialize_header(&header).unwrap();
    serializer.finish().unwrap();

    let mut recorder = Recorder::default();
    let (result, state) = parse(&serializer.into_inner(), &mut recorder);
    result.unwrap();
    assert_eq!(state, ParserState::Failed);
    assert_eq!(recorder.errors.len(), 1);
    assert_eq!(recorder.errors[0].message, MISSING_VERTICES);
}

#[test]
fn out_of_range_triangle_indices_are_reported() {
    let header = Header::builder()
        .vertex_count(0)
        .triangles(Triangles::new(1, TriangleWidth::Bits8))
        .build()
        .unwrap();
    let mut serializer = BinarySerializer::new(Vec::new());
    serializer.serialize_header(&header).unwrap();
    serializer.serialize_triangles_start().unwrap();
    serializer.serialize_triangle(0, 1, 5).unwrap();
    serializer.serialize_triangles_finish().unwrap();
    serializer.finish().unwrap();

    let mut recorder = Recorder::default();
    let (result, state) = parse(&serializer.into_inner(), &mut recorder);
    result.unwrap();
    assert_eq!(state, ParserState::Failed);
    let messages: Vec<_> = recorder.errors.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(messages.len(), 3);
    assert_eq!(
        messages[2],
        "Triangle 0, vertex 2 specifies a vertex value (5) greater than the specified vertex count (0)"
    );
}

#[test]
fn parsers_refuse_a_second_run() {
    let bytes = write_mesh(&sample_mesh());
    let mut parser = BinaryParser::new(&bytes[..]);
    parser.parse(&mut IgnoringEvents).unwrap();
    assert!(matches!(
        parser.parse(&mut IgnoringEvents),
        Err(SmfError::Contract(_))
    ));
}

// =============================================================================
// Round trip
// =============================================================================

#[test]
fn memory_mesh_round_trip() {
    let mesh = sample_mesh();
    let bytes = write_mesh(&mesh);

    let mut producer = MemoryMeshProducer::new();
    let (result, _) = parse(&bytes, &mut producer);
    result.unwrap();
    assert!(producer.warnings().is_empty());
    assert_eq!(producer.into_mesh().unwrap(), mesh);
}

#[test]
fn big_endian_payloads_round_trip() {
    let mesh = sample_mesh();
    let header = mesh
        .header()
        .to_builder()
        .data_byte_order(ByteOrder::BigEndian)
        .build()
        .unwrap();
    let mesh = mesh.with_header(header).unwrap();
    let big = write_mesh(&mesh);
    let little = write_mesh(&sample_mesh());
    assert_eq!(big.len(), little.len());
    assert_ne!(big, little);

    let mut producer = MemoryMeshProducer::new();
    let (result, _) = parse(&big, &mut producer);
    result.unwrap();
    assert_eq!(producer.into_mesh().unwrap(), mesh);
}
