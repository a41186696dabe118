//! Random-access binary parser.
//!
//! One linear scan records where every section starts. Afterwards the
//! header, any single attribute, the triangles or the metadata can be read
//! in any order by seeking directly to them.

use std::collections::BTreeMap;
use std::io::{Read, Seek};

use smf_core::tracker::MISSING_TRIANGLES;
use smf_core::{
    AttributeName, DecoderStream, ElementCodec, Header, LexicalPosition, ParseError,
    ParseWarning, ParserEvents, SmfError, Status,
};

use crate::binary_reader::{read_metadata_prefix, supported_version, ParserState};
use crate::blocks::{
    attribute_block_size, read_attribute_block, read_triangle_block, triangles_section_size,
    vertices_section_size,
};
use crate::header_layout::{read_header_section, read_preamble};
use crate::section::{
    scan_sections, Section, MAGIC_HEADER, MAGIC_METADATA, MAGIC_TRIANGLES,
    MAGIC_VERTICES_NON_INTERLEAVED,
};

/// Offset and end of one attribute block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRange {
    pub start: u64,
    pub end: u64,
}

/// Where each part of a stream lives.
#[derive(Debug, Clone, Default)]
pub struct SectionIndex {
    pub sections: Vec<Section>,
    pub header: Option<Section>,
    pub vertices: Option<Section>,
    pub triangles: Option<Section>,
    pub metadata: Vec<Section>,
    pub attributes: BTreeMap<AttributeName, BlockRange>,
}

/// Seekable parser. Unlike [`crate::BinaryParser`] it does not run the
/// structural tracker, since callers choose what to read and in which
/// order; triangle indices are still checked against the vertex count.
///
/// Any reported error leaves the parser [`ParserState::Failed`] and
/// [`finish`](Self::finish) leaves it [`ParserState::Finished`]. Either way
/// every later call is refused.
pub struct BinaryRandomAccessParser<R> {
    stream: DecoderStream<R>,
    state: ParserState,
    index: Option<SectionIndex>,
    header: Option<Header>,
}

impl<R: Read + Seek> BinaryRandomAccessParser<R> {
    pub fn new(reader: R) -> Self {
        Self {
            stream: DecoderStream::new(reader),
            state: ParserState::Ready,
            index: None,
            header: None,
        }
    }

    pub fn with_source(reader: R, source: impl Into<String>) -> Self {
        Self {
            stream: DecoderStream::with_source(reader, source),
            state: ParserState::Ready,
            index: None,
            header: None,
        }
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    pub fn header(&self) -> Option<&Header> {
        self.header.as_ref()
    }

    pub fn index(&self) -> Option<&SectionIndex> {
        self.index.as_ref()
    }

    fn report<T>(
        &mut self,
        events: &mut dyn ParserEvents,
        result: Result<T, SmfError>,
    ) -> Result<T, SmfError> {
        if let Err(e) = &result {
            let error: ParseError = e.clone().into_parse_error(self.stream.lexical());
            events.on_error(error);
            self.state = ParserState::Failed;
        }
        result
    }

    fn check_ready(&self) -> Status {
        match self.state {
            ParserState::Ready => Ok(()),
            ParserState::Finished => Err(SmfError::contract("Parser has already finished")),
            ParserState::Failed => Err(SmfError::contract("Parser has already failed")),
        }
    }

    /// Scans the stream and parses the header. Must be called first.
    pub fn parse_header(&mut self, events: &mut dyn ParserEvents) -> Status {
        self.check_ready()?;
        if self.header.is_some() {
            return Err(SmfError::contract("Header has already been parsed"));
        }
        events.on_start();
        let result = self.scan(events);
        let header = self.report(events, result)?;
        events.on_header_parsed(&header);
        self.header = Some(header);
        Ok(())
    }

    fn scan(&mut self, events: &mut dyn ParserEvents) -> Result<Header, SmfError> {
        self.stream.set_position(0)?;
        let version = read_preamble(&mut self.stream)?;
        if !supported_version(version) {
            return Err(SmfError::UnsupportedVersion(format!(
                "Binary SMF version {} is not supported",
                version
            )));
        }
        events.on_version_received(version);

        let sections = scan_sections(&mut self.stream)?;
        let mut index = SectionIndex {
            sections: sections.clone(),
            ..SectionIndex::default()
        };
        for section in sections {
            match section.magic {
                MAGIC_HEADER if index.header.is_none() => index.header = Some(section),
                MAGIC_VERTICES_NON_INTERLEAVED if index.vertices.is_none() => {
                    index.vertices = Some(section)
                }
                MAGIC_TRIANGLES if index.triangles.is_none() => index.triangles = Some(section),
                MAGIC_METADATA => index.metadata.push(section),
                _ => {}
            }
        }
        log::debug!("indexed {} sections", index.sections.len());

        let header_section = match index.sections.first() {
            Some(first) if first.magic == MAGIC_HEADER => *first,
            _ => {
                return Err(SmfError::format(
                    self.stream.lexical_at(crate::header_layout::FILE_PREAMBLE_SIZE),
                    "Files must begin with an SMF_HEAD section.",
                ))
            }
        };
        self.stream.set_position(header_section.data_offset())?;
        let header = read_header_section(&mut self.stream, &header_section)?;

        if let Some(vertices) = index.vertices {
            let required = vertices_section_size(&header)?;
            if vertices.size_of_data < required {
                return Err(SmfError::format(
                    self.stream.lexical_at(vertices.offset),
                    format!(
                        "Section is too small for the declared data.\n  Required: {}\n  Received: {}",
                        required, vertices.size_of_data
                    ),
                ));
            }
            let mut start = vertices.data_offset();
            for attribute in header.attributes_in_order() {
                let end = start + attribute_block_size(attribute, header.vertex_count())?;
                index
                    .attributes
                    .insert(attribute.name().clone(), BlockRange { start, end });
                start = end;
            }
        }
        self.index = Some(index);
        Ok(header)
    }

    fn parsed(&self) -> Result<(&Header, &SectionIndex), SmfError> {
        self.check_ready()?;
        match (&self.header, &self.index) {
            (Some(header), Some(index)) => Ok((header, index)),
            _ => Err(SmfError::contract("Must parse the header first")),
        }
    }

    /// Delivers one attribute's values.
    pub fn parse_attribute_data(
        &mut self,
        name: &AttributeName,
        events: &mut dyn ParserEvents,
    ) -> Status {
        let (header, index) = self.parsed()?;
        let attribute = header
            .attribute(name)
            .cloned()
            .ok_or_else(|| SmfError::contract(format!("No such attribute: {}", name)))?;
        let vertex_count = header.vertex_count();
        let order = header.data_byte_order();
        let range = index.attributes.get(name).copied();

        let Some(range) = range else {
            let e = SmfError::structural(
                self.stream.lexical(),
                format!("No vertex data is present for attribute {}", name),
            );
            return self.report(events, Err(e));
        };
        let codec = ElementCodec::for_attribute(&attribute, order);
        let codec = self.report(events, codec)?;
        if !events.on_data_attribute_start(&attribute).is_accepted() {
            return Ok(());
        }
        let result = self.stream.set_position(range.start).and_then(|_| {
            read_attribute_block(&mut self.stream, &codec, vertex_count, range.end, events)
        });
        self.report(events, result)?;
        events.on_data_attribute_value_finish();
        Ok(())
    }

    /// Delivers the triangles.
    pub fn parse_triangles(&mut self, events: &mut dyn ParserEvents) -> Status {
        let (header, index) = self.parsed()?;
        let triangles = header.triangles();
        let vertex_count = header.vertex_count();
        let order = header.data_byte_order();
        let section = index.triangles;

        let Some(section) = section else {
            if triangles.count == 0 {
                return Ok(());
            }
            let e = SmfError::structural(self.stream.lexical(), MISSING_TRIANGLES);
            return self.report(events, Err(e));
        };
        let size = triangles_section_size(triangles);
        let size = self.report(events, size)?;
        if section.size_of_data < size {
            let e = SmfError::format(
                self.stream.lexical_at(section.offset),
                format!(
                    "Section is too small for the declared data.\n  Required: {}\n  Received: {}",
                    size, section.size_of_data
                ),
            );
            return self.report(events, Err(e));
        }
        if !events.on_triangles().is_accepted() {
            return Ok(());
        }

        let mut bounds = BoundsCheck {
            inner: &mut *events,
            vertex_count,
            received: 0,
            position: self.stream.lexical_at(section.offset),
            failed: false,
        };
        let result = self.stream.set_position(section.data_offset()).and_then(|_| {
            read_triangle_block(
                &mut self.stream,
                triangles,
                order,
                section.data_offset() + size,
                &mut bounds,
            )
        });
        if bounds.failed {
            self.state = ParserState::Failed;
        }
        self.report(events, result)?;
        events.on_data_triangles_finish();
        Ok(())
    }

    /// Delivers every metadata section in stream order.
    pub fn parse_metadata(&mut self, events: &mut dyn ParserEvents) -> Status {
        let (_, index) = self.parsed()?;
        let sections = index.metadata.clone();
        for section in sections {
            let result = self
                .stream
                .set_position(section.data_offset())
                .and_then(|_| read_metadata_prefix(&mut self.stream, &section));
            let (schema, size) = self.report(events, result)?;
            if events.on_meta(&schema).is_accepted() {
                let result = self.stream.decode_vec(size as usize, "metadata");
                let data = self.report(events, result)?;
                events.on_meta_data(&schema, &data);
            }
        }
        Ok(())
    }

    /// Ends the session. A failed parser still delivers `on_finish` once.
    pub fn finish(&mut self, events: &mut dyn ParserEvents) -> Status {
        match self.state {
            ParserState::Finished => Err(SmfError::contract("Parser has already finished")),
            ParserState::Ready | ParserState::Failed => {
                self.state = ParserState::Finished;
                events.on_finish();
                Ok(())
            }
        }
    }
}

/// Checks triangle indices on their way to the consumer.
struct BoundsCheck<'a> {
    inner: &'a mut dyn ParserEvents,
    vertex_count: u64,
    received: u64,
    position: LexicalPosition,
    failed: bool,
}

impl ParserEvents for BoundsCheck<'_> {
    fn on_error(&mut self, error: ParseError) {
        self.failed = true;
        self.inner.on_error(error);
    }

    fn on_warning(&mut self, warning: ParseWarning) {
        self.inner.on_warning(warning);
    }

    fn on_data_triangle(&mut self, v0: u64, v1: u64, v2: u64) {
        for (vertex, value) in [v0, v1, v2].into_iter().enumerate() {
            if value >= self.vertex_count {
                self.failed = true;
                self.inner.on_error(ParseError::new(
                    self.position.clone(),
                    format!(
                        "Triangle {}, vertex {} specifies a vertex value ({}) greater than the specified vertex count ({})",
                        self.received, vertex, value, self.vertex_count
                    ),
                ));
            }
        }
        self.received += 1;
        self.inner.on_data_triangle(v0, v1, v2);
    }
}
