//! Sequential binary parser.

use std::io::Read;

use smf_core::events::data_sink;
use smf_core::version::{SMF_BINARY_VERSION_MAJOR, SMF_BINARY_VERSION_MINOR};
use smf_core::{
    DecoderStream, ElementCodec, FormatVersion, Header, IgnoringEvents, ParseWarning,
    ParserEvents, SmfError, Status, Tracker,
};

use crate::blocks::{
    attribute_block_size, read_attribute_block, read_triangle_block, triangles_section_size,
    vertices_section_size,
};
use crate::header_layout::{
    decode_schema_block, read_header_section, read_preamble, SCHEMA_BLOCK_SIZE,
};
use crate::section::{
    magic_name, Section, SectionScanner, MAGIC_END, MAGIC_HEADER, MAGIC_METADATA,
    MAGIC_TRIANGLES, MAGIC_VERTICES_NON_INTERLEAVED,
};

type Events<'a> = Tracker<&'a mut dyn ParserEvents>;

/// Binary versions this crate reads.
pub fn supported_version(version: FormatVersion) -> bool {
    FormatVersion::new(SMF_BINARY_VERSION_MAJOR, SMF_BINARY_VERSION_MINOR).can_read(version)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    Ready,
    Finished,
    Failed,
}

/// Forward-only parser for binary SMF streams.
///
/// Drives the consumer through the event protocol with a [`Tracker`] in
/// between, so structural checks run regardless of what the consumer
/// accepts. Sections the consumer declined are still read and checked.
/// A parser is single use.
pub struct BinaryParser<R> {
    stream: DecoderStream<R>,
    state: ParserState,
}

impl<R: Read> BinaryParser<R> {
    pub fn new(reader: R) -> Self {
        Self {
            stream: DecoderStream::new(reader),
            state: ParserState::Ready,
        }
    }

    /// Diagnostics will name `source`.
    pub fn with_source(reader: R, source: impl Into<String>) -> Self {
        Self {
            stream: DecoderStream::with_source(reader, source),
            state: ParserState::Ready,
        }
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    /// Parses the whole stream.
    ///
    /// Format errors stop parsing. They are reported to `events` and also
    /// returned. Structural errors are only reported to `events`. Either way
    /// `on_finish` is delivered.
    pub fn parse(&mut self, events: &mut dyn ParserEvents) -> Status {
        if self.state != ParserState::Ready {
            return Err(SmfError::contract("Parser has already been used"));
        }
        let mut tracker: Events<'_> = Tracker::new(events);
        tracker.on_start();

        let result = self.parse_stream(&mut tracker);
        if let Err(e) = &result {
            log::debug!("parse failed: {}", e);
            tracker.on_error(e.clone().into_parse_error(self.stream.lexical()));
        }
        tracker.on_finish();

        self.state = if result.is_ok() && !tracker.has_failed() {
            ParserState::Finished
        } else {
            ParserState::Failed
        };
        result
    }

    fn warn(&self, events: &mut Events<'_>, offset: u64, message: String) {
        log::warn!("{}", message);
        events.on_warning(ParseWarning::new(self.stream.lexical_at(offset), message));
    }

    fn parse_stream(&mut self, events: &mut Events<'_>) -> Status {
        let version = read_preamble(&mut self.stream)?;
        if !supported_version(version) {
            return Err(SmfError::UnsupportedVersion(format!(
                "Binary SMF version {} is not supported (supported: {}.{})",
                version, SMF_BINARY_VERSION_MAJOR, SMF_BINARY_VERSION_MINOR
            )));
        }
        events.on_version_received(version);

        let mut scanner = SectionScanner::new();
        let first = scanner.next(&mut self.stream)?;
        let header = match first {
            Some(section) if section.magic == MAGIC_HEADER => {
                read_header_section(&mut self.stream, &section)?
            }
            other => {
                let received =
                    other.map_or_else(|| "end of stream".to_string(), |s| magic_name(s.magic));
                return Err(SmfError::format(
                    self.stream.lexical_at(crate::header_layout::FILE_PREAMBLE_SIZE),
                    format!(
                        "Files must begin with an SMF_HEAD section.\n  Received: {}",
                        received
                    ),
                ));
            }
        };
        log::debug!(
            "expecting {} vertices, {} triangles, {} attributes, {} metadata",
            header.vertex_count(),
            header.triangles().count,
            header.attributes_in_order().len(),
            header.meta_count()
        );

        let body_interest = events.on_header_parsed(&header);
        let mut ignoring = IgnoringEvents;
        let mut seen_vertices = false;
        let mut seen_triangles = false;
        let mut meta_seen: u64 = 0;
        let mut ended = false;

        while let Some(section) = scanner.next(&mut self.stream)? {
            events.locate(self.stream.lexical_at(section.offset));
            let body = data_sink(&mut *events, &mut ignoring, body_interest);
            match section.magic {
                MAGIC_VERTICES_NON_INTERLEAVED => {
                    self.check_unique(&section, &mut seen_vertices)?;
                    self.parse_vertices(&header, &section, body)?;
                }
                MAGIC_TRIANGLES => {
                    self.check_unique(&section, &mut seen_triangles)?;
                    self.parse_triangles(&header, &section, body)?;
                }
                MAGIC_METADATA => {
                    meta_seen += 1;
                    self.parse_metadata(&section, body)?;
                }
                MAGIC_END => {
                    ended = true;
                }
                MAGIC_HEADER => {
                    return Err(SmfError::format(
                        self.stream.lexical_at(section.offset),
                        "Only one SMF_HEAD section may be present.",
                    ));
                }
                other => {
                    self.warn(
                        events,
                        section.offset,
                        format!("Unrecognized section type.\n  Section: {}", magic_name(other)),
                    );
                }
            }
        }

        let position = self.stream.position();
        if !ended {
            self.warn(
                events,
                position,
                "Stream ended without an SMF_END! section.".to_string(),
            );
        }
        if meta_seen != u64::from(header.meta_count()) {
            self.warn(
                events,
                position,
                format!(
                    "Expected {} metadata sections, but {} were present",
                    header.meta_count(),
                    meta_seen
                ),
            );
        }
        Ok(())
    }

    fn check_unique(&self, section: &Section, seen: &mut bool) -> Status {
        if std::mem::replace(seen, true) {
            return Err(SmfError::format(
                self.stream.lexical_at(section.offset),
                format!("Duplicate {} section.", magic_name(section.magic)),
            ));
        }
        Ok(())
    }

    fn check_size(&self, section: &Section, required: u64) -> Status {
        if section.size_of_data < required {
            return Err(SmfError::format(
                self.stream.lexical_at(section.offset),
                format!(
                    "Section is too small for the declared data.\n  Section: {}\n  Required: {}\n  Received: {}",
                    magic_name(section.magic),
                    required,
                    section.size_of_data
                ),
            ));
        }
        Ok(())
    }

    fn parse_vertices(
        &mut self,
        header: &Header,
        section: &Section,
        body: &mut dyn ParserEvents,
    ) -> Status {
        self.check_size(section, vertices_section_size(header)?)?;
        let order = header.data_byte_order();
        let vertex_count = header.vertex_count();

        let interest = body.on_attributes_non_interleaved();
        let mut ignoring = IgnoringEvents;
        let attributes = data_sink(body, &mut ignoring, interest);

        let mut block_start = section.data_offset();
        for attribute in header.attributes_in_order() {
            let block_end = block_start + attribute_block_size(attribute, vertex_count)?;
            let codec = ElementCodec::for_attribute(attribute, order)?;
            log::trace!("attribute {} at 0x{:x}", attribute.name(), block_start);

            let interest = attributes.on_data_attribute_start(attribute);
            let mut ignoring = IgnoringEvents;
            let values = data_sink(attributes, &mut ignoring, interest);
            read_attribute_block(&mut self.stream, &codec, vertex_count, block_end, values)?;
            values.on_data_attribute_value_finish();
            block_start = block_end;
        }
        attributes.on_data_attributes_non_interleaved_finish();
        Ok(())
    }

    fn parse_triangles(
        &mut self,
        header: &Header,
        section: &Section,
        body: &mut dyn ParserEvents,
    ) -> Status {
        let triangles = header.triangles();
        let size = triangles_section_size(triangles)?;
        self.check_size(section, size)?;

        let interest = body.on_triangles();
        let mut ignoring = IgnoringEvents;
        let sink = data_sink(body, &mut ignoring, interest);
        read_triangle_block(
            &mut self.stream,
            triangles,
            header.data_byte_order(),
            section.data_offset() + size,
            sink,
        )?;
        sink.on_data_triangles_finish();
        Ok(())
    }

    fn parse_metadata(&mut self, section: &Section, body: &mut dyn ParserEvents) -> Status {
        let (schema, size) = read_metadata_prefix(&mut self.stream, section)?;
        if body.on_meta(&schema).is_accepted() {
            let data = self.stream.decode_vec(size as usize, "metadata")?;
            body.on_meta_data(&schema, &data);
        }
        Ok(())
    }
}

/// Reads the schema and payload size that open an `SMF_META` section and
/// checks the payload fits. Leaves the stream at the payload.
pub(crate) fn read_metadata_prefix<R: Read>(
    stream: &mut DecoderStream<R>,
    section: &Section,
) -> Result<(smf_core::SchemaIdentifier, u32), SmfError> {
    let prefix = SCHEMA_BLOCK_SIZE as u64 + 4;
    if section.size_of_data < prefix {
        return Err(SmfError::format(
            stream.lexical_at(section.offset),
            format!(
                "Section is too small to contain metadata.\n  Required: {}\n  Received: {}",
                prefix, section.size_of_data
            ),
        ));
    }
    let block_offset = stream.position();
    let mut block = [0u8; SCHEMA_BLOCK_SIZE];
    stream.decode_bytes(&mut block, "metadata schema")?;
    let schema = match decode_schema_block(&block) {
        Ok(Some(schema)) => schema,
        Ok(None) => {
            return Err(SmfError::format(
                stream.lexical_at(block_offset),
                "Metadata must specify a schema identifier.",
            ))
        }
        Err(SmfError::InvalidParameter(message)) => {
            return Err(SmfError::format(stream.lexical_at(block_offset), message))
        }
        Err(other) => return Err(other),
    };
    let size = stream.decode_u32_be()?;
    let remaining = section.size_of_data - prefix;
    if u64::from(size) > remaining {
        return Err(SmfError::format(
            stream.lexical_at(block_offset),
            format!(
                "Metadata size is specified as {} but only {} bytes are remaining",
                size, remaining
            ),
        ));
    }
    Ok((schema, size))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_major_version_one_is_supported() {
        assert!(supported_version(FormatVersion::new(1, 0)));
        assert!(!supported_version(FormatVersion::new(1, 1)));
        assert!(!supported_version(FormatVersion::new(2, 0)));
    }

    #[test]
    fn parsers_are_single_use() {
        let mut parser = BinaryParser::new(&[][..]);
        let mut events = IgnoringEvents;
        assert!(parser.parse(&mut events).is_err());
        assert_eq!(parser.state(), ParserState::Failed);
        assert!(matches!(parser.parse(&mut events), Err(SmfError::Contract(_))));
    }
}
