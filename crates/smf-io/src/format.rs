//! The binary encoding as a [`FormatProvider`].

use std::io::{Read, Write};

use smf_core::version::DEFAULT_BINARY_VERSION;
use smf_core::{FormatVersion, ParserEvents, Serializer, SmfError, Status};

use crate::binary_reader::{supported_version, BinaryParser};
use crate::binary_writer::BinarySerializer;
use crate::header_layout::{probe_preamble, FILE_PREAMBLE_SIZE};
use crate::traits::{FormatDescription, FormatProvider};

pub const BINARY_FORMAT: FormatDescription = FormatDescription {
    name: "smf/b",
    description: "Binary SMF",
    mime_type: "application/vnd.io7m.smf",
    suffix: "smfb",
    random_access: true,
};

const SUPPORTED: [FormatVersion; 1] = [DEFAULT_BINARY_VERSION];

#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryFormat;

impl FormatProvider for BinaryFormat {
    fn format(&self) -> FormatDescription {
        BINARY_FORMAT
    }

    fn supported_versions(&self) -> &[FormatVersion] {
        &SUPPORTED
    }

    fn probe_length(&self) -> usize {
        FILE_PREAMBLE_SIZE as usize
    }

    fn probe(&self, prefix: &[u8]) -> Result<Option<FormatVersion>, SmfError> {
        match probe_preamble(prefix) {
            Some(version) if supported_version(version) => Ok(Some(version)),
            Some(version) => Err(SmfError::UnsupportedVersion(format!(
                "Binary SMF version {} is not supported",
                version
            ))),
            None => Ok(None),
        }
    }

    fn parse(
        &self,
        reader: &mut dyn Read,
        source: Option<&str>,
        events: &mut dyn ParserEvents,
    ) -> Status {
        let mut parser = match source {
            Some(source) => BinaryParser::with_source(reader, source),
            None => BinaryParser::new(reader),
        };
        parser.parse(events)
    }

    fn serializer<'a>(
        &self,
        version: FormatVersion,
        writer: Box<dyn Write + 'a>,
    ) -> Result<Box<dyn Serializer + 'a>, SmfError> {
        Ok(Box::new(BinarySerializer::with_version(writer, version)?))
    }
}
