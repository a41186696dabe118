//! Binary serializer.

use std::io::Write;

use smf_core::version::DEFAULT_BINARY_VERSION;
use smf_core::{
    AttributeName, AttributeValue, EncoderStream, FormatVersion, Header, SchemaIdentifier,
    Serializer, SerializerContract, SmfError, Status,
};

use crate::binary_reader::supported_version;
use crate::blocks::{
    attribute_block_size, triangles_section_size, vertices_section_size, write_index,
};
use crate::header_layout::{
    encode_schema_block, write_header_section, write_preamble, SCHEMA_BLOCK_SIZE,
};
use crate::section::{
    align16, write_section_header, MAGIC_END, MAGIC_METADATA, MAGIC_TRIANGLES,
    MAGIC_VERTICES_NON_INTERLEAVED,
};

/// Writes binary SMF to any [`Write`].
///
/// Every call is validated by a [`SerializerContract`] before anything is
/// written, so a rejected call leaves the output untouched. Section sizes
/// are derived from the header, which is why the header comes first.
pub struct BinarySerializer<W: Write> {
    out: EncoderStream<W>,
    version: FormatVersion,
    contract: SerializerContract,
    /// End of the section being written.
    section_end: u64,
    /// End of the open attribute block.
    block_end: Option<u64>,
}

impl<W: Write> BinarySerializer<W> {
    pub fn new(writer: W) -> Self {
        Self {
            out: EncoderStream::new(writer),
            version: DEFAULT_BINARY_VERSION,
            contract: SerializerContract::new(),
            section_end: 0,
            block_end: None,
        }
    }

    /// A serializer that writes `version`, which must be supported.
    pub fn with_version(writer: W, version: FormatVersion) -> Result<Self, SmfError> {
        if !supported_version(version) {
            return Err(SmfError::UnsupportedVersion(format!(
                "Binary SMF version {} cannot be written",
                version
            )));
        }
        let mut serializer = Self::new(writer);
        serializer.version = version;
        Ok(serializer)
    }

    pub fn version(&self) -> FormatVersion {
        self.version
    }

    /// Octets written so far.
    pub fn position(&self) -> u64 {
        self.out.position()
    }

    pub fn get_ref(&self) -> &W {
        self.out.get_ref()
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }

    fn header(&self) -> Result<&Header, SmfError> {
        self.contract
            .header()
            .ok_or_else(|| SmfError::contract("Must serialize header first!"))
    }

    fn close_block(&mut self) -> Status {
        if let Some(end) = self.block_end.take() {
            self.out.pad_to(end)?;
        }
        Ok(())
    }
}

impl<W: Write> Serializer for BinarySerializer<W> {
    fn serialize_header(&mut self, header: &Header) -> Status {
        self.contract.header_written(header)?;
        write_preamble(&mut self.out, self.version)?;
        let section = write_header_section(&mut self.out, header)?;
        log::trace!("wrote header: {} attributes", header.attributes_in_order().len());
        self.section_end = section.end_offset();
        Ok(())
    }

    fn serialize_vertex_data_non_interleaved_start(&mut self) -> Status {
        let size = vertices_section_size(self.header()?)?;
        self.contract.vertices_start()?;
        let section = write_section_header(&mut self.out, MAGIC_VERTICES_NON_INTERLEAVED, size)?;
        self.section_end = section.end_offset();
        Ok(())
    }

    fn serialize_data(&mut self, name: &AttributeName) -> Status {
        let vertex_count = self.header()?.vertex_count();
        let (attribute, _) = self.contract.attribute_start(name)?;
        self.close_block()?;
        let size = attribute_block_size(&attribute, vertex_count)?;
        self.block_end = Some(self.out.position() + size);
        Ok(())
    }

    fn serialize_value(&mut self, value: &AttributeValue) -> Status {
        let codec = self.contract.attribute_value(value)?;
        codec.encode(&mut self.out, value)
    }

    fn serialize_vertex_data_non_interleaved_finish(&mut self) -> Status {
        self.contract.vertices_finish()?;
        self.close_block()?;
        self.out.pad_to(self.section_end)
    }

    fn serialize_triangles_start(&mut self) -> Status {
        let size = triangles_section_size(self.header()?.triangles())?;
        self.contract.triangles_start()?;
        let section = write_section_header(&mut self.out, MAGIC_TRIANGLES, size)?;
        self.section_end = section.end_offset();
        Ok(())
    }

    fn serialize_triangle(&mut self, v0: u64, v1: u64, v2: u64) -> Status {
        self.contract.triangle(v0, v1, v2)?;
        let order = self.contract.data_byte_order();
        let width = self.header()?.triangles().index_width;
        for v in [v0, v1, v2] {
            write_index(&mut self.out, width, order, v)?;
        }
        Ok(())
    }

    fn serialize_triangles_finish(&mut self) -> Status {
        self.contract.triangles_finish()?;
        self.out.pad_to(self.section_end)
    }

    fn serialize_metadata(&mut self, schema: &SchemaIdentifier, data: &[u8]) -> Status {
        let length = u32::try_from(data.len()).map_err(|_| {
            SmfError::invalid(format!("Metadata of {} octets is too large", data.len()))
        })?;
        let size = align16(SCHEMA_BLOCK_SIZE as u64 + 4 + u64::from(length))
            .ok_or_else(|| SmfError::invalid("Metadata is too large"))?;
        self.contract.metadata()?;

        let section = write_section_header(&mut self.out, MAGIC_METADATA, size)?;
        self.out.encode_bytes(&encode_schema_block(Some(schema)))?;
        self.out.encode_u32_be(length)?;
        self.out.encode_bytes(data)?;
        self.out.pad_to(section.end_offset())?;
        self.section_end = section.end_offset();
        Ok(())
    }

    fn finish(&mut self) -> Status {
        self.contract.finish()?;
        write_section_header(&mut self.out, MAGIC_END, 0)?;
        self.out.flush()?;
        log::trace!("finished after {} octets", self.out.position());
        Ok(())
    }
}
