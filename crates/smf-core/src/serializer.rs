//! Serializer contract shared by every SMF encoding.
//!
//! A serializer accepts the same sequence the parser emits: the header,
//! then optionally the non-interleaved vertex data (every declared
//! attribute, in declared order, each receiving exactly `vertex_count`
//! values), then optionally the triangles (exactly `triangle_count`), then
//! any number of metadata entries. Calls outside that order fail at once
//! with [`SmfError::Contract`] and leave the serializer where it was.

use crate::attribute::{Attribute, AttributeName};
use crate::data_types::ByteOrder;
use crate::header::Header;
use crate::schema::SchemaIdentifier;
use crate::status::{SmfError, Status};
use crate::value::AttributeValue;
use crate::value_codec::ElementCodec;

pub trait Serializer {
    fn serialize_header(&mut self, header: &Header) -> Status;

    fn serialize_vertex_data_non_interleaved_start(&mut self) -> Status;

    /// Opens the named attribute for values.
    fn serialize_data(&mut self, name: &AttributeName) -> Status;

    /// Writes one element of the open attribute.
    fn serialize_value(&mut self, value: &AttributeValue) -> Status;

    fn serialize_vertex_data_non_interleaved_finish(&mut self) -> Status;

    fn serialize_triangles_start(&mut self) -> Status;

    fn serialize_triangle(&mut self, v0: u64, v1: u64, v2: u64) -> Status;

    fn serialize_triangles_finish(&mut self) -> Status;

    fn serialize_metadata(&mut self, schema: &SchemaIdentifier, data: &[u8]) -> Status;

    /// Terminates the stream. No further calls are accepted.
    fn finish(&mut self) -> Status;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OpenAttribute {
    index: usize,
    written: u64,
    codec: ElementCodec,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Initial,
    HeaderWritten,
    Vertices {
        next: usize,
        open: Option<OpenAttribute>,
    },
    VerticesDone,
    Triangles {
        written: u64,
    },
    TrianglesDone,
    Metadata,
    Finished,
}

/// Call-order state machine used by serializer implementations.
///
/// Each method validates one serializer call and advances the state only
/// when the call is accepted; the encoding then performs the write.
#[derive(Debug, Clone)]
pub struct SerializerContract {
    header: Option<Header>,
    phase: Phase,
}

impl Default for SerializerContract {
    fn default() -> Self {
        Self::new()
    }
}

impl SerializerContract {
    pub fn new() -> Self {
        Self {
            header: None,
            phase: Phase::Initial,
        }
    }

    pub fn header(&self) -> Option<&Header> {
        self.header.as_ref()
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    fn require_header(&self) -> Result<&Header, SmfError> {
        if self.phase == Phase::Finished {
            return Err(SmfError::contract("Serializer has already finished"));
        }
        self.header
            .as_ref()
            .ok_or_else(|| SmfError::contract("Must serialize header first!"))
    }

    pub fn header_written(&mut self, header: &Header) -> Status {
        match self.phase {
            Phase::Initial => {
                self.header = Some(header.clone());
                self.phase = Phase::HeaderWritten;
                Ok(())
            }
            Phase::Finished => Err(SmfError::contract("Serializer has already finished")),
            _ => Err(SmfError::contract("Header has already been serialized")),
        }
    }

    pub fn vertices_start(&mut self) -> Status {
        self.require_header()?;
        match self.phase {
            Phase::HeaderWritten => {
                self.phase = Phase::Vertices { next: 0, open: None };
                Ok(())
            }
            _ => Err(SmfError::contract(
                "Vertex data must directly follow the header and may only be serialized once",
            )),
        }
    }

    /// Opens `name` and returns its declaration and element codec.
    pub fn attribute_start(
        &mut self,
        name: &AttributeName,
    ) -> Result<(Attribute, ElementCodec), SmfError> {
        let header = self.require_header()?;
        let Phase::Vertices { next, open } = self.phase else {
            return Err(SmfError::contract(
                "Attribute data may only be serialized between the start and finish of vertex data",
            ));
        };
        let index = header
            .attribute_index(name)
            .ok_or_else(|| SmfError::contract(format!("No such attribute: {}", name)))?;
        let next = match open {
            Some(open) => {
                close_attribute(header, &open)?;
                open.index + 1
            }
            None => next,
        };
        if index != next {
            let expected = header
                .attributes_in_order()
                .get(next)
                .map(|a| a.name().to_string())
                .unwrap_or_else(|| "(none)".to_string());
            return Err(SmfError::contract(format!(
                "Attributes must be serialized in declared order.\n  Expected: {}\n  Received: {}",
                expected, name
            )));
        }
        let attribute = header.attributes_in_order()[index].clone();
        let codec = ElementCodec::for_attribute(&attribute, header.data_byte_order())?;
        self.phase = Phase::Vertices {
            next,
            open: Some(OpenAttribute {
                index,
                written: 0,
                codec,
            }),
        };
        Ok((attribute, codec))
    }

    /// Accepts one value for the open attribute and returns its codec.
    pub fn attribute_value(&mut self, value: &AttributeValue) -> Result<ElementCodec, SmfError> {
        let header = self.require_header()?;
        let Phase::Vertices { next, open: Some(mut open) } = self.phase else {
            return Err(SmfError::contract("No attribute is open for writing"));
        };
        open.codec.check(value)?;
        if open.written >= header.vertex_count() {
            return Err(SmfError::contract(format!(
                "Too many values for attribute {}.\n  Vertex count: {}",
                header.attributes_in_order()[open.index].name(),
                header.vertex_count()
            )));
        }
        open.written += 1;
        self.phase = Phase::Vertices {
            next,
            open: Some(open),
        };
        Ok(open.codec)
    }

    /// Closes the open attribute, if any, without leaving the vertex phase.
    /// Returns the index of the closed attribute.
    pub fn attribute_finish(&mut self) -> Result<Option<usize>, SmfError> {
        let header = self.require_header()?;
        match self.phase {
            Phase::Vertices { open: Some(open), .. } => {
                close_attribute(header, &open)?;
                self.phase = Phase::Vertices {
                    next: open.index + 1,
                    open: None,
                };
                Ok(Some(open.index))
            }
            Phase::Vertices { open: None, .. } => Ok(None),
            _ => Err(SmfError::contract("Vertex data has not been started")),
        }
    }

    pub fn vertices_finish(&mut self) -> Status {
        self.attribute_finish()?;
        let header = self.require_header()?;
        if let Phase::Vertices { next, .. } = self.phase {
            if let Some(missing) = header.attributes_in_order().get(next) {
                return Err(SmfError::contract(format!(
                    "Attribute data missing.\n  Attribute: {}",
                    missing.name()
                )));
            }
        }
        self.phase = Phase::VerticesDone;
        Ok(())
    }

    pub fn triangles_start(&mut self) -> Status {
        self.require_header()?;
        match self.phase {
            Phase::HeaderWritten | Phase::VerticesDone => {
                self.phase = Phase::Triangles { written: 0 };
                Ok(())
            }
            Phase::Vertices { .. } => Err(SmfError::contract("Vertex data has not been finished")),
            _ => Err(SmfError::contract(
                "Triangles must precede metadata and may only be serialized once",
            )),
        }
    }

    pub fn triangle(&mut self, v0: u64, v1: u64, v2: u64) -> Status {
        let header = self.require_header()?;
        let Phase::Triangles { written } = self.phase else {
            return Err(SmfError::contract("Triangles have not been started"));
        };
        let triangles = header.triangles();
        if written >= triangles.count {
            return Err(SmfError::contract(format!(
                "Too many triangles.\n  Triangle count: {}",
                triangles.count
            )));
        }
        for v in [v0, v1, v2] {
            if v > triangles.index_width.max_index() {
                return Err(SmfError::contract(format!(
                    "Triangle vertex index {} does not fit in {} bits",
                    v, triangles.index_width
                )));
            }
        }
        self.phase = Phase::Triangles {
            written: written + 1,
        };
        Ok(())
    }

    pub fn triangles_finish(&mut self) -> Status {
        let header = self.require_header()?;
        let Phase::Triangles { written } = self.phase else {
            return Err(SmfError::contract("Triangles have not been started"));
        };
        if written != header.triangles().count {
            return Err(SmfError::contract(format!(
                "Expected {} triangles, but {} were serialized",
                header.triangles().count,
                written
            )));
        }
        self.phase = Phase::TrianglesDone;
        Ok(())
    }

    pub fn metadata(&mut self) -> Status {
        self.require_header()?;
        match self.phase {
            Phase::HeaderWritten | Phase::VerticesDone | Phase::TrianglesDone | Phase::Metadata => {
                self.phase = Phase::Metadata;
                Ok(())
            }
            Phase::Vertices { .. } => Err(SmfError::contract("Vertex data has not been finished")),
            _ => Err(SmfError::contract("Triangles have not been finished")),
        }
    }

    pub fn finish(&mut self) -> Status {
        match self.phase {
            Phase::Finished => Err(SmfError::contract("Serializer has already finished")),
            Phase::Initial => Err(SmfError::contract("Must serialize header first!")),
            Phase::Vertices { .. } => Err(SmfError::contract("Vertex data has not been finished")),
            Phase::Triangles { .. } => Err(SmfError::contract("Triangles have not been finished")),
            _ => {
                self.phase = Phase::Finished;
                Ok(())
            }
        }
    }

    /// Byte order of attribute and triangle payloads.
    pub fn data_byte_order(&self) -> ByteOrder {
        self.header
            .as_ref()
            .map(Header::data_byte_order)
            .unwrap_or_default()
    }
}

fn close_attribute(header: &Header, open: &OpenAttribute) -> Status {
    if open.written != header.vertex_count() {
        return Err(SmfError::contract(format!(
            "Attribute {} received {} values, but the vertex count is {}",
            header.attributes_in_order()[open.index].name(),
            open.written,
            header.vertex_count()
        )));
    }
    Ok(())
}
