//! Binary encoding of SMF meshes.
//!
//! This crate reads and writes the binary SMF encoding and exposes it
//! through a common provider trait and an explicit format registry.
//!
//! # Stream Layout
//!
//! | Part          | Magic      | Content                                  |
//! |---------------|------------|------------------------------------------|
//! | Preamble      | -          | `89 53 4D 46 0D 0A 1A 0A`, major, minor  |
//! | Header        | `SMF_HEAD` | counts, coordinate system, attributes    |
//! | Vertex data   | `SMF_VDNI` | one padded block per attribute           |
//! | Triangles     | `SMF_TRIS` | packed index triples                     |
//! | Metadata      | `SMF_META` | schema-tagged opaque payload (any count) |
//! | End           | `SMF_END!` | empty                                    |
//!
//! Every section size is a multiple of 16 octets. Framing and header fields
//! are big-endian; attribute and triangle payloads use the byte order the
//! header declares.
//!
//! # Parsing
//!
//! ```ignore
//! use smf_core::MemoryMeshProducer;
//! use smf_io::BinaryParser;
//!
//! let file = std::fs::File::open("mesh.smfb")?;
//! let mut producer = MemoryMeshProducer::new();
//! BinaryParser::with_source(file, "mesh.smfb").parse(&mut producer)?;
//! let mesh = producer.into_mesh()?;
//! ```
//!
//! # Serializing
//!
//! ```ignore
//! use smf_core::{serialize_mesh, Serializer};
//! use smf_io::BinarySerializer;
//!
//! let mut serializer = BinarySerializer::new(Vec::new());
//! serialize_mesh(&mesh, &mut serializer)?;
//! serializer.finish()?;
//! let bytes = serializer.into_inner();
//! ```

pub mod binary_random_access;
pub mod binary_reader;
pub mod binary_writer;
pub mod blocks;
pub mod format;
pub mod header_layout;
pub mod registry;
pub mod section;

// Traits module is always available
pub mod traits;

pub use binary_random_access::{BinaryRandomAccessParser, SectionIndex};
pub use binary_reader::{BinaryParser, ParserState};
pub use binary_writer::BinarySerializer;
pub use format::{BinaryFormat, BINARY_FORMAT};
pub use registry::{FormatRegistry, Probed, RegistryError};
pub use section::Section;
pub use traits::{FormatDescription, FormatProvider};
