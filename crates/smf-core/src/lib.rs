//! SMF Core Library
//!
//! Data model, numeric value codec and push-parser event protocol shared by
//! every SMF mesh encoding.

// =============================================================================
// Data model
// =============================================================================

pub mod attribute;
pub mod coordinate_system;
pub mod data_types;
pub mod header;
pub mod metadata;
pub mod schema;
pub mod status;
pub mod value;
pub mod version;

// =============================================================================
// Codec support
// =============================================================================

pub mod decoder_stream;
pub mod encoder_stream;
pub mod value_codec;

// =============================================================================
// Protocol
// =============================================================================

pub mod events;
pub mod memory_mesh;
pub mod serializer;
pub mod tracker;
pub mod triangles;

// =============================================================================
// Re-exports
// =============================================================================

pub use attribute::{Attribute, AttributeName};
pub use coordinate_system::{Axis, CoordinateSystem, WindingOrder};
pub use data_types::{ByteOrder, ComponentType, TriangleWidth};
pub use decoder_stream::DecoderStream;
pub use encoder_stream::EncoderStream;
pub use events::{IgnoringEvents, Interest, ParserEvents};
pub use header::{Header, HeaderBuilder, Triangles};
pub use memory_mesh::{serialize_mesh, AttributeArray, MemoryMesh, MemoryMeshProducer};
pub use metadata::MetadataValue;
pub use schema::{SchemaIdentifier, SchemaName};
pub use serializer::{Serializer, SerializerContract};
pub use status::{LexicalPosition, ParseError, ParseWarning, SmfError, Status};
pub use tracker::{Tracker, TrackerState};
pub use triangles::{choose_triangle_width, TrianglesOptimize, TrianglesOptimizeConfig};
pub use value::AttributeValue;
pub use value_codec::{pack_f16, unpack_f16, ElementCodec};
pub use version::FormatVersion;
