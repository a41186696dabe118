use crate::schema::SchemaIdentifier;

/// A schema-tagged metadata entry. The payload is opaque to the core.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetadataValue {
    pub schema: SchemaIdentifier,
    pub data: Vec<u8>,
}

impl MetadataValue {
    pub fn new(schema: SchemaIdentifier, data: impl Into<Vec<u8>>) -> Self {
        Self {
            schema,
            data: data.into(),
        }
    }
}
