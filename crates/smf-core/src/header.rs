//! Mesh header: counts, attribute table, coordinate system and schema.

use std::collections::BTreeMap;

use crate::attribute::{Attribute, AttributeName};
use crate::coordinate_system::CoordinateSystem;
use crate::data_types::{ByteOrder, TriangleWidth};
use crate::schema::SchemaIdentifier;
use crate::status::SmfError;

/// Declared triangle count and index width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Triangles {
    pub count: u64,
    pub index_width: TriangleWidth,
}

impl Triangles {
    pub fn new(count: u64, index_width: TriangleWidth) -> Self {
        Self { count, index_width }
    }

    /// Size of one encoded triangle in octets.
    pub fn triangle_size_octets(&self) -> u64 {
        3 * self.index_width.size() as u64
    }
}

/// An immutable, validated mesh header.
///
/// Built with [`Header::builder`]; the attribute lookup by name is derived
/// from the ordered attribute list and can never disagree with it.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    vertex_count: u64,
    triangles: Triangles,
    attributes_in_order: Vec<Attribute>,
    attributes_by_name: BTreeMap<AttributeName, usize>,
    coordinate_system: CoordinateSystem,
    schema_identifier: Option<SchemaIdentifier>,
    meta_count: u32,
    data_byte_order: ByteOrder,
}

impl Header {
    pub fn builder() -> HeaderBuilder {
        HeaderBuilder::default()
    }

    /// A builder preloaded with every field of this header.
    pub fn to_builder(&self) -> HeaderBuilder {
        HeaderBuilder {
            vertex_count: self.vertex_count,
            triangles: self.triangles,
            attributes: self.attributes_in_order.clone(),
            coordinate_system: self.coordinate_system,
            schema_identifier: self.schema_identifier.clone(),
            meta_count: self.meta_count,
            data_byte_order: self.data_byte_order,
        }
    }

    pub fn vertex_count(&self) -> u64 {
        self.vertex_count
    }

    pub fn triangles(&self) -> Triangles {
        self.triangles
    }

    pub fn attributes_in_order(&self) -> &[Attribute] {
        &self.attributes_in_order
    }

    pub fn attribute(&self, name: &AttributeName) -> Option<&Attribute> {
        self.attributes_by_name
            .get(name)
            .map(|&i| &self.attributes_in_order[i])
    }

    /// Position of the named attribute within the declared order.
    pub fn attribute_index(&self, name: &AttributeName) -> Option<usize> {
        self.attributes_by_name.get(name).copied()
    }

    /// Attributes sorted by name.
    pub fn attributes_by_name(&self) -> impl Iterator<Item = &Attribute> + '_ {
        self.attributes_by_name
            .values()
            .map(move |&i| &self.attributes_in_order[i])
    }

    pub fn coordinate_system(&self) -> CoordinateSystem {
        self.coordinate_system
    }

    pub fn schema_identifier(&self) -> Option<&SchemaIdentifier> {
        self.schema_identifier.as_ref()
    }

    pub fn meta_count(&self) -> u32 {
        self.meta_count
    }

    pub fn data_byte_order(&self) -> ByteOrder {
        self.data_byte_order
    }
}

/// Collects header fields; [`HeaderBuilder::build`] validates them together.
#[derive(Debug, Clone, Default)]
pub struct HeaderBuilder {
    vertex_count: u64,
    triangles: Triangles,
    attributes: Vec<Attribute>,
    coordinate_system: CoordinateSystem,
    schema_identifier: Option<SchemaIdentifier>,
    meta_count: u32,
    data_byte_order: ByteOrder,
}

impl HeaderBuilder {
    pub fn vertex_count(mut self, count: u64) -> Self {
        self.vertex_count = count;
        self
    }

    pub fn triangles(mut self, triangles: Triangles) -> Self {
        self.triangles = triangles;
        self
    }

    pub fn attributes(mut self, attributes: Vec<Attribute>) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn coordinate_system(mut self, coordinate_system: CoordinateSystem) -> Self {
        self.coordinate_system = coordinate_system;
        self
    }

    pub fn schema_identifier(mut self, schema: Option<SchemaIdentifier>) -> Self {
        self.schema_identifier = schema;
        self
    }

    pub fn meta_count(mut self, count: u32) -> Self {
        self.meta_count = count;
        self
    }

    pub fn data_byte_order(mut self, order: ByteOrder) -> Self {
        self.data_byte_order = order;
        self
    }

    pub fn build(self) -> Result<Header, SmfError> {
        if u32::try_from(self.attributes.len()).is_err() {
            return Err(SmfError::invalid(format!(
                "Too many attributes: {}",
                self.attributes.len()
            )));
        }
        let mut by_name = BTreeMap::new();
        for (index, attribute) in self.attributes.iter().enumerate() {
            if by_name.insert(attribute.name().clone(), index).is_some() {
                return Err(SmfError::invalid(format!(
                    "Duplicate attribute name.\n  Attribute: {}",
                    attribute.name()
                )));
            }
        }
        Ok(Header {
            vertex_count: self.vertex_count,
            triangles: self.triangles,
            attributes_in_order: self.attributes,
            attributes_by_name: by_name,
            coordinate_system: self.coordinate_system,
            schema_identifier: self.schema_identifier,
            meta_count: self.meta_count,
            data_byte_order: self.data_byte_order,
        })
    }
}
