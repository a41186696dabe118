//! Fully materialized meshes.
//!
//! [`MemoryMeshProducer`] is a [`ParserEvents`] consumer that retains
//! everything a parser delivers; [`serialize_mesh`] replays a
//! [`MemoryMesh`] into any [`Serializer`].

use std::collections::BTreeMap;

use crate::attribute::{Attribute, AttributeName};
use crate::data_types::ComponentType;
use crate::events::{Interest, ParserEvents};
use crate::header::Header;
use crate::metadata::MetadataValue;
use crate::schema::SchemaIdentifier;
use crate::serializer::Serializer;
use crate::status::{LexicalPosition, ParseError, ParseWarning, SmfError, Status};
use crate::value::AttributeValue;
use crate::version::FormatVersion;

// =============================================================================
// Attribute arrays
// =============================================================================

/// All values of one attribute, typed by component kind and count.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeArray {
    Float1(Vec<f64>),
    Float2(Vec<[f64; 2]>),
    Float3(Vec<[f64; 3]>),
    Float4(Vec<[f64; 4]>),
    Signed1(Vec<i64>),
    Signed2(Vec<[i64; 2]>),
    Signed3(Vec<[i64; 3]>),
    Signed4(Vec<[i64; 4]>),
    Unsigned1(Vec<u64>),
    Unsigned2(Vec<[u64; 2]>),
    Unsigned3(Vec<[u64; 3]>),
    Unsigned4(Vec<[u64; 4]>),
}

impl AttributeArray {
    /// An empty array shaped for `attribute`.
    pub fn for_attribute(attribute: &Attribute) -> Self {
        use AttributeArray::*;
        match (attribute.component_type(), attribute.component_count()) {
            (ComponentType::Floating, 1) => Float1(Vec::new()),
            (ComponentType::Floating, 2) => Float2(Vec::new()),
            (ComponentType::Floating, 3) => Float3(Vec::new()),
            (ComponentType::Floating, _) => Float4(Vec::new()),
            (ComponentType::IntegerSigned, 1) => Signed1(Vec::new()),
            (ComponentType::IntegerSigned, 2) => Signed2(Vec::new()),
            (ComponentType::IntegerSigned, 3) => Signed3(Vec::new()),
            (ComponentType::IntegerSigned, _) => Signed4(Vec::new()),
            (ComponentType::IntegerUnsigned, 1) => Unsigned1(Vec::new()),
            (ComponentType::IntegerUnsigned, 2) => Unsigned2(Vec::new()),
            (ComponentType::IntegerUnsigned, 3) => Unsigned3(Vec::new()),
            (ComponentType::IntegerUnsigned, _) => Unsigned4(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        use AttributeArray::*;
        match self {
            Float1(v) => v.len(),
            Float2(v) => v.len(),
            Float3(v) => v.len(),
            Float4(v) => v.len(),
            Signed1(v) => v.len(),
            Signed2(v) => v.len(),
            Signed3(v) => v.len(),
            Signed4(v) => v.len(),
            Unsigned1(v) => v.len(),
            Unsigned2(v) => v.len(),
            Unsigned3(v) => v.len(),
            Unsigned4(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends a value of the array's own shape.
    pub fn push(&mut self, value: AttributeValue) -> Status {
        use AttributeArray as A;
        use AttributeValue as V;
        match (self, value) {
            (A::Float1(a), V::Float1(x)) => a.push(x),
            (A::Float2(a), V::Float2(x)) => a.push(x),
            (A::Float3(a), V::Float3(x)) => a.push(x),
            (A::Float4(a), V::Float4(x)) => a.push(x),
            (A::Signed1(a), V::Signed1(x)) => a.push(x),
            (A::Signed2(a), V::Signed2(x)) => a.push(x),
            (A::Signed3(a), V::Signed3(x)) => a.push(x),
            (A::Signed4(a), V::Signed4(x)) => a.push(x),
            (A::Unsigned1(a), V::Unsigned1(x)) => a.push(x),
            (A::Unsigned2(a), V::Unsigned2(x)) => a.push(x),
            (A::Unsigned3(a), V::Unsigned3(x)) => a.push(x),
            (A::Unsigned4(a), V::Unsigned4(x)) => a.push(x),
            (_, value) => {
                return Err(SmfError::contract(format!(
                    "Incorrect type.\n  Received: {}",
                    value.describe()
                )))
            }
        }
        Ok(())
    }

    pub fn get(&self, index: usize) -> Option<AttributeValue> {
        use AttributeArray as A;
        use AttributeValue as V;
        match self {
            A::Float1(a) => a.get(index).copied().map(V::Float1),
            A::Float2(a) => a.get(index).copied().map(V::Float2),
            A::Float3(a) => a.get(index).copied().map(V::Float3),
            A::Float4(a) => a.get(index).copied().map(V::Float4),
            A::Signed1(a) => a.get(index).copied().map(V::Signed1),
            A::Signed2(a) => a.get(index).copied().map(V::Signed2),
            A::Signed3(a) => a.get(index).copied().map(V::Signed3),
            A::Signed4(a) => a.get(index).copied().map(V::Signed4),
            A::Unsigned1(a) => a.get(index).copied().map(V::Unsigned1),
            A::Unsigned2(a) => a.get(index).copied().map(V::Unsigned2),
            A::Unsigned3(a) => a.get(index).copied().map(V::Unsigned3),
            A::Unsigned4(a) => a.get(index).copied().map(V::Unsigned4),
        }
    }

    pub fn values(&self) -> impl Iterator<Item = AttributeValue> + '_ {
        (0..self.len()).filter_map(move |i| self.get(i))
    }
}

// =============================================================================
// MemoryMesh
// =============================================================================

/// A complete mesh held in memory.
///
/// Every declared attribute has an array of exactly `vertex_count`
/// elements and the triangle list has exactly `triangles().count` entries.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryMesh {
    header: Header,
    arrays: BTreeMap<AttributeName, AttributeArray>,
    triangles: Vec<[u64; 3]>,
    metadata: Vec<MetadataValue>,
}

impl MemoryMesh {
    pub fn new(
        header: Header,
        arrays: BTreeMap<AttributeName, AttributeArray>,
        triangles: Vec<[u64; 3]>,
        metadata: Vec<MetadataValue>,
    ) -> Result<Self, SmfError> {
        if arrays.len() != header.attributes_in_order().len() {
            return Err(SmfError::invalid(format!(
                "Expected {} attribute arrays, but {} were provided",
                header.attributes_in_order().len(),
                arrays.len()
            )));
        }
        for attribute in header.attributes_in_order() {
            let array = arrays.get(attribute.name()).ok_or_else(|| {
                SmfError::invalid(format!(
                    "Missing attribute array.\n  Attribute: {}",
                    attribute.name()
                ))
            })?;
            if array.len() as u64 != header.vertex_count() {
                return Err(SmfError::invalid(format!(
                    "Attribute {} has {} elements, but the vertex count is {}",
                    attribute.name(),
                    array.len(),
                    header.vertex_count()
                )));
            }
            if std::mem::discriminant(array)
                != std::mem::discriminant(&AttributeArray::for_attribute(attribute))
            {
                return Err(SmfError::invalid(format!(
                    "Attribute array does not match its declaration.\n  Attribute: {}",
                    attribute
                )));
            }
        }
        if triangles.len() as u64 != header.triangles().count {
            return Err(SmfError::invalid(format!(
                "Expected {} triangles, but {} were provided",
                header.triangles().count,
                triangles.len()
            )));
        }
        Ok(Self {
            header,
            arrays,
            triangles,
            metadata,
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn arrays(&self) -> &BTreeMap<AttributeName, AttributeArray> {
        &self.arrays
    }

    pub fn array(&self, name: &AttributeName) -> Option<&AttributeArray> {
        self.arrays.get(name)
    }

    pub fn triangles(&self) -> &[[u64; 3]] {
        &self.triangles
    }

    pub fn metadata(&self) -> &[MetadataValue] {
        &self.metadata
    }

    /// Same mesh with a replacement header, revalidated.
    pub fn with_header(&self, header: Header) -> Result<Self, SmfError> {
        Self::new(
            header,
            self.arrays.clone(),
            self.triangles.clone(),
            self.metadata.clone(),
        )
    }
}

// =============================================================================
// Producer
// =============================================================================

/// Builds a [`MemoryMesh`] from parser events.
#[derive(Debug, Default)]
pub struct MemoryMeshProducer {
    header: Option<Header>,
    arrays: BTreeMap<AttributeName, AttributeArray>,
    current: Option<(AttributeName, AttributeArray)>,
    triangles: Vec<[u64; 3]>,
    metadata: Vec<MetadataValue>,
    errors: Vec<ParseError>,
    warnings: Vec<ParseWarning>,
}

impl MemoryMeshProducer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    pub fn warnings(&self) -> &[ParseWarning] {
        &self.warnings
    }

    /// The mesh, or every error reported while parsing.
    pub fn into_mesh(self) -> Result<MemoryMesh, Vec<ParseError>> {
        if !self.errors.is_empty() {
            return Err(self.errors);
        }
        let header = self.header.ok_or_else(|| {
            vec![ParseError::new(
                LexicalPosition::default(),
                "No header was received",
            )]
        })?;
        MemoryMesh::new(header, self.arrays, self.triangles, self.metadata)
            .map_err(|e| vec![e.into_parse_error(LexicalPosition::default())])
    }
}

impl ParserEvents for MemoryMeshProducer {
    fn on_error(&mut self, error: ParseError) {
        self.errors.push(error);
    }

    fn on_warning(&mut self, warning: ParseWarning) {
        self.warnings.push(warning);
    }

    fn on_version_received(&mut self, _version: FormatVersion) -> Interest {
        Interest::Accept
    }

    fn on_header_parsed(&mut self, header: &Header) -> Interest {
        self.header = Some(header.clone());
        Interest::Accept
    }

    fn on_attributes_non_interleaved(&mut self) -> Interest {
        Interest::Accept
    }

    fn on_data_attribute_start(&mut self, attribute: &Attribute) -> Interest {
        self.current = Some((
            attribute.name().clone(),
            AttributeArray::for_attribute(attribute),
        ));
        Interest::Accept
    }

    fn on_data_attribute_value(&mut self, value: AttributeValue) {
        if let Some((_, array)) = self.current.as_mut() {
            if let Err(e) = array.push(value) {
                self.errors
                    .push(e.into_parse_error(LexicalPosition::default()));
            }
        }
    }

    fn on_data_attribute_value_finish(&mut self) {
        if let Some((name, array)) = self.current.take() {
            self.arrays.insert(name, array);
        }
    }

    fn on_triangles(&mut self) -> Interest {
        Interest::Accept
    }

    fn on_data_triangle(&mut self, v0: u64, v1: u64, v2: u64) {
        self.triangles.push([v0, v1, v2]);
    }

    fn on_meta(&mut self, _schema: &SchemaIdentifier) -> Interest {
        Interest::Accept
    }

    fn on_meta_data(&mut self, schema: &SchemaIdentifier, data: &[u8]) {
        self.metadata.push(MetadataValue::new(schema.clone(), data));
    }
}

// =============================================================================
// Serialization
// =============================================================================

/// Writes `mesh` through `serializer`: header, every attribute in declared
/// order, triangles, then metadata. Does not call [`Serializer::finish`].
pub fn serialize_mesh(mesh: &MemoryMesh, serializer: &mut dyn Serializer) -> Status {
    let header = mesh.header();
    serializer.serialize_header(header)?;

    serializer.serialize_vertex_data_non_interleaved_start()?;
    for attribute in header.attributes_in_order() {
        serializer.serialize_data(attribute.name())?;
        if let Some(array) = mesh.array(attribute.name()) {
            for value in array.values() {
                serializer.serialize_value(&value)?;
            }
        }
    }
    serializer.serialize_vertex_data_non_interleaved_finish()?;

    serializer.serialize_triangles_start()?;
    for &[v0, v1, v2] in mesh.triangles() {
        serializer.serialize_triangle(v0, v1, v2)?;
    }
    serializer.serialize_triangles_finish()?;

    for meta in mesh.metadata() {
        serializer.serialize_metadata(&meta.schema, &meta.data)?;
    }
    Ok(())
}
