//! Triangle index width selection and the triangle optimize step.

use crate::data_types::TriangleWidth;
use crate::header::Triangles;
use crate::memory_mesh::MemoryMesh;
use crate::status::{LexicalPosition, SmfError};

/// Narrowest width whose range includes `max_index`.
///
/// Compares the bit length of the index against each width, so the answer
/// is exact up to and including `u64::MAX`.
pub fn required_width(max_index: u64) -> TriangleWidth {
    let bits = u64::BITS - max_index.leading_zeros();
    TriangleWidth::ALL
        .into_iter()
        .find(|w| bits <= w.bits())
        .unwrap_or(TriangleWidth::Bits64)
}

/// Narrowest width that holds `max_index`, raised to `floor` if given.
pub fn choose_triangle_width(max_index: u64, floor: Option<TriangleWidth>) -> TriangleWidth {
    let required = required_width(max_index);
    match floor {
        Some(floor) => required.max(floor),
        None => required,
    }
}

/// Checks every triangle against `vertex_count`.
///
/// Returns one error per offending triangle, naming the triangle's ordinal
/// and its first out-of-range index.
pub fn validate_triangles(triangles: &[[u64; 3]], vertex_count: u64) -> Vec<SmfError> {
    triangles
        .iter()
        .enumerate()
        .filter_map(|(ordinal, triangle)| {
            triangle.iter().find(|&&v| v >= vertex_count).map(|&v| {
                SmfError::structural(
                    LexicalPosition::default(),
                    format!("Triangle {} points to nonexistent vertex {}", ordinal, v),
                )
            })
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrianglesOptimizeConfig {
    /// Minimum index width of the result.
    pub size: Option<TriangleWidth>,
    /// Reject meshes with out-of-range triangle indices.
    pub validate: bool,
}

/// Re-encodes a mesh's triangles at the narrowest sufficient width.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrianglesOptimize {
    config: TrianglesOptimizeConfig,
}

impl TrianglesOptimize {
    pub fn new(config: TrianglesOptimizeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> TrianglesOptimizeConfig {
        self.config
    }

    pub fn apply(&self, mesh: &MemoryMesh) -> Result<MemoryMesh, Vec<SmfError>> {
        let header = mesh.header();
        if self.config.validate {
            let errors = validate_triangles(mesh.triangles(), header.vertex_count());
            if !errors.is_empty() {
                return Err(errors);
            }
        }

        let max_index = mesh
            .triangles()
            .iter()
            .flat_map(|t| t.iter().copied())
            .max()
            .unwrap_or(0);
        let width = choose_triangle_width(max_index, self.config.size);
        log::debug!(
            "triangle width {} -> {} (max index {})",
            header.triangles().index_width,
            width,
            max_index
        );

        let header = header
            .to_builder()
            .triangles(Triangles::new(header.triangles().count, width))
            .build()
            .map_err(|e| vec![e])?;
        mesh.with_header(header).map_err(|e| vec![e])
    }
}
