//! Scene geometry: the shared vertex/normal/index/triangle arrays and the
//! mesh importer that fills them.
//!
//! ## Layout
//! - `vertices[i]`: xyz = world-space position, w = texture u
//! - `normals[i]`: xyz = world-space unit normal, w = texture v
//! - `indices`: three model-local vertex indices per triangle; add the
//!   triangle's [`Tri::model_offset`] to address `vertices`/`normals`
//! - `triangles`: one [`Tri`] record per triangle
//! - `bounds`: per-triangle centroid and box, only needed until the BVH is built

mod import;
mod obj;
mod vertex;

pub use import::{import_model, import_obj_buf, ImportSummary, ModelGeometry};
pub use obj::{parse_obj, FaceVertex, ObjData};
pub use vertex::VertexKey;

use crate::bvh::TriBounds;
use crate::util::{Vec3, Vec4};
use bytemuck::{Pod, Zeroable};

/// Per-triangle record for GPU storage (16 bytes).
///
/// Field order matches the tracing kernel's struct.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct Tri {
    /// Non-zero to interpolate vertex normals.
    pub shade_smooth: u32,
    /// Index into the material palette.
    pub material_idx: u32,
    /// Vertex-array base of the owning model.
    pub model_offset: u32,
    /// Offset of this triangle's three indices in the index array.
    pub first_index: u32,
}

impl Tri {
    pub fn new(model_offset: u32, first_index: u32, material_idx: u32, shade_smooth: bool) -> Self {
        Self {
            shade_smooth: shade_smooth as u32,
            material_idx,
            model_offset,
            first_index,
        }
    }
}

/// The append-only arrays shared by every import of one scene.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeometryArrays {
    pub vertices: Vec<Vec4>,
    pub normals: Vec<Vec4>,
    pub indices: Vec<u32>,
    pub triangles: Vec<Tri>,
    pub bounds: Vec<TriBounds>,
}

impl GeometryArrays {
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Global vertex indices of a triangle.
    pub fn global_indices(&self, tri: &Tri) -> [usize; 3] {
        global_indices(&self.indices, tri)
    }

    /// World-space corner positions of a triangle.
    pub fn corners(&self, tri: &Tri) -> [Vec3; 3] {
        self.global_indices(tri).map(|i| self.vertices[i].truncate())
    }
}

/// Resolve a triangle's three indices against its model offset.
pub(crate) fn global_indices(indices: &[u32], tri: &Tri) -> [usize; 3] {
    let first = tri.first_index as usize;
    let base = tri.model_offset as usize;
    [
        base + indices[first] as usize,
        base + indices[first + 1] as usize,
        base + indices[first + 2] as usize,
    ]
}
