//! Byte views of a built scene for GPU storage buffers.

use super::{Material, Scene};
use crate::bvh::BvhNode;
use crate::geom::Tri;
use crate::util::Vec4;

/// Complete scene data ready for GPU upload, borrowed from a [`Scene`].
#[derive(Debug, Clone, Copy)]
pub struct GpuSceneData<'a> {
    /// xyz = position, w = u
    pub vertices: &'a [Vec4],
    /// xyz = normal, w = v
    pub normals: &'a [Vec4],
    /// Model-local indices, three per triangle.
    pub indices: &'a [u32],
    /// Triangle records in BVH leaf order.
    pub triangles: &'a [Tri],
    /// Flat BVH node array (index 0 = root).
    pub nodes: &'a [BvhNode],
    pub materials: &'a [Material],
}

impl<'a> GpuSceneData<'a> {
    pub(super) fn new(scene: &'a Scene) -> Self {
        Self {
            vertices: scene.vertices(),
            normals: scene.normals(),
            indices: scene.indices(),
            triangles: scene.triangles(),
            nodes: scene.nodes(),
            materials: scene.materials(),
        }
    }

    pub fn vertices_bytes(&self) -> &'a [u8] {
        bytemuck::cast_slice(self.vertices)
    }

    pub fn normals_bytes(&self) -> &'a [u8] {
        bytemuck::cast_slice(self.normals)
    }

    pub fn indices_bytes(&self) -> &'a [u8] {
        bytemuck::cast_slice(self.indices)
    }

    pub fn triangles_bytes(&self) -> &'a [u8] {
        bytemuck::cast_slice(self.triangles)
    }

    pub fn nodes_bytes(&self) -> &'a [u8] {
        bytemuck::cast_slice(self.nodes)
    }

    pub fn materials_bytes(&self) -> &'a [u8] {
        bytemuck::cast_slice(self.materials)
    }

    /// All buffers with the labels the tracer binds them under.
    pub fn buffers(&self) -> [(&'static str, &'a [u8]); 6] {
        [
            ("Vertices", self.vertices_bytes()),
            ("Normals", self.normals_bytes()),
            ("Indices", self.indices_bytes()),
            ("Triangles", self.triangles_bytes()),
            ("BVHNode", self.nodes_bytes()),
            ("Materials", self.materials_bytes()),
        ]
    }

    /// Sum of all buffer sizes in bytes.
    pub fn total_bytes(&self) -> usize {
        self.buffers().iter().map(|(_, b)| b.len()).sum()
    }
}
