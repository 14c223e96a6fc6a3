//! Scene assembly: material palette, model imports and the final BVH build.
//!
//! ## Usage
//! ```ignore
//! use gwaphics::prelude::*;
//!
//! let mut builder = SceneBuilder::new();
//! let red = builder.add_material(Vec3::new(0.8, 0.1, 0.1), 0.0)?;
//! builder.add_model("assets/bunny.obj", Mat4::from_scale(Vec3::splat(2.0)), red)?;
//! let scene = builder.build()?;
//! for (label, bytes) in scene.gpu_data().buffers() {
//!     upload(label, bytes);
//! }
//! ```

mod builder;
mod gpu_data;
mod material;

pub use builder::SceneBuilder;
pub use gpu_data::GpuSceneData;
pub use material::Material;

use crate::bvh::{validate_nodes, BvhNode, BvhStats};
use crate::geom::{global_indices, ImportSummary, Tri};
use crate::util::{Aabb, Error, Result, Vec4};
use std::collections::HashMap;
use std::path::PathBuf;

/// Record of one successfully imported model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInfo {
    /// File path, or the label given to an in-memory source.
    pub source: PathBuf,
    pub material: u32,
    pub summary: ImportSummary,
}

/// A built scene: flat arrays in GPU layout, triangles in BVH leaf order.
#[derive(Debug, Clone)]
pub struct Scene {
    pub(crate) vertices: Vec<Vec4>,
    pub(crate) normals: Vec<Vec4>,
    pub(crate) indices: Vec<u32>,
    pub(crate) triangles: Vec<Tri>,
    pub(crate) nodes: Vec<BvhNode>,
    pub(crate) materials: Vec<Material>,
    pub(crate) models: Vec<ModelInfo>,
    pub(crate) stats: BvhStats,
}

impl Scene {
    pub fn vertices(&self) -> &[Vec4] {
        &self.vertices
    }

    pub fn normals(&self) -> &[Vec4] {
        &self.normals
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Triangle records; leaf `(first, count)` ranges index this array directly.
    pub fn triangles(&self) -> &[Tri] {
        &self.triangles
    }

    /// Used prefix of the node pool; slot 1 is an unused zeroed node.
    pub fn nodes(&self) -> &[BvhNode] {
        &self.nodes
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn models(&self) -> &[ModelInfo] {
        &self.models
    }

    pub fn stats(&self) -> &BvhStats {
        &self.stats
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// World-space bounds of the whole scene.
    pub fn bounds(&self) -> Aabb {
        self.nodes.first().map(BvhNode::aabb).unwrap_or(Aabb::EMPTY)
    }

    /// Borrowed byte views for GPU upload.
    pub fn gpu_data(&self) -> GpuSceneData<'_> {
        GpuSceneData::new(self)
    }

    /// Check the built arrays against each other.
    ///
    /// Every triangle must address vertices inside its own model's run and a
    /// material in the palette, and the hierarchy must cover the reordered triangles
    /// exactly once with boxes that contain them.
    pub fn validate(&self) -> Result<()> {
        let vertex_count = self.vertices.len();
        if self.normals.len() != vertex_count {
            return Err(Error::invalid_bvh(format!(
                "{} normals for {vertex_count} vertices",
                self.normals.len()
            )));
        }

        // Vertex run of each model that produced triangles, keyed by its offset.
        let model_vertices: HashMap<u32, usize> = self
            .models
            .iter()
            .filter(|m| m.summary.triangles > 0)
            .map(|m| (m.summary.model_offset, m.summary.unique_vertices))
            .collect();

        for (i, tri) in self.triangles.iter().enumerate() {
            let first = tri.first_index as usize;
            if first + 3 > self.indices.len() {
                return Err(Error::invalid_bvh(format!(
                    "triangle {i} reads indices past {}",
                    self.indices.len()
                )));
            }
            let Some(&run) = model_vertices.get(&tri.model_offset) else {
                return Err(Error::invalid_bvh(format!(
                    "triangle {i} has model offset {} that starts no model",
                    tri.model_offset
                )));
            };
            let base = tri.model_offset as usize;
            let end = (base + run).min(vertex_count);
            if let Some(v) = global_indices(&self.indices, tri)
                .into_iter()
                .find(|&v| v >= end)
            {
                return Err(Error::invalid_bvh(format!(
                    "triangle {i} references vertex {v} outside its model [{base}, {end})"
                )));
            }
            if tri.material_idx as usize >= self.materials.len() {
                return Err(Error::UnknownMaterial {
                    index: tri.material_idx,
                    count: self.materials.len(),
                });
            }
        }

        let n = self.triangles.len();
        validate_nodes(&self.nodes, 2 * n, n, |first, count, leaf_box| {
            for (offset, tri) in self.triangles[first..first + count].iter().enumerate() {
                let corners = global_indices(&self.indices, tri).map(|v| self.vertices[v].truncate());
                if !leaf_box.contains(&Aabb::from_points(corners)) {
                    return Err(Error::invalid_bvh(format!(
                        "triangle {} escapes its leaf box",
                        first + offset
                    )));
                }
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::{Mat4, Vec3};

    fn two_boxes() -> Scene {
        let mut b = SceneBuilder::new();
        let grey = b.add_material(Vec3::splat(0.8), 0.0).unwrap();
        let light = b.add_material(Vec3::ONE, 5.0).unwrap();
        let quad = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3\nf 1 3 4\n";
        for x in 0..4 {
            let t = Mat4::from_translation(Vec3::new(x as f32 * 3.0, 0.0, 0.0));
            b.add_model_source(quad.as_bytes(), format!("quad{x}.obj"), t, grey).unwrap();
        }
        b.add_model_source(quad.as_bytes(), "light.obj", Mat4::from_translation(Vec3::Y * 10.0), light)
            .unwrap();
        b.build().unwrap()
    }

    #[test]
    fn test_built_scene_validates() {
        let scene = two_boxes();
        assert_eq!(scene.triangle_count(), 10);
        assert_eq!(scene.vertex_count(), 20);
        assert_eq!(scene.models().len(), 5);
        scene.validate().unwrap();
    }

    #[test]
    fn test_bounds_cover_all_models() {
        let scene = two_boxes();
        let b = scene.bounds();
        assert_eq!(b.min, Vec3::ZERO);
        assert_eq!(b.max, Vec3::new(10.0, 11.0, 0.0));
    }

    #[test]
    fn test_triangles_are_a_permutation() {
        let scene = two_boxes();
        let mut firsts: Vec<u32> = scene.triangles().iter().map(|t| t.first_index).collect();
        firsts.sort_unstable();
        assert_eq!(firsts, (0..10).map(|i| i * 3).collect::<Vec<u32>>());
        let emissive = scene.triangles().iter().filter(|t| t.material_idx == 1).count();
        assert_eq!(emissive, 2);
    }

    #[test]
    fn test_validate_catches_bad_material() {
        let mut scene = two_boxes();
        scene.triangles[0].material_idx = 9;
        assert!(matches!(
            scene.validate(),
            Err(Error::UnknownMaterial { index: 9, .. })
        ));
    }

    #[test]
    fn test_validate_catches_index_into_another_model() {
        let mut b = SceneBuilder::new();
        let grey = b.add_material(Vec3::splat(0.8), 0.0).unwrap();
        let tri = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
        b.add_model_source(tri.as_bytes(), "a.obj", Mat4::IDENTITY, grey).unwrap();
        b.add_model_source(tri.as_bytes(), "b.obj", Mat4::IDENTITY, grey).unwrap();
        let mut scene = b.build().unwrap();
        scene.validate().unwrap();

        // Local index 3 is model b's first vertex, not one of model a's three.
        let first_a = scene
            .triangles()
            .iter()
            .find(|t| t.model_offset == 0)
            .map(|t| t.first_index as usize)
            .unwrap();
        scene.indices[first_a] = 3;
        let err = scene.validate().unwrap_err();
        assert!(err.to_string().contains("outside its model"));
    }

    #[test]
    fn test_validate_catches_moved_vertex() {
        let mut scene = two_boxes();
        scene.vertices[0] = Vec4::new(100.0, 0.0, 0.0, 0.0);
        assert!(scene.validate().is_err());
    }

    #[test]
    fn test_gpu_buffers() {
        let scene = two_boxes();
        let gpu = scene.gpu_data();
        let labels: Vec<_> = gpu.buffers().iter().map(|(l, _)| *l).collect();
        assert_eq!(
            labels,
            ["Vertices", "Normals", "Indices", "Triangles", "BVHNode", "Materials"]
        );
        assert_eq!(gpu.vertices_bytes().len(), 20 * 16);
        assert_eq!(gpu.indices_bytes().len(), 30 * 4);
        assert_eq!(gpu.triangles_bytes().len(), 10 * 16);
        assert_eq!(gpu.nodes_bytes().len(), scene.nodes().len() * 32);
        assert_eq!(gpu.materials_bytes().len(), 2 * 16);
        assert_eq!(
            gpu.total_bytes(),
            20 * 16 * 2 + 30 * 4 + 10 * 16 + scene.nodes().len() * 32 + 32
        );
    }
}
