//! Flat material palette entries.

use crate::util::Vec3;
use bytemuck::{Pod, Zeroable};

/// Material for GPU storage (16 bytes, one vec4).
///
/// rgb = albedo, a = emitted radiance.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Material {
    pub albedo: [f32; 3],
    pub emission: f32,
}

impl Material {
    pub fn new(albedo: Vec3, emission: f32) -> Self {
        Self {
            albedo: albedo.to_array(),
            emission,
        }
    }

    pub fn is_emissive(&self) -> bool {
        self.emission > 0.0
    }
}

impl Default for Material {
    /// Grey diffuse.
    fn default() -> Self {
        Self::new(Vec3::splat(0.8), 0.0)
    }
}
