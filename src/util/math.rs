//! Math type re-exports and scene-specific math utilities.
//!
//! This module re-exports the `glam` types used across the crate and provides
//! the axis-aligned box and model transform used during scene construction.

pub use glam::{EulerRot, Mat4, Quat, Vec2, Vec3, Vec4};

use super::{Error, Result};
use std::fmt;

/// 3D axis-aligned bounding box.
#[derive(Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Empty bounding box (inverted, will expand on first point).
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    /// Create a new bounding box from min and max points.
    #[inline]
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Smallest box containing all points.
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Self {
        let mut b = Self::EMPTY;
        for p in points {
            b.grow_point(p);
        }
        b
    }

    /// Check if this box contains nothing.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Grow to include a point.
    #[inline]
    pub fn grow_point(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    /// Grow to include another box. Empty boxes are ignored.
    #[inline]
    pub fn grow(&mut self, other: &Aabb) {
        if !other.is_empty() {
            self.min = self.min.min(other.min);
            self.max = self.max.max(other.max);
        }
    }

    /// Half the surface area: `xy + yz + zx` of the extent.
    ///
    /// Only meaningful relative to other boxes (SAH cost). Empty boxes report 0.
    #[inline]
    pub fn area(&self) -> f32 {
        if self.is_empty() {
            return 0.0;
        }
        let e = self.max - self.min;
        e.x * e.y + e.y * e.z + e.z * e.x
    }

    /// True if `other` lies entirely inside this box. An empty box is inside anything.
    #[inline]
    pub fn contains(&self, other: &Aabb) -> bool {
        other.is_empty() || (self.min.cmple(other.min).all() && self.max.cmpge(other.max).all())
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl fmt::Debug for Aabb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Aabb({:?} - {:?})", self.min, self.max)
    }
}

/// Object-to-world transform with its precomputed inverse.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    obj_to_world: Mat4,
    world_to_obj: Mat4,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        obj_to_world: Mat4::IDENTITY,
        world_to_obj: Mat4::IDENTITY,
    };

    /// Build from an object-to-world matrix.
    ///
    /// Fails with [`Error::DegenerateTransform`] if the matrix is singular or
    /// holds non-finite values.
    pub fn new(obj_to_world: Mat4) -> Result<Self> {
        let det = obj_to_world.determinant();
        if !obj_to_world.is_finite() || !det.is_finite() || det == 0.0 {
            return Err(Error::DegenerateTransform);
        }
        let world_to_obj = obj_to_world.inverse();
        if !world_to_obj.is_finite() {
            return Err(Error::DegenerateTransform);
        }
        Ok(Self {
            obj_to_world,
            world_to_obj,
        })
    }

    /// Transform a position into world space (w = 1, no projective divide).
    #[inline]
    pub fn point(&self, p: Vec3) -> Vec3 {
        self.obj_to_world.transform_point3(p)
    }

    /// Transform a normal by the inverse transpose and renormalize.
    ///
    /// Zero normals stay zero.
    #[inline]
    pub fn normal(&self, n: Vec3) -> Vec3 {
        self.world_to_obj
            .transpose()
            .transform_vector3(n)
            .normalize_or_zero()
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}
