//! Vertex dedup key.

use crate::util::{Vec2, Vec3};
use std::hash::{Hash, Hasher};

/// Face-vertex attributes as read from a mesh source.
///
/// Two keys are equal when every component compares equal as `f32`; no
/// epsilon. Hashing works on the bit patterns with `-0.0` folded into `+0.0`
/// so it agrees with that equality.
#[derive(Debug, Clone, Copy, Default)]
pub struct VertexKey {
    pub position: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
}

impl VertexKey {
    pub fn new(position: Vec3, normal: Vec3, uv: Vec2) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }

    #[inline]
    fn bits(&self) -> [u32; 8] {
        // Adding +0.0 turns -0.0 into +0.0 and leaves everything else alone.
        let c = |v: f32| (v + 0.0).to_bits();
        [
            c(self.position.x),
            c(self.position.y),
            c(self.position.z),
            c(self.normal.x),
            c(self.normal.y),
            c(self.normal.z),
            c(self.uv.x),
            c(self.uv.y),
        ]
    }
}

impl PartialEq for VertexKey {
    fn eq(&self, other: &Self) -> bool {
        self.bits() == other.bits()
    }
}

impl Eq for VertexKey {}

impl Hash for VertexKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bits().hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_exact_equality() {
        let a = VertexKey::new(Vec3::new(1.0, 2.0, 3.0), Vec3::Z, Vec2::new(0.5, 0.25));
        let b = VertexKey::new(Vec3::new(1.0, 2.0, 3.0), Vec3::Z, Vec2::new(0.5, 0.25));
        assert_eq!(a, b);

        let c = VertexKey::new(Vec3::new(1.0, 2.0, 3.0 + 1e-6), Vec3::Z, Vec2::new(0.5, 0.25));
        assert_ne!(a, c);
    }

    #[test]
    fn test_attributes_all_participate() {
        let base = VertexKey::new(Vec3::ONE, Vec3::Y, Vec2::ZERO);
        let other_normal = VertexKey { normal: Vec3::X, ..base };
        let other_uv = VertexKey { uv: Vec2::X, ..base };

        let set: HashSet<_> = [base, other_normal, other_uv, base].into_iter().collect();
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_signed_zero_collapses() {
        let a = VertexKey::new(Vec3::new(0.0, 1.0, 0.0), Vec3::Y, Vec2::ZERO);
        let b = VertexKey::new(Vec3::new(-0.0, 1.0, 0.0), Vec3::Y, Vec2::ZERO);
        assert_eq!(a, b);

        let set: HashSet<_> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }
}
