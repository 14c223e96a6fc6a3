//! # gwaphics
//!
//! Scene geometry core of a GPU path tracer: triangle meshes are imported
//! from Wavefront OBJ, welded and transformed into shared world-space arrays,
//! and indexed by a binned-SAH bounding-volume hierarchy. The result is a set
//! of flat, GPU-ready buffers.
//!
//! ## Modules
//!
//! - [`util`] - Errors, bounding boxes and transforms
//! - [`geom`] - OBJ reader, vertex welding and the shared geometry arrays
//! - [`bvh`] - Binned SAH hierarchy builder and validator
//! - [`scene`] - Scene builder, built scene and GPU byte views
//! - [`config`] - JSON scene descriptions
//!
//! ## Example
//!
//! ```ignore
//! use gwaphics::prelude::*;
//!
//! let scene = SceneDescription::load("scenes/cornell.json")?.build_scene()?;
//! println!("{} triangles, {} nodes", scene.triangle_count(), scene.nodes().len());
//! ```

pub mod util;
pub mod geom;
pub mod bvh;
pub mod scene;
pub mod config;

// Re-export commonly used types
pub use util::{Error, Result};
pub use scene::{Scene, SceneBuilder};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::util::{Aabb, Error, Mat4, Result, Transform, Vec3, Vec4};
    pub use crate::bvh::{BvhNode, BvhStats};
    pub use crate::geom::{ImportSummary, Tri};
    pub use crate::scene::{GpuSceneData, Material, ModelInfo, Scene, SceneBuilder};
    pub use crate::config::SceneDescription;
}
