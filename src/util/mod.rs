//! Utility types and functions.
//!
//! - [`Error`] / [`Result`] - Error handling
//! - [`Aabb`] / [`Transform`] - Bounding boxes and model transforms
//! - Math type re-exports from glam

mod error;
mod math;

pub use error::*;
pub use math::*;
