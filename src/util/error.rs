//! Error types for scene construction.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Main error type for scene import and acceleration-structure construction.
#[derive(Error, Debug)]
pub enum Error {
    /// File does not exist or cannot be accessed
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Malformed mesh source
    #[error("Failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// Face that is not a triangle
    #[error("Non-triangular face in {path}: {arity} vertices (input must be triangulated)")]
    NonTriangularFace { path: PathBuf, arity: usize },

    /// Face references an attribute that does not exist
    #[error("{kind} index {index} out of range in {path} (count: {len})")]
    IndexOutOfRange {
        path: PathBuf,
        kind: &'static str,
        index: i64,
        len: usize,
    },

    /// Transform cannot be inverted
    #[error("Degenerate model transform (singular or non-finite matrix)")]
    DegenerateTransform,

    /// Model references a material that was never added
    #[error("Material index {index} out of bounds (count: {count})")]
    UnknownMaterial { index: u32, count: usize },

    /// Build requested with no geometry
    #[error("Scene has no triangles")]
    EmptyScene,

    /// An earlier model failed to load, so the scene can not be completed
    #[error("Scene construction aborted: model {0} failed to load")]
    Aborted(PathBuf),

    /// Builder was used after a successful build
    #[error("Scene has already been built")]
    AlreadyBuilt,

    /// Counts that do not fit the 32-bit GPU layout
    #[error("Too many triangles for a 32-bit BVH: {0}")]
    TooManyTriangles(usize),

    /// Structural check on a built hierarchy failed
    #[error("Invalid BVH: {0}")]
    InvalidBvh(String),

    /// Invalid scene description
    #[error("Invalid scene description: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a parse error for the given source.
    pub fn parse(path: impl AsRef<Path>, msg: impl Into<String>) -> Self {
        Self::Parse {
            path: path.as_ref().to_path_buf(),
            message: msg.into(),
        }
    }

    /// Create a scene description error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a BVH validation error.
    pub fn invalid_bvh(msg: impl Into<String>) -> Self {
        Self::InvalidBvh(msg.into())
    }

    /// True for errors caused by the content of a mesh file.
    pub fn is_content_error(&self) -> bool {
        matches!(
            self,
            Self::FileNotFound(_)
                | Self::Parse { .. }
                | Self::NonTriangularFace { .. }
                | Self::IndexOutOfRange { .. }
                | Self::Io(_)
        )
    }
}

/// Result type alias for scene operations.
pub type Result<T> = std::result::Result<T, Error>;
