//! On-disk scene description (JSON).
//!
//! ```json
//! {
//!   "materials": [ { "albedo": [0.8, 0.8, 0.8], "emission": 0.0 } ],
//!   "models": [
//!     { "path": "bunny.obj", "material": 0,
//!       "transform": { "translate": [0, -0.8, 0], "scale": [4, 4, 4] } }
//!   ]
//! }
//! ```

use crate::scene::{Scene, SceneBuilder};
use crate::util::{EulerRot, Error, Mat4, Quat, Result, Vec3};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Materials and models of one scene.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneDescription {
    pub materials: Vec<MaterialEntry>,
    pub models: Vec<ModelEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialEntry {
    pub albedo: [f32; 3],
    pub emission: f32,
}

impl Default for MaterialEntry {
    fn default() -> Self {
        Self {
            albedo: [0.8, 0.8, 0.8],
            emission: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelEntry {
    pub path: PathBuf,
    pub material: u32,
    pub transform: TransformEntry,
    /// Column-major object-to-world matrix; overrides `transform`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matrix: Option<[f32; 16]>,
}

/// Translate / rotate / scale, applied as scale, then rotate, then translate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformEntry {
    pub translate: [f32; 3],
    pub scale: [f32; 3],
    /// Euler angles in degrees, X then Y then Z.
    pub rotate_deg: [f32; 3],
}

impl Default for TransformEntry {
    fn default() -> Self {
        Self {
            translate: [0.0; 3],
            scale: [1.0; 3],
            rotate_deg: [0.0; 3],
        }
    }
}

impl TransformEntry {
    pub fn to_mat4(&self) -> Mat4 {
        let [rx, ry, rz] = self.rotate_deg.map(f32::to_radians);
        Mat4::from_scale_rotation_translation(
            Vec3::from(self.scale),
            Quat::from_euler(EulerRot::XYZ, rx, ry, rz),
            Vec3::from(self.translate),
        )
    }
}

impl ModelEntry {
    /// Object-to-world matrix of this model.
    pub fn transform(&self) -> Mat4 {
        match &self.matrix {
            Some(m) => Mat4::from_cols_array(m),
            None => self.transform.to_mat4(),
        }
    }
}

impl SceneDescription {
    /// Read a description; relative model paths become relative to its directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::FileNotFound(path.to_path_buf()),
            _ => Error::Io(e),
        })?;
        let mut desc = Self::from_json(&text)?;
        if let Some(dir) = path.parent() {
            desc.resolve_paths(dir);
        }
        tracing::debug!(
            "loaded {}: {} materials, {} models",
            path.display(),
            desc.materials.len(),
            desc.models.len()
        );
        Ok(desc)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Prefix relative model paths with `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        for model in &mut self.models {
            if model.path.is_relative() {
                model.path = base.join(&model.path);
            }
        }
    }

    /// Register every material and import every model, in order.
    ///
    /// The first failing model stops the run; its error is returned and the
    /// builder is left poisoned.
    pub fn to_builder(&self) -> Result<SceneBuilder> {
        let mut builder = SceneBuilder::new();
        for m in &self.materials {
            builder.add_material(Vec3::from(m.albedo), m.emission)?;
        }
        for model in &self.models {
            builder.add_model(&model.path, model.transform(), model.material)?;
        }
        Ok(builder)
    }

    pub fn build_scene(&self) -> Result<Scene> {
        self.to_builder()?.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::Vec4;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let desc = SceneDescription::from_json(r#"{ "models": [ { "path": "a.obj" } ] }"#).unwrap();
        assert!(desc.materials.is_empty());
        assert_eq!(desc.models[0].material, 0);
        assert_eq!(desc.models[0].transform, TransformEntry::default());
        assert_eq!(desc.models[0].transform(), Mat4::IDENTITY);

        let m: MaterialEntry = serde_json::from_str(r#"{ "emission": 2.0 }"#).unwrap();
        assert_eq!(m.albedo, [0.8; 3]);
        assert_eq!(m.emission, 2.0);
    }

    #[test]
    fn test_trs_applies_scale_before_translate() {
        let t = TransformEntry {
            translate: [0.0, -0.8, 0.0],
            scale: [4.0, 4.0, 4.0],
            rotate_deg: [0.0; 3],
        };
        let p = t.to_mat4().transform_point3(Vec3::new(0.0, 1.0, 0.0));
        assert!((p - Vec3::new(0.0, 3.2, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_rotation_in_degrees() {
        let t = TransformEntry {
            rotate_deg: [0.0, 0.0, 90.0],
            ..Default::default()
        };
        let p = t.to_mat4().transform_point3(Vec3::X);
        assert!((p - Vec3::Y).length() < 1e-6);
    }

    #[test]
    fn test_matrix_overrides_trs() {
        let mut cols = [0.0f32; 16];
        cols.copy_from_slice(&Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0)).to_cols_array());
        let entry = ModelEntry {
            path: PathBuf::from("a.obj"),
            material: 0,
            transform: TransformEntry {
                scale: [9.0; 3],
                ..Default::default()
            },
            matrix: Some(cols),
        };
        assert_eq!(entry.transform().w_axis, Vec4::new(1.0, 2.0, 3.0, 1.0));
    }

    #[test]
    fn test_relative_paths_resolve_against_base() {
        let mut desc = SceneDescription {
            materials: vec![MaterialEntry::default()],
            models: vec![
                ModelEntry {
                    path: PathBuf::from("mesh/a.obj"),
                    ..Default::default()
                },
                ModelEntry {
                    path: std::env::temp_dir().join("b.obj"),
                    ..Default::default()
                },
            ],
        };
        desc.resolve_paths(Path::new("scenes"));
        assert_eq!(desc.models[0].path, Path::new("scenes").join("mesh/a.obj"));
        assert_eq!(desc.models[1].path, std::env::temp_dir().join("b.obj"));
    }

    #[test]
    fn test_no_models_is_empty_scene() {
        let desc = SceneDescription::default();
        assert!(matches!(desc.build_scene(), Err(Error::EmptyScene)));
    }

    #[test]
    fn test_bad_json() {
        assert!(matches!(
            SceneDescription::from_json("{ \"models\": 3 }"),
            Err(Error::Json(_))
        ));
    }
}
