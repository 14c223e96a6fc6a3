//! One-shot scene construction: materials and models in, BVH-ordered scene out.

use super::{Material, ModelInfo, Scene};
use crate::bvh::build_bvh;
use crate::geom::{import_model, import_obj_buf, GeometryArrays, ImportSummary};
use crate::util::{Error, Mat4, Result, Transform, Vec3};
use std::io::BufRead;
use std::path::{Path, PathBuf};

/// Owns the shared geometry arrays and the material palette while a scene
/// is being assembled.
///
/// ```text
/// add_material* -> add_model* -> build (once)
/// ```
///
/// A model that fails with a content error poisons the builder: every later
/// call returns [`Error::Aborted`], so a partially loaded scene is never built.
#[derive(Debug, Default)]
pub struct SceneBuilder {
    arrays: GeometryArrays,
    materials: Vec<Material>,
    models: Vec<ModelInfo>,
    failed: Option<PathBuf>,
    built: bool,
}

impl SceneBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a material; returns its stable palette index.
    pub fn add_material(&mut self, albedo: Vec3, emission: f32) -> Result<u32> {
        self.check_open()?;
        let index = u32::try_from(self.materials.len())
            .map_err(|_| Error::config("material palette is full"))?;
        self.materials.push(Material::new(albedo, emission));
        Ok(index)
    }

    /// Import an OBJ file with an object-to-world transform.
    pub fn add_model(
        &mut self,
        path: impl AsRef<Path>,
        transform: Mat4,
        material: u32,
    ) -> Result<ImportSummary> {
        let path = path.as_ref();
        let transform = self.prepare_model(transform, material)?;
        let result = import_model(path, &transform, material, &mut self.arrays);
        self.record(path, material, result)
    }

    /// Import OBJ text from a reader; `label` names the source in diagnostics.
    pub fn add_model_source<R: BufRead>(
        &mut self,
        reader: R,
        label: impl AsRef<Path>,
        transform: Mat4,
        material: u32,
    ) -> Result<ImportSummary> {
        let label = label.as_ref();
        let transform = self.prepare_model(transform, material)?;
        let result = import_obj_buf(reader, label, &transform, material, &mut self.arrays);
        self.record(label, material, result)
    }

    /// Build the BVH and reorder the triangle records into leaf order.
    ///
    /// Succeeds at most once; the arrays move into the returned [`Scene`].
    #[tracing::instrument(skip_all, fields(models = self.models.len(), triangles = self.arrays.triangle_count()))]
    pub fn build(&mut self) -> Result<Scene> {
        self.check_open()?;
        let n = self.arrays.triangle_count();
        if n == 0 {
            return Err(Error::EmptyScene);
        }

        let mut perm: Vec<u32> = (0..n as u32).collect();
        let bvh = build_bvh(&self.arrays.bounds, &mut perm)?;
        self.built = true;

        let GeometryArrays {
            vertices,
            normals,
            indices,
            triangles,
            bounds: _,
        } = std::mem::take(&mut self.arrays);
        let triangles = perm.iter().map(|&t| triangles[t as usize]).collect();
        let stats = *bvh.stats();

        Ok(Scene {
            vertices,
            normals,
            indices,
            triangles,
            nodes: bvh.into_nodes(),
            materials: std::mem::take(&mut self.materials),
            models: std::mem::take(&mut self.models),
            stats,
        })
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn models(&self) -> &[ModelInfo] {
        &self.models
    }

    /// Arrays accumulated so far.
    pub fn arrays(&self) -> &GeometryArrays {
        &self.arrays
    }

    pub fn is_built(&self) -> bool {
        self.built
    }

    fn check_open(&self) -> Result<()> {
        if self.built {
            return Err(Error::AlreadyBuilt);
        }
        if let Some(path) = &self.failed {
            return Err(Error::Aborted(path.clone()));
        }
        Ok(())
    }

    /// Precondition checks; nothing is mutated if they fail.
    fn prepare_model(&self, transform: Mat4, material: u32) -> Result<Transform> {
        self.check_open()?;
        if material as usize >= self.materials.len() {
            return Err(Error::UnknownMaterial {
                index: material,
                count: self.materials.len(),
            });
        }
        Transform::new(transform)
    }

    fn record(
        &mut self,
        source: &Path,
        material: u32,
        result: Result<ImportSummary>,
    ) -> Result<ImportSummary> {
        match result {
            Ok(summary) => {
                self.models.push(ModelInfo {
                    source: source.to_path_buf(),
                    material,
                    summary,
                });
                Ok(summary)
            }
            Err(e) => {
                if e.is_content_error() {
                    tracing::error!("{e}");
                    self.failed = Some(source.to_path_buf());
                }
                Err(e)
            }
        }
    }
}
