//! Mesh import: vertex welding, world-space transform and commit into the
//! shared scene arrays.
//!
//! A model is first staged in a [`ModelGeometry`] and only appended to the
//! shared [`GeometryArrays`] once the whole source has parsed, so a failed
//! import leaves the arrays untouched.

use super::obj::{parse_obj, ObjData};
use super::vertex::VertexKey;
use super::{GeometryArrays, Tri};
use crate::bvh::TriBounds;
use crate::util::{Error, Result, Transform, Vec2, Vec3, Vec4};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// What one import appended to the scene arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    /// Vertex-array length before the import; base for this model's indices.
    pub model_offset: u32,
    /// Index of the model's first triangle record.
    pub first_triangle: usize,
    /// Vertices left after welding.
    pub unique_vertices: usize,
    pub triangles: usize,
}

/// Welded, world-space geometry of one model that has not been committed yet.
#[derive(Debug, Default)]
pub struct ModelGeometry {
    /// xyz = world position, w = u
    vertices: Vec<Vec4>,
    /// xyz = world normal, w = v
    normals: Vec<Vec4>,
    /// Local (model-relative) vertex indices, three per triangle.
    indices: Vec<u32>,
    /// Face corners that had no normal.
    missing_normals: usize,
}

impl ModelGeometry {
    /// Weld face corners and transform the unique vertices into world space.
    ///
    /// Welding is scoped to this model: corners with identical position,
    /// normal and uv share one vertex.
    pub fn from_obj(data: &ObjData, transform: &Transform) -> Result<Self> {
        let mut geom = Self {
            vertices: Vec::with_capacity(data.positions.len()),
            normals: Vec::with_capacity(data.positions.len()),
            indices: Vec::with_capacity(data.face_vertex_count()),
            missing_normals: 0,
        };
        let mut unique: HashMap<VertexKey, u32> = HashMap::with_capacity(data.positions.len());

        for corner in data.faces.iter().flatten() {
            let normal = match corner.normal {
                Some(i) => data.normals[i],
                None => {
                    geom.missing_normals += 1;
                    Vec3::ZERO
                }
            };
            let uv = corner.texcoord.map_or(Vec2::ZERO, |i| data.texcoords[i]);
            let key = VertexKey::new(data.positions[corner.position], normal, uv);

            let local = match unique.entry(key) {
                Entry::Occupied(e) => *e.get(),
                Entry::Vacant(e) => {
                    let local = u32::try_from(geom.vertices.len())
                        .map_err(|_| Error::TooManyTriangles(data.faces.len()))?;
                    let p = transform.point(key.position);
                    let n = transform.normal(key.normal);
                    geom.vertices.push(p.extend(key.uv.x));
                    geom.normals.push(n.extend(key.uv.y));
                    *e.insert(local)
                }
            };
            geom.indices.push(local);
        }

        Ok(geom)
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Append this model to the shared arrays.
    ///
    /// All overflow checks run before the first push.
    pub fn commit_into(self, arrays: &mut GeometryArrays, material_idx: u32) -> Result<ImportSummary> {
        let tri_total = arrays.triangles.len() + self.triangle_count();
        // The node pool holds 2N u32-addressed slots.
        if tri_total > (u32::MAX / 2) as usize {
            return Err(Error::TooManyTriangles(tri_total));
        }
        let model_offset = u32::try_from(arrays.vertices.len())
            .ok()
            .filter(|off| off.checked_add(self.vertices.len() as u32).is_some())
            .ok_or(Error::TooManyTriangles(tri_total))?;
        u32::try_from(arrays.indices.len() + self.indices.len())
            .map_err(|_| Error::TooManyTriangles(tri_total))?;

        let summary = ImportSummary {
            model_offset,
            first_triangle: arrays.triangles.len(),
            unique_vertices: self.vertices.len(),
            triangles: self.triangle_count(),
        };

        arrays.triangles.reserve(summary.triangles);
        arrays.bounds.reserve(summary.triangles);
        for tri in self.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| self.vertices[i as usize].truncate());
            arrays.bounds.push(TriBounds::from_corners(a, b, c));
            arrays.triangles.push(Tri::new(
                model_offset,
                arrays.indices.len() as u32,
                material_idx,
                true,
            ));
            arrays.indices.extend_from_slice(tri);
        }
        arrays.vertices.extend(self.vertices);
        arrays.normals.extend(self.normals);

        Ok(summary)
    }
}

/// Import an OBJ file into the shared arrays.
///
/// On error nothing is appended.
#[tracing::instrument(skip_all, fields(path = %path.display(), material = material_idx))]
pub fn import_model(
    path: &Path,
    transform: &Transform,
    material_idx: u32,
    arrays: &mut GeometryArrays,
) -> Result<ImportSummary> {
    let file = File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Error::FileNotFound(path.to_path_buf()),
        _ => Error::parse(path, format!("cannot open: {e}")),
    })?;
    import_obj_buf(BufReader::new(file), path, transform, material_idx, arrays)
}

/// Import OBJ text from any reader. `source` names it in diagnostics.
pub fn import_obj_buf<R: BufRead>(
    reader: R,
    source: &Path,
    transform: &Transform,
    material_idx: u32,
    arrays: &mut GeometryArrays,
) -> Result<ImportSummary> {
    let data = parse_obj(reader, source)?;
    let geometry = ModelGeometry::from_obj(&data, transform)?;
    if geometry.missing_normals > 0 {
        tracing::warn!(
            "{}: {} face corners without normals, using zero normal",
            source.display(),
            geometry.missing_normals
        );
    }
    let summary = geometry.commit_into(arrays, material_idx)?;
    tracing::debug!(
        "imported {}: {} corners -> {} vertices, {} triangles at offset {}",
        source.display(),
        data.face_vertex_count(),
        summary.unique_vertices,
        summary.triangles,
        summary.model_offset
    );
    Ok(summary)
}
