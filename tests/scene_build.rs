//! Integration tests for importing OBJ files and building scenes.

use gwaphics::bvh::BvhNodeKind;
use gwaphics::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

const QUAD: &str = "\
# unit quad, two triangles sharing an edge
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vn 0 0 1
vt 0 0
vt 1 0
vt 1 1
vt 0 1
f 1/1/1 2/2/1 3/3/1
f 1/1/1 3/3/1 4/4/1
";

fn write_obj(dir: &Path, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, text).expect("Failed to write obj");
    path
}

/// Grid of `n * n` quads in the XY plane, each its own pair of triangles.
fn grid_obj(n: usize) -> String {
    let mut s = String::new();
    for y in 0..n {
        for x in 0..n {
            let (x, y) = (x as f32, y as f32);
            s += &format!("v {} {} 0\nv {} {} 0\nv {} {} 0\nv {} {} 0\n", x, y, x + 1.0, y, x + 1.0, y + 1.0, x, y + 1.0);
        }
    }
    for q in 0..n * n {
        let b = q * 4 + 1;
        s += &format!("f {} {} {}\nf {} {} {}\n", b, b + 1, b + 2, b, b + 2, b + 3);
    }
    s
}

#[test]
fn test_quad_welds_shared_corners() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let quad = write_obj(dir.path(), "quad.obj", QUAD);

    let mut builder = SceneBuilder::new();
    let grey = builder.add_material(Vec3::splat(0.8), 0.0).expect("material");
    let summary = builder.add_model(&quad, Mat4::IDENTITY, grey).expect("import");

    assert_eq!(summary.unique_vertices, 4);
    assert_eq!(summary.triangles, 2);
    assert_eq!(builder.arrays().indices, vec![0, 1, 2, 0, 2, 3]);
    // u rides in position.w, v in normal.w
    assert_eq!(builder.arrays().vertices[2], Vec4::new(1.0, 1.0, 0.0, 1.0));
    assert_eq!(builder.arrays().normals[2], Vec4::new(0.0, 0.0, 1.0, 1.0));
}

#[test]
fn test_same_file_twice_is_not_deduplicated() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let quad = write_obj(dir.path(), "quad.obj", QUAD);

    let mut builder = SceneBuilder::new();
    let grey = builder.add_material(Vec3::splat(0.8), 0.0).expect("material");
    let first = builder.add_model(&quad, Mat4::IDENTITY, grey).expect("first import");
    let second = builder.add_model(&quad, Mat4::IDENTITY, grey).expect("second import");

    assert_eq!(first.model_offset, 0);
    assert_eq!(second.model_offset, 4);
    assert_eq!(builder.arrays().vertex_count(), 8);
    assert_eq!(&builder.arrays().indices[6..], &[0, 1, 2, 0, 2, 3]);

    let scene = builder.build().expect("build");
    assert_eq!(scene.triangle_count(), 4);
    scene.validate().expect("validate");
}

#[test]
fn test_missing_file_aborts_scene() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let quad = write_obj(dir.path(), "quad.obj", QUAD);
    let missing = dir.path().join("nope.obj");

    let mut builder = SceneBuilder::new();
    let grey = builder.add_material(Vec3::splat(0.8), 0.0).expect("material");
    builder.add_model(&quad, Mat4::IDENTITY, grey).expect("import");

    let err = builder.add_model(&missing, Mat4::IDENTITY, grey).unwrap_err();
    assert!(matches!(err, Error::FileNotFound(ref p) if *p == missing));

    // Later models are refused and the scene never builds.
    assert!(matches!(
        builder.add_model(&quad, Mat4::IDENTITY, grey),
        Err(Error::Aborted(_))
    ));
    assert!(matches!(builder.build(), Err(Error::Aborted(ref p)) if *p == missing));
}

#[test]
fn test_quad_face_is_rejected() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let bad = write_obj(dir.path(), "ngon.obj", "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n");

    let mut builder = SceneBuilder::new();
    let grey = builder.add_material(Vec3::splat(0.8), 0.0).expect("material");
    let err = builder.add_model(&bad, Mat4::IDENTITY, grey).unwrap_err();
    assert!(matches!(err, Error::NonTriangularFace { arity: 4, .. }));
    assert_eq!(builder.arrays().triangle_count(), 0);
}

#[test]
fn test_build_reorders_triangles_into_leaves() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let grid = write_obj(dir.path(), "grid.obj", &grid_obj(8));

    let mut builder = SceneBuilder::new();
    let grey = builder.add_material(Vec3::splat(0.8), 0.0).expect("material");
    builder.add_model(&grid, Mat4::IDENTITY, grey).expect("import");
    let before: HashSet<u32> = builder.arrays().triangles.iter().map(|t| t.first_index).collect();

    let scene = builder.build().expect("build");
    let after: HashSet<u32> = scene.triangles().iter().map(|t| t.first_index).collect();
    assert_eq!(scene.triangle_count(), 128);
    assert_eq!(before, after, "triangle records must be a permutation");

    scene.validate().expect("validate");

    let stats = scene.stats();
    assert_eq!(stats.nodes_used as usize, scene.nodes().len());
    assert!(stats.nodes_used as usize <= 2 * scene.triangle_count());
    assert!(stats.leaf_count > 1, "a spread-out grid must be split");

    // Leaves are tagged with a non-zero count; internal nodes point past slot 1.
    let mut covered = 0;
    for node in scene.nodes().iter().take(1).chain(&scene.nodes()[2..]) {
        match node.kind() {
            BvhNodeKind::Leaf { count, .. } => covered += count,
            BvhNodeKind::Internal { left } => assert!(left >= 2),
        }
    }
    assert_eq!(covered as usize, scene.triangle_count());
}

#[test]
fn test_transforms_place_models_in_world_space() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let quad = write_obj(dir.path(), "quad.obj", QUAD);

    let mut builder = SceneBuilder::new();
    let grey = builder.add_material(Vec3::splat(0.8), 0.0).expect("material");
    let light = builder.add_material(Vec3::ONE, 10.0).expect("material");
    builder
        .add_model(&quad, Mat4::from_scale(Vec3::splat(4.0)), grey)
        .expect("floor");
    builder
        .add_model(&quad, Mat4::from_translation(Vec3::new(1.0, 1.0, 5.0)), light)
        .expect("light");

    let scene = builder.build().expect("build");
    let bounds = scene.bounds();
    assert_eq!(bounds.min, Vec3::ZERO);
    assert_eq!(bounds.max, Vec3::new(4.0, 4.0, 5.0));

    let emissive = scene
        .triangles()
        .iter()
        .filter(|t| scene.materials()[t.material_idx as usize].is_emissive())
        .count();
    assert_eq!(emissive, 2);
}

#[test]
fn test_rebuild_is_rejected() {
    let mut builder = SceneBuilder::new();
    let grey = builder.add_material(Vec3::splat(0.8), 0.0).expect("material");
    builder
        .add_model_source(QUAD.as_bytes(), "quad.obj", Mat4::IDENTITY, grey)
        .expect("import");
    builder.build().expect("first build");
    assert!(matches!(builder.build(), Err(Error::AlreadyBuilt)));
}

#[test]
fn test_empty_scene_is_rejected() {
    let mut builder = SceneBuilder::new();
    let grey = builder.add_material(Vec3::splat(0.8), 0.0).expect("material");
    // A file with no faces imports fine but contributes nothing.
    let summary = builder
        .add_model_source("v 0 0 0\nv 1 0 0\n".as_bytes(), "points.obj", Mat4::IDENTITY, grey)
        .expect("import");
    assert_eq!(summary.triangles, 0);
    assert!(matches!(builder.build(), Err(Error::EmptyScene)));
}

#[test]
fn test_gpu_buffer_sizes() {
    let mut builder = SceneBuilder::new();
    let grey = builder.add_material(Vec3::splat(0.8), 0.0).expect("material");
    builder
        .add_model_source(grid_obj(3).as_bytes(), "grid.obj", Mat4::IDENTITY, grey)
        .expect("import");
    let scene = builder.build().expect("build");

    let gpu = scene.gpu_data();
    assert_eq!(gpu.vertices_bytes().len(), scene.vertex_count() * 16);
    assert_eq!(gpu.normals_bytes().len(), scene.vertex_count() * 16);
    assert_eq!(gpu.indices_bytes().len(), 18 * 3 * 4);
    assert_eq!(gpu.triangles_bytes().len(), 18 * 16);
    assert_eq!(gpu.nodes_bytes().len(), scene.nodes().len() * 32);
    assert_eq!(gpu.materials_bytes().len(), 16);
}

#[test]
fn test_latin1_comment_does_not_abort_scene() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("latin1.obj");
    std::fs::write(&path, b"# Cr\xE9e par Blender\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n")
        .expect("Failed to write obj");

    let mut builder = SceneBuilder::new();
    let grey = builder.add_material(Vec3::splat(0.8), 0.0).expect("material");
    let summary = builder.add_model(&path, Mat4::IDENTITY, grey).expect("import");
    assert_eq!(summary.triangles, 1);
    builder.build().expect("build").validate().expect("validate");
}
