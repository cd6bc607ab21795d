//! Model loading: binary glTF (GLB) and STL (binary or ASCII, parsed by
//! `stl_io`).
//!
//! Loaders weld bit-identical positions so that seams split for UVs or
//! normals still share vertices, which the manifold checks rely on.

use std::collections::HashMap;
use std::io::Cursor;

use crate::error::GeometryError;
use crate::mesh::{Mesh, Vec3};

const GLB_MAGIC: &[u8; 4] = b"glTF";
/// 80-byte header plus the triangle count.
const STL_MIN_BINARY_LEN: usize = 84;

type Mat4 = [[f64; 4]; 4];

const IDENTITY: Mat4 = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

/// Sniff the format and load a mesh.
pub fn load(bytes: &[u8]) -> Result<Mesh, GeometryError> {
    let mesh = if bytes.starts_with(GLB_MAGIC) {
        load_glb(bytes)?
    } else if looks_like_stl(bytes) {
        load_stl(bytes)?
    } else {
        return Err(GeometryError::UnsupportedFormat);
    };

    if mesh.is_empty() {
        return Err(GeometryError::Empty);
    }
    tracing::debug!(
        vertices = mesh.vertices.len(),
        triangles = mesh.triangles.len(),
        "Model loaded"
    );
    Ok(mesh)
}

// ---------------------------------------------------------------------------
// Welding
// ---------------------------------------------------------------------------

#[derive(Default)]
struct MeshBuilder {
    mesh: Mesh,
    index: HashMap<[u64; 3], u32>,
}

impl MeshBuilder {
    fn vertex(&mut self, v: Vec3) -> u32 {
        // +0.0 folds -0.0 into 0.0 so both weld together.
        let key = [(v[0] + 0.0).to_bits(), (v[1] + 0.0).to_bits(), (v[2] + 0.0).to_bits()];
        if let Some(&i) = self.index.get(&key) {
            return i;
        }
        let i = self.mesh.vertices.len() as u32;
        self.mesh.vertices.push(v);
        self.index.insert(key, i);
        i
    }

    fn triangle(&mut self, a: Vec3, b: Vec3, c: Vec3) {
        let t = [self.vertex(a), self.vertex(b), self.vertex(c)];
        self.mesh.triangles.push(t);
    }

    fn finish(self) -> Mesh {
        self.mesh
    }
}

// ---------------------------------------------------------------------------
// GLB
// ---------------------------------------------------------------------------

fn load_glb(bytes: &[u8]) -> Result<Mesh, GeometryError> {
    let gltf = gltf::Gltf::from_slice(bytes)?;
    let blob = gltf.blob.as_deref();

    let scene = gltf
        .default_scene()
        .or_else(|| gltf.scenes().next())
        .ok_or_else(|| GeometryError::Gltf("document has no scene".to_string()))?;

    let mut builder = MeshBuilder::default();
    for node in scene.nodes() {
        visit_node(&node, IDENTITY, blob, &mut builder)?;
    }
    Ok(builder.finish())
}

fn visit_node(
    node: &gltf::Node<'_>,
    parent: Mat4,
    blob: Option<&[u8]>,
    builder: &mut MeshBuilder,
) -> Result<(), GeometryError> {
    let local = node.transform().matrix().map(|col| col.map(f64::from));
    let world = mat_mul(&parent, &local);

    if let Some(mesh) = node.mesh() {
        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                tracing::debug!(mode = ?primitive.mode(), "Skipping non-triangle primitive");
                continue;
            }
            let reader = primitive.reader(|buffer| match buffer.source() {
                gltf::buffer::Source::Bin => blob,
                gltf::buffer::Source::Uri(_) => None,
            });
            let positions: Vec<Vec3> = reader
                .read_positions()
                .ok_or_else(|| GeometryError::Gltf("primitive has no positions".to_string()))?
                .map(|p| y_up_to_z_up(transform_point(&world, p.map(f64::from))))
                .collect();
            let indices: Vec<u32> = match reader.read_indices() {
                Some(indices) => indices.into_u32().collect(),
                None => (0..positions.len() as u32).collect(),
            };

            for tri in indices.chunks_exact(3) {
                let fetch = |i: u32| {
                    positions.get(i as usize).copied().ok_or_else(|| {
                        GeometryError::Gltf(format!("index {i} out of range"))
                    })
                };
                builder.triangle(fetch(tri[0])?, fetch(tri[1])?, fetch(tri[2])?);
            }
        }
    }

    for child in node.children() {
        visit_node(&child, world, blob, builder)?;
    }
    Ok(())
}

/// Column-major 4x4 product `a * b`.
fn mat_mul(a: &Mat4, b: &Mat4) -> Mat4 {
    let mut out = [[0.0; 4]; 4];
    for (c, col) in out.iter_mut().enumerate() {
        for (r, cell) in col.iter_mut().enumerate() {
            *cell = (0..4).map(|k| a[k][r] * b[c][k]).sum();
        }
    }
    out
}

fn transform_point(m: &Mat4, p: Vec3) -> Vec3 {
    let mut out = [0.0; 3];
    for (r, cell) in out.iter_mut().enumerate() {
        *cell = m[0][r] * p[0] + m[1][r] * p[1] + m[2][r] * p[2] + m[3][r];
    }
    out
}

/// glTF is Y-up; the build plate is XY with Z up.
fn y_up_to_z_up(p: Vec3) -> Vec3 {
    [p[0], -p[2], p[1]]
}

// ---------------------------------------------------------------------------
// STL
// ---------------------------------------------------------------------------

/// Binary files are at least a header and a triangle count; ASCII files
/// open with `solid`.
fn looks_like_stl(bytes: &[u8]) -> bool {
    let start = bytes.iter().position(|b| !b.is_ascii_whitespace()).unwrap_or(0);
    bytes[start..].starts_with(b"solid") || bytes.len() >= STL_MIN_BINARY_LEN
}

fn load_stl(bytes: &[u8]) -> Result<Mesh, GeometryError> {
    let stl = stl_io::read_stl(&mut Cursor::new(bytes)).map_err(|e| GeometryError::Stl(e.to_string()))?;

    let mut builder = MeshBuilder::default();
    for face in &stl.faces {
        let corner = |i: usize| -> Result<Vec3, GeometryError> {
            let v = stl
                .vertices
                .get(i)
                .ok_or_else(|| GeometryError::Stl(format!("vertex index {i} out of range")))?;
            Ok([f64::from(v[0]), f64::from(v[1]), f64::from(v[2])])
        };
        builder.triangle(corner(face.vertices[0])?, corner(face.vertices[1])?, corner(face.vertices[2])?);
    }
    Ok(builder.finish())
}
