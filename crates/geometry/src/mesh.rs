//! Indexed triangle mesh with millimetre coordinates, Z up.

pub type Vec3 = [f64; 3];

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Width (X), depth (Y), height (Z).
    pub fn extents(&self) -> Vec3 {
        [
            self.max[0] - self.min[0],
            self.max[1] - self.min[1],
            self.max[2] - self.min[2],
        ]
    }

    pub fn largest_extent(&self) -> f64 {
        let [x, y, z] = self.extents();
        x.max(y).max(z)
    }

    pub fn center(&self) -> Vec3 {
        [
            (self.min[0] + self.max[0]) / 2.0,
            (self.min[1] + self.max[1]) / 2.0,
            (self.min[2] + self.max[2]) / 2.0,
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<Vec3>,
    /// Counter-clockwise when viewed from outside.
    pub triangles: Vec<[u32; 3]>,
}

impl Mesh {
    pub fn new(vertices: Vec<Vec3>, triangles: Vec<[u32; 3]>) -> Self {
        Self {
            vertices,
            triangles,
        }
    }

    /// Closed box with one corner at the origin.
    pub fn cuboid(width: f64, depth: f64, height: f64) -> Self {
        let mut vertices = Vec::with_capacity(8);
        for i in 0..8u32 {
            vertices.push([
                if i & 1 != 0 { width } else { 0.0 },
                if i & 2 != 0 { depth } else { 0.0 },
                if i & 4 != 0 { height } else { 0.0 },
            ]);
        }
        let triangles = vec![
            [0, 2, 3],
            [0, 3, 1],
            [4, 5, 7],
            [4, 7, 6],
            [0, 1, 5],
            [0, 5, 4],
            [2, 6, 7],
            [2, 7, 3],
            [0, 4, 6],
            [0, 6, 2],
            [1, 3, 7],
            [1, 7, 5],
        ];
        Self::new(vertices, triangles)
    }

    pub fn face_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Bounds of the vertices referenced by triangles. `None` if empty.
    pub fn bounds(&self) -> Option<Aabb> {
        let mut iter = self
            .triangles
            .iter()
            .flat_map(|t| t.iter())
            .map(|&i| self.vertices[i as usize]);
        let first = iter.next()?;
        let mut aabb = Aabb {
            min: first,
            max: first,
        };
        for v in iter {
            for axis in 0..3 {
                aabb.min[axis] = aabb.min[axis].min(v[axis]);
                aabb.max[axis] = aabb.max[axis].max(v[axis]);
            }
        }
        Some(aabb)
    }

    /// Uniform scale about the origin.
    pub fn scale(&mut self, factor: f64) {
        for v in &mut self.vertices {
            for c in v.iter_mut() {
                *c *= factor;
            }
        }
    }

    pub fn translate(&mut self, offset: Vec3) {
        for v in &mut self.vertices {
            for axis in 0..3 {
                v[axis] += offset[axis];
            }
        }
    }

    /// Signed enclosed volume; positive for outward-facing closed meshes.
    pub fn signed_volume(&self) -> f64 {
        self.signed_volume_of(self.triangles.iter())
    }

    pub(crate) fn signed_volume_of<'a>(&self, tris: impl Iterator<Item = &'a [u32; 3]>) -> f64 {
        tris.map(|t| {
            let [a, b, c] = self.corners(t);
            dot(a, cross(b, c))
        })
        .sum::<f64>()
            / 6.0
    }

    pub(crate) fn corners(&self, t: &[u32; 3]) -> [Vec3; 3] {
        [
            self.vertices[t[0] as usize],
            self.vertices[t[1] as usize],
            self.vertices[t[2] as usize],
        ]
    }

    /// Unit normal of a triangle, or zero for degenerate ones.
    pub fn face_normal(&self, t: &[u32; 3]) -> Vec3 {
        let [a, b, c] = self.corners(t);
        let n = cross(sub(b, a), sub(c, a));
        let len = dot(n, n).sqrt();
        if len <= f64::EPSILON {
            [0.0; 3]
        } else {
            [n[0] / len, n[1] / len, n[2] / len]
        }
    }

    pub(crate) fn face_area(&self, t: &[u32; 3]) -> f64 {
        let [a, b, c] = self.corners(t);
        let n = cross(sub(b, a), sub(c, a));
        dot(n, n).sqrt() / 2.0
    }
}

pub(crate) fn sub(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

pub(crate) fn cross(a: Vec3, b: Vec3) -> Vec3 {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

pub(crate) fn dot(a: Vec3, b: Vec3) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}
