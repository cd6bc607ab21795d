//! Edge-based manifold checks.

use std::collections::HashMap;

use crate::mesh::Mesh;

/// Every undirected edge is shared by exactly two faces.
pub fn is_watertight(mesh: &Mesh) -> bool {
    if mesh.is_empty() {
        return false;
    }
    undirected_edge_counts(mesh).values().all(|&n| n == 2)
}

/// No directed edge is used twice, so neighbouring faces agree on
/// orientation.
pub fn is_winding_consistent(mesh: &Mesh) -> bool {
    let mut seen = HashMap::with_capacity(mesh.triangles.len() * 3);
    for t in &mesh.triangles {
        for (a, b) in face_edges(t) {
            if seen.insert((a, b), ()).is_some() {
                return false;
            }
        }
    }
    true
}

pub(crate) fn face_edges(t: &[u32; 3]) -> [(u32, u32); 3] {
    [(t[0], t[1]), (t[1], t[2]), (t[2], t[0])]
}

pub(crate) fn undirected(a: u32, b: u32) -> (u32, u32) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

fn undirected_edge_counts(mesh: &Mesh) -> HashMap<(u32, u32), u32> {
    let mut counts = HashMap::with_capacity(mesh.triangles.len() * 3 / 2);
    for t in &mesh.triangles {
        for (a, b) in face_edges(t) {
            *counts.entry(undirected(a, b)).or_insert(0) += 1;
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_cuboid_is_watertight_and_consistent() {
        let mesh = Mesh::cuboid(1.0, 1.0, 1.0);
        assert!(is_watertight(&mesh));
        assert!(is_winding_consistent(&mesh));
    }

    #[test]
    fn missing_face_breaks_watertightness() {
        let mut mesh = Mesh::cuboid(1.0, 1.0, 1.0);
        mesh.triangles.pop();
        assert!(!is_watertight(&mesh));
        assert!(is_winding_consistent(&mesh));
    }

    #[test]
    fn flipped_face_breaks_winding() {
        let mut mesh = Mesh::cuboid(1.0, 1.0, 1.0);
        mesh.triangles[0].swap(1, 2);
        assert!(is_watertight(&mesh));
        assert!(!is_winding_consistent(&mesh));
    }

    #[test]
    fn empty_mesh_is_not_watertight() {
        assert!(!is_watertight(&Mesh::default()));
    }
}
