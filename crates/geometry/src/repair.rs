//! Best-effort mesh repair.
//!
//! Runs in a fixed order: drop degenerate faces, drop duplicate faces,
//! make winding consistent and outward, then fan-fill boundary loops.
//! A step that cannot fully fix the mesh leaves it as good as it got.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::mesh::Mesh;
use crate::topology::{face_edges, undirected};

/// Faces below this area (mm^2) count as degenerate.
const DEGENERATE_AREA: f64 = 1e-12;

/// Holes with more edges than this are left open.
const MAX_HOLE_EDGES: usize = 10_000;

/// What a repair pass changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepairReport {
    pub degenerate_removed: usize,
    pub duplicates_removed: usize,
    pub faces_flipped: usize,
    pub holes_filled: usize,
}

pub fn repair(mesh: &mut Mesh) -> RepairReport {
    let mut report = RepairReport {
        degenerate_removed: remove_degenerate(mesh),
        duplicates_removed: remove_duplicates(mesh),
        ..Default::default()
    };
    report.faces_flipped = orient(mesh);
    report.holes_filled = fill_holes(mesh);
    if report.holes_filled > 0 {
        // Patches follow the loop orientation, but a component that was
        // open may only now have a meaningful volume sign.
        report.faces_flipped += orient(mesh);
    }

    tracing::debug!(
        degenerate = report.degenerate_removed,
        duplicates = report.duplicates_removed,
        flipped = report.faces_flipped,
        holes = report.holes_filled,
        "Mesh repaired"
    );
    report
}

fn remove_degenerate(mesh: &mut Mesh) -> usize {
    let before = mesh.triangles.len();
    let keep: Vec<[u32; 3]> = mesh
        .triangles
        .iter()
        .copied()
        .filter(|t| {
            t[0] != t[1] && t[1] != t[2] && t[0] != t[2] && mesh.face_area(t) > DEGENERATE_AREA
        })
        .collect();
    mesh.triangles = keep;
    before - mesh.triangles.len()
}

fn remove_duplicates(mesh: &mut Mesh) -> usize {
    let before = mesh.triangles.len();
    let mut seen = HashSet::with_capacity(before);
    mesh.triangles.retain(|t| {
        let mut key = *t;
        key.sort_unstable();
        seen.insert(key)
    });
    before - mesh.triangles.len()
}

/// Propagate orientation across shared edges, then flip any component
/// whose signed volume is negative. Returns the number of faces flipped.
fn orient(mesh: &mut Mesh) -> usize {
    let n = mesh.triangles.len();
    let mut by_edge: HashMap<(u32, u32), Vec<usize>> = HashMap::with_capacity(n * 3 / 2);
    for (f, t) in mesh.triangles.iter().enumerate() {
        for (a, b) in face_edges(t) {
            by_edge.entry(undirected(a, b)).or_default().push(f);
        }
    }

    let mut flipped = vec![false; n];
    let mut visited = vec![false; n];

    for seed in 0..n {
        if visited[seed] {
            continue;
        }
        visited[seed] = true;
        let mut component = vec![seed];
        let mut queue = VecDeque::from([seed]);

        while let Some(f) = queue.pop_front() {
            for (a, b) in face_edges(&mesh.triangles[f]) {
                let Some(neighbours) = by_edge.get(&undirected(a, b)) else {
                    continue;
                };
                // Only manifold edges say anything about orientation.
                if neighbours.len() != 2 {
                    continue;
                }
                for &g in neighbours {
                    if g == f || visited[g] {
                        continue;
                    }
                    visited[g] = true;
                    // Consistent neighbours traverse the shared edge b -> a.
                    if face_edges(&mesh.triangles[g]).contains(&(a, b)) {
                        mesh.triangles[g].swap(1, 2);
                        flipped[g] = !flipped[g];
                    }
                    component.push(g);
                    queue.push_back(g);
                }
            }
        }

        let volume = mesh.signed_volume_of(component.iter().map(|&f| &mesh.triangles[f]));
        if volume < 0.0 {
            for &f in &component {
                mesh.triangles[f].swap(1, 2);
                flipped[f] = !flipped[f];
            }
        }
    }

    flipped.iter().filter(|&&x| x).count()
}

/// Close every simple boundary loop with a triangle fan.
fn fill_holes(mesh: &mut Mesh) -> usize {
    let mut counts: HashMap<(u32, u32), u32> = HashMap::new();
    for t in &mesh.triangles {
        for (a, b) in face_edges(t) {
            *counts.entry(undirected(a, b)).or_insert(0) += 1;
        }
    }

    // Boundary half-edge a -> b is walked as b -> a around the hole, so
    // fan triangles come out with matching orientation.
    let mut next: HashMap<u32, Vec<u32>> = HashMap::new();
    for t in &mesh.triangles {
        for (a, b) in face_edges(t) {
            if counts.get(&undirected(a, b)) == Some(&1) {
                next.entry(b).or_default().push(a);
            }
        }
    }

    let mut starts: Vec<u32> = next.keys().copied().collect();
    starts.sort_unstable();

    let mut filled = 0;
    for start in starts {
        let Some(mut loop_vertices) = walk_loop(&mut next, start) else {
            continue;
        };
        if loop_vertices.len() < 3 {
            continue;
        }
        let anchor = loop_vertices.remove(0);
        for pair in loop_vertices.windows(2) {
            mesh.triangles.push([anchor, pair[0], pair[1]]);
        }
        filled += 1;
    }
    filled
}

fn walk_loop(next: &mut HashMap<u32, Vec<u32>>, start: u32) -> Option<Vec<u32>> {
    let mut path = vec![start];
    let mut current = start;
    for _ in 0..MAX_HOLE_EDGES {
        let successors = next.get_mut(&current)?;
        let to = successors.pop()?;
        if successors.is_empty() {
            next.remove(&current);
        }
        if to == start {
            return Some(path);
        }
        path.push(to);
        current = to;
    }
    None
}
