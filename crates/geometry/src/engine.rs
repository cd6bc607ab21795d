use crate::error::GeometryError;
use crate::export::{self, ExportFormat};
use crate::import;
use crate::mesh::{Aabb, Mesh, Vec3};
use crate::repair::{self, RepairReport};
use crate::topology;

/// Geometry operations the conversion pipeline depends on.
///
/// Implementations are synchronous; callers run them off the async
/// runtime.
pub trait GeometryEngine: Send + Sync {
    fn load(&self, bytes: &[u8]) -> Result<Mesh, GeometryError>;
    fn repair(&self, mesh: &mut Mesh) -> RepairReport;
    fn bounds(&self, mesh: &Mesh) -> Option<Aabb>;
    fn scale(&self, mesh: &mut Mesh, factor: f64);
    fn translate(&self, mesh: &mut Mesh, offset: Vec3);
    fn export(&self, mesh: &Mesh, format: ExportFormat) -> Result<Vec<u8>, GeometryError>;
    fn is_watertight(&self, mesh: &Mesh) -> bool;
    fn is_winding_consistent(&self, mesh: &Mesh) -> bool;
    fn face_count(&self, mesh: &Mesh) -> usize;
    /// Enclosed volume in mm^3. Only meaningful for closed meshes.
    fn volume(&self, mesh: &Mesh) -> f64;
}

/// The in-crate indexed triangle mesh engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct TriMeshEngine;

impl GeometryEngine for TriMeshEngine {
    fn load(&self, bytes: &[u8]) -> Result<Mesh, GeometryError> {
        import::load(bytes)
    }

    fn repair(&self, mesh: &mut Mesh) -> RepairReport {
        repair::repair(mesh)
    }

    fn bounds(&self, mesh: &Mesh) -> Option<Aabb> {
        mesh.bounds()
    }

    fn scale(&self, mesh: &mut Mesh, factor: f64) {
        mesh.scale(factor);
    }

    fn translate(&self, mesh: &mut Mesh, offset: Vec3) {
        mesh.translate(offset);
    }

    fn export(&self, mesh: &Mesh, format: ExportFormat) -> Result<Vec<u8>, GeometryError> {
        export::export(mesh, format)
    }

    fn is_watertight(&self, mesh: &Mesh) -> bool {
        topology::is_watertight(mesh)
    }

    fn is_winding_consistent(&self, mesh: &Mesh) -> bool {
        topology::is_winding_consistent(mesh)
    }

    fn face_count(&self, mesh: &Mesh) -> usize {
        mesh.face_count()
    }

    fn volume(&self, mesh: &Mesh) -> f64 {
        mesh.signed_volume().abs()
    }
}
