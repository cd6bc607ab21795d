//! Turns a generated model into a print-ready artifact.
//!
//! Order is fixed: fetch, load, optional repair, scale the largest extent
//! to the target size, center on the plate with the base at Z=0, run the
//! printability checks, export 3MF into the artifact directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use printloop_core::job::{Dimensions, JobUpdate, PrintWarning, WarningCode};
use printloop_core::types::JobId;
use printloop_core::units::estimate_print_minutes_default;
use printloop_geometry::{ExportFormat, GeometryEngine, GeometryError, Mesh};

use crate::fetch::{AssetFetcher, FetchError};

/// Extents below this are treated as zero.
const DEGENERATE_EXTENT: f64 = 1e-9;

/// Smallest feature the printer resolves reliably, in mm.
pub const MIN_FEATURE_MM: f64 = 1.0;

/// Above this the slicer gets slow and detail is wasted.
pub const MAX_TRIANGLES: usize = 500_000;

/// Printable volume in millimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BuildVolume {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Default for BuildVolume {
    /// Bambu Lab P1/X1 series.
    fn default() -> Self {
        Self {
            x: 256.0,
            y: 256.0,
            z: 256.0,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("Target size must be a positive number of millimetres, got {0}")]
    InvalidTargetSize(f64),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Could not load model: {0}")]
    Load(#[source] GeometryError),

    /// Largest extent is effectively zero, so no scale factor exists.
    #[error("Degenerate geometry: model has zero size")]
    DegenerateGeometry,

    #[error("Could not export model: {0}")]
    Export(#[source] GeometryError),

    #[error("Artifact I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Geometry worker failed: {0}")]
    Worker(String),
}

/// Outcome of one conversion, merged into the owning job.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionResult {
    pub dimensions: Dimensions,
    pub triangle_count: usize,
    pub is_watertight: bool,
    pub warnings: Vec<PrintWarning>,
    pub artifact_path: PathBuf,
    pub estimated_print_minutes: u32,
}

impl ConversionResult {
    /// Field updates recording this result on a job.
    pub fn into_update(self) -> JobUpdate {
        JobUpdate {
            artifact_path: Some(self.artifact_path),
            dimensions: Some(self.dimensions),
            triangle_count: Some(self.triangle_count as u64),
            is_watertight: Some(self.is_watertight),
            warnings: Some(self.warnings),
            estimated_print_minutes: Some(self.estimated_print_minutes),
            ..Default::default()
        }
    }
}

/// Geometry after processing, before it is written out.
struct Prepared {
    package: Vec<u8>,
    dimensions: Dimensions,
    triangle_count: usize,
    is_watertight: bool,
    warnings: Vec<PrintWarning>,
    volume_mm3: f64,
}

pub struct ConversionPipeline {
    engine: Arc<dyn GeometryEngine>,
    fetcher: Arc<dyn AssetFetcher>,
    artifact_dir: PathBuf,
    build_volume: BuildVolume,
}

impl ConversionPipeline {
    pub fn new(
        engine: Arc<dyn GeometryEngine>,
        fetcher: Arc<dyn AssetFetcher>,
        artifact_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            engine,
            fetcher,
            artifact_dir: artifact_dir.into(),
            build_volume: BuildVolume::default(),
        }
    }

    pub fn with_build_volume(mut self, build_volume: BuildVolume) -> Self {
        self.build_volume = build_volume;
        self
    }

    pub fn artifact_dir(&self) -> &Path {
        &self.artifact_dir
    }

    /// Convert the model at `model_url` and store `<job_id>.3mf`.
    pub async fn convert(
        &self,
        job_id: JobId,
        model_url: &str,
        target_size_mm: f64,
        auto_repair: bool,
    ) -> Result<ConversionResult, ConversionError> {
        if !(target_size_mm.is_finite() && target_size_mm > 0.0) {
            return Err(ConversionError::InvalidTargetSize(target_size_mm));
        }

        // Removed from disk when this binding drops, on every path out.
        let download = self.fetcher.fetch(model_url).await?;
        let bytes = tokio::fs::read(download.path()).await?;

        let engine = Arc::clone(&self.engine);
        let build_volume = self.build_volume;
        let prepared = tokio::task::spawn_blocking(move || {
            prepare(engine.as_ref(), &bytes, target_size_mm, auto_repair, build_volume)
        })
        .await
        .map_err(|e| ConversionError::Worker(e.to_string()))??;

        tokio::fs::create_dir_all(&self.artifact_dir).await?;
        let artifact_path = self
            .artifact_dir
            .join(format!("{job_id}.{}", ExportFormat::ThreeMf.extension()));
        tokio::fs::write(&artifact_path, &prepared.package).await?;

        let estimated_print_minutes =
            estimate_print_minutes_default(prepared.volume_mm3, prepared.dimensions.height_mm);

        tracing::info!(
            job_id = %job_id,
            width_mm = prepared.dimensions.width_mm,
            depth_mm = prepared.dimensions.depth_mm,
            height_mm = prepared.dimensions.height_mm,
            triangles = prepared.triangle_count,
            watertight = prepared.is_watertight,
            warnings = prepared.warnings.len(),
            artifact = %artifact_path.display(),
            "Model converted",
        );

        Ok(ConversionResult {
            dimensions: prepared.dimensions,
            triangle_count: prepared.triangle_count,
            is_watertight: prepared.is_watertight,
            warnings: prepared.warnings,
            artifact_path,
            estimated_print_minutes,
        })
    }
}

fn prepare(
    engine: &dyn GeometryEngine,
    bytes: &[u8],
    target_size_mm: f64,
    auto_repair: bool,
    build_volume: BuildVolume,
) -> Result<Prepared, ConversionError> {
    let mut mesh = engine.load(bytes).map_err(ConversionError::Load)?;

    if auto_repair {
        engine.repair(&mut mesh);
    }

    scale_to_target(engine, &mut mesh, target_size_mm)?;
    center_on_plate(engine, &mut mesh, build_volume)?;

    let dimensions = dimensions_of(engine, &mesh)?;
    let is_watertight = engine.is_watertight(&mesh);
    let triangle_count = engine.face_count(&mesh);
    let warnings = check_printability(
        &dimensions,
        is_watertight,
        engine.is_winding_consistent(&mesh),
        triangle_count,
        &build_volume,
    );
    let volume_mm3 = engine.volume(&mesh);
    let package = engine
        .export(&mesh, ExportFormat::ThreeMf)
        .map_err(ConversionError::Export)?;

    Ok(Prepared {
        package,
        dimensions,
        triangle_count,
        is_watertight,
        warnings,
        volume_mm3,
    })
}

/// Uniformly scale so the largest extent equals `target_size_mm`.
fn scale_to_target(
    engine: &dyn GeometryEngine,
    mesh: &mut Mesh,
    target_size_mm: f64,
) -> Result<(), ConversionError> {
    let current = engine
        .bounds(mesh)
        .map(|b| b.largest_extent())
        .ok_or(ConversionError::DegenerateGeometry)?;
    if current < DEGENERATE_EXTENT {
        return Err(ConversionError::DegenerateGeometry);
    }
    engine.scale(mesh, target_size_mm / current);
    Ok(())
}

/// Center horizontally on the plate and drop the lowest point to Z=0.
fn center_on_plate(
    engine: &dyn GeometryEngine,
    mesh: &mut Mesh,
    build_volume: BuildVolume,
) -> Result<(), ConversionError> {
    let bounds = engine
        .bounds(mesh)
        .ok_or(ConversionError::DegenerateGeometry)?;
    let center = bounds.center();
    engine.translate(
        mesh,
        [
            build_volume.x / 2.0 - center[0],
            build_volume.y / 2.0 - center[1],
            -bounds.min[2],
        ],
    );
    Ok(())
}

fn dimensions_of(engine: &dyn GeometryEngine, mesh: &Mesh) -> Result<Dimensions, ConversionError> {
    let [width_mm, depth_mm, height_mm] = engine
        .bounds(mesh)
        .ok_or(ConversionError::DegenerateGeometry)?
        .extents();
    Ok(Dimensions {
        width_mm,
        depth_mm,
        height_mm,
    })
}

/// Printability warnings in fixed check order.
pub fn check_printability(
    dimensions: &Dimensions,
    is_watertight: bool,
    winding_consistent: bool,
    triangle_count: usize,
    build_volume: &BuildVolume,
) -> Vec<PrintWarning> {
    let mut warnings = Vec::new();

    if !is_watertight {
        warnings.push(PrintWarning::new(
            WarningCode::NotWatertight,
            "Mesh is not watertight and may have holes",
        ));
    }
    if !winding_consistent {
        warnings.push(PrintWarning::new(
            WarningCode::InconsistentWinding,
            "Inconsistent face winding; normals may be inverted",
        ));
    }

    let thinnest = dimensions.min();
    if thinnest < MIN_FEATURE_MM {
        warnings.push(PrintWarning::new(
            WarningCode::ThinDimension,
            format!("Very thin dimension ({thinnest:.2}mm) may not print well"),
        ));
    }

    let axes = [
        (WarningCode::ExceedsBuildX, "wide", dimensions.width_mm, build_volume.x),
        (WarningCode::ExceedsBuildY, "deep", dimensions.depth_mm, build_volume.y),
        (WarningCode::ExceedsBuildZ, "tall", dimensions.height_mm, build_volume.z),
    ];
    for (code, adjective, size, limit) in axes {
        if size > limit {
            warnings.push(PrintWarning::new(
                code,
                format!("Model too {adjective} ({size:.1}mm > {limit:.0}mm)"),
            ));
        }
    }

    if triangle_count > MAX_TRIANGLES {
        warnings.push(PrintWarning::new(
            WarningCode::HighTriangleCount,
            format!("High triangle count ({triangle_count}); consider simplifying"),
        ));
    }

    warnings
}

/// Remove an artifact that no job refers to any more.
pub(crate) async fn discard_artifact(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!(path = %path.display(), "Artifact removed"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "Could not remove artifact"),
    }
}
