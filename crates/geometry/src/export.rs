//! Serialisation to print-ready formats.

use std::fmt::Write as _;
use std::io::{Cursor, Write};

use stl_io::{Triangle, Vector};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::error::GeometryError;
use crate::mesh::Mesh;

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// 3D Manufacturing Format package, millimetre units.
    ThreeMf,
    /// Binary STL.
    Stl,
}

impl ExportFormat {
    pub const fn extension(self) -> &'static str {
        match self {
            Self::ThreeMf => "3mf",
            Self::Stl => "stl",
        }
    }
}

pub fn export(mesh: &Mesh, format: ExportFormat) -> Result<Vec<u8>, GeometryError> {
    if mesh.is_empty() {
        return Err(GeometryError::Empty);
    }
    match format {
        ExportFormat::ThreeMf => to_3mf(mesh),
        ExportFormat::Stl => to_binary_stl(mesh),
    }
}

// ---------------------------------------------------------------------------
// 3MF
// ---------------------------------------------------------------------------

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
    <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
    <Default Extension="model" ContentType="application/vnd.ms-package.3dmanufacturing-3dmodel+xml"/>
</Types>"#;

const RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
    <Relationship Target="/3D/3dmodel.model" Id="rel-1" Type="http://schemas.microsoft.com/3dmanufacturing/2013/01/3dmodel"/>
</Relationships>"#;

/// Path of the model part inside the package.
pub const MODEL_PATH: &str = "3D/3dmodel.model";

fn to_3mf(mesh: &Mesh) -> Result<Vec<u8>, GeometryError> {
    let mut buffer = Cursor::new(Vec::new());
    let mut zip = ZipWriter::new(&mut buffer);
    let options = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .compression_level(Some(6));

    for (path, body) in [
        ("[Content_Types].xml", CONTENT_TYPES_XML.to_string()),
        ("_rels/.rels", RELS_XML.to_string()),
        (MODEL_PATH, model_xml(mesh)),
    ] {
        zip.start_file(path, options)?;
        zip.write_all(body.as_bytes())
            .map_err(|e| GeometryError::Export(e.to_string()))?;
    }
    zip.finish()?;

    Ok(buffer.into_inner())
}

fn model_xml(mesh: &Mesh) -> String {
    let mut vertices_xml = String::with_capacity(mesh.vertices.len() * 64);
    for [x, y, z] in &mesh.vertices {
        // Writing into a String cannot fail.
        let _ = writeln!(
            vertices_xml,
            "                    <vertex x=\"{x:.6}\" y=\"{y:.6}\" z=\"{z:.6}\"/>"
        );
    }

    let mut triangles_xml = String::with_capacity(mesh.triangles.len() * 48);
    for [v1, v2, v3] in &mesh.triangles {
        let _ = writeln!(
            triangles_xml,
            "                    <triangle v1=\"{v1}\" v2=\"{v2}\" v3=\"{v3}\"/>"
        );
    }

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<model unit="millimeter" xml:lang="en-US" xmlns="http://schemas.microsoft.com/3dmanufacturing/core/2015/02">
    <metadata name="Application">printloop</metadata>
    <resources>
        <object id="1" type="model">
            <mesh>
                <vertices>
{vertices_xml}                </vertices>
                <triangles>
{triangles_xml}                </triangles>
            </mesh>
        </object>
    </resources>
    <build>
        <item objectid="1"/>
    </build>
</model>"#
    )
}

// ---------------------------------------------------------------------------
// STL
// ---------------------------------------------------------------------------

fn to_binary_stl(mesh: &Mesh) -> Result<Vec<u8>, GeometryError> {
    let vector = |v: [f64; 3]| Vector::new([v[0] as f32, v[1] as f32, v[2] as f32]);
    let triangles: Vec<Triangle> = mesh
        .triangles
        .iter()
        .map(|t| Triangle {
            normal: vector(mesh.face_normal(t)),
            vertices: mesh.corners(t).map(vector),
        })
        .collect();

    let mut out = Vec::with_capacity(84 + triangles.len() * 50);
    stl_io::write_stl(&mut out, triangles.iter()).map_err(|e| GeometryError::Export(e.to_string()))?;
    Ok(out)
}
