/// Errors from loading or exporting geometry.
#[derive(Debug, thiserror::Error)]
pub enum GeometryError {
    #[error("Unsupported model format")]
    UnsupportedFormat,

    #[error("Model contains no triangles")]
    Empty,

    #[error("Invalid glTF: {0}")]
    Gltf(String),

    #[error("Invalid STL: {0}")]
    Stl(String),

    #[error("Export failed: {0}")]
    Export(String),
}

impl From<gltf::Error> for GeometryError {
    fn from(e: gltf::Error) -> Self {
        Self::Gltf(e.to_string())
    }
}

impl From<zip::result::ZipError> for GeometryError {
    fn from(e: zip::result::ZipError) -> Self {
        Self::Export(e.to_string())
    }
}
