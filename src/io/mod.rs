use memmap2::Mmap;
use std::fs::File;
use std::path::Path;
use thiserror::Error;
use tracing::info;

use crate::core::{PointCloud, PointSource};

pub mod pcd;
pub mod xyz;

pub use pcd::PcdLoader;
pub use xyz::XyzLoader;

/// Errors that can occur while reading or writing point cloud files
#[derive(Error, Debug)]
pub enum IoError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Invalid number format at line {line}: {value}")]
    InvalidNumber { line: usize, value: String },

    #[error("Missing required fields at line {line}")]
    MissingFields { line: usize },

    #[error("Header declares {expected} points but {actual} were read")]
    PointCountMismatch { expected: usize, actual: usize },

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),
}

/// Trait for point cloud file loaders and writers
pub trait PointCloudLoader {
    /// Load a point cloud from a file
    fn load<P: AsRef<Path>>(path: P) -> Result<PointCloud, IoError>;

    /// Write a point cloud to a file
    fn write<P: AsRef<Path>>(cloud: &PointCloud, path: P) -> Result<(), IoError>;
}

/// Load any supported format based on file extension
pub fn load_point_cloud<P: AsRef<Path>>(path: P) -> Result<PointCloud, IoError> {
    let path_ref = path.as_ref();
    let cloud = match extension_of(path_ref)?.as_str() {
        "pcd" => PcdLoader::load(path_ref)?,
        "xyz" | "txt" => XyzLoader::load(path_ref)?,
        other => {
            return Err(IoError::UnsupportedFormat(format!(
                "Unsupported extension: {other}"
            )));
        }
    };

    info!("Loaded {} points from {}", cloud.len(), path_ref.display());
    Ok(cloud)
}

/// Write a point cloud in the format implied by the file extension
pub fn write_point_cloud<P: AsRef<Path>>(cloud: &PointCloud, path: P) -> Result<(), IoError> {
    let path_ref = path.as_ref();
    match extension_of(path_ref)?.as_str() {
        "pcd" => PcdLoader::write(cloud, path_ref),
        "xyz" | "txt" => XyzLoader::write(cloud, path_ref),
        other => Err(IoError::UnsupportedFormat(format!(
            "Unsupported extension: {other}"
        ))),
    }
}

fn extension_of(path: &Path) -> Result<String, IoError> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
        .ok_or_else(|| IoError::UnsupportedFormat("No file extension".to_string()))
}

/// Memory-map `path` and hand its UTF-8 contents to `parse`.
///
/// Zero-length files are passed as an empty string without mapping.
pub(crate) fn parse_mapped<P, T, F>(path: P, parse: F) -> Result<T, IoError>
where
    P: AsRef<Path>,
    F: FnOnce(&str) -> Result<T, IoError>,
{
    let file = File::open(path)?;
    if file.metadata()?.len() == 0 {
        return parse("");
    }

    let mmap = unsafe { Mmap::map(&file)? };
    let content = std::str::from_utf8(&mmap).map_err(|e| IoError::Parse {
        line: 0,
        message: format!("Invalid UTF-8: {e}"),
    })?;

    parse(content)
}

pub(crate) fn parse_f64(token: &str, line: usize) -> Result<f64, IoError> {
    token.parse::<f64>().map_err(|_| IoError::InvalidNumber {
        line,
        value: token.to_string(),
    })
}
