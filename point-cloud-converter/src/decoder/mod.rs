//! Source format decoders producing the canonical point cloud.

pub mod colour;
pub mod las;
pub mod ply;
pub mod sog;

use crate::error::{ConverterError, ConverterResult};
use crate::point_cloud::PointCloud;
use constants::container::ARCHIVE_PREALLOC_LIMIT;
use std::io::Read;
use std::path::Path;
use tracing::{info, instrument};

/// Input formats recognised by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    /// Column-major PLY, optionally inside a single-entry zip archive
    Ply,
    /// Packed splat archive with raster-encoded positions and colours
    Sog,
    /// LAS or LAZ survey data
    Las,
}

impl InputFormat {
    pub fn from_path(path: &Path) -> ConverterResult<Self> {
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "ply" => Ok(Self::Ply),
            "sog" => Ok(Self::Sog),
            "las" | "laz" => Ok(Self::Las),
            _ => Err(ConverterError::UnsupportedFormat { extension }),
        }
    }
}

/// Read a point cloud file, dispatching on its extension.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn decode(path: &Path) -> ConverterResult<PointCloud> {
    let format = InputFormat::from_path(path)?;

    let cloud = match format {
        InputFormat::Ply => ply::read_ply(path)?,
        InputFormat::Sog => sog::read_sog(path)?,
        InputFormat::Las => las::read_las(path)?,
    };

    info!("Decoded {} points from {:?} source", cloud.len(), format);
    Ok(cloud)
}

/// Read an archive entry whose header claims `declared_size` bytes. The
/// claim only sizes the initial reservation, capped at
/// `ARCHIVE_PREALLOC_LIMIT`.
pub(crate) fn read_archive_entry<R: Read>(
    mut entry: R,
    declared_size: u64,
) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(declared_size.min(ARCHIVE_PREALLOC_LIMIT) as usize);
    entry.read_to_end(&mut buf)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_entry_size_claim_does_not_drive_allocation() {
        let buf = read_archive_entry(&b"abc"[..], u64::MAX).unwrap();
        assert_eq!(buf, b"abc");
        assert!(buf.capacity() as u64 <= ARCHIVE_PREALLOC_LIMIT);
    }

    #[test]
    fn detects_formats_case_insensitively() {
        assert_eq!(InputFormat::from_path(Path::new("a/b.PLY")).unwrap(), InputFormat::Ply);
        assert_eq!(InputFormat::from_path(Path::new("scan.sog")).unwrap(), InputFormat::Sog);
        assert_eq!(InputFormat::from_path(Path::new("scan.laz")).unwrap(), InputFormat::Las);
    }

    #[test]
    fn rejects_unknown_extension_before_reading() {
        let err = decode(Path::new("does/not/exist.xyz")).unwrap_err();
        assert!(matches!(err, ConverterError::UnsupportedFormat { ref extension } if extension == "xyz"));
    }
}
