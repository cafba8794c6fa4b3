/// Packed splat archive reader.
///
/// Positions are stored as 16-bit log-space values split across a low-byte
/// and a high-byte raster, one pixel per point with x/y/z in the RGB
/// channels. Colours are spherical harmonics DC terms stored as per-channel
/// indices into a 256-entry scalar codebook.
use crate::decoder::colour::sh_dc_to_colour;
use crate::decoder::read_archive_entry;
use crate::error::{ConverterError, ConverterResult};
use crate::point_cloud::{Colour, Point, PointCloud};
use constants::colour::CODEBOOK_SIZE;
use constants::quantization::PACKED_COORD_MAX;
use serde::Deserialize;
use std::fs;
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, instrument, warn};
use zip::ZipArchive;
use zip::result::ZipError;

const META_FILE: &str = "meta.json";
const DEFAULT_MEANS_LOW: &str = "means_l.webp";
const DEFAULT_MEANS_HIGH: &str = "means_u.webp";
const DEFAULT_SH0: &str = "sh0.webp";

#[derive(Debug, Clone, Deserialize)]
pub struct SogMetadata {
    pub count: usize,
    pub means: MeansMetadata,
    #[serde(default)]
    pub sh0: Option<Sh0Metadata>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MeansMetadata {
    /// Per-axis lower bound of the log-space coordinates.
    pub mins: [f64; 3],
    /// Per-axis upper bound of the log-space coordinates.
    pub maxs: [f64; 3],
    #[serde(default)]
    pub files: Vec<String>,
}

impl MeansMetadata {
    fn low_file(&self) -> &str {
        self.files.first().map_or(DEFAULT_MEANS_LOW, String::as_str)
    }

    fn high_file(&self) -> &str {
        self.files.get(1).map_or(DEFAULT_MEANS_HIGH, String::as_str)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Sh0Metadata {
    #[serde(default)]
    pub codebook: Vec<f64>,
    #[serde(default)]
    pub files: Vec<String>,
}

impl Sh0Metadata {
    fn file(&self) -> &str {
        self.files.first().map_or(DEFAULT_SH0, String::as_str)
    }
}

/// Inverse of the signed log transform: sign(v) * (exp(|v|) - 1).
pub fn inverse_log_transform(value: f64) -> f64 {
    value.signum() * (value.abs().exp() - 1.0)
}

/// Reconstruct one linear-space coordinate from its low/high raster bytes.
pub fn decode_coordinate(low: u8, high: u8, min: f64, max: f64) -> f64 {
    let raw = low as f64 + high as f64 * 256.0;
    let norm = raw / PACKED_COORD_MAX;
    let log_value = norm * (max - min) + min;
    inverse_log_transform(log_value)
}

#[instrument(skip_all, fields(path = %path.display()))]
pub fn read_sog(path: &Path) -> ConverterResult<PointCloud> {
    let data = fs::read(path)?;
    decode_sog_bytes(data)
}

/// Decode an in-memory packed archive.
pub fn decode_sog_bytes(data: Vec<u8>) -> ConverterResult<PointCloud> {
    let mut archive = ZipArchive::new(Cursor::new(data))?;

    let meta_bytes = read_entry(&mut archive, META_FILE)?
        .ok_or_else(|| ConverterError::Decode(format!("archive is missing {META_FILE}")))?;
    let meta: SogMetadata = serde_json::from_slice(&meta_bytes)?;
    debug!("Packed archive declares {} points", meta.count);
    if meta.count.checked_mul(3).is_none() {
        return Err(ConverterError::Decode(format!(
            "{META_FILE} declares an impossible point count {}",
            meta.count
        )));
    }

    let points = decode_means(&mut archive, &meta)?;
    let colours = decode_colours(&mut archive, &meta);

    PointCloud::new(points, colours)
}

fn read_entry(
    archive: &mut ZipArchive<Cursor<Vec<u8>>>,
    name: &str,
) -> ConverterResult<Option<Vec<u8>>> {
    match archive.by_name(name) {
        Ok(entry) => {
            let size = entry.size();
            Ok(Some(read_archive_entry(entry, size)?))
        }
        Err(ZipError::FileNotFound) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Decode a raster and flatten its first `count` pixels into RGB triples.
fn read_rgb_raster(bytes: &[u8], count: usize, name: &str) -> ConverterResult<Vec<u8>> {
    let rgb = image::load_from_memory(bytes)?.to_rgb8().into_raw();
    let needed = count
        .checked_mul(3)
        .ok_or_else(|| ConverterError::Decode(format!("{name}: point count {count} overflows")))?;
    if rgb.len() < needed {
        return Err(ConverterError::Decode(format!(
            "{name} holds {} pixels, expected at least {count}",
            rgb.len() / 3
        )));
    }
    Ok(rgb[..needed].to_vec())
}

fn decode_means(
    archive: &mut ZipArchive<Cursor<Vec<u8>>>,
    meta: &SogMetadata,
) -> ConverterResult<Vec<Point>> {
    let count = meta.count;
    let means = &meta.means;

    let mut rasters = Vec::with_capacity(2);
    for name in [means.low_file(), means.high_file()] {
        let bytes = read_entry(archive, name)?.ok_or_else(|| {
            ConverterError::Decode(format!("archive is missing geometry raster {name}"))
        })?;
        rasters.push(read_rgb_raster(&bytes, count, name)?);
    }
    let (low, high) = (&rasters[0], &rasters[1]);

    let points = (0..count)
        .map(|i| {
            let mut xyz = [0.0f32; 3];
            for (axis, value) in xyz.iter_mut().enumerate() {
                let idx = i * 3 + axis;
                *value = decode_coordinate(low[idx], high[idx], means.mins[axis], means.maxs[axis]) as f32;
            }
            Point::new(xyz[0], xyz[1], xyz[2])
        })
        .collect();

    Ok(points)
}

/// Colour problems never abort decoding: anything missing or malformed is
/// replaced with white so the output always holds exactly `count` colours.
fn decode_colours(archive: &mut ZipArchive<Cursor<Vec<u8>>>, meta: &SogMetadata) -> Vec<Colour> {
    let count = meta.count;

    let mut colours = match try_decode_colours(archive, meta) {
        Ok(colours) => colours,
        Err(reason) => {
            warn!("Colour data unavailable ({reason}), defaulting to white");
            Vec::new()
        }
    };

    if colours.len() != count {
        if !colours.is_empty() {
            warn!(
                "Decoded {} colours for {} points, padding with white",
                colours.len(),
                count
            );
        }
        colours.resize(count, Colour::default());
    }
    colours
}

fn try_decode_colours(
    archive: &mut ZipArchive<Cursor<Vec<u8>>>,
    meta: &SogMetadata,
) -> Result<Vec<Colour>, String> {
    let sh0 = meta.sh0.as_ref().ok_or("no sh0 metadata")?;
    if sh0.codebook.len() != CODEBOOK_SIZE {
        return Err(format!(
            "codebook has {} entries, expected {CODEBOOK_SIZE}",
            sh0.codebook.len()
        ));
    }

    let bytes = read_entry(archive, sh0.file())
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("missing {}", sh0.file()))?;
    let indices = image::load_from_memory(&bytes)
        .map_err(|e| e.to_string())?
        .to_rgb8()
        .into_raw();

    let available = (indices.len() / 3).min(meta.count);
    let colours = indices[..available * 3]
        .chunks_exact(3)
        .map(|px| {
            sh_dc_to_colour([
                sh0.codebook[px[0] as usize],
                sh0.codebook[px[1] as usize],
                sh0.codebook[px[2] as usize],
            ])
        })
        .collect();

    Ok(colours)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_log_value_maps_to_zero() {
        assert_eq!(inverse_log_transform(0.0), 0.0);
    }

    #[test]
    fn inverse_log_is_odd() {
        let v = inverse_log_transform(2.0);
        assert!((v - (2f64.exp() - 1.0)).abs() < 1e-12);
        assert!((inverse_log_transform(-2.0) + v).abs() < 1e-12);
    }

    #[test]
    fn raw_extremes_map_to_box_corners() {
        // raw 0 -> min, raw 65535 -> max, both before log inversion
        assert!((decode_coordinate(0, 0, -1.0, 3.0) - inverse_log_transform(-1.0)).abs() < 1e-12);
        assert!((decode_coordinate(255, 255, -1.0, 3.0) - inverse_log_transform(3.0)).abs() < 1e-12);
    }

    #[test]
    fn high_byte_is_weighted_by_256() {
        // raw = 1 + 2 * 256 = 513
        let expected = inverse_log_transform(513.0 / 65535.0 * 2.0);
        assert!((decode_coordinate(1, 2, 0.0, 2.0) - expected).abs() < 1e-12);
    }

    #[test]
    fn metadata_defaults_file_names() {
        let meta: SogMetadata = serde_json::from_str(
            r#"{"version": 2, "count": 4, "means": {"mins": [0, 0, 0], "maxs": [1, 1, 1]}}"#,
        )
        .unwrap();
        assert_eq!(meta.means.low_file(), DEFAULT_MEANS_LOW);
        assert_eq!(meta.means.high_file(), DEFAULT_MEANS_HIGH);
        assert!(meta.sh0.is_none());
    }
}
