/// PLY point cloud reader, transparently unwrapping single-entry zip archives
use crate::decoder::colour::sh_dc_to_colour;
use crate::decoder::read_archive_entry;
use crate::error::{ConverterError, ConverterResult};
use crate::point_cloud::{Colour, Point, PointCloud};
use constants::container::ZIP_MAGIC;
use ply_rs::parser::Parser;
use ply_rs::ply::{DefaultElement, ElementDef, Property, PropertyAccess};
use std::fs;
use std::io::{BufReader, Cursor};
use std::path::Path;
use tracing::{debug, instrument, warn};
use zip::ZipArchive;

/// Vertex record carrying every property the converter understands.
#[derive(Debug, Clone, Default)]
struct PlyVertex {
    position: [f32; 3],
    rgb: [u8; 3],
    sh_dc: [f64; 3],
}

impl PropertyAccess for PlyVertex {
    fn new() -> Self {
        PlyVertex::default()
    }

    fn set_property(&mut self, key: String, property: Property) {
        match key.as_ref() {
            "x" => self.position[0] = property_as_f64(&property).unwrap_or(0.0) as f32,
            "y" => self.position[1] = property_as_f64(&property).unwrap_or(0.0) as f32,
            "z" => self.position[2] = property_as_f64(&property).unwrap_or(0.0) as f32,
            "red" => self.rgb[0] = property_as_colour(&property),
            "green" => self.rgb[1] = property_as_colour(&property),
            "blue" => self.rgb[2] = property_as_colour(&property),
            "f_dc_0" => self.sh_dc[0] = property_as_f64(&property).unwrap_or(0.0),
            "f_dc_1" => self.sh_dc[1] = property_as_f64(&property).unwrap_or(0.0),
            "f_dc_2" => self.sh_dc[2] = property_as_f64(&property).unwrap_or(0.0),
            // Splat attributes (opacity, scale, rotation, higher SH bands) are not needed.
            _ => {}
        }
    }
}

fn property_as_f64(property: &Property) -> Option<f64> {
    match *property {
        Property::Char(v) => Some(v as f64),
        Property::UChar(v) => Some(v as f64),
        Property::Short(v) => Some(v as f64),
        Property::UShort(v) => Some(v as f64),
        Property::Int(v) => Some(v as f64),
        Property::UInt(v) => Some(v as f64),
        Property::Float(v) => Some(v as f64),
        Property::Double(v) => Some(v),
        _ => None,
    }
}

/// Colour channels are stored as uchar in practice; wider integer types are
/// scaled down and float channels are treated as normalised [0, 1].
fn property_as_colour(property: &Property) -> u8 {
    match *property {
        Property::UChar(v) => v,
        Property::UShort(v) => (v >> 8) as u8,
        Property::Float(v) => (v as f64 * 255.0).round().clamp(0.0, 255.0) as u8,
        Property::Double(v) => (v * 255.0).round().clamp(0.0, 255.0) as u8,
        ref other => property_as_f64(other).unwrap_or(255.0).clamp(0.0, 255.0) as u8,
    }
}

/// Colour source selected from the vertex element's declared properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColourSource {
    Rgb,
    SphericalHarmonics,
    Missing,
}

impl ColourSource {
    fn detect(element: &ElementDef) -> Self {
        let has = |name: &str| element.properties.contains_key(name);
        if has("red") && has("green") && has("blue") {
            ColourSource::Rgb
        } else if has("f_dc_0") && has("f_dc_1") && has("f_dc_2") {
            ColourSource::SphericalHarmonics
        } else {
            ColourSource::Missing
        }
    }
}

/// Read a PLY file (or a zip archive holding one) into a point cloud.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn read_ply(path: &Path) -> ConverterResult<PointCloud> {
    let data = fs::read(path)?;
    decode_ply_bytes(data)
}

/// Decode PLY bytes, unwrapping a zip container first when present.
pub fn decode_ply_bytes(data: Vec<u8>) -> ConverterResult<PointCloud> {
    let payload = if data.starts_with(&ZIP_MAGIC) {
        extract_ply_from_archive(data)?
    } else {
        data
    };
    parse_ply(payload)
}

fn extract_ply_from_archive(data: Vec<u8>) -> ConverterResult<Vec<u8>> {
    let mut archive = ZipArchive::new(Cursor::new(data))?;

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        if entry.is_file() && entry.name().to_lowercase().ends_with(".ply") {
            debug!("Unwrapping {} from archive", entry.name());
            let size = entry.size();
            return Ok(read_archive_entry(&mut entry, size)?);
        }
    }

    Err(ConverterError::Decode(
        "archive does not contain a .ply payload".into(),
    ))
}

fn parse_ply(payload: Vec<u8>) -> ConverterResult<PointCloud> {
    let mut reader = BufReader::new(Cursor::new(payload));
    let vertex_parser = Parser::<PlyVertex>::new();
    let skip_parser = Parser::<DefaultElement>::new();

    let header = vertex_parser
        .read_header(&mut reader)
        .map_err(|e| ConverterError::Decode(format!("failed to read PLY header: {e}")))?;

    // Elements are stored back to back, so anything before the vertex
    // element has to be consumed before the vertices can be read.
    for element in header.elements.values() {
        if element.name != "vertex" {
            skip_parser
                .read_payload_for_element(&mut reader, element, &header)
                .map_err(|e| {
                    ConverterError::Decode(format!("failed to read PLY element '{}': {e}", element.name))
                })?;
            continue;
        }

        if let Some(axis) = ["x", "y", "z"]
            .into_iter()
            .find(|axis| !element.properties.contains_key(*axis))
        {
            return Err(ConverterError::Decode(format!(
                "PLY vertex element has no '{axis}' property"
            )));
        }

        let source = ColourSource::detect(element);
        let vertices = vertex_parser
            .read_payload_for_element(&mut reader, element, &header)
            .map_err(|e| ConverterError::Decode(format!("failed to read PLY vertices: {e}")))?;

        return into_point_cloud(vertices, source);
    }

    Err(ConverterError::Decode("PLY file has no vertex element".into()))
}

fn into_point_cloud(vertices: Vec<PlyVertex>, source: ColourSource) -> ConverterResult<PointCloud> {
    let points: Vec<Point> = vertices
        .iter()
        .map(|v| Point::new(v.position[0], v.position[1], v.position[2]))
        .collect();

    match source {
        ColourSource::Rgb => {
            let colours = vertices
                .iter()
                .map(|v| Colour::new(v.rgb[0], v.rgb[1], v.rgb[2]))
                .collect();
            PointCloud::new(points, colours)
        }
        ColourSource::SphericalHarmonics => {
            debug!("Deriving colours from spherical harmonics DC terms");
            let colours = vertices.iter().map(|v| sh_dc_to_colour(v.sh_dc)).collect();
            PointCloud::new(points, colours)
        }
        ColourSource::Missing => {
            warn!("PLY has no colour data, defaulting to white");
            Ok(PointCloud::with_default_colour(points))
        }
    }
}
