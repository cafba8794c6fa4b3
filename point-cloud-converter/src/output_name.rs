/// Size strings and generated output file names
use crate::encoder::Compression;
use crate::error::{ConverterError, ConverterResult};
use crate::filter::{FilterCenter, FilterShape};
use std::path::{Path, PathBuf};

/// Parse a size such as `500kb`, `10 MB`, `1gb` or `200b` into bytes.
/// Multiples are binary and a bare number is taken as kilobytes.
pub fn parse_size(input: &str) -> ConverterResult<u64> {
    let normalized = input.trim().to_lowercase();

    let (number, multiplier) = [("kb", 1u64 << 10), ("mb", 1 << 20), ("gb", 1 << 30), ("b", 1)]
        .into_iter()
        .find_map(|(suffix, multiplier)| {
            normalized
                .strip_suffix(suffix)
                .map(|number| (number.trim(), multiplier))
        })
        .unwrap_or((normalized.as_str(), 1 << 10));

    let value: f64 = number
        .parse()
        .map_err(|_| ConverterError::InvalidArgument(format!("invalid size '{input}'")))?;
    if !(value.is_finite() && value >= 0.0) {
        return Err(ConverterError::InvalidArgument(format!("invalid size '{input}'")));
    }

    Ok((value * multiplier as f64) as u64)
}

/// Human readable byte count, e.g. `1.50 MB`.
pub fn format_file_size(bytes: u64) -> String {
    let mut size = bytes as f64;
    for unit in ["B", "KB", "MB", "GB"] {
        if size < 1024.0 {
            return format!("{size:.2} {unit}");
        }
        size /= 1024.0;
    }
    format!("{size:.2} TB")
}

/// The downsampling request as it should appear in a file name.
#[derive(Debug, Clone, PartialEq)]
pub enum TargetLabel {
    Percent(f64),
    /// Size string as typed by the user.
    Size(String),
    Points(usize),
}

/// Parameters encoded into a generated output file name.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputNameParams {
    pub filter: Option<FilterShape>,
    pub filter_radius: Option<f64>,
    pub filter_center: FilterCenter,
    pub target: TargetLabel,
    pub compression: Compression,
    /// Only set when the user asked for quantization, not when meshopt forced it.
    pub quant_explicit: bool,
}

fn percent_label(percent: f64) -> String {
    if percent.fract() == 0.0 {
        format!("_prcnt_{}", percent as i64)
    } else {
        let whole = percent.trunc();
        let tenths = ((percent - whole) * 10.0) as i64;
        format!("_prcnt_{}({tenths})", whole as i64)
    }
}

/// `<stem>[_filter...][_target][_compression][_quant].glb` next to the input.
pub fn generate_output_filename(input: &Path, params: &OutputNameParams) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().trim_end_matches('_').to_string())
        .unwrap_or_default();
    let mut name = stem;

    if let Some(shape) = params.filter {
        name.push_str(match shape {
            FilterShape::Sphere => "_filtersphere",
            FilterShape::Hemisphere { .. } => "_filterhemisphere",
        });
        if let Some(radius) = params.filter_radius {
            name.push_str(&format!("_r{:04}", (radius * 100.0) as i64));
        }
        match params.filter_center {
            FilterCenter::Origin => {}
            FilterCenter::Geometric => name.push_str("_center_geometric"),
            FilterCenter::Custom([x, y, z]) => name.push_str(&format!("_center_{x:.1}_{y:.1}_{z:.1}")),
        }
    }

    match &params.target {
        TargetLabel::Percent(p) => name.push_str(&percent_label(*p)),
        TargetLabel::Size(s) => name.push_str(&format!("_size_{}", s.to_lowercase().replace(' ', ""))),
        TargetLabel::Points(n) => name.push_str(&format!("_pnts_{n}")),
    }

    match params.compression {
        Compression::Draco => name.push_str("_draco"),
        Compression::Meshopt => name.push_str("_meshopt"),
        Compression::None => {}
    }
    if params.quant_explicit {
        name.push_str("_quant");
    }
    name.push_str(".glb");

    input.with_file_name(name)
}
