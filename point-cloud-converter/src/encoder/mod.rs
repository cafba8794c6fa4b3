/// Point cloud encoding into GLB scenes or raw Draco streams
pub mod compressor;
pub mod glb;
pub mod quantize;

pub use compressor::{
    Compressors, DracoEncoderProcess, MeshoptLibrary, PointCloudCompressor, VertexBufferCompressor,
};
pub use quantize::QuantizationFrame;

use crate::bounds::PointCloudBounds;
use crate::coordinates::CoordinateTransform;
use crate::error::{ConverterError, ConverterResult};
use crate::point_cloud::{Colour, Point, PointCloud};
use constants::container::{
    COMPONENT_FLOAT, COMPONENT_SHORT, COMPONENT_UNSIGNED_BYTE, EXT_MESHOPT_COMPRESSION,
    KHR_DRACO_MESH_COMPRESSION, KHR_MESH_QUANTIZATION, MESHOPT_COLOUR_STRIDE,
    MESHOPT_POSITION_STRIDE, MODE_POINTS,
};
use glb::{
    Accessor, Asset, BinaryBuffer, Buffer, BufferExtensions, BufferView, BufferViewExtensions,
    DracoPrimitive, Gltf, Mesh, MeshoptBufferView, MeshoptFallback, Node, Primitive,
    PrimitiveExtensions, Scene, write_glb,
};
use serde_json::json;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Glb,
    Drc,
}

impl OutputFormat {
    pub fn from_path(path: &Path) -> ConverterResult<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "glb" => Ok(Self::Glb),
            "drc" => Ok(Self::Drc),
            _ => Err(ConverterError::UnsupportedFormat { extension }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    #[default]
    None,
    Draco,
    Meshopt,
}

impl Compression {
    /// Combine the two mutually exclusive compression switches.
    pub fn from_flags(draco: bool, meshopt: bool) -> ConverterResult<Self> {
        match (draco, meshopt) {
            (true, true) => Err(ConverterError::InvalidArgument(
                "draco and meshopt compression cannot be combined".into(),
            )),
            (true, false) => Ok(Self::Draco),
            (false, true) => Ok(Self::Meshopt),
            (false, false) => Ok(Self::None),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeOptions {
    pub format: OutputFormat,
    pub compression: Compression,
    /// Store positions as 16-bit fixed point (KHR_mesh_quantization).
    pub quantize: bool,
    pub transform: CoordinateTransform,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            format: OutputFormat::Glb,
            compression: Compression::None,
            quantize: false,
            transform: CoordinateTransform::None,
        }
    }
}

impl EncodeOptions {
    /// Resolve option combinations the encoder cannot honour as given.
    ///
    /// Meshopt needs quantized positions, Draco quantizes on its own, and a
    /// `.drc` output is always a Draco stream.
    pub fn normalized(self) -> ConverterResult<Self> {
        let mut options = self;
        match (options.format, options.compression) {
            (OutputFormat::Drc, Compression::Meshopt) => {
                return Err(ConverterError::InvalidArgument(
                    "meshopt compression requires GLB output".into(),
                ));
            }
            (OutputFormat::Drc, _) => {
                options.compression = Compression::Draco;
                options.quantize = false;
            }
            (OutputFormat::Glb, Compression::Meshopt) if !options.quantize => {
                warn!("Meshopt compression requires quantization, enabling it");
                options.quantize = true;
            }
            (OutputFormat::Glb, Compression::Draco) if options.quantize => {
                warn!("Draco performs its own quantization, disabling KHR_mesh_quantization");
                options.quantize = false;
            }
            _ => {}
        }
        Ok(options)
    }
}

fn float_position_bytes(points: &[Point]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(points.len() * 12);
    for p in points {
        bytes.extend_from_slice(&p.x.to_le_bytes());
        bytes.extend_from_slice(&p.y.to_le_bytes());
        bytes.extend_from_slice(&p.z.to_le_bytes());
    }
    bytes
}

/// SHORT positions, zero-filled up to `stride` bytes per vertex.
fn short_position_bytes(quantized: &[[i16; 3]], stride: usize) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(quantized.len() * stride);
    for q in quantized {
        for component in q {
            bytes.extend_from_slice(&component.to_le_bytes());
        }
        bytes.resize(bytes.len() + stride - 6, 0);
    }
    bytes
}

fn colour_bytes(colours: &[Colour], stride: usize) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(colours.len() * stride);
    for c in colours {
        bytes.extend_from_slice(&[c.r, c.g, c.b]);
        bytes.resize(bytes.len() + stride - 3, 0);
    }
    bytes
}

fn position_accessor(
    buffer_view: Option<usize>,
    component_type: u32,
    count: usize,
    bounds: &PointCloudBounds,
    extras: Option<serde_json::Value>,
) -> Accessor {
    Accessor {
        buffer_view,
        component_type,
        normalized: false,
        count,
        kind: "VEC3".into(),
        min: Some(bounds.min().to_vec()),
        max: Some(bounds.max().to_vec()),
        extras,
    }
}

fn colour_accessor(buffer_view: Option<usize>, count: usize) -> Accessor {
    Accessor {
        buffer_view,
        component_type: COMPONENT_UNSIGNED_BYTE,
        normalized: true,
        count,
        kind: "VEC3".into(),
        min: None,
        max: None,
        extras: None,
    }
}

fn quantization_extras(frame: &QuantizationFrame) -> serde_json::Value {
    json!({
        "quantization": {
            "offset": frame.offset,
            "scale": frame.scale,
        }
    })
}

fn attributes() -> BTreeMap<String, usize> {
    BTreeMap::from([("POSITION".to_string(), 0), ("COLOR_0".to_string(), 1)])
}

/// Single node, single primitive point scene.
fn point_scene(
    node: Node,
    extensions: Option<PrimitiveExtensions>,
    accessors: Vec<Accessor>,
    buffer_views: Vec<BufferView>,
    buffers: Vec<Buffer>,
    extension_names: &[&str],
) -> Gltf {
    let names: Vec<String> = extension_names.iter().map(|s| s.to_string()).collect();
    Gltf {
        asset: Asset::default(),
        scene: 0,
        scenes: vec![Scene { nodes: vec![0] }],
        nodes: vec![node],
        meshes: vec![Mesh {
            primitives: vec![Primitive {
                attributes: attributes(),
                mode: MODE_POINTS,
                extensions,
            }],
        }],
        accessors,
        buffer_views,
        buffers,
        extensions_used: names.clone(),
        extensions_required: names,
    }
}

fn plain_view(offset: usize, length: usize) -> BufferView {
    BufferView {
        buffer: 0,
        byte_offset: offset,
        byte_length: length,
        byte_stride: None,
        extensions: None,
    }
}

fn frame_node(frame: Option<&QuantizationFrame>) -> Node {
    Node {
        mesh: 0,
        translation: frame.map(|f| f.offset),
        scale: frame.map(|f| f.scale),
    }
}

/// Uncompressed GLB with FLOAT or quantized SHORT positions.
fn build_plain_glb(points: &[Point], colours: &[Colour], quantize: bool) -> ConverterResult<Vec<u8>> {
    let count = points.len();
    let bounds = PointCloudBounds::from_points(points);

    let frame = quantize.then(|| QuantizationFrame::from_points(points));
    let (position_bytes, component_type) = match &frame {
        Some(frame) => (short_position_bytes(&frame.quantize_all(points), 6), COMPONENT_SHORT),
        None => (float_position_bytes(points), COMPONENT_FLOAT),
    };

    let mut buffer = BinaryBuffer::new();
    let positions = buffer.push_region(&position_bytes);
    let colours_region = buffer.push_region(&colour_bytes(colours, 3));

    let document = point_scene(
        frame_node(frame.as_ref()),
        None,
        vec![
            position_accessor(Some(0), component_type, count, &bounds, frame.as_ref().map(quantization_extras)),
            colour_accessor(Some(1), count),
        ],
        vec![
            plain_view(positions.offset, positions.length),
            plain_view(colours_region.offset, colours_region.length),
        ],
        vec![Buffer {
            byte_length: buffer.byte_length(),
            extensions: None,
        }],
        if frame.is_some() { &[KHR_MESH_QUANTIZATION] } else { &[] },
    );

    write_glb(&document, &buffer.into_bytes())
}

/// GLB whose only buffer view is a Draco stream.
fn build_draco_glb(points: &[Point], compressed: Vec<u8>) -> ConverterResult<Vec<u8>> {
    let count = points.len();
    let bounds = PointCloudBounds::from_points(points);

    let mut buffer = BinaryBuffer::new();
    let blob = buffer.push_region(&compressed);

    let document = point_scene(
        frame_node(None),
        Some(PrimitiveExtensions {
            draco: DracoPrimitive {
                buffer_view: 0,
                attributes: attributes(),
            },
        }),
        // Accessors describe the decompressed data and have no view.
        vec![
            position_accessor(None, COMPONENT_FLOAT, count, &bounds, None),
            colour_accessor(None, count),
        ],
        vec![plain_view(blob.offset, blob.length)],
        vec![Buffer {
            byte_length: buffer.byte_length(),
            extensions: None,
        }],
        &[KHR_DRACO_MESH_COMPRESSION],
    );

    write_glb(&document, &buffer.into_bytes())
}

/// GLB with quantized positions and colours each compressed as a
/// meshopt attribute stream; buffer 1 is the uncompressed fallback.
fn build_meshopt_glb(
    points: &[Point],
    colours: &[Colour],
    compressor: &dyn VertexBufferCompressor,
) -> ConverterResult<Vec<u8>> {
    let count = points.len();
    let bounds = PointCloudBounds::from_points(points);
    let frame = QuantizationFrame::from_points(points);

    let streams = [
        (short_position_bytes(&frame.quantize_all(points), MESHOPT_POSITION_STRIDE), MESHOPT_POSITION_STRIDE),
        (colour_bytes(colours, MESHOPT_COLOUR_STRIDE), MESHOPT_COLOUR_STRIDE),
    ];

    let mut compressed = BinaryBuffer::new();
    let mut fallback = BinaryBuffer::new();
    let mut buffer_views = Vec::with_capacity(streams.len());
    for (raw, stride) in &streams {
        let encoded = compressor.compress(raw, count, *stride)?;
        debug!("Meshopt stream: {} -> {} bytes", raw.len(), encoded.len());

        let packed = compressed.push_region(&encoded);
        // Only the extent of the fallback matters, its content is never written.
        let target = fallback.push_region(&vec![0; raw.len()]);

        buffer_views.push(BufferView {
            buffer: 1,
            byte_offset: target.offset,
            byte_length: target.length,
            byte_stride: Some(*stride),
            extensions: Some(BufferViewExtensions {
                meshopt: MeshoptBufferView {
                    buffer: 0,
                    byte_offset: packed.offset,
                    byte_length: packed.length,
                    byte_stride: *stride,
                    count,
                    mode: "ATTRIBUTES".into(),
                },
            }),
        });
    }

    let document = point_scene(
        frame_node(Some(&frame)),
        None,
        vec![
            position_accessor(Some(0), COMPONENT_SHORT, count, &bounds, Some(quantization_extras(&frame))),
            colour_accessor(Some(1), count),
        ],
        buffer_views,
        vec![
            Buffer {
                byte_length: compressed.byte_length(),
                extensions: None,
            },
            Buffer {
                byte_length: fallback.byte_length(),
                extensions: Some(BufferExtensions {
                    meshopt: MeshoptFallback { fallback: true },
                }),
            },
        ],
        &[KHR_MESH_QUANTIZATION, EXT_MESHOPT_COMPRESSION],
    );

    write_glb(&document, &compressed.into_bytes())
}

/// Encode a point cloud fully in memory.
#[instrument(skip(cloud, compressors), fields(points = cloud.len()))]
pub fn encode(
    cloud: &PointCloud,
    options: &EncodeOptions,
    compressors: &Compressors,
) -> ConverterResult<Vec<u8>> {
    if cloud.is_empty() {
        return Err(ConverterError::InvalidArgument(
            "cannot encode an empty point cloud".into(),
        ));
    }

    let options = options.normalized()?;
    let points = options.transform.apply(cloud.points());
    let colours = cloud.colours();

    let bytes = match (options.format, options.compression) {
        (OutputFormat::Drc, _) => compressors.point_cloud.compress(&points, colours)?,
        (OutputFormat::Glb, Compression::Draco) => {
            let compressed = compressors.point_cloud.compress(&points, colours)?;
            build_draco_glb(&points, compressed)?
        }
        (OutputFormat::Glb, Compression::Meshopt) => {
            build_meshopt_glb(&points, colours, compressors.vertex_buffer.as_ref())?
        }
        (OutputFormat::Glb, Compression::None) => build_plain_glb(&points, colours, options.quantize)?,
    };

    debug!("Encoded {} points into {} bytes", points.len(), bytes.len());
    Ok(bytes)
}

/// Encode and write to `path`, replacing it atomically. The format follows
/// the path's extension. Returns the number of bytes written.
#[instrument(skip(cloud, options, compressors), fields(path = %path.display()))]
pub fn export(
    cloud: &PointCloud,
    path: &Path,
    options: &EncodeOptions,
    compressors: &Compressors,
) -> ConverterResult<u64> {
    let options = EncodeOptions {
        format: OutputFormat::from_path(path)?,
        ..*options
    };
    let bytes = encode(cloud, &options, compressors)?;

    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut staged = NamedTempFile::new_in(directory)?;
    staged.write_all(&bytes)?;
    staged.flush()?;
    staged.persist(path).map_err(|e| e.error)?;

    info!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(bytes.len() as u64)
}
