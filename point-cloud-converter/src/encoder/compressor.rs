/// External compressors behind small capability traits.
///
/// The encoder only prepares inputs and embeds whatever bytes come back;
/// the geometry compressor runs as a subprocess and the vertex buffer
/// compressor is the meshoptimizer library (behind the `meshopt` feature).
use crate::error::{ConverterError, ConverterResult};
use crate::point_cloud::{Colour, Point};
use constants::compression::{
    DRACO_COLOUR_BITS, DRACO_COMPRESSION_LEVEL, DRACO_ENCODER_BIN, DRACO_POSITION_BITS,
};
use std::fs;
use std::io::{self, BufWriter, ErrorKind, Write};
use std::path::PathBuf;
use std::process::Command;
use tracing::{debug, instrument};

const MESHOPT_TOOL: &str = "meshoptimizer";

/// Compresses a whole point cloud into an opaque geometry stream.
pub trait PointCloudCompressor: Send + Sync {
    fn compress(&self, points: &[Point], colours: &[Colour]) -> ConverterResult<Vec<u8>>;
}

/// Compresses one interleaved vertex attribute stream.
pub trait VertexBufferCompressor: Send + Sync {
    fn compress(&self, vertices: &[u8], count: usize, stride: usize) -> ConverterResult<Vec<u8>>;
}

/// Runs `draco_encoder` on a staged PLY file.
#[derive(Debug, Clone)]
pub struct DracoEncoderProcess {
    pub binary: PathBuf,
    pub compression_level: u32,
    pub position_bits: u32,
    pub colour_bits: u32,
}

impl Default for DracoEncoderProcess {
    fn default() -> Self {
        Self {
            binary: PathBuf::from(DRACO_ENCODER_BIN),
            compression_level: DRACO_COMPRESSION_LEVEL,
            position_bits: DRACO_POSITION_BITS,
            colour_bits: DRACO_COLOUR_BITS,
        }
    }
}

/// Binary little-endian PLY with float positions and uchar colours.
pub fn write_staging_ply<W: Write>(
    writer: &mut W,
    points: &[Point],
    colours: &[Colour],
) -> io::Result<()> {
    writeln!(writer, "ply")?;
    writeln!(writer, "format binary_little_endian 1.0")?;
    writeln!(writer, "element vertex {}", points.len())?;
    writeln!(writer, "property float x")?;
    writeln!(writer, "property float y")?;
    writeln!(writer, "property float z")?;
    writeln!(writer, "property uchar red")?;
    writeln!(writer, "property uchar green")?;
    writeln!(writer, "property uchar blue")?;
    writeln!(writer, "end_header")?;

    for (point, colour) in points.iter().zip(colours) {
        writer.write_all(&point.x.to_le_bytes())?;
        writer.write_all(&point.y.to_le_bytes())?;
        writer.write_all(&point.z.to_le_bytes())?;
        writer.write_all(&[colour.r, colour.g, colour.b])?;
    }
    Ok(())
}

impl PointCloudCompressor for DracoEncoderProcess {
    #[instrument(skip_all, fields(points = points.len()))]
    fn compress(&self, points: &[Point], colours: &[Colour]) -> ConverterResult<Vec<u8>> {
        // Both files are removed when they drop, whichever way this returns.
        let staged = tempfile::Builder::new().suffix(".ply").tempfile()?;
        let encoded = tempfile::Builder::new().suffix(".drc").tempfile()?;

        {
            let mut writer = BufWriter::new(staged.as_file());
            write_staging_ply(&mut writer, points, colours)?;
            writer.flush()?;
        }

        debug!("Running {} on {}", self.binary.display(), staged.path().display());
        let output = Command::new(&self.binary)
            .arg("-i")
            .arg(staged.path())
            .arg("-o")
            .arg(encoded.path())
            .args(["-cl", &self.compression_level.to_string()])
            .args(["-qp", &self.position_bits.to_string()])
            .args(["-qc", &self.colour_bits.to_string()])
            .arg("-point_cloud")
            .output();

        let output = match output {
            Ok(output) => output,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ConverterError::EncodingDependency {
                    tool: DRACO_ENCODER_BIN,
                    hint: format!(
                        "'{}' was not found on PATH; install the Draco tools (e.g. `brew install draco`)",
                        self.binary.display()
                    ),
                });
            }
            Err(e) => return Err(e.into()),
        };

        if !output.status.success() {
            return Err(ConverterError::EncodingFailure {
                tool: DRACO_ENCODER_BIN,
                message: format!(
                    "{} ({})",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        let compressed = fs::read(encoded.path())?;
        debug!("Draco stream is {} bytes", compressed.len());
        Ok(compressed)
    }
}

/// meshoptimizer vertex codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeshoptLibrary;

impl VertexBufferCompressor for MeshoptLibrary {
    #[cfg(feature = "meshopt")]
    fn compress(&self, vertices: &[u8], count: usize, stride: usize) -> ConverterResult<Vec<u8>> {
        use meshopt::encode_vertex_buffer;

        if vertices.len() != count * stride {
            return Err(ConverterError::InvalidArgument(format!(
                "vertex buffer holds {} bytes, expected {count} x {stride}",
                vertices.len()
            )));
        }

        let failure = |e: meshopt::Error| ConverterError::EncodingFailure {
            tool: MESHOPT_TOOL,
            message: format!("{e:?}"),
        };

        // The codec takes the vertex size from the element type.
        match stride {
            4 => {
                let typed: Vec<[u8; 4]> = vertices
                    .chunks_exact(4)
                    .map(|c| [c[0], c[1], c[2], c[3]])
                    .collect();
                encode_vertex_buffer(&typed).map_err(failure)
            }
            8 => {
                let typed: Vec<[u8; 8]> = vertices
                    .chunks_exact(8)
                    .map(|c| [c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]])
                    .collect();
                encode_vertex_buffer(&typed).map_err(failure)
            }
            other => Err(ConverterError::InvalidArgument(format!(
                "unsupported vertex stride {other}"
            ))),
        }
    }

    #[cfg(not(feature = "meshopt"))]
    fn compress(&self, _vertices: &[u8], _count: usize, _stride: usize) -> ConverterResult<Vec<u8>> {
        Err(ConverterError::EncodingDependency {
            tool: MESHOPT_TOOL,
            hint: "rebuild with `--features meshopt` to enable meshopt compression".into(),
        })
    }
}

/// The compressors an encode may delegate to.
pub struct Compressors {
    pub point_cloud: Box<dyn PointCloudCompressor>,
    pub vertex_buffer: Box<dyn VertexBufferCompressor>,
}

impl Default for Compressors {
    fn default() -> Self {
        Self {
            point_cloud: Box::new(DracoEncoderProcess::default()),
            vertex_buffer: Box::new(MeshoptLibrary),
        }
    }
}
