//! Point cloud decimation and GLB/Draco export.
//!
//! Decoders turn `.ply`, `.sog` and `.las`/`.laz` files into a [`PointCloud`],
//! an optional spatial filter trims it, the voxel downsampler reduces it to a
//! point, percentage or byte budget and the encoder writes a GLB scene (plain,
//! quantized, Draco or meshopt) or a raw Draco stream.
pub mod bounds;
pub mod coordinates;
pub mod decoder;
pub mod downsampler;
pub mod encoder;
pub mod error;
pub mod filter;
pub mod output_name;
pub mod point_cloud;

pub use decoder::decode;
pub use downsampler::{DownsampleTarget, SizeModel, downsample, downsample_to_target};
pub use encoder::{Compression, Compressors, EncodeOptions, OutputFormat, encode, export};
pub use error::{ConverterError, ConverterResult};
pub use point_cloud::{Colour, Point, PointCloud};
