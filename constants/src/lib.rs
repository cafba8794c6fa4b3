//! Shared constants for point cloud decoding, downsampling and encoding.
pub mod colour;
pub mod compression;
pub mod container;
pub mod coordinate_system;
pub mod estimation;
pub mod quantization;
