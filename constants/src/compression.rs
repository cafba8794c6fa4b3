/// Name of the external geometry compressor executable
pub const DRACO_ENCODER_BIN: &str = "draco_encoder";

/// Draco compression level (0-10)
pub const DRACO_COMPRESSION_LEVEL: u32 = 7;

/// Draco position quantization bits
pub const DRACO_POSITION_BITS: u32 = 14;

/// Draco colour quantization bits
pub const DRACO_COLOUR_BITS: u32 = 10;
