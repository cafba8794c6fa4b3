/// Lower bound of the signed 16-bit quantized position range
pub const SHORT_MIN: i32 = -32768;

/// Upper bound of the signed 16-bit quantized position range
pub const SHORT_MAX: i32 = 32767;

/// Number of quantization steps across an axis
pub const SHORT_RANGE: f64 = (SHORT_MAX - SHORT_MIN) as f64;

/// Axes narrower than this are treated as flat and get a unit scale
pub const MIN_AXIS_RANGE: f64 = 1e-6;

/// Largest raw value of a 16-bit coordinate split across two 8-bit rasters
pub const PACKED_COORD_MAX: f64 = 65535.0;
