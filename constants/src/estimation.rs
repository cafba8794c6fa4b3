/// Calibrated size model constants. These are fitted against real exports,
/// not derived from the container formats, and may be retuned.

/// Fixed overhead of the windowed binary scene container (header + JSON)
pub const GLB_OVERHEAD_BYTES: f64 = 3000.0;

/// Fixed overhead of a raw compressed-geometry stream
pub const DRC_OVERHEAD_BYTES: f64 = 100.0;

/// Float positions (12 bytes) plus RGB colour (3 bytes)
pub const GLB_FLOAT_BYTES_PER_POINT: f64 = 15.0;

/// Quantized SHORT positions (6 bytes) plus RGB colour (3 bytes)
pub const GLB_QUANTIZED_BYTES_PER_POINT: f64 = 9.0;

/// Meshopt-compressed attribute streams
pub const GLB_MESHOPT_BYTES_PER_POINT: f64 = 4.5;

/// Draco-compressed geometry embedded in the scene container
pub const GLB_DRACO_BYTES_PER_POINT: f64 = 5.7;

/// Pure Draco stream
pub const DRC_BYTES_PER_POINT: f64 = 6.5;

/// Refinement passes of the size to count inverse model
pub const SIZE_REFINE_ITERATIONS: usize = 5;

/// Relative tolerance at which size refinement stops
pub const SIZE_REFINE_TOLERANCE: f64 = 0.01;

/// Relative tolerance of the voxel size search
pub const VOXEL_COUNT_TOLERANCE: f64 = 0.05;

/// Bisection steps of the voxel size search
pub const VOXEL_SEARCH_ITERATIONS: usize = 50;
