/// Zeroth-order spherical harmonics basis constant (l=0, m=0)
pub const SH_C0: f64 = 0.28209479177387814;

/// Colour used when a source carries no usable colour data
pub const DEFAULT_COLOUR: [u8; 3] = [255, 255, 255];

/// Number of entries in a packed-format scalar codebook
pub const CODEBOOK_SIZE: usize = 256;
