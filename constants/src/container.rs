/// GLB file magic ("glTF" little endian)
pub const GLB_MAGIC: u32 = 0x4654_6C67;

/// GLB container version
pub const GLB_VERSION: u32 = 2;

/// JSON chunk type ("JSON")
pub const CHUNK_TYPE_JSON: u32 = 0x4E4F_534A;

/// Binary chunk type ("BIN\0")
pub const CHUNK_TYPE_BIN: u32 = 0x004E_4942;

/// Byte alignment required for buffer views and chunks
pub const BUFFER_ALIGNMENT: usize = 4;

/// Accessor component types
pub const COMPONENT_UNSIGNED_BYTE: u32 = 5121;
pub const COMPONENT_SHORT: u32 = 5122;
pub const COMPONENT_FLOAT: u32 = 5126;

/// Primitive mode for point rendering
pub const MODE_POINTS: u32 = 0;

/// Extension names
pub const KHR_MESH_QUANTIZATION: &str = "KHR_mesh_quantization";
pub const KHR_DRACO_MESH_COMPRESSION: &str = "KHR_draco_mesh_compression";
pub const EXT_MESHOPT_COMPRESSION: &str = "EXT_meshopt_compression";

/// Per-vertex strides used for meshopt attribute streams
pub const MESHOPT_POSITION_STRIDE: usize = 8;
pub const MESHOPT_COLOUR_STRIDE: usize = 4;

/// Magic bytes that open a zip archive
pub const ZIP_MAGIC: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];

/// Upper bound on the buffer reserved up front for an archive entry; the
/// declared size comes from the archive itself
pub const ARCHIVE_PREALLOC_LIMIT: u64 = 1 << 26;
