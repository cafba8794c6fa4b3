/// Binary glTF (GLB 2.0) document types, buffer layout and chunk framing
use crate::error::{ConverterError, ConverterResult};
use constants::container::{BUFFER_ALIGNMENT, CHUNK_TYPE_BIN, CHUNK_TYPE_JSON, GLB_MAGIC, GLB_VERSION};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const GLB_HEADER_LENGTH: usize = 12;
const CHUNK_HEADER_LENGTH: usize = 8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gltf {
    pub asset: Asset,
    pub scene: usize,
    pub scenes: Vec<Scene>,
    pub nodes: Vec<Node>,
    pub meshes: Vec<Mesh>,
    pub accessors: Vec<Accessor>,
    pub buffer_views: Vec<BufferView>,
    pub buffers: Vec<Buffer>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extensions_used: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extensions_required: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator: Option<String>,
}

impl Default for Asset {
    fn default() -> Self {
        Self {
            version: "2.0".into(),
            generator: Some(concat!("point-cloud-converter ", env!("CARGO_PKG_VERSION")).into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub nodes: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub mesh: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation: Option<[f32; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<[f32; 3]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    pub primitives: Vec<Primitive>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Primitive {
    pub attributes: BTreeMap<String, usize>,
    pub mode: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<PrimitiveExtensions>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimitiveExtensions {
    #[serde(rename = "KHR_draco_mesh_compression")]
    pub draco: DracoPrimitive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DracoPrimitive {
    pub buffer_view: usize,
    /// glTF attribute name to Draco attribute id.
    pub attributes: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Accessor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buffer_view: Option<usize>,
    pub component_type: u32,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub normalized: bool,
    pub count: usize,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extras: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferView {
    pub buffer: usize,
    pub byte_offset: usize,
    pub byte_length: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub byte_stride: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<BufferViewExtensions>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BufferViewExtensions {
    #[serde(rename = "EXT_meshopt_compression")]
    pub meshopt: MeshoptBufferView,
}

/// Where the compressed bytes of a fallback buffer view actually live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshoptBufferView {
    pub buffer: usize,
    pub byte_offset: usize,
    pub byte_length: usize,
    pub byte_stride: usize,
    pub count: usize,
    pub mode: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Buffer {
    pub byte_length: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<BufferExtensions>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BufferExtensions {
    #[serde(rename = "EXT_meshopt_compression")]
    pub meshopt: MeshoptFallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshoptFallback {
    pub fallback: bool,
}

/// Zero bytes needed to bring `length` up to the buffer alignment.
pub fn padding_for(length: usize) -> usize {
    (BUFFER_ALIGNMENT - length % BUFFER_ALIGNMENT) % BUFFER_ALIGNMENT
}

/// Byte range of one buffer view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub offset: usize,
    pub length: usize,
}

impl Region {
    pub fn end(&self) -> usize {
        self.offset + self.length
    }
}

/// One contiguous buffer assembled from aligned, non-overlapping regions.
///
/// Zero padding is inserted before a region whenever the previous one
/// ends off the alignment boundary. Nothing is appended after the last
/// region, so `byte_length` is the sum of region lengths plus the padding
/// between them.
#[derive(Debug, Clone, Default)]
pub struct BinaryBuffer {
    data: Vec<u8>,
    regions: Vec<Region>,
}

impl BinaryBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_region(&mut self, bytes: &[u8]) -> Region {
        let padding = padding_for(self.data.len());
        self.data.resize(self.data.len() + padding, 0);

        let region = Region {
            offset: self.data.len(),
            length: bytes.len(),
        };
        self.data.extend_from_slice(bytes);
        self.regions.push(region);
        region
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn byte_length(&self) -> usize {
        self.data.len()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

fn push_chunk(out: &mut Vec<u8>, chunk_type: u32, payload: &[u8], pad: u8) {
    let padded = payload.len() + padding_for(payload.len());
    out.extend_from_slice(&(padded as u32).to_le_bytes());
    out.extend_from_slice(&chunk_type.to_le_bytes());
    out.extend_from_slice(payload);
    out.resize(out.len() + padded - payload.len(), pad);
}

/// Frame a document and its binary buffer as a GLB file.
pub fn write_glb(document: &Gltf, bin: &[u8]) -> ConverterResult<Vec<u8>> {
    let json = serde_json::to_vec(document)?;

    let json_chunk = CHUNK_HEADER_LENGTH + json.len() + padding_for(json.len());
    let bin_chunk = if bin.is_empty() {
        0
    } else {
        CHUNK_HEADER_LENGTH + bin.len() + padding_for(bin.len())
    };
    let total = GLB_HEADER_LENGTH + json_chunk + bin_chunk;
    let total_u32 = u32::try_from(total).map_err(|_| {
        ConverterError::InvalidArgument(format!("{total} bytes exceeds the GLB size limit"))
    })?;

    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(&GLB_MAGIC.to_le_bytes());
    out.extend_from_slice(&GLB_VERSION.to_le_bytes());
    out.extend_from_slice(&total_u32.to_le_bytes());
    push_chunk(&mut out, CHUNK_TYPE_JSON, &json, b' ');
    if !bin.is_empty() {
        push_chunk(&mut out, CHUNK_TYPE_BIN, bin, 0);
    }

    Ok(out)
}

fn read_u32(data: &[u8], offset: usize) -> ConverterResult<u32> {
    data.get(offset..offset + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(|| ConverterError::Decode(format!("GLB truncated at byte {offset}")))
}

/// Split a GLB file into its document and BIN chunk.
pub fn read_glb(data: &[u8]) -> ConverterResult<(Gltf, Vec<u8>)> {
    if read_u32(data, 0)? != GLB_MAGIC {
        return Err(ConverterError::Decode("not a GLB file".into()));
    }
    let version = read_u32(data, 4)?;
    if version != GLB_VERSION {
        return Err(ConverterError::Decode(format!("unsupported GLB version {version}")));
    }
    let total = read_u32(data, 8)? as usize;
    if total != data.len() {
        return Err(ConverterError::Decode(format!(
            "GLB header declares {total} bytes, file has {}",
            data.len()
        )));
    }

    let mut offset = GLB_HEADER_LENGTH;
    let mut document = None;
    let mut bin = Vec::new();
    while offset + CHUNK_HEADER_LENGTH <= data.len() {
        let length = read_u32(data, offset)? as usize;
        let chunk_type = read_u32(data, offset + 4)?;
        offset += CHUNK_HEADER_LENGTH;

        let payload = data
            .get(offset..offset + length)
            .ok_or_else(|| ConverterError::Decode("GLB chunk overruns the file".into()))?;
        match chunk_type {
            CHUNK_TYPE_JSON => document = Some(serde_json::from_slice(payload)?),
            CHUNK_TYPE_BIN => bin = payload.to_vec(),
            _ => {}
        }
        offset += length;
    }

    let document = document.ok_or_else(|| ConverterError::Decode("GLB has no JSON chunk".into()))?;
    Ok((document, bin))
}
