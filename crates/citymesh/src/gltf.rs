//! glTF 2.0 packer: per-material buffers -> document + binary payload.
//!
//! Payload layout, per included material in palette order, each chunk
//! starting on a 4-byte boundary:
//!   positions  f32[3 * n]   (bufferView target ARRAY_BUFFER)
//!   normals    f32[3 * n]   (bufferView target ARRAY_BUFFER)
//!   indices    u32[m]       (bufferView target ELEMENT_ARRAY_BUFFER)
//!
//! GLB layout (little-endian):
//!   00  : [u8;4]  magic = b"glTF"
//!   04  : u32     version = 2
//!   08  : u32     total length (header + chunks)
//!   0C  : u32     JSON chunk length (multiple of 4, space padded)
//!   10  : u32     chunk type "JSON"
//!   ..  : JSON bytes
//!   ..  : u32     BIN chunk length, chunk absent when the payload is empty (multiple of 4, zero padded)
//!   ..  : u32     chunk type "BIN\0"
//!   ..  : payload bytes

use crate::city::City;
use crate::mesh_buffer::MeshAccumulator;
use crate::paths::{file_name_only, replace_extension};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufWriter, ErrorKind, Write};
use std::path::Path;

pub const GLB_MAGIC: [u8; 4] = *b"glTF";
pub const GLB_VERSION: u32 = 2;
pub const GLB_HEADER_LEN: usize = 12;
pub const CHUNK_HEADER_LEN: usize = 8;

/// Chunk type tags, "JSON" and "BIN\0" read as little-endian u32.
pub const CHUNK_JSON: u32 = 0x4E4F_534A;
pub const CHUNK_BIN: u32 = 0x004E_4942;

const COMPONENT_FLOAT: u32 = 5126;
const COMPONENT_UNSIGNED_INT: u32 = 5125;

const TARGET_ARRAY_BUFFER: u32 = 34962;
const TARGET_ELEMENT_ARRAY_BUFFER: u32 = 34963;

const ALIGNMENT: usize = 4;
const JSON_PAD: u8 = b' ';

#[inline]
fn padding_for(len: usize) -> usize {
    (ALIGNMENT - len % ALIGNMENT) % ALIGNMENT
}

/// Which container the glTF scene is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GltfContainer {
    /// `.gltf` JSON plus a sibling `.bin` payload.
    Separate,
    /// Single `.glb` binary container.
    Packed,
}

impl GltfContainer {
    pub fn extension(self) -> &'static str {
        match self {
            GltfContainer::Separate => "gltf",
            GltfContainer::Packed => "glb",
        }
    }
}

/// Growable byte buffer whose appends start on a 4-byte boundary.
#[derive(Debug, Clone, Default)]
pub struct ByteArena {
    bytes: Vec<u8>,
}

impl ByteArena {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Pad with `fill` until the length is a multiple of 4.
    pub fn pad_to_alignment(&mut self, fill: u8) {
        let pad = padding_for(self.bytes.len());
        self.bytes.resize(self.bytes.len() + pad, fill);
    }

    /// Zero-pad to alignment, append `data`, and return the offset it starts at.
    pub fn append_aligned(&mut self, data: &[u8]) -> usize {
        self.pad_to_alignment(0);
        let offset = self.bytes.len();
        self.bytes.extend_from_slice(data);
        offset
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[inline]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

// ---------- Document model ----------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Top-level glTF object. Empty arrays and the scene are left out entirely,
/// as glTF forbids empty arrays.
pub struct Document {
    pub asset: Asset,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scene: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scenes: Vec<Scene>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<Node>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub materials: Vec<MaterialJson>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub meshes: Vec<Mesh>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub accessors: Vec<Accessor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buffer_views: Vec<BufferView>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buffers: Vec<Buffer>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub nodes: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub mesh: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialJson {
    pub name: String,
    pub pbr_metallic_roughness: PbrMetallicRoughness,
    pub double_sided: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PbrMetallicRoughness {
    pub base_color_factor: [f32; 4],
    pub metallic_factor: f32,
    pub roughness_factor: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    pub name: String,
    pub primitives: Vec<Primitive>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Primitive {
    pub attributes: Attributes,
    pub indices: usize,
    pub material: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attributes {
    #[serde(rename = "POSITION")]
    pub position: usize,
    #[serde(rename = "NORMAL")]
    pub normal: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccessorType {
    Scalar,
    Vec3,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Accessor {
    pub buffer_view: usize,
    pub component_type: u32,
    pub count: usize,
    #[serde(rename = "type")]
    pub kind: AccessorType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<[f32; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<[f32; 3]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferView {
    pub buffer: usize,
    pub byte_offset: usize,
    pub byte_length: usize,
    pub target: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Buffer {
    pub byte_length: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

impl Document {
    fn empty() -> Self {
        Self {
            asset: Asset {
                version: "2.0".to_owned(),
                generator: Some("citygen".to_owned()),
            },
            scene: None,
            scenes: Vec::new(),
            nodes: Vec::new(),
            materials: Vec::new(),
            meshes: Vec::new(),
            accessors: Vec::new(),
            buffer_views: Vec::new(),
            buffers: Vec::new(),
        }
    }

    /// Record `bytes` in the arena under a new buffer view and return its index.
    fn push_view(&mut self, arena: &mut ByteArena, bytes: &[u8], target: u32) -> usize {
        let byte_offset = arena.append_aligned(bytes);
        self.buffer_views.push(BufferView {
            buffer: 0,
            byte_offset,
            byte_length: bytes.len(),
            target,
        });
        self.buffer_views.len() - 1
    }

    fn push_accessor(&mut self, accessor: Accessor) -> usize {
        self.accessors.push(accessor);
        self.accessors.len() - 1
    }
}

/// Turn the accumulated buffers into a document and its binary payload.
///
/// `buffer_uri` is the relative name of an external payload file; pass `None`
/// when the payload travels in a GLB BIN chunk.
pub fn build_document(acc: &MeshAccumulator, buffer_uri: Option<String>) -> (Document, Vec<u8>) {
    let mut doc = Document::empty();
    let mut arena = ByteArena::new();

    for (material_index, (material, buf)) in acc.iter().enumerate() {
        let def = material.def();
        let [r, g, b] = def.base_color;

        doc.materials.push(MaterialJson {
            name: material.name().to_owned(),
            pbr_metallic_roughness: PbrMetallicRoughness {
                base_color_factor: [r, g, b, 1.0],
                metallic_factor: def.metallic,
                roughness_factor: def.roughness,
            },
            double_sided: true,
        });

        let vertex_count = buf.vertex_count();
        let bounds = buf.bounds();

        let view = doc.push_view(
            &mut arena,
            bytemuck::cast_slice(buf.positions()),
            TARGET_ARRAY_BUFFER,
        );
        let position = doc.push_accessor(Accessor {
            buffer_view: view,
            component_type: COMPONENT_FLOAT,
            count: vertex_count,
            kind: AccessorType::Vec3,
            min: bounds.map(|b| b.min),
            max: bounds.map(|b| b.max),
        });

        let view = doc.push_view(
            &mut arena,
            bytemuck::cast_slice(buf.normals()),
            TARGET_ARRAY_BUFFER,
        );
        let normal = doc.push_accessor(Accessor {
            buffer_view: view,
            component_type: COMPONENT_FLOAT,
            count: vertex_count,
            kind: AccessorType::Vec3,
            min: None,
            max: None,
        });

        let view = doc.push_view(
            &mut arena,
            bytemuck::cast_slice(buf.indices()),
            TARGET_ELEMENT_ARRAY_BUFFER,
        );
        let indices = doc.push_accessor(Accessor {
            buffer_view: view,
            component_type: COMPONENT_UNSIGNED_INT,
            count: buf.indices().len(),
            kind: AccessorType::Scalar,
            min: None,
            max: None,
        });

        doc.meshes.push(Mesh {
            name: material.name().to_owned(),
            primitives: vec![Primitive {
                attributes: Attributes { position, normal },
                indices,
                material: material_index,
            }],
        });

        let mesh = doc.meshes.len() - 1;
        doc.nodes.push(Node {
            name: Some(material.name().to_owned()),
            mesh,
        });
    }

    if !doc.nodes.is_empty() {
        doc.scenes.push(Scene {
            nodes: (0..doc.nodes.len()).collect(),
        });
        doc.scene = Some(0);
    }

    arena.pad_to_alignment(0);
    let payload = arena.into_bytes();

    // glTF buffers must be at least one byte long.
    if !payload.is_empty() {
        doc.buffers.push(Buffer {
            byte_length: payload.len(),
            uri: buffer_uri,
        });
    }

    (doc, payload)
}

#[inline]
fn write_u32<W: Write>(w: &mut W, v: u32) -> io::Result<()> {
    w.write_all(&v.to_le_bytes())
}

#[inline]
fn chunk_len(len: usize) -> io::Result<u32> {
    u32::try_from(len).map_err(|_| bad("GLB chunk exceeds 4 GiB"))
}

/// Write a GLB container around `json` and `bin`; returns the header's total length.
///
/// An empty `bin` omits the BIN chunk altogether.
pub fn write_glb<W: Write>(w: &mut W, json: &[u8], bin: &[u8]) -> io::Result<u32> {
    let json_pad = padding_for(json.len());
    let bin_pad = padding_for(bin.len());

    let json_len = chunk_len(json.len() + json_pad)?;
    let bin_len = chunk_len(bin.len() + bin_pad)?;
    let bin_chunk = if bin.is_empty() {
        0
    } else {
        CHUNK_HEADER_LEN + bin_len as usize
    };
    let total = chunk_len(GLB_HEADER_LEN + CHUNK_HEADER_LEN + json_len as usize + bin_chunk)?;

    w.write_all(&GLB_MAGIC)?;
    write_u32(w, GLB_VERSION)?;
    write_u32(w, total)?;

    write_u32(w, json_len)?;
    write_u32(w, CHUNK_JSON)?;
    w.write_all(json)?;
    w.write_all(&[JSON_PAD; ALIGNMENT][..json_pad])?;

    if !bin.is_empty() {
        write_u32(w, bin_len)?;
        write_u32(w, CHUNK_BIN)?;
        w.write_all(bin)?;
        w.write_all(&[0u8; ALIGNMENT][..bin_pad])?;
    }

    Ok(total)
}

fn write_separate(path: &Path, acc: &MeshAccumulator) -> io::Result<()> {
    let bin_path = replace_extension(path, "bin");
    let (doc, payload) = build_document(acc, Some(file_name_only(&bin_path)));

    let mut bin = BufWriter::new(File::create(&bin_path)?);
    bin.write_all(&payload)?;
    bin.flush()?;

    let mut out = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut out, &doc)?;
    out.flush()?;

    debug!(
        "Wrote {} + {} ({} meshes, {} payload bytes)",
        path.display(),
        bin_path.display(),
        doc.meshes.len(),
        payload.len()
    );

    Ok(())
}

fn write_packed(path: &Path, acc: &MeshAccumulator) -> io::Result<()> {
    let (doc, payload) = build_document(acc, None);
    let json = serde_json::to_vec(&doc)?;

    let mut out = BufWriter::new(File::create(path)?);
    let total = write_glb(&mut out, &json, &payload)?;
    out.flush()?;

    debug!(
        "Wrote {} ({} meshes, {} bytes)",
        path.display(),
        doc.meshes.len(),
        total
    );

    Ok(())
}

/// Export `city` as a glTF scene at `path`.
///
/// Like [`crate::obj::save_obj`], failures are logged and swallowed; in
/// separate mode the `.bin` file may exist even if the `.gltf` could not be written.
pub fn save_gltf<P: AsRef<Path>>(city: &City, path: P, container: GltfContainer) {
    let path = path.as_ref();
    let acc = MeshAccumulator::from_city(city);

    let result = match container {
        GltfContainer::Separate => write_separate(path, &acc),
        GltfContainer::Packed => write_packed(path, &acc),
    };

    if let Err(err) = result {
        warn!("Cannot write glTF {}: {}", path.display(), err);
    }
}

// ---------- GLB reader ----------

/// Chunks of a parsed GLB container.
#[derive(Debug, Clone, PartialEq)]
pub struct Glb {
    pub version: u32,
    /// JSON chunk including its trailing space padding.
    pub json: Vec<u8>,
    pub bin: Option<Vec<u8>>,
}

impl Glb {
    pub fn document(&self) -> io::Result<Document> {
        Ok(serde_json::from_slice(&self.json)?)
    }
}

#[inline(always)]
fn need(buf: &[u8], want: usize) -> io::Result<()> {
    if buf.len() < want {
        Err(io::Error::new(ErrorKind::UnexpectedEof, "truncated GLB"))
    } else {
        Ok(())
    }
}

#[inline(always)]
fn take<'a>(buf: &mut &'a [u8], n: usize) -> io::Result<&'a [u8]> {
    need(buf, n)?;
    let (head, tail) = buf.split_at(n);
    *buf = tail;
    Ok(head)
}

#[inline(always)]
fn le_u32(buf: &mut &[u8]) -> io::Result<u32> {
    let b = take(buf, 4)?;
    Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

#[cold]
fn bad(msg: &str) -> io::Error {
    io::Error::new(ErrorKind::InvalidData, msg)
}

fn chunk<'a>(p: &mut &'a [u8], expected_type: u32, name: &str) -> io::Result<&'a [u8]> {
    let len = le_u32(p)? as usize;
    if le_u32(p)? != expected_type {
        return Err(bad(&format!("expected {} chunk", name)));
    }
    if len % ALIGNMENT != 0 {
        return Err(bad(&format!("{} chunk length {} is not 4-byte aligned", name, len)));
    }
    take(p, len)
}

/// Parse a GLB container from a contiguous byte slice.
pub fn parse_glb_bytes(bytes: &[u8]) -> io::Result<Glb> {
    let mut p = bytes;

    if take(&mut p, 4)? != GLB_MAGIC {
        return Err(bad("bad GLB magic"));
    }

    let version = le_u32(&mut p)?;
    if version != GLB_VERSION {
        return Err(bad("unsupported GLB version"));
    }

    let total = le_u32(&mut p)? as usize;
    if total != bytes.len() {
        return Err(bad(&format!(
            "GLB header declares {} bytes, found {}",
            total,
            bytes.len()
        )));
    }

    let json = chunk(&mut p, CHUNK_JSON, "JSON")?.to_vec();

    let bin = if p.is_empty() {
        None
    } else {
        Some(chunk(&mut p, CHUNK_BIN, "BIN")?.to_vec())
    };

    if !p.is_empty() {
        return Err(bad("trailing bytes after BIN chunk"));
    }

    Ok(Glb { version, json, bin })
}

/// Fast path: prefer mmap; fall back to a single read.
#[cfg(feature = "mmap")]
pub fn read_glb<P: AsRef<Path>>(path: P) -> io::Result<Glb> {
    let file = File::open(path)?;
    let map = unsafe { memmap2::MmapOptions::new().map(&file)? };
    parse_glb_bytes(&map)
}

#[cfg(not(feature = "mmap"))]
pub fn read_glb<P: AsRef<Path>>(path: P) -> io::Result<Glb> {
    let bytes = std::fs::read(path)?;
    parse_glb_bytes(&bytes)
}
