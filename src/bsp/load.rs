// Copyright © 2018 Cormac O'Brien
//
// Permission is hereby granted, free of charge, to any person obtaining a copy of this software
// and associated documentation files (the "Software"), to deal in the Software without
// restriction, including without limitation the rights to use, copy, modify, merge, publish,
// distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the
// Software is furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all copies or
// substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING
// BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
// NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM,
// DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! The IBSP v0x2E binary loader — `SPEC_FULL.md` §4.A.
//!
//! Reads the 17-entry lump directory and each lump in turn, classifies shaders, and expands
//! Bézier patches into the global vertex array before handing back a finished [`BspData`]. Lump
//! order in the directory does not constrain read order here: every lump is located by its own
//! `(offset, size)` pair, so cross-referenced lumps (shaders before brushes, planes before nodes)
//! can be read in whichever order is convenient.
//!
//! Cross-array references (a brush's shader index, a face's lightmap index) are *not*
//! exhaustively validated here; the runtime accessors in [`crate::bsp`], [`super::render`], and
//! [`super::collide`] clamp or skip out-of-range references themselves, so re-checking the same
//! thing at load time would be redundant. What this loader does reject outright is anything that
//! would make an offset/count unsafe to use as an array index at all (a negative count, a lump
//! that overruns the file).

use std::io::{Read, Seek, SeekFrom};

use byteorder::{LittleEndian, ReadBytesExt};
use cgmath::Vector3;
use log::{debug, trace, warn};
use num::FromPrimitive;
use num_derive::FromPrimitive;

use crate::bsp::visibility::VisData;
use crate::bsp::{
    bezier, BspBoundsInt, BspBrush, BspBrushSide, BspData, BspEffect, BspFace, BspFaceKind,
    BspLeaf, BspLightmap, BspModel, BspNode, BspVertex, ContentsFlags, LightVol, Shader,
    SurfaceFlags, LIGHTMAP_SIZE,
};
use crate::config::LoadConfig;
use crate::error::{LoadError, LoadErrorKind};
use crate::math::{Aabb, Hyperplane};

const MAGIC: &[u8; 4] = b"IBSP";
const VERSION: i32 = 0x2E;
const LUMP_COUNT: usize = 17;

const SHADER_RECORD_SIZE: usize = 72;
const PLANE_RECORD_SIZE: usize = 16;
const NODE_RECORD_SIZE: usize = 36;
const LEAF_RECORD_SIZE: usize = 48;
const LEAF_FACE_RECORD_SIZE: usize = 4;
const LEAF_BRUSH_RECORD_SIZE: usize = 4;
const MODEL_RECORD_SIZE: usize = 40;
const BRUSH_RECORD_SIZE: usize = 12;
const BRUSH_SIDE_RECORD_SIZE: usize = 8;
const VERTEX_RECORD_SIZE: usize = 44;
const MESH_INDEX_RECORD_SIZE: usize = 4;
const EFFECT_RECORD_SIZE: usize = 72;
const FACE_RECORD_SIZE: usize = 104;
const LIGHTMAP_RECORD_SIZE: usize = LIGHTMAP_SIZE * LIGHTMAP_SIZE * 3;
const LIGHTVOL_RECORD_SIZE: usize = 8;
const VISDATA_HEADER_SIZE: usize = 8;

#[derive(Debug, Clone, Copy, FromPrimitive)]
enum LumpId {
    Entities = 0,
    Shaders = 1,
    Planes = 2,
    Nodes = 3,
    Leafs = 4,
    LeafFaces = 5,
    LeafBrushes = 6,
    Models = 7,
    Brushes = 8,
    BrushSides = 9,
    Vertices = 10,
    MeshIndices = 11,
    Effects = 12,
    Faces = 13,
    Lightmaps = 14,
    LightVols = 15,
    VisData = 16,
}

const LUMP_NAMES: [&str; LUMP_COUNT] = [
    "Entities",
    "Shaders",
    "Planes",
    "Nodes",
    "Leafs",
    "LeafFaces",
    "LeafBrushes",
    "Models",
    "Brushes",
    "BrushSides",
    "Vertices",
    "MeshIndices",
    "Effects",
    "Faces",
    "Lightmaps",
    "LightVols",
    "VisData",
];

#[derive(Copy, Clone, Debug)]
struct Lump {
    offset: u64,
    size: usize,
}

/// Resolves a shader name to the external asset that would back it, without this crate ever
/// reading that asset's contents itself (texture decoding is out of scope; see
/// `SPEC_FULL.md` §6/Non-goals).
pub trait AssetResolver {
    type Reader: Read;

    /// Whether an asset named `name` (already including its extension) exists.
    fn exists(&self, name: &str) -> bool;

    /// Opens `name` for reading. The core loader never calls this; it is part of the resolver
    /// contract for callers that go on to decode textures themselves.
    fn open_for_read(&self, name: &str) -> std::io::Result<Self::Reader>;
}

/// An [`AssetResolver`] that reports every asset missing. Useful for tests, and for callers that
/// intentionally load geometry without textures.
#[derive(Copy, Clone, Debug, Default)]
pub struct NullResolver;

impl AssetResolver for NullResolver {
    type Reader = std::io::Empty;

    fn exists(&self, _name: &str) -> bool {
        false
    }

    fn open_for_read(&self, _name: &str) -> std::io::Result<std::io::Empty> {
        Ok(std::io::empty())
    }
}

/// Loads a complete IBSP v0x2E level from `reader`, using `resolver` to check which shader
/// textures are actually present on disk.
///
/// `R` is generic over any `Read + Seek` byte source (a file, a `Cursor<Vec<u8>>`, a slice of a
/// larger archive) rather than a boxed trait object, matching how the rest of this crate's
/// loaders are written against a type parameter instead of dynamic dispatch.
pub fn load<R, A>(reader: &mut R, resolver: &A, config: LoadConfig) -> Result<BspData, LoadError>
where
    R: Read + Seek,
    A: AssetResolver,
{
    config.validate()?;

    let file_len = reader.seek(SeekFrom::End(0))?;
    reader.seek(SeekFrom::Start(0))?;

    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    if &magic != MAGIC {
        return Err(LoadErrorKind::BadMagic(magic).into());
    }

    let version = reader.read_i32::<LittleEndian>()?;
    if version != VERSION {
        return Err(LoadErrorKind::UnsupportedVersion(version).into());
    }

    let mut lumps = Vec::with_capacity(LUMP_COUNT);
    for lump_index in 0..LUMP_COUNT {
        let lump = read_lump_entry(reader, file_len, LUMP_NAMES[lump_index])?;
        trace!(
            "lump {:?}: offset={} size={}",
            LumpId::from_usize(lump_index).unwrap(),
            lump.offset,
            lump.size
        );
        lumps.push(lump);
    }
    debug!("read {} lump directory entries", lumps.len());

    let entities = read_entities(reader, &lumps[LumpId::Entities as usize])?;
    let shaders = read_records(
        reader,
        &lumps[LumpId::Shaders as usize],
        SHADER_RECORD_SIZE,
        "Shaders",
        |r| read_shader(r, resolver),
    )?;
    let planes = read_records(
        reader,
        &lumps[LumpId::Planes as usize],
        PLANE_RECORD_SIZE,
        "Planes",
        |r| read_plane(r, config.strict_planes),
    )?;
    let nodes = read_records(
        reader,
        &lumps[LumpId::Nodes as usize],
        NODE_RECORD_SIZE,
        "Nodes",
        read_node,
    )?;
    let leaves = read_records(
        reader,
        &lumps[LumpId::Leafs as usize],
        LEAF_RECORD_SIZE,
        "Leafs",
        read_leaf,
    )?;
    let leaf_faces = read_records(
        reader,
        &lumps[LumpId::LeafFaces as usize],
        LEAF_FACE_RECORD_SIZE,
        "LeafFaces",
        |r| Ok(r.read_i32::<LittleEndian>()?),
    )?;
    let leaf_brushes = read_records(
        reader,
        &lumps[LumpId::LeafBrushes as usize],
        LEAF_BRUSH_RECORD_SIZE,
        "LeafBrushes",
        |r| Ok(r.read_i32::<LittleEndian>()?),
    )?;
    let models = read_records(
        reader,
        &lumps[LumpId::Models as usize],
        MODEL_RECORD_SIZE,
        "Models",
        read_model,
    )?;
    let brushes = read_records(
        reader,
        &lumps[LumpId::Brushes as usize],
        BRUSH_RECORD_SIZE,
        "Brushes",
        read_brush,
    )?;
    let brush_sides = read_records(
        reader,
        &lumps[LumpId::BrushSides as usize],
        BRUSH_SIDE_RECORD_SIZE,
        "BrushSides",
        read_brush_side,
    )?;
    let mut vertices = read_records(
        reader,
        &lumps[LumpId::Vertices as usize],
        VERTEX_RECORD_SIZE,
        "Vertices",
        read_vertex,
    )?;
    let mut mesh_verts = read_records(
        reader,
        &lumps[LumpId::MeshIndices as usize],
        MESH_INDEX_RECORD_SIZE,
        "MeshIndices",
        |r| Ok(r.read_i32::<LittleEndian>()?),
    )?;
    let effects = read_records(
        reader,
        &lumps[LumpId::Effects as usize],
        EFFECT_RECORD_SIZE,
        "Effects",
        read_effect,
    )?;
    let mut faces = read_records(
        reader,
        &lumps[LumpId::Faces as usize],
        FACE_RECORD_SIZE,
        "Faces",
        read_face,
    )?;
    let lightmaps = read_records(
        reader,
        &lumps[LumpId::Lightmaps as usize],
        LIGHTMAP_RECORD_SIZE,
        "Lightmaps",
        read_lightmap,
    )?;
    let light_vols = read_records(
        reader,
        &lumps[LumpId::LightVols as usize],
        LIGHTVOL_RECORD_SIZE,
        "LightVols",
        read_light_vol,
    )?;
    let visibility = read_visdata(reader, &lumps[LumpId::VisData as usize])?;

    expand_bezier_patches(&mut vertices, &mut faces, config.bezier_level);
    let bezier_index_strip = bezier::index_strip(config.bezier_level);

    // `mesh_verts` may be empty on scenes built entirely from patches; keep it as read.
    trace!("loaded {} mesh indices", mesh_verts.len());
    mesh_verts.shrink_to_fit();

    let light_vol_size = if models.is_empty() {
        [0, 0, 0]
    } else {
        crate::bsp::lightvol::grid_size(models[0].bounds.min, models[0].bounds.max)
    };

    debug!(
        "loaded BSP: {} planes, {} nodes, {} leaves, {} faces, {} vertices",
        planes.len(),
        nodes.len(),
        leaves.len(),
        faces.len(),
        vertices.len()
    );

    Ok(BspData::new(
        entities,
        shaders,
        planes,
        nodes,
        leaves,
        leaf_faces,
        leaf_brushes,
        models,
        brushes,
        brush_sides,
        vertices,
        mesh_verts,
        effects,
        faces,
        lightmaps,
        light_vols,
        light_vol_size,
        visibility,
        bezier_index_strip,
        config.bezier_level,
    ))
}

fn read_lump_entry<R: Read>(reader: &mut R, file_len: u64, name: &'static str) -> Result<Lump, LoadError> {
    let offset = reader.read_i32::<LittleEndian>()?;
    let size = reader.read_i32::<LittleEndian>()?;

    if offset < 0 || size < 0 {
        return Err(LoadErrorKind::Malformed(format!(
            "lump \"{}\" has a negative offset or size ({}, {})",
            name, offset, size
        )).into());
    }

    let (offset, size) = (offset as u64, size as u64);
    if offset.saturating_add(size) > file_len {
        return Err(LoadErrorKind::Truncated {
            lump: name,
            offset,
            size,
            file_len,
        }
        .into());
    }

    Ok(Lump {
        offset,
        size: size as usize,
    })
}

fn read_entities<R: Read + Seek>(reader: &mut R, lump: &Lump) -> Result<String, LoadError> {
    reader.seek(SeekFrom::Start(lump.offset))?;
    let mut buf = vec![0u8; lump.size];
    reader.read_exact(&mut buf)?;
    // The entity string is NUL-terminated within its lump; trailing padding is dropped.
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    Ok(String::from_utf8_lossy(&buf[..end]).into_owned())
}

/// Seeks to `lump`, verifies its size is a whole number of `record_size`-byte records, and reads
/// each one through `read_one`.
fn read_records<R, T, F>(
    reader: &mut R,
    lump: &Lump,
    record_size: usize,
    name: &'static str,
    mut read_one: F,
) -> Result<Vec<T>, LoadError>
where
    R: Read + Seek,
    F: FnMut(&mut R) -> Result<T, LoadError>,
{
    if lump.size % record_size != 0 {
        return Err(LoadErrorKind::Malformed(format!(
            "lump \"{}\" size {} is not a multiple of its record size {}",
            name, lump.size, record_size
        )).into());
    }

    let count = lump.size / record_size;
    reader.seek(SeekFrom::Start(lump.offset))?;

    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        out.push(read_one(reader)?);
    }
    Ok(out)
}

fn read_shader<R: Read, A: AssetResolver>(reader: &mut R, resolver: &A) -> Result<Shader, LoadError> {
    let mut name_bytes = [0u8; 64];
    reader.read_exact(&mut name_bytes)?;
    let end = name_bytes.iter().position(|&b| b == 0).unwrap_or(64);
    let name = String::from_utf8_lossy(&name_bytes[..end]).replace('\\', "/");

    // On disk the shader record stores `surface` before `contents`.
    let surface = SurfaceFlags::from_bits_truncate(reader.read_u32::<LittleEndian>()?);
    let contents = ContentsFlags::from_bits_truncate(reader.read_u32::<LittleEndian>()?);

    let mut render = name != "noshader";
    if render
        && contents.intersects(
            ContentsFlags::LAVA | ContentsFlags::SLIME | ContentsFlags::WATER | ContentsFlags::FOG,
        )
    {
        render = false;
    }

    let has_texture =
        resolver.exists(&format!("{}.jpg", name)) || resolver.exists(&format!("{}.tga", name));
    let texture_missing = !has_texture;
    if texture_missing && !surface.contains(SurfaceFlags::NODRAW) {
        warn!("shader \"{}\": could not resolve a .jpg or .tga texture", name);
        render = false;
    }

    let mut solid = !surface.contains(SurfaceFlags::NONSOLID);
    if contents.contains(ContentsFlags::PLAYERCLIP) {
        solid = true;
    }

    let transparent = contents.contains(ContentsFlags::TRANSLUCENT);

    Ok(Shader {
        name,
        contents,
        surface,
        render,
        transparent,
        solid,
        texture_missing,
    })
}

fn read_plane<R: Read>(reader: &mut R, strict: bool) -> Result<Hyperplane, LoadError> {
    let normal = Vector3::new(
        reader.read_f32::<LittleEndian>()?,
        reader.read_f32::<LittleEndian>()?,
        reader.read_f32::<LittleEndian>()?,
    );
    let dist = reader.read_f32::<LittleEndian>()?;

    if !Hyperplane::normal_is_unit(normal) {
        if strict {
            return Err(LoadErrorKind::Malformed(format!(
                "plane normal {:?} is not unit length",
                normal
            )).into());
        }
        trace!("accepting denormalized plane normal {:?}", normal);
    }

    Ok(Hyperplane::new(normal, dist))
}

fn read_int_bounds<R: Read>(reader: &mut R) -> Result<BspBoundsInt, LoadError> {
    let min = [
        reader.read_i32::<LittleEndian>()?,
        reader.read_i32::<LittleEndian>()?,
        reader.read_i32::<LittleEndian>()?,
    ];
    let max = [
        reader.read_i32::<LittleEndian>()?,
        reader.read_i32::<LittleEndian>()?,
        reader.read_i32::<LittleEndian>()?,
    ];
    Ok(BspBoundsInt { min, max })
}

fn read_node<R: Read>(reader: &mut R) -> Result<BspNode, LoadError> {
    let plane = reader.read_i32::<LittleEndian>()?;
    if plane < 0 {
        return Err(LoadErrorKind::Malformed(format!(
            "node plane index {} is negative",
            plane
        )).into());
    }
    let children = [
        reader.read_i32::<LittleEndian>()?,
        reader.read_i32::<LittleEndian>()?,
    ];
    let bounds = read_int_bounds(reader)?;

    Ok(BspNode {
        plane: plane as usize,
        children,
        bounds,
    })
}

fn read_leaf<R: Read>(reader: &mut R) -> Result<BspLeaf, LoadError> {
    let cluster = reader.read_i32::<LittleEndian>()?;
    let area = reader.read_i32::<LittleEndian>()?;
    let bounds = read_int_bounds(reader)?;
    let leaf_face = read_offset_count(reader, "leaf face")?;
    let leaf_brush = read_offset_count(reader, "leaf brush")?;

    Ok(BspLeaf {
        cluster,
        area,
        bounds,
        leaf_face,
        leaf_brush,
    })
}

fn read_offset_count<R: Read>(reader: &mut R, what: &'static str) -> Result<(usize, usize), LoadError> {
    let offset = reader.read_i32::<LittleEndian>()?;
    let count = reader.read_i32::<LittleEndian>()?;
    if offset < 0 || count < 0 {
        return Err(LoadErrorKind::Malformed(format!(
            "{} offset/count ({}, {}) is negative",
            what, offset, count
        )).into());
    }
    Ok((offset as usize, count as usize))
}

fn read_model<R: Read>(reader: &mut R) -> Result<BspModel, LoadError> {
    let min = Vector3::new(
        reader.read_f32::<LittleEndian>()?,
        reader.read_f32::<LittleEndian>()?,
        reader.read_f32::<LittleEndian>()?,
    );
    let max = Vector3::new(
        reader.read_f32::<LittleEndian>()?,
        reader.read_f32::<LittleEndian>()?,
        reader.read_f32::<LittleEndian>()?,
    );
    let face = read_offset_count(reader, "model face")?;
    let brush = read_offset_count(reader, "model brush")?;

    Ok(BspModel {
        bounds: Aabb::new(min, max),
        face,
        brush,
    })
}

fn read_brush<R: Read>(reader: &mut R) -> Result<BspBrush, LoadError> {
    let brush_side = read_offset_count(reader, "brush side")?;
    let shader = reader.read_i32::<LittleEndian>()?;
    if shader < 0 {
        return Err(LoadErrorKind::Malformed(format!(
            "brush shader index {} is negative",
            shader
        )).into());
    }

    Ok(BspBrush {
        brush_side,
        shader: shader as usize,
    })
}

fn read_brush_side<R: Read>(reader: &mut R) -> Result<BspBrushSide, LoadError> {
    let plane = reader.read_i32::<LittleEndian>()?;
    let shader = reader.read_i32::<LittleEndian>()?;
    if plane < 0 || shader < 0 {
        return Err(LoadErrorKind::Malformed(format!(
            "brush side plane/shader ({}, {}) is negative",
            plane, shader
        )).into());
    }

    Ok(BspBrushSide {
        plane: plane as usize,
        shader: shader as usize,
    })
}

fn read_vertex<R: Read>(reader: &mut R) -> Result<BspVertex, LoadError> {
    let position = Vector3::new(
        reader.read_f32::<LittleEndian>()?,
        reader.read_f32::<LittleEndian>()?,
        reader.read_f32::<LittleEndian>()?,
    );
    let tex_uv = [
        reader.read_f32::<LittleEndian>()?,
        reader.read_f32::<LittleEndian>()?,
    ];
    let lm_uv = [
        reader.read_f32::<LittleEndian>()?,
        reader.read_f32::<LittleEndian>()?,
    ];
    let normal = Vector3::new(
        reader.read_f32::<LittleEndian>()?,
        reader.read_f32::<LittleEndian>()?,
        reader.read_f32::<LittleEndian>()?,
    );
    let mut color = [0u8; 4];
    reader.read_exact(&mut color)?;

    Ok(BspVertex {
        position,
        tex_uv,
        lm_uv,
        normal,
        color,
    })
}

fn read_effect<R: Read>(reader: &mut R) -> Result<BspEffect, LoadError> {
    let mut name_bytes = [0u8; 64];
    reader.read_exact(&mut name_bytes)?;
    let end = name_bytes.iter().position(|&b| b == 0).unwrap_or(64);
    let name = String::from_utf8_lossy(&name_bytes[..end]).into_owned();

    let brush = reader.read_i32::<LittleEndian>()?;
    let _unknown = reader.read_i32::<LittleEndian>()?;

    Ok(BspEffect { name, brush })
}

/// A face as read straight off disk, before Bézier sub-patches are expanded.
struct RawFace {
    shader: i32,
    effect: i32,
    kind: i32,
    vertex: (usize, usize),
    mesh_vert: (usize, usize),
    lightmap: i32,
    normal: Vector3<f32>,
    patch_size: (i32, i32),
}

fn read_face<R: Read>(reader: &mut R) -> Result<BspFace, LoadError> {
    let shader = reader.read_i32::<LittleEndian>()?;
    let effect = reader.read_i32::<LittleEndian>()?;
    let kind = reader.read_i32::<LittleEndian>()?;
    let vertex = read_offset_count(reader, "face vertex")?;
    let mesh_vert = read_offset_count(reader, "face mesh vertex")?;
    let lightmap = reader.read_i32::<LittleEndian>()?;

    // lm_start, lm_size: not surfaced by the scene model (lightmap atlasing is out of scope).
    let _lm_start = [
        reader.read_i32::<LittleEndian>()?,
        reader.read_i32::<LittleEndian>()?,
    ];
    let _lm_size = [
        reader.read_i32::<LittleEndian>()?,
        reader.read_i32::<LittleEndian>()?,
    ];
    let _lm_origin = [
        reader.read_f32::<LittleEndian>()?,
        reader.read_f32::<LittleEndian>()?,
        reader.read_f32::<LittleEndian>()?,
    ];
    let _lm_vecs = [
        [
            reader.read_f32::<LittleEndian>()?,
            reader.read_f32::<LittleEndian>()?,
            reader.read_f32::<LittleEndian>()?,
        ],
        [
            reader.read_f32::<LittleEndian>()?,
            reader.read_f32::<LittleEndian>()?,
            reader.read_f32::<LittleEndian>()?,
        ],
    ];

    let normal = Vector3::new(
        reader.read_f32::<LittleEndian>()?,
        reader.read_f32::<LittleEndian>()?,
        reader.read_f32::<LittleEndian>()?,
    );

    let patch_size = (
        reader.read_i32::<LittleEndian>()?,
        reader.read_i32::<LittleEndian>()?,
    );

    let raw = RawFace {
        shader,
        effect,
        kind,
        vertex,
        mesh_vert,
        lightmap,
        normal,
        patch_size,
    };

    Ok(raw_face_to_bsp_face(raw))
}

fn raw_face_to_bsp_face(raw: RawFace) -> BspFace {
    let kind = match raw.kind {
        1 => BspFaceKind::Polygon,
        2 => {
            let (w, h) = (raw.patch_size.0.max(0) as usize, raw.patch_size.1.max(0) as usize);
            match bezier::sub_patch_grid(w, h) {
                Some(_) => BspFaceKind::Patch {
                    size: (w, h),
                    // filled in by `expand_bezier_patches` once the full vertex array exists.
                    sub_patches: Vec::new(),
                },
                None => {
                    warn!(
                        "patch face with invalid control grid size ({}, {}); treating as opaque",
                        raw.patch_size.0, raw.patch_size.1
                    );
                    BspFaceKind::Other(raw.kind)
                }
            }
        }
        3 => BspFaceKind::Model,
        other => BspFaceKind::Other(other),
    };

    BspFace {
        shader: raw.shader.max(0) as usize,
        effect: if raw.effect < 0 { None } else { Some(raw.effect as usize) },
        lightmap: if raw.lightmap < 0 { None } else { Some(raw.lightmap as usize) },
        vertex: raw.vertex,
        mesh_vert: raw.mesh_vert,
        normal: raw.normal,
        kind,
    }
}

fn read_lightmap<R: Read>(reader: &mut R) -> Result<BspLightmap, LoadError> {
    let mut rgb = vec![0u8; LIGHTMAP_RECORD_SIZE];
    reader.read_exact(&mut rgb)?;
    Ok(BspLightmap {
        rgb: rgb.into_boxed_slice(),
    })
}

fn read_light_vol<R: Read>(reader: &mut R) -> Result<LightVol, LoadError> {
    let mut ambient = [0u8; 3];
    reader.read_exact(&mut ambient)?;
    let mut directional = [0u8; 3];
    reader.read_exact(&mut directional)?;
    let mut dir_bytes = [0u8; 2];
    reader.read_exact(&mut dir_bytes)?;

    let direction = crate::bsp::lightvol::decode_direction(dir_bytes[0], dir_bytes[1]);

    Ok(LightVol {
        ambient,
        directional,
        direction,
    })
}

fn read_visdata<R: Read + Seek>(reader: &mut R, lump: &Lump) -> Result<VisData, LoadError> {
    if lump.size == 0 {
        return Ok(VisData::empty());
    }

    if lump.size < VISDATA_HEADER_SIZE {
        return Err(LoadErrorKind::Malformed(format!(
            "VisData lump size {} is smaller than its 8-byte header",
            lump.size
        )).into());
    }

    reader.seek(SeekFrom::Start(lump.offset))?;
    let cluster_count = reader.read_i32::<LittleEndian>()?;
    let bytes_per_cluster = reader.read_i32::<LittleEndian>()?;

    if cluster_count < 0 || bytes_per_cluster < 0 {
        return Err(LoadErrorKind::Malformed(
            "VisData cluster_count/bytes_per_cluster is negative".to_string(),
        )
        .into());
    }

    let bitmap_size = cluster_count as usize * bytes_per_cluster as usize;
    let available = lump.size - VISDATA_HEADER_SIZE;
    if bitmap_size > available {
        return Err(LoadErrorKind::Truncated {
            lump: "VisData",
            offset: lump.offset + VISDATA_HEADER_SIZE as u64,
            size: bitmap_size as u64,
            file_len: lump.offset + lump.size as u64,
        }
        .into());
    }

    let mut bits = vec![0u8; bitmap_size];
    reader.read_exact(&mut bits)?;

    Ok(VisData::new(cluster_count as usize, bytes_per_cluster as usize, bits))
}

/// Tessellates every `Patch` face's control grid, appending the generated vertices to `vertices`
/// and recording each sub-patch's vertex range on the face. The 3x3 control grids a patch
/// decomposes into are read back out of the *original* vertex range recorded on the face, so this
/// must run after all faces and vertices are loaded but operates purely by appending (existing
/// vertex indices are never invalidated).
fn expand_bezier_patches(vertices: &mut Vec<BspVertex>, faces: &mut [BspFace], level: u32) {
    for face in faces.iter_mut() {
        let (w, size_h, control_offset) = match &face.kind {
            BspFaceKind::Patch { size, .. } => (size.0, size.1, face.vertex.0),
            _ => continue,
        };

        let (dim_n, dim_m) = match bezier::sub_patch_grid(w, size_h) {
            Some(dims) => dims,
            None => continue,
        };

        let controls: Vec<BspVertex> = vertices[control_offset..control_offset + w * size_h].to_vec();

        let mut sub_patches = Vec::with_capacity(dim_n * dim_m);
        for m in 0..dim_m {
            for n in 0..dim_n {
                let grid = bezier::sub_patch_controls(&controls, w, n, m);
                let tessellated = bezier::tessellate(&grid, level);

                let base = vertices.len();
                let count = tessellated.len();
                vertices.extend(tessellated);
                sub_patches.push(bezier::Tessellation {
                    vertex: (base, count),
                });
            }
        }

        if let BspFaceKind::Patch { sub_patches: slot, .. } = &mut face.kind {
            *slot = sub_patches;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Cursor;

    fn write_lump_dir(buf: &mut Vec<u8>, lumps: &[(i32, i32)]) {
        for &(offset, size) in lumps {
            buf.extend_from_slice(&offset.to_le_bytes());
            buf.extend_from_slice(&size.to_le_bytes());
        }
    }

    /// Builds the smallest possible valid IBSP file: header plus 17 zero-size lumps.
    fn empty_bsp_bytes() -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(MAGIC);
        buf.extend_from_slice(&VERSION.to_le_bytes());

        let header_end = 8 + LUMP_COUNT * 8;
        let lumps = vec![(header_end as i32, 0); LUMP_COUNT];
        write_lump_dir(&mut buf, &lumps);

        buf
    }

    #[test]
    fn test_load_empty_scene() {
        let bytes = empty_bsp_bytes();
        let mut cursor = Cursor::new(bytes);
        let bsp = load(&mut cursor, &NullResolver, LoadConfig::default()).unwrap();

        assert!(bsp.nodes().is_empty());
        assert!(bsp.leaves().is_empty());
        assert!(bsp.faces().is_empty());
        assert_eq!(bsp.light_vol_size(), [0, 0, 0]);
    }

    #[test]
    fn test_bad_magic_rejected() {
        let mut bytes = empty_bsp_bytes();
        bytes[0] = b'X';
        let mut cursor = Cursor::new(bytes);
        let err = load(&mut cursor, &NullResolver, LoadConfig::default()).unwrap_err();
        assert!(matches!(err.kind(), LoadErrorKind::BadMagic(_)));
    }

    #[test]
    fn test_bad_version_rejected() {
        let mut bytes = empty_bsp_bytes();
        bytes[4..8].copy_from_slice(&99i32.to_le_bytes());
        let mut cursor = Cursor::new(bytes);
        let err = load(&mut cursor, &NullResolver, LoadConfig::default()).unwrap_err();
        assert!(matches!(err.kind(), LoadErrorKind::UnsupportedVersion(99)));
    }

    #[test]
    fn test_truncated_lump_rejected() {
        let mut bytes = empty_bsp_bytes();
        // Claim the Entities lump (first directory entry, right after magic+version) is huge.
        let entities_offset_pos = 8;
        bytes[entities_offset_pos..entities_offset_pos + 4].copy_from_slice(&0i32.to_le_bytes());
        bytes[entities_offset_pos + 4..entities_offset_pos + 8]
            .copy_from_slice(&1_000_000i32.to_le_bytes());
        let mut cursor = Cursor::new(bytes);
        let err = load(&mut cursor, &NullResolver, LoadConfig::default()).unwrap_err();
        assert!(matches!(err.kind(), LoadErrorKind::Truncated { .. }));
    }

    #[test]
    fn test_invalid_config_rejected_before_reading() {
        let bytes = empty_bsp_bytes();
        let mut cursor = Cursor::new(bytes);
        let cfg = LoadConfig {
            bezier_level: 0,
            ..LoadConfig::default()
        };
        let err = load(&mut cursor, &NullResolver, cfg).unwrap_err();
        assert!(matches!(err.kind(), LoadErrorKind::InvalidConfig(_)));
    }

    #[test]
    fn test_shader_classification_noshader_does_not_render() {
        let mut name = [0u8; 64];
        name[..9].copy_from_slice(b"noshader\0");
        let mut buf = Cursor::new(Vec::new());
        buf.get_mut().extend_from_slice(&name);
        buf.get_mut().extend_from_slice(&0u32.to_le_bytes()); // surface
        buf.get_mut().extend_from_slice(&0u32.to_le_bytes()); // contents
        buf.set_position(0);

        let shader = read_shader(&mut buf, &NullResolver).unwrap();
        assert_eq!(shader.name, "noshader");
        assert!(!shader.render);
    }

    #[test]
    fn test_shader_classification_missing_texture_with_nodraw_still_renders() {
        let mut name = [0u8; 64];
        name[..4].copy_from_slice(b"sky\0");
        let mut buf = Cursor::new(Vec::new());
        buf.get_mut().extend_from_slice(&name);
        buf.get_mut()
            .extend_from_slice(&SurfaceFlags::NODRAW.bits().to_le_bytes());
        buf.get_mut().extend_from_slice(&0u32.to_le_bytes());
        buf.set_position(0);

        let shader = read_shader(&mut buf, &NullResolver).unwrap();
        assert!(shader.texture_missing);
        assert!(shader.render);
    }

    #[test]
    fn test_shader_classification_missing_texture_without_nodraw_does_not_render() {
        let mut name = [0u8; 64];
        name[..8].copy_from_slice(b"textures");
        let mut buf = Cursor::new(Vec::new());
        buf.get_mut().extend_from_slice(&name);
        buf.get_mut().extend_from_slice(&0u32.to_le_bytes());
        buf.get_mut().extend_from_slice(&0u32.to_le_bytes());
        buf.set_position(0);

        let shader = read_shader(&mut buf, &NullResolver).unwrap();
        assert!(shader.texture_missing);
        assert!(!shader.render);
    }

    #[test]
    fn test_patch_face_expands_into_shared_grid() {
        let controls: Vec<BspVertex> = (0..9)
            .map(|i| BspVertex {
                position: Vector3::new(i as f32, 0.0, 0.0),
                tex_uv: [0.0, 0.0],
                lm_uv: [0.0, 0.0],
                normal: Vector3::new(0.0, 0.0, 1.0),
                color: [255, 255, 255, 255],
            })
            .collect();

        let mut vertices = controls.clone();
        let mut faces = vec![BspFace {
            shader: 0,
            effect: None,
            lightmap: None,
            vertex: (0, 9),
            mesh_vert: (0, 0),
            normal: Vector3::new(0.0, 0.0, 1.0),
            kind: BspFaceKind::Patch {
                size: (3, 3),
                sub_patches: Vec::new(),
            },
        }];

        expand_bezier_patches(&mut vertices, &mut faces, 2);

        match &faces[0].kind {
            BspFaceKind::Patch { sub_patches, .. } => {
                assert_eq!(sub_patches.len(), 1);
                assert_eq!(sub_patches[0].vertex, (9, 9));
            }
            _ => panic!("expected a patch face"),
        }
        assert_eq!(vertices.len(), 18);
    }
}
