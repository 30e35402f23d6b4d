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

//! The IBSP scene model and the traversal algorithms that run over it.
//!
//! [`BspData`] is the central, load-once, read-many data structure: every lump in an IBSP file
//! becomes one of its fields, and every cross-reference inside the file (a node's plane, a
//! brush's sides, a leaf's face list) stays an index into one of those fields rather than
//! becoming a pointer. [`load::load`] is the only way to build one.

pub mod bezier;
pub mod collide;
pub mod frustum;
pub mod lightvol;
pub mod load;
pub mod render;
pub mod visibility;

use bitflags::bitflags;
use cgmath::Vector3;

use crate::math::{Aabb, Hyperplane};

bitflags! {
    /// Raw `contents` flags from the shader lump. The loader classifies most of these into
    /// `Shader::solid`/`transparent`/`render`; the bitflags are kept around so a caller can
    /// inspect a flag the core's classification does not surface (e.g. `FOG`, `DETAIL`).
    pub struct ContentsFlags: u32 {
        const SOLID       = 0x0000_0001;
        const LAVA        = 0x0000_0008;
        const SLIME       = 0x0000_0010;
        const WATER       = 0x0000_0020;
        const FOG         = 0x0000_0040;
        const AREAPORTAL  = 0x0000_8000;
        const PLAYERCLIP  = 0x0001_0000;
        const MONSTERCLIP = 0x0002_0000;
        const DETAIL      = 0x0800_0000;
        const STRUCTURAL  = 0x1000_0000;
        const TRANSLUCENT = 0x2000_0000;
    }
}

bitflags! {
    /// Raw `surface` flags from the shader lump.
    pub struct SurfaceFlags: u32 {
        const NODAMAGE    = 0x0000_0001;
        const SLICK       = 0x0000_0002;
        const SKY         = 0x0000_0004;
        const LADDER      = 0x0000_0008;
        const NOIMPACT    = 0x0000_0010;
        const NOMARKS     = 0x0000_0020;
        const FLESH       = 0x0000_0040;
        const NODRAW      = 0x0000_0080;
        const HINT        = 0x0000_0100;
        const SKIP        = 0x0000_0200;
        const NOLIGHTMAP  = 0x0000_0400;
        const POINTLIGHT  = 0x0000_0800;
        const METALSTEPS  = 0x0000_1000;
        const NOSTEPS     = 0x0000_2000;
        const NONSOLID    = 0x0000_4000;
        const LIGHTFILTER = 0x0000_8000;
        const ALPHASHADOW = 0x0001_0000;
        const NODLIGHT    = 0x0002_0000;
    }
}

/// A single node of the BSP tree: an internal split plane with two children. A child index `c`
/// refers to another node if `c >= 0`, or to leaf `!c` if `c < 0` (bitwise negation, matching the
/// on-disk encoding).
#[derive(Copy, Clone, Debug)]
pub struct BspNode {
    pub plane: usize,
    pub children: [i32; 2],
    pub bounds: BspBoundsInt,
}

/// Integer AABB, as stored by the node and leaf lumps (the compiler snaps these to whole units).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BspBoundsInt {
    pub min: [i32; 3],
    pub max: [i32; 3],
}

impl BspBoundsInt {
    pub fn to_aabb(&self) -> Aabb {
        Aabb::new(
            Vector3::new(self.min[0] as f32, self.min[1] as f32, self.min[2] as f32),
            Vector3::new(self.max[0] as f32, self.max[1] as f32, self.max[2] as f32),
        )
    }
}

/// A convex leaf cell of the BSP tree.
#[derive(Copy, Clone, Debug)]
pub struct BspLeaf {
    /// Visibility cluster. `-1` means this leaf belongs to no cluster and is always visible
    /// (e.g. leaves entirely outside the map, or in a map with no compiled PVS).
    pub cluster: i32,
    pub area: i32,
    pub bounds: BspBoundsInt,
    pub leaf_face: (usize, usize),
    pub leaf_brush: (usize, usize),
}

/// One of the 3D-model groupings in the model lump; model 0 is the worldspawn.
#[derive(Copy, Clone, Debug)]
pub struct BspModel {
    pub bounds: Aabb,
    pub face: (usize, usize),
    pub brush: (usize, usize),
}

/// A convex solid (or non-solid classification volume) built from half-space intersections.
#[derive(Copy, Clone, Debug)]
pub struct BspBrush {
    pub brush_side: (usize, usize),
    pub shader: usize,
}

/// One face of a [`BspBrush`].
#[derive(Copy, Clone, Debug)]
pub struct BspBrushSide {
    pub plane: usize,
    pub shader: usize,
}

/// A single mesh vertex. Position, texture UV, lightmap UV, normal, and an optional vertex
/// color, all of which participate in the Bézier tensor-product interpolation (see
/// [`bezier`]) via their `Add`/`Mul<f32>` impls.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BspVertex {
    pub position: Vector3<f32>,
    pub tex_uv: [f32; 2],
    pub lm_uv: [f32; 2],
    pub normal: Vector3<f32>,
    pub color: [u8; 4],
}

impl std::ops::Add for BspVertex {
    type Output = BspVertex;

    fn add(self, rhs: BspVertex) -> BspVertex {
        let sum_color = |a: [u8; 4], b: [u8; 4]| {
            let mut out = [0u8; 4];
            for i in 0..4 {
                out[i] = (a[i] as u16 + b[i] as u16).min(255) as u8;
            }
            out
        };

        BspVertex {
            position: self.position + rhs.position,
            tex_uv: [self.tex_uv[0] + rhs.tex_uv[0], self.tex_uv[1] + rhs.tex_uv[1]],
            lm_uv: [self.lm_uv[0] + rhs.lm_uv[0], self.lm_uv[1] + rhs.lm_uv[1]],
            normal: self.normal + rhs.normal,
            color: sum_color(self.color, rhs.color),
        }
    }
}

impl std::ops::Mul<f32> for BspVertex {
    type Output = BspVertex;

    fn mul(self, rhs: f32) -> BspVertex {
        let scale_color = |c: [u8; 4], f: f32| {
            let mut out = [0u8; 4];
            for i in 0..4 {
                out[i] = (c[i] as f32 * f).max(0.0).min(255.0) as u8;
            }
            out
        };

        BspVertex {
            position: self.position * rhs,
            tex_uv: [self.tex_uv[0] * rhs, self.tex_uv[1] * rhs],
            lm_uv: [self.lm_uv[0] * rhs, self.lm_uv[1] * rhs],
            normal: self.normal * rhs,
            color: scale_color(self.color, rhs),
        }
    }
}

/// Discriminated face payload. See `SPEC_FULL.md` §3/§4.A for the on-disk type codes this is
/// built from.
#[derive(Clone, Debug)]
pub enum BspFaceKind {
    Polygon,
    Patch {
        /// Control grid size `(w, h)`, both odd.
        size: (usize, usize),
        /// One tessellated sub-patch per 3x3 block of the control grid, in row-major order.
        sub_patches: Vec<bezier::Tessellation>,
    },
    Model,
    Other(i32),
}

/// A single drawable (or at least loaded) face.
#[derive(Clone, Debug)]
pub struct BspFace {
    pub shader: usize,
    pub effect: Option<usize>,
    pub lightmap: Option<usize>,
    pub vertex: (usize, usize),
    pub mesh_vert: (usize, usize),
    pub normal: Vector3<f32>,
    pub kind: BspFaceKind,
}

/// Opaque (to this crate) entity reference: name plus owning brush, carried through from the
/// effects lump. Effects are not interpreted further by the core (see `SPEC_FULL.md` Non-goals).
#[derive(Clone, Debug)]
pub struct BspEffect {
    pub name: String,
    pub brush: i32,
}

/// A material reference: a name plus the render/transparent/solid classification the loader
/// derives from the shader's `surface`/`contents` flags (§4.A).
#[derive(Clone, Debug)]
pub struct Shader {
    pub name: String,
    pub contents: ContentsFlags,
    pub surface: SurfaceFlags,
    pub render: bool,
    pub transparent: bool,
    pub solid: bool,
    pub texture_missing: bool,
}

pub const LIGHTMAP_SIZE: usize = 128;

/// One baked 128x128 RGB8 lightmap image.
#[derive(Clone)]
pub struct BspLightmap {
    pub rgb: Box<[u8]>,
}

impl std::fmt::Debug for BspLightmap {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "BspLightmap {{ {} bytes }}", self.rgb.len())
    }
}

/// One sample of the coarse ambient/directional light grid.
#[derive(Copy, Clone, Debug)]
pub struct LightVol {
    pub ambient: [u8; 3],
    pub directional: [u8; 3],
    pub direction: Vector3<f32>,
}

impl LightVol {
    pub fn zero() -> LightVol {
        LightVol {
            ambient: [0, 0, 0],
            directional: [0, 0, 0],
            direction: Vector3::new(0.0, 0.0, 1.0),
        }
    }
}

/// The complete, immutable-after-load scene. Every array here is indexed by the cross-references
/// described in `SPEC_FULL.md` §3; none of them ever shrink or reorder after [`load::load`]
/// returns.
#[derive(Debug)]
pub struct BspData {
    entities: String,
    shaders: Vec<Shader>,
    planes: Vec<Hyperplane>,
    nodes: Vec<BspNode>,
    leaves: Vec<BspLeaf>,
    leaf_faces: Vec<i32>,
    leaf_brushes: Vec<i32>,
    models: Vec<BspModel>,
    brushes: Vec<BspBrush>,
    brush_sides: Vec<BspBrushSide>,
    vertices: Vec<BspVertex>,
    mesh_verts: Vec<i32>,
    effects: Vec<BspEffect>,
    faces: Vec<BspFace>,
    lightmaps: Vec<BspLightmap>,
    light_vols: Vec<LightVol>,
    light_vol_size: [u32; 3],
    visibility: visibility::VisData,
    bezier_index_strip: Vec<u16>,
    bezier_level: u32,
}

impl BspData {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        entities: String,
        shaders: Vec<Shader>,
        planes: Vec<Hyperplane>,
        nodes: Vec<BspNode>,
        leaves: Vec<BspLeaf>,
        leaf_faces: Vec<i32>,
        leaf_brushes: Vec<i32>,
        models: Vec<BspModel>,
        brushes: Vec<BspBrush>,
        brush_sides: Vec<BspBrushSide>,
        vertices: Vec<BspVertex>,
        mesh_verts: Vec<i32>,
        effects: Vec<BspEffect>,
        faces: Vec<BspFace>,
        lightmaps: Vec<BspLightmap>,
        light_vols: Vec<LightVol>,
        light_vol_size: [u32; 3],
        visibility: visibility::VisData,
        bezier_index_strip: Vec<u16>,
        bezier_level: u32,
    ) -> BspData {
        BspData {
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
            bezier_level,
        }
    }

    pub fn entities(&self) -> &str {
        &self.entities
    }

    pub fn shaders(&self) -> &[Shader] {
        &self.shaders
    }

    pub fn planes(&self) -> &[Hyperplane] {
        &self.planes
    }

    pub fn nodes(&self) -> &[BspNode] {
        &self.nodes
    }

    pub fn leaves(&self) -> &[BspLeaf] {
        &self.leaves
    }

    pub fn leaf_faces(&self) -> &[i32] {
        &self.leaf_faces
    }

    pub fn leaf_brushes(&self) -> &[i32] {
        &self.leaf_brushes
    }

    pub fn models(&self) -> &[BspModel] {
        &self.models
    }

    pub fn brushes(&self) -> &[BspBrush] {
        &self.brushes
    }

    pub fn brush_sides(&self) -> &[BspBrushSide] {
        &self.brush_sides
    }

    pub fn vertices(&self) -> &[BspVertex] {
        &self.vertices
    }

    pub fn mesh_verts(&self) -> &[i32] {
        &self.mesh_verts
    }

    pub fn effects(&self) -> &[BspEffect] {
        &self.effects
    }

    pub fn faces(&self) -> &[BspFace] {
        &self.faces
    }

    pub fn lightmaps(&self) -> &[BspLightmap] {
        &self.lightmaps
    }

    pub fn light_vols(&self) -> &[LightVol] {
        &self.light_vols
    }

    pub fn light_vol_size(&self) -> [u32; 3] {
        self.light_vol_size
    }

    pub fn visibility(&self) -> &visibility::VisData {
        &self.visibility
    }

    /// The single shared index strip used by every Bézier sub-patch at this scene's subdivision
    /// level (`6 * bezier_level^2` indices); see `SPEC_FULL.md` §4.C.
    pub fn bezier_index_strip(&self) -> &[u16] {
        &self.bezier_index_strip
    }

    pub fn bezier_level(&self) -> u32 {
        self.bezier_level
    }

    /// Root model (model 0), the static worldspawn geometry.
    pub fn worldspawn(&self) -> &BspModel {
        &self.models[0]
    }

    /// Descends the BSP tree from the root, returning the index of the leaf containing `point`.
    ///
    /// Grounded on the node classification rule shared by render and collision traversal: a
    /// child index `c < 0` encodes leaf `!c` (see [`BspNode`]). A node or plane reference that
    /// falls outside the loaded arrays (malformed input the loader did not reject, per §7's
    /// clamp-or-skip policy) ends the descent at leaf 0 rather than panicking.
    pub fn find_leaf(&self, point: Vector3<f32>) -> usize {
        if self.nodes.is_empty() {
            return 0;
        }

        let mut index: i32 = 0;
        loop {
            if index < 0 {
                return (!index) as usize;
            }

            let node = match self.nodes.get(index as usize) {
                Some(node) => node,
                None => return 0,
            };
            let plane = match self.planes.get(node.plane) {
                Some(plane) => plane,
                None => return 0,
            };
            index = if plane.point_dist(point) >= 0.0 {
                node.children[0]
            } else {
                node.children[1]
            };
        }
    }

    /// The visibility cluster containing `point`, or `-1` if the map has no leaves (degenerate
    /// scene) or the containing leaf belongs to no cluster.
    pub fn find_cluster(&self, point: Vector3<f32>) -> i32 {
        if self.leaves.is_empty() {
            return -1;
        }
        self.leaves
            .get(self.find_leaf(point))
            .map(|leaf| leaf.cluster)
            .unwrap_or(-1)
    }
}


#[cfg(test)]
mod test {
    use super::test_fixtures::two_leaf_scene;
    use super::*;

    #[test]
    fn test_find_leaf_splits_on_plane() {
        let scene = two_leaf_scene();
        assert_eq!(scene.find_leaf(Vector3::new(5.0, 0.0, 0.0)), 0);
        assert_eq!(scene.find_leaf(Vector3::new(-5.0, 0.0, 0.0)), 1);
    }

    #[test]
    fn test_find_cluster_matches_leaf() {
        let scene = two_leaf_scene();
        assert_eq!(scene.find_cluster(Vector3::new(5.0, 0.0, 0.0)), 0);
        assert_eq!(scene.find_cluster(Vector3::new(-5.0, 0.0, 0.0)), 1);
    }
}
