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

//! Front-to-back BSP render traversal — `SPEC_FULL.md` §4.F/§4.I.
//!
//! `render_world` runs the tree twice: once for opaque shaders, once for transparent ones. Each
//! pass keeps its own "already emitted" bitset (a face reachable from two leaves must still only
//! be drawn once per pass), and every face belonging to a non-worldspawn model is pre-marked
//! emitted before either pass starts, since dynamic sub-models are drawn by their owner, not by
//! `render_world` walking the tree.

use cgmath::{InnerSpace, Matrix4, Vector3};

use crate::bitset::DynBitSet;
use crate::bsp::frustum::Frustum;
use crate::bsp::{BspData, BspFaceKind};

/// Where a [`DrawItem`]'s triangle indices come from.
#[derive(Copy, Clone, Debug)]
pub enum DrawIndices {
    /// A range into the scene's global mesh-index array (`BspData::mesh_verts`), to be applied
    /// relative to this item's `vertex.0` (the on-disk `meshVert` convention).
    Mesh { base: usize, count: usize },
    /// The scene's single shared Bézier index strip (`BspData::bezier_index_strip`), to be
    /// applied relative to this item's `vertex.0`.
    BezierShared,
}

/// One drawable unit: either a whole polygon/model face, or a single Bézier sub-patch.
#[derive(Copy, Clone, Debug)]
pub struct DrawItem {
    pub face: usize,
    pub shader: usize,
    pub lightmap: Option<usize>,
    /// `(base, count)` into the scene's global vertex array.
    pub vertex: (usize, usize),
    pub indices: DrawIndices,
}

/// Walks the BSP tree from the camera's position and frustum, invoking `emit` once per drawable
/// unit in front-to-back order within each of the two passes (opaque, then transparent).
///
/// Emits nothing if the scene has no nodes (the degenerate empty-scene case).
pub fn render_world<F>(bsp: &BspData, view_projection: Matrix4<f32>, cam_pos: Vector3<f32>, mut emit: F)
where
    F: FnMut(DrawItem),
{
    if bsp.nodes().is_empty() {
        return;
    }

    let frustum = Frustum::from_view_projection(view_projection);
    let cam_cluster = bsp.find_cluster(cam_pos);

    for &solid in &[true, false] {
        let mut emitted = DynBitSet::with_capacity(bsp.faces().len());
        mark_submodel_faces_emitted(bsp, &mut emitted);

        render_node(bsp, 0, cam_pos, cam_cluster, &frustum, solid, &mut emitted, &mut emit);
    }
}

fn mark_submodel_faces_emitted(bsp: &BspData, emitted: &mut DynBitSet) {
    for model in bsp.models().get(1..).unwrap_or(&[]) {
        let (base, count) = model.face;
        for i in base..base.saturating_add(count) {
            emitted.set(i);
        }
    }
}

fn render_node<F>(
    bsp: &BspData,
    index: i32,
    cam_pos: Vector3<f32>,
    cam_cluster: i32,
    frustum: &Frustum,
    solid: bool,
    emitted: &mut DynBitSet,
    emit: &mut F,
) where
    F: FnMut(DrawItem),
{
    if index < 0 {
        render_leaf(bsp, (!index) as usize, cam_cluster, frustum, solid, emitted, emit);
        return;
    }

    let node = match bsp.nodes().get(index as usize) {
        Some(node) => node,
        None => return,
    };

    if !frustum.intersects_aabb(&node.bounds.to_aabb()) {
        return;
    }

    let plane = match bsp.planes().get(node.plane) {
        Some(plane) => plane,
        None => return,
    };

    let front_first = (plane.point_dist(cam_pos) >= 0.0) == solid;
    let (first, second) = if front_first {
        (node.children[0], node.children[1])
    } else {
        (node.children[1], node.children[0])
    };

    render_node(bsp, first, cam_pos, cam_cluster, frustum, solid, emitted, emit);
    render_node(bsp, second, cam_pos, cam_cluster, frustum, solid, emitted, emit);
}

fn render_leaf<F>(
    bsp: &BspData,
    leaf_index: usize,
    cam_cluster: i32,
    frustum: &Frustum,
    solid: bool,
    emitted: &mut DynBitSet,
    emit: &mut F,
) where
    F: FnMut(DrawItem),
{
    let leaf = match bsp.leaves().get(leaf_index) {
        Some(leaf) => leaf,
        None => return,
    };

    if !bsp.visibility().cluster_visible(leaf.cluster, cam_cluster) {
        return;
    }

    if !frustum.intersects_aabb(&leaf.bounds.to_aabb()) {
        return;
    }

    let (base, count) = leaf.leaf_face;
    for i in base..base.saturating_add(count) {
        if let Some(&face_index) = bsp.leaf_faces().get(i) {
            if face_index >= 0 {
                render_face(bsp, face_index as usize, solid, emitted, emit);
            }
        }
    }
}

fn render_face<F>(bsp: &BspData, face_index: usize, solid: bool, emitted: &mut DynBitSet, emit: &mut F)
where
    F: FnMut(DrawItem),
{
    if emitted.contains(face_index) {
        return;
    }

    let face = match bsp.faces().get(face_index) {
        Some(face) => face,
        None => return,
    };

    let shader = match bsp.shaders().get(face.shader) {
        Some(shader) => shader,
        None => return,
    };

    if !shader.render || shader.transparent == solid {
        return;
    }

    match &face.kind {
        BspFaceKind::Polygon | BspFaceKind::Model => {
            emit(DrawItem {
                face: face_index,
                shader: face.shader,
                lightmap: face.lightmap,
                vertex: face.vertex,
                indices: DrawIndices::Mesh {
                    base: face.mesh_vert.0,
                    count: face.mesh_vert.1,
                },
            });
        }
        BspFaceKind::Patch { sub_patches, .. } => {
            for sub_patch in sub_patches {
                emit(DrawItem {
                    face: face_index,
                    shader: face.shader,
                    lightmap: face.lightmap,
                    vertex: sub_patch.vertex,
                    indices: DrawIndices::BezierShared,
                });
            }
        }
        BspFaceKind::Other(_) => {}
    }

    emitted.set(face_index);
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::bsp::visibility::VisData;
    use crate::bsp::{BspBoundsInt, BspFace, BspModel, BspNode, ContentsFlags, Shader, SurfaceFlags};
    use crate::math::{Aabb, Hyperplane};
    use cgmath::{perspective, Deg, Matrix4, Point3};

    fn identity_view_projection() -> Matrix4<f32> {
        let proj = perspective(Deg(90.0), 1.0, 0.1, 1000.0);
        let view = Matrix4::look_at_rh(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, 0.0, 1.0),
        );
        proj * view
    }

    fn one_leaf_scene_with_face() -> BspData {
        let shaders = vec![Shader {
            name: "textures/test".to_string(),
            contents: ContentsFlags::empty(),
            surface: SurfaceFlags::empty(),
            render: true,
            transparent: false,
            solid: true,
            texture_missing: false,
        }];

        let planes = vec![Hyperplane::new(Vector3::new(1.0, 0.0, 0.0), 0.0)];
        let nodes = vec![BspNode {
            plane: 0,
            children: [!0, !0],
            bounds: BspBoundsInt {
                min: [-100, -100, -100],
                max: [100, 100, 100],
            },
        }];

        let leaves = vec![crate::bsp::BspLeaf {
            cluster: -1,
            area: 0,
            bounds: BspBoundsInt {
                min: [-100, -100, -100],
                max: [100, 100, 100],
            },
            leaf_face: (0, 1),
            leaf_brush: (0, 0),
        }];

        let faces = vec![BspFace {
            shader: 0,
            effect: None,
            lightmap: None,
            vertex: (0, 4),
            mesh_vert: (0, 6),
            normal: Vector3::new(0.0, 0.0, 1.0),
            kind: BspFaceKind::Polygon,
        }];

        let models = vec![BspModel {
            bounds: Aabb::new(
                Vector3::new(-100.0, -100.0, -100.0),
                Vector3::new(100.0, 100.0, 100.0),
            ),
            face: (0, 1),
            brush: (0, 0),
        }];

        BspData::new(
            String::new(),
            shaders,
            planes,
            nodes,
            leaves,
            vec![0],
            Vec::new(),
            models,
            Vec::new(),
            Vec::new(),
            Vec::new(),
            vec![0, 1, 2, 2, 3, 0],
            Vec::new(),
            faces,
            Vec::new(),
            Vec::new(),
            [0, 0, 0],
            VisData::empty(),
            Vec::new(),
            3,
        )
    }

    #[test]
    fn test_empty_scene_emits_nothing() {
        let bsp = crate::bsp::test_fixtures::two_leaf_scene();
        let mut count = 0;
        render_world(&bsp, identity_view_projection(), Vector3::new(5.0, 0.0, 0.0), |_| count += 1);
        assert_eq!(count, 0);
    }

    #[test]
    fn test_single_opaque_face_emitted_exactly_once() {
        let bsp = one_leaf_scene_with_face();
        let mut items = Vec::new();
        render_world(&bsp, identity_view_projection(), Vector3::new(50.0, 0.0, 0.0), |item| {
            items.push(item)
        });

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].face, 0);
        assert!(matches!(items[0].indices, DrawIndices::Mesh { base: 0, count: 6 }));
    }
}
