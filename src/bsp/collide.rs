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

//! Swept-sphere collision against the brush tree — `SPEC_FULL.md` §4.G.
//!
//! `trace_world` pushes a sphere of `radius` that moved from `old_position` to `position` out of
//! any solid brush it ends up penetrating, by at most the deepest single plane's penetration
//! depth. This is a single push-out, not a full continuous sweep: it matches the behavior the
//! original traversal algorithm implements (see `SPEC_FULL.md` §9), not a physically exact swept
//! volume.

use cgmath::{InnerSpace, Vector3};

use crate::bitset::DynBitSet;
use crate::bsp::BspData;

/// Traces a sphere of `radius` from `old_position` to `position`, returning `position` pushed out
/// of any solid brush it penetrates. Returns `position` unchanged if the scene has no nodes.
pub fn trace_world(
    bsp: &BspData,
    position: Vector3<f32>,
    old_position: Vector3<f32>,
    radius: f32,
) -> Vector3<f32> {
    if bsp.nodes().is_empty() {
        return position;
    }

    let mut pass = TracePass {
        bsp,
        position,
        old_position,
        radius,
        tested: DynBitSet::with_capacity(bsp.brushes().len()),
    };

    pass.trace_node(0);
    pass.position
}

struct TracePass<'a> {
    bsp: &'a BspData,
    position: Vector3<f32>,
    old_position: Vector3<f32>,
    radius: f32,
    tested: DynBitSet,
}

impl<'a> TracePass<'a> {
    fn trace_node(&mut self, index: i32) {
        if index < 0 {
            self.trace_leaf((!index) as usize);
            return;
        }

        let node = match self.bsp.nodes().get(index as usize) {
            Some(node) => node,
            None => return,
        };
        let plane = match self.bsp.planes().get(node.plane) {
            Some(plane) => plane,
            None => return,
        };

        let s = plane.point_dist(self.position);

        if s > -self.radius {
            self.trace_node(node.children[0]);
        }
        if s < self.radius {
            self.trace_node(node.children[1]);
        }
    }

    fn trace_leaf(&mut self, leaf_index: usize) {
        let leaf = match self.bsp.leaves().get(leaf_index) {
            Some(leaf) => leaf,
            None => return,
        };

        let (base, count) = leaf.leaf_brush;
        for i in base..base.saturating_add(count) {
            if let Some(&brush_index) = self.bsp.leaf_brushes().get(i) {
                if brush_index >= 0 {
                    self.trace_brush(brush_index as usize);
                }
            }
        }
    }

    /// Tests (at most once per trace, via `tested`) the sphere against one brush, pushing
    /// `self.position` out along the most-penetrated solid-shadered side if the sphere ends up
    /// inside the brush's convex hull.
    fn trace_brush(&mut self, index: usize) {
        if self.tested.test_and_set(index) {
            return;
        }

        let brush = match self.bsp.brushes().get(index) {
            Some(brush) => brush,
            None => return,
        };

        let brush_solid = self.bsp.shaders().get(brush.shader).map(|s| s.solid).unwrap_or(false);
        if !brush_solid {
            return;
        }

        let (base, count) = brush.brush_side;
        let mut pushing: Option<(Vector3<f32>, f32)> = None;

        for i in base..base.saturating_add(count) {
            let side = match self.bsp.brush_sides().get(i) {
                Some(side) => side,
                None => continue,
            };
            let plane = match self.bsp.planes().get(side.plane) {
                Some(plane) => plane,
                None => continue,
            };

            // Early-accept: this side cannot constrain the sphere's old position, so it neither
            // rejects the collision nor can be the pushing plane.
            if plane.point_dist(self.old_position) >= self.radius {
                continue;
            }

            let dist = plane.point_dist(self.position) - self.radius;
            if dist > 0.0 {
                // Sphere is entirely outside the brush along this plane: no collision at all.
                return;
            }

            let side_solid = self
                .bsp
                .shaders()
                .get(side.shader)
                .map(|s| s.solid)
                .unwrap_or(false);
            if !side_solid {
                continue;
            }

            if pushing.map_or(true, |(_, best)| dist > best) {
                pushing = Some((plane.normal(), dist));
            }
        }

        if let Some((normal, dist)) = pushing {
            self.position -= normal * dist;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::bsp::visibility::VisData;
    use crate::bsp::{
        BspBoundsInt, BspBrush, BspBrushSide, BspLeaf, BspNode, ContentsFlags, Shader, SurfaceFlags,
    };
    use crate::math::Hyperplane;

    fn solid_shader() -> Shader {
        Shader {
            name: "textures/solid".to_string(),
            contents: ContentsFlags::SOLID,
            surface: SurfaceFlags::empty(),
            render: true,
            transparent: false,
            solid: true,
            texture_missing: false,
        }
    }

    /// A single axis-aligned solid brush: the unit cube `[-1, 1]^3`, one leaf, one node splitting
    /// on `x = 0` so both brush-containing halves reach the same leaf.
    fn single_brush_scene() -> BspData {
        let shader = solid_shader();

        // Planes are outward-facing: `n . p - d <= 0` is inside.
        let planes = vec![
            Hyperplane::new(Vector3::new(1.0, 0.0, 0.0), 1.0),  // x <= 1
            Hyperplane::new(Vector3::new(-1.0, 0.0, 0.0), 1.0), // x >= -1
            Hyperplane::new(Vector3::new(0.0, 1.0, 0.0), 1.0),  // y <= 1
            Hyperplane::new(Vector3::new(0.0, -1.0, 0.0), 1.0), // y >= -1
            Hyperplane::new(Vector3::new(0.0, 0.0, 1.0), 1.0),  // z <= 1
            Hyperplane::new(Vector3::new(0.0, 0.0, -1.0), 1.0), // z >= -1
        ];

        let brush_sides: Vec<BspBrushSide> = (0..6)
            .map(|i| BspBrushSide { plane: i, shader: 0 })
            .collect();

        let brushes = vec![BspBrush {
            brush_side: (0, 6),
            shader: 0,
        }];

        let node_plane = Hyperplane::new(Vector3::new(1.0, 0.0, 0.0), 100.0); // always "inside" for |x|<100
        let mut all_planes = planes;
        all_planes.push(node_plane);
        let node_plane_index = all_planes.len() - 1;

        let nodes = vec![BspNode {
            plane: node_plane_index,
            children: [!0, !0],
            bounds: BspBoundsInt {
                min: [-100, -100, -100],
                max: [100, 100, 100],
            },
        }];

        let leaves = vec![BspLeaf {
            cluster: -1,
            area: 0,
            bounds: BspBoundsInt {
                min: [-100, -100, -100],
                max: [100, 100, 100],
            },
            leaf_face: (0, 0),
            leaf_brush: (0, 1),
        }];

        BspData::new(
            String::new(),
            vec![shader],
            all_planes,
            nodes,
            leaves,
            Vec::new(),
            vec![0],
            vec![crate::bsp::BspModel {
                bounds: crate::math::Aabb::new(
                    Vector3::new(-100.0, -100.0, -100.0),
                    Vector3::new(100.0, 100.0, 100.0),
                ),
                face: (0, 0),
                brush: (0, 1),
            }],
            brushes,
            brush_sides,
            Vec::new(),
            Vec::new(),
            Vec::new(),
            Vec::new(),
            Vec::new(),
            Vec::new(),
            [0, 0, 0],
            VisData::empty(),
            Vec::new(),
            3,
        )
    }

    #[test]
    fn test_empty_scene_leaves_position_unchanged() {
        let bsp = crate::bsp::test_fixtures::two_leaf_scene();
        let p = Vector3::new(1.0, 2.0, 3.0);
        assert_eq!(trace_world(&bsp, p, p, 0.5), p);
    }

    #[test]
    fn test_sphere_pushed_out_of_brush_along_shallowest_penetration() {
        let bsp = single_brush_scene();
        // Sphere of radius 0.5 starting well outside, ending just past the +x face (x=1) at x=1.2.
        let old_position = Vector3::new(5.0, 0.0, 0.0);
        let new_position = Vector3::new(1.2, 0.0, 0.0);

        let result = trace_world(&bsp, new_position, old_position, 0.5);

        // Penetration along x: dist = (1*1.2 - 1) - 0.5 = -0.3, so push out by 0.3 along +x.
        assert!((result.x - 1.5).abs() < 1.0e-4);
        assert_eq!(result.y, 0.0);
        assert_eq!(result.z, 0.0);
    }

    #[test]
    fn test_sphere_far_from_brush_is_unaffected() {
        let bsp = single_brush_scene();
        let p = Vector3::new(50.0, 50.0, 50.0);
        assert_eq!(trace_world(&bsp, p, p, 0.5), p);
    }
}
