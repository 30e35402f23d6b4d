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

//! View frustum extraction and culling — `SPEC_FULL.md` §4.E.
//!
//! Mirrors the plane-extraction-from-matrix-rows technique `client::render::world::Camera` uses
//! for its `clipping_planes`, generalized from a hard-coded 6-field struct to an indexable array
//! so the AABB test can loop over planes.

use cgmath::{Matrix4, Vector3};

use crate::math::{Aabb, FrustumPlane};

/// The six planes of a view frustum, extracted from a combined projection * view matrix.
#[derive(Copy, Clone, Debug)]
pub struct Frustum {
    planes: [FrustumPlane; 6],
}

impl Frustum {
    /// Extracts the six frustum planes from `view_projection`, in the order
    /// left, right, bottom, top, near, far.
    pub fn from_view_projection(view_projection: Matrix4<f32>) -> Frustum {
        // cgmath::Matrix4 is column-major; `row(i)` gives us row i as a Vector4.
        let row_x = view_projection.row(0);
        let row_y = view_projection.row(1);
        let row_z = view_projection.row(2);
        let row_w = view_projection.row(3);

        Frustum {
            planes: [
                FrustumPlane::from_row(row_w + row_x), // left
                FrustumPlane::from_row(row_w - row_x), // right
                FrustumPlane::from_row(row_w + row_y), // bottom
                FrustumPlane::from_row(row_w - row_y), // top
                FrustumPlane::from_row(row_w + row_z), // near
                FrustumPlane::from_row(row_w - row_z), // far
            ],
        }
    }

    pub fn planes(&self) -> &[FrustumPlane; 6] {
        &self.planes
    }

    /// A point is inside the frustum iff it is on the positive side of all six planes.
    pub fn contains_point(&self, point: Vector3<f32>) -> bool {
        self.planes.iter().all(|p| p.point_dist(point) > 0.0)
    }

    /// An AABB intersects the frustum iff, for every plane, the AABB's "positive vertex" (the
    /// corner furthest along the plane's normal) is on the positive side. This is the standard
    /// p-vertex test: it can return `true` for a sliver AABB whose corners straddle the frustum
    /// without any interior overlap (a false positive), but it never returns `false` for an AABB
    /// that does intersect (no false negatives), which is the property BSP culling needs.
    pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        self.planes.iter().all(|p| {
            let pv = aabb.positive_vertex(p.normal);
            p.point_dist(pv) > 0.0
        })
    }
}
