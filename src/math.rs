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

use cgmath::{InnerSpace, Vector3, Vector4};

/// A plane in Hessian normal form: `n . p - dist = 0`.
///
/// Unlike the axis-aligned optimization used for Quake 1's render/collision hulls, IBSP planes
/// are stored as arbitrary normals and read back that way; there is no axis-snapped fast path
/// here, since id Tech 3 compilers do not emit one.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Hyperplane {
    normal: Vector3<f32>,
    dist: f32,
}

impl Hyperplane {
    pub fn new(normal: Vector3<f32>, dist: f32) -> Hyperplane {
        Hyperplane { normal, dist }
    }

    pub fn normal(&self) -> Vector3<f32> {
        self.normal
    }

    pub fn dist(&self) -> f32 {
        self.dist
    }

    /// Signed distance from `point` to this plane. Positive means in front of the plane (in the
    /// direction of the normal).
    #[inline]
    pub fn point_dist(&self, point: Vector3<f32>) -> f32 {
        self.normal.dot(point) - self.dist
    }

    /// Whether the given unit normal is close enough to unit length to be trusted as-is.
    pub fn normal_is_unit(normal: Vector3<f32>) -> bool {
        (normal.magnitude2() - 1.0).abs() < 1.0e-3
    }
}

/// One of the six planes of a view frustum, in `(normal, dist)` form satisfying
/// `n . p + dist > 0` for points inside the half-space the plane bounds.
///
/// This is deliberately a distinct type from [`Hyperplane`]: frustum planes are derived from a
/// row of a projection matrix rather than loaded from a BSP plane lump, and use the `+dist`
/// convention that falls out of that derivation rather than the `-dist` convention BSP planes
/// use.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FrustumPlane {
    pub normal: Vector3<f32>,
    pub dist: f32,
}

impl FrustumPlane {
    pub fn from_row(row: Vector4<f32>) -> FrustumPlane {
        let normal = Vector3::new(row.x, row.y, row.z);
        let len = normal.magnitude();
        FrustumPlane {
            normal: normal / len,
            dist: row.w / len,
        }
    }

    #[inline]
    pub fn point_dist(&self, point: Vector3<f32>) -> f32 {
        self.normal.dot(point) + self.dist
    }
}

/// Axis-aligned bounding box.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vector3<f32>,
    pub max: Vector3<f32>,
}

impl Aabb {
    pub fn new(min: Vector3<f32>, max: Vector3<f32>) -> Aabb {
        Aabb { min, max }
    }

    pub fn contains_point(&self, p: Vector3<f32>) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    /// The "positive vertex" with respect to `normal`: the corner most in the direction of the
    /// normal. Used by the frustum's AABB test (see [`crate::bsp::frustum`]).
    pub fn positive_vertex(&self, normal: Vector3<f32>) -> Vector3<f32> {
        Vector3::new(
            if normal.x >= 0.0 { self.max.x } else { self.min.x },
            if normal.y >= 0.0 { self.max.y } else { self.min.y },
            if normal.z >= 0.0 { self.max.z } else { self.min.z },
        )
    }
}
