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

//! Quadratic Bézier patch tessellation (`SPEC_FULL.md` §4.C).
//!
//! A Patch face's control grid decomposes into a regular grid of 3x3 biquadratic sub-patches.
//! Each sub-patch is evaluated independently at a fixed subdivision level and shares one global
//! index strip, since every sub-patch at a given level has identical topology.

use crate::bsp::BspVertex;

/// One tessellated sub-patch: its vertices (in the scene's global vertex array, appended during
/// load) and the base vertex offset the shared index strip should be applied relative to.
#[derive(Clone, Debug)]
pub struct Tessellation {
    pub vertex: (usize, usize),
}

/// Evaluates the quadratic Bernstein basis `{(1-t)^2, 2t(1-t), t^2}` at `t`.
fn bernstein_quadratic(t: f32) -> [f32; 3] {
    let inv = 1.0 - t;
    [inv * inv, 2.0 * t * inv, t * t]
}

/// Tensor-product evaluation of a 3x3 control grid at parameter `(u, v)`.
///
/// `controls` is row-major: `controls[row * 3 + col]`.
pub fn evaluate(controls: &[BspVertex; 9], u: f32, v: f32) -> BspVertex {
    let bu = bernstein_quadratic(u);
    let bv = bernstein_quadratic(v);

    let mut rows = [None, None, None];
    for row in 0..3 {
        let mut acc = controls[row * 3] * bu[0];
        acc = acc + controls[row * 3 + 1] * bu[1];
        acc = acc + controls[row * 3 + 2] * bu[2];
        rows[row] = Some(acc);
    }

    let mut acc = rows[0].unwrap() * bv[0];
    acc = acc + rows[1].unwrap() * bv[1];
    acc = acc + rows[2].unwrap() * bv[2];
    acc
}

/// Tessellates a single 3x3 control grid at subdivision level `level`, returning `(level+1)^2`
/// vertices in row-major `(i, j)` order (`i` varying fastest).
pub fn tessellate(controls: &[BspVertex; 9], level: u32) -> Vec<BspVertex> {
    let l = level as usize;
    let mut out = Vec::with_capacity((l + 1) * (l + 1));

    for j in 0..=l {
        let v = j as f32 / l as f32;
        for i in 0..=l {
            let u = i as f32 / l as f32;
            out.push(evaluate(controls, u, v));
        }
    }

    out
}

/// Builds the shared triangle-index strip for one sub-patch tessellated at `level`: an `L x L`
/// grid of cells, each cell split into two triangles. Every sub-patch at this scene's
/// subdivision level reuses this exact strip, offset by its own vertex base.
pub fn index_strip(level: u32) -> Vec<u16> {
    let l = level as usize;
    let stride = l + 1;
    let mut out = Vec::with_capacity(6 * l * l);

    for j in 0..l {
        for i in 0..l {
            let tl = (j * stride + i) as u16;
            let tr = (j * stride + i + 1) as u16;
            let bl = ((j + 1) * stride + i) as u16;
            let br = ((j + 1) * stride + i + 1) as u16;

            out.push(tl);
            out.push(tr);
            out.push(br);

            out.push(br);
            out.push(bl);
            out.push(tl);
        }
    }

    out
}

/// Number of 3x3 sub-patches a `(w, h)` control grid decomposes into, per `SPEC_FULL.md` §4.C.
/// Both `w` and `h` must be odd; returns `None` otherwise.
pub fn sub_patch_grid(w: usize, h: usize) -> Option<(usize, usize)> {
    if w % 2 == 0 || h % 2 == 0 || w < 3 || h < 3 {
        return None;
    }
    Some(((w - 1) / 2, (h - 1) / 2))
}

/// Extracts the 3x3 control grid for sub-patch `(n, m)` out of a full `(w, h)` control grid
/// stored row-major in `controls`.
pub fn sub_patch_controls(
    controls: &[BspVertex],
    w: usize,
    n: usize,
    m: usize,
) -> [BspVertex; 9] {
    let mut out = [controls[0]; 9];
    for row in 0..3 {
        for col in 0..3 {
            let src_row = 2 * m + row;
            let src_col = 2 * n + col;
            out[row * 3 + col] = controls[src_row * w + src_col];
        }
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;
    use cgmath::Vector3;

    fn flat_vertex(x: f32, y: f32) -> BspVertex {
        BspVertex {
            position: Vector3::new(x, y, 0.0),
            tex_uv: [0.0, 0.0],
            lm_uv: [0.0, 0.0],
            normal: Vector3::new(0.0, 0.0, 1.0),
            color: [255, 255, 255, 255],
        }
    }

    fn identical_controls(p: BspVertex) -> [BspVertex; 9] {
        [p; 9]
    }

    #[test]
    fn test_evaluate_corners_match_controls() {
        let mut controls = [flat_vertex(0.0, 0.0); 9];
        controls[0] = flat_vertex(0.0, 0.0); // (0,0)
        controls[2] = flat_vertex(2.0, 0.0); // (2,0)
        controls[6] = flat_vertex(0.0, 2.0); // (0,2)
        controls[8] = flat_vertex(2.0, 2.0); // (2,2)

        assert_eq!(evaluate(&controls, 0.0, 0.0).position, controls[0].position);
        assert_eq!(evaluate(&controls, 1.0, 0.0).position, controls[2].position);
        assert_eq!(evaluate(&controls, 0.0, 1.0).position, controls[6].position);
        assert_eq!(evaluate(&controls, 1.0, 1.0).position, controls[8].position);
    }

    #[test]
    fn test_evaluate_midpoint_formula() {
        // Biquadratic midpoint: 0.25 * (C00 + 2C01 + C02 + 2C10 + 4C11 + 2C12 + C20 + 2C21 + C22) / 4
        let mut controls = [flat_vertex(0.0, 0.0); 9];
        for (idx, c) in controls.iter_mut().enumerate() {
            *c = flat_vertex(idx as f32, (idx * 2) as f32);
        }

        let weights = [1.0, 2.0, 1.0, 2.0, 4.0, 2.0, 1.0, 2.0, 1.0];
        let sum_x: f32 = controls
            .iter()
            .zip(weights.iter())
            .map(|(c, w)| c.position.x * w)
            .sum();
        let sum_y: f32 = controls
            .iter()
            .zip(weights.iter())
            .map(|(c, w)| c.position.y * w)
            .sum();
        let expected_x = sum_x / 16.0;
        let expected_y = sum_y / 16.0;

        let mid = evaluate(&controls, 0.5, 0.5);
        assert!((mid.position.x - expected_x).abs() < 1.0e-4);
        assert!((mid.position.y - expected_y).abs() < 1.0e-4);
    }

    #[test]
    fn test_tessellate_identical_controls_are_coincident() {
        let controls = identical_controls(flat_vertex(1.0, 1.0));
        let verts = tessellate(&controls, 3);
        assert_eq!(verts.len(), 16);
        for v in &verts {
            assert_eq!(v.position, controls[0].position);
        }
    }

    #[test]
    fn test_index_strip_count() {
        let strip = index_strip(3);
        assert_eq!(strip.len(), 6 * 9);
    }

    #[test]
    fn test_sub_patch_grid_rejects_even() {
        assert_eq!(sub_patch_grid(4, 5), None);
        assert_eq!(sub_patch_grid(5, 5), Some((2, 2)));
    }
}
