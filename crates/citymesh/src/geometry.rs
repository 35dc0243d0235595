//! Planar rectangles and extruded solids.
//!
//! All geometry here lives in the synthesizer's native axes: X and Y span the
//! ground plane, Z points up. [`to_y_up`] is the only place that knows about
//! the glTF convention.

use serde::{Deserialize, Serialize};

pub type Point2 = [f64; 2];
pub type Point3 = [f64; 3];

/// Largest fraction of the shorter side an inset may remove from each edge.
pub const MAX_INSET_FRACTION: f64 = 0.49;

/// Axis-aligned rectangle on the ground plane.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl Rect {
    #[inline]
    pub const fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    #[inline]
    pub fn center(&self) -> Point2 {
        [(self.x0 + self.x1) * 0.5, (self.y0 + self.y1) * 0.5]
    }

    #[inline]
    pub fn min_side(&self) -> f64 {
        self.width().min(self.height())
    }

    /// Rectangle of the given size centred on `center`.
    #[inline]
    pub fn centered(center: Point2, width: f64, height: f64) -> Self {
        Self {
            x0: center[0] - width * 0.5,
            y0: center[1] - height * 0.5,
            x1: center[0] + width * 0.5,
            y1: center[1] + height * 0.5,
        }
    }

    /// Shrink every edge by `amount`, clamped to [`MAX_INSET_FRACTION`] of the
    /// shorter side so the result can never invert.
    pub fn inset(&self, amount: f64) -> Self {
        // Malformed (already inverted) input must not make the clamp range empty.
        let max_inset = (self.min_side() * MAX_INSET_FRACTION).max(0.0);
        let applied = amount.max(0.0).min(max_inset);

        Self {
            x0: self.x0 + applied,
            y0: self.y0 + applied,
            x1: self.x1 - applied,
            y1: self.y1 - applied,
        }
    }

    #[inline]
    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        Self {
            x0: self.x0 + dx,
            y0: self.y0 + dy,
            x1: self.x1 + dx,
            y1: self.y1 + dy,
        }
    }

    /// True when `other` lies within `self` (edges may touch).
    #[inline]
    pub fn contains(&self, other: &Rect) -> bool {
        other.x0 >= self.x0 && other.y0 >= self.y0 && other.x1 <= self.x1 && other.y1 <= self.y1
    }

    /// Corners in counter-clockwise order (seen from +Z), starting at the min corner.
    #[inline]
    pub fn corners(&self) -> [Point2; 4] {
        [
            [self.x0, self.y0],
            [self.x1, self.y0],
            [self.x1, self.y1],
            [self.x0, self.y1],
        ]
    }
}

/// A planar quadrilateral base extruded straight up from `base_z` to `top_z`.
///
/// The base must be wound counter-clockwise when seen from above; the triangle
/// table then yields outward-facing triangles for all six faces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Solid {
    pub base: [Point2; 4],
    pub base_z: f64,
    pub top_z: f64,
}

/// One triangle of a solid together with its flat face normal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub vertices: [Point3; 3],
    pub normal: Point3,
}

impl Solid {
    pub const VERTEX_COUNT: usize = 8;
    pub const TRIANGLE_COUNT: usize = 12;

    /// Indices into [`Solid::corners`]: bottom, top, then one pair per side
    /// (side `i` runs along base edge `i -> i+1`).
    pub const TRIANGLES: [[usize; 3]; 12] = [
        [0, 2, 1],
        [0, 3, 2],
        [4, 5, 6],
        [4, 6, 7],
        [0, 1, 5],
        [0, 5, 4],
        [1, 2, 6],
        [1, 6, 5],
        [2, 3, 7],
        [2, 7, 6],
        [3, 0, 4],
        [3, 4, 7],
    ];

    #[inline]
    pub fn from_rect(rect: &Rect, base_z: f64, top_z: f64) -> Self {
        Self {
            base: rect.corners(),
            base_z,
            top_z,
        }
    }

    /// Bottom ring followed by the top ring.
    pub fn corners(&self) -> [Point3; 8] {
        let b = &self.base;
        [
            [b[0][0], b[0][1], self.base_z],
            [b[1][0], b[1][1], self.base_z],
            [b[2][0], b[2][1], self.base_z],
            [b[3][0], b[3][1], self.base_z],
            [b[0][0], b[0][1], self.top_z],
            [b[1][0], b[1][1], self.top_z],
            [b[2][0], b[2][1], self.top_z],
            [b[3][0], b[3][1], self.top_z],
        ]
    }

    /// Outward normal of the side face along base edge `edge`.
    fn side_normal(&self, edge: usize) -> Point3 {
        let a = self.base[edge];
        let b = self.base[(edge + 1) % 4];
        let dx = b[0] - a[0];
        let dy = b[1] - a[1];
        let len = (dx * dx + dy * dy).sqrt();

        if len < 1e-12 {
            // Zero-length edge: the face has no area, any unit vector will do.
            return [0.0, 0.0, 1.0];
        }

        [dy / len, -dx / len, 0.0]
    }

    /// All twelve triangles with flat per-face normals.
    pub fn triangles(&self) -> [Triangle; 12] {
        let corners = self.corners();

        std::array::from_fn(|i| {
            let [a, b, c] = Self::TRIANGLES[i];
            let normal = match i / 2 {
                0 => [0.0, 0.0, -1.0],
                1 => [0.0, 0.0, 1.0],
                face => self.side_normal(face - 2),
            };

            Triangle {
                vertices: [corners[a], corners[b], corners[c]],
                normal,
            }
        })
    }
}

/// Map ground-plane coordinates (Z up) into the Y-up output convention.
///
/// This swaps two axes and therefore mirrors the scene; callers that keep
/// triangle winding meaningful must reverse it after remapping.
#[inline]
pub fn to_y_up(p: Point3) -> Point3 {
    [p[0], p[2], p[1]]
}
