//! Per-material triangle soup for the glTF path.
//!
//! Every triangle gets three fresh vertices carrying its flat normal, so the
//! buffers never share vertices between faces.

use crate::archetype::synthesize;
use crate::city::City;
use crate::geometry::{to_y_up, Point3, Solid};
use crate::palette::Material;
use std::collections::BTreeMap;

/// Axis-aligned bounds of the stored (`f32`) positions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl Bounds {
    #[inline]
    fn point(p: [f32; 3]) -> Self {
        Self { min: p, max: p }
    }

    #[inline]
    fn include(&mut self, p: [f32; 3]) {
        for axis in 0..3 {
            self.min[axis] = self.min[axis].min(p[axis]);
            self.max[axis] = self.max[axis].max(p[axis]);
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MeshBuffer {
    positions: Vec<f32>,
    normals: Vec<f32>,
    indices: Vec<u32>,
    bounds: Option<Bounds>,
}

#[inline]
fn to_f32(p: Point3) -> [f32; 3] {
    [p[0] as f32, p[1] as f32, p[2] as f32]
}

impl MeshBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flat `x, y, z` triples.
    #[inline]
    pub fn positions(&self) -> &[f32] {
        &self.positions
    }

    #[inline]
    pub fn normals(&self) -> &[f32] {
        &self.normals
    }

    #[inline]
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// `None` until the first vertex is pushed.
    #[inline]
    pub fn bounds(&self) -> Option<Bounds> {
        self.bounds
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    fn push_vertex(&mut self, position: [f32; 3], normal: [f32; 3]) -> u32 {
        let index = self.vertex_count() as u32;

        self.positions.extend_from_slice(&position);
        self.normals.extend_from_slice(&normal);

        match self.bounds.as_mut() {
            Some(bounds) => bounds.include(position),
            None => self.bounds = Some(Bounds::point(position)),
        }

        index
    }

    /// Append one triangle already expressed in output axes.
    pub fn push_triangle(&mut self, vertices: [Point3; 3], normal: Point3) {
        let n = to_f32(normal);

        for p in vertices {
            let index = self.push_vertex(to_f32(p), n);
            self.indices.push(index);
        }
    }

    /// Append the twelve triangles of `solid`, remapped into Y-up axes.
    pub fn append_solid(&mut self, solid: &Solid) {
        for tri in solid.triangles() {
            let [a, b, c] = tri.vertices;
            // The axis swap mirrors the geometry; reversing the winding keeps faces outward.
            self.push_triangle([to_y_up(a), to_y_up(c), to_y_up(b)], to_y_up(tri.normal));
        }
    }
}

/// One [`MeshBuffer`] per material, created on first use.
#[derive(Debug, Clone, Default)]
pub struct MeshAccumulator {
    buffers: BTreeMap<Material, MeshBuffer>,
}

impl MeshAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the archetype synthesizer over `city` and batch by material.
    pub fn from_city(city: &City) -> Self {
        let mut acc = Self::new();

        for emission in synthesize(city) {
            let buffer = acc.buffer_for(emission.material);
            for solid in &emission.solids {
                buffer.append_solid(solid);
            }
        }

        acc
    }

    pub fn buffer_for(&mut self, material: Material) -> &mut MeshBuffer {
        self.buffers.entry(material).or_default()
    }

    pub fn get(&self, material: Material) -> Option<&MeshBuffer> {
        self.buffers.get(&material)
    }

    /// Non-empty buffers in palette order.
    pub fn iter(&self) -> impl Iterator<Item = (Material, &MeshBuffer)> + '_ {
        self.buffers
            .iter()
            .filter(|(_, buffer)| !buffer.is_empty())
            .map(|(material, buffer)| (*material, buffer))
    }

    pub fn triangle_count(&self) -> usize {
        self.buffers.values().map(MeshBuffer::triangle_count).sum()
    }
}
