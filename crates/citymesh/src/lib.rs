//! citymesh: archetype geometry synthesis and mesh export for generated cities.
//!
//! - Every developed parcel becomes one to three extruded quads (boxes) picked
//!   by its archetype: standard block, park, school or hospital.
//! - Roads become thin slabs following their centreline.
//! - Geometry is written either as Wavefront OBJ + MTL (Z-up, shared corner
//!   vertices, 1-based indices) or as glTF 2.0 (Y-up, flat-shaded, one mesh
//!   per material) in a `.gltf` + `.bin` pair or a single `.glb`.
//! - Both formats walk the same emission sequence, so for a given city the
//!   OBJ face count equals the glTF triangle count.
//!
//! OBJ layout:
//!   mtllib <name>.mtl            (only if the library was written)
//!   per emission:
//!     usemtl <material>
//!     per solid: 8 x "v x y z", 12 x "f a b c"
//!
//! glTF payload and GLB container layouts are documented in [`gltf`].

pub mod archetype;
pub mod city;
pub mod geometry;
pub mod gltf;
pub mod mesh_buffer;
pub mod obj;
pub mod palette;
pub mod paths;
pub mod summary;

pub use archetype::{synthesize, Archetype, Emission};
pub use city::{
    Block, Building, City, Facility, FacilityKind, RoadKind, RoadSegment, Zone, MAX_GRID_SIZE,
};
pub use geometry::{Rect, Solid};
pub use gltf::{read_glb, save_gltf, GltfContainer};
pub use mesh_buffer::{MeshAccumulator, MeshBuffer};
pub use obj::save_obj;
pub use palette::Material;
pub use summary::{save_summary, CitySummary};
