//! The fixed material palette shared by both output formats.

use crate::city::Zone;

/// Surface parameters of one palette entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialDef {
    pub base_color: [f32; 3],
    /// Specular scale (MTL `Ks`).
    pub specular: f32,
    /// MTL `Ns` exponent.
    pub shininess: f32,
    pub metallic: f32,
    pub roughness: f32,
}

/// Palette entries in their canonical order. The order is part of the output
/// contract: glTF material indices are assigned by walking it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Material {
    Default,
    Commercial,
    Residential,
    Industrial,
    Green,
    Road,
}

impl Material {
    pub const ALL: [Material; 6] = [
        Material::Default,
        Material::Commercial,
        Material::Residential,
        Material::Industrial,
        Material::Green,
        Material::Road,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Material::Default => "mat_default",
            Material::Commercial => "mat_commercial",
            Material::Residential => "mat_residential",
            Material::Industrial => "mat_industrial",
            Material::Green => "mat_green",
            Material::Road => "mat_road",
        }
    }

    pub fn def(self) -> MaterialDef {
        let (base_color, specular, shininess, metallic, roughness) = match self {
            Material::Default => ([0.7, 0.7, 0.7], 0.05, 32.0, 0.0, 0.6),
            // glassy grey
            Material::Commercial => ([0.6, 0.65, 0.72], 0.5, 96.0, 0.05, 0.35),
            // warm tones
            Material::Residential => ([0.83, 0.72, 0.62], 0.08, 48.0, 0.0, 0.55),
            Material::Industrial => ([0.32, 0.34, 0.36], 0.04, 24.0, 0.02, 0.75),
            Material::Green => ([0.3, 0.62, 0.34], 0.02, 12.0, 0.0, 0.7),
            // asphalt
            Material::Road => ([0.15, 0.15, 0.15], 0.02, 12.0, 0.0, 0.8),
        };

        MaterialDef {
            base_color,
            specular,
            shininess,
            metallic,
            roughness,
        }
    }

    /// Material for buildings of a zone; anything unmapped falls back to
    /// [`Material::Default`].
    pub fn for_zone(zone: Zone) -> Self {
        match zone {
            Zone::Commercial => Material::Commercial,
            Zone::Residential => Material::Residential,
            Zone::Industrial => Material::Industrial,
            Zone::Green => Material::Green,
            Zone::None => Material::Default,
        }
    }
}

impl std::fmt::Display for Material {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
