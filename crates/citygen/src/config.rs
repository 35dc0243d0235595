use citymesh::MAX_GRID_SIZE;
use clap::{Parser, ValueEnum};
use log::warn;
use std::path::PathBuf;

/// Dominant way residents get around; sets the road grid density.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum TransportMode {
    Car,
    #[value(alias = "public", alias = "public_transit")]
    Transit,
    #[value(alias = "pedestrian")]
    Walk,
}

impl TransportMode {
    /// Cells between neighbouring road lines.
    pub fn road_spacing(self) -> usize {
        match self {
            TransportMode::Car => 6,
            TransportMode::Transit => 5,
            TransportMode::Walk => 4,
        }
    }
}

impl std::fmt::Display for TransportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TransportMode::Car => "car",
            TransportMode::Transit => "transit",
            TransportMode::Walk => "walk",
        };

        f.write_str(s)
    }
}

/// Requested output, `all` meaning every mesh format at once.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Obj,
    Gltf,
    Glb,
    All,
}

/// A single mesh file kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MeshFormat {
    Obj,
    Gltf,
    Glb,
}

impl MeshFormat {
    pub fn extension(self) -> &'static str {
        match self {
            MeshFormat::Obj => "obj",
            MeshFormat::Gltf => "gltf",
            MeshFormat::Glb => "glb",
        }
    }

    /// Sibling files the exporter writes next to the main one.
    pub fn companions(self) -> &'static [&'static str] {
        match self {
            MeshFormat::Obj => &["mtl"],
            MeshFormat::Gltf => &["bin"],
            MeshFormat::Glb => &[],
        }
    }
}

impl ExportFormat {
    pub fn mesh_formats(self) -> &'static [MeshFormat] {
        match self {
            ExportFormat::Obj => &[MeshFormat::Obj],
            ExportFormat::Gltf => &[MeshFormat::Gltf],
            ExportFormat::Glb => &[MeshFormat::Glb],
            ExportFormat::All => &[MeshFormat::Obj, MeshFormat::Gltf, MeshFormat::Glb],
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ExportFormat::Obj => "obj",
            ExportFormat::Gltf => "gltf",
            ExportFormat::Glb => "glb",
            ExportFormat::All => "all",
        };

        f.write_str(s)
    }
}

/// `citygen` - procedural city generator and mesh exporter.
///
/// Builds a zoned city on a square grid (or loads one from JSON), then writes
/// it as OBJ, glTF or GLB together with a JSON statistics summary.
#[derive(Parser, Debug, Clone)]
#[command(name = "citygen", version, about, long_about = None)]
pub struct Config {
    /// RNG seed. The same seed and options always give the same city.
    #[arg(long, env = "CITYGEN_SEED", default_value_t = 0)]
    pub seed: u64,

    /// Number of inhabitants; drives the minimum amount of green space.
    #[arg(long, env = "CITYGEN_POPULATION", default_value_t = 100_000)]
    pub population: u64,

    /// Width and height of the zoning grid in cells (10 to 8192).
    #[arg(long, env = "CITYGEN_GRID_SIZE", default_value_t = 100)]
    pub grid_size: usize,

    /// Diameter of the urban disc as a fraction of the grid size, in (0, 1].
    #[arg(long, env = "CITYGEN_RADIUS_FRACTION", default_value_t = 0.8)]
    pub radius_fraction: f64,

    /// Number of hospitals to place.
    #[arg(long, env = "CITYGEN_HOSPITALS", default_value_t = 1)]
    pub hospitals: usize,

    /// Number of schools to place.
    #[arg(long, env = "CITYGEN_SCHOOLS", default_value_t = 1)]
    pub schools: usize,

    /// Minimum green space per inhabitant in square metres (one cell is 100 m x 100 m).
    #[arg(long, env = "CITYGEN_GREEN_M2_PER_CAPITA", default_value_t = 8.0)]
    pub green_m2_per_capita: f64,

    /// Primary transport mode.
    #[arg(
        long,
        value_enum,
        ignore_case = true,
        env = "CITYGEN_TRANSPORT",
        default_value_t = TransportMode::Car
    )]
    pub transport: TransportMode,

    /// Mesh format to write.
    #[arg(
        long,
        value_enum,
        ignore_case = true,
        env = "CITYGEN_FORMAT",
        default_value_t = ExportFormat::Obj
    )]
    pub format: ExportFormat,

    /// Directory receiving all outputs; created if missing.
    #[arg(long, env = "CITYGEN_OUTPUT")]
    pub output: PathBuf,

    /// File stem shared by every output file.
    #[arg(long, env = "CITYGEN_PREFIX", default_value = "city")]
    pub prefix: String,

    /// Export this JSON city instead of generating one.
    #[arg(long, env = "CITYGEN_CITY")]
    pub city: Option<PathBuf>,

    /// Also write the city itself as `<prefix>_city.json`.
    #[arg(long, default_value_t = false)]
    pub save_city: bool,
}

pub const MIN_GRID_SIZE: usize = 10;
pub const FALLBACK_RADIUS_FRACTION: f64 = 0.1;

impl Config {
    /// Clamp out-of-range values into something the generator can use.
    pub fn normalize(&mut self) {
        if self.grid_size < MIN_GRID_SIZE {
            warn!("grid size {} raised to {}", self.grid_size, MIN_GRID_SIZE);
            self.grid_size = MIN_GRID_SIZE;
        } else if self.grid_size > MAX_GRID_SIZE {
            warn!("grid size {} capped at {}", self.grid_size, MAX_GRID_SIZE);
            self.grid_size = MAX_GRID_SIZE;
        }

        // NaN falls into the first branch too.
        if !(self.radius_fraction > 0.0) {
            warn!(
                "radius fraction {} replaced by {}",
                self.radius_fraction, FALLBACK_RADIUS_FRACTION
            );
            self.radius_fraction = FALLBACK_RADIUS_FRACTION;
        } else if self.radius_fraction > 1.0 {
            warn!("radius fraction {} capped at 1", self.radius_fraction);
            self.radius_fraction = 1.0;
        }

        if !(self.green_m2_per_capita >= 0.0) {
            warn!("green space per capita {} set to 0", self.green_m2_per_capita);
            self.green_m2_per_capita = 0.0;
        }
    }
}
