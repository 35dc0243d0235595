//! Deterministic procedural city layout.
//!
//! Pipeline: noise zoning inside the urban disc, minimum green space,
//! road grid, facility placement, one building per developed cell.

use crate::config::{Config, TransportMode};
use citymesh::{Block, Building, City, Facility, FacilityKind, Rect, RoadKind, RoadSegment, Zone};
use log::debug;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// One grid cell covers 100 m x 100 m.
pub const CELL_AREA_M2: f64 = 10_000.0;

/// Gap left between a building and the edge of its cell.
const STREET_MARGIN: f64 = 0.1;

const NOISE_OCTAVES: u32 = 4;

#[inline]
fn hash_noise(x: u32, y: u32, seed: u32) -> f64 {
    let mut h = x
        .wrapping_mul(374_761_393)
        .wrapping_add(y.wrapping_mul(668_265_263));
    h ^= seed
        .wrapping_add(0x9e37_79b9)
        .wrapping_add(h << 6)
        .wrapping_add(h >> 2);
    h ^= h >> 17;
    h = h.wrapping_mul(0xed5a_d4bb);
    h ^= h >> 11;
    h = h.wrapping_mul(0xac4c_1b51);
    h ^= h >> 15;

    (h & 0x00ff_ffff) as f64 / 16_777_216.0
}

/// Octave sum of [`hash_noise`], normalised to [0, 1).
fn fractal_noise(x: u32, y: u32, seed: u32) -> f64 {
    let mut total = 0.0;
    let mut amplitude = 1.0;
    let mut amplitude_sum = 0.0;

    for octave in 0..NOISE_OCTAVES {
        let sx = x << octave;
        let sy = y << octave;
        total += amplitude * hash_noise(sx, sy, seed.wrapping_add(octave * 17));
        amplitude_sum += amplitude;
        amplitude *= 0.5;
    }

    total / amplitude_sum
}

fn zone_for_noise(value: f64, rng: &mut StdRng) -> (Zone, i32) {
    if value < 0.55 {
        (Zone::Residential, rng.gen_range(2..=6))
    } else if value < 0.75 {
        (Zone::Commercial, rng.gen_range(5..=20))
    } else if value < 0.90 {
        (Zone::Industrial, rng.gen_range(3..=6))
    } else {
        (Zone::Green, 0)
    }
}

/// Urban disc centred on the grid.
#[derive(Debug, Clone, Copy)]
struct Disc {
    centre: f64,
    radius: f64,
}

impl Disc {
    fn new(size: usize, radius_fraction: f64) -> Self {
        Self {
            centre: size as f64 / 2.0,
            radius: size as f64 * radius_fraction / 2.0,
        }
    }

    fn contains_cell(&self, x: usize, y: usize) -> bool {
        let dx = x as f64 + 0.5 - self.centre;
        let dy = y as f64 + 0.5 - self.centre;
        (dx * dx + dy * dy).sqrt() <= self.radius
    }

    /// Half length of the chord at `offset` from the centre, if it crosses the disc.
    fn half_chord(&self, offset: f64) -> Option<f64> {
        let d = offset.abs();
        (d < self.radius).then(|| (self.radius * self.radius - d * d).sqrt())
    }
}

/// Road lines along cell centres; the layout is the same on both axes.
#[derive(Debug, Clone)]
struct RoadGrid {
    /// `lines[i]` is the road kind running through row/column `i`, if any.
    lines: Vec<Option<RoadKind>>,
}

impl RoadGrid {
    fn new(size: usize, transport: TransportMode) -> Self {
        let spacing = transport.road_spacing();
        let mid = size / 2;

        let lines = (0..size)
            .map(|i| {
                let offset = i.abs_diff(mid);
                if offset % spacing != 0 {
                    return None;
                }
                Some(match offset / spacing {
                    0 => RoadKind::Arterial,
                    k if k % 2 == 0 => RoadKind::Secondary,
                    _ => RoadKind::Local,
                })
            })
            .collect();

        Self { lines }
    }

    #[inline]
    fn is_road_cell(&self, x: usize, y: usize) -> bool {
        self.lines[x].is_some() || self.lines[y].is_some()
    }

    fn indices(&self) -> impl Iterator<Item = (usize, RoadKind)> + '_ {
        self.lines
            .iter()
            .enumerate()
            .filter_map(|(i, kind)| kind.map(|k| (i, k)))
    }

    /// How far the widest road along cell `i`'s neighbours spills over the cell edge.
    fn overhang(&self, i: usize) -> f64 {
        let before = i.checked_sub(1).and_then(|j| self.lines[j]);
        let after = self.lines.get(i + 1).copied().flatten();

        [before, after]
            .into_iter()
            .flatten()
            .map(|kind| (kind.half_width() - 0.5).max(0.0))
            .fold(0.0, f64::max)
    }

    /// Centreline segments clipped to the disc.
    fn segments(&self, disc: &Disc) -> Vec<RoadSegment> {
        let mut roads = Vec::new();

        for (i, kind) in self.indices() {
            let along = i as f64 + 0.5;
            let Some(half) = disc.half_chord(along - disc.centre) else {
                continue;
            };
            let (lo, hi) = (disc.centre - half, disc.centre + half);

            roads.push(RoadSegment::new([along, lo], [along, hi], kind));
            roads.push(RoadSegment::new([lo, along], [hi, along], kind));
        }

        roads
    }

    /// Rectangles between consecutive road lines whose centre lies in the disc.
    fn blocks(&self, size: usize, disc: &Disc) -> Vec<Block> {
        let mut cuts: Vec<f64> = vec![0.0];
        for (i, _) in self.indices() {
            cuts.push(i as f64);
            cuts.push(i as f64 + 1.0);
        }
        cuts.push(size as f64);

        let spans: Vec<(f64, f64)> = cuts
            .chunks_exact(2)
            .map(|c| (c[0], c[1]))
            .filter(|(a, b)| b > a)
            .collect();

        let mut blocks = Vec::new();
        for &(y0, y1) in &spans {
            for &(x0, x1) in &spans {
                let bounds = Rect::new(x0, y0, x1, y1);
                let [cx, cy] = bounds.center();
                let (dx, dy) = (cx - disc.centre, cy - disc.centre);
                if (dx * dx + dy * dy).sqrt() <= disc.radius {
                    blocks.push(Block { bounds });
                }
            }
        }

        blocks
    }
}

/// Convert shuffled residential/industrial cells to green until the target is met.
fn enforce_green(zones: &mut [Zone], heights: &mut [i32], target: usize, rng: &mut StdRng) {
    let current = zones.iter().filter(|z| **z == Zone::Green).count();
    if current >= target {
        return;
    }

    let mut candidates: Vec<usize> = zones
        .iter()
        .enumerate()
        .filter(|(_, z)| matches!(z, Zone::Residential | Zone::Industrial))
        .map(|(i, _)| i)
        .collect();
    candidates.shuffle(rng);

    let needed = target - current;
    for &i in candidates.iter().take(needed) {
        zones[i] = Zone::Green;
        heights[i] = 0;
    }

    debug!(
        "green cells: {} -> {} (target {})",
        current,
        current + needed.min(candidates.len()),
        target
    );
}

pub fn green_target(population: u64, m2_per_capita: f64) -> usize {
    (population as f64 * m2_per_capita / CELL_AREA_M2).ceil() as usize
}

/// Build a city from `config`; call [`Config::normalize`] first.
pub fn generate(config: &Config) -> City {
    let size = config.grid_size;
    let disc = Disc::new(size, config.radius_fraction);
    let noise_seed = config.seed as u32;
    let mut rng = StdRng::seed_from_u64(config.seed);

    let mut city = City::new(size);
    let mut heights = vec![0i32; size * size];

    for y in 0..size {
        for x in 0..size {
            if !disc.contains_cell(x, y) {
                continue;
            }
            let value = fractal_noise(x as u32, y as u32, noise_seed);
            let (zone, height) = zone_for_noise(value, &mut rng);

            let idx = y * size + x;
            city.zones[idx] = zone;
            heights[idx] = height;
        }
    }

    let target = green_target(config.population, config.green_m2_per_capita);
    enforce_green(&mut city.zones, &mut heights, target, &mut rng);

    let grid = RoadGrid::new(size, config.transport);

    // Hospitals take the first shuffled sites, schools the next ones.
    let mut sites: Vec<usize> = (0..size * size)
        .filter(|&i| matches!(city.zones[i], Zone::Residential | Zone::Commercial))
        .filter(|&i| !grid.is_road_cell(i % size, i / size))
        .collect();
    sites.shuffle(&mut rng);

    let mut facility_at = vec![None; size * size];
    let kinds = std::iter::repeat(FacilityKind::Hospital)
        .take(config.hospitals)
        .chain(std::iter::repeat(FacilityKind::School).take(config.schools));
    for (&i, kind) in sites.iter().zip(kinds) {
        facility_at[i] = Some(kind);
        city.facilities.push(Facility {
            x: (i % size) as f64 + 0.5,
            y: (i / size) as f64 + 0.5,
            kind,
        });
    }

    for y in 0..size {
        for x in 0..size {
            let idx = y * size + x;
            let zone = city.zones[idx];
            if zone == Zone::None || grid.is_road_cell(x, y) {
                continue;
            }

            let margin = STREET_MARGIN + grid.overhang(x).max(grid.overhang(y));
            let cell = Rect::new(x as f64, y as f64, x as f64 + 1.0, y as f64 + 1.0);

            let mut building = Building::new(cell.inset(margin), zone, heights[idx]);
            building.facility = facility_at[idx];
            city.buildings.push(building);
        }
    }

    city.roads = grid.segments(&disc);
    city.blocks = grid.blocks(size, &disc);

    debug!(
        "generated {}x{} city: {} buildings, {} facilities, {} roads, {} blocks",
        size,
        size,
        city.buildings.len(),
        city.facilities.len(),
        city.roads.len(),
        city.blocks.len()
    );

    city
}
