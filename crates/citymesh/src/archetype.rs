//! Parametric archetypes: how each city entity turns into extruded solids.
//!
//! Both exporters consume [`synthesize`], so the OBJ and glTF outputs are
//! built from exactly the same solids.

use crate::city::{Building, City, FacilityKind, RoadSegment, Zone};
use crate::geometry::{Rect, Solid};
use crate::palette::Material;
use smallvec::SmallVec;

/// Road slabs are extruded to this thickness.
pub const ROAD_THICKNESS: f64 = 0.05;

/// Segments shorter than this have no usable direction and are skipped.
pub const MIN_ROAD_LENGTH: f64 = 1e-6;

const PARK_MARGIN: f64 = 0.08;
const PARK_PAD_HEIGHT: f64 = 0.08;
const PLANTER_SIZE_FRACTION: f64 = 0.2;
const PLANTER_MIN_SIZE: f64 = 0.2;
const PLANTER_MAX_FRACTION: f64 = 0.45;
const PLANTER_HEIGHT_FACTOR: f64 = 2.5;

const SCHOOL_MARGIN: f64 = 0.07;
const SCHOOL_FIELD_HEIGHT: f64 = 0.05;
const SCHOOL_EDGE_CLEARANCE: f64 = 0.05;
const SCHOOL_MIN_HEIGHT: f64 = 2.0;

const HOSPITAL_MARGIN: f64 = 0.08;
const HOSPITAL_MIN_PODIUM: f64 = 1.2;

/// At most three solids per building (hospital, park).
pub type Solids = SmallVec<[Solid; 3]>;

/// Architectural form chosen for a building.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Archetype {
    Standard,
    Park,
    School,
    Hospital,
}

impl Archetype {
    /// `None` for undeveloped parcels, which are never emitted.
    pub fn of(building: &Building) -> Option<Self> {
        match (building.zone, building.facility) {
            (Zone::None, _) => None,
            (Zone::Green, _) => Some(Archetype::Park),
            (_, Some(FacilityKind::Hospital)) => Some(Archetype::Hospital),
            (_, Some(FacilityKind::School)) => Some(Archetype::School),
            _ => Some(Archetype::Standard),
        }
    }
}

/// Material and geometry for one building or road.
#[derive(Debug, Clone, PartialEq)]
pub struct Emission {
    pub material: Material,
    pub solids: Solids,
}

fn standard(b: &Building) -> Solids {
    let top = (b.height as f64).max(1.0);
    smallvec::smallvec![Solid::from_rect(&b.footprint, 0.0, top)]
}

fn park(fp: &Rect) -> Solids {
    let lawn = fp.inset(fp.min_side() * PARK_MARGIN);
    let lawn_side = lawn.min_side();

    let size = (lawn_side * PLANTER_SIZE_FRACTION)
        .max(PLANTER_MIN_SIZE)
        .min(lawn_side * PLANTER_MAX_FRACTION);

    let planter_a = Rect::new(lawn.x0, lawn.y0, lawn.x0 + size, lawn.y0 + size);
    let planter_b = Rect::new(lawn.x1 - size, lawn.y1 - size, lawn.x1, lawn.y1);
    let planter_top = PARK_PAD_HEIGHT + PARK_PAD_HEIGHT * PLANTER_HEIGHT_FACTOR;

    smallvec::smallvec![
        Solid::from_rect(&lawn, 0.0, PARK_PAD_HEIGHT),
        Solid::from_rect(&planter_a, PARK_PAD_HEIGHT, planter_top),
        Solid::from_rect(&planter_b, PARK_PAD_HEIGHT, planter_top),
    ]
}

fn school(b: &Building) -> Solids {
    let fp = &b.footprint;
    let (w, h) = (fp.width(), fp.height());

    let field = fp.inset(w.min(h) * SCHOOL_MARGIN);

    let wide = w >= h;
    let (bw, bh) = if wide { (w * 0.45, h * 0.6) } else { (w * 0.6, h * 0.45) };
    let x0 = fp.x0 + w * 0.08;
    let y0 = fp.y0 + h * if wide { 0.2 } else { 0.08 };
    let mut hall = Rect::new(x0, y0, x0 + bw, y0 + bh);

    // Slide back inside the clearance band if the max edge overflows.
    let max_x = fp.x1 - w * SCHOOL_EDGE_CLEARANCE;
    let max_y = fp.y1 - h * SCHOOL_EDGE_CLEARANCE;
    if hall.x1 > max_x {
        hall = hall.translate(max_x - hall.x1, 0.0);
    }
    if hall.y1 > max_y {
        hall = hall.translate(0.0, max_y - hall.y1);
    }

    let top = (b.height as f64).max(SCHOOL_MIN_HEIGHT);

    smallvec::smallvec![
        Solid::from_rect(&field, 0.0, SCHOOL_FIELD_HEIGHT),
        Solid::from_rect(&hall, 0.0, top),
    ]
}

fn hospital(b: &Building) -> Solids {
    let fp = &b.footprint;
    let (w, h) = (fp.width(), fp.height());
    let storeys = b.height as f64;

    let podium = fp.inset(w.min(h) * HOSPITAL_MARGIN);
    let podium_top = (storeys * 0.25).max(HOSPITAL_MIN_PODIUM);

    let center = fp.center();
    let wide = w >= h;

    let tower = if wide {
        Rect::centered(center, w * 0.7, h * 0.45)
    } else {
        Rect::centered(center, w * 0.45, h * 0.7)
    };
    let tower_top = storeys.max(podium_top + 2.0);

    let wing = if wide {
        Rect::centered(center, w * 0.28, h * 0.85)
    } else {
        Rect::centered(center, w * 0.85, h * 0.28)
    };
    let wing_top = (tower_top * 0.9).max(podium_top + 1.2);

    smallvec::smallvec![
        Solid::from_rect(&podium, 0.0, podium_top),
        Solid::from_rect(&tower, podium_top, tower_top),
        Solid::from_rect(&wing, podium_top, wing_top),
    ]
}

/// Solids for one building; empty for undeveloped parcels.
pub fn building_solids(building: &Building) -> Solids {
    match Archetype::of(building) {
        None => Solids::new(),
        Some(Archetype::Standard) => standard(building),
        Some(Archetype::Park) => park(&building.footprint),
        Some(Archetype::School) => school(building),
        Some(Archetype::Hospital) => hospital(building),
    }
}

/// Thin oriented slab along a road centreline, or `None` for a degenerate segment.
pub fn road_solid(road: &RoadSegment) -> Option<Solid> {
    let [x1, y1] = road.start;
    let [x2, y2] = road.end;
    let len = road.length();

    if len < MIN_ROAD_LENGTH {
        return None;
    }

    // Left-hand normal scaled to the half width.
    let half = road.kind.half_width();
    let hx = -(y2 - y1) / len * half;
    let hy = (x2 - x1) / len * half;

    Some(Solid {
        base: [
            [x1 + hx, y1 + hy],
            [x1 - hx, y1 - hy],
            [x2 - hx, y2 - hy],
            [x2 + hx, y2 + hy],
        ],
        base_z: 0.0,
        top_z: ROAD_THICKNESS,
    })
}

/// Every emission of a city in export order: developed buildings as stored,
/// then one emission per road.
pub fn synthesize(city: &City) -> impl Iterator<Item = Emission> + '_ {
    let buildings = city.buildings.iter().filter_map(|b| {
        let solids = building_solids(b);
        if solids.is_empty() {
            return None;
        }

        Some(Emission {
            material: Material::for_zone(b.zone),
            solids,
        })
    });

    // Degenerate roads still open a road group, just without solids.
    let roads = city.roads.iter().map(|road| Emission {
        material: Material::Road,
        solids: road_solid(road).into_iter().collect(),
    });

    buildings.chain(roads)
}
