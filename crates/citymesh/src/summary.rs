//! Flat JSON statistics for a finished city.

use crate::city::{City, FacilityKind, Zone};
use crate::geometry::Point2;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Written in place of a distance when there is nothing to measure.
pub const NO_DISTANCE: f64 = -1.0;

fn distance_or_sentinel<S: Serializer>(d: &Option<f64>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.unwrap_or(NO_DISTANCE))
}

fn sentinel_or_distance<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    let v = f64::deserialize(d)?;
    Ok((v >= 0.0).then_some(v))
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CitySummary {
    pub grid_size: usize,
    /// Buildings outside undeveloped and green zones.
    pub total_buildings: usize,
    pub residential_cells: usize,
    pub commercial_cells: usize,
    pub industrial_cells: usize,
    pub green_cells: usize,
    pub undeveloped_cells: usize,
    pub num_hospitals: usize,
    pub num_schools: usize,
    /// Worst residential distance to the nearest school.
    /// `None` when there are no schools or no residential buildings.
    #[serde(
        serialize_with = "distance_or_sentinel",
        deserialize_with = "sentinel_or_distance"
    )]
    pub max_distance_to_school: Option<f64>,
    #[serde(
        serialize_with = "distance_or_sentinel",
        deserialize_with = "sentinel_or_distance"
    )]
    pub max_distance_to_hospital: Option<f64>,
    pub max_residential_height: i32,
    pub max_commercial_height: i32,
    pub max_industrial_height: i32,
}

fn nearest(from: Point2, targets: &[Point2]) -> Option<f64> {
    targets
        .iter()
        .map(|t| {
            let dx = from[0] - t[0];
            let dy = from[1] - t[1];
            (dx * dx + dy * dy).sqrt()
        })
        .reduce(f64::min)
}

#[inline]
fn worse(current: Option<f64>, candidate: Option<f64>) -> Option<f64> {
    match (current, candidate) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}

impl CitySummary {
    pub fn from_city(city: &City) -> Self {
        let mut s = CitySummary {
            grid_size: city.size,
            ..Self::default()
        };

        for zone in &city.zones {
            match zone {
                Zone::None => s.undeveloped_cells += 1,
                Zone::Residential => s.residential_cells += 1,
                Zone::Commercial => s.commercial_cells += 1,
                Zone::Industrial => s.industrial_cells += 1,
                Zone::Green => s.green_cells += 1,
            }
        }

        let mut schools = Vec::new();
        let mut hospitals = Vec::new();
        for f in &city.facilities {
            match f.kind {
                FacilityKind::School => schools.push([f.x, f.y]),
                FacilityKind::Hospital => hospitals.push([f.x, f.y]),
            }
        }
        s.num_schools = schools.len();
        s.num_hospitals = hospitals.len();

        for b in &city.buildings {
            match b.zone {
                Zone::None | Zone::Green => continue,
                Zone::Residential => {
                    s.max_residential_height = s.max_residential_height.max(b.height);

                    let centre = b.footprint.center();
                    s.max_distance_to_school =
                        worse(s.max_distance_to_school, nearest(centre, &schools));
                    s.max_distance_to_hospital =
                        worse(s.max_distance_to_hospital, nearest(centre, &hospitals));
                }
                Zone::Commercial => {
                    s.max_commercial_height = s.max_commercial_height.max(b.height)
                }
                Zone::Industrial => {
                    s.max_industrial_height = s.max_industrial_height.max(b.height)
                }
            }
            s.total_buildings += 1;
        }

        s
    }

    pub fn write_json<W: Write>(&self, w: W) -> io::Result<()> {
        serde_json::to_writer_pretty(w, self)?;
        Ok(())
    }
}

/// Unlike the mesh exporters this reports failures to the caller.
pub fn save_summary<P: AsRef<Path>>(city: &City, path: P) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    CitySummary::from_city(city).write_json(&mut out)?;
    out.flush()
}
