//! The finished city handed to the exporters.
//!
//! A [`City`] is produced elsewhere (the `citygen` generator or a JSON file)
//! and is only ever read by this crate.

use crate::geometry::{Point2, Rect};
use serde::{Deserialize, Serialize};
use std::io::{self, Read, Write};

/// High-level land-use zone of a grid cell or parcel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Zone {
    /// Undeveloped, outside the urban area.
    #[default]
    None,
    Residential,
    Commercial,
    Industrial,
    Green,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacilityKind {
    Hospital,
    School,
}

/// A public facility recorded as a point, used for accessibility statistics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Facility {
    pub x: f64,
    pub y: f64,
    pub kind: FacilityKind,
}

/// One building on a parcel footprint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Building {
    pub footprint: Rect,
    pub zone: Zone,
    /// Height in storeys.
    pub height: i32,
    /// Set when the parcel hosts a facility; the archetype then follows `facility`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facility: Option<FacilityKind>,
}

impl Building {
    #[inline]
    pub fn new(footprint: Rect, zone: Zone, height: i32) -> Self {
        Self {
            footprint,
            zone,
            height,
            facility: None,
        }
    }

    #[inline]
    pub fn with_facility(mut self, kind: FacilityKind) -> Self {
        self.facility = Some(kind);
        self
    }

    #[inline]
    pub fn is_facility(&self) -> bool {
        self.facility.is_some()
    }
}

/// Road hierarchy level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoadKind {
    Arterial,
    Secondary,
    #[default]
    Local,
}

impl RoadKind {
    /// Full carriageway width in world units.
    #[inline]
    pub fn width(self) -> f64 {
        match self {
            RoadKind::Arterial => 1.6,
            RoadKind::Secondary => 1.2,
            RoadKind::Local => 0.8,
        }
    }

    #[inline]
    pub fn half_width(self) -> f64 {
        self.width() * 0.5
    }
}

/// Straight road centreline between two points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoadSegment {
    pub start: Point2,
    pub end: Point2,
    pub kind: RoadKind,
}

impl RoadSegment {
    #[inline]
    pub fn new(start: Point2, end: Point2, kind: RoadKind) -> Self {
        Self { start, end, kind }
    }

    #[inline]
    pub fn length(&self) -> f64 {
        let dx = self.end[0] - self.start[0];
        let dy = self.end[1] - self.start[1];
        (dx * dx + dy * dy).sqrt()
    }
}

/// Area enclosed by the road network.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub bounds: Rect,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct City {
    /// The zoning grid is `size` x `size` cells.
    pub size: usize,
    /// Row-major zoning grid.
    pub zones: Vec<Zone>,
    #[serde(default)]
    pub buildings: Vec<Building>,
    #[serde(default)]
    pub facilities: Vec<Facility>,
    #[serde(default)]
    pub roads: Vec<RoadSegment>,
    #[serde(default)]
    pub blocks: Vec<Block>,
}

/// Largest accepted grid side; keeps `size * size` cells allocatable.
pub const MAX_GRID_SIZE: usize = 8192;

/// Number of cells of a `size` x `size` grid, rejecting sizes past [`MAX_GRID_SIZE`].
pub fn grid_cells(size: usize) -> io::Result<usize> {
    size.checked_mul(size)
        .filter(|_| size <= MAX_GRID_SIZE)
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("grid size {} exceeds {}", size, MAX_GRID_SIZE),
            )
        })
}

impl City {
    /// Empty city with every cell undeveloped.
    ///
    /// Panics when `size` exceeds [`MAX_GRID_SIZE`]; use [`City::try_new`] for
    /// sizes that come from outside.
    pub fn new(size: usize) -> Self {
        assert!(
            size <= MAX_GRID_SIZE,
            "grid size {} exceeds {}",
            size,
            MAX_GRID_SIZE
        );

        Self {
            size,
            zones: vec![Zone::None; size * size],
            ..Self::default()
        }
    }

    pub fn try_new(size: usize) -> io::Result<Self> {
        let cells = grid_cells(size)?;

        Ok(Self {
            size,
            zones: vec![Zone::None; cells],
            ..Self::default()
        })
    }

    /// Zone of cell `(x, y)`. Panics when out of range.
    #[inline]
    pub fn zone_at(&self, x: usize, y: usize) -> Zone {
        self.zones[y * self.size + x]
    }

    #[inline]
    pub fn set_zone(&mut self, x: usize, y: usize, zone: Zone) {
        self.zones[y * self.size + x] = zone;
    }

    pub fn from_json_reader<R: Read>(reader: R) -> io::Result<Self> {
        let city: City = serde_json::from_reader(reader)?;

        let cells = grid_cells(city.size)?;
        if city.zones.len() != cells {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "zoning grid has {} cells, expected {}x{}",
                    city.zones.len(),
                    city.size,
                    city.size
                ),
            ));
        }

        Ok(city)
    }

    pub fn to_json_writer<W: Write>(&self, writer: W) -> io::Result<()> {
        serde_json::to_writer(writer, self)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zone_grid_is_row_major() {
        let mut city = City::new(3);
        city.set_zone(2, 1, Zone::Commercial);

        assert_eq!(city.zones[5], Zone::Commercial);
        assert_eq!(city.zone_at(2, 1), Zone::Commercial);
        assert_eq!(city.zone_at(1, 2), Zone::None);
    }

    #[test]
    fn road_widths_follow_hierarchy() {
        assert_eq!(RoadKind::Arterial.half_width(), 0.8);
        assert_eq!(RoadKind::Secondary.half_width(), 0.6);
        assert_eq!(RoadKind::Local.half_width(), 0.4);
    }

    #[test]
    fn json_round_trip_keeps_facilities() {
        let mut city = City::new(2);
        city.set_zone(0, 0, Zone::Residential);
        city.buildings.push(
            Building::new(Rect::new(0.0, 0.0, 1.0, 1.0), Zone::Residential, 4)
                .with_facility(FacilityKind::School),
        );
        city.roads.push(RoadSegment::new([0.0, 0.0], [2.0, 0.0], RoadKind::Arterial));

        let mut bytes = Vec::new();
        city.to_json_writer(&mut bytes).unwrap();
        let back = City::from_json_reader(bytes.as_slice()).unwrap();

        assert_eq!(back, city);
    }

    #[test]
    fn json_with_wrong_grid_is_rejected() {
        let json = r#"{"size": 2, "zones": ["none"]}"#;
        let err = City::from_json_reader(json.as_bytes()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn json_with_oversized_grid_is_rejected() {
        // 2^32 squared overflows a 64-bit usize.
        for size in ["4294967296", "8193"] {
            let json = format!(r#"{{"size": {}, "zones": []}}"#, size);
            let err = City::from_json_reader(json.as_bytes()).unwrap_err();
            assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        }
    }

    #[test]
    fn try_new_checks_size() {
        assert_eq!(City::try_new(4).unwrap().zones.len(), 16);
        assert_eq!(
            City::try_new(usize::MAX).unwrap_err().kind(),
            io::ErrorKind::InvalidData
        );
        assert_eq!(grid_cells(MAX_GRID_SIZE).unwrap(), MAX_GRID_SIZE * MAX_GRID_SIZE);
        assert!(grid_cells(MAX_GRID_SIZE + 1).is_err());
    }
}
