//! Wavefront OBJ + MTL writer.
//!
//! Geometry is streamed straight to the output; nothing is buffered beyond
//! the writer itself. Face indices are 1-based and keep counting across the
//! whole file.

use crate::archetype::synthesize;
use crate::city::City;
use crate::geometry::Solid;
use crate::palette::Material;
use crate::paths::{file_name_only, replace_extension};
use log::{debug, warn};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Fraction of the diffuse colour used for the MTL ambient term.
const AMBIENT_SCALE: f32 = 0.25;

/// Totals for one OBJ file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ObjStats {
    pub vertices: usize,
    pub faces: usize,
}

/// Write every palette entry, used or not, so tooling always sees the same library.
pub fn write_mtl<W: Write>(w: &mut W) -> io::Result<()> {
    for material in Material::ALL {
        let def = material.def();
        let [r, g, b] = def.base_color;

        writeln!(w, "newmtl {}", material.name())?;
        writeln!(
            w,
            "Ka {} {} {}",
            r * AMBIENT_SCALE,
            g * AMBIENT_SCALE,
            b * AMBIENT_SCALE
        )?;
        writeln!(w, "Kd {} {} {}", r, g, b)?;
        writeln!(w, "Ks {0} {0} {0}", def.specular)?;
        writeln!(w, "Ns {}", def.shininess)?;
        writeln!(w, "d 1.0")?;
        writeln!(w, "illum 2")?;
        writeln!(w)?;
    }

    Ok(())
}

#[inline]
fn write_solid<W: Write>(w: &mut W, solid: &Solid, next_index: &mut usize) -> io::Result<()> {
    for [x, y, z] in solid.corners() {
        writeln!(w, "v {} {} {}", x, y, z)?;
    }

    let base = *next_index;
    for [a, b, c] in Solid::TRIANGLES {
        writeln!(w, "f {} {} {}", base + a, base + b, base + c)?;
    }

    *next_index += Solid::VERTEX_COUNT;

    Ok(())
}

/// Stream the whole city as OBJ records, optionally referencing a material library.
pub fn write_obj<W: Write>(w: &mut W, city: &City, mtllib: Option<&str>) -> io::Result<ObjStats> {
    if let Some(lib) = mtllib {
        writeln!(w, "mtllib {}", lib)?;
    }

    let mut next_index = 1usize;
    let mut stats = ObjStats::default();

    for emission in synthesize(city) {
        writeln!(w, "usemtl {}", emission.material.name())?;

        for solid in &emission.solids {
            write_solid(w, solid, &mut next_index)?;
            stats.vertices += Solid::VERTEX_COUNT;
            stats.faces += Solid::TRIANGLE_COUNT;
        }
    }

    Ok(stats)
}

fn write_mtl_file(path: &Path) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    write_mtl(&mut out)?;
    out.flush()
}

fn write_obj_file(path: &Path, city: &City, mtllib: Option<&str>) -> io::Result<ObjStats> {
    let mut out = BufWriter::new(File::create(path)?);
    let stats = write_obj(&mut out, city, mtllib)?;
    out.flush()?;
    Ok(stats)
}

/// Write `path` plus its sibling `.mtl` library.
///
/// Failures are logged and otherwise swallowed: a missing library only drops
/// the `mtllib` line, and an unwritable mesh file leaves the library behind.
/// Callers that need guarantees must inspect the files afterwards.
pub fn save_obj<P: AsRef<Path>>(city: &City, path: P) {
    let path = path.as_ref();
    let mtl_path = replace_extension(path, "mtl");

    let mtllib = match write_mtl_file(&mtl_path) {
        Ok(()) => Some(file_name_only(&mtl_path)),
        Err(err) => {
            warn!("Cannot write material library {}: {}", mtl_path.display(), err);
            None
        }
    };

    match write_obj_file(path, city, mtllib.as_deref()) {
        Ok(stats) => debug!(
            "Wrote {} ({} vertices, {} faces)",
            path.display(),
            stats.vertices,
            stats.faces
        ),
        Err(err) => warn!("Cannot write OBJ {}: {}", path.display(), err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::city::{Building, RoadKind, RoadSegment, Zone};
    use crate::geometry::Rect;

    fn render(city: &City, mtllib: Option<&str>) -> (String, ObjStats) {
        let mut out = Vec::new();
        let stats = write_obj(&mut out, city, mtllib).unwrap();
        (String::from_utf8(out).unwrap(), stats)
    }

    #[test]
    fn library_lists_whole_palette() {
        let mut out = Vec::new();
        write_mtl(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        let names: Vec<_> = text
            .lines()
            .filter_map(|l| l.strip_prefix("newmtl "))
            .collect();
        assert_eq!(
            names,
            Material::ALL.iter().map(|m| m.name()).collect::<Vec<_>>()
        );
        assert_eq!(text.matches("illum 2").count(), 6);
        assert!(text.contains("newmtl mat_default\nKa 0.175 0.175 0.175\nKd 0.7 0.7 0.7\n"));
    }

    #[test]
    fn single_box_layout() {
        let mut city = City::new(2);
        city.buildings
            .push(Building::new(Rect::new(0.0, 0.0, 1.0, 1.0), Zone::Residential, 3));

        let (text, stats) = render(&city, Some("city.mtl"));
        let lines: Vec<_> = text.lines().collect();

        assert_eq!(lines[0], "mtllib city.mtl");
        assert_eq!(lines[1], "usemtl mat_residential");
        assert_eq!(lines[2..].iter().filter(|l| l.starts_with("v ")).count(), 8);
        assert_eq!(lines[2..].iter().filter(|l| l.starts_with("f ")).count(), 12);
        assert_eq!(lines[2], "v 0 0 0");
        assert_eq!(lines[9], "v 0 1 3");
        assert_eq!(stats, ObjStats { vertices: 8, faces: 12 });
    }

    #[test]
    fn indices_continue_across_solids() {
        let mut city = City::new(4);
        city.buildings
            .push(Building::new(Rect::new(0.0, 0.0, 1.0, 1.0), Zone::Commercial, 2));
        city.roads
            .push(RoadSegment::new([0.0, 2.0], [4.0, 2.0], RoadKind::Secondary));

        let (text, stats) = render(&city, None);
        assert!(!text.contains("mtllib"));
        assert_eq!(stats.vertices, 16);

        let max_index = text
            .lines()
            .filter_map(|l| l.strip_prefix("f "))
            .flat_map(|l| l.split_whitespace())
            .map(|i| i.parse::<usize>().unwrap())
            .max()
            .unwrap();
        assert_eq!(max_index, 16);

        let usemtl: Vec<_> = text.lines().filter(|l| l.starts_with("usemtl")).collect();
        assert_eq!(usemtl, vec!["usemtl mat_commercial", "usemtl mat_road"]);
    }

    #[test]
    fn degenerate_road_keeps_its_material_group() {
        let mut city = City::new(4);
        city.roads
            .push(RoadSegment::new([1.0, 1.0], [1.0, 1.0], RoadKind::Local));
        city.roads
            .push(RoadSegment::new([0.0, 2.0], [4.0, 2.0], RoadKind::Local));

        let (text, stats) = render(&city, None);
        let lines: Vec<_> = text.lines().collect();

        assert_eq!(lines[0], "usemtl mat_road");
        assert_eq!(lines[1], "usemtl mat_road");
        assert!(lines[2].starts_with("v "));
        assert_eq!(stats, ObjStats { vertices: 8, faces: 12 });
    }

    #[test]
    fn undeveloped_parcels_write_nothing() {
        let mut city = City::new(2);
        city.buildings
            .push(Building::new(Rect::new(0.0, 0.0, 1.0, 1.0), Zone::None, 5));

        let (text, stats) = render(&city, None);
        assert!(text.is_empty());
        assert_eq!(stats, ObjStats::default());
    }
}
