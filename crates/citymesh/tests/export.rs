//! End-to-end export tests: City -> files on disk -> parsed back.

use citymesh::gltf::{parse_glb_bytes, Document};
use citymesh::{
    read_glb, save_gltf, save_obj, save_summary, Building, City, Facility, FacilityKind,
    GltfContainer, Rect, RoadKind, RoadSegment, Zone,
};
use std::fs;
use std::path::PathBuf;

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir()
        .join("citymesh-tests")
        .join(format!("{}-{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn mixed_city() -> City {
    let mut city = City::new(8);
    city.set_zone(1, 1, Zone::Residential);
    city.set_zone(2, 1, Zone::Green);
    city.set_zone(3, 1, Zone::Residential);
    city.set_zone(4, 1, Zone::Commercial);

    let cell = |x: f64, y: f64| Rect::new(x, y, x + 1.0, y + 1.0).inset(0.1);

    city.buildings.push(Building::new(cell(1.0, 1.0), Zone::Residential, 4));
    city.buildings.push(Building::new(cell(2.0, 1.0), Zone::Green, 0));
    city.buildings.push(
        Building::new(cell(3.0, 1.0), Zone::Residential, 3).with_facility(FacilityKind::School),
    );
    city.buildings.push(
        Building::new(cell(4.0, 1.0), Zone::Commercial, 14).with_facility(FacilityKind::Hospital),
    );
    city.buildings.push(Building::new(cell(5.0, 5.0), Zone::None, 9));

    city.facilities.push(Facility { x: 3.5, y: 1.5, kind: FacilityKind::School });
    city.facilities.push(Facility { x: 4.5, y: 1.5, kind: FacilityKind::Hospital });

    city.roads.push(RoadSegment::new([0.0, 0.0], [8.0, 0.0], RoadKind::Arterial));
    city.roads.push(RoadSegment::new([0.0, 3.0], [8.0, 6.0], RoadKind::Local));
    city.roads.push(RoadSegment::new([2.0, 2.0], [2.0, 2.0], RoadKind::Secondary));
    city
}

fn obj_faces(text: &str) -> usize {
    text.lines().filter(|l| l.starts_with("f ")).count()
}

fn gltf_triangles(doc: &Document) -> usize {
    doc.meshes
        .iter()
        .flat_map(|m| &m.primitives)
        .map(|p| doc.accessors[p.indices].count / 3)
        .sum()
}

#[test]
fn test_obj_and_gltf_agree_on_triangles() {
    let dir = scratch_dir("agree");
    let city = mixed_city();

    save_obj(&city, dir.join("city.obj"));
    save_gltf(&city, dir.join("city.gltf"), GltfContainer::Separate);

    let obj = fs::read_to_string(dir.join("city.obj")).unwrap();
    let doc: Document = serde_json::from_slice(&fs::read(dir.join("city.gltf")).unwrap()).unwrap();

    // standard 12 + park 36 + school 24 + hospital 36 + two roads 24
    assert_eq!(obj_faces(&obj), 132);
    assert_eq!(gltf_triangles(&doc), obj_faces(&obj));
}

#[test]
fn test_obj_references_library() {
    let dir = scratch_dir("mtllib");
    save_obj(&mixed_city(), dir.join("city.obj"));

    let obj = fs::read_to_string(dir.join("city.obj")).unwrap();
    let mtl = fs::read_to_string(dir.join("city.mtl")).unwrap();

    assert_eq!(obj.lines().next(), Some("mtllib city.mtl"));
    assert_eq!(mtl.matches("newmtl ").count(), 6);

    // The zero-length road still opens a group, it just has no vertices.
    let roads = obj.lines().filter(|l| *l == "usemtl mat_road").count();
    assert_eq!(roads, 3);
}

#[test]
fn test_separate_gltf_points_at_payload() {
    let dir = scratch_dir("separate");
    save_gltf(&mixed_city(), dir.join("scene.gltf"), GltfContainer::Separate);

    let doc: Document =
        serde_json::from_slice(&fs::read(dir.join("scene.gltf")).unwrap()).unwrap();
    let bin = fs::read(dir.join("scene.bin")).unwrap();

    assert_eq!(doc.buffers.len(), 1);
    assert_eq!(doc.buffers[0].uri.as_deref(), Some("scene.bin"));
    assert_eq!(doc.buffers[0].byte_length, bin.len());
    assert_eq!(bin.len() % 4, 0);

    for view in &doc.buffer_views {
        assert_eq!(view.byte_offset % 4, 0);
        assert!(view.byte_offset + view.byte_length <= bin.len());
    }

    let names: Vec<_> = doc.materials.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["mat_commercial", "mat_residential", "mat_green", "mat_road"]
    );
}

#[test]
fn test_glb_parses_back() {
    let dir = scratch_dir("glb");
    let path = dir.join("city.glb");
    save_gltf(&mixed_city(), &path, GltfContainer::Packed);

    let glb = read_glb(&path).unwrap();
    let doc = glb.document().unwrap();
    let bin = glb.bin.unwrap();

    assert_eq!(glb.version, 2);
    assert!(doc.buffers[0].uri.is_none());
    assert_eq!(doc.buffers[0].byte_length, bin.len());
    assert_eq!(gltf_triangles(&doc), 132);
    assert!(!dir.join("city.bin").exists());
}

#[test]
fn test_single_residential_box_scenario() {
    let dir = scratch_dir("single");
    let mut city = City::new(2);
    city.set_zone(0, 0, Zone::Residential);
    city.buildings
        .push(Building::new(Rect::new(0.0, 0.0, 1.0, 1.0), Zone::Residential, 3));

    save_gltf(&city, dir.join("box.glb"), GltfContainer::Packed);
    let doc = read_glb(dir.join("box.glb")).unwrap().document().unwrap();

    assert_eq!(doc.meshes.len(), 1);
    assert_eq!(doc.materials[0].name, "mat_residential");

    let prim = &doc.meshes[0].primitives[0];
    let pos = &doc.accessors[prim.attributes.position];
    assert_eq!(doc.accessors[prim.indices].count, 36);
    assert_eq!(pos.min, Some([0.0, 0.0, 0.0]));
    assert_eq!(pos.max, Some([1.0, 3.0, 1.0]));
}

#[test]
fn test_undeveloped_city_exports_empty_scene() {
    let dir = scratch_dir("empty");
    let mut city = City::new(4);
    city.buildings
        .push(Building::new(Rect::new(0.0, 0.0, 1.0, 1.0), Zone::None, 5));
    city.roads
        .push(RoadSegment::new([1.0, 1.0], [1.0, 1.0], RoadKind::Arterial));

    save_obj(&city, dir.join("city.obj"));
    save_gltf(&city, dir.join("city.glb"), GltfContainer::Packed);

    let obj = fs::read_to_string(dir.join("city.obj")).unwrap();
    assert_eq!(obj.lines().collect::<Vec<_>>(), vec!["mtllib city.mtl", "usemtl mat_road"]);
    assert!(!obj.contains("\nv "));

    let bytes = fs::read(dir.join("city.glb")).unwrap();
    let glb = parse_glb_bytes(&bytes).unwrap();
    let doc = glb.document().unwrap();
    assert!(doc.meshes.is_empty());
    assert!(doc.buffers.is_empty());
    assert!(doc.scene.is_none());
    assert!(glb.bin.is_none());

    let json: serde_json::Value = serde_json::from_slice(&glb.json).unwrap();
    assert!(json.get("buffers").is_none());
    assert!(json.get("scenes").is_none());
}

#[test]
fn test_reexport_is_byte_identical() {
    let dir = scratch_dir("stable");
    let city = mixed_city();

    save_gltf(&city, dir.join("a.glb"), GltfContainer::Packed);
    save_gltf(&city, dir.join("b.glb"), GltfContainer::Packed);
    save_obj(&city, dir.join("a.obj"));
    save_obj(&city, dir.join("b.obj"));

    assert_eq!(fs::read(dir.join("a.glb")).unwrap(), fs::read(dir.join("b.glb")).unwrap());

    // Only the mtllib line differs between the two OBJ files.
    let a = fs::read_to_string(dir.join("a.obj")).unwrap();
    let b = fs::read_to_string(dir.join("b.obj")).unwrap();
    assert_eq!(a.lines().skip(1).collect::<Vec<_>>(), b.lines().skip(1).collect::<Vec<_>>());
}

#[test]
fn test_unwritable_destination_is_silent() {
    let dir = scratch_dir("missing");
    let path = dir.join("no-such-dir").join("city.obj");

    save_obj(&mixed_city(), &path);
    save_gltf(&mixed_city(), path.with_extension("gltf"), GltfContainer::Separate);
    save_gltf(&mixed_city(), path.with_extension("glb"), GltfContainer::Packed);

    assert!(!path.exists());
    assert!(!path.with_extension("mtl").exists());
    assert!(!path.with_extension("glb").exists());
}

#[test]
fn test_summary_file() {
    let dir = scratch_dir("summary");
    let path = dir.join("city_summary.json");
    save_summary(&mixed_city(), &path).unwrap();

    let json: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
    assert_eq!(json["gridSize"], 8);
    assert_eq!(json["totalBuildings"], 3);
    assert_eq!(json["greenCells"], 1);
    assert_eq!(json["undevelopedCells"], 60);
    assert_eq!(json["numSchools"], 1);
    assert_eq!(json["maxCommercialHeight"], 14);
    assert_eq!(json["maxDistanceToSchool"], 2.0);
}
