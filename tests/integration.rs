//! End-to-end integration tests.
//!
//! These tests build synthetic feature tables, run the assembler or the full
//! pipeline, and check the written tileset.

use std::fs;
use std::path::Path;

use approx::assert_relative_eq;
use footprint_tiler::config::{PipelineConfig, TilesetConfig};
use footprint_tiler::tiling::b3dm::{read_feature_table, read_header};
use footprint_tiler::tiling::{assemble, validate_tileset, SkipReason};
use footprint_tiler::types::{AttributeValue, Attributes, Feature, Footprint};
use footprint_tiler::Pipeline;

fn square(x0: f64, y0: f64, size: f64, height: f64) -> Feature {
    let mut properties = Attributes::new();
    properties.insert("height".into(), AttributeValue::Number(height));
    Feature {
        footprint: Footprint::from_coords(&[
            [x0, y0],
            [x0, y0 + size],
            [x0 + size, y0 + size],
            [x0 + size, y0],
            [x0, y0],
        ]),
        properties,
    }
}

fn read_tileset(dir: &Path) -> serde_json::Value {
    let text = fs::read_to_string(dir.join("tileset.json")).expect("tileset.json should exist");
    serde_json::from_str(&text).expect("tileset.json should parse")
}

fn box_of(tile: &serde_json::Value) -> Vec<f64> {
    tile["boundingVolume"]["box"]
        .as_array()
        .expect("box should be an array")
        .iter()
        .map(|v| v.as_f64().unwrap())
        .collect()
}

/// Per-axis (min, max) of a 12-float axis-aligned box.
fn extents(bv: &[f64]) -> [(f64, f64); 3] {
    let half = [bv[3], bv[7], bv[11]];
    [0, 1, 2].map(|i| (bv[i] - half[i], bv[i] + half[i]))
}

#[test]
fn single_square_tileset() {
    let tmp = tempfile::tempdir().unwrap();
    let report = assemble(
        &[square(0.0, 0.0, 10.0, 20.0)],
        "height",
        tmp.path(),
        &TilesetConfig::default(),
    )
    .unwrap();

    assert_eq!(report.tile_count, 1);
    assert_eq!(report.skipped_count(), 0);

    let tileset = read_tileset(tmp.path());
    assert_eq!(tileset["asset"]["version"], "1.0");
    let root_box = box_of(&tileset["root"]);
    assert_relative_eq!(root_box[0], 5.0);
    assert_relative_eq!(root_box[1], 5.0);
    assert_relative_eq!(root_box[2], 10.0);
    assert_relative_eq!(root_box[3], 5.0);
    assert_relative_eq!(root_box[7], 5.0);
    assert_relative_eq!(root_box[11], 10.0);

    let children = tileset["root"]["children"].as_array().unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0]["content"]["uri"], "tiles/0.b3dm");

    let child_error = children[0]["geometricError"].as_f64().unwrap();
    let root_error = tileset["root"]["geometricError"].as_f64().unwrap();
    assert!(child_error > 0.0);
    assert!(root_error > child_error);
}

#[test]
fn zero_height_gives_empty_default_tileset() {
    let tmp = tempfile::tempdir().unwrap();
    let report = assemble(
        &[square(0.0, 0.0, 10.0, 0.0)],
        "height",
        tmp.path(),
        &TilesetConfig::default(),
    )
    .unwrap();

    assert_eq!(report.tile_count, 0);
    assert_eq!(report.skip_count(SkipReason::InvalidHeight), 1);
    assert!(!tmp.path().join("tiles/0.b3dm").exists());

    let tileset = read_tileset(tmp.path());
    assert!(tileset["root"].get("children").is_none());
    assert_eq!(
        box_of(&tileset["root"]),
        vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]
    );
    assert_eq!(tileset["geometricError"], 100.0);
}

#[test]
fn distant_squares_root_spans_both() {
    let tmp = tempfile::tempdir().unwrap();
    let features = [square(0.0, 0.0, 10.0, 20.0), square(1000.0, 500.0, 10.0, 5.0)];
    let report = assemble(&features, "height", tmp.path(), &TilesetConfig::default()).unwrap();
    assert_eq!(report.tile_count, 2);

    let tileset = read_tileset(tmp.path());
    let [(x0, x1), (y0, y1), (z0, z1)] = extents(&box_of(&tileset["root"]));
    assert_relative_eq!(x0, 0.0);
    assert_relative_eq!(x1, 1010.0);
    assert_relative_eq!(y0, 0.0);
    assert_relative_eq!(y1, 510.0);
    assert_relative_eq!(z0, 0.0);
    assert_relative_eq!(z1, 20.0);

    // Every child lies inside the root on every axis.
    let root = extents(&box_of(&tileset["root"]));
    for child in tileset["root"]["children"].as_array().unwrap() {
        let c = extents(&box_of(child));
        for axis in 0..3 {
            assert!(root[axis].0 <= c[axis].0 + 1e-9);
            assert!(root[axis].1 >= c[axis].1 - 1e-9);
        }
    }
}

#[test]
fn degenerate_footprint_is_skipped_batch_continues() {
    let tmp = tempfile::tempdir().unwrap();
    let mut two_points = square(0.0, 0.0, 10.0, 10.0);
    two_points.footprint = Footprint::from_coords(&[[0.0, 0.0], [5.0, 5.0], [0.0, 0.0]]);

    let features = [two_points, square(20.0, 20.0, 10.0, 15.0)];
    let report = assemble(&features, "height", tmp.path(), &TilesetConfig::default()).unwrap();

    assert_eq!(report.tile_count, 1);
    assert_eq!(report.skip_count(SkipReason::GeometryTooSimple), 1);
    assert_eq!(report.skipped[0].index, 0);
    assert!(tmp.path().join("tiles/1.b3dm").exists());
    assert!(!tmp.path().join("tiles/0.b3dm").exists());
}

#[test]
fn mixed_table_counts_each_reason() {
    let tmp = tempfile::tempdir().unwrap();

    let mut missing = square(0.0, 0.0, 10.0, 10.0);
    missing.properties.clear();
    let mut text_height = square(0.0, 0.0, 10.0, 10.0);
    text_height
        .properties
        .insert("height".into(), AttributeValue::from("n/a"));
    let mut bow_tie = square(0.0, 0.0, 10.0, 10.0);
    bow_tie.footprint =
        Footprint::from_coords(&[[0.0, 0.0], [10.0, 10.0], [10.0, 0.0], [0.0, 10.0]]);

    let features = [
        missing,
        text_height,
        bow_tie,
        square(0.0, 0.0, 10.0, -3.0),
        square(0.0, 0.0, 10.0, 8.0),
    ];
    let report = assemble(&features, "height", tmp.path(), &TilesetConfig::default()).unwrap();

    assert_eq!(report.tile_count, 1);
    assert_eq!(report.skip_count(SkipReason::MissingHeight), 1);
    assert_eq!(report.skip_count(SkipReason::InvalidHeight), 2);
    assert_eq!(report.skip_count(SkipReason::TriangulationFailure), 1);
    let skipped_rows: Vec<usize> = report.skipped.iter().map(|s| s.index).collect();
    assert_eq!(skipped_rows, [0, 1, 2, 3]);
}

#[test]
fn assembly_is_idempotent() {
    let features: Vec<Feature> = (0..12)
        .map(|i| {
            let mut f = square(i as f64 * 15.0, (i % 3) as f64 * 20.0, 10.0, 5.0 + i as f64);
            f.properties.insert("name".into(), AttributeValue::from(format!("b{i}")));
            f
        })
        .collect();

    let a = tempfile::tempdir().unwrap();
    let b = tempfile::tempdir().unwrap();
    assemble(&features, "height", a.path(), &TilesetConfig::default()).unwrap();
    assemble(&features, "height", b.path(), &TilesetConfig::default()).unwrap();

    assert_eq!(read_tileset(a.path()), read_tileset(b.path()));
    for i in 0..features.len() {
        let rel = format!("tiles/{i}.b3dm");
        let ta = fs::read(a.path().join(&rel)).unwrap();
        let tb = fs::read(b.path().join(&rel)).unwrap();
        assert_eq!(ta, tb, "{rel} differs between runs");
    }
}

#[test]
fn tile_file_is_well_formed_b3dm() {
    let tmp = tempfile::tempdir().unwrap();
    let mut feature = square(500_000.0, 4_000_000.0, 10.0, 20.0);
    feature.footprint = feature.footprint.with_id("B7");
    assemble(&[feature], "height", tmp.path(), &TilesetConfig::default()).unwrap();

    let bytes = fs::read(tmp.path().join("tiles/0.b3dm")).unwrap();
    let header = read_header(&bytes).unwrap();
    assert_eq!(header.byte_length as usize, bytes.len());
    assert_eq!(header.glb_offset() % 8, 0);
    assert_eq!(bytes.len() % 8, 0);

    let ft = read_feature_table(&bytes).unwrap();
    assert_eq!(ft.batch_length, 0);
    assert_eq!(ft.rtc_center, Some([500_005.0, 4_000_005.0, 0.0]));

    let glb = &bytes[header.glb_offset()..];
    let gltf = gltf::Gltf::from_slice(glb).expect("embedded GLB should parse");
    let node = gltf.document.nodes().next().unwrap();
    let extras: serde_json::Value =
        serde_json::from_str(node.extras().as_ref().unwrap().get()).unwrap();
    assert_eq!(extras["id"], "B7");
    assert_eq!(extras["original_index"], 0.0);
    assert_eq!(extras["height"], 20.0);
}

#[test]
fn compressed_tiles_validate() {
    let tmp = tempfile::tempdir().unwrap();
    let config = TilesetConfig {
        compress: true,
        ..TilesetConfig::default()
    };
    let features = [square(0.0, 0.0, 10.0, 20.0), square(30.0, 0.0, 6.0, 9.0)];
    assemble(&features, "height", tmp.path(), &config).unwrap();

    let report = validate_tileset(tmp.path(), "tileset.json").unwrap();
    assert!(report.is_valid(), "{:?}", report.problems);
    assert_eq!(report.tile_count, 2);
}

#[test]
fn pipeline_end_to_end_from_geojson() {
    let tmp = tempfile::tempdir().unwrap();
    let input = tmp.path().join("buildings.geojson");
    fs::write(
        &input,
        r#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "id": "a",
                 "geometry": {"type": "Polygon", "coordinates": [[[0,0],[0,10],[10,10],[10,0],[0,0]]]},
                 "properties": {"levels": 4, "h": 12}},
                {"type": "Feature",
                 "geometry": {"type": "Polygon", "coordinates": [[[20,0],[40,0],[40,10],[30,10],[30,20],[20,20],[20,0]]]},
                 "properties": {"h": "30"}},
                {"type": "Feature",
                 "geometry": {"type": "LineString", "coordinates": [[0,0],[1,1]]},
                 "properties": {"h": 5}}
            ]
        }"#,
    )
    .unwrap();

    let output = tmp.path().join("out");
    let config = PipelineConfig {
        input,
        output: output.clone(),
        height_attribute: "h".into(),
        tileset: TilesetConfig {
            tileset_name: "city.json".into(),
            ..TilesetConfig::default()
        },
        validate: true,
        ..Default::default()
    };

    let result = Pipeline::run(&config).unwrap();
    assert_eq!(result.tile_count, 2);
    assert_eq!(result.skipped, 1);
    assert!(output.join("city.json").exists());
    assert!(output.join("tiles/0.b3dm").exists());
    assert!(output.join("tiles/1.b3dm").exists());
    assert!(!output.join("tiles/2.b3dm").exists());
}

#[test]
fn unwritable_output_is_fatal() {
    let tmp = tempfile::tempdir().unwrap();
    let blocker = tmp.path().join("file");
    fs::write(&blocker, b"not a directory").unwrap();

    let result = assemble(
        &[square(0.0, 0.0, 10.0, 20.0)],
        "height",
        &blocker,
        &TilesetConfig::default(),
    );
    assert!(result.is_err());
}
