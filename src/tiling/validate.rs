//! Re-reads a written tileset and checks it against the 3D Tiles structural
//! rules a viewer relies on.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{FootprintTilerError, Result};
use crate::tiling::b3dm::read_header;
use crate::types::BoundingBox;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TilesetDoc {
    asset: AssetDoc,
    geometric_error: f64,
    root: TileDoc,
}

#[derive(Debug, Deserialize)]
struct AssetDoc {
    version: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TileDoc {
    bounding_volume: BoundingVolumeDoc,
    geometric_error: f64,
    #[serde(default)]
    content: Option<ContentDoc>,
    #[serde(default)]
    children: Vec<TileDoc>,
}

#[derive(Debug, Deserialize)]
struct BoundingVolumeDoc {
    #[serde(rename = "box")]
    bbox: Option<Vec<f64>>,
}

#[derive(Debug, Deserialize)]
struct ContentDoc {
    uri: String,
}

/// Result of validating a tileset on disk.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    /// Tiles with content that were checked.
    pub tile_count: usize,
    pub problems: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.problems.is_empty()
    }
}

/// Validate `out_dir/tileset_name` and the tile files it references.
///
/// Fails only if the descriptor cannot be read; every structural issue is
/// collected into the report.
pub fn validate_tileset(out_dir: &Path, tileset_name: &str) -> Result<ValidationReport> {
    let path = out_dir.join(tileset_name);
    let text = fs::read_to_string(&path).map_err(|e| {
        FootprintTilerError::Output(format!("Failed to read {}: {e}", path.display()))
    })?;

    let mut report = ValidationReport::default();
    let doc: TilesetDoc = match serde_json::from_str(&text) {
        Ok(doc) => doc,
        Err(e) => {
            report.problems.push(format!("{tileset_name}: malformed descriptor: {e}"));
            return Ok(report);
        }
    };

    if doc.asset.version != "1.0" && doc.asset.version != "1.1" {
        report
            .problems
            .push(format!("asset.version {:?} is not a 3D Tiles version", doc.asset.version));
    }
    if !(doc.geometric_error >= doc.root.geometric_error) {
        report.problems.push(format!(
            "top-level geometricError {} is below root geometricError {}",
            doc.geometric_error, doc.root.geometric_error
        ));
    }

    check_tile(&doc.root, None, "root", out_dir, &mut report);

    if report.is_valid() {
        info!(tiles = report.tile_count, "Tileset validation passed");
    } else {
        for problem in &report.problems {
            warn!("Validation: {problem}");
        }
    }

    Ok(report)
}

fn check_tile(
    tile: &TileDoc,
    parent: Option<(&BoundingBox, f64)>,
    label: &str,
    out_dir: &Path,
    report: &mut ValidationReport,
) {
    let bounds = match parse_box(tile.bounding_volume.bbox.as_deref()) {
        Ok(b) => Some(b),
        Err(msg) => {
            report.problems.push(format!("{label}: {msg}"));
            None
        }
    };

    if !tile.geometric_error.is_finite() || tile.geometric_error < 0.0 {
        report.problems.push(format!(
            "{label}: geometricError {} must be finite and non-negative",
            tile.geometric_error
        ));
    }

    if let Some((parent_bounds, parent_error)) = parent {
        if !(tile.geometric_error < parent_error) {
            report.problems.push(format!(
                "{label}: geometricError {} is not below parent's {parent_error}",
                tile.geometric_error
            ));
        }
        if let Some(b) = &bounds {
            if !contains_within_tolerance(parent_bounds, b) {
                report
                    .problems
                    .push(format!("{label}: bounding volume escapes its parent"));
            }
        }
    }

    if let Some(content) = &tile.content {
        report.tile_count += 1;
        check_content(&content.uri, label, out_dir, report);
    }

    if let Some(b) = &bounds {
        for (i, child) in tile.children.iter().enumerate() {
            let child_label = format!("{label}.children[{i}]");
            check_tile(child, Some((b, tile.geometric_error)), &child_label, out_dir, report);
        }
    }
}

fn check_content(uri: &str, label: &str, out_dir: &Path, report: &mut ValidationReport) {
    let path = out_dir.join(uri);
    let bytes = match fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) => {
            report.problems.push(format!("{label}: content {uri} unreadable: {e}"));
            return;
        }
    };
    match read_header(&bytes) {
        Ok(header) if header.byte_length as usize != bytes.len() => {
            report.problems.push(format!(
                "{label}: content {uri} byteLength {} != file size {}",
                header.byte_length,
                bytes.len()
            ));
        }
        Ok(_) => {}
        Err(e) => report.problems.push(format!("{label}: content {uri}: {e}")),
    }
}

/// Parse a 12-float box with diagonal, non-negative half-axes.
fn parse_box(values: Option<&[f64]>) -> std::result::Result<BoundingBox, String> {
    let values = values.ok_or("boundingVolume has no box")?;
    let bv: [f64; 12] = values
        .try_into()
        .map_err(|_| format!("box has {} values, expected 12", values.len()))?;
    if bv.iter().any(|v| !v.is_finite()) {
        return Err("box has non-finite values".into());
    }
    if [bv[3], bv[7], bv[11]].iter().any(|&h| h < 0.0) {
        return Err("box has negative half-extents".into());
    }
    Ok(BoundingBox::from_box_array(&bv))
}

/// Containment allowing for the rounding of centre/half-extent round trips.
fn contains_within_tolerance(outer: &BoundingBox, inner: &BoundingBox) -> bool {
    (0..3).all(|i| {
        let scale = outer.min[i].abs().max(outer.max[i].abs()).max(1.0);
        let eps = scale * 1e-9;
        outer.min[i] - eps <= inner.min[i] && outer.max[i] + eps >= inner.max[i]
    })
}
