//! Feature table → tile content files → tileset descriptor.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::config::TilesetConfig;
use crate::error::{FootprintTilerError, Result};
use crate::mesh::build_solid;
use crate::tiling::b3dm::{package_with_feature_table, FeatureTable};
use crate::tiling::tileset_writer::write_tileset;
use crate::types::{
    AttributeValue, Attributes, BoundingBox, Feature, TileContent, TileNode, Tileset,
};

/// Directory, relative to the output root, holding tile content files.
pub const TILES_DIR: &str = "tiles";

/// Why a feature produced no tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SkipReason {
    MissingHeight,
    InvalidHeight,
    GeometryTooSimple,
    TriangulationFailure,
    Encoding,
}

impl SkipReason {
    /// Map a per-feature error to its skip reason; `None` for batch-fatal errors.
    pub fn from_error(err: &FootprintTilerError) -> Option<SkipReason> {
        match err {
            FootprintTilerError::InvalidHeight(_) => Some(SkipReason::InvalidHeight),
            FootprintTilerError::GeometryTooSimple(_) => Some(SkipReason::GeometryTooSimple),
            FootprintTilerError::TriangulationFailure(_) => Some(SkipReason::TriangulationFailure),
            FootprintTilerError::Encoding(_) => Some(SkipReason::Encoding),
            _ => None,
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingHeight => write!(f, "missing height"),
            SkipReason::InvalidHeight => write!(f, "invalid height"),
            SkipReason::GeometryTooSimple => write!(f, "geometry too simple"),
            SkipReason::TriangulationFailure => write!(f, "triangulation failure"),
            SkipReason::Encoding => write!(f, "encoding"),
        }
    }
}

/// A feature row that was left out of the tileset.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedFeature {
    pub index: usize,
    pub reason: SkipReason,
    pub message: String,
}

/// Outcome of one assembly run.
#[derive(Debug, Clone)]
pub struct AssemblyReport {
    pub tile_count: usize,
    /// Skipped rows in table order.
    pub skipped: Vec<SkippedFeature>,
    /// Tiles whose solid stayed open after repair.
    pub approximate_count: usize,
    /// Tiles whose solid needed the hole-filling pass.
    pub repaired_count: usize,
    /// Total size of the tile content files written.
    pub content_bytes: usize,
    pub tileset_path: PathBuf,
    pub tileset: Tileset,
}

impl AssemblyReport {
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    pub fn skip_count(&self, reason: SkipReason) -> usize {
        self.skipped.iter().filter(|s| s.reason == reason).count()
    }

    /// Skip counts per reason, ordered by reason.
    pub fn skip_counts(&self) -> BTreeMap<SkipReason, usize> {
        let mut counts = BTreeMap::new();
        for s in &self.skipped {
            *counts.entry(s.reason).or_insert(0) += 1;
        }
        counts
    }
}

enum FeatureOutcome {
    Tile {
        node: TileNode,
        approximate: bool,
        repaired: bool,
    },
    Skipped(SkippedFeature),
}

/// Build one b3dm tile per feature under `out_dir/tiles/` and write the
/// tileset descriptor to `out_dir`.
///
/// Features that fail height resolution, geometry validation, triangulation
/// or encoding are skipped and recorded in the report. Only configuration,
/// filesystem and internal packaging errors abort the run.
pub fn assemble(
    features: &[Feature],
    height_attribute: &str,
    out_dir: &Path,
    config: &TilesetConfig,
) -> Result<AssemblyReport> {
    config.validate()?;

    let tiles_dir = out_dir.join(TILES_DIR);
    fs::create_dir_all(&tiles_dir).map_err(|e| {
        FootprintTilerError::Output(format!("Failed to create {}: {e}", tiles_dir.display()))
    })?;

    info!(
        features = features.len(),
        height_attribute,
        output = %out_dir.display(),
        "Assembling tileset"
    );

    // Indexed parallel collect keeps table order.
    let outcomes: Vec<Result<FeatureOutcome>> = features
        .par_iter()
        .enumerate()
        .map(|(index, feature)| {
            build_feature_tile(index, feature, height_attribute, out_dir, config)
        })
        .collect();

    let mut children = Vec::new();
    let mut skipped = Vec::new();
    let mut approximate_count = 0;
    let mut repaired_count = 0;
    for outcome in outcomes {
        match outcome? {
            FeatureOutcome::Tile {
                node,
                approximate,
                repaired,
            } => {
                approximate_count += usize::from(approximate);
                repaired_count += usize::from(repaired);
                children.push(node);
            }
            FeatureOutcome::Skipped(skip) => skipped.push(skip),
        }
    }

    let tileset = build_root(children, config);
    let tileset_path = write_tileset(&tileset, out_dir, &config.tileset_name)?;
    let tile_count = tileset.root.children.len();
    let content_bytes = tileset
        .root
        .children
        .iter()
        .filter_map(|c| c.content.as_ref())
        .map(|content| content.byte_length)
        .sum();

    let report = AssemblyReport {
        tile_count,
        skipped,
        approximate_count,
        repaired_count,
        content_bytes,
        tileset_path,
        tileset,
    };

    info!(
        tiles = report.tile_count,
        skipped = report.skipped_count(),
        approximate = report.approximate_count,
        content_bytes = report.content_bytes,
        "Tileset assembly complete"
    );
    for (reason, count) in report.skip_counts() {
        info!(%reason, count, "Skipped features");
    }

    Ok(report)
}

/// Resolve the height property of a feature.
pub fn resolve_height(
    properties: &Attributes,
    height_attribute: &str,
) -> std::result::Result<f64, SkipReason> {
    let value = properties
        .get(height_attribute)
        .ok_or(SkipReason::MissingHeight)?;
    value.as_f64().ok_or(SkipReason::InvalidHeight)
}

/// Relative URI of the tile for feature row `index`.
pub fn tile_uri(index: usize) -> String {
    format!("{TILES_DIR}/{index}.b3dm")
}

/// Leaf geometric error, strictly positive.
pub fn leaf_geometric_error(planar_diagonal: f64, leaf_error_factor: f64) -> f64 {
    let error = planar_diagonal * leaf_error_factor;
    if error.is_finite() && error > 0.0 { error } else { 1.0 }
}

/// Wrap the children in a content-less root whose box is the per-axis
/// union of the child boxes.
///
/// The root error is the box diagonal scaled by `root_error_factor`, capped to
/// a finite value and raised above the largest child error if needed.
pub fn build_root(children: Vec<TileNode>, config: &TilesetConfig) -> Tileset {
    let (bounds, geometric_error) =
        match BoundingBox::union_all(children.iter().map(|c| &c.bounds)) {
            Some(bounds) => {
                let largest_child = children
                    .iter()
                    .map(|c| c.geometric_error)
                    .fold(0.0, f64::max);
                let mut error = (bounds.diagonal() * config.root_error_factor).min(f64::MAX);
                if error <= largest_child {
                    error = (largest_child * 2.0).min(f64::MAX);
                }
                (bounds, error)
            }
            None => (
                BoundingBox::from_center_half_extents([0.0; 3], [1.0; 3]),
                config.empty_geometric_error,
            ),
        };

    Tileset {
        root: TileNode {
            bounds,
            geometric_error,
            content: None,
            children,
        },
        geometric_error,
    }
}

/// Metadata stored with each tile: the feature's properties plus its row
/// index and identifier.
fn tile_metadata(index: usize, feature: &Feature) -> Attributes {
    let mut metadata = feature.properties.clone();
    metadata.insert("original_index".into(), AttributeValue::Number(index as f64));
    if let Some(id) = &feature.footprint.id {
        metadata.insert("id".into(), AttributeValue::from(id.as_str()));
    }
    metadata
}

fn skip(index: usize, reason: SkipReason, message: String) -> FeatureOutcome {
    warn!(index, %reason, "Skipping feature: {message}");
    FeatureOutcome::Skipped(SkippedFeature {
        index,
        reason,
        message,
    })
}

/// Classify an error from the per-feature stages as a skip, or propagate it.
fn skip_or_fail(index: usize, err: FootprintTilerError) -> Result<FeatureOutcome> {
    match SkipReason::from_error(&err) {
        Some(reason) => Ok(skip(index, reason, err.to_string())),
        None => Err(err),
    }
}

fn build_feature_tile(
    index: usize,
    feature: &Feature,
    height_attribute: &str,
    out_dir: &Path,
    config: &TilesetConfig,
) -> Result<FeatureOutcome> {
    let height = match resolve_height(&feature.properties, height_attribute) {
        Ok(h) => h,
        Err(reason) => {
            let message = match feature.properties.get(height_attribute) {
                Some(value) => format!("{height_attribute:?} is not a number: {value:?}"),
                None => format!("no {height_attribute:?} property"),
            };
            return Ok(skip(index, reason, message));
        }
    };

    let metadata = tile_metadata(index, feature);
    let solid = match build_solid(&feature.footprint, height, &metadata) {
        Ok(solid) => solid,
        Err(e) => return skip_or_fail(index, e),
    };
    let glb = match solid.to_glb(config.compress) {
        Ok(glb) => glb,
        Err(e) => return skip_or_fail(index, e),
    };

    let tile = package_with_feature_table(&glb, &FeatureTable::with_rtc_center(solid.origin))?;

    let uri = tile_uri(index);
    let path = out_dir.join(&uri);
    fs::write(&path, &tile).map_err(|e| {
        FootprintTilerError::Output(format!("Failed to write {}: {e}", path.display()))
    })?;

    let geometric_error =
        leaf_geometric_error(feature.footprint.planar_diagonal(), config.leaf_error_factor);

    debug!(
        index,
        vertices = solid.mesh.vertex_count(),
        triangles = solid.mesh.triangle_count(),
        bytes = tile.len(),
        geometric_error,
        "Wrote {uri}"
    );

    Ok(FeatureOutcome::Tile {
        node: TileNode {
            bounds: solid.bounds,
            geometric_error,
            content: Some(TileContent {
                uri,
                byte_length: tile.len(),
            }),
            children: Vec::new(),
        },
        approximate: solid.approximate,
        repaired: solid.repaired,
    })
}
