use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use tracing::info;

use crate::error::{FootprintTilerError, Result};
use crate::types::{TileNode, Tileset};

/// 3D Tiles version written to `asset.version`.
pub const TILESET_VERSION: &str = "1.0";

/// Write the tileset descriptor to `out_dir/tileset_name`.
///
/// Tile content files have already been written by the assembler.
/// Returns the descriptor path.
pub fn write_tileset(tileset: &Tileset, out_dir: &Path, tileset_name: &str) -> Result<PathBuf> {
    let tile_count = count_content_nodes(&tileset.root);
    let tileset_json = build_tileset_json(tileset);

    let tileset_path = out_dir.join(tileset_name);
    let json_string = serde_json::to_string_pretty(&tileset_json).map_err(|e| {
        FootprintTilerError::Output(format!("Failed to serialize {tileset_name}: {e}"))
    })?;

    fs::write(&tileset_path, &json_string)
        .map_err(|e| FootprintTilerError::Output(format!("Failed to write {tileset_name}: {e}")))?;

    info!(
        tiles = tile_count,
        path = %tileset_path.display(),
        "Wrote tileset descriptor"
    );

    Ok(tileset_path)
}

/// Count nodes that have content.
pub fn count_content_nodes(node: &TileNode) -> usize {
    let self_count = if node.content.is_some() { 1 } else { 0 };
    self_count + node.children.iter().map(count_content_nodes).sum::<usize>()
}

/// Build the descriptor as a serde_json::Value.
pub fn build_tileset_json(tileset: &Tileset) -> serde_json::Value {
    let mut root_tile = tile_node_to_json(&tileset.root);
    root_tile["refine"] = json!("ADD");

    json!({
        "asset": {
            "version": TILESET_VERSION,
            "generator": "footprint-tiler"
        },
        "geometricError": tileset.geometric_error,
        "root": root_tile
    })
}

/// Convert a TileNode to its descriptor representation. Children inherit
/// the root's refinement.
fn tile_node_to_json(node: &TileNode) -> serde_json::Value {
    let mut tile = json!({
        "boundingVolume": {
            "box": node.bounds.to_box_array()
        },
        "geometricError": node.geometric_error
    });

    if let Some(content) = &node.content {
        tile["content"] = json!({
            "uri": content.uri
        });
    }

    if !node.children.is_empty() {
        let children: Vec<serde_json::Value> =
            node.children.iter().map(tile_node_to_json).collect();
        tile["children"] = json!(children);
    }

    tile
}
