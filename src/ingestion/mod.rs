pub mod geojson_loader;

use std::path::Path;

use tracing::{debug, info};

use crate::config::PipelineConfig;
use crate::error::{FootprintTilerError, Result};
use crate::tiling::assembler::resolve_height;
use crate::types::Feature;

/// Result of the ingestion stage.
#[derive(Debug)]
pub struct IngestionResult {
    pub features: Vec<Feature>,
    pub stats: IngestionStats,
}

/// Statistics about the ingested feature table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionStats {
    pub total_features: usize,
    pub total_vertices: usize,
    /// Rows whose geometry could not be read as a polygon.
    pub empty_geometries: usize,
    /// Rows whose height property resolves to a number.
    pub with_height: usize,
    pub input_format: String,
}

/// Supported input formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    GeoJson,
}

impl InputFormat {
    /// Detect format from file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "geojson" | "json" => Ok(InputFormat::GeoJson),
            _ => Err(FootprintTilerError::Input(format!(
                "Unsupported file format: .{ext}"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InputFormat::GeoJson => "GeoJSON",
        }
    }
}

impl std::fmt::Display for InputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Load the feature table from `path`.
pub fn load_features(path: &Path) -> Result<Vec<Feature>> {
    if !path.exists() {
        return Err(FootprintTilerError::Input(format!(
            "Input file not found: {}",
            path.display()
        )));
    }

    let format = InputFormat::from_path(path)?;
    info!(format = %format, path = %path.display(), "Detected input format");

    match format {
        InputFormat::GeoJson => geojson_loader::load_geojson(path),
    }
}

/// Run the full ingestion stage.
pub fn ingest(config: &PipelineConfig) -> Result<IngestionResult> {
    let features = load_features(&config.input)?;
    let format = InputFormat::from_path(&config.input)?;

    let stats = compute_stats(&features, &config.height_attribute, format);
    debug!(
        features = stats.total_features,
        vertices = stats.total_vertices,
        empty = stats.empty_geometries,
        with_height = stats.with_height,
        "Ingestion stats"
    );

    Ok(IngestionResult { features, stats })
}

/// Compute summary statistics for a feature table.
pub fn compute_stats(
    features: &[Feature],
    height_attribute: &str,
    format: InputFormat,
) -> IngestionStats {
    IngestionStats {
        total_features: features.len(),
        total_vertices: features.iter().map(|f| f.footprint.ring.len()).sum(),
        empty_geometries: features.iter().filter(|f| f.footprint.ring.is_empty()).count(),
        with_height: features
            .iter()
            .filter(|f| resolve_height(&f.properties, height_attribute).is_ok())
            .count(),
        input_format: format.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AttributeValue, Footprint};

    #[test]
    fn format_detection_geojson() {
        assert_eq!(
            InputFormat::from_path(Path::new("buildings.geojson")).unwrap(),
            InputFormat::GeoJson
        );
        assert_eq!(
            InputFormat::from_path(Path::new("buildings.JSON")).unwrap(),
            InputFormat::GeoJson
        );
    }

    #[test]
    fn format_detection_unsupported() {
        assert!(InputFormat::from_path(Path::new("buildings.shp")).is_err());
    }

    #[test]
    fn compute_stats_basic() {
        let mut with_height = Feature {
            footprint: Footprint::from_coords(&[[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [0.0, 0.0]]),
            ..Default::default()
        };
        with_height
            .properties
            .insert("height".into(), AttributeValue::from("9"));
        let features = vec![with_height, Feature::default()];

        let stats = compute_stats(&features, "height", InputFormat::GeoJson);

        assert_eq!(stats.total_features, 2);
        assert_eq!(stats.total_vertices, 4);
        assert_eq!(stats.empty_geometries, 1);
        assert_eq!(stats.with_height, 1);
        assert_eq!(stats.input_format, "GeoJSON");
    }

    #[test]
    fn ingest_missing_file() {
        let config = PipelineConfig {
            input: std::path::PathBuf::from("/nonexistent/buildings.geojson"),
            ..Default::default()
        };
        let err = ingest(&config).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn ingest_reads_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("b.geojson");
        std::fs::write(
            &path,
            r#"{"type":"FeatureCollection","features":[{"type":"Feature",
                "geometry":{"type":"Polygon","coordinates":[[[0,0],[4,0],[4,4],[0,0]]]},
                "properties":{"height":6}}]}"#,
        )
        .unwrap();
        let config = PipelineConfig {
            input: path,
            ..Default::default()
        };
        let result = ingest(&config).unwrap();
        assert_eq!(result.features.len(), 1);
        assert_eq!(result.stats.with_height, 1);
    }
}
