use std::path::PathBuf;

use clap::Parser;

use crate::error::{FootprintTilerError, Result};

/// Tileset assembly parameters.
#[derive(Debug, Clone)]
pub struct TilesetConfig {
    /// Descriptor file name inside the output directory.
    pub tileset_name: String,
    /// Leaf geometric error = planar footprint diagonal × this factor.
    pub leaf_error_factor: f64,
    /// Root geometric error = 3-D diagonal of the root box × this factor.
    pub root_error_factor: f64,
    /// Geometric error of a tileset with no tiles.
    pub empty_geometric_error: f64,
    /// Apply EXT_meshopt_compression to tile meshes.
    pub compress: bool,
}

impl Default for TilesetConfig {
    fn default() -> Self {
        Self {
            tileset_name: "tileset.json".into(),
            leaf_error_factor: 0.1,
            root_error_factor: 1.0,
            empty_geometric_error: 100.0,
            compress: false,
        }
    }
}

impl TilesetConfig {
    /// Reject parameters that would break error monotonicity or produce
    /// unusable output paths.
    pub fn validate(&self) -> Result<()> {
        let positive = |v: f64| v.is_finite() && v > 0.0;

        if !positive(self.leaf_error_factor) {
            return Err(FootprintTilerError::Config(format!(
                "leaf error factor must be finite and positive, got {}",
                self.leaf_error_factor
            )));
        }
        if !positive(self.root_error_factor) {
            return Err(FootprintTilerError::Config(format!(
                "root error factor must be finite and positive, got {}",
                self.root_error_factor
            )));
        }
        if self.root_error_factor <= self.leaf_error_factor {
            return Err(FootprintTilerError::Config(format!(
                "root error factor ({}) must exceed leaf error factor ({})",
                self.root_error_factor, self.leaf_error_factor
            )));
        }
        if !positive(self.empty_geometric_error) {
            return Err(FootprintTilerError::Config(format!(
                "empty tileset geometric error must be finite and positive, got {}",
                self.empty_geometric_error
            )));
        }
        if self.tileset_name.is_empty() || self.tileset_name.contains(['/', '\\']) {
            return Err(FootprintTilerError::Config(format!(
                "tileset name must be a plain file name, got {:?}",
                self.tileset_name
            )));
        }
        Ok(())
    }
}

/// Fully resolved pipeline configuration (constructed from CLI args).
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub height_attribute: String,
    pub tileset: TilesetConfig,
    pub validate: bool,
    pub dry_run: bool,
    pub verbose: bool,
    pub threads: Option<usize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            output: PathBuf::new(),
            height_attribute: "height".into(),
            tileset: TilesetConfig::default(),
            validate: false,
            dry_run: false,
            verbose: false,
            threads: None,
        }
    }
}

/// CLI argument definition (clap derive).
#[derive(Parser, Debug)]
#[command(
    name = "footprint-tiler",
    about = "Building footprints to extruded 3D Tiles (b3dm) converter",
    version
)]
pub struct CliArgs {
    /// Input GeoJSON FeatureCollection
    #[arg(short = 'i', long)]
    pub input: PathBuf,

    /// Output directory
    #[arg(short = 'o', long)]
    pub output: PathBuf,

    /// Feature property holding the building height
    #[arg(long, default_value = "height")]
    pub height_attribute: String,

    /// Tileset descriptor file name
    #[arg(long, default_value = "tileset.json")]
    pub tileset_name: String,

    /// Leaf geometric error as a fraction of the footprint diagonal
    #[arg(long, default_value_t = 0.1)]
    pub leaf_error_factor: f64,

    /// Root geometric error as a multiple of the root box diagonal
    #[arg(long, default_value_t = 1.0)]
    pub root_error_factor: f64,

    /// Enable meshopt compression (EXT_meshopt_compression)
    #[arg(long)]
    pub compress: bool,

    /// Run tileset validation after conversion
    #[arg(long)]
    pub validate: bool,

    /// Scan input and report stats only
    #[arg(long)]
    pub dry_run: bool,

    /// Enable verbose logging
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Worker thread count (default: all cores)
    #[arg(short = 'j', long)]
    pub threads: Option<usize>,
}

impl From<CliArgs> for PipelineConfig {
    fn from(args: CliArgs) -> Self {
        PipelineConfig {
            input: args.input,
            output: args.output,
            height_attribute: args.height_attribute,
            tileset: TilesetConfig {
                tileset_name: args.tileset_name,
                leaf_error_factor: args.leaf_error_factor,
                root_error_factor: args.root_error_factor,
                compress: args.compress,
                ..TilesetConfig::default()
            },
            validate: args.validate,
            dry_run: args.dry_run,
            verbose: args.verbose,
            threads: args.threads,
        }
    }
}
