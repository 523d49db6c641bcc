pub mod config;
pub mod error;
pub mod ingestion;
pub mod mesh;
pub mod pipeline;
pub mod tiling;
pub mod transform;
pub mod types;

pub use config::{PipelineConfig, TilesetConfig};
pub use error::{FootprintTilerError, Result};
pub use pipeline::Pipeline;
