use std::io;

/// All error types for the footprint-tiler pipeline.
#[derive(thiserror::Error, Debug)]
pub enum FootprintTilerError {
    #[error("Geometry too simple: {0} unique vertices, at least 3 required")]
    GeometryTooSimple(usize),
    #[error("Invalid height: {0} (must be finite and positive)")]
    InvalidHeight(f64),
    #[error("Triangulation failure: {0}")]
    TriangulationFailure(String),
    #[error("Encoding error: {0}")]
    Encoding(String),
    #[error("Empty tile content: packager received a zero-length payload")]
    EmptyContent,
    #[error("Input error: {0}")]
    Input(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Output error: {0}")]
    Output(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl FootprintTilerError {
    /// Whether this error only invalidates a single feature.
    ///
    /// Per-feature errors are skipped and counted by the assembler; every
    /// other variant aborts the batch.
    pub fn is_per_feature(&self) -> bool {
        matches!(
            self,
            FootprintTilerError::GeometryTooSimple(_)
                | FootprintTilerError::InvalidHeight(_)
                | FootprintTilerError::TriangulationFailure(_)
                | FootprintTilerError::Encoding(_)
        )
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, FootprintTilerError>;
