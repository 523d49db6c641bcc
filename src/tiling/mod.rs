pub mod assembler;
pub mod b3dm;
pub mod tileset_writer;
pub mod validate;

pub use assembler::{assemble, AssemblyReport, SkipReason, SkippedFeature};
pub use b3dm::{package, package_with_feature_table, read_header, B3dmHeader, FeatureTable};
pub use tileset_writer::write_tileset;
pub use validate::{validate_tileset, ValidationReport};
