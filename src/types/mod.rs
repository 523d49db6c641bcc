pub mod footprint;
pub mod mesh;
pub mod tile;

pub use footprint::{AttributeValue, Attributes, Feature, Footprint};
pub use mesh::IndexedMesh;
pub use tile::{BoundingBox, TileContent, TileNode, Tileset};
