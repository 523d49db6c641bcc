pub mod closure;
pub mod extrude;
pub mod glb_writer;
pub mod triangulate;

pub use closure::{check_closure, fill_holes, ClosureReport};
pub use extrude::{build_solid, ExtrudedSolid};
pub use glb_writer::{write_glb, write_glb_compressed};
pub use triangulate::triangulate_ring;
