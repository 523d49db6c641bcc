pub mod coordinates;

pub use coordinates::{local_origin, to_local_positions, z_up_to_y_up};
