use glam::DVec3;

use crate::types::BoundingBox;

/// Local origin for a tile: footprint centre on the ground plane.
///
/// Vertex positions are stored relative to this point so large projected
/// coordinates survive the f32 conversion; the origin itself is written to
/// the tile as `RTC_CENTER`.
pub fn local_origin(bounds: &BoundingBox) -> [f64; 3] {
    let c = bounds.center();
    [c[0], c[1], 0.0]
}

/// Translate points by `-origin` (f64 math) and flatten to f32 triples.
pub fn to_local_positions(points: &[DVec3], origin: [f64; 3]) -> Vec<f32> {
    let o = DVec3::from_array(origin);
    points
        .iter()
        .flat_map(|&p| {
            let local = p - o;
            [local.x as f32, local.y as f32, local.z as f32]
        })
        .collect()
}

/// Convert from right-handed Z-up (3D Tiles) to right-handed Y-up (glTF).
///
/// Transform: `(x, y, z)` → `(x, z, -y)`. Viewers apply the inverse when
/// loading tile content, so winding and handedness are preserved.
pub fn z_up_to_y_up(positions: &mut [f32]) {
    for tri in positions.chunks_exact_mut(3) {
        let y = tri[1];
        let z = tri[2];
        tri[1] = z;
        tri[2] = -y;
    }
}
