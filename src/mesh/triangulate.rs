use glam::DVec2;
use robust::{orient2d, Coord};

use crate::error::{FootprintTilerError, Result};

/// Signed area of a ring (shoelace). Positive for counter-clockwise rings.
///
/// Vertices are taken relative to the first one, so small rings far from the
/// origin keep their sign.
pub fn signed_area(ring: &[DVec2]) -> f64 {
    let Some(&anchor) = ring.first() else {
        return 0.0;
    };
    let n = ring.len();
    (0..n)
        .map(|i| {
            let a = ring[i] - anchor;
            let b = ring[(i + 1) % n] - anchor;
            a.perp_dot(b)
        })
        .sum::<f64>()
        * 0.5
}

/// Reverse the ring in place if it is clockwise.
pub fn ensure_ccw(ring: &mut [DVec2]) {
    if signed_area(ring) < 0.0 {
        ring.reverse();
    }
}

fn orient(a: DVec2, b: DVec2, c: DVec2) -> f64 {
    orient2d(
        Coord { x: a.x, y: a.y },
        Coord { x: b.x, y: b.y },
        Coord { x: c.x, y: c.y },
    )
}

/// `p` is known collinear with `a`-`b`; test whether it lies on the segment.
fn on_segment(a: DVec2, b: DVec2, p: DVec2) -> bool {
    p.x >= a.x.min(b.x) && p.x <= a.x.max(b.x) && p.y >= a.y.min(b.y) && p.y <= a.y.max(b.y)
}

fn segments_intersect(p1: DVec2, p2: DVec2, q1: DVec2, q2: DVec2) -> bool {
    let d1 = orient(q1, q2, p1);
    let d2 = orient(q1, q2, p2);
    let d3 = orient(p1, p2, q1);
    let d4 = orient(p1, p2, q2);

    let straddles = |a: f64, b: f64| (a > 0.0 && b < 0.0) || (a < 0.0 && b > 0.0);
    if straddles(d1, d2) && straddles(d3, d4) {
        return true;
    }

    (d1 == 0.0 && on_segment(q1, q2, p1))
        || (d2 == 0.0 && on_segment(q1, q2, p2))
        || (d3 == 0.0 && on_segment(p1, p2, q1))
        || (d4 == 0.0 && on_segment(p1, p2, q2))
}

/// Whether a ring of unique vertices is simple: no two edges cross or touch
/// except consecutive edges at their shared vertex, and no edge doubles back
/// over its predecessor.
///
/// Uses exact orientation predicates, so near-degenerate rings are classified
/// consistently.
pub fn is_simple(ring: &[DVec2]) -> bool {
    let n = ring.len();
    if n < 3 {
        return false;
    }

    for i in 0..n {
        let a = ring[i];
        let b = ring[(i + 1) % n];
        let c = ring[(i + 2) % n];
        // Spike: the next edge runs back along this one.
        if orient(a, b, c) == 0.0 && (a - b).dot(c - b) > 0.0 {
            return false;
        }
    }

    for i in 0..n {
        let p1 = ring[i];
        let p2 = ring[(i + 1) % n];
        for j in (i + 2)..n {
            if i == 0 && j == n - 1 {
                continue; // adjacent through the closing edge
            }
            let q1 = ring[j];
            let q2 = ring[(j + 1) % n];
            if segments_intersect(p1, p2, q1, q2) {
                return false;
            }
        }
    }

    true
}

/// Ear-clipping triangulation of a simple ring of unique vertices.
///
/// Returned triangles index into `ring` and are all wound counter-clockwise
/// (normal +z), whatever the ring's own orientation.
pub fn triangulate_ring(ring: &[DVec2]) -> Result<Vec<[u32; 3]>> {
    if ring.len() < 3 {
        return Err(FootprintTilerError::GeometryTooSimple(ring.len()));
    }
    if !is_simple(ring) {
        return Err(FootprintTilerError::TriangulationFailure(
            "ring is self-intersecting or degenerate".into(),
        ));
    }

    let anchor = ring[0];
    let data: Vec<f64> = ring
        .iter()
        .flat_map(|&p| {
            let p = p - anchor;
            [p.x, p.y]
        })
        .collect();
    let flat = earcutr::earcut(&data, &[], 2)
        .map_err(|e| FootprintTilerError::TriangulationFailure(format!("earcut: {e:?}")))?;

    if flat.is_empty() {
        return Err(FootprintTilerError::TriangulationFailure(
            "ring encloses no area".into(),
        ));
    }

    let triangles = flat
        .chunks_exact(3)
        .map(|t| {
            let (a, b, c) = (t[0], t[1], t[2]);
            if orient(ring[a], ring[b], ring[c]) < 0.0 {
                [a as u32, c as u32, b as u32]
            } else {
                [a as u32, b as u32, c as u32]
            }
        })
        .collect();

    Ok(triangles)
}
