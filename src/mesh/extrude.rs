use glam::DVec3;

use crate::error::{FootprintTilerError, Result};
use crate::mesh::closure::{check_closure, fill_holes};
use crate::mesh::glb_writer::{write_glb, write_glb_compressed};
use crate::mesh::triangulate::{ensure_ccw, triangulate_ring};
use crate::transform::{local_origin, to_local_positions};
use crate::types::{Attributes, BoundingBox, Footprint, IndexedMesh};

/// A footprint extruded into a closed prism.
///
/// `mesh` is Z-up and relative to `origin`; `bounds` is in the footprint's
/// own planar frame with z in `[0, height]`.
#[derive(Debug, Clone)]
pub struct ExtrudedSolid {
    pub mesh: IndexedMesh,
    pub origin: [f64; 3],
    pub bounds: BoundingBox,
    pub attributes: Attributes,
    /// Mesh is still open after the repair pass.
    pub approximate: bool,
    /// The repair pass added triangles.
    pub repaired: bool,
}

impl ExtrudedSolid {
    /// Serialize to a self-contained GLB.
    pub fn to_glb(&self, compress: bool) -> Result<Vec<u8>> {
        if compress {
            write_glb_compressed(&self.mesh, &self.attributes)
        } else {
            write_glb(&self.mesh, &self.attributes)
        }
    }
}

/// Extrude `footprint` from z=0 to z=`height`.
///
/// Vertices `0..n` form the floor ring and `n..2n` the roof ring. Walls face
/// outward, the roof faces +z and the floor faces -z. An open result gets one
/// hole-filling pass and is flagged `approximate` if that does not close it.
pub fn build_solid(
    footprint: &Footprint,
    height: f64,
    attributes: &Attributes,
) -> Result<ExtrudedSolid> {
    if !height.is_finite() || height <= 0.0 {
        return Err(FootprintTilerError::InvalidHeight(height));
    }

    let mut ring = footprint.unique_vertices();
    if ring.len() < 3 {
        return Err(FootprintTilerError::GeometryTooSimple(ring.len()));
    }
    // Leaf and root geometric errors are derived from the extent.
    let extent = footprint.planar_diagonal();
    if !extent.is_normal() {
        return Err(FootprintTilerError::TriangulationFailure(format!(
            "footprint extent {extent:e} is out of range"
        )));
    }
    ensure_ccw(&mut ring);
    let caps = triangulate_ring(&ring)?;

    let bounds = BoundingBox::from_footprint(footprint, height)
        .ok_or(FootprintTilerError::GeometryTooSimple(0))?;
    let origin = local_origin(&bounds);

    let n = ring.len() as u32;
    let points: Vec<DVec3> = ring
        .iter()
        .map(|p| p.extend(0.0))
        .chain(ring.iter().map(|p| p.extend(height)))
        .collect();

    let mut indices = Vec::with_capacity((n as usize * 2 + caps.len() * 2) * 3);
    for i in 0..n {
        let j = (i + 1) % n;
        indices.extend_from_slice(&[i, j, n + j]);
        indices.extend_from_slice(&[i, n + j, n + i]);
    }
    for &[a, b, c] in &caps {
        indices.extend_from_slice(&[c, b, a]);
    }
    for &[a, b, c] in &caps {
        indices.extend_from_slice(&[a + n, b + n, c + n]);
    }

    let mut mesh = IndexedMesh {
        positions: to_local_positions(&points, origin),
        indices,
    };

    let repair = close_mesh(&mut mesh, footprint.id.as_deref());

    Ok(ExtrudedSolid {
        mesh,
        origin,
        bounds,
        attributes: attributes.clone(),
        approximate: repair.approximate,
        repaired: repair.repaired,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RepairOutcome {
    repaired: bool,
    approximate: bool,
}

/// Closure check, then at most one hole-filling pass if the mesh is open.
fn close_mesh(mesh: &mut IndexedMesh, id: Option<&str>) -> RepairOutcome {
    if check_closure(mesh).is_closed() {
        return RepairOutcome {
            repaired: false,
            approximate: false,
        };
    }

    let added = fill_holes(mesh);
    let report = check_closure(mesh);
    if report.is_closed() {
        tracing::debug!(?id, added, "Closed solid with hole fill");
    } else {
        tracing::warn!(
            ?id,
            boundary_edges = report.boundary_edges,
            duplicate_edges = report.duplicate_edges,
            "Solid is not closed after repair, emitting approximate mesh"
        );
    }
    RepairOutcome {
        repaired: added > 0,
        approximate: !report.is_closed(),
    }
}
