use std::collections::{BTreeMap, HashMap};

use crate::types::IndexedMesh;

/// Edge-level summary of a triangle soup's topology.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClosureReport {
    /// Directed edges whose reverse is missing (open boundary).
    pub boundary_edges: usize,
    /// Directed edges used by more than one triangle (non-manifold or
    /// inconsistently wound).
    pub duplicate_edges: usize,
}

impl ClosureReport {
    /// Every edge is shared by exactly two triangles with opposite orientation.
    pub fn is_closed(&self) -> bool {
        self.boundary_edges == 0 && self.duplicate_edges == 0
    }
}

fn directed_edge_counts(indices: &[u32]) -> HashMap<(u32, u32), u32> {
    let mut counts = HashMap::with_capacity(indices.len());
    for t in indices.chunks_exact(3) {
        for (a, b) in [(t[0], t[1]), (t[1], t[2]), (t[2], t[0])] {
            *counts.entry((a, b)).or_insert(0) += 1;
        }
    }
    counts
}

/// Classify every directed edge of the mesh.
pub fn check_closure(mesh: &IndexedMesh) -> ClosureReport {
    let counts = directed_edge_counts(&mesh.indices);
    let mut report = ClosureReport::default();
    for (&(a, b), &count) in &counts {
        if count > 1 {
            report.duplicate_edges += 1;
        }
        if !counts.contains_key(&(b, a)) {
            report.boundary_edges += 1;
        }
    }
    report
}

/// One hole-filling pass: chain open boundary edges into loops and close
/// each loop with a fan whose winding matches the surrounding faces.
///
/// Vertices where several boundary loops meet are left alone. Returns the
/// number of triangles added.
pub fn fill_holes(mesh: &mut IndexedMesh) -> usize {
    let counts = directed_edge_counts(&mesh.indices);

    // BTreeMap keeps the walk order, and therefore the output, deterministic.
    let mut next: BTreeMap<u32, u32> = BTreeMap::new();
    let mut ambiguous = Vec::new();
    for (&(a, b), &count) in &counts {
        if count == 1 && !counts.contains_key(&(b, a)) && next.insert(a, b).is_some() {
            ambiguous.push(a);
        }
    }
    for a in ambiguous {
        next.remove(&a);
    }

    let mut added = 0;
    loop {
        let Some(&start) = next.keys().next() else {
            break;
        };
        let mut ring = vec![start];
        let mut current = start;
        let closed = loop {
            let Some(to) = next.remove(&current) else {
                break false;
            };
            if to == start {
                break true;
            }
            ring.push(to);
            current = to;
        };

        if !closed || ring.len() < 3 {
            continue;
        }

        // The loop runs along existing faces; the patch runs against it.
        let v0 = ring[0];
        for w in ring[1..].windows(2) {
            mesh.indices.extend_from_slice(&[v0, w[1], w[0]]);
            added += 1;
        }
    }

    added
}
