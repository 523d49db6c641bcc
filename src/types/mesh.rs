/// Triangle mesh with flat buffers, ready for meshopt and the glTF writer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexedMesh {
    /// `[x, y, z, x, y, z, ...]`
    pub positions: Vec<f32>,
    pub indices: Vec<u32>,
}

impl IndexedMesh {
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// True when there is nothing to draw: no vertices or no faces.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() || self.indices.is_empty()
    }

    /// Position of vertex `i`. Panics when out of range.
    pub fn vertex(&self, i: u32) -> [f32; 3] {
        let start = i as usize * 3;
        let p = &self.positions[start..start + 3];
        [p[0], p[1], p[2]]
    }

    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        self.indices.chunks_exact(3).map(|t| [t[0], t[1], t[2]])
    }
}
