use std::array::from_fn;

use crate::types::Footprint;

/// Axis-aligned bounding box in 3-D.
///
/// Serialized as the degenerate axis-aligned case of a 3D Tiles oriented box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl BoundingBox {
    /// Box spanning the footprint's planar bounds and the `[0, height]` interval.
    pub fn from_footprint(footprint: &Footprint, height: f64) -> Option<BoundingBox> {
        let (lo, hi) = footprint.bounds()?;
        Some(BoundingBox {
            min: [lo.x, lo.y, 0.0],
            max: [hi.x, hi.y, height],
        })
    }

    /// Box from a centre point and non-negative half-extents.
    pub fn from_center_half_extents(center: [f64; 3], half: [f64; 3]) -> BoundingBox {
        BoundingBox {
            min: from_fn(|i| center[i] - half[i]),
            max: from_fn(|i| center[i] + half[i]),
        }
    }

    /// Halved before combining so boxes spanning most of the f64 range stay
    /// finite.
    pub fn center(&self) -> [f64; 3] {
        from_fn(|i| self.min[i] * 0.5 + self.max[i] * 0.5)
    }

    pub fn half_extents(&self) -> [f64; 3] {
        from_fn(|i| self.max[i] * 0.5 - self.min[i] * 0.5)
    }

    /// Length of the space diagonal.
    pub fn diagonal(&self) -> f64 {
        (0..3)
            .map(|i| (self.max[i] - self.min[i]).powi(2))
            .sum::<f64>()
            .sqrt()
    }

    /// Whether `other` lies entirely inside (or on the boundary of) the box.
    pub fn contains_box(&self, other: &BoundingBox) -> bool {
        (0..3).all(|i| self.min[i] <= other.min[i] && self.max[i] >= other.max[i])
    }

    /// Per-axis union of two boxes.
    pub fn merge(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min: from_fn(|i| self.min[i].min(other.min[i])),
            max: from_fn(|i| self.max[i].max(other.max[i])),
        }
    }

    /// Tight union of a set of boxes via per-axis min/max, `None` when empty.
    pub fn union_all<'a>(boxes: impl IntoIterator<Item = &'a BoundingBox>) -> Option<BoundingBox> {
        boxes
            .into_iter()
            .fold(None, |acc: Option<BoundingBox>, b| {
                Some(acc.map_or(*b, |a| a.merge(b)))
            })
    }

    /// The 12-float `boundingVolume.box` form: the centre followed by three
    /// half-axis vectors, which are diagonal for an axis-aligned box.
    pub fn to_box_array(&self) -> [f64; 12] {
        let [cx, cy, cz] = self.center();
        let [hx, hy, hz] = self.half_extents();
        [cx, cy, cz, hx, 0.0, 0.0, 0.0, hy, 0.0, 0.0, 0.0, hz]
    }

    /// Inverse of [`to_box_array`](Self::to_box_array) for axis-aligned boxes.
    ///
    /// Half-axis vectors are reduced to their lengths, so a rotated box yields
    /// an enclosing axis-aligned box only when its axes are diagonal.
    pub fn from_box_array(bv: &[f64; 12]) -> BoundingBox {
        let axis_len = |i: usize| {
            (bv[3 + i * 3].powi(2) + bv[4 + i * 3].powi(2) + bv[5 + i * 3].powi(2)).sqrt()
        };
        BoundingBox::from_center_half_extents(
            [bv[0], bv[1], bv[2]],
            [axis_len(0), axis_len(1), axis_len(2)],
        )
    }
}

/// Reference to a tile-content file already written to disk.
#[derive(Debug, Clone, PartialEq)]
pub struct TileContent {
    /// Path relative to the tileset descriptor.
    pub uri: String,
    pub byte_length: usize,
}

/// Node in the tile hierarchy.
#[derive(Debug, Clone)]
pub struct TileNode {
    pub bounds: BoundingBox,
    pub geometric_error: f64,
    pub content: Option<TileContent>,
    pub children: Vec<TileNode>,
}

/// Root node plus top-level geometric error.
#[derive(Debug, Clone)]
pub struct Tileset {
    pub root: TileNode,
    pub geometric_error: f64,
}
