use std::collections::BTreeMap;

use glam::DVec2;
use serde::Serialize;

/// A scalar attribute value carried through from the feature table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Number(f64),
    String(String),
    Bool(bool),
}

impl AttributeValue {
    /// Interpret the value as a finite number, parsing strings if needed.
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            AttributeValue::Number(n) => *n,
            AttributeValue::String(s) => s.trim().parse::<f64>().ok()?,
            AttributeValue::Bool(_) => return None,
        };
        value.is_finite().then_some(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Number(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(value.to_owned())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::String(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

/// Key-ordered attribute mapping. Ordering is stable so serialized metadata
/// is byte-identical across runs.
pub type Attributes = BTreeMap<String, AttributeValue>;

/// A 2-D building footprint in a local planar coordinate system.
///
/// `ring` is the exterior ring as supplied; it may or may not repeat the
/// first vertex at the end.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Footprint {
    pub ring: Vec<DVec2>,
    pub id: Option<String>,
}

impl Footprint {
    pub fn new(ring: Vec<DVec2>) -> Self {
        Self { ring, id: None }
    }

    /// Build a footprint from `[x, y]` pairs.
    pub fn from_coords(coords: &[[f64; 2]]) -> Self {
        Self::new(coords.iter().map(|&[x, y]| DVec2::new(x, y)).collect())
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Unique ordered vertices: closing duplicate and consecutive repeats removed.
    pub fn unique_vertices(&self) -> Vec<DVec2> {
        let mut out: Vec<DVec2> = Vec::with_capacity(self.ring.len());
        for &p in &self.ring {
            if out.last() != Some(&p) {
                out.push(p);
            }
        }
        while out.len() > 1 && out.first() == out.last() {
            out.pop();
        }
        out
    }

    /// Planar bounds as `(min, max)`, or `None` for an empty ring.
    pub fn bounds(&self) -> Option<(DVec2, DVec2)> {
        let first = *self.ring.first()?;
        Some(
            self.ring
                .iter()
                .fold((first, first), |(lo, hi), &p| (lo.min(p), hi.max(p))),
        )
    }

    /// Length of the planar bounding-box diagonal.
    pub fn planar_diagonal(&self) -> f64 {
        self.bounds().map_or(0.0, |(lo, hi)| (hi - lo).length())
    }
}

/// One row of the input feature table.
#[derive(Debug, Clone, Default)]
pub struct Feature {
    pub footprint: Footprint,
    pub properties: Attributes,
}
