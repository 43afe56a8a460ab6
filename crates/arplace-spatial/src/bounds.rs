//! Model bounds and footprint normalization.
//!
//! Loaded models come in arbitrary units and with arbitrary pivots. Before a
//! model can be dropped onto a detected surface it is uniformly scaled, then
//! shifted so that its horizontal footprint is centred on the origin and its
//! lowest point rests at y = 0.

use serde::{Deserialize, Serialize};

use crate::transform::Vec3;

/// An axis-aligned bounding box, defined by its minimum and maximum corners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Create a bounding box from its two opposite corners.
    ///
    /// The corners are normalised so that `min ≤ max` per axis.
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self {
            min: Vec3::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: Vec3::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    pub fn centre(&self) -> Vec3 {
        Vec3::new(
            (self.min.x + self.max.x) * 0.5,
            (self.min.y + self.max.y) * 0.5,
            (self.min.z + self.max.z) * 0.5,
        )
    }

    /// Bounds after a uniform scale about the origin.
    pub fn scaled(&self, s: f32) -> Self {
        Self::new(self.min.scale(s), self.max.scale(s))
    }

    /// Bounds after a translation.
    pub fn translated(&self, offset: Vec3) -> Self {
        Self::new(self.min.add(offset), self.max.add(offset))
    }
}

/// Scale and root offset that make a model sit on the ground at the origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Normalization {
    pub scale: f32,
    pub offset: Vec3,
}

impl Normalization {
    /// Compute the normalization for a model whose unscaled bounds are
    /// `bounds`.
    ///
    /// A non-positive or non-finite `scale` leaves the model at its native
    /// size.
    pub fn for_bounds(bounds: Aabb, scale: f32) -> Self {
        let scale = if scale.is_finite() && scale > 0.0 {
            scale
        } else {
            1.0
        };
        let scaled = bounds.scaled(scale);
        let centre = scaled.centre();
        Self {
            scale,
            offset: Vec3::new(-centre.x, -scaled.min.y, -centre.z),
        }
    }

    /// The model's bounds once this normalization is applied.
    pub fn apply(&self, bounds: Aabb) -> Aabb {
        bounds.scaled(self.scale).translated(self.offset)
    }
}
