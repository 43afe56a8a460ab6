//! Poses and the primitives they are built from.
//!
//! A [`Pose`] is a position plus a unit-quaternion orientation expressed
//! relative to some reference space. Poses are produced fresh every frame by
//! the AR platform; this module only provides the arithmetic needed to move
//! them between spaces and to turn a placed model towards the viewer.
//!
//! # Example
//!
//! ```rust
//! use arplace_spatial::transform::{Pose, Quaternion, Vec3};
//!
//! // A table top one metre in front of the local origin.
//! let table = Pose::new(Vec3::new(0.0, 0.0, -1.0), Quaternion::identity());
//!
//! // A cup 10 cm above the table, expressed in the table's space.
//! let cup_on_table = Pose::from_position(Vec3::new(0.0, 0.1, 0.0));
//!
//! let cup = table.compose(cup_on_table);
//! assert!((cup.position.y - 0.1).abs() < 1e-5);
//! assert!((cup.position.z + 1.0).abs() < 1e-5);
//! ```

use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────────────────────────────────────
// Primitive types
// ────────────────────────────────────────────────────────────────────────────

/// A 3-D vector, in metres when used as a position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }

    pub fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }

    pub fn scale(self, s: f32) -> Self {
        Self::new(self.x * s, self.y * s, self.z * s)
    }
}

/// A unit quaternion representing a 3-D rotation (w, x, y, z convention).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub w: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Quaternion {
    /// The caller is responsible for providing a unit quaternion (|q| = 1).
    pub fn new(w: f32, x: f32, y: f32, z: f32) -> Self {
        Self { w, x, y, z }
    }

    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.0)
    }

    /// Rotation of `yaw_rad` around the vertical (+Y) axis.
    pub fn from_yaw(yaw_rad: f32) -> Self {
        let half = yaw_rad * 0.5;
        Self::new(half.cos(), 0.0, half.sin(), 0.0)
    }

    /// Hamilton product: compose two rotations.
    pub fn mul(self, rhs: Self) -> Self {
        Self::new(
            self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
            self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
        )
    }

    /// Conjugate (== inverse for a unit quaternion).
    pub fn conjugate(self) -> Self {
        Self::new(self.w, -self.x, -self.y, -self.z)
    }

    /// Rotate a vector by this quaternion: p' = q * p * q*.
    pub fn rotate(self, v: Vec3) -> Vec3 {
        let p = Self::new(0.0, v.x, v.y, v.z);
        let rotated = self.mul(p).mul(self.conjugate());
        Vec3::new(rotated.x, rotated.y, rotated.z)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Pose
// ────────────────────────────────────────────────────────────────────────────

/// Position and orientation of something relative to a reference space.
///
/// To convert a point expressed in the posed frame into the reference space,
/// rotate it by `orientation` then add `position`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    pub orientation: Quaternion,
}

impl Pose {
    pub fn new(position: Vec3, orientation: Quaternion) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// A pose at `position` with no rotation.
    pub fn from_position(position: Vec3) -> Self {
        Self::new(position, Quaternion::identity())
    }

    pub fn identity() -> Self {
        Self::new(Vec3::zero(), Quaternion::identity())
    }

    /// Compose two poses: if `self` = T_A_B and `other` = T_B_C, the result
    /// is T_A_C.
    pub fn compose(self, other: Self) -> Self {
        let position = self.position.add(self.orientation.rotate(other.position));
        let orientation = self.orientation.mul(other.orientation);
        Self::new(position, orientation)
    }

    /// The inverse transform: T_A_B becomes T_B_A.
    pub fn inverse(self) -> Self {
        let orientation = self.orientation.conjugate();
        let position = orientation.rotate(self.position).scale(-1.0);
        Self::new(position, orientation)
    }

    /// Express `self` (given in space A) relative to `base` (also given in
    /// space A).
    pub fn relative_to(self, base: Self) -> Self {
        base.inverse().compose(self)
    }

    /// Orientation that turns an object at this pose so its +Z axis faces
    /// `target`, using only the horizontal offset.
    ///
    /// Vertical offset is discarded so the object never tips. Returns `None`
    /// when `target` is directly above or below the position, where the
    /// facing direction is undefined.
    pub fn yaw_towards(&self, target: Vec3) -> Option<Quaternion> {
        let d = target.sub(self.position);
        if d.x.abs() < f32::EPSILON && d.z.abs() < f32::EPSILON {
            return None;
        }
        Some(Quaternion::from_yaw(d.x.atan2(d.z)))
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
