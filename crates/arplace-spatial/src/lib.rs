//! `arplace-spatial` – rigid-body math for world-anchored placement.
//!
//! # Modules
//!
//! - [`transform`] – [`Vec3`][transform::Vec3],
//!   [`Quaternion`][transform::Quaternion] and [`Pose`][transform::Pose]:
//!   positions and orientations expressed relative to a reference space,
//!   plus composition, inversion and the horizontal "face the viewer" yaw.
//! - [`bounds`] – [`Aabb`][bounds::Aabb]: axis-aligned model bounds and the
//!   footprint normalization that makes a model rest on y = 0.

pub mod bounds;
pub mod transform;

pub use bounds::{Aabb, Normalization};
pub use transform::{Pose, Quaternion, Vec3};
