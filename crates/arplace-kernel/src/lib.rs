//! `arplace-kernel` – the leaf components of AR placement.
//!
//! Stateless building blocks the runtime composes each frame and on each
//! placement.
//!
//! # Modules
//!
//! - [`capabilities`] – [`SessionCapabilities`][capabilities::SessionCapabilities]:
//!   the optional platform operations a session exposes, probed once when
//!   the session starts and consulted thereafter instead of re-probing.
//! - [`pose_resolver`] – [`resolve_hit_pose`][pose_resolver::resolve_hit_pose]:
//!   picks this frame's surface hit, preferring touch-driven transient input
//!   over the device-forward ray.
//! - [`anchor_broker`] – [`try_create_anchor`][anchor_broker::try_create_anchor]:
//!   turns a pose into a spatial anchor with whichever creation path the
//!   platform offers, and releases anchors on request.

pub mod anchor_broker;
pub mod capabilities;
pub mod pose_resolver;

pub use anchor_broker::{AnchorRelease, anchor_space, release_anchor, try_create_anchor};
pub use capabilities::{Capability, SessionCapabilities};
pub use pose_resolver::resolve_hit_pose;
