//! Scene graph and renderer contracts.

use async_trait::async_trait;

use arplace_spatial::Pose;
use arplace_types::{ArError, ObjectId};

use crate::platform::{ReferenceSpaceType, XrSession};

/// The scene graph placed models live in.
///
/// Nodes are addressed by [`ObjectId`]. Setting the pose or visibility of a
/// node that is not currently in the scene is allowed; the values apply once
/// it is added.
pub trait Scene {
    fn add(&mut self, object: ObjectId);

    /// Remove `object`. No-op if it is not in the scene.
    fn remove(&mut self, object: ObjectId);

    fn contains(&self, object: ObjectId) -> bool;

    fn set_visible(&mut self, object: ObjectId, visible: bool);

    fn is_visible(&self, object: ObjectId) -> bool;

    fn set_pose(&mut self, object: ObjectId, pose: Pose);

    fn pose(&self, object: ObjectId) -> Option<Pose>;

    /// The hit-pose indicator. Always part of the scene.
    fn reticle(&self) -> ObjectId;

    /// Number of nodes currently in the scene, reticle included.
    fn object_count(&self) -> usize;
}

/// The render surface.
#[async_trait(?Send)]
pub trait Renderer {
    /// Reference space type the renderer should use when presenting XR
    /// frames. Must be set before [`bind_session`][Self::bind_session].
    fn set_reference_space_type(&mut self, kind: ReferenceSpaceType);

    /// Attach the render surface to `session`.
    async fn bind_session(&mut self, session: &dyn XrSession) -> Result<(), ArError>;

    /// Start (`true`) or stop (`false`) the host's per-frame callback.
    fn set_animation_loop(&mut self, running: bool);

    fn render(&mut self, scene: &dyn Scene);
}
