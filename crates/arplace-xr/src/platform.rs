//! AR runtime contracts: sessions, frames, hit testing and anchors.
//!
//! Mirrors the shape of an immersive-AR browser API. Optional platform
//! operations are advertised through [`XrSession::supports`] and are probed
//! exactly once when a session starts; callers must not invoke an operation
//! the session did not advertise.

use async_trait::async_trait;

use arplace_spatial::Pose;
use arplace_types::{ArError, HitTestSourceId, SessionFeature, SpaceId};

/// Kinds of reference space the placement core asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceSpaceType {
    /// Origin near the device position at session start; poses are
    /// expressed against it.
    Local,
    /// Follows the device; hit-test rays are cast along its forward axis.
    Viewer,
}

/// Optional platform operations whose presence varies between runtimes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlatformOperation {
    /// Hit testing driven by touch / controller input.
    TransientHitTest,
    /// Anchor creation scoped to a frame.
    FrameAnchorCreation,
    /// Anchor creation scoped to the session.
    SessionAnchorRequest,
    /// Releasing an anchor.
    AnchorDeletion,
}

/// Feature negotiation payload for [`XrSystem::request_session`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionRequest {
    pub required_features: Vec<SessionFeature>,
    pub optional_features: Vec<SessionFeature>,
    /// Root element id for the DOM overlay, when one was requested.
    pub dom_overlay_root: Option<String>,
}

impl SessionRequest {
    /// `true` if `feature` appears among the required or optional features.
    pub fn requests(&self, feature: SessionFeature) -> bool {
        self.required_features.contains(&feature) || self.optional_features.contains(&feature)
    }

    /// A copy of this request with the DOM overlay stripped out.
    pub fn without_dom_overlay(&self) -> Self {
        Self {
            required_features: self
                .required_features
                .iter()
                .copied()
                .filter(|f| *f != SessionFeature::DomOverlay)
                .collect(),
            optional_features: self
                .optional_features
                .iter()
                .copied()
                .filter(|f| *f != SessionFeature::DomOverlay)
                .collect(),
            dom_overlay_root: None,
        }
    }
}

/// A single ray/surface intersection, posed against the space it was
/// queried with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitTestResult {
    pub pose: Pose,
}

/// Hit-test results for one active transient input (a touch point).
#[derive(Debug, Clone, PartialEq)]
pub struct TransientHitTestResult {
    /// Platform identifier of the input source, e.g. `"touch-0"`.
    pub input_source: String,
    pub results: Vec<HitTestResult>,
}

/// Entry point to the AR runtime.
#[async_trait(?Send)]
pub trait XrSystem {
    /// `false` when the device or browser has no immersive-AR support at
    /// all. Checked before any session request is attempted.
    fn is_supported(&self) -> bool;

    /// Request an immersive-AR session with the given features.
    ///
    /// # Errors
    ///
    /// Returns [`ArError::SessionRequestFailed`] when feature negotiation is
    /// rejected.
    async fn request_session(&self, request: &SessionRequest)
    -> Result<Box<dyn XrSession>, ArError>;
}

/// A live AR session.
#[async_trait(?Send)]
pub trait XrSession {
    /// Features the runtime actually granted.
    fn enabled_features(&self) -> Vec<SessionFeature>;

    /// Whether the runtime exposes the optional `op`.
    fn supports(&self, op: PlatformOperation) -> bool;

    async fn request_reference_space(&self, kind: ReferenceSpaceType) -> Result<SpaceId, ArError>;

    /// Continuous hit-test source casting along `space`'s forward axis.
    async fn request_hit_test_source(&self, space: SpaceId) -> Result<HitTestSourceId, ArError>;

    /// Hit-test source for transient inputs matching `profile`
    /// (e.g. `"generic-touchscreen"`).
    async fn request_transient_hit_test_source(
        &self,
        profile: &str,
    ) -> Result<HitTestSourceId, ArError>;

    /// Session-scoped anchor creation at `pose` in `space`.
    async fn request_anchor(&self, pose: Pose, space: SpaceId)
    -> Result<Box<dyn XrAnchor>, ArError>;

    /// Register a callback fired exactly once when the session ends, whether
    /// the user or the platform ended it.
    fn on_end(&self, callback: Box<dyn FnOnce()>);

    /// End the session. Fires the end callbacks.
    fn end(&self);
}

/// The platform's view of the world for one rendered frame.
#[async_trait(?Send)]
pub trait XrFrame {
    /// Results of the continuous `source` this frame, nearest first.
    fn hit_test_results(&self, source: HitTestSourceId, space: SpaceId) -> Vec<HitTestResult>;

    /// Per-input results of the transient `source`, in platform order.
    fn transient_hit_test_results(
        &self,
        source: HitTestSourceId,
        space: SpaceId,
    ) -> Vec<TransientHitTestResult>;

    /// Pose of the viewer relative to `space`.
    fn viewer_pose(&self, space: SpaceId) -> Option<Pose>;

    /// Pose of `space` relative to `base`.
    ///
    /// `Ok(None)` means the space is not tracked this frame. `Err` means the
    /// lookup itself failed (e.g. the space belongs to a deleted anchor).
    fn pose(&self, space: SpaceId, base: SpaceId) -> Result<Option<Pose>, ArError>;

    /// Frame-scoped anchor creation at `pose` in `space`.
    async fn create_anchor(&self, pose: Pose, space: SpaceId) -> Result<Box<dyn XrAnchor>, ArError>;
}

/// A platform-tracked spatial anchor.
pub trait XrAnchor {
    /// The space the runtime computed for this anchor, if any.
    fn anchor_space(&self) -> Option<SpaceId>;

    /// Create the anchor's space on demand. Runtimes that precompute the
    /// space, or cannot track the anchor at all, return `None`.
    fn create_anchor_space(&self) -> Option<SpaceId> {
        None
    }

    /// Release the anchor.
    fn delete(&self) -> Result<(), ArError>;
}
