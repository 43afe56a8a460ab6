//! [`SessionCapabilities`] – what the running session can do.
//!
//! Platforms differ in which optional operations they expose (transient
//! input hit testing, the two anchor creation paths, anchor deletion, DOM
//! overlay). [`SessionCapabilities::negotiate`] probes a freshly started
//! session once; everything downstream asks the resulting set rather than
//! the platform.

use std::collections::HashSet;

use tracing::debug;

use arplace_types::{ArError, SessionFeature};
use arplace_xr::{PlatformOperation, XrSession};

/// A single optional capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Viewer-forward hit testing (`hit-test` feature granted).
    HitTest,
    /// Touch-driven hit testing.
    TransientInput,
    /// Anchor creation scoped to a frame.
    FrameAnchorCreation,
    /// Anchor creation scoped to the session.
    SessionAnchorRequest,
    /// Releasing anchors.
    AnchorDeletion,
    /// DOM overlay granted.
    DomOverlay,
}

/// The capability set negotiated for one session.
///
/// # Example
///
/// ```
/// use arplace_kernel::capabilities::{Capability, SessionCapabilities};
///
/// let mut caps = SessionCapabilities::new();
/// caps.grant(Capability::SessionAnchorRequest);
///
/// assert!(caps.supports_anchors());
/// assert!(!caps.supports_frame_anchor_creation());
/// assert!(caps.check(Capability::AnchorDeletion).is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionCapabilities {
    granted: HashSet<Capability>,
}

impl SessionCapabilities {
    /// An empty set: nothing optional is available.
    pub fn new() -> Self {
        Self::default()
    }

    /// Probe `session` once and record every optional capability it offers.
    pub fn negotiate(session: &dyn XrSession) -> Self {
        let mut caps = Self::new();
        let features = session.enabled_features();
        if features.contains(&SessionFeature::HitTest) {
            caps.grant(Capability::HitTest);
        }
        if features.contains(&SessionFeature::DomOverlay) {
            caps.grant(Capability::DomOverlay);
        }
        for (op, cap) in [
            (PlatformOperation::TransientHitTest, Capability::TransientInput),
            (PlatformOperation::FrameAnchorCreation, Capability::FrameAnchorCreation),
            (PlatformOperation::SessionAnchorRequest, Capability::SessionAnchorRequest),
            (PlatformOperation::AnchorDeletion, Capability::AnchorDeletion),
        ] {
            if session.supports(op) {
                caps.grant(cap);
            }
        }
        debug!(capabilities = ?caps.granted, "session capabilities negotiated");
        caps
    }

    /// Duplicate grants are ignored.
    pub fn grant(&mut self, cap: Capability) {
        self.granted.insert(cap);
    }

    pub fn has(&self, cap: Capability) -> bool {
        self.granted.contains(&cap)
    }

    /// `Ok(())` when `cap` was granted. Anchor capabilities fail with
    /// [`ArError::AnchorUnavailable`], everything else with
    /// [`ArError::Platform`].
    pub fn check(&self, cap: Capability) -> Result<(), ArError> {
        if self.has(cap) {
            return Ok(());
        }
        match cap {
            Capability::FrameAnchorCreation
            | Capability::SessionAnchorRequest
            | Capability::AnchorDeletion => Err(ArError::AnchorUnavailable),
            other => Err(ArError::Platform(format!("{other:?} is not supported"))),
        }
    }

    pub fn supports_transient_input(&self) -> bool {
        self.has(Capability::TransientInput)
    }

    /// `true` if either anchor creation path exists.
    pub fn supports_anchors(&self) -> bool {
        self.has(Capability::FrameAnchorCreation) || self.has(Capability::SessionAnchorRequest)
    }

    pub fn supports_frame_anchor_creation(&self) -> bool {
        self.has(Capability::FrameAnchorCreation)
    }

    pub fn supports_anchor_deletion(&self) -> bool {
        self.has(Capability::AnchorDeletion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arplace_xr::sim::SimXr;
    use arplace_xr::{SessionRequest, XrSystem};

    fn full_request() -> SessionRequest {
        SessionRequest {
            required_features: vec![SessionFeature::Local],
            optional_features: vec![SessionFeature::HitTest, SessionFeature::Anchors],
            dom_overlay_root: None,
        }
    }

    #[test]
    fn empty_set_supports_nothing() {
        let caps = SessionCapabilities::new();
        assert!(!caps.supports_transient_input());
        assert!(!caps.supports_anchors());
        assert!(!caps.supports_anchor_deletion());
        assert_eq!(
            caps.check(Capability::FrameAnchorCreation),
            Err(ArError::AnchorUnavailable)
        );
        assert!(matches!(
            caps.check(Capability::TransientInput),
            Err(ArError::Platform(_))
        ));
    }

    #[test]
    fn duplicate_grant_is_idempotent() {
        let mut caps = SessionCapabilities::new();
        caps.grant(Capability::TransientInput);
        caps.grant(Capability::TransientInput);
        assert!(caps.check(Capability::TransientInput).is_ok());
    }

    #[tokio::test]
    async fn negotiate_probes_full_platform() {
        let sim = SimXr::new().with_anchors().with_transient_input();
        let session = sim.request_session(&full_request()).await.unwrap();
        let caps = SessionCapabilities::negotiate(session.as_ref());
        assert!(caps.has(Capability::HitTest));
        assert!(caps.supports_transient_input());
        assert!(caps.supports_frame_anchor_creation());
        assert!(caps.supports_anchor_deletion());
        assert!(!caps.has(Capability::SessionAnchorRequest));
        assert!(!caps.has(Capability::DomOverlay));
    }

    #[tokio::test]
    async fn negotiate_minimal_platform() {
        let sim = SimXr::new();
        let session = sim.request_session(&full_request()).await.unwrap();
        let caps = SessionCapabilities::negotiate(session.as_ref());
        assert!(caps.has(Capability::HitTest));
        assert!(!caps.supports_anchors());
        assert!(!caps.supports_transient_input());
    }
}
