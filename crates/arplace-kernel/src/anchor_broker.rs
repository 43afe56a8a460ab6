//! Spatial anchor creation and release.
//!
//! Creation prefers the frame-scoped path, falls back to the session-scoped
//! request, and reports [`ArError::AnchorUnavailable`] when neither exists.
//! This is a capability probe, not a retry loop: a rejected attempt is
//! returned as [`ArError::AnchorCreationFailed`] and the caller decides what
//! to do (the placement layer degrades to an unanchored placement).

use tracing::{debug, warn};

use arplace_spatial::Pose;
use arplace_types::{ArError, SpaceId};
use arplace_xr::{XrAnchor, XrFrame, XrSession};

use crate::capabilities::{Capability, SessionCapabilities};

/// Create an anchor at `pose`, expressed in `reference_space`.
///
/// # Errors
///
/// - [`ArError::AnchorUnavailable`] when the session offers no creation path.
/// - [`ArError::AnchorCreationFailed`] when the platform rejects the attempt.
pub async fn try_create_anchor(
    frame: &dyn XrFrame,
    session: &dyn XrSession,
    capabilities: &SessionCapabilities,
    pose: Pose,
    reference_space: SpaceId,
) -> Result<Box<dyn XrAnchor>, ArError> {
    let attempt = if capabilities.supports_frame_anchor_creation() {
        debug!("creating frame-scoped anchor");
        frame.create_anchor(pose, reference_space).await
    } else {
        capabilities.check(Capability::SessionAnchorRequest)?;
        debug!("requesting session-scoped anchor");
        session.request_anchor(pose, reference_space).await
    };

    attempt.map_err(|e| match e {
        ArError::AnchorCreationFailed(_) => e,
        other => ArError::AnchorCreationFailed(other.to_string()),
    })
}

/// The space an anchor can be tracked through, if it has one.
///
/// Prefers the precomputed space and falls back to creating one on demand.
/// `None` means the anchor cannot be re-posed per frame; it is still kept
/// so it can be released later.
pub fn anchor_space(anchor: &dyn XrAnchor) -> Option<SpaceId> {
    anchor.anchor_space().or_else(|| anchor.create_anchor_space())
}

/// Outcome of [`release_anchor`].
#[derive(Debug, Clone, PartialEq)]
pub enum AnchorRelease {
    Released,
    /// The session cannot delete anchors; nothing was attempted.
    Unsupported,
    /// The platform rejected the deletion.
    Failed(ArError),
}

/// Release `anchor` when `deletion_supported`, i.e. when the session that
/// created it advertised [`Capability::AnchorDeletion`].
///
/// Never fails: a rejected deletion is logged and reported in the returned
/// [`AnchorRelease`].
pub fn release_anchor(anchor: &dyn XrAnchor, deletion_supported: bool) -> AnchorRelease {
    if !deletion_supported {
        return AnchorRelease::Unsupported;
    }
    match anchor.delete() {
        Ok(()) => AnchorRelease::Released,
        Err(e) => {
            warn!(error = %e, "anchor deletion failed; dropping handle anyway");
            AnchorRelease::Failed(e)
        }
    }
}
