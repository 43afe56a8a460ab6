//! Frame Updater – the per-frame tick.
//!
//! Runs once per rendered frame while a session is active:
//!
//! 1. resolve the hit pose;
//! 2. show the reticle at it, or hide the reticle;
//! 3. move the preview while placing;
//! 4. re-pose every anchored object from its anchor space;
//! 5. render.
//!
//! A single anchor that cannot be resolved never stops the others or the
//! render call.

use tracing::debug;

use arplace_kernel::resolve_hit_pose;
use arplace_spatial::Pose;
use arplace_types::SpaceId;
use arplace_xr::{Renderer, Scene, XrFrame};

use crate::placement::{AnchoredPlacement, PlacementMachine, PlacementPhase};
use crate::session::ActiveSession;

/// What one tick observed.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameReport {
    pub hit_pose: Option<Pose>,
    /// Anchored objects whose transform was refreshed.
    pub anchors_tracked: usize,
    /// Anchored objects left at their previous transform this frame.
    pub anchors_untracked: usize,
}

/// Run one tick against `frame`.
pub fn update_frame(
    frame: &dyn XrFrame,
    session: &ActiveSession,
    placement: &mut PlacementMachine,
    scene: &mut dyn Scene,
    renderer: &mut dyn Renderer,
) -> FrameReport {
    let hit_pose = resolve_hit_pose(
        frame,
        session.reference_space,
        session.hit_test_source,
        session.transient_hit_test_source,
    );
    update_reticle(scene, hit_pose);

    if placement.phase() == PlacementPhase::Placing {
        let viewer = frame
            .viewer_pose(session.reference_space)
            .map(|p| p.position);
        placement.update_preview(hit_pose, viewer, scene);
    }

    let (anchors_tracked, anchors_untracked) =
        update_anchored_objects(frame, session.reference_space, placement.anchored(), scene);

    renderer.render(&*scene);

    FrameReport {
        hit_pose,
        anchors_tracked,
        anchors_untracked,
    }
}

/// Visible at `pose`, hidden without one.
pub fn update_reticle(scene: &mut dyn Scene, pose: Option<Pose>) {
    let reticle = scene.reticle();
    match pose {
        Some(pose) => {
            scene.set_visible(reticle, true);
            scene.set_pose(reticle, pose);
        }
        None => scene.set_visible(reticle, false),
    }
}

/// Copy each anchor's current pose onto its object. Returns
/// `(tracked, untracked)`.
pub fn update_anchored_objects(
    frame: &dyn XrFrame,
    reference_space: SpaceId,
    placements: &[AnchoredPlacement],
    scene: &mut dyn Scene,
) -> (usize, usize) {
    let mut tracked = 0;
    for placement in placements {
        let Some(space) = placement.anchor_space else {
            continue;
        };
        match frame.pose(space, reference_space) {
            Ok(Some(pose)) => {
                scene.set_pose(placement.object, pose);
                tracked += 1;
            }
            Ok(None) => {}
            Err(e) => {
                debug!(placement = %placement.id.0, error = %e, "anchor pose unavailable this frame");
            }
        }
    }
    (tracked, placements.len() - tracked)
}
