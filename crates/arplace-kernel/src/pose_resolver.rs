//! Per-frame surface hit selection.
//!
//! Touch-driven (transient) input wins over the continuous viewer-forward
//! ray: while the user is dragging a finger across the screen the hit under
//! the finger is what they mean. Resolution is stateless; there is no
//! smoothing and no carry-over between frames.

use arplace_spatial::Pose;
use arplace_types::{HitTestSourceId, SpaceId};
use arplace_xr::XrFrame;

/// Return this frame's best surface hit, posed in `reference_space`.
///
/// 1. With a `transient` source, walk the active inputs in platform order
///    and take the first result of the first input that has any.
/// 2. Otherwise take the first result of the `primary` source.
/// 3. Otherwise `None`.
pub fn resolve_hit_pose(
    frame: &dyn XrFrame,
    reference_space: SpaceId,
    primary: Option<HitTestSourceId>,
    transient: Option<HitTestSourceId>,
) -> Option<Pose> {
    if let Some(source) = transient {
        let touched = frame
            .transient_hit_test_results(source, reference_space)
            .into_iter()
            .find_map(|input| input.results.first().map(|r| r.pose));
        if touched.is_some() {
            return touched;
        }
    }

    let source = primary?;
    frame
        .hit_test_results(source, reference_space)
        .first()
        .map(|r| r.pose)
}
