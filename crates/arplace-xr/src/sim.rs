//! In-process AR platform simulation for headless testing.
//!
//! [`SimXr`] is a cloneable handle to a simulated AR runtime. Configure the
//! capabilities you want with the `with_*` / `failing_*` builder methods,
//! hand a clone to the placement core as its [`XrSystem`], and keep the
//! other clone to inspect what the core did or to move the world around
//! between frames.
//!
//! # Example
//!
//! ```rust
//! use arplace_spatial::{Pose, Vec3};
//! use arplace_xr::sim::SimXr;
//! use arplace_xr::XrSystem;
//!
//! let sim = SimXr::new().with_anchors().with_transient_input();
//! assert!(sim.is_supported());
//!
//! // A frame whose viewer-forward ray hits a surface one metre ahead.
//! let frame = sim
//!     .frame()
//!     .with_hit(Pose::from_position(Vec3::new(0.0, 0.0, -1.0)));
//! # let _ = frame;
//! ```

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use async_trait::async_trait;
use tracing::debug;

use arplace_spatial::Pose;
use arplace_types::{ArError, HitTestSourceId, SessionFeature, SpaceId};

use crate::platform::{
    HitTestResult, PlatformOperation, ReferenceSpaceType, SessionRequest,
    TransientHitTestResult, XrAnchor, XrFrame, XrSession, XrSystem,
};

// ────────────────────────────────────────────────────────────────────────────
// Simulated world state
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct SimSpace {
    /// Pose relative to the local space; `None` while tracking is lost.
    pose: Option<Pose>,
    deleted: bool,
}

struct SimWorld {
    supported: bool,
    available_features: HashSet<SessionFeature>,
    operations: HashSet<PlatformOperation>,
    reject_sessions: bool,
    reject_dom_overlay: bool,
    fail_anchor_creation: bool,
    fail_anchor_deletion: bool,
    untrackable_anchors: bool,
    on_demand_anchor_spaces: bool,
    next_id: u32,
    spaces: HashMap<SpaceId, SimSpace>,
    local_space: SpaceId,
    viewer_space: SpaceId,
    session_requests: Vec<SessionRequest>,
    anchors: Vec<SpaceId>,
    end_callbacks: Vec<Box<dyn FnOnce()>>,
    session_live: bool,
}

impl SimWorld {
    fn new() -> Self {
        let local_space = SpaceId(1);
        let viewer_space = SpaceId(2);
        let mut spaces = HashMap::new();
        spaces.insert(
            local_space,
            SimSpace {
                pose: Some(Pose::identity()),
                deleted: false,
            },
        );
        spaces.insert(
            viewer_space,
            SimSpace {
                pose: Some(Pose::identity()),
                deleted: false,
            },
        );
        Self {
            supported: true,
            available_features: [SessionFeature::Local, SessionFeature::HitTest]
                .into_iter()
                .collect(),
            operations: HashSet::new(),
            reject_sessions: false,
            reject_dom_overlay: false,
            fail_anchor_creation: false,
            fail_anchor_deletion: false,
            untrackable_anchors: false,
            on_demand_anchor_spaces: false,
            next_id: 100,
            spaces,
            local_space,
            viewer_space,
            session_requests: Vec::new(),
            anchors: Vec::new(),
            end_callbacks: Vec::new(),
            session_live: false,
        }
    }

    fn alloc_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn space_pose(&self, space: SpaceId) -> Result<Option<Pose>, ArError> {
        match self.spaces.get(&space) {
            Some(s) if s.deleted => Err(ArError::Platform(format!(
                "space {} belongs to a deleted anchor",
                space.0
            ))),
            Some(s) => Ok(s.pose),
            None => Ok(None),
        }
    }

    fn create_anchor(
        world: &Rc<RefCell<Self>>,
        op: PlatformOperation,
        pose: Pose,
        space: SpaceId,
    ) -> Result<Box<dyn XrAnchor>, ArError> {
        let mut w = world.borrow_mut();
        if !w.operations.contains(&op) {
            return Err(ArError::AnchorUnavailable);
        }
        if w.fail_anchor_creation {
            return Err(ArError::AnchorCreationFailed(
                "anchor request rejected by runtime".to_string(),
            ));
        }
        let base = w.space_pose(space)?.unwrap_or_else(Pose::identity);
        let anchor_space = SpaceId(w.alloc_id());
        w.spaces.insert(
            anchor_space,
            SimSpace {
                pose: Some(base.compose(pose)),
                deleted: false,
            },
        );
        w.anchors.push(anchor_space);
        debug!(space = anchor_space.0, "sim anchor created");
        Ok(Box::new(SimAnchor {
            world: Rc::clone(world),
            space: anchor_space,
        }))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SimXr handle
// ────────────────────────────────────────────────────────────────────────────

/// Simulated AR runtime. Clones share the same world.
///
/// A fresh simulator supports immersive AR with the `local` reference space
/// and viewer hit testing only; every optional capability must be switched
/// on explicitly.
#[derive(Clone)]
pub struct SimXr {
    world: Rc<RefCell<SimWorld>>,
}

impl Default for SimXr {
    fn default() -> Self {
        Self::new()
    }
}

impl SimXr {
    pub fn new() -> Self {
        Self {
            world: Rc::new(RefCell::new(SimWorld::new())),
        }
    }

    // ── Builder ─────────────────────────────────────────────────────────────

    /// No immersive-AR support at all.
    pub fn unsupported(self) -> Self {
        self.world.borrow_mut().supported = false;
        self
    }

    /// Frame-scoped anchor creation and anchor deletion, with the runtime
    /// precomputing each anchor's space.
    pub fn with_anchors(self) -> Self {
        {
            let mut w = self.world.borrow_mut();
            w.available_features.insert(SessionFeature::Anchors);
            w.operations.insert(PlatformOperation::FrameAnchorCreation);
            w.operations.insert(PlatformOperation::AnchorDeletion);
        }
        self
    }

    /// Only the session-scoped anchor request; no frame-scoped creation.
    pub fn with_session_anchors(self) -> Self {
        {
            let mut w = self.world.borrow_mut();
            w.available_features.insert(SessionFeature::Anchors);
            w.operations.insert(PlatformOperation::SessionAnchorRequest);
            w.operations.insert(PlatformOperation::AnchorDeletion);
        }
        self
    }

    pub fn with_transient_input(self) -> Self {
        self.world
            .borrow_mut()
            .operations
            .insert(PlatformOperation::TransientHitTest);
        self
    }

    pub fn with_dom_overlay(self) -> Self {
        self.world
            .borrow_mut()
            .available_features
            .insert(SessionFeature::DomOverlay);
        self
    }

    /// Any request that mentions the DOM overlay is rejected outright.
    pub fn rejecting_dom_overlay(self) -> Self {
        self.world.borrow_mut().reject_dom_overlay = true;
        self
    }

    /// Every session request is rejected.
    pub fn rejecting_sessions(self) -> Self {
        self.world.borrow_mut().reject_sessions = true;
        self
    }

    pub fn failing_anchor_creation(self) -> Self {
        self.world.borrow_mut().fail_anchor_creation = true;
        self
    }

    pub fn failing_anchor_deletion(self) -> Self {
        self.world.borrow_mut().fail_anchor_deletion = true;
        self
    }

    /// Anchors can be created but never released.
    pub fn without_anchor_deletion(self) -> Self {
        self.world
            .borrow_mut()
            .operations
            .remove(&PlatformOperation::AnchorDeletion);
        self
    }

    /// Anchors expose neither a precomputed nor an on-demand space.
    pub fn with_untrackable_anchors(self) -> Self {
        self.world.borrow_mut().untrackable_anchors = true;
        self
    }

    /// Anchor spaces are created on demand instead of precomputed.
    pub fn with_on_demand_anchor_spaces(self) -> Self {
        self.world.borrow_mut().on_demand_anchor_spaces = true;
        self
    }

    // ── World control ───────────────────────────────────────────────────────

    /// Start building the next frame.
    pub fn frame(&self) -> SimFrame {
        SimFrame {
            world: Rc::clone(&self.world),
            hits: Vec::new(),
            transient: Vec::new(),
        }
    }

    /// Move the device. `pose` is relative to the local space.
    pub fn set_viewer_pose(&self, pose: Pose) {
        let mut w = self.world.borrow_mut();
        let viewer = w.viewer_space;
        if let Some(s) = w.spaces.get_mut(&viewer) {
            s.pose = Some(pose);
        }
    }

    /// Simulate drift correction: the anchor's tracked pose changes.
    pub fn move_anchor(&self, anchor_space: SpaceId, pose: Pose) {
        if let Some(s) = self.world.borrow_mut().spaces.get_mut(&anchor_space) {
            s.pose = Some(pose);
        }
    }

    /// The runtime stops tracking `space` until it is moved again.
    pub fn lose_tracking(&self, space: SpaceId) {
        if let Some(s) = self.world.borrow_mut().spaces.get_mut(&space) {
            s.pose = None;
        }
    }

    /// Platform-initiated session end.
    pub fn end_session(&self) {
        end_live_session(&self.world);
    }

    // ── Inspection ──────────────────────────────────────────────────────────

    pub fn session_requests(&self) -> Vec<SessionRequest> {
        self.world.borrow().session_requests.clone()
    }

    pub fn is_session_live(&self) -> bool {
        self.world.borrow().session_live
    }

    pub fn local_space(&self) -> SpaceId {
        self.world.borrow().local_space
    }

    pub fn live_anchor_count(&self) -> usize {
        let w = self.world.borrow();
        w.anchors
            .iter()
            .filter(|s| w.spaces.get(s).is_some_and(|sp| !sp.deleted))
            .count()
    }

    pub fn deleted_anchor_count(&self) -> usize {
        let w = self.world.borrow();
        w.anchors
            .iter()
            .filter(|s| w.spaces.get(s).is_some_and(|sp| sp.deleted))
            .count()
    }
}

fn end_live_session(world: &Rc<RefCell<SimWorld>>) {
    let callbacks = {
        let mut w = world.borrow_mut();
        if !w.session_live {
            return;
        }
        w.session_live = false;
        std::mem::take(&mut w.end_callbacks)
    };
    debug!(callbacks = callbacks.len(), "sim session ended");
    for cb in callbacks {
        cb();
    }
}

#[async_trait(?Send)]
impl XrSystem for SimXr {
    fn is_supported(&self) -> bool {
        self.world.borrow().supported
    }

    async fn request_session(
        &self,
        request: &SessionRequest,
    ) -> Result<Box<dyn XrSession>, ArError> {
        let mut w = self.world.borrow_mut();
        w.session_requests.push(request.clone());
        if w.reject_sessions {
            return Err(ArError::SessionRequestFailed(
                "immersive-ar session rejected".to_string(),
            ));
        }
        if w.reject_dom_overlay && request.requests(SessionFeature::DomOverlay) {
            return Err(ArError::SessionRequestFailed(
                "dom-overlay is not supported".to_string(),
            ));
        }
        if let Some(missing) = request
            .required_features
            .iter()
            .find(|f| !w.available_features.contains(*f))
        {
            return Err(ArError::SessionRequestFailed(format!(
                "required feature '{missing}' unavailable"
            )));
        }
        let mut features = request.required_features.clone();
        features.extend(
            request
                .optional_features
                .iter()
                .copied()
                .filter(|f| w.available_features.contains(f)),
        );
        w.session_live = true;
        Ok(Box::new(SimSession {
            world: Rc::clone(&self.world),
            features,
        }))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SimSession
// ────────────────────────────────────────────────────────────────────────────

/// Session handed out by [`SimXr`].
pub struct SimSession {
    world: Rc<RefCell<SimWorld>>,
    features: Vec<SessionFeature>,
}

impl SimSession {
    fn ensure_live(&self) -> Result<(), ArError> {
        if self.world.borrow().session_live {
            Ok(())
        } else {
            Err(ArError::Platform("session has ended".to_string()))
        }
    }
}

#[async_trait(?Send)]
impl XrSession for SimSession {
    fn enabled_features(&self) -> Vec<SessionFeature> {
        self.features.clone()
    }

    fn supports(&self, op: PlatformOperation) -> bool {
        let needs_anchors = matches!(
            op,
            PlatformOperation::FrameAnchorCreation
                | PlatformOperation::SessionAnchorRequest
                | PlatformOperation::AnchorDeletion
        );
        if needs_anchors && !self.features.contains(&SessionFeature::Anchors) {
            return false;
        }
        self.world.borrow().operations.contains(&op)
    }

    async fn request_reference_space(&self, kind: ReferenceSpaceType) -> Result<SpaceId, ArError> {
        self.ensure_live()?;
        let w = self.world.borrow();
        Ok(match kind {
            ReferenceSpaceType::Local => w.local_space,
            ReferenceSpaceType::Viewer => w.viewer_space,
        })
    }

    async fn request_hit_test_source(&self, _space: SpaceId) -> Result<HitTestSourceId, ArError> {
        self.ensure_live()?;
        if !self.features.contains(&SessionFeature::HitTest) {
            return Err(ArError::Platform("hit-test feature not enabled".to_string()));
        }
        Ok(HitTestSourceId(self.world.borrow_mut().alloc_id()))
    }

    async fn request_transient_hit_test_source(
        &self,
        profile: &str,
    ) -> Result<HitTestSourceId, ArError> {
        self.ensure_live()?;
        if !self.supports(PlatformOperation::TransientHitTest) {
            return Err(ArError::Platform(format!(
                "transient hit testing unavailable for profile '{profile}'"
            )));
        }
        Ok(HitTestSourceId(self.world.borrow_mut().alloc_id()))
    }

    async fn request_anchor(
        &self,
        pose: Pose,
        space: SpaceId,
    ) -> Result<Box<dyn XrAnchor>, ArError> {
        self.ensure_live()?;
        SimWorld::create_anchor(
            &self.world,
            PlatformOperation::SessionAnchorRequest,
            pose,
            space,
        )
    }

    fn on_end(&self, callback: Box<dyn FnOnce()>) {
        self.world.borrow_mut().end_callbacks.push(callback);
    }

    fn end(&self) {
        end_live_session(&self.world);
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SimFrame
// ────────────────────────────────────────────────────────────────────────────

/// One simulated frame. Built with [`SimXr::frame`].
///
/// Anchor and viewer poses are read live from the shared world, so moving an
/// anchor on the [`SimXr`] handle is visible to every frame built afterwards.
pub struct SimFrame {
    world: Rc<RefCell<SimWorld>>,
    hits: Vec<HitTestResult>,
    transient: Vec<TransientHitTestResult>,
}

impl SimFrame {
    /// Append a result to the viewer-forward hit-test list.
    pub fn with_hit(mut self, pose: Pose) -> Self {
        self.hits.push(HitTestResult { pose });
        self
    }

    /// Append an active transient input with the given results (may be
    /// empty).
    pub fn with_transient_input(mut self, input_source: &str, poses: Vec<Pose>) -> Self {
        self.transient.push(TransientHitTestResult {
            input_source: input_source.to_string(),
            results: poses.into_iter().map(|pose| HitTestResult { pose }).collect(),
        });
        self
    }
}

#[async_trait(?Send)]
impl XrFrame for SimFrame {
    fn hit_test_results(&self, _source: HitTestSourceId, _space: SpaceId) -> Vec<HitTestResult> {
        self.hits.clone()
    }

    fn transient_hit_test_results(
        &self,
        _source: HitTestSourceId,
        _space: SpaceId,
    ) -> Vec<TransientHitTestResult> {
        self.transient.clone()
    }

    fn viewer_pose(&self, space: SpaceId) -> Option<Pose> {
        let viewer = self.world.borrow().viewer_space;
        self.pose(viewer, space).ok().flatten()
    }

    fn pose(&self, space: SpaceId, base: SpaceId) -> Result<Option<Pose>, ArError> {
        let w = self.world.borrow();
        let (Some(target), Some(base)) = (w.space_pose(space)?, w.space_pose(base)?) else {
            return Ok(None);
        };
        Ok(Some(target.relative_to(base)))
    }

    async fn create_anchor(&self, pose: Pose, space: SpaceId) -> Result<Box<dyn XrAnchor>, ArError> {
        SimWorld::create_anchor(
            &self.world,
            PlatformOperation::FrameAnchorCreation,
            pose,
            space,
        )
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SimAnchor
// ────────────────────────────────────────────────────────────────────────────

/// Anchor handed out by the simulator.
pub struct SimAnchor {
    world: Rc<RefCell<SimWorld>>,
    space: SpaceId,
}

impl XrAnchor for SimAnchor {
    fn anchor_space(&self) -> Option<SpaceId> {
        let w = self.world.borrow();
        (!w.untrackable_anchors && !w.on_demand_anchor_spaces).then_some(self.space)
    }

    fn create_anchor_space(&self) -> Option<SpaceId> {
        let w = self.world.borrow();
        (!w.untrackable_anchors && w.on_demand_anchor_spaces).then_some(self.space)
    }

    fn delete(&self) -> Result<(), ArError> {
        let mut w = self.world.borrow_mut();
        if w.fail_anchor_deletion {
            return Err(ArError::Platform("anchor deletion rejected".to_string()));
        }
        if let Some(s) = w.spaces.get_mut(&self.space) {
            s.deleted = true;
        }
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use arplace_spatial::Vec3;
    use std::cell::Cell;

    fn request(optional: Vec<SessionFeature>) -> SessionRequest {
        SessionRequest {
            required_features: vec![SessionFeature::Local],
            optional_features: optional,
            dom_overlay_root: None,
        }
    }

    #[tokio::test]
    async fn grants_only_available_optional_features() {
        let sim = SimXr::new();
        let session = sim
            .request_session(&request(vec![SessionFeature::HitTest, SessionFeature::Anchors]))
            .await
            .unwrap();
        let features = session.enabled_features();
        assert!(features.contains(&SessionFeature::HitTest));
        assert!(!features.contains(&SessionFeature::Anchors));
        assert!(!session.supports(PlatformOperation::FrameAnchorCreation));
    }

    #[tokio::test]
    async fn rejects_dom_overlay_when_configured() {
        let sim = SimXr::new().with_dom_overlay().rejecting_dom_overlay();
        let err = sim
            .request_session(&request(vec![SessionFeature::DomOverlay]))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ArError::SessionRequestFailed(_)));
        assert_eq!(sim.session_requests().len(), 1);
    }

    #[tokio::test]
    async fn end_fires_callbacks_exactly_once() {
        let sim = SimXr::new();
        let session = sim.request_session(&request(vec![])).await.unwrap();
        let fired = Rc::new(Cell::new(0));
        let f = Rc::clone(&fired);
        session.on_end(Box::new(move || f.set(f.get() + 1)));

        session.end();
        sim.end_session();
        assert_eq!(fired.get(), 1);
        assert!(!sim.is_session_live());
    }

    #[tokio::test]
    async fn anchor_pose_follows_world_updates() {
        let sim = SimXr::new().with_anchors();
        let session = sim
            .request_session(&request(vec![SessionFeature::Anchors]))
            .await
            .unwrap();
        let local = session
            .request_reference_space(ReferenceSpaceType::Local)
            .await
            .unwrap();
        let frame = sim.frame();
        let anchor = frame
            .create_anchor(Pose::from_position(Vec3::new(0.0, 0.0, -1.0)), local)
            .await
            .unwrap();
        let space = anchor.anchor_space().unwrap();

        let p = frame.pose(space, local).unwrap().unwrap();
        assert!((p.position.z + 1.0).abs() < 1e-5);

        sim.move_anchor(space, Pose::from_position(Vec3::new(0.2, 0.0, -1.0)));
        let p = sim.frame().pose(space, local).unwrap().unwrap();
        assert!((p.position.x - 0.2).abs() < 1e-5);

        anchor.delete().unwrap();
        assert!(sim.frame().pose(space, local).is_err());
        assert_eq!(sim.deleted_anchor_count(), 1);
    }

    #[tokio::test]
    async fn frame_anchor_creation_unavailable_without_capability() {
        let sim = SimXr::new().with_session_anchors();
        let frame = sim.frame();
        let err = frame
            .create_anchor(Pose::identity(), sim.local_space())
            .await
            .err()
            .unwrap();
        assert_eq!(err, ArError::AnchorUnavailable);
    }

    #[test]
    fn viewer_pose_is_relative_to_base() {
        let sim = SimXr::new();
        sim.set_viewer_pose(Pose::from_position(Vec3::new(0.0, 1.5, 0.0)));
        let vp = sim.frame().viewer_pose(sim.local_space()).unwrap();
        assert!((vp.position.y - 1.5).abs() < 1e-5);
    }
}
