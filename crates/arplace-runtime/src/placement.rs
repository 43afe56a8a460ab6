//! Placement State Machine.
//!
//! ```text
//! Idle ──select──▶ Selecting ──loaded──▶ Placing ──confirm / cancel──▶ Idle
//!                     │   ▲                 │
//!                     │   └──── select ─────┘
//!                     └── load failed / cancel / clear ──▶ Idle
//! ```
//!
//! The machine owns the preview and both placement collections; nothing
//! else mutates them. Asset loads run outside the machine: a
//! [`SelectionTicket`] is handed out when loading starts and the result is
//! only applied if the ticket is still current. Any later selection, cancel
//! or clear bumps the generation and turns older tickets stale.

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use arplace_kernel::{
    AnchorRelease, SessionCapabilities, anchor_space, release_anchor, try_create_anchor,
};
use arplace_spatial::{Pose, Vec3};
use arplace_types::{ArError, ObjectId, PlacementId, SpaceId};
use arplace_xr::{LoadedModel, Scene, XrAnchor, XrFrame, XrSession};

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementPhase {
    /// No selection in flight and no preview.
    Idle,
    /// An asset load is in flight.
    Selecting,
    /// A preview is live and follows the hit pose.
    Placing,
}

/// Proof that a selection started. Only the most recent ticket is honoured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionTicket {
    generation: u64,
    model_id: String,
}

impl SelectionTicket {
    pub fn model_id(&self) -> &str {
        &self.model_id
    }
}

/// Result of applying a finished asset load.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionOutcome {
    /// The model is in the scene as the (still hidden) preview.
    Placing(ObjectId),
    /// A newer selection, a cancel or a clear happened first; nothing changed.
    Superseded,
    /// The load failed; the machine is back to [`PlacementPhase::Idle`].
    Failed(ArError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmOutcome {
    Anchored(PlacementId),
    Unanchored(PlacementId),
}

/// A confirmed object whose transform follows a platform anchor.
pub struct AnchoredPlacement {
    pub id: PlacementId,
    pub model_id: String,
    pub object: ObjectId,
    pub anchor: Box<dyn XrAnchor>,
    /// `None` when the anchor cannot be tracked per frame. The anchor is
    /// still kept so it can be released.
    pub anchor_space: Option<SpaceId>,
    /// Whether the session that created the anchor could delete it.
    pub deletable: bool,
    pub placed_at: DateTime<Utc>,
}

/// A confirmed object at a fixed transform.
#[derive(Debug, Clone, PartialEq)]
pub struct UnanchoredPlacement {
    pub id: PlacementId,
    pub model_id: String,
    pub object: ObjectId,
    pub pose: Pose,
    pub placed_at: DateTime<Utc>,
}

/// What [`PlacementMachine::clear_all`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClearReport {
    pub anchored_removed: usize,
    pub unanchored_removed: usize,
    pub preview_discarded: bool,
    pub anchors_released: usize,
    /// Deletions the platform rejected. The objects were removed anyway.
    pub anchor_release_failures: usize,
}

/// Session state the anchor broker needs to commit a placement.
pub struct AnchorContext<'a> {
    pub frame: &'a dyn XrFrame,
    pub session: &'a dyn XrSession,
    pub capabilities: &'a SessionCapabilities,
    pub reference_space: SpaceId,
}

#[derive(Debug, Clone)]
struct Preview {
    object: ObjectId,
    model_id: String,
}

// ────────────────────────────────────────────────────────────────────────────
// PlacementMachine
// ────────────────────────────────────────────────────────────────────────────

pub struct PlacementMachine {
    phase: PlacementPhase,
    generation: u64,
    selected_model: Option<String>,
    preview: Option<Preview>,
    anchored: Vec<AnchoredPlacement>,
    unanchored: Vec<UnanchoredPlacement>,
}

impl Default for PlacementMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl PlacementMachine {
    pub fn new() -> Self {
        Self {
            phase: PlacementPhase::Idle,
            generation: 0,
            selected_model: None,
            preview: None,
            anchored: Vec::new(),
            unanchored: Vec::new(),
        }
    }

    pub fn phase(&self) -> PlacementPhase {
        self.phase
    }

    /// The most recently selected model, kept after confirm and cancel.
    pub fn selected_model(&self) -> Option<&str> {
        self.selected_model.as_deref()
    }

    pub fn preview_object(&self) -> Option<ObjectId> {
        self.preview.as_ref().map(|p| p.object)
    }

    pub fn anchored(&self) -> &[AnchoredPlacement] {
        &self.anchored
    }

    pub fn unanchored(&self) -> &[UnanchoredPlacement] {
        &self.unanchored
    }

    // ── Selection ───────────────────────────────────────────────────────────

    /// Start selecting `model_id`.
    ///
    /// The selection is remembered even when rejected. On success any
    /// existing preview is removed from `scene` and the returned ticket must
    /// be passed to [`complete_selection`][Self::complete_selection] once the
    /// asset has loaded.
    ///
    /// # Errors
    ///
    /// [`ArError::NoActiveSession`] when `session_active` is false; the
    /// machine is left untouched apart from the remembered selection.
    pub fn begin_selection(
        &mut self,
        model_id: &str,
        session_active: bool,
        scene: &mut dyn Scene,
    ) -> Result<SelectionTicket, ArError> {
        self.selected_model = Some(model_id.to_string());
        if !session_active {
            debug!(model_id, "selection rejected: no active session");
            return Err(ArError::NoActiveSession);
        }

        self.discard_preview(scene);
        self.generation += 1;
        self.phase = PlacementPhase::Selecting;
        info!(model_id, generation = self.generation, "model selected; loading");
        Ok(SelectionTicket {
            generation: self.generation,
            model_id: model_id.to_string(),
        })
    }

    /// `true` if `ticket` belongs to the selection currently in flight.
    pub fn is_current(&self, ticket: &SelectionTicket) -> bool {
        self.phase == PlacementPhase::Selecting && ticket.generation == self.generation
    }

    /// Apply the result of the load started by `ticket`.
    ///
    /// A successful load is added to `scene` invisible, at its normalized
    /// pose, and becomes the preview.
    pub fn complete_selection(
        &mut self,
        ticket: &SelectionTicket,
        loaded: Result<LoadedModel, ArError>,
        scene: &mut dyn Scene,
    ) -> SelectionOutcome {
        if !self.is_current(ticket) {
            debug!(
                model_id = %ticket.model_id,
                generation = ticket.generation,
                current = self.generation,
                "dropping superseded model load"
            );
            return SelectionOutcome::Superseded;
        }

        match loaded {
            Ok(model) => {
                let object = model.root;
                scene.set_visible(object, false);
                scene.set_pose(object, model.initial_pose());
                scene.add(object);
                self.preview = Some(Preview {
                    object,
                    model_id: ticket.model_id.clone(),
                });
                self.phase = PlacementPhase::Placing;
                info!(model_id = %ticket.model_id, "model loaded; placing");
                SelectionOutcome::Placing(object)
            }
            Err(e) => {
                warn!(model_id = %ticket.model_id, error = %e, "model load failed");
                self.phase = PlacementPhase::Idle;
                SelectionOutcome::Failed(e)
            }
        }
    }

    // ── Per frame ───────────────────────────────────────────────────────────

    /// Move the preview to this frame's hit pose, yawed to face the viewer.
    ///
    /// Without a pose the preview keeps its last transform and stays
    /// visible once it has been shown. Does nothing outside
    /// [`PlacementPhase::Placing`].
    pub fn update_preview(
        &mut self,
        hit_pose: Option<Pose>,
        viewer_position: Option<Vec3>,
        scene: &mut dyn Scene,
    ) {
        if self.phase != PlacementPhase::Placing {
            return;
        }
        let (Some(preview), Some(pose)) = (self.preview.as_ref(), hit_pose) else {
            return;
        };

        let orientation = viewer_position
            .and_then(|viewer| pose.yaw_towards(viewer))
            .unwrap_or(pose.orientation);
        scene.set_visible(preview.object, true);
        scene.set_pose(preview.object, Pose::new(pose.position, orientation));
    }

    // ── Commit / discard ────────────────────────────────────────────────────

    /// Commit the preview at `hit_pose`.
    ///
    /// Returns `None` (and changes nothing) without a preview or a pose.
    /// Otherwise an anchor is attempted through `anchoring`; when that is
    /// `None`, unavailable, or rejected, the object is recorded as an
    /// unanchored placement at its current transform. Either way the preview
    /// is released and the machine returns to [`PlacementPhase::Idle`].
    #[instrument(name = "placement.confirm", skip_all)]
    pub async fn confirm(
        &mut self,
        hit_pose: Option<Pose>,
        anchoring: Option<AnchorContext<'_>>,
        scene: &mut dyn Scene,
    ) -> Option<ConfirmOutcome> {
        if self.phase != PlacementPhase::Placing {
            return None;
        }
        let pose = hit_pose?;
        let object = self.preview.as_ref()?.object;

        let attempt = match &anchoring {
            Some(ctx) => {
                try_create_anchor(ctx.frame, ctx.session, ctx.capabilities, pose, ctx.reference_space)
                    .await
            }
            None => Err(ArError::AnchorUnavailable),
        };

        let preview = self.preview.take()?;
        self.phase = PlacementPhase::Idle;
        let id = PlacementId::new();
        let placed_at = Utc::now();

        match attempt {
            Ok(anchor) => {
                let space = anchor_space(anchor.as_ref());
                let deletable = anchoring
                    .as_ref()
                    .is_some_and(|ctx| ctx.capabilities.supports_anchor_deletion());
                info!(
                    placement = %id.0,
                    model_id = %preview.model_id,
                    trackable = space.is_some(),
                    "placement confirmed with anchor"
                );
                self.anchored.push(AnchoredPlacement {
                    id,
                    model_id: preview.model_id,
                    object,
                    anchor,
                    anchor_space: space,
                    deletable,
                    placed_at,
                });
                Some(ConfirmOutcome::Anchored(id))
            }
            Err(e) => {
                match &e {
                    ArError::AnchorUnavailable => debug!("anchors unavailable; placing unanchored"),
                    other => warn!(error = %other, "anchor creation failed; placing unanchored"),
                }
                let pose = scene.pose(object).unwrap_or(pose);
                info!(
                    placement = %id.0,
                    model_id = %preview.model_id,
                    "placement confirmed without anchor"
                );
                self.unanchored.push(UnanchoredPlacement {
                    id,
                    model_id: preview.model_id,
                    object,
                    pose,
                    placed_at,
                });
                Some(ConfirmOutcome::Unanchored(id))
            }
        }
    }

    /// Drop the preview (and any selection in flight) without touching
    /// confirmed placements. Returns `true` if there was anything to drop.
    pub fn cancel(&mut self, scene: &mut dyn Scene) -> bool {
        let was_busy = self.phase != PlacementPhase::Idle;
        let discarded = self.discard_preview(scene);
        if self.phase == PlacementPhase::Selecting {
            self.generation += 1;
        }
        self.phase = PlacementPhase::Idle;
        if was_busy {
            info!("placement cancelled");
        }
        discarded || was_busy
    }

    /// Remove every placement and the preview, releasing anchors where the
    /// platform allows it. Deletion failures are logged and counted, never
    /// returned. Calling it again is a no-op.
    #[instrument(name = "placement.clear_all", skip_all)]
    pub fn clear_all(&mut self, scene: &mut dyn Scene) -> ClearReport {
        let mut report = ClearReport::default();

        for placement in self.anchored.drain(..) {
            match release_anchor(placement.anchor.as_ref(), placement.deletable) {
                AnchorRelease::Released => report.anchors_released += 1,
                AnchorRelease::Unsupported => {}
                AnchorRelease::Failed(_) => report.anchor_release_failures += 1,
            }
            scene.remove(placement.object);
            report.anchored_removed += 1;
        }
        for placement in self.unanchored.drain(..) {
            scene.remove(placement.object);
            report.unanchored_removed += 1;
        }

        report.preview_discarded = self.discard_preview(scene);
        if self.phase == PlacementPhase::Selecting {
            self.generation += 1;
        }
        self.phase = PlacementPhase::Idle;

        info!(
            anchored = report.anchored_removed,
            unanchored = report.unanchored_removed,
            release_failures = report.anchor_release_failures,
            "all placements cleared"
        );
        report
    }

    fn discard_preview(&mut self, scene: &mut dyn Scene) -> bool {
        match self.preview.take() {
            Some(preview) => {
                scene.remove(preview.object);
                debug!(model_id = %preview.model_id, "preview discarded");
                true
            }
            None => false,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use arplace_types::SessionFeature;
    use arplace_xr::sim::SimXr;
    use arplace_xr::sim_scene::{SimAssetLoader, SimScene};
    use arplace_xr::{AssetLoader, SessionRequest, XrSystem};

    fn hit() -> Pose {
        Pose::from_position(Vec3::new(0.0, 0.0, -1.0))
    }

    async fn placing(machine: &mut PlacementMachine, scene: &mut SimScene, id: &str) -> ObjectId {
        let loader = SimAssetLoader::default();
        let ticket = machine.begin_selection(id, true, scene).unwrap();
        let loaded = loader.load_model(id).await;
        match machine.complete_selection(&ticket, loaded, scene) {
            SelectionOutcome::Placing(object) => object,
            other => panic!("expected placing, got {other:?}"),
        }
    }

    async fn session_for(sim: &SimXr) -> (Box<dyn XrSession>, SessionCapabilities) {
        let session = sim
            .request_session(&SessionRequest {
                required_features: vec![SessionFeature::Local],
                optional_features: vec![SessionFeature::HitTest, SessionFeature::Anchors],
                dom_overlay_root: None,
            })
            .await
            .unwrap();
        let caps = SessionCapabilities::negotiate(session.as_ref());
        (session, caps)
    }

    #[test]
    fn selection_without_session_stays_idle() {
        let mut machine = PlacementMachine::new();
        let mut scene = SimScene::new();

        let err = machine.begin_selection("chair", false, &mut scene);
        assert_eq!(err, Err(ArError::NoActiveSession));
        assert_eq!(machine.phase(), PlacementPhase::Idle);
        assert_eq!(machine.selected_model(), Some("chair"));
        assert_eq!(scene.object_count(), 1);
    }

    #[tokio::test]
    async fn loaded_model_enters_placing_hidden() {
        let mut machine = PlacementMachine::new();
        let mut scene = SimScene::new();

        let object = placing(&mut machine, &mut scene, "chair").await;
        assert_eq!(machine.phase(), PlacementPhase::Placing);
        assert_eq!(machine.preview_object(), Some(object));
        assert!(scene.contains(object));
        assert!(!scene.is_visible(object));
    }

    #[tokio::test]
    async fn superseded_load_is_dropped() {
        let loader = SimAssetLoader::default();
        let mut machine = PlacementMachine::new();
        let mut scene = SimScene::new();

        let first = machine.begin_selection("chair", true, &mut scene).unwrap();
        let second = machine.begin_selection("duck", true, &mut scene).unwrap();
        assert!(!machine.is_current(&first));

        let late = loader.load_model("chair").await;
        let current = loader.load_model("duck").await;
        let duck_root = current.as_ref().unwrap().root;

        assert_eq!(
            machine.complete_selection(&second, current, &mut scene),
            SelectionOutcome::Placing(duck_root)
        );
        assert_eq!(
            machine.complete_selection(&first, late, &mut scene),
            SelectionOutcome::Superseded
        );
        // Reticle plus exactly one preview.
        assert_eq!(scene.object_count(), 2);
        assert_eq!(machine.preview_object(), Some(duck_root));
    }

    #[tokio::test]
    async fn reselecting_removes_existing_preview() {
        let mut machine = PlacementMachine::new();
        let mut scene = SimScene::new();

        let chair = placing(&mut machine, &mut scene, "chair").await;
        let duck = placing(&mut machine, &mut scene, "duck").await;
        assert!(!scene.contains(chair));
        assert!(scene.contains(duck));
        assert_eq!(scene.object_count(), 2);
    }

    #[tokio::test]
    async fn failed_load_returns_to_idle() {
        let loader = SimAssetLoader::default().failing_on("helmet");
        let mut machine = PlacementMachine::new();
        let mut scene = SimScene::new();

        let ticket = machine.begin_selection("helmet", true, &mut scene).unwrap();
        let outcome = machine.complete_selection(&ticket, loader.load_model("helmet").await, &mut scene);
        assert!(matches!(outcome, SelectionOutcome::Failed(ArError::AssetLoadFailed { .. })));
        assert_eq!(machine.phase(), PlacementPhase::Idle);
        assert_eq!(scene.object_count(), 1);
    }

    #[tokio::test]
    async fn preview_faces_viewer_and_stays_visible_without_pose() {
        let mut machine = PlacementMachine::new();
        let mut scene = SimScene::new();
        let object = placing(&mut machine, &mut scene, "duck").await;

        machine.update_preview(None, None, &mut scene);
        assert!(!scene.is_visible(object));

        // Viewer at the origin, hit one metre ahead on -Z: the model turns
        // around to face back along +Z.
        machine.update_preview(Some(hit()), Some(Vec3::zero()), &mut scene);
        let shown = scene.pose(object).unwrap();
        assert!(scene.is_visible(object));
        assert_eq!(shown.position, hit().position);
        let facing = shown.orientation.rotate(Vec3::new(0.0, 0.0, 1.0));
        assert!((facing.z - 1.0).abs() < 1e-5);

        machine.update_preview(None, Some(Vec3::zero()), &mut scene);
        assert!(scene.is_visible(object));
        assert_eq!(scene.pose(object), Some(shown));
    }

    #[tokio::test]
    async fn confirm_is_noop_without_preview_or_pose() {
        let mut machine = PlacementMachine::new();
        let mut scene = SimScene::new();
        assert!(machine.confirm(Some(hit()), None, &mut scene).await.is_none());

        placing(&mut machine, &mut scene, "duck").await;
        assert!(machine.confirm(None, None, &mut scene).await.is_none());
        assert_eq!(machine.phase(), PlacementPhase::Placing);
        assert!(machine.unanchored().is_empty());
    }

    #[tokio::test]
    async fn confirm_during_selecting_is_ignored() {
        let mut machine = PlacementMachine::new();
        let mut scene = SimScene::new();
        machine.begin_selection("duck", true, &mut scene).unwrap();

        assert!(machine.confirm(Some(hit()), None, &mut scene).await.is_none());
        assert_eq!(machine.phase(), PlacementPhase::Selecting);
    }

    #[tokio::test]
    async fn confirm_without_anchors_places_unanchored() {
        let sim = SimXr::new();
        let (session, caps) = session_for(&sim).await;
        let frame = sim.frame();
        let mut machine = PlacementMachine::new();
        let mut scene = SimScene::new();
        let object = placing(&mut machine, &mut scene, "duck").await;
        machine.update_preview(Some(hit()), None, &mut scene);

        let ctx = AnchorContext {
            frame: &frame,
            session: session.as_ref(),
            capabilities: &caps,
            reference_space: sim.local_space(),
        };
        let outcome = machine.confirm(Some(hit()), Some(ctx), &mut scene).await;

        assert!(matches!(outcome, Some(ConfirmOutcome::Unanchored(_))));
        assert!(machine.anchored().is_empty());
        assert_eq!(machine.unanchored().len(), 1);
        assert_eq!(machine.unanchored()[0].object, object);
        assert_eq!(machine.unanchored()[0].pose.position, Vec3::new(0.0, 0.0, -1.0));
        assert!(machine.preview_object().is_none());
        assert_eq!(machine.phase(), PlacementPhase::Idle);
        assert_eq!(machine.selected_model(), Some("duck"));
        assert!(scene.contains(object));
    }

    #[tokio::test]
    async fn confirm_with_anchors_records_anchored_placement() {
        let sim = SimXr::new().with_anchors();
        let (session, caps) = session_for(&sim).await;
        let frame = sim.frame();
        let mut machine = PlacementMachine::new();
        let mut scene = SimScene::new();
        placing(&mut machine, &mut scene, "chair").await;

        let ctx = AnchorContext {
            frame: &frame,
            session: session.as_ref(),
            capabilities: &caps,
            reference_space: sim.local_space(),
        };
        let outcome = machine.confirm(Some(hit()), Some(ctx), &mut scene).await;

        assert!(matches!(outcome, Some(ConfirmOutcome::Anchored(_))));
        assert_eq!(machine.anchored().len(), 1);
        assert!(machine.unanchored().is_empty());
        assert!(machine.anchored()[0].anchor_space.is_some());
        assert!(machine.anchored()[0].deletable);
        assert_eq!(sim.live_anchor_count(), 1);
    }

    #[tokio::test]
    async fn rejected_anchor_degrades_to_unanchored() {
        let sim = SimXr::new().with_anchors().failing_anchor_creation();
        let (session, caps) = session_for(&sim).await;
        let frame = sim.frame();
        let mut machine = PlacementMachine::new();
        let mut scene = SimScene::new();
        placing(&mut machine, &mut scene, "chair").await;

        let ctx = AnchorContext {
            frame: &frame,
            session: session.as_ref(),
            capabilities: &caps,
            reference_space: sim.local_space(),
        };
        let outcome = machine.confirm(Some(hit()), Some(ctx), &mut scene).await;
        assert!(matches!(outcome, Some(ConfirmOutcome::Unanchored(_))));
        assert!(machine.anchored().is_empty());
    }

    #[tokio::test]
    async fn cancel_removes_preview_only() {
        let mut machine = PlacementMachine::new();
        let mut scene = SimScene::new();
        let placed = placing(&mut machine, &mut scene, "duck").await;
        machine.confirm(Some(hit()), None, &mut scene).await;

        let preview = placing(&mut machine, &mut scene, "chair").await;
        assert!(machine.cancel(&mut scene));
        assert!(!scene.contains(preview));
        assert!(machine.preview_object().is_none());
        assert_eq!(machine.phase(), PlacementPhase::Idle);
        assert_eq!(machine.unanchored().len(), 1);
        assert!(scene.contains(placed));

        assert!(!machine.cancel(&mut scene));
    }

    #[tokio::test]
    async fn cancel_during_selecting_drops_late_load() {
        let loader = SimAssetLoader::default();
        let mut machine = PlacementMachine::new();
        let mut scene = SimScene::new();

        let ticket = machine.begin_selection("chair", true, &mut scene).unwrap();
        assert!(machine.cancel(&mut scene));
        let outcome = machine.complete_selection(&ticket, loader.load_model("chair").await, &mut scene);
        assert_eq!(outcome, SelectionOutcome::Superseded);
        assert_eq!(scene.object_count(), 1);
        assert_eq!(machine.phase(), PlacementPhase::Idle);
    }

    #[tokio::test]
    async fn clear_all_is_idempotent_and_tolerates_release_failure() {
        let sim = SimXr::new().with_anchors().failing_anchor_deletion();
        let (session, caps) = session_for(&sim).await;
        let frame = sim.frame();
        let mut machine = PlacementMachine::new();
        let mut scene = SimScene::new();

        placing(&mut machine, &mut scene, "chair").await;
        let ctx = AnchorContext {
            frame: &frame,
            session: session.as_ref(),
            capabilities: &caps,
            reference_space: sim.local_space(),
        };
        machine.confirm(Some(hit()), Some(ctx), &mut scene).await;
        placing(&mut machine, &mut scene, "duck").await;
        machine.confirm(Some(hit()), None, &mut scene).await;
        placing(&mut machine, &mut scene, "helmet").await;
        assert_eq!(scene.object_count(), 4);

        let report = machine.clear_all(&mut scene);
        assert_eq!(report.anchored_removed, 1);
        assert_eq!(report.unanchored_removed, 1);
        assert!(report.preview_discarded);
        assert_eq!(report.anchor_release_failures, 1);
        assert_eq!(scene.object_count(), 1);

        let again = machine.clear_all(&mut scene);
        assert_eq!(again, ClearReport::default());
        assert!(machine.anchored().is_empty());
        assert!(machine.unanchored().is_empty());
        assert!(machine.preview_object().is_none());
    }

    #[tokio::test]
    async fn clear_all_releases_deletable_anchors() {
        let sim = SimXr::new().with_anchors();
        let (session, caps) = session_for(&sim).await;
        let frame = sim.frame();
        let mut machine = PlacementMachine::new();
        let mut scene = SimScene::new();

        placing(&mut machine, &mut scene, "chair").await;
        let ctx = AnchorContext {
            frame: &frame,
            session: session.as_ref(),
            capabilities: &caps,
            reference_space: sim.local_space(),
        };
        machine.confirm(Some(hit()), Some(ctx), &mut scene).await;

        let report = machine.clear_all(&mut scene);
        assert_eq!(report.anchors_released, 1);
        assert_eq!(sim.live_anchor_count(), 0);
        assert_eq!(sim.deleted_anchor_count(), 1);
    }

    #[tokio::test]
    async fn clear_all_tolerates_missing_delete_capability() {
        let sim = SimXr::new().with_anchors().without_anchor_deletion();
        let (session, caps) = session_for(&sim).await;
        assert!(!caps.supports_anchor_deletion());
        let frame = sim.frame();
        let mut machine = PlacementMachine::new();
        let mut scene = SimScene::new();

        let object = placing(&mut machine, &mut scene, "chair").await;
        let ctx = AnchorContext {
            frame: &frame,
            session: session.as_ref(),
            capabilities: &caps,
            reference_space: sim.local_space(),
        };
        let outcome = machine.confirm(Some(hit()), Some(ctx), &mut scene).await;
        assert!(matches!(outcome, Some(ConfirmOutcome::Anchored(_))));
        assert!(!machine.anchored()[0].deletable);

        let report = machine.clear_all(&mut scene);
        assert_eq!(report.anchored_removed, 1);
        assert_eq!(report.anchors_released, 0);
        assert_eq!(report.anchor_release_failures, 0);
        assert!(!scene.contains(object));
        assert!(machine.anchored().is_empty());
        assert_eq!(sim.live_anchor_count(), 1);

        assert_eq!(machine.clear_all(&mut scene), ClearReport::default());
    }

    #[tokio::test]
    async fn clear_all_invalidates_selection_in_flight() {
        let loader = SimAssetLoader::default();
        let mut machine = PlacementMachine::new();
        let mut scene = SimScene::new();

        let ticket = machine.begin_selection("duck", true, &mut scene).unwrap();
        machine.clear_all(&mut scene);
        let outcome = machine.complete_selection(&ticket, loader.load_model("duck").await, &mut scene);
        assert_eq!(outcome, SelectionOutcome::Superseded);
        assert_eq!(scene.object_count(), 1);
    }
}
