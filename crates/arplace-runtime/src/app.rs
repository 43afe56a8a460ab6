//! [`ArApp`] – wires the placement core to its collaborators.
//!
//! The host forwards UI events (`start_xr`, `select_model`, `confirm`,
//! `cancel`, `clear`) and every animation frame (`on_frame`) to the app.
//! Everything runs on one execution context; the app holds the
//! [`ArSessionContext`] and lends each component exactly the state it may
//! mutate.
//!
//! The platform's session-end notification only marks the session as ended.
//! Hosts must call [`ArApp::sync_session`] from that notification to stop
//! the animation loop and update the UI right away; otherwise the teardown
//! happens at the next callback or frame.

use std::rc::Rc;

use tracing::{debug, info};

use arplace_spatial::Pose;
use arplace_types::ArError;
use arplace_xr::{AssetLoader, LoadedModel, Renderer, Scene, UiSink, XrFrame, XrSystem};

use crate::frame::{FrameReport, update_frame};
use crate::placement::{
    AnchorContext, ClearReport, ConfirmOutcome, PlacementMachine, SelectionOutcome,
    SelectionTicket,
};
use crate::session::{SessionConfig, SessionManager};

const TIP_WELCOME: &str = "Select a model and enter AR";
const TIP_SCAN: &str = "Move the device to detect a surface; drag with a finger to adjust";
const TIP_ENTER_AR_FIRST: &str = "Enter AR first, then place a model";
const TIP_PLACING: &str = "Move the device to find a surface, drag to adjust, then confirm";
const TIP_ANCHORED: &str = "Anchor created; the model is tracked in space";
const TIP_UNANCHORED: &str = "Anchors unavailable; model placed directly";
const TIP_CANCELLED: &str = "Placement cancelled";
const TIP_CLEARED: &str = "All models cleared";
const TIP_SESSION_ENDED: &str = "AR session ended";
const STATUS_CONNECTED: &str = "AR connected";
const STATUS_DISCONNECTED: &str = "Not connected";

// ────────────────────────────────────────────────────────────────────────────
// Session context
// ────────────────────────────────────────────────────────────────────────────

/// All mutable state of the running app.
///
/// Only [`SessionManager`] touches session-scoped resources and only
/// [`PlacementMachine`] touches the placement collections.
#[derive(Default)]
pub struct ArSessionContext {
    session: SessionManager,
    placement: PlacementMachine,
    latest_frame: Option<Rc<dyn XrFrame>>,
    latest_hit_pose: Option<Pose>,
}

impl ArSessionContext {
    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn placement(&self) -> &PlacementMachine {
        &self.placement
    }

    /// Hit pose of the most recent frame, used when confirming.
    pub fn latest_hit_pose(&self) -> Option<Pose> {
        self.latest_hit_pose
    }
}

// ────────────────────────────────────────────────────────────────────────────
// ArApp
// ────────────────────────────────────────────────────────────────────────────

pub struct ArApp {
    xr: Box<dyn XrSystem>,
    scene: Box<dyn Scene>,
    renderer: Box<dyn Renderer>,
    assets: Box<dyn AssetLoader>,
    ui: Box<dyn UiSink>,
    config: SessionConfig,
    context: ArSessionContext,
}

impl ArApp {
    pub fn new(
        xr: Box<dyn XrSystem>,
        scene: Box<dyn Scene>,
        renderer: Box<dyn Renderer>,
        assets: Box<dyn AssetLoader>,
        mut ui: Box<dyn UiSink>,
        config: SessionConfig,
    ) -> Self {
        ui.set_status(STATUS_DISCONNECTED);
        ui.set_tips(TIP_WELCOME);
        Self {
            xr,
            scene,
            renderer,
            assets,
            ui,
            config,
            context: ArSessionContext::default(),
        }
    }

    pub fn context(&self) -> &ArSessionContext {
        &self.context
    }

    pub fn scene(&self) -> &dyn Scene {
        self.scene.as_ref()
    }

    pub fn assets(&self) -> &dyn AssetLoader {
        self.assets.as_ref()
    }

    // ── UI callbacks ────────────────────────────────────────────────────────

    /// Enter AR. Failures are shown as tip text and returned.
    pub async fn start_xr(&mut self) -> Result<(), ArError> {
        self.sync_session();
        let started = self
            .context
            .session
            .start(
                self.xr.as_ref(),
                self.renderer.as_mut(),
                &self.config,
                Box::new(|| info!("platform signalled session end")),
            )
            .await
            .map(|_| ());
        if let Err(e) = started {
            self.ui.set_tips(&e.to_string());
            return Err(e);
        }

        self.ui.set_ar_running(true);
        self.ui.set_status(STATUS_CONNECTED);
        self.ui.set_tips(TIP_SCAN);
        self.renderer.set_animation_loop(true);
        Ok(())
    }

    /// Select `model_id` and load it as the new preview.
    ///
    /// Equivalent to [`request_model`][Self::request_model], loading through
    /// the app's asset loader, then
    /// [`finish_model_load`][Self::finish_model_load].
    pub async fn select_model(&mut self, model_id: &str) -> Result<(), ArError> {
        let ticket = self.request_model(model_id)?;
        let loaded = self.assets.load_model(model_id).await;
        self.finish_model_load(&ticket, loaded)
    }

    /// First half of a selection: validates the session and discards the
    /// current preview. The caller loads the asset and hands the result to
    /// [`finish_model_load`][Self::finish_model_load].
    ///
    /// # Errors
    ///
    /// [`ArError::NoActiveSession`] outside AR.
    pub fn request_model(&mut self, model_id: &str) -> Result<SelectionTicket, ArError> {
        self.sync_session();
        self.ui.set_active_model(model_id);
        let session_active = self.context.session.is_active();
        match self
            .context
            .placement
            .begin_selection(model_id, session_active, self.scene.as_mut())
        {
            Ok(ticket) => {
                self.ui.set_tips(TIP_PLACING);
                Ok(ticket)
            }
            Err(e) => {
                self.ui.set_tips(TIP_ENTER_AR_FIRST);
                Err(e)
            }
        }
    }

    /// Second half of a selection. A result for a superseded ticket is
    /// dropped without any UI change.
    ///
    /// # Errors
    ///
    /// The load error, after showing it as tip text.
    pub fn finish_model_load(
        &mut self,
        ticket: &SelectionTicket,
        loaded: Result<LoadedModel, ArError>,
    ) -> Result<(), ArError> {
        self.sync_session();
        match self
            .context
            .placement
            .complete_selection(ticket, loaded, self.scene.as_mut())
        {
            SelectionOutcome::Placing(_) => {
                self.ui.set_placing_enabled(true);
                Ok(())
            }
            SelectionOutcome::Superseded => Ok(()),
            SelectionOutcome::Failed(e) => {
                self.ui.set_tips(&e.to_string());
                Err(e)
            }
        }
    }

    /// Commit the preview at the last hit pose. `None` when there was
    /// nothing to commit.
    pub async fn confirm(&mut self) -> Option<ConfirmOutcome> {
        self.sync_session();
        let frame = self.context.latest_frame.clone();
        let anchoring = match (self.context.session.active(), frame.as_deref()) {
            (Some(active), Some(frame)) => Some(AnchorContext {
                frame,
                session: active.session(),
                capabilities: &active.capabilities,
                reference_space: active.reference_space,
            }),
            _ => None,
        };

        let outcome = self
            .context
            .placement
            .confirm(self.context.latest_hit_pose, anchoring, self.scene.as_mut())
            .await?;
        self.ui.set_placing_enabled(false);
        self.ui.set_tips(match outcome {
            ConfirmOutcome::Anchored(_) => TIP_ANCHORED,
            ConfirmOutcome::Unanchored(_) => TIP_UNANCHORED,
        });
        Some(outcome)
    }

    pub fn cancel(&mut self) {
        self.sync_session();
        self.context.placement.cancel(self.scene.as_mut());
        self.ui.set_placing_enabled(false);
        self.ui.set_tips(TIP_CANCELLED);
    }

    pub fn clear(&mut self) -> ClearReport {
        self.sync_session();
        let report = self.context.placement.clear_all(self.scene.as_mut());
        if report.preview_discarded {
            self.ui.set_placing_enabled(false);
        }
        self.ui.set_tips(TIP_CLEARED);
        report
    }

    // ── Frame loop ──────────────────────────────────────────────────────────

    /// The animation-frame callback. Returns `None` when no session is
    /// active, including the first frame after the platform ended it.
    pub fn on_frame(&mut self, frame: Rc<dyn XrFrame>) -> Option<FrameReport> {
        if self.sync_session() {
            return None;
        }
        let active = self.context.session.active()?;
        let report = update_frame(
            frame.as_ref(),
            active,
            &mut self.context.placement,
            self.scene.as_mut(),
            self.renderer.as_mut(),
        );
        self.context.latest_frame = Some(frame);
        self.context.latest_hit_pose = report.hit_pose;
        Some(report)
    }

    /// Apply a pending session end. Returns `true` if the session was torn
    /// down by this call.
    ///
    /// Hosts must call this from the platform's end notification: the
    /// callback registered with the session cannot reach the app, so until
    /// this runs the animation loop keeps going and the UI still reads
    /// connected. Every callback above calls it first as well, so no frame
    /// is rendered for an ended session either way.
    pub fn sync_session(&mut self) -> bool {
        if !self.context.session.poll_ended() {
            return false;
        }
        self.context.latest_frame = None;
        self.context.latest_hit_pose = None;
        if self.context.placement.cancel(self.scene.as_mut()) {
            debug!("in-flight placement discarded with the session");
        }
        self.renderer.set_animation_loop(false);
        self.ui.set_ar_running(false);
        self.ui.set_placing_enabled(false);
        self.ui.set_status(STATUS_DISCONNECTED);
        self.ui.set_tips(TIP_SESSION_ENDED);
        true
    }
}
