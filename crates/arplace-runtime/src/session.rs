//! Session Lifecycle Manager.
//!
//! Owns acquisition and teardown of the one live AR session:
//!
//! ```text
//! NoSession ──start──▶ Requesting ──ok──▶ Active ──end──▶ Ended
//!     ▲                    │                                 │
//!     └────────err─────────┘                  start (fresh) ─┘
//! ```
//!
//! Every session-scoped resource (reference spaces, hit-test sources, the
//! negotiated capability set) lives inside [`ActiveSession`] and is dropped
//! in one step when the session ends, so nothing downstream can keep a
//! handle to a dead session.

use std::cell::Cell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use arplace_kernel::{Capability, SessionCapabilities};
use arplace_types::{ArError, HitTestSourceId, SessionFeature, SpaceId};
use arplace_xr::{ReferenceSpaceType, Renderer, SessionRequest, XrSession, XrSystem};

/// Input profile used for touch-driven hit testing on handheld devices.
pub const DEFAULT_INPUT_PROFILE: &str = "generic-touchscreen";

// ────────────────────────────────────────────────────────────────────────────
// Configuration
// ────────────────────────────────────────────────────────────────────────────

/// Which optional features to ask the platform for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Root element for the DOM overlay. `None` disables the overlay request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dom_overlay_root: Option<String>,

    /// Profile string for the transient-input hit-test source.
    pub transient_input_profile: String,

    pub request_hit_test: bool,

    pub request_anchors: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            dom_overlay_root: None,
            transient_input_profile: DEFAULT_INPUT_PROFILE.to_string(),
            request_hit_test: true,
            request_anchors: true,
        }
    }
}

impl SessionConfig {
    /// The feature negotiation payload this configuration describes.
    ///
    /// `local` is always required; everything else is optional.
    pub fn session_request(&self) -> SessionRequest {
        let mut optional_features = Vec::new();
        if self.request_hit_test {
            optional_features.push(SessionFeature::HitTest);
        }
        if self.request_anchors {
            optional_features.push(SessionFeature::Anchors);
        }
        if self.dom_overlay_root.is_some() {
            optional_features.push(SessionFeature::DomOverlay);
        }
        SessionRequest {
            required_features: vec![SessionFeature::Local],
            optional_features,
            dom_overlay_root: self.dom_overlay_root.clone(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Session state
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    NoSession,
    Requesting,
    Active,
    Ended,
}

/// A live session together with every resource scoped to it.
pub struct ActiveSession {
    session: Box<dyn XrSession>,
    ended: Rc<Cell<bool>>,
    /// The `local` space every pose in the core is expressed against.
    pub reference_space: SpaceId,
    pub viewer_space: SpaceId,
    /// Viewer-forward source; `None` when hit testing was not granted.
    pub hit_test_source: Option<HitTestSourceId>,
    pub transient_hit_test_source: Option<HitTestSourceId>,
    pub capabilities: SessionCapabilities,
}

impl ActiveSession {
    pub fn session(&self) -> &dyn XrSession {
        self.session.as_ref()
    }

    /// `true` once the platform has fired the end notification.
    pub fn has_ended(&self) -> bool {
        self.ended.get()
    }
}

struct SessionResources {
    reference_space: SpaceId,
    viewer_space: SpaceId,
    hit_test_source: Option<HitTestSourceId>,
    transient_hit_test_source: Option<HitTestSourceId>,
    capabilities: SessionCapabilities,
}

/// Owns the session phase and, while active, the [`ActiveSession`].
///
/// Only this type creates or drops session-scoped resources.
pub struct SessionManager {
    phase: SessionPhase,
    active: Option<ActiveSession>,
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionManager {
    pub fn new() -> Self {
        Self {
            phase: SessionPhase::NoSession,
            active: None,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.phase == SessionPhase::Active
    }

    pub fn active(&self) -> Option<&ActiveSession> {
        self.active.as_ref()
    }

    /// Acquire a session, bind `renderer` to it and set up its spaces and
    /// hit-test sources.
    ///
    /// `on_ended` runs exactly once when the session ends, whichever side
    /// ended it. The manager also records the end itself; call
    /// [`poll_ended`][Self::poll_ended] before touching session state. There
    /// is no stop call: the end notification is the only teardown trigger.
    ///
    /// # Errors
    ///
    /// - [`ArError::SessionAlreadyActive`] while a session is live or being
    ///   requested.
    /// - [`ArError::UnsupportedPlatform`] before any platform call when the
    ///   device has no AR support.
    /// - [`ArError::SessionRequestFailed`] when negotiation is rejected, after
    ///   one retry without the DOM overlay if an overlay was configured.
    /// - Any error from binding or resource setup. The session is ended
    ///   before the error is returned.
    #[instrument(name = "session.start", skip_all)]
    pub async fn start(
        &mut self,
        system: &dyn XrSystem,
        renderer: &mut dyn Renderer,
        config: &SessionConfig,
        on_ended: Box<dyn FnOnce()>,
    ) -> Result<&ActiveSession, ArError> {
        if matches!(self.phase, SessionPhase::Requesting | SessionPhase::Active) {
            return Err(ArError::SessionAlreadyActive);
        }
        if !system.is_supported() {
            warn!("immersive AR is not supported on this device");
            return Err(ArError::UnsupportedPlatform);
        }

        self.phase = SessionPhase::Requesting;
        let session = match request_with_overlay_fallback(system, config).await {
            Ok(session) => session,
            Err(e) => {
                self.phase = SessionPhase::NoSession;
                return Err(e);
            }
        };

        let resources = match establish(session.as_ref(), renderer, config).await {
            Ok(resources) => resources,
            Err(e) => {
                warn!(error = %e, "session setup failed; ending session");
                session.end();
                self.phase = SessionPhase::NoSession;
                return Err(e);
            }
        };

        let ended = Rc::new(Cell::new(false));
        let flag = Rc::clone(&ended);
        session.on_end(Box::new(move || {
            flag.set(true);
            on_ended();
        }));

        info!(
            features = ?session.enabled_features(),
            transient_input = resources.transient_hit_test_source.is_some(),
            anchors = resources.capabilities.supports_anchors(),
            "AR session started"
        );
        self.phase = SessionPhase::Active;
        Ok(self.active.insert(ActiveSession {
            session,
            ended,
            reference_space: resources.reference_space,
            viewer_space: resources.viewer_space,
            hit_test_source: resources.hit_test_source,
            transient_hit_test_source: resources.transient_hit_test_source,
            capabilities: resources.capabilities,
        }))
    }

    /// If the platform has ended the session, drop every session-scoped
    /// resource and move to [`SessionPhase::Ended`]. Returns `true` exactly
    /// once per ended session.
    pub fn poll_ended(&mut self) -> bool {
        if self.active.as_ref().is_some_and(ActiveSession::has_ended) {
            self.teardown();
            true
        } else {
            false
        }
    }

    fn teardown(&mut self) {
        self.active = None;
        self.phase = SessionPhase::Ended;
        info!("AR session ended; session resources released");
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Internal helpers
// ────────────────────────────────────────────────────────────────────────────

async fn request_with_overlay_fallback(
    system: &dyn XrSystem,
    config: &SessionConfig,
) -> Result<Box<dyn XrSession>, ArError> {
    let request = config.session_request();
    info!(
        required = ?request.required_features,
        optional = ?request.optional_features,
        "requesting AR session"
    );
    match system.request_session(&request).await {
        Ok(session) => Ok(session),
        Err(e) if request.dom_overlay_root.is_some() => {
            warn!(error = %e, "session request failed with dom-overlay; retrying without it");
            system
                .request_session(&request.without_dom_overlay())
                .await
                .map_err(as_request_failure)
        }
        Err(e) => Err(as_request_failure(e)),
    }
}

fn as_request_failure(e: ArError) -> ArError {
    match e {
        ArError::SessionRequestFailed(_) | ArError::UnsupportedPlatform => e,
        other => ArError::SessionRequestFailed(other.to_string()),
    }
}

async fn establish(
    session: &dyn XrSession,
    renderer: &mut dyn Renderer,
    config: &SessionConfig,
) -> Result<SessionResources, ArError> {
    renderer.set_reference_space_type(ReferenceSpaceType::Local);
    renderer.bind_session(session).await?;

    let reference_space = session
        .request_reference_space(ReferenceSpaceType::Local)
        .await?;
    let viewer_space = session
        .request_reference_space(ReferenceSpaceType::Viewer)
        .await?;
    let capabilities = SessionCapabilities::negotiate(session);

    let hit_test_source = if capabilities.has(Capability::HitTest) {
        Some(session.request_hit_test_source(viewer_space).await?)
    } else {
        warn!("hit-test not granted; no viewer-forward hit testing this session");
        None
    };

    let transient_hit_test_source = if capabilities.supports_transient_input() {
        debug!(profile = %config.transient_input_profile, "requesting transient hit-test source");
        Some(
            session
                .request_transient_hit_test_source(&config.transient_input_profile)
                .await?,
        )
    } else {
        None
    };

    Ok(SessionResources {
        reference_space,
        viewer_space,
        hit_test_source,
        transient_hit_test_source,
        capabilities,
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use arplace_xr::sim::SimXr;
    use arplace_xr::sim_scene::SimRenderer;

    fn noop() -> Box<dyn FnOnce()> {
        Box::new(|| {})
    }

    fn overlay_config() -> SessionConfig {
        SessionConfig {
            dom_overlay_root: Some("overlay".to_string()),
            ..SessionConfig::default()
        }
    }

    #[test]
    fn default_request_requires_local_only() {
        let req = SessionConfig::default().session_request();
        assert_eq!(req.required_features, vec![SessionFeature::Local]);
        assert!(req.requests(SessionFeature::HitTest));
        assert!(req.requests(SessionFeature::Anchors));
        assert!(!req.requests(SessionFeature::DomOverlay));

        assert!(overlay_config().session_request().requests(SessionFeature::DomOverlay));
    }

    #[tokio::test]
    async fn unsupported_platform_fails_before_any_request() {
        let sim = SimXr::new().unsupported();
        let mut renderer = SimRenderer::new();
        let mut manager = SessionManager::new();

        let err = manager
            .start(&sim, &mut renderer, &SessionConfig::default(), noop())
            .await
            .err();
        assert_eq!(err, Some(ArError::UnsupportedPlatform));
        assert!(sim.session_requests().is_empty());
        assert_eq!(manager.phase(), SessionPhase::NoSession);
        assert_eq!(renderer.bound_sessions(), 0);
    }

    #[tokio::test]
    async fn start_sets_up_spaces_sources_and_capabilities() {
        let sim = SimXr::new().with_anchors().with_transient_input();
        let renderer = SimRenderer::new();
        let mut surface = renderer.clone();
        let mut manager = SessionManager::new();

        let active = manager
            .start(&sim, &mut surface, &SessionConfig::default(), noop())
            .await
            .unwrap();
        assert_eq!(active.reference_space, sim.local_space());
        assert!(active.hit_test_source.is_some());
        assert!(active.transient_hit_test_source.is_some());
        assert!(active.capabilities.supports_frame_anchor_creation());

        assert_eq!(manager.phase(), SessionPhase::Active);
        assert_eq!(renderer.bound_sessions(), 1);
        assert_eq!(renderer.reference_space_type(), Some(ReferenceSpaceType::Local));
    }

    #[tokio::test]
    async fn transient_source_only_with_capability() {
        let sim = SimXr::new();
        let mut renderer = SimRenderer::new();
        let mut manager = SessionManager::new();

        let active = manager
            .start(&sim, &mut renderer, &SessionConfig::default(), noop())
            .await
            .unwrap();
        assert!(active.hit_test_source.is_some());
        assert!(active.transient_hit_test_source.is_none());
        assert!(!active.capabilities.supports_anchors());
    }

    #[tokio::test]
    async fn overlay_rejection_retries_once_without_overlay() {
        let sim = SimXr::new().with_dom_overlay().rejecting_dom_overlay();
        let mut renderer = SimRenderer::new();
        let mut manager = SessionManager::new();

        manager
            .start(&sim, &mut renderer, &overlay_config(), noop())
            .await
            .unwrap();
        let requests = sim.session_requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].requests(SessionFeature::DomOverlay));
        assert!(!requests[1].requests(SessionFeature::DomOverlay));
        assert!(requests[1].dom_overlay_root.is_none());
    }

    #[tokio::test]
    async fn rejected_session_propagates_after_single_retry() {
        let sim = SimXr::new().rejecting_sessions();
        let mut renderer = SimRenderer::new();
        let mut manager = SessionManager::new();

        let err = manager
            .start(&sim, &mut renderer, &overlay_config(), noop())
            .await
            .err();
        assert!(matches!(err, Some(ArError::SessionRequestFailed(_))));
        assert_eq!(sim.session_requests().len(), 2);
        assert_eq!(manager.phase(), SessionPhase::NoSession);
    }

    #[tokio::test]
    async fn rejected_session_without_overlay_is_not_retried() {
        let sim = SimXr::new().rejecting_sessions();
        let mut renderer = SimRenderer::new();
        let mut manager = SessionManager::new();

        assert!(
            manager
                .start(&sim, &mut renderer, &SessionConfig::default(), noop())
                .await
                .is_err()
        );
        assert_eq!(sim.session_requests().len(), 1);
    }

    #[tokio::test]
    async fn second_start_while_active_is_rejected() {
        let sim = SimXr::new();
        let mut renderer = SimRenderer::new();
        let mut manager = SessionManager::new();
        let config = SessionConfig::default();

        manager.start(&sim, &mut renderer, &config, noop()).await.unwrap();
        let err = manager.start(&sim, &mut renderer, &config, noop()).await.err();
        assert_eq!(err, Some(ArError::SessionAlreadyActive));
        assert_eq!(sim.session_requests().len(), 1);
    }

    #[tokio::test]
    async fn binding_failure_ends_granted_session() {
        let sim = SimXr::new();
        let mut renderer = SimRenderer::new().failing_binding();
        let mut manager = SessionManager::new();

        let err = manager
            .start(&sim, &mut renderer, &SessionConfig::default(), noop())
            .await
            .err();
        assert!(matches!(err, Some(ArError::Platform(_))));
        assert!(!sim.is_session_live());
        assert_eq!(manager.phase(), SessionPhase::NoSession);
        assert!(manager.active().is_none());
    }

    #[tokio::test]
    async fn platform_end_fires_callback_and_releases_resources() {
        let sim = SimXr::new();
        let mut renderer = SimRenderer::new();
        let mut manager = SessionManager::new();
        let fired = Rc::new(Cell::new(0));
        let counter = Rc::clone(&fired);

        manager
            .start(
                &sim,
                &mut renderer,
                &SessionConfig::default(),
                Box::new(move || counter.set(counter.get() + 1)),
            )
            .await
            .unwrap();
        assert!(!manager.poll_ended());

        sim.end_session();
        assert_eq!(fired.get(), 1);
        assert!(manager.poll_ended());
        assert!(!manager.poll_ended());
        assert_eq!(manager.phase(), SessionPhase::Ended);
        assert!(manager.active().is_none());
    }

    #[tokio::test]
    async fn ended_session_can_be_restarted() {
        let sim = SimXr::new();
        let mut renderer = SimRenderer::new();
        let mut manager = SessionManager::new();
        let config = SessionConfig::default();

        manager.start(&sim, &mut renderer, &config, noop()).await.unwrap();
        sim.end_session();
        assert!(manager.poll_ended());
        assert_eq!(manager.phase(), SessionPhase::Ended);

        manager.start(&sim, &mut renderer, &config, noop()).await.unwrap();
        assert!(manager.is_active());
        assert_eq!(sim.session_requests().len(), 2);
    }
}
