//! `arplace-runtime` – the stateful half of AR placement.
//!
//! Owns the session lifecycle, the placement state machine and the
//! per-frame tick, and exposes them to a UI through [`ArApp`].
//!
//! # Modules
//!
//! - [`session`] – [`SessionManager`][session::SessionManager]: acquires
//!   the one live AR session (with a single retry without the DOM overlay),
//!   binds the renderer, sets up reference spaces and hit-test sources, and
//!   drops all of them together when the platform ends the session.
//! - [`placement`] – [`PlacementMachine`][placement::PlacementMachine]:
//!   `Idle → Selecting → Placing → Idle`. Owns the preview and the anchored
//!   and unanchored placement lists; stale asset loads are detected through
//!   a generation counter.
//! - [`frame`] – [`update_frame`][frame::update_frame]: resolve the hit
//!   pose, move the reticle and the preview, re-pose anchored objects,
//!   render.
//! - [`app`] – [`ArApp`][app::ArApp]: the UI callbacks and the animation
//!   frame entry point, holding an [`ArSessionContext`][app::ArSessionContext].
//! - [`config`] – [`AppConfig`][config::AppConfig]: session options and the
//!   model catalog, loaded from `~/.arplace/config.toml`.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: the global
//!   `tracing` subscriber with optional OTLP export.
//!
//! # Example
//!
//! ```rust
//! use std::rc::Rc;
//!
//! use arplace_runtime::{ArApp, SessionConfig};
//! use arplace_spatial::{Pose, Vec3};
//! use arplace_xr::sim::SimXr;
//! use arplace_xr::sim_scene::{RecordingUi, SimAssetLoader, SimRenderer, SimScene};
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let sim = SimXr::new().with_anchors();
//! let mut app = ArApp::new(
//!     Box::new(sim.clone()),
//!     Box::new(SimScene::new()),
//!     Box::new(SimRenderer::new()),
//!     Box::new(SimAssetLoader::default()),
//!     Box::new(RecordingUi::new()),
//!     SessionConfig::default(),
//! );
//!
//! app.start_xr().await?;
//! app.select_model("chair").await?;
//! let hit = Pose::from_position(Vec3::new(0.0, 0.0, -1.0));
//! app.on_frame(Rc::new(sim.frame().with_hit(hit)));
//! assert!(app.confirm().await.is_some());
//! # Ok::<(), arplace_types::ArError>(())
//! # }).unwrap();
//! ```

pub mod app;
pub mod config;
pub mod frame;
pub mod placement;
pub mod session;
pub mod telemetry;

pub use app::{ArApp, ArSessionContext};
pub use config::{AppConfig, ConfigError};
pub use frame::{FrameReport, update_frame};
pub use placement::{
    AnchorContext, AnchoredPlacement, ClearReport, ConfirmOutcome, PlacementMachine,
    PlacementPhase, SelectionOutcome, SelectionTicket, UnanchoredPlacement,
};
pub use session::{ActiveSession, SessionConfig, SessionManager, SessionPhase};
pub use telemetry::{TracerProviderGuard, init_tracing};
