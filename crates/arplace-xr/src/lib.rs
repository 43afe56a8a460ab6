//! `arplace-xr` – collaborator contracts for AR placement.
//!
//! The placement core never talks to a browser, a GPU, or a glTF parser
//! directly. It talks to the traits in this crate, so platforms can be
//! swapped (or simulated) without touching placement logic.
//!
//! # Modules
//!
//! - [`platform`] – [`XrSystem`], [`XrSession`], [`XrFrame`], [`XrAnchor`]:
//!   the AR runtime (session negotiation, reference spaces, hit testing,
//!   anchors).
//! - [`scene`] – [`Scene`] and [`Renderer`]: the scene graph the placed
//!   models live in and the surface that draws it.
//! - [`assets`] – [`AssetLoader`]: resolves catalog ids into normalized
//!   model roots.
//! - [`ui`] – [`UiSink`]: presentation-only status setters.
//! - [`sim`] – simulated platform for headless tests.
//! - [`sim_scene`] – simulated scene, renderer, asset loader and UI.

pub mod assets;
pub mod platform;
pub mod scene;
pub mod sim;
pub mod sim_scene;
pub mod ui;

pub use assets::{AssetLoader, LoadedModel};
pub use platform::{
    HitTestResult, PlatformOperation, ReferenceSpaceType, SessionRequest,
    TransientHitTestResult, XrAnchor, XrFrame, XrSession, XrSystem,
};
pub use scene::{Renderer, Scene};
pub use ui::UiSink;
