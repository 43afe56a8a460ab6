//! Simulated scene, renderer, asset loader and UI.
//!
//! Together with [`SimXr`][crate::sim::SimXr] these let the complete
//! placement stack run in headless tests. [`SimRenderer`] and [`RecordingUi`]
//! are cloneable handles so a test can keep one clone for inspection after
//! handing the other to the core.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use async_trait::async_trait;

use arplace_spatial::{Aabb, Normalization, Pose, Vec3};
use arplace_types::{ArError, ModelCatalog, ObjectId};

use crate::assets::{AssetLoader, LoadedModel};
use crate::platform::{ReferenceSpaceType, XrSession};
use crate::scene::{Renderer, Scene};

// ────────────────────────────────────────────────────────────────────────────
// SimScene
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct SimNode {
    pose: Pose,
    visible: bool,
}

impl Default for SimNode {
    fn default() -> Self {
        Self {
            pose: Pose::identity(),
            visible: true,
        }
    }
}

/// In-memory scene graph. Starts with a hidden reticle.
pub struct SimScene {
    nodes: HashMap<ObjectId, SimNode>,
    attached: HashSet<ObjectId>,
    reticle: ObjectId,
}

impl Default for SimScene {
    fn default() -> Self {
        Self::new()
    }
}

impl SimScene {
    pub fn new() -> Self {
        let reticle = ObjectId::new();
        let mut nodes = HashMap::new();
        nodes.insert(
            reticle,
            SimNode {
                pose: Pose::identity(),
                visible: false,
            },
        );
        Self {
            nodes,
            attached: [reticle].into_iter().collect(),
            reticle,
        }
    }
}

impl Scene for SimScene {
    fn add(&mut self, object: ObjectId) {
        self.nodes.entry(object).or_default();
        self.attached.insert(object);
    }

    fn remove(&mut self, object: ObjectId) {
        if object != self.reticle {
            self.attached.remove(&object);
        }
    }

    fn contains(&self, object: ObjectId) -> bool {
        self.attached.contains(&object)
    }

    fn set_visible(&mut self, object: ObjectId, visible: bool) {
        self.nodes.entry(object).or_default().visible = visible;
    }

    fn is_visible(&self, object: ObjectId) -> bool {
        self.nodes.get(&object).is_some_and(|n| n.visible)
    }

    fn set_pose(&mut self, object: ObjectId, pose: Pose) {
        self.nodes.entry(object).or_default().pose = pose;
    }

    fn pose(&self, object: ObjectId) -> Option<Pose> {
        self.nodes.get(&object).map(|n| n.pose)
    }

    fn reticle(&self) -> ObjectId {
        self.reticle
    }

    fn object_count(&self) -> usize {
        self.attached.len()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SimRenderer
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct RendererState {
    reference_space_type: Option<ReferenceSpaceType>,
    bound_sessions: usize,
    animation_loop: bool,
    frames_rendered: usize,
    fail_binding: bool,
}

/// Renderer that records what it was asked to do.
#[derive(Clone, Default)]
pub struct SimRenderer {
    state: Rc<RefCell<RendererState>>,
}

impl SimRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every [`bind_session`][Renderer::bind_session] call fails.
    pub fn failing_binding(self) -> Self {
        self.state.borrow_mut().fail_binding = true;
        self
    }

    pub fn animation_loop_running(&self) -> bool {
        self.state.borrow().animation_loop
    }

    pub fn frames_rendered(&self) -> usize {
        self.state.borrow().frames_rendered
    }

    pub fn bound_sessions(&self) -> usize {
        self.state.borrow().bound_sessions
    }

    pub fn reference_space_type(&self) -> Option<ReferenceSpaceType> {
        self.state.borrow().reference_space_type
    }
}

#[async_trait(?Send)]
impl Renderer for SimRenderer {
    fn set_reference_space_type(&mut self, kind: ReferenceSpaceType) {
        self.state.borrow_mut().reference_space_type = Some(kind);
    }

    async fn bind_session(&mut self, _session: &dyn XrSession) -> Result<(), ArError> {
        let mut s = self.state.borrow_mut();
        if s.fail_binding {
            return Err(ArError::Platform("render surface could not be bound".to_string()));
        }
        s.bound_sessions += 1;
        Ok(())
    }

    fn set_animation_loop(&mut self, running: bool) {
        self.state.borrow_mut().animation_loop = running;
    }

    fn render(&mut self, _scene: &dyn Scene) {
        self.state.borrow_mut().frames_rendered += 1;
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SimAssetLoader
// ────────────────────────────────────────────────────────────────────────────

/// Asset loader that "loads" catalog entries instantly as a 1 m cube whose
/// pivot sits at its centre, then normalizes it.
pub struct SimAssetLoader {
    catalog: ModelCatalog,
    failing: HashSet<String>,
    loads: Cell<usize>,
}

impl SimAssetLoader {
    pub fn new(catalog: ModelCatalog) -> Self {
        Self {
            catalog,
            failing: HashSet::new(),
            loads: Cell::new(0),
        }
    }

    /// Loading `model_id` fails even though it is in the catalog.
    pub fn failing_on(mut self, model_id: &str) -> Self {
        self.failing.insert(model_id.to_string());
        self
    }

    /// Number of successful loads so far.
    pub fn loads(&self) -> usize {
        self.loads.get()
    }

    fn raw_bounds() -> Aabb {
        Aabb::new(Vec3::new(-0.5, -0.5, -0.5), Vec3::new(0.5, 0.5, 0.5))
    }
}

impl Default for SimAssetLoader {
    fn default() -> Self {
        Self::new(ModelCatalog::default())
    }
}

#[async_trait(?Send)]
impl AssetLoader for SimAssetLoader {
    fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    async fn load_model(&self, id: &str) -> Result<LoadedModel, ArError> {
        let entry = self
            .catalog
            .find(id)
            .ok_or_else(|| ArError::ModelNotFound(id.to_string()))?;
        if self.failing.contains(id) {
            return Err(ArError::AssetLoadFailed {
                model_id: id.to_string(),
                reason: format!("could not fetch {}", entry.source_url),
            });
        }
        self.loads.set(self.loads.get() + 1);
        Ok(LoadedModel {
            root: ObjectId::new(),
            entry: entry.clone(),
            normalization: Normalization::for_bounds(
                Self::raw_bounds(),
                entry.normalization_scale,
            ),
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// RecordingUi
// ────────────────────────────────────────────────────────────────────────────

/// Snapshot of everything the core told the UI.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UiRecord {
    pub status: String,
    pub tips: String,
    pub ar_running: bool,
    pub placing_enabled: bool,
    pub active_model: Option<String>,
    /// Every tip shown, oldest first.
    pub tip_history: Vec<String>,
}

/// [`UiSink`][crate::ui::UiSink] that records calls for later inspection.
#[derive(Clone, Default)]
pub struct RecordingUi {
    record: Rc<RefCell<UiRecord>>,
}

impl RecordingUi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> UiRecord {
        self.record.borrow().clone()
    }

    pub fn tips(&self) -> String {
        self.record.borrow().tips.clone()
    }

    pub fn status(&self) -> String {
        self.record.borrow().status.clone()
    }
}

impl crate::ui::UiSink for RecordingUi {
    fn set_status(&mut self, text: &str) {
        self.record.borrow_mut().status = text.to_string();
    }

    fn set_tips(&mut self, text: &str) {
        let mut r = self.record.borrow_mut();
        r.tips = text.to_string();
        r.tip_history.push(text.to_string());
    }

    fn set_ar_running(&mut self, running: bool) {
        self.record.borrow_mut().ar_running = running;
    }

    fn set_placing_enabled(&mut self, enabled: bool) {
        self.record.borrow_mut().placing_enabled = enabled;
    }

    fn set_active_model(&mut self, model_id: &str) {
        self.record.borrow_mut().active_model = Some(model_id.to_string());
    }
}
