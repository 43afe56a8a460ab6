use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Handle to a renderable node owned by the scene collaborator.
///
/// Asset loaders mint one per loaded model root; the placement layer only
/// ever refers to scene content through these handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectId(pub Uuid);

impl ObjectId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

/// Platform-issued handle to a reference space (local, viewer, or an
/// anchor's space).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpaceId(pub u32);

/// Platform-issued handle to a hit-test source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HitTestSourceId(pub u32);

/// Identifier attached to every confirmed placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlacementId(pub Uuid);

impl PlacementId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PlacementId {
    fn default() -> Self {
        Self::new()
    }
}

/// Named session features negotiated with the AR platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionFeature {
    /// `local` reference space. Always required.
    Local,
    HitTest,
    Anchors,
    DomOverlay,
}

impl SessionFeature {
    /// The platform's feature descriptor string.
    pub fn as_str(self) -> &'static str {
        match self {
            SessionFeature::Local => "local",
            SessionFeature::HitTest => "hit-test",
            SessionFeature::Anchors => "anchors",
            SessionFeature::DomOverlay => "dom-overlay",
        }
    }
}

impl std::fmt::Display for SessionFeature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static descriptor of a placeable model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelCatalogEntry {
    pub id: String,
    pub display_name: String,
    pub source_url: String,
    /// Uniform scale applied before the footprint is re-centred.
    pub normalization_scale: f32,
}

impl ModelCatalogEntry {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        source_url: impl Into<String>,
        normalization_scale: f32,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            source_url: source_url.into(),
            normalization_scale,
        }
    }
}

/// Read-only list of models the user can choose from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelCatalog {
    entries: Vec<ModelCatalogEntry>,
}

impl ModelCatalog {
    pub fn new(entries: Vec<ModelCatalogEntry>) -> Self {
        Self { entries }
    }

    /// Look up an entry by id.
    pub fn find(&self, id: &str) -> Option<&ModelCatalogEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn entries(&self) -> &[ModelCatalogEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ModelCatalog {
    /// The built-in catalog: a chair, a helmet and a duck.
    fn default() -> Self {
        Self::new(vec![
            ModelCatalogEntry::new(
                "chair",
                "Chair",
                "https://threejs.org/examples/models/gltf/Chair/Chair.gltf",
                0.4,
            ),
            ModelCatalogEntry::new(
                "helmet",
                "Helmet",
                "https://threejs.org/examples/models/gltf/DamagedHelmet/glTF/DamagedHelmet.gltf",
                0.6,
            ),
            ModelCatalogEntry::new(
                "duck",
                "Duck",
                "https://threejs.org/examples/models/gltf/Duck/glTF/Duck.gltf",
                0.5,
            ),
        ])
    }
}

/// Every failure the placement stack can report.
///
/// Only a subset ever reaches the user: anchor failures degrade silently to
/// unanchored placement.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ArError {
    #[error("WebXR is not supported on this device")]
    UnsupportedPlatform,

    #[error("AR session request failed: {0}")]
    SessionRequestFailed(String),

    #[error("an AR session is already running")]
    SessionAlreadyActive,

    #[error("no active AR session")]
    NoActiveSession,

    #[error("model not found: {0}")]
    ModelNotFound(String),

    #[error("model '{model_id}' failed to load: {reason}")]
    AssetLoadFailed { model_id: String, reason: String },

    #[error("spatial anchors are not available")]
    AnchorUnavailable,

    #[error("anchor creation failed: {0}")]
    AnchorCreationFailed(String),

    #[error("platform error: {0}")]
    Platform(String),
}
