//! Asset loading contract.

use async_trait::async_trait;

use arplace_spatial::{Normalization, Pose};
use arplace_types::{ArError, ModelCatalog, ModelCatalogEntry, ObjectId};

/// A model root ready to be added to the scene.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedModel {
    pub root: ObjectId,
    pub entry: ModelCatalogEntry,
    /// Scale and offset already applied to the root.
    pub normalization: Normalization,
}

impl LoadedModel {
    /// Root pose after normalization, before any placement.
    pub fn initial_pose(&self) -> Pose {
        Pose::from_position(self.normalization.offset)
    }
}

/// Resolves catalog ids into normalized model roots.
///
/// Implementations guarantee the returned root is re-centred on its
/// horizontal footprint and rests on y = 0.
#[async_trait(?Send)]
pub trait AssetLoader {
    fn catalog(&self) -> &ModelCatalog;

    /// # Errors
    ///
    /// [`ArError::ModelNotFound`] when `id` is not in the catalog,
    /// [`ArError::AssetLoadFailed`] when fetching or parsing fails.
    async fn load_model(&self, id: &str) -> Result<LoadedModel, ArError>;
}
