use std::sync::{Arc, Mutex, PoisonError};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr, VariantNames};

use crate::{
    algorithms::AdvancedPipeline,
    pipeline::{FallbackPipeline, Pipeline},
    traits::{BackendLoader, VisionBackend},
    types::BackendPreference,
    vision::ImageprocLoader,
};

/// Which processing strategy a run used.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, VariantNames, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PipelineKind {
    /// Vision-backend Canny plus optional contour simplification.
    Advanced,
    /// Built-in gradient magnitude detector.
    Fallback,
}

/// Chooses the pipeline for each run, loading the vision backend on demand.
///
/// A successfully loaded backend is kept for later runs. A failed load is
/// not cached, so the next run tries again.
pub struct CapabilitySelector {
    loader: Box<dyn BackendLoader>,
    loaded: Mutex<Option<Arc<dyn VisionBackend>>>,
}

impl CapabilitySelector {
    pub fn new<L>(loader: L) -> Self
    where
        L: BackendLoader + 'static,
    {
        Self {
            loader: Box::new(loader),
            loaded: Mutex::new(None),
        }
    }

    /// Selector that starts out with a backend already available.
    pub fn with_backend<L>(loader: L, backend: Arc<dyn VisionBackend>) -> Self
    where
        L: BackendLoader + 'static,
    {
        Self {
            loader: Box::new(loader),
            loaded: Mutex::new(Some(backend)),
        }
    }

    pub fn loader_name(&self) -> &'static str {
        self.loader.name()
    }

    /// Whether a backend is currently loaded, without attempting a load.
    pub fn is_loaded(&self) -> bool {
        self.cached().is_some()
    }

    /// Resolve backend availability and return the pipeline to run.
    ///
    /// Never fails: an unavailable backend degrades to the fallback pipeline.
    pub async fn select_pipeline(&self, preference: BackendPreference) -> Pipeline {
        if preference == BackendPreference::Fallback {
            tracing::info!("Using basic gradient processing (vision backend disabled)");
            return Pipeline::Fallback(FallbackPipeline);
        }

        if let Some(backend) = self.cached() {
            return Pipeline::Advanced(AdvancedPipeline::new(backend));
        }

        match self.loader.load().await {
            Ok(backend) => {
                tracing::info!(backend = backend.name(), "Using vision backend for advanced processing");
                *self.loaded.lock().unwrap_or_else(PoisonError::into_inner) = Some(backend.clone());
                Pipeline::Advanced(AdvancedPipeline::new(backend))
            }
            Err(error) => {
                tracing::info!(loader = self.loader.name(), %error, "Using basic gradient processing");
                Pipeline::Fallback(FallbackPipeline)
            }
        }
    }

    fn cached(&self) -> Option<Arc<dyn VisionBackend>> {
        self.loaded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for CapabilitySelector {
    fn default() -> Self {
        Self::new(ImageprocLoader)
    }
}

impl std::fmt::Debug for CapabilitySelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilitySelector")
            .field("loader", &self.loader.name())
            .field("loaded", &self.is_loaded())
            .finish()
    }
}
