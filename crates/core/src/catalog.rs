use std::{collections::BTreeMap, sync::Arc};

use parking_lot::RwLock;
use tracing::{info, instrument, warn};

use crate::{
    api::CaptionApi,
    error::{CaptionError, Result},
    provider::{FALLBACK_DEFAULT_MODEL, KnownModel},
    types::{ModelDescriptor, ModelListing},
};

/// Immutable view of the models offered for one session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogSnapshot {
    pub models: BTreeMap<String, ModelDescriptor>,
    pub default_model: Option<String>,
}

impl CatalogSnapshot {
    pub fn from_listing(listing: ModelListing) -> Self {
        let models: BTreeMap<String, ModelDescriptor> = listing
            .models
            .into_iter()
            .map(|(key, entry)| {
                let preset = KnownModel::from_key(&key).map(|known| known.preset());
                let display_name = entry
                    .display_name
                    .or_else(|| preset.as_ref().map(|p| p.display_name.to_string()))
                    .unwrap_or_else(|| key.clone());
                let default_prompt = entry
                    .default_prompt
                    .or_else(|| preset.as_ref().map(|p| p.default_prompt.to_string()))
                    .unwrap_or_default();
                let accepts_prompt = entry
                    .accepts_prompt
                    .or_else(|| preset.as_ref().map(|p| p.accepts_prompt))
                    .unwrap_or(true);

                let descriptor = ModelDescriptor {
                    name: entry.name.unwrap_or_else(|| key.clone()),
                    key: key.clone(),
                    display_name,
                    default_prompt,
                    accepts_prompt,
                };
                (key, descriptor)
            })
            .collect();

        let default_model = listing
            .default
            .filter(|key| models.contains_key(key))
            .or_else(|| {
                models
                    .contains_key(FALLBACK_DEFAULT_MODEL)
                    .then(|| FALLBACK_DEFAULT_MODEL.to_string())
            })
            .or_else(|| models.keys().next().cloned());

        Self {
            models,
            default_model,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

/// Cached model catalog. Until the first successful `load` it is empty, which
/// callers treat as "no models offered".
pub struct ModelCatalog {
    api: Arc<dyn CaptionApi>,
    current: RwLock<Arc<CatalogSnapshot>>,
}

impl ModelCatalog {
    pub fn new(api: Arc<dyn CaptionApi>) -> Self {
        Self {
            api,
            current: RwLock::new(Arc::new(CatalogSnapshot::default())),
        }
    }

    /// Fetches the model listing and swaps it in whole. On failure the cached
    /// catalog is left untouched.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<Arc<CatalogSnapshot>> {
        let listing = self.api.list_models().await.map_err(|e| {
            warn!(error = %e, "model catalog unavailable");
            CaptionError::CatalogUnavailable {
                reason: e.user_detail(),
            }
        })?;

        let snapshot = Arc::new(CatalogSnapshot::from_listing(listing));
        *self.current.write() = Arc::clone(&snapshot);
        info!(
            models = snapshot.models.len(),
            default = snapshot.default_model.as_deref().unwrap_or("-"),
            "model catalog loaded"
        );
        Ok(snapshot)
    }

    pub fn snapshot(&self) -> Arc<CatalogSnapshot> {
        Arc::clone(&self.current.read())
    }

    pub fn descriptor(&self, model_key: &str) -> Option<ModelDescriptor> {
        self.current.read().models.get(model_key).cloned()
    }

    pub fn default_model(&self) -> Option<String> {
        self.current.read().default_model.clone()
    }

    pub fn display_name(&self, model_key: &str) -> String {
        self.current
            .read()
            .models
            .get(model_key)
            .map(|d| d.display_name.clone())
            .unwrap_or_else(|| model_key.to_string())
    }

    /// Prompt actually sent for `model_key`: nothing for prompt-less models,
    /// the custom prompt when one is given, the registered default otherwise.
    pub fn effective_prompt(&self, model_key: &str, custom: Option<&str>) -> Option<String> {
        let catalog = self.current.read();
        let descriptor = catalog.models.get(model_key);

        if descriptor.is_some_and(|d| !d.accepts_prompt) {
            return None;
        }

        if let Some(custom) = custom.map(str::trim).filter(|p| !p.is_empty()) {
            return Some(custom.to_string());
        }

        descriptor
            .map(|d| d.default_prompt.clone())
            .filter(|p| !p.is_empty())
    }
}
