//! Ranked backend catalog, read-only after construction

use tracing::{debug, warn};

use crate::backend::traits::{BackendDescriptor, BackendKind};
use crate::config::BackendConfig;
use crate::error::{AppError, Result};

/// Priority-ordered backends for each request kind
#[derive(Debug, Clone, Default)]
pub struct BackendCatalog {
    text: Vec<BackendDescriptor>,
    image: Vec<BackendDescriptor>,
}

impl BackendCatalog {
    /// Build a catalog from descriptors, keeping their relative order per kind
    pub fn new(descriptors: impl IntoIterator<Item = BackendDescriptor>) -> Result<Self> {
        let mut catalog = Self::default();

        for descriptor in descriptors {
            if descriptor.identifier.trim().is_empty() {
                return Err(AppError::Config(config::ConfigError::Message(
                    "Backend identifier cannot be empty".to_string(),
                )));
            }

            let ranked = catalog.ranked_mut(descriptor.kind);
            if ranked.iter().any(|d| d.identifier == descriptor.identifier) {
                return Err(AppError::Config(config::ConfigError::Message(format!(
                    "Backend '{}' is listed twice for {} generation",
                    descriptor.identifier, descriptor.kind
                ))));
            }
            ranked.push(descriptor);
        }

        Ok(catalog)
    }

    /// Build a catalog from configuration, skipping disabled backends
    pub fn from_config(backends: &[BackendConfig]) -> Result<Self> {
        let catalog = Self::new(
            backends
                .iter()
                .filter(|b| {
                    if !b.enabled {
                        debug!(backend = %b.identifier, kind = %b.kind, "Skipping disabled backend");
                    }
                    b.enabled
                })
                .map(|b| BackendDescriptor::new(b.identifier.clone(), b.kind)),
        )?;

        if catalog.is_empty() {
            warn!("Backend catalog is empty; every generation request will fail");
            return Ok(catalog);
        }

        for kind in [BackendKind::TextGeneration, BackendKind::ImageGeneration] {
            if catalog.len(kind) == 0 {
                warn!(kind = %kind, "No backend configured; requests of this kind will fail");
            }
        }

        Ok(catalog)
    }

    /// Ranked backends for a kind, best first
    pub fn backends_for(&self, kind: BackendKind) -> Result<&[BackendDescriptor]> {
        let ranked = self.ranked(kind);
        if ranked.is_empty() {
            return Err(AppError::NoBackendConfigured(kind));
        }
        Ok(ranked)
    }

    /// Number of backends configured for a kind
    pub fn len(&self, kind: BackendKind) -> usize {
        self.ranked(kind).len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.image.is_empty()
    }

    fn ranked(&self, kind: BackendKind) -> &[BackendDescriptor] {
        match kind {
            BackendKind::TextGeneration => &self.text,
            BackendKind::ImageGeneration => &self.image,
        }
    }

    fn ranked_mut(&mut self, kind: BackendKind) -> &mut Vec<BackendDescriptor> {
        match kind {
            BackendKind::TextGeneration => &mut self.text,
            BackendKind::ImageGeneration => &mut self.image,
        }
    }
}
