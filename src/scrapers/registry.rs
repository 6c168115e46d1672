//! Media name -> extractor factory lookup.
//!
//! The registry is populated once at startup and then only read, so the
//! monitor shares it behind an `Arc` without locking. Lookups are exact and
//! case-sensitive: `"G1"` resolves, `"g1"` does not.

use crate::error::{MonitorError, Result};
use crate::scrapers::{PageExtractor, PageFetcher, cnn_brasil, g1, r7};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Builds an extractor bound to the shared fetcher.
pub type ExtractorFactory = Arc<dyn Fn(&PageFetcher) -> Box<dyn PageExtractor> + Send + Sync>;

#[derive(Clone, Default)]
pub struct ExtractorRegistry {
    factories: HashMap<String, ExtractorFactory>,
}

impl fmt::Debug for ExtractorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractorRegistry")
            .field("media", &self.media_names())
            .finish()
    }
}

impl ExtractorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in portal.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(g1::NAME, |fetcher| {
            Box::new(g1::G1Extractor::new(fetcher.clone()))
        });
        registry.register(cnn_brasil::NAME, |fetcher| {
            Box::new(cnn_brasil::CnnBrasilExtractor::new(fetcher.clone()))
        });
        registry.register(r7::NAME, |fetcher| {
            Box::new(r7::R7Extractor::new(fetcher.clone()))
        });
        registry
    }

    /// Register a factory under `media`. A later registration for the same
    /// name replaces the earlier one.
    pub fn register<F>(&mut self, media: impl Into<String>, factory: F)
    where
        F: Fn(&PageFetcher) -> Box<dyn PageExtractor> + Send + Sync + 'static,
    {
        let media = media.into();
        if self
            .factories
            .insert(media.clone(), Arc::new(factory))
            .is_some()
        {
            warn!(%media, "Replacing previously registered extractor");
        } else {
            debug!(%media, "Registered extractor");
        }
    }

    pub fn resolve(&self, media: &str) -> Result<ExtractorFactory> {
        self.factories
            .get(media)
            .cloned()
            .ok_or_else(|| MonitorError::ExtractorNotFound {
                media: media.to_string(),
            })
    }

    /// Snapshot of the full mapping.
    pub fn discover_all(&self) -> HashMap<String, ExtractorFactory> {
        self.factories.clone()
    }

    /// Registered media names, sorted.
    pub fn media_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}
