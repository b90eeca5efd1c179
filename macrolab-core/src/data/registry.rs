//! Provider registry and per-request enable/disable flags.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::provider::SeriesProvider;

/// Per-request provider toggles. Providers default to enabled; only explicit
/// overrides are stored, so the flag set serializes compactly into cache keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderFlags {
    overrides: BTreeMap<String, bool>,
}

impl ProviderFlags {
    pub fn all_enabled() -> Self {
        Self::default()
    }

    pub fn disable(mut self, provider: &str) -> Self {
        self.overrides.insert(provider.to_string(), false);
        self
    }

    pub fn enable(mut self, provider: &str) -> Self {
        self.overrides.insert(provider.to_string(), true);
        self
    }

    pub fn is_enabled(&self, provider: &str) -> bool {
        self.overrides.get(provider).copied().unwrap_or(true)
    }
}

/// Named providers available to the resolver and catalog layer.
///
/// Unknown names are simply absent — the caller degrades to an empty series,
/// never aborts.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: BTreeMap<String, Arc<dyn SeriesProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, provider: Arc<dyn SeriesProvider>) -> Self {
        self.providers
            .insert(provider.name().to_string(), provider);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn SeriesProvider>> {
        self.providers.get(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.providers.keys().map(|s| s.as_str()).collect()
    }
}
