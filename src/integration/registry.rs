//! Integration registry
//!
//! In-memory catalog of integration instances, keyed by integration id.
//! Built once at startup and handed to the dispatcher by reference.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::Integration;

/// Flat, credential-free view of an integration for UI/JSON consumers
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IntegrationSummary {
    pub id: String,
    pub name: String,
    pub description: String,
    pub version: String,
    pub icon: String,
    pub color: String,
    pub configured: bool,
    pub actions: Vec<String>,
}

impl IntegrationSummary {
    pub fn of(integration: &dyn Integration) -> Self {
        let meta = integration.meta();
        Self {
            id: meta.id.clone(),
            name: meta.name.clone(),
            description: meta.description.clone(),
            version: meta.version.clone(),
            icon: meta.icon.clone(),
            color: meta.color.clone(),
            configured: integration.is_configured(),
            actions: integration.actions().into_iter().map(|a| a.id).collect(),
        }
    }
}

/// Registry of integrations, iterated in registration order
#[derive(Default)]
pub struct IntegrationRegistry {
    integrations: IndexMap<String, Box<dyn Integration>>,
}

impl IntegrationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an integration under its id.
    ///
    /// An existing entry with the same id is replaced (last registration wins)
    /// and keeps its position. The replaced instance is returned.
    pub fn register(&mut self, integration: Box<dyn Integration>) -> Option<Box<dyn Integration>> {
        let id = integration.id().to_string();
        let replaced = self.integrations.insert(id.clone(), integration);
        if replaced.is_some() {
            log::warn!("Integration '{}' registered twice; keeping the latest", id);
        } else {
            log::debug!("Registered integration '{}'", id);
        }
        replaced
    }

    pub fn get(&self, id: &str) -> Option<&dyn Integration> {
        self.integrations.get(id).map(|i| i.as_ref())
    }

    pub fn all(&self) -> impl Iterator<Item = &dyn Integration> {
        self.integrations.values().map(|i| i.as_ref())
    }

    /// Integrations whose credentials are present
    pub fn configured(&self) -> impl Iterator<Item = &dyn Integration> {
        self.all().filter(|i| i.is_configured())
    }

    pub fn has(&self, id: &str) -> bool {
        self.integrations.contains_key(id)
    }

    pub fn count(&self) -> usize {
        self.integrations.len()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.integrations.keys().map(|k| k.as_str())
    }

    /// Plain data view keyed by id, for the settings UI and JSON output
    pub fn to_array(&self) -> IndexMap<String, IntegrationSummary> {
        self.integrations
            .iter()
            .map(|(id, integration)| (id.clone(), IntegrationSummary::of(integration.as_ref())))
            .collect()
    }
}
