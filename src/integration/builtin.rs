//! Static constructor table for the integrations shipped with formbridge

use super::manifest::IntegrationInfo;
use super::{Integration, IntegrationMeta, Settings};
use crate::integrations::hubspot::HubSpotIntegration;
use crate::integrations::http::HttpClient;
use crate::integrations::mailchimp::MailchimpIntegration;

/// Everything a constructor needs to build one instance
#[derive(Clone)]
pub struct BuildContext {
    /// Registry id for the new instance
    pub id: String,
    /// Global (credential) settings stored for this id
    pub settings: Settings,
    pub http: HttpClient,
    /// Display overrides from the manifest
    pub display: IntegrationInfo,
}

impl BuildContext {
    pub fn new(id: &str, settings: Settings, http: HttpClient) -> Self {
        Self {
            id: id.to_string(),
            settings,
            http,
            display: IntegrationInfo::default(),
        }
    }

    pub fn with_display(mut self, display: IntegrationInfo) -> Self {
        self.display = display;
        self
    }

    /// Build metadata from an integration's defaults plus manifest overrides
    pub fn meta(&self, defaults: &DefaultMeta) -> IntegrationMeta {
        let pick = |over: &Option<String>, default: &str| over.clone().unwrap_or_else(|| default.to_string());
        IntegrationMeta {
            id: self.id.clone(),
            name: pick(&self.display.name, defaults.name),
            description: pick(&self.display.description, defaults.description),
            version: defaults.version.to_string(),
            icon: pick(&self.display.icon, defaults.icon),
            color: pick(&self.display.color, defaults.color),
        }
    }
}

/// Compile-time display metadata of a built-in integration
pub struct DefaultMeta {
    pub name: &'static str,
    pub description: &'static str,
    pub version: &'static str,
    pub icon: &'static str,
    pub color: &'static str,
}

pub type Constructor = fn(BuildContext) -> Box<dyn Integration>;

/// Kind name → constructor
pub const BUILTIN: &[(&str, Constructor)] = &[
    ("mailchimp", MailchimpIntegration::build),
    ("hubspot", HubSpotIntegration::build),
];

/// Look up a constructor by kind (case-insensitive)
pub fn constructor(kind: &str) -> Option<Constructor> {
    BUILTIN
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(kind))
        .map(|(_, ctor)| *ctor)
}

pub fn kinds() -> impl Iterator<Item = &'static str> {
    BUILTIN.iter().map(|(name, _)| *name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HttpConfig;

    #[test]
    fn test_constructor_lookup() {
        assert!(constructor("mailchimp").is_some());
        assert!(constructor("HubSpot").is_some());
        assert!(constructor("salesforce").is_none());
    }

    #[test]
    fn test_kinds() {
        let kinds: Vec<&str> = kinds().collect();
        assert_eq!(kinds, vec!["mailchimp", "hubspot"]);
    }

    #[test]
    fn test_build_applies_display_overrides() {
        let ctx = BuildContext::new("newsletter", Settings::new(), HttpClient::new(&HttpConfig::default()))
            .with_display(IntegrationInfo {
                name: Some("Newsletter".to_string()),
                ..IntegrationInfo::default()
            });
        let ctor = constructor("mailchimp").unwrap();
        let integration = ctor(ctx);
        assert_eq!(integration.id(), "newsletter");
        assert_eq!(integration.meta().name, "Newsletter");
        assert_eq!(integration.meta().color, "#ffe01b");
    }
}
