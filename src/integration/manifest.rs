//! Integration manifest parsing (integration.yaml)

use serde::{Deserialize, Serialize};
use std::path::Path;

/// File name looked up in every integration folder
pub const MANIFEST_FILE: &str = "integration.yaml";

/// Integration manifest structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct IntegrationManifest {
    #[serde(default)]
    pub integration: IntegrationInfo,

    /// Folders with `enabled: false` are skipped during discovery
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

/// Identity and display overrides; every field is optional
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct IntegrationInfo {
    /// Registry id (defaults to the folder name)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Built-in constructor to use (defaults to the folder name)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

fn default_enabled() -> bool {
    true
}

impl IntegrationManifest {
    /// Load a manifest from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> eyre::Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::parse(&content)
    }

    /// Parse a manifest from YAML string
    pub fn parse(content: &str) -> eyre::Result<Self> {
        // An empty file is a valid "all defaults" manifest
        if content.trim().is_empty() {
            return Ok(Self {
                enabled: true,
                ..Self::default()
            });
        }
        let manifest: Self = serde_yaml::from_str(content)?;
        Ok(manifest)
    }

    /// Constructor kind, falling back to the folder name
    pub fn kind_or<'a>(&'a self, folder: &'a str) -> &'a str {
        self.integration.kind.as_deref().unwrap_or(folder)
    }

    /// Registry id, falling back to the folder name
    pub fn id_or<'a>(&'a self, folder: &'a str) -> &'a str {
        self.integration.id.as_deref().unwrap_or(folder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_MANIFEST: &str = r##"
integration:
  id: newsletter
  kind: mailchimp
  name: Newsletter
  description: Weekly newsletter audience
  icon: mail
  color: "#ffe01b"
enabled: true
"##;

    #[test]
    fn test_parse_full_manifest() {
        let manifest = IntegrationManifest::parse(FULL_MANIFEST).unwrap();
        assert_eq!(manifest.id_or("folder"), "newsletter");
        assert_eq!(manifest.kind_or("folder"), "mailchimp");
        assert_eq!(manifest.integration.name.as_deref(), Some("Newsletter"));
        assert_eq!(manifest.integration.color.as_deref(), Some("#ffe01b"));
        assert!(manifest.enabled);
    }

    #[test]
    fn test_empty_manifest_uses_folder_convention() {
        let manifest = IntegrationManifest::parse("").unwrap();
        assert_eq!(manifest.id_or("hubspot"), "hubspot");
        assert_eq!(manifest.kind_or("hubspot"), "hubspot");
        assert!(manifest.enabled);
    }

    #[test]
    fn test_disabled_manifest() {
        let manifest = IntegrationManifest::parse("enabled: false\n").unwrap();
        assert!(!manifest.enabled);
    }

    #[test]
    fn test_invalid_manifest() {
        assert!(IntegrationManifest::parse("integration: [not, a, map]").is_err());
    }
}
