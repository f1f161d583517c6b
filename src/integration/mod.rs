//! Integration contract
//!
//! An integration is an adapter that forwards form submissions to one external
//! marketing or CRM service. This module defines the capability interface every
//! integration satisfies plus the value types that flow across it:
//! - Identity and display metadata
//! - Configuration and enablement predicates
//! - Auth, mapping and settings schemas
//! - Connection testing and submission processing

use indexmap::IndexMap;
use lazy_regex::regex_is_match;
use serde::{Deserialize, Serialize};

pub mod builtin;
pub mod loader;
pub mod manifest;
pub mod mapping;
pub mod registry;

/// Arbitrary key/value configuration (credentials, list ids, mappings)
pub type Settings = serde_json::Map<String, serde_json::Value>;

/// Submitted form field values, in form order
pub type FormFields = IndexMap<String, serde_json::Value>;

/// Display metadata for an integration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct IntegrationMeta {
    pub id: String,
    pub name: String,
    pub description: String,
    pub version: String,
    pub icon: String,
    pub color: String,
}

/// Input kind of a schema field, used by the settings UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Password,
    Email,
    Url,
    Select,
    Boolean,
    Mapping,
}

/// A single field in an auth, mapping or settings schema
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FieldSpec {
    pub key: String,
    pub label: String,
    pub kind: FieldKind,

    #[serde(default)]
    pub required: bool,

    /// Never echoed back to the UI or the terminal
    #[serde(default)]
    pub secret: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

impl FieldSpec {
    pub fn new(key: &str, label: &str, kind: FieldKind) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            kind,
            required: false,
            secret: false,
            description: None,
            options: Vec::new(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn secret(mut self) -> Self {
        self.secret = true;
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn with_options(mut self, options: &[&str]) -> Self {
        self.options = options.iter().map(|o| o.to_string()).collect();
        self
    }
}

/// An action an integration can perform with a submission
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ActionSpec {
    pub id: String,
    pub label: String,
    pub description: String,
}

impl ActionSpec {
    pub fn new(id: &str, label: &str, description: &str) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            description: description.to_string(),
        }
    }
}

/// Result of a connection test
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConnectionResult {
    pub success: bool,
    pub message: String,
}

impl ConnectionResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Result of processing one submission
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProcessResult {
    pub success: bool,
    pub message: String,

    /// Diagnostic payload (API response, request summary)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ProcessResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// A field-level settings validation error
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Integration contract interface
pub trait Integration: Send + Sync {
    /// Display metadata; `meta().id` is the registry key
    fn meta(&self) -> &IntegrationMeta;

    fn id(&self) -> &str {
        &self.meta().id
    }

    /// Are the stored credentials present?
    ///
    /// This does not touch the network; see [`Integration::test_connection`].
    fn is_configured(&self) -> bool;

    /// Is this integration switched on for the given (form-level) settings?
    fn is_enabled(&self, settings: &Settings) -> bool {
        settings.get("enabled").and_then(|v| v.as_bool()).unwrap_or(false)
    }

    /// Credentials the operator must supply
    fn auth_fields(&self) -> Vec<FieldSpec>;

    /// Reach the remote service with the stored credentials
    fn test_connection(&self) -> ConnectionResult;

    fn actions(&self) -> Vec<ActionSpec>;

    /// Integration-side fields a form field can be mapped onto for `action`
    fn field_mapping(&self, action: &str) -> Vec<FieldSpec>;

    fn settings_schema(&self) -> Vec<FieldSpec>;

    fn default_settings(&self) -> Settings;

    /// Check settings against [`Integration::settings_schema`]
    fn validate_settings(&self, settings: &Settings) -> Vec<ValidationError> {
        validate_against_schema(&self.settings_schema(), settings)
    }

    /// Forward one submission to the remote service.
    ///
    /// Remote rejections come back as `ProcessResult { success: false, .. }`;
    /// transport failures come back as `Err`.
    fn process_submission(
        &self,
        submission_id: &str,
        fields: &FormFields,
        settings: &Settings,
    ) -> eyre::Result<ProcessResult>;
}

/// Schema-driven settings validation shared by every integration
pub fn validate_against_schema(schema: &[FieldSpec], settings: &Settings) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    for field in schema {
        let value = settings.get(&field.key);
        let text = value.and_then(|v| v.as_str()).map(str::trim);

        let missing = match value {
            None | Some(serde_json::Value::Null) => true,
            Some(serde_json::Value::String(s)) => s.trim().is_empty(),
            Some(serde_json::Value::Object(m)) => m.is_empty() && field.kind != FieldKind::Mapping,
            _ => false,
        };

        if missing {
            if field.required {
                errors.push(ValidationError::new(&field.key, format!("{} is required", field.label)));
            }
            continue;
        }

        match field.kind {
            FieldKind::Email => {
                if !text.map(is_email).unwrap_or(false) {
                    errors.push(ValidationError::new(
                        &field.key,
                        format!("{} must be a valid email address", field.label),
                    ));
                }
            }
            FieldKind::Url => {
                if !text.map(|t| regex_is_match!(r"^https?://\S+$", t)).unwrap_or(false) {
                    errors.push(ValidationError::new(
                        &field.key,
                        format!("{} must be an http(s) URL", field.label),
                    ));
                }
            }
            FieldKind::Boolean => {
                if !value.map(|v| v.is_boolean()).unwrap_or(false) {
                    errors.push(ValidationError::new(&field.key, format!("{} must be true or false", field.label)));
                }
            }
            FieldKind::Select => {
                let allowed = field.options.is_empty() || text.map(|t| field.options.iter().any(|o| o == t)).unwrap_or(false);
                if !allowed {
                    errors.push(ValidationError::new(
                        &field.key,
                        format!("{} must be one of: {}", field.label, field.options.join(", ")),
                    ));
                }
            }
            FieldKind::Mapping => {
                if !value.map(|v| v.is_object()).unwrap_or(false) {
                    errors.push(ValidationError::new(
                        &field.key,
                        format!("{} must be a mapping of field names", field.label),
                    ));
                }
            }
            FieldKind::Text | FieldKind::Password => {
                if value.map(|v| v.is_array() || v.is_object()).unwrap_or(false) {
                    errors.push(ValidationError::new(&field.key, format!("{} must be a single value", field.label)));
                }
            }
        }
    }

    errors
}

/// Loose e-mail shape check
pub fn is_email(value: &str) -> bool {
    regex_is_match!(r"^[^@\s]+@[^@\s]+\.[^@\s]+$", value)
}

/// Read a trimmed, non-empty scalar setting as text.
///
/// Numbers and booleans are rendered, so an all-digit id stored unquoted in
/// YAML reads the same as its quoted form.
pub fn setting_str(settings: &Settings, key: &str) -> Option<String> {
    let text = match settings.get(key)? {
        serde_json::Value::String(s) => s.trim().to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    Some(text).filter(|s| !s.is_empty())
}

/// Shallow merge: keys in `overlay` replace keys in `base`
pub fn merge_settings(base: &Settings, overlay: &Settings) -> Settings {
    let mut merged = base.clone();
    for (key, value) in overlay {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn settings(value: serde_json::Value) -> Settings {
        value.as_object().cloned().unwrap()
    }

    fn schema() -> Vec<FieldSpec> {
        vec![
            FieldSpec::new("list_id", "List", FieldKind::Text).required(),
            FieldSpec::new("notify", "Notify address", FieldKind::Email),
            FieldSpec::new("double_optin", "Double opt-in", FieldKind::Boolean),
            FieldSpec::new("stage", "Stage", FieldKind::Select).with_options(&["lead", "customer"]),
            FieldSpec::new("field_mapping", "Field mapping", FieldKind::Mapping),
        ]
    }

    #[test]
    fn test_validate_missing_required() {
        let errors = validate_against_schema(&schema(), &Settings::new());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "list_id");
    }

    #[test]
    fn test_validate_blank_required_counts_as_missing() {
        let errors = validate_against_schema(&schema(), &settings(json!({"list_id": "   "})));
        assert_eq!(errors, vec![ValidationError::new("list_id", "List is required")]);
    }

    #[test]
    fn test_validate_field_shapes() {
        let errors = validate_against_schema(
            &schema(),
            &settings(json!({
                "list_id": "abc",
                "notify": "not-an-email",
                "double_optin": "yes",
                "stage": "prospect",
                "field_mapping": "email"
            })),
        );
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["notify", "double_optin", "stage", "field_mapping"]);
    }

    #[test]
    fn test_validate_valid_settings() {
        let errors = validate_against_schema(
            &schema(),
            &settings(json!({
                "list_id": "abc",
                "notify": "ops@example.com",
                "double_optin": true,
                "stage": "lead",
                "field_mapping": {"email_address": "email"}
            })),
        );
        assert!(errors.is_empty());
    }

    #[test]
    fn test_is_email() {
        assert!(is_email("jane@example.com"));
        assert!(!is_email("jane@example"));
        assert!(!is_email("jane example@x.com"));
    }

    #[test]
    fn test_merge_settings_overlay_wins() {
        let base = settings(json!({"a": 1, "b": 2}));
        let overlay = settings(json!({"b": 3, "c": 4}));
        let merged = merge_settings(&base, &overlay);
        assert_eq!(merged["a"], json!(1));
        assert_eq!(merged["b"], json!(3));
        assert_eq!(merged["c"], json!(4));
    }

    #[test]
    fn test_setting_str_ignores_blank() {
        let s = settings(json!({"key": "  ", "other": " value "}));
        assert_eq!(setting_str(&s, "key"), None);
        assert_eq!(setting_str(&s, "other").as_deref(), Some("value"));
        assert_eq!(setting_str(&s, "missing"), None);
    }

    #[test]
    fn test_numeric_text_setting_validates_and_reads() {
        let s = settings(json!({"list_id": 4567891230u64, "flag": true, "tags": ["a"]}));
        assert!(validate_against_schema(&schema(), &s).is_empty());
        assert_eq!(setting_str(&s, "list_id").as_deref(), Some("4567891230"));
        assert_eq!(setting_str(&s, "flag").as_deref(), Some("true"));
        assert_eq!(setting_str(&s, "tags"), None);

        let errors = validate_against_schema(&schema(), &settings(json!({"list_id": ["a", "b"]})));
        assert_eq!(errors, vec![ValidationError::new("list_id", "List must be a single value")]);
    }
}
