//! Mailchimp audience subscription

use lazy_regex::regex_captures;
use serde_json::json;

use super::http::{Auth, HttpClient};
use crate::integration::builtin::{BuildContext, DefaultMeta};
use crate::integration::mapping::{as_text, map_fields};
use crate::integration::{
    ActionSpec, ConnectionResult, FieldKind, FieldSpec, FormFields, Integration, IntegrationMeta, ProcessResult,
    Settings, ValidationError, is_email, setting_str, validate_against_schema,
};

const META: DefaultMeta = DefaultMeta {
    name: "Mailchimp",
    description: "Add form submitters to a Mailchimp audience",
    version: "1.0.0",
    icon: "mailchimp",
    color: "#ffe01b",
};

pub const ACTION_SUBSCRIBE: &str = "subscribe";

pub struct MailchimpIntegration {
    meta: IntegrationMeta,
    settings: Settings,
    http: HttpClient,
}

impl MailchimpIntegration {
    pub fn build(ctx: BuildContext) -> Box<dyn Integration> {
        Box::new(Self::new(ctx))
    }

    pub fn new(ctx: BuildContext) -> Self {
        Self {
            meta: ctx.meta(&META),
            settings: ctx.settings,
            http: ctx.http,
        }
    }

    /// Mapping targets with the form-field semantics used for guessing
    fn targets() -> Vec<(FieldSpec, &'static str)> {
        vec![
            (
                FieldSpec::new("email_address", "Email address", FieldKind::Email).required(),
                "email",
            ),
            (FieldSpec::new("FNAME", "First name", FieldKind::Text), "first_name"),
            (FieldSpec::new("LNAME", "Last name", FieldKind::Text), "last_name"),
            (FieldSpec::new("PHONE", "Phone", FieldKind::Text), "phone"),
        ]
    }

    fn api_base(&self, settings: &Settings) -> Option<String> {
        if let Some(base) = setting_str(settings, "api_base") {
            return Some(base.trim_end_matches('/').to_string());
        }
        let key = setting_str(settings, "api_key")?;
        let dc = datacenter(&key)?;
        Some(format!("https://{}.api.mailchimp.com/3.0", dc))
    }

    fn auth(key: &str) -> Auth {
        Auth::Basic {
            user: "formbridge".to_string(),
            password: key.to_string(),
        }
    }
}

/// Datacenter suffix of an API key (`<hex>-us6` → `us6`)
pub fn datacenter(api_key: &str) -> Option<&str> {
    regex_captures!(r"^[0-9A-Za-z]+-([a-z]+[0-9]+)$", api_key).map(|(_, dc)| dc)
}

/// Build the member body Mailchimp expects for a subscription
pub fn build_member(fields: &FormFields, settings: &Settings) -> Result<serde_json::Value, String> {
    let mapped = map_fields(&MailchimpIntegration::targets(), fields, settings);

    let email = mapped.get("email_address").map(as_text).unwrap_or_default();
    if email.is_empty() {
        return Err("No email address found in submission".to_string());
    }
    if !is_email(&email) {
        return Err(format!("Invalid email address: {}", email));
    }

    let merge_fields: serde_json::Map<String, serde_json::Value> = mapped
        .iter()
        .filter(|(key, _)| key.as_str() != "email_address")
        .map(|(key, value)| (key.clone(), json!(as_text(value))))
        .collect();

    let double_optin = settings.get("double_optin").and_then(|v| v.as_bool()).unwrap_or(false);

    let tags: Vec<String> = setting_str(settings, "tags")
        .map(|t| {
            t.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();

    let mut member = json!({
        "email_address": email,
        "status": if double_optin { "pending" } else { "subscribed" },
        "merge_fields": merge_fields,
    });
    if !tags.is_empty() {
        member["tags"] = json!(tags);
    }
    Ok(member)
}

impl Integration for MailchimpIntegration {
    fn meta(&self) -> &IntegrationMeta {
        &self.meta
    }

    fn is_configured(&self) -> bool {
        setting_str(&self.settings, "api_key").is_some()
    }

    fn auth_fields(&self) -> Vec<FieldSpec> {
        vec![
            FieldSpec::new("api_key", "API key", FieldKind::Password)
                .required()
                .secret()
                .with_description("Account > Extras > API keys; ends in the datacenter, e.g. -us6"),
        ]
    }

    fn test_connection(&self) -> ConnectionResult {
        let Some(key) = setting_str(&self.settings, "api_key") else {
            return ConnectionResult::failed("API key is not configured");
        };
        let Some(base) = self.api_base(&self.settings) else {
            return ConnectionResult::failed("API key has no datacenter suffix");
        };

        match self.http.get(&format!("{}/ping", base), &Self::auth(&key)) {
            Ok(response) if response.is_success() => ConnectionResult::ok("Connected to Mailchimp"),
            Ok(response) => ConnectionResult::failed(response.error_detail()),
            Err(e) => ConnectionResult::failed(format!("{:#}", e)),
        }
    }

    fn actions(&self) -> Vec<ActionSpec> {
        vec![ActionSpec::new(
            ACTION_SUBSCRIBE,
            "Subscribe to audience",
            "Add or confirm the submitter as an audience member",
        )]
    }

    fn field_mapping(&self, action: &str) -> Vec<FieldSpec> {
        match action {
            ACTION_SUBSCRIBE => Self::targets().into_iter().map(|(spec, _)| spec).collect(),
            _ => Vec::new(),
        }
    }

    fn settings_schema(&self) -> Vec<FieldSpec> {
        vec![
            FieldSpec::new("audience_id", "Audience ID", FieldKind::Text).required(),
            FieldSpec::new("double_optin", "Double opt-in", FieldKind::Boolean)
                .with_description("Send a confirmation email before subscribing"),
            FieldSpec::new("tags", "Tags", FieldKind::Text).with_description("Comma-separated tags"),
            FieldSpec::new("field_mapping", "Field mapping", FieldKind::Mapping),
            FieldSpec::new("api_base", "API base URL", FieldKind::Url),
        ]
    }

    fn default_settings(&self) -> Settings {
        json!({
            "enabled": false,
            "action": ACTION_SUBSCRIBE,
            "double_optin": false,
            "field_mapping": {},
        })
        .as_object()
        .cloned()
        .unwrap_or_default()
    }

    fn validate_settings(&self, settings: &Settings) -> Vec<ValidationError> {
        let mut errors = validate_against_schema(&self.settings_schema(), settings);
        if setting_str(settings, "api_key").is_some_and(|key| datacenter(&key).is_none()) {
            errors.push(ValidationError::new(
                "api_key",
                "API key must end with a datacenter suffix such as -us6",
            ));
        }
        errors
    }

    fn process_submission(
        &self,
        submission_id: &str,
        fields: &FormFields,
        settings: &Settings,
    ) -> eyre::Result<ProcessResult> {
        let Some(key) = setting_str(settings, "api_key") else {
            return Ok(ProcessResult::failed("Mailchimp API key is not configured"));
        };
        let Some(audience) = setting_str(settings, "audience_id") else {
            return Ok(ProcessResult::failed("No Mailchimp audience selected"));
        };
        let Some(base) = self.api_base(settings) else {
            return Ok(ProcessResult::failed("Mailchimp API key has no datacenter suffix"));
        };

        let member = match build_member(fields, settings) {
            Ok(member) => member,
            Err(message) => return Ok(ProcessResult::failed(message)),
        };

        let url = format!("{}/lists/{}/members", base, audience);
        log::info!("Submission {} → Mailchimp audience {}", submission_id, audience);
        let response = self.http.post_json(&url, &Self::auth(&key), &member)?;

        let email = member["email_address"].clone();
        if response.is_success() {
            let id = response.body.get("id").cloned().unwrap_or_default();
            return Ok(ProcessResult::ok(format!("Subscribed {} to audience {}", as_text(&email), audience))
                .with_data(json!({"member_id": id, "status": member["status"]})));
        }

        let title = response.body.get("title").and_then(|v| v.as_str()).unwrap_or("");
        if response.status == 400 && title == "Member Exists" {
            return Ok(ProcessResult::ok(format!("{} is already subscribed", as_text(&email)))
                .with_data(json!({"status": response.status})));
        }

        Ok(
            ProcessResult::failed(format!("Mailchimp rejected the subscription: {}", response.error_detail()))
                .with_data(json!({"status": response.status, "response": response.body})),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HttpConfig;

    fn settings(value: serde_json::Value) -> Settings {
        value.as_object().cloned().unwrap()
    }

    fn fields(value: serde_json::Value) -> FormFields {
        serde_json::from_value(value).unwrap()
    }

    fn integration(global: serde_json::Value) -> MailchimpIntegration {
        MailchimpIntegration::new(BuildContext::new(
            "mailchimp",
            settings(global),
            HttpClient::new(&HttpConfig {
                timeout_secs: 2,
                user_agent: "formbridge-test".to_string(),
            }),
        ))
    }

    #[test]
    fn test_datacenter() {
        assert_eq!(datacenter("0123456789abcdef-us6"), Some("us6"));
        assert_eq!(datacenter("abc-us21"), Some("us21"));
        assert_eq!(datacenter("no-suffix-here"), None);
        assert_eq!(datacenter("abcdef"), None);
    }

    #[test]
    fn test_is_configured() {
        assert!(integration(json!({"api_key": "abc-us6"})).is_configured());
        assert!(!integration(json!({})).is_configured());
        assert!(!integration(json!({"api_key": ""})).is_configured());
    }

    #[test]
    fn test_build_member() {
        let member = build_member(
            &fields(json!({"email": "jane@example.com", "first_name": "Jane", "last_name": "Doe"})),
            &settings(json!({"tags": "web, contact ,"})),
        )
        .unwrap();
        assert_eq!(member["email_address"], json!("jane@example.com"));
        assert_eq!(member["status"], json!("subscribed"));
        assert_eq!(member["merge_fields"]["FNAME"], json!("Jane"));
        assert_eq!(member["merge_fields"]["LNAME"], json!("Doe"));
        assert_eq!(member["tags"], json!(["web", "contact"]));
    }

    #[test]
    fn test_build_member_double_optin() {
        let member = build_member(
            &fields(json!({"email": "jane@example.com"})),
            &settings(json!({"double_optin": true})),
        )
        .unwrap();
        assert_eq!(member["status"], json!("pending"));
        assert!(member.get("tags").is_none());
    }

    #[test]
    fn test_build_member_requires_email() {
        let err = build_member(&fields(json!({"name": "Jane"})), &Settings::new()).unwrap_err();
        assert!(err.contains("No email"));

        let err = build_member(&fields(json!({"email": "nope"})), &Settings::new()).unwrap_err();
        assert!(err.contains("Invalid email"));
    }

    #[test]
    fn test_process_without_audience_is_failed_result() {
        let mc = integration(json!({"api_key": "abc-us6"}));
        let result = mc
            .process_submission(
                "sub-1",
                &fields(json!({"email": "jane@example.com"})),
                &settings(json!({"api_key": "abc-us6"})),
            )
            .unwrap();
        assert!(!result.success);
        assert!(result.message.contains("audience"));
    }

    #[test]
    fn test_process_unreachable_api_is_error() {
        let mc = integration(json!({"api_key": "abc-us6"}));
        let result = mc.process_submission(
            "sub-1",
            &fields(json!({"email": "jane@example.com"})),
            &settings(json!({
                "api_key": "abc-us6",
                "audience_id": "list1",
                "api_base": "http://127.0.0.1:1/3.0"
            })),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_numeric_audience_id_reaches_the_api() {
        let mc = integration(json!({"api_key": "abc-us6"}));
        let form = settings(json!({
            "api_key": "abc-us6",
            "audience_id": 4567891230u64,
            "api_base": "http://127.0.0.1:1/3.0"
        }));

        assert!(mc.validate_settings(&form).is_empty());
        // Gets past the audience check and fails on transport
        let result = mc.process_submission("sub-1", &fields(json!({"email": "jane@example.com"})), &form);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_settings() {
        let mc = integration(json!({}));
        let errors = mc.validate_settings(&settings(json!({"api_key": "nodc"})));
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["audience_id", "api_key"]);

        let errors = mc.validate_settings(&settings(json!({"api_key": "abc-us6", "audience_id": "list1"})));
        assert!(errors.is_empty());
    }

    #[test]
    fn test_test_connection_without_key() {
        let result = integration(json!({})).test_connection();
        assert!(!result.success);
    }

    #[test]
    fn test_field_mapping_per_action() {
        let mc = integration(json!({}));
        let keys: Vec<String> = mc.field_mapping(ACTION_SUBSCRIBE).into_iter().map(|f| f.key).collect();
        assert_eq!(keys, vec!["email_address", "FNAME", "LNAME", "PHONE"]);
        assert!(mc.field_mapping("unknown").is_empty());
    }
}
