//! HubSpot CRM contact creation

use serde_json::json;

use super::http::{Auth, HttpClient};
use crate::integration::builtin::{BuildContext, DefaultMeta};
use crate::integration::mapping::{as_text, map_fields};
use crate::integration::{
    ActionSpec, ConnectionResult, FieldKind, FieldSpec, FormFields, Integration, IntegrationMeta, ProcessResult,
    Settings, is_email, setting_str,
};

const META: DefaultMeta = DefaultMeta {
    name: "HubSpot",
    description: "Create HubSpot CRM contacts from form submissions",
    version: "1.0.0",
    icon: "hubspot",
    color: "#ff7a59",
};

const DEFAULT_API_BASE: &str = "https://api.hubapi.com";

pub const ACTION_CREATE_CONTACT: &str = "create_contact";

const LIFECYCLE_STAGES: &[&str] = &[
    "subscriber",
    "lead",
    "marketingqualifiedlead",
    "salesqualifiedlead",
    "opportunity",
    "customer",
    "evangelist",
    "other",
];

pub struct HubSpotIntegration {
    meta: IntegrationMeta,
    settings: Settings,
    http: HttpClient,
}

impl HubSpotIntegration {
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

    fn targets() -> Vec<(FieldSpec, &'static str)> {
        vec![
            (FieldSpec::new("email", "Email", FieldKind::Email).required(), "email"),
            (FieldSpec::new("firstname", "First name", FieldKind::Text), "first_name"),
            (FieldSpec::new("lastname", "Last name", FieldKind::Text), "last_name"),
            (FieldSpec::new("phone", "Phone", FieldKind::Text), "phone"),
            (FieldSpec::new("company", "Company", FieldKind::Text), "company"),
            (FieldSpec::new("message", "Message", FieldKind::Text), "message"),
        ]
    }

    fn api_base(settings: &Settings) -> String {
        setting_str(settings, "api_base")
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string()
    }
}

/// Build the contact properties object
pub fn build_properties(fields: &FormFields, settings: &Settings) -> Result<serde_json::Value, String> {
    let mapped = map_fields(&HubSpotIntegration::targets(), fields, settings);

    let email = mapped.get("email").map(as_text).unwrap_or_default();
    if email.is_empty() {
        return Err("No email address found in submission".to_string());
    }
    if !is_email(&email) {
        return Err(format!("Invalid email address: {}", email));
    }

    let mut properties: serde_json::Map<String, serde_json::Value> = mapped
        .iter()
        .map(|(key, value)| (key.clone(), json!(as_text(value))))
        .collect();

    if let Some(stage) = setting_str(settings, "lifecycle_stage") {
        properties.insert("lifecyclestage".to_string(), json!(stage));
    }

    Ok(serde_json::Value::Object(properties))
}

impl Integration for HubSpotIntegration {
    fn meta(&self) -> &IntegrationMeta {
        &self.meta
    }

    fn is_configured(&self) -> bool {
        setting_str(&self.settings, "access_token").is_some()
    }

    fn auth_fields(&self) -> Vec<FieldSpec> {
        vec![
            FieldSpec::new("access_token", "Private app access token", FieldKind::Password)
                .required()
                .secret()
                .with_description("Settings > Integrations > Private Apps; needs crm.objects.contacts.write"),
        ]
    }

    fn test_connection(&self) -> ConnectionResult {
        let Some(token) = setting_str(&self.settings, "access_token") else {
            return ConnectionResult::failed("Access token is not configured");
        };

        let url = format!("{}/crm/v3/objects/contacts?limit=1", Self::api_base(&self.settings));
        match self.http.get(&url, &Auth::Bearer(token.to_string())) {
            Ok(response) if response.is_success() => ConnectionResult::ok("Connected to HubSpot"),
            Ok(response) => ConnectionResult::failed(response.error_detail()),
            Err(e) => ConnectionResult::failed(format!("{:#}", e)),
        }
    }

    fn actions(&self) -> Vec<ActionSpec> {
        vec![ActionSpec::new(
            ACTION_CREATE_CONTACT,
            "Create contact",
            "Create a CRM contact from the submission",
        )]
    }

    fn field_mapping(&self, action: &str) -> Vec<FieldSpec> {
        match action {
            ACTION_CREATE_CONTACT => Self::targets().into_iter().map(|(spec, _)| spec).collect(),
            _ => Vec::new(),
        }
    }

    fn settings_schema(&self) -> Vec<FieldSpec> {
        vec![
            FieldSpec::new("lifecycle_stage", "Lifecycle stage", FieldKind::Select).with_options(LIFECYCLE_STAGES),
            FieldSpec::new("field_mapping", "Field mapping", FieldKind::Mapping),
            FieldSpec::new("api_base", "API base URL", FieldKind::Url),
        ]
    }

    fn default_settings(&self) -> Settings {
        json!({
            "enabled": false,
            "action": ACTION_CREATE_CONTACT,
            "field_mapping": {},
        })
        .as_object()
        .cloned()
        .unwrap_or_default()
    }

    fn process_submission(
        &self,
        submission_id: &str,
        fields: &FormFields,
        settings: &Settings,
    ) -> eyre::Result<ProcessResult> {
        let Some(token) = setting_str(settings, "access_token") else {
            return Ok(ProcessResult::failed("HubSpot access token is not configured"));
        };

        let properties = match build_properties(fields, settings) {
            Ok(properties) => properties,
            Err(message) => return Ok(ProcessResult::failed(message)),
        };

        let url = format!("{}/crm/v3/objects/contacts", Self::api_base(settings));
        log::info!("Submission {} → HubSpot contact", submission_id);
        let response = self.http.post_json(
            &url,
            &Auth::Bearer(token.to_string()),
            &json!({ "properties": properties }),
        )?;

        let email = as_text(&properties["email"]);
        if response.is_success() {
            let id = response.body.get("id").cloned().unwrap_or_default();
            return Ok(ProcessResult::ok(format!("Created HubSpot contact for {}", email))
                .with_data(json!({"contact_id": id})));
        }

        if response.status == 409 {
            return Ok(ProcessResult::ok(format!("HubSpot contact for {} already exists", email))
                .with_data(json!({"status": response.status})));
        }

        Ok(
            ProcessResult::failed(format!("HubSpot rejected the contact: {}", response.error_detail()))
                .with_data(json!({"status": response.status, "response": response.body})),
        )
    }
}
