//! Submission events
//!
//! A submission arrives as JSON from the form handler, either wrapped
//! (`{"submission_id": .., "form_data": {"form_id": .., ...}}`) or flat
//! (`{"form_id": .., ...}`).

use eyre::Result;
use serde::{Deserialize, Serialize};

use crate::integration::FormFields;

/// One completed form submission
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Submission {
    pub submission_id: String,
    pub form_id: String,
    pub fields: FormFields,
}

impl Submission {
    pub fn new(submission_id: &str, form_id: &str, fields: FormFields) -> Self {
        Self {
            submission_id: submission_id.to_string(),
            form_id: form_id.to_string(),
            fields,
        }
    }

    /// Parse a submission event.
    ///
    /// `form_id` / `submission_id` given explicitly win over values in the payload.
    /// A missing submission id is generated; a missing form id is an error.
    pub fn from_payload(
        payload: &serde_json::Value,
        form_id: Option<&str>,
        submission_id: Option<&str>,
    ) -> Result<Self> {
        let Some(root) = payload.as_object() else {
            eyre::bail!("Submission payload must be a JSON object");
        };

        let data = match root.get("form_data") {
            Some(serde_json::Value::Object(data)) => data,
            Some(_) => eyre::bail!("'form_data' must be a JSON object"),
            None => root,
        };

        let form_id = form_id
            .map(String::from)
            .or_else(|| data.get("form_id").and_then(id_string))
            .or_else(|| root.get("form_id").and_then(id_string))
            .ok_or_else(|| eyre::eyre!("Submission has no form_id"))?;

        let submission_id = submission_id
            .map(String::from)
            .or_else(|| root.get("submission_id").and_then(id_string))
            .unwrap_or_else(generate_submission_id);

        let fields: FormFields = data
            .iter()
            .filter(|(key, _)| key.as_str() != "form_id" && key.as_str() != "submission_id")
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Ok(Self::new(&submission_id, &form_id, fields))
    }
}

/// Ids may arrive as strings or numbers
fn id_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn generate_submission_id() -> String {
    format!("{:x}", chrono::Utc::now().timestamp_millis())
}
