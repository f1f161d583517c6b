//! Form field to integration field mapping

use indexmap::IndexMap;

use super::{FieldSpec, FormFields, Settings};

/// Form field names tried, in order, when no explicit mapping exists
const GUESSES: &[(&str, &[&str])] = &[
    ("email", &["email", "email_address", "your-email", "e-mail", "mail"]),
    ("first_name", &["first_name", "firstname", "fname", "first-name", "name"]),
    ("last_name", &["last_name", "lastname", "lname", "last-name", "surname"]),
    ("phone", &["phone", "phone_number", "telephone", "tel", "mobile"]),
    ("company", &["company", "organization", "organisation"]),
    ("message", &["message", "comments", "your-message"]),
];

/// Resolve integration-side values from submitted form fields.
///
/// `targets` lists the integration fields with a `semantic` hint (one of the
/// guess keys) used when `settings["field_mapping"]` does not name a form
/// field for that target. Empty values are dropped.
pub fn map_fields(
    targets: &[(FieldSpec, &str)],
    fields: &FormFields,
    settings: &Settings,
) -> IndexMap<String, serde_json::Value> {
    let explicit = settings.get("field_mapping").and_then(|v| v.as_object());
    let mut mapped = IndexMap::new();

    for (target, semantic) in targets {
        let source = explicit
            .and_then(|m| m.get(&target.key))
            .and_then(|v| v.as_str())
            .and_then(|name| lookup(fields, name))
            .or_else(|| guess(fields, semantic));

        if let Some(value) = source.filter(|v| !is_blank(v)) {
            mapped.insert(target.key.clone(), value.clone());
        }
    }

    mapped
}

/// Case-insensitive field lookup
fn lookup<'a>(fields: &'a FormFields, name: &str) -> Option<&'a serde_json::Value> {
    fields
        .get(name)
        .or_else(|| fields.iter().find(|(k, _)| k.eq_ignore_ascii_case(name)).map(|(_, v)| v))
}

fn guess<'a>(fields: &'a FormFields, semantic: &str) -> Option<&'a serde_json::Value> {
    GUESSES
        .iter()
        .find(|(key, _)| *key == semantic)
        .and_then(|(_, candidates)| candidates.iter().find_map(|c| lookup(fields, c)))
}

fn is_blank(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => true,
        serde_json::Value::String(s) => s.trim().is_empty(),
        serde_json::Value::Array(a) => a.is_empty(),
        _ => false,
    }
}

/// Render a mapped value as a plain string (arrays become comma lists)
pub fn as_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.trim().to_string(),
        serde_json::Value::Array(items) => items.iter().map(as_text).collect::<Vec<_>>().join(", "),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}
