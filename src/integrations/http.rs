//! Blocking HTTP helper shared by the built-in integrations

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use eyre::{Context, Result};
use std::time::Duration;

use crate::config::HttpConfig;

/// Request authentication scheme
#[derive(Debug, Clone)]
pub enum Auth {
    Basic { user: String, password: String },
    Bearer(String),
}

impl Auth {
    fn header_value(&self) -> String {
        match self {
            Auth::Basic { user, password } => {
                format!("Basic {}", STANDARD.encode(format!("{}:{}", user, password)))
            }
            Auth::Bearer(token) => format!("Bearer {}", token),
        }
    }
}

/// Status and decoded body of a response
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: serde_json::Value,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Best-effort error text from a JSON error body
    pub fn error_detail(&self) -> String {
        for key in ["detail", "message", "title", "error"] {
            if let Some(text) = self.body.get(key).and_then(|v| v.as_str()) {
                return text.to_string();
            }
        }
        match &self.body {
            serde_json::Value::String(s) if !s.is_empty() => s.clone(),
            _ => format!("HTTP {}", self.status),
        }
    }
}

/// Thin wrapper over a `ureq` agent; cheap to clone
#[derive(Clone)]
pub struct HttpClient {
    agent: ureq::Agent,
    user_agent: String,
}

impl HttpClient {
    pub fn new(config: &HttpConfig) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            agent,
            user_agent: config.user_agent.clone(),
        }
    }

    pub fn get(&self, url: &str, auth: &Auth) -> Result<HttpResponse> {
        log::debug!("GET {}", url);
        let mut response = self
            .agent
            .get(url)
            .header("Authorization", &auth.header_value())
            .header("User-Agent", &self.user_agent)
            .header("Accept", "application/json")
            .call()
            .with_context(|| format!("GET {} failed", url))?;

        let status = response.status().as_u16();
        let text = response
            .body_mut()
            .read_to_string()
            .context("Failed to read response body")?;
        Ok(HttpResponse {
            status,
            body: decode_body(&text),
        })
    }

    pub fn post_json(&self, url: &str, auth: &Auth, body: &serde_json::Value) -> Result<HttpResponse> {
        log::debug!("POST {}", url);
        let mut response = self
            .agent
            .post(url)
            .header("Authorization", &auth.header_value())
            .header("User-Agent", &self.user_agent)
            .header("Accept", "application/json")
            .send_json(body)
            .with_context(|| format!("POST {} failed", url))?;

        let status = response.status().as_u16();
        let text = response
            .body_mut()
            .read_to_string()
            .context("Failed to read response body")?;
        Ok(HttpResponse {
            status,
            body: decode_body(&text),
        })
    }
}

/// JSON when possible, raw text otherwise
fn decode_body(text: &str) -> serde_json::Value {
    if text.trim().is_empty() {
        return serde_json::Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| serde_json::Value::String(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_basic_auth_header() {
        let auth = Auth::Basic {
            user: "anystring".to_string(),
            password: "key-us6".to_string(),
        };
        assert_eq!(auth.header_value(), format!("Basic {}", STANDARD.encode("anystring:key-us6")));
    }

    #[test]
    fn test_bearer_auth_header() {
        assert_eq!(Auth::Bearer("tok".to_string()).header_value(), "Bearer tok");
    }

    #[test]
    fn test_decode_body() {
        assert_eq!(decode_body(""), serde_json::Value::Null);
        assert_eq!(decode_body("{\"a\":1}"), json!({"a": 1}));
        assert_eq!(decode_body("plain"), json!("plain"));
    }

    #[test]
    fn test_error_detail_prefers_detail() {
        let response = HttpResponse {
            status: 400,
            body: json!({"title": "Member Exists", "detail": "jane@example.com is already a list member"}),
        };
        assert_eq!(response.error_detail(), "jane@example.com is already a list member");
        assert!(!response.is_success());
    }

    #[test]
    fn test_error_detail_falls_back_to_status() {
        let response = HttpResponse {
            status: 502,
            body: serde_json::Value::Null,
        };
        assert_eq!(response.error_detail(), "HTTP 502");
    }

    #[test]
    fn test_unreachable_host_is_error() {
        let client = HttpClient::new(&HttpConfig {
            timeout_secs: 2,
            user_agent: "formbridge-test".to_string(),
        });
        let result = client.get("http://127.0.0.1:1/ping", &Auth::Bearer("x".to_string()));
        assert!(result.is_err());
    }
}
