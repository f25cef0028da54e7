//! Backend response envelope
//!
//! Every action answers with the same loose shape:
//! ```json
//! { "success": true, "message": "...", "data": ..., "categories": [...],
//!   "token": "...", "user": {...}, "url": "...", "reauth": false }
//! ```
//! Which optional fields are present depends on the action.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::client::UserInfo;

/// Unified backend response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackendResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "crate::models::product::serde_helpers::lenient_string_list"
    )]
    pub categories: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub reauth: bool,
    /// Action-specific fields not modelled above
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl BackendResponse {
    /// Create a successful response
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Default::default()
        }
    }

    /// Create a failed response carrying a message
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Backend message, or `fallback` when the backend sent none
    pub fn message_or(&self, fallback: &str) -> String {
        self.message
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(fallback)
            .to_string()
    }

    /// Decode `data` into a typed value; `None` when `data` is absent
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<Option<T>, serde_json::Error> {
        self.data
            .clone()
            .map(serde_json::from_value)
            .transpose()
    }

    /// Look up a field in `data` first, then among the top-level extras
    pub fn field(&self, key: &str) -> Option<&serde_json::Value> {
        self.data
            .as_ref()
            .and_then(|d| d.get(key))
            .or_else(|| self.extra.get(key))
    }
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_bool().unwrap_or(false))
}

/// True if `"reauth": true` appears anywhere in the document
pub fn has_reauth_signal(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Object(map) => map.iter().any(|(key, v)| {
            (key == "reauth" && v.as_bool() == Some(true)) || has_reauth_signal(v)
        }),
        serde_json::Value::Array(items) => items.iter().any(has_reauth_signal),
        _ => false,
    }
}
