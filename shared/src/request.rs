//! Request types for the backend endpoint
//!
//! The backend is a single URL. Reads are plain GETs with an `action` query
//! parameter; writes are POSTs whose body is a JSON envelope.

use serde::{Deserialize, Serialize};

/// HTTP method used for a backend call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Post => write!(f, "POST"),
        }
    }
}

/// Backend action names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    GetProducts,
    GetCategories,
    Login,
    VerifySession,
    AddProduct,
    UpdateProduct,
    DeleteProduct,
    UploadImage,
    UpdateOwnPassword,
    GetUsers,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::GetProducts => "getProducts",
            Action::GetCategories => "getCategories",
            Action::Login => "secureLogin",
            Action::VerifySession => "secureVerifySession",
            Action::AddProduct => "secureAddProduct",
            Action::UpdateProduct => "secureUpdateProduct",
            Action::DeleteProduct => "secureDeleteProduct",
            Action::UploadImage => "secureUploadImage",
            Action::UpdateOwnPassword => "secureUpdateOwnPassword",
            Action::GetUsers => "secureGetUsers",
        }
    }

    /// Public reads go over GET, everything else is a secured POST
    pub fn method(&self) -> Method {
        match self {
            Action::GetProducts | Action::GetCategories => Method::Get,
            _ => Method::Post,
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<Action> for String {
    fn from(action: Action) -> Self {
        action.as_str().to_string()
    }
}

/// POST body: `{ action, token, data }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostEnvelope {
    pub action: String,
    pub token: Option<String>,
    pub data: serde_json::Value,
}

/// Transport-neutral description of one backend call
#[derive(Debug, Clone)]
pub struct BackendRequest {
    pub action: String,
    pub method: Method,
    /// GET: query parameters (besides `action`). POST: the envelope's `data`.
    pub payload: serde_json::Map<String, serde_json::Value>,
    /// Token read from the session at call time (POST only)
    pub token: Option<String>,
}

impl BackendRequest {
    /// Query pairs for a GET: `action` first, then every payload key
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::with_capacity(self.payload.len() + 1);
        pairs.push(("action".to_string(), self.action.clone()));
        for (key, value) in &self.payload {
            let text = match value {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Null => String::new(),
                other => other.to_string(),
            };
            pairs.push((key.clone(), text));
        }
        pairs
    }

    /// JSON text of the POST envelope
    pub fn envelope_body(&self) -> Result<String, serde_json::Error> {
        let envelope = PostEnvelope {
            action: self.action.clone(),
            token: self.token.clone(),
            data: serde_json::Value::Object(self.payload.clone()),
        };
        serde_json::to_string(&envelope)
    }
}
