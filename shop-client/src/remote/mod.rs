//! Remote client - single chokepoint for backend I/O.
//!
//! Every call goes through [`RemoteClient::call`], which formats the request,
//! reads the session token at call time, decodes the loose response envelope
//! and reacts to the reauthentication signal before handing the response
//! back. Business-level failures (`success: false`) are ordinary responses
//! here; callers decide what they mean.

pub mod http;

use serde::Serialize;
use shared::models::{ProductDelete, ProductPayload, UploadImageRequest};
use shared::{Action, BackendRequest, BackendResponse, ChangePasswordRequest, LoginRequest, Method};
use std::sync::Arc;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::session::SessionStore;

pub use http::{HttpTransport, POST_CONTENT_TYPE, Transport};

/// Backend client bound to one session
#[derive(Clone)]
pub struct RemoteClient {
    transport: Arc<dyn Transport>,
    session: SessionStore,
}

impl std::fmt::Debug for RemoteClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteClient")
            .field("session", &self.session.status())
            .finish()
    }
}

impl RemoteClient {
    pub fn new(transport: Arc<dyn Transport>, session: SessionStore) -> Self {
        Self { transport, session }
    }

    /// Build an HTTP-backed client from configuration
    pub fn from_config(config: &ClientConfig, session: SessionStore) -> ClientResult<Self> {
        let transport = HttpTransport::from_config(config)?;
        Ok(Self::new(Arc::new(transport), session))
    }

    /// The session whose token is attached to POST calls
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Perform one backend call.
    ///
    /// GET sends `action` plus every payload key as query parameters.
    /// POST sends `{ action, token, data }` as a plain-text JSON body, with
    /// the token read from the session right now.
    pub async fn call(
        &self,
        action: &str,
        payload: serde_json::Value,
        method: Method,
    ) -> ClientResult<BackendResponse> {
        let payload = match payload {
            serde_json::Value::Object(map) => map,
            serde_json::Value::Null => serde_json::Map::new(),
            other => {
                return Err(ClientError::InvalidPayload(format!(
                    "expected a JSON object, got {}",
                    other
                )));
            }
        };
        let token = match method {
            Method::Get => None,
            Method::Post => self.session.token(),
        };
        let request = BackendRequest {
            action: action.to_string(),
            method,
            payload,
            token,
        };

        tracing::debug!(action = %action, method = %method, "Calling backend");
        let value = self.transport.send(&request).await.map_err(|e| {
            tracing::error!(action = %action, "Backend call failed: {}", e);
            e
        })?;

        // The session is dropped before the reply is validated, so even a
        // malformed reply carrying the signal logs the user out.
        let reauth = shared::has_reauth_signal(&value);
        if reauth {
            tracing::warn!(action = %action, "Backend rejected the session token");
            self.session.on_reauth_required();
        }
        if !value.is_object() {
            return Err(ClientError::InvalidResponse(format!(
                "expected a JSON object from '{}'",
                action
            )));
        }
        let mut response: BackendResponse = serde_json::from_value(value)
            .map_err(|e| ClientError::InvalidResponse(format!("{}: {}", action, e)))?;

        response.reauth |= reauth;
        if !response.success {
            tracing::debug!(
                action = %action,
                message = response.message.as_deref().unwrap_or(""),
                "Backend reported failure"
            );
        }
        Ok(response)
    }

    /// Call a known action with a serializable payload, using its natural method
    pub async fn call_action<P: Serialize + ?Sized>(
        &self,
        action: Action,
        payload: &P,
    ) -> ClientResult<BackendResponse> {
        let payload = serde_json::to_value(payload)?;
        self.call(action.as_str(), payload, action.method()).await
    }

    // ========== Catalog API ==========

    pub async fn get_products(&self) -> ClientResult<BackendResponse> {
        self.call_action(Action::GetProducts, &serde_json::Value::Null)
            .await
    }

    pub async fn get_categories(&self) -> ClientResult<BackendResponse> {
        self.call_action(Action::GetCategories, &serde_json::Value::Null)
            .await
    }

    // ========== Auth API ==========

    pub async fn login(&self, username: &str, password: &str) -> ClientResult<BackendResponse> {
        let request = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        self.call_action(Action::Login, &request).await
    }

    /// Ask the backend whether the current token is still valid
    pub async fn verify_session(&self) -> ClientResult<BackendResponse> {
        self.call_action(Action::VerifySession, &serde_json::Value::Null)
            .await
    }

    pub async fn update_own_password(
        &self,
        request: &ChangePasswordRequest,
    ) -> ClientResult<BackendResponse> {
        self.call_action(Action::UpdateOwnPassword, request).await
    }

    pub async fn get_users(&self) -> ClientResult<BackendResponse> {
        self.call_action(Action::GetUsers, &serde_json::Value::Null)
            .await
    }

    // ========== Product API ==========

    pub async fn add_product(&self, payload: &ProductPayload) -> ClientResult<BackendResponse> {
        self.call_action(Action::AddProduct, payload).await
    }

    pub async fn update_product(&self, payload: &ProductPayload) -> ClientResult<BackendResponse> {
        self.call_action(Action::UpdateProduct, payload).await
    }

    pub async fn delete_product(&self, id: &str) -> ClientResult<BackendResponse> {
        let request = ProductDelete { id: id.to_string() };
        self.call_action(Action::DeleteProduct, &request).await
    }

    pub async fn upload_image(&self, request: &UploadImageRequest) -> ClientResult<BackendResponse> {
        self.call_action(Action::UploadImage, request).await
    }
}
