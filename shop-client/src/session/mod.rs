//! Session store - authentication token and user identity.
//!
//! Two states, `Anonymous` and `Authenticated`. The store is a cheap clone
//! handle; the [`RemoteClient`] holds one so every POST reads the token that
//! is current at call time, and so a reauthentication signal can clear the
//! session before the caller sees the failed response.

pub mod storage;

use parking_lot::RwLock;
use shared::{ChangePasswordRequest, UserInfo};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::audit_log;
use crate::config::ClientConfig;
use crate::error::{AuthError, ClientError, FieldError, ValidationError};
use crate::remote::RemoteClient;

pub use storage::{FileSessionStorage, MemorySessionStorage, SessionStorage, StoredSession};

/// Capacity of the session event channel
const EVENT_CAPACITY: usize = 16;

/// Session state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Anonymous,
    Authenticated,
}

/// Lifecycle notifications for the View
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn(UserInfo),
    LoggedOut,
    /// The backend rejected the token; the session is already cleared
    ReauthRequired,
}

/// Session data held in memory
#[derive(Debug, Clone, Default)]
pub struct SessionData {
    pub token: Option<String>,
    pub user: Option<UserInfo>,
}

impl SessionData {
    /// Sets the token and user info after successful login.
    pub fn set_login(&mut self, token: String, user: UserInfo) {
        self.token = Some(token);
        self.user = Some(user);
    }

    /// Clears the session data on logout.
    pub fn clear(&mut self) {
        self.token = None;
        self.user = None;
    }

    /// Both halves are required to count as logged in
    pub fn status(&self) -> SessionStatus {
        if self.token.is_some() && self.user.is_some() {
            SessionStatus::Authenticated
        } else {
            SessionStatus::Anonymous
        }
    }
}

#[derive(Debug)]
struct SessionInner {
    data: RwLock<SessionData>,
    storage: Arc<dyn SessionStorage>,
    events: broadcast::Sender<SessionEvent>,
}

/// Shared handle to the current login session
#[derive(Debug, Clone)]
pub struct SessionStore {
    inner: Arc<SessionInner>,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(SessionInner {
                data: RwLock::new(SessionData::default()),
                storage,
                events,
            }),
        }
    }

    /// Session that is never written to disk
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemorySessionStorage::new()))
    }

    /// File-backed when the config names a session file, in-memory otherwise
    pub fn from_config(config: &ClientConfig) -> Self {
        match &config.session_file {
            Some(path) => Self::new(Arc::new(FileSessionStorage::new(path))),
            None => Self::in_memory(),
        }
    }

    /// Load a previously persisted session, if any
    pub fn restore(&self) -> SessionStatus {
        let Some(stored) = self.inner.storage.load() else {
            return self.status();
        };
        if stored.token.trim().is_empty() || stored.user.username.trim().is_empty() {
            tracing::warn!("Ignoring incomplete persisted session");
            return self.status();
        }
        tracing::info!(user = %stored.user.username, "Restored persisted session");
        self.inner.data.write().set_login(stored.token, stored.user);
        SessionStatus::Authenticated
    }

    pub fn status(&self) -> SessionStatus {
        self.inner.data.read().status()
    }

    pub fn is_authenticated(&self) -> bool {
        self.status() == SessionStatus::Authenticated
    }

    /// Current token, read fresh on every call
    pub fn token(&self) -> Option<String> {
        self.inner.data.read().token.clone()
    }

    pub fn user(&self) -> Option<UserInfo> {
        self.inner.data.read().user.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.inner.events.send(event);
    }

    /// Store and persist a fresh login
    pub fn set_login(&self, token: String, user: UserInfo) {
        let stored = StoredSession::new(token.clone(), user.clone());
        self.inner.data.write().set_login(token, user.clone());
        if let Err(e) = self.inner.storage.save(&stored) {
            tracing::warn!("Failed to persist session: {}", e);
        }
        self.emit(SessionEvent::LoggedIn(user));
    }

    fn clear(&self) -> Option<UserInfo> {
        let previous = {
            let mut data = self.inner.data.write();
            let previous = data.user.take();
            data.clear();
            previous
        };
        if let Err(e) = self.inner.storage.clear() {
            tracing::warn!("Failed to clear persisted session: {}", e);
        }
        previous
    }

    /// Clear token and user. Safe to call when already anonymous.
    pub fn logout(&self) {
        if let Some(user) = self.clear() {
            audit_log!(user.username.as_str(), "logout", "session");
        }
        self.emit(SessionEvent::LoggedOut);
    }

    /// Reaction to a backend reauthentication signal
    pub fn on_reauth_required(&self) {
        if let Some(user) = self.clear() {
            tracing::warn!(user = %user.username, "Session expired, forcing logout");
        }
        self.emit(SessionEvent::ReauthRequired);
    }

    /// Log in with username and password.
    ///
    /// On rejection the session stays anonymous and the backend's message is
    /// returned unchanged.
    pub async fn login(
        &self,
        remote: &RemoteClient,
        username: &str,
        password: &str,
    ) -> Result<UserInfo, AuthError> {
        let username = username.trim();
        let password = password.trim();
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        let resp = remote.login(username, password).await?;
        if !resp.success {
            tracing::info!(user = %username, "Login rejected");
            return Err(AuthError::Rejected(resp.message_or("Login failed")));
        }

        let token = resp
            .token
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ClientError::InvalidResponse("login response has no token".into()))?;
        let user = resp
            .user
            .clone()
            .ok_or_else(|| ClientError::InvalidResponse("login response has no user".into()))?;

        self.set_login(token, user.clone());
        audit_log!(user.username.as_str(), "login", "session");
        Ok(user)
    }

    /// Check the token against the backend's dedicated verify action
    pub async fn verify(&self, remote: &RemoteClient) -> Result<UserInfo, AuthError> {
        if !self.is_authenticated() {
            return Err(AuthError::NotAuthenticated);
        }
        let resp = remote.verify_session().await?;
        if resp.reauth {
            return Err(AuthError::ReauthRequired);
        }
        if !resp.success {
            return Err(AuthError::Rejected(resp.message_or("Session verification failed")));
        }

        // The backend may send refreshed identity details
        if let Some(user) = resp.user {
            self.inner.data.write().user = Some(user);
        }
        self.user().ok_or(AuthError::NotAuthenticated)
    }

    /// Change the logged-in user's own password
    pub async fn change_password(
        &self,
        remote: &RemoteClient,
        current_password: &str,
        new_password: &str,
        confirm_password: &str,
    ) -> Result<(), AuthError> {
        let mut fields = Vec::new();
        if current_password.is_empty() {
            fields.push(FieldError::new("current_password", "required"));
        }
        if new_password.is_empty() {
            fields.push(FieldError::new("new_password", "required"));
        }
        if confirm_password.is_empty() {
            fields.push(FieldError::new("confirm_password", "required"));
        }
        if fields.is_empty() && new_password != confirm_password {
            fields.push(FieldError::new("confirm_password", "does not match the new password"));
        }
        if !fields.is_empty() {
            return Err(ValidationError { fields }.into());
        }

        let user = self.user().ok_or(AuthError::NotAuthenticated)?;
        let request = ChangePasswordRequest {
            username: user.username.clone(),
            current_password: current_password.to_string(),
            new_password: new_password.to_string(),
        };
        let resp = remote.update_own_password(&request).await?;
        if resp.reauth {
            return Err(AuthError::ReauthRequired);
        }
        if !resp.success {
            return Err(AuthError::Rejected(resp.message_or("Password change failed")));
        }

        audit_log!(user.username.as_str(), "change_password", "user");
        Ok(())
    }

    /// Admin listing of backend users
    pub async fn users(&self, remote: &RemoteClient) -> Result<Vec<UserInfo>, AuthError> {
        if !self.is_authenticated() {
            return Err(AuthError::NotAuthenticated);
        }
        let resp = remote.get_users().await?;
        if resp.reauth {
            return Err(AuthError::ReauthRequired);
        }
        if !resp.success {
            return Err(AuthError::Rejected(resp.message_or("Failed to load users")));
        }
        let users = resp
            .data_as::<Vec<UserInfo>>()
            .map_err(ClientError::from)?
            .unwrap_or_default();
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::mock::MockTransport;
    use serde_json::json;
    use tempfile::TempDir;

    fn remote(session: &SessionStore) -> (RemoteClient, Arc<MockTransport>) {
        let transport = MockTransport::new();
        (RemoteClient::new(transport.clone(), session.clone()), transport)
    }

    #[tokio::test]
    async fn test_login_success() {
        let session = SessionStore::in_memory();
        let (remote, transport) = remote(&session);
        transport.reply(json!({
            "success": true,
            "token": "t-1",
            "user": {"username": "admin", "role": "admin"}
        }));

        let user = session.login(&remote, " admin ", "secret").await.unwrap();

        assert_eq!(user, UserInfo::new("admin", "admin"));
        assert_eq!(session.status(), SessionStatus::Authenticated);
        assert_eq!(session.token().as_deref(), Some("t-1"));
        let sent = &transport.requests.lock()[0];
        assert_eq!(sent.action, "secureLogin");
        assert_eq!(sent.payload["username"], "admin");
    }

    #[tokio::test]
    async fn test_login_rejected_keeps_backend_message() {
        let session = SessionStore::in_memory();
        let (remote, transport) = remote(&session);
        transport.reply(json!({"success": false, "message": "รหัสผ่านไม่ถูกต้อง"}));

        let err = session.login(&remote, "admin", "wrong").await.unwrap_err();

        assert!(matches!(err, AuthError::Rejected(ref m) if m == "รหัสผ่านไม่ถูกต้อง"));
        assert_eq!(session.status(), SessionStatus::Anonymous);
    }

    #[tokio::test]
    async fn test_login_requires_credentials() {
        let session = SessionStore::in_memory();
        let (remote, transport) = remote(&session);

        let err = session.login(&remote, "admin", "   ").await.unwrap_err();

        assert!(matches!(err, AuthError::MissingCredentials));
        assert!(transport.requests.lock().is_empty());
    }

    #[test]
    fn test_logout_is_idempotent() {
        let session = SessionStore::in_memory();
        session.set_login("t".into(), UserInfo::new("admin", "admin"));

        session.logout();
        assert_eq!(session.status(), SessionStatus::Anonymous);
        session.logout();
        assert_eq!(session.status(), SessionStatus::Anonymous);
        assert!(session.token().is_none());
    }

    #[test]
    fn test_restore_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("session.json");

        let first = SessionStore::new(Arc::new(FileSessionStorage::new(&path)));
        first.set_login("persisted".into(), UserInfo::new("staff", "editor"));

        // a "reload": new store, same file
        let second = SessionStore::new(Arc::new(FileSessionStorage::new(&path)));
        assert_eq!(second.status(), SessionStatus::Anonymous);
        assert_eq!(second.restore(), SessionStatus::Authenticated);
        assert_eq!(second.token().as_deref(), Some("persisted"));

        second.logout();
        let third = SessionStore::new(Arc::new(FileSessionStorage::new(&path)));
        assert_eq!(third.restore(), SessionStatus::Anonymous);
    }

    #[test]
    fn test_reauth_clears_persisted_state() {
        let storage = Arc::new(MemorySessionStorage::new());
        let session = SessionStore::new(storage.clone());
        session.set_login("t".into(), UserInfo::new("admin", "admin"));
        let mut events = session.subscribe();

        session.on_reauth_required();

        assert!(!session.is_authenticated());
        assert!(storage.load().is_none());
        assert_eq!(events.try_recv().unwrap(), SessionEvent::ReauthRequired);
    }

    #[tokio::test]
    async fn test_change_password_validation() {
        let session = SessionStore::in_memory();
        session.set_login("t".into(), UserInfo::new("admin", "admin"));
        let (remote, transport) = remote(&session);

        let err = session
            .change_password(&remote, "old", "new-1", "new-2")
            .await
            .unwrap_err();

        match err {
            AuthError::Validation(v) => assert!(v.has_field("confirm_password")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(transport.requests.lock().is_empty());
    }

    #[tokio::test]
    async fn test_change_password_sends_username() {
        let session = SessionStore::in_memory();
        session.set_login("t".into(), UserInfo::new("admin", "admin"));
        let (remote, transport) = remote(&session);
        transport.reply(json!({"success": true}));

        session
            .change_password(&remote, "old", "new-1", "new-1")
            .await
            .unwrap();

        let sent = &transport.requests.lock()[0];
        assert_eq!(sent.action, "secureUpdateOwnPassword");
        assert_eq!(sent.payload["username"], "admin");
        assert_eq!(sent.payload["currentPassword"], "old");
        assert_eq!(sent.payload["newPassword"], "new-1");
        assert_eq!(sent.token.as_deref(), Some("t"));
    }

    #[tokio::test]
    async fn test_verify_reauth() {
        let session = SessionStore::in_memory();
        session.set_login("stale".into(), UserInfo::new("admin", "admin"));
        let (remote, transport) = remote(&session);
        transport.reply(json!({"success": false, "reauth": true, "message": "Token expired"}));

        let err = session.verify(&remote).await.unwrap_err();

        assert!(matches!(err, AuthError::ReauthRequired));
        assert_eq!(session.status(), SessionStatus::Anonymous);
    }

    #[tokio::test]
    async fn test_users_listing() {
        let session = SessionStore::in_memory();
        session.set_login("t".into(), UserInfo::new("admin", "admin"));
        let (remote, transport) = remote(&session);
        transport.reply(json!({
            "success": true,
            "data": [{"username": "admin", "role": "admin"}, {"username": "staff", "role": "editor"}]
        }));

        let users = session.users(&remote).await.unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[1].username, "staff");
    }
}
