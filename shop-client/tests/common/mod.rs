// shop-client/tests/common/mod.rs
// In-process mock of the storefront backend

#![allow(dead_code)]

use axum::{
    Json, Router,
    extract::{Query, State},
    http::HeaderMap,
    routing::get,
};
use parking_lot::Mutex;
use serde_json::{Value, json};
use shop_client::{ClientConfig, ShopApp};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

pub const ADMIN_USER: &str = "admin";
pub const ADMIN_PASSWORD: &str = "secret";

/// One request as the backend saw it
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: &'static str,
    pub action: String,
    pub token: Option<String>,
    pub content_type: Option<String>,
    pub query: HashMap<String, String>,
    pub data: Value,
}

#[derive(Debug, Default)]
pub struct BackendState {
    pub requests: Mutex<Vec<Recorded>>,
    /// Sheet rows, `image_url` comma-joined like the real sheet
    pub rows: Mutex<Vec<Value>>,
    pub valid_token: Mutex<Option<String>>,
    pub password: Mutex<String>,
    /// File names whose upload is refused
    pub fail_uploads: Mutex<HashSet<String>>,
    counter: Mutex<u64>,
}

impl BackendState {
    fn next(&self) -> u64 {
        let mut counter = self.counter.lock();
        *counter += 1;
        *counter
    }

    pub fn actions(&self) -> Vec<String> {
        self.requests.lock().iter().map(|r| r.action.clone()).collect()
    }

    pub fn count(&self, action: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.action == action)
            .count()
    }

    /// Invalidate the current token, as a server-side expiry would
    pub fn expire_token(&self) {
        *self.valid_token.lock() = None;
    }

    pub fn seed_row(&self, row: Value) {
        self.rows.lock().push(row);
    }
}

pub struct MockBackend {
    pub url: String,
    pub base_url: String,
    pub state: Arc<BackendState>,
}

impl MockBackend {
    pub async fn start() -> Self {
        let state = Arc::new(BackendState::default());
        *state.password.lock() = ADMIN_PASSWORD.to_string();

        let app = Router::new()
            .route("/exec", get(handle_get).post(handle_post))
            .route("/garbage", get(|| async { "<html>Service unavailable</html>" }))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let base_url = format!("http://{}", addr);
        Self {
            url: format!("{}/exec", base_url),
            base_url,
            state,
        }
    }

    pub fn config(&self) -> ClientConfig {
        ClientConfig::new(self.url.clone()).without_session_file()
    }

    pub fn app(&self) -> ShopApp {
        ShopApp::new(self.config()).unwrap()
    }
}

async fn handle_get(
    State(state): State<Arc<BackendState>>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    let action = query.get("action").cloned().unwrap_or_default();
    state.requests.lock().push(Recorded {
        method: "GET",
        action: action.clone(),
        token: None,
        content_type: None,
        query,
        data: Value::Null,
    });

    match action.as_str() {
        "getProducts" => Json(json!({"success": true, "data": state.rows.lock().clone()})),
        "getCategories" => {
            let mut categories: Vec<String> = Vec::new();
            for row in state.rows.lock().iter() {
                let category = row["category"].as_str().unwrap_or_default().to_string();
                if !categories.contains(&category) {
                    categories.push(category);
                }
            }
            Json(json!({"success": true, "categories": categories}))
        }
        other => Json(json!({"success": false, "message": format!("Unknown action: {other}")})),
    }
}

async fn handle_post(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    body: String,
) -> Json<Value> {
    let envelope: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
    let action = envelope["action"].as_str().unwrap_or_default().to_string();
    let token = envelope["token"].as_str().map(String::from);
    let data = envelope["data"].clone();

    state.requests.lock().push(Recorded {
        method: "POST",
        action: action.clone(),
        token: token.clone(),
        content_type: headers
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(String::from),
        query: HashMap::new(),
        data: data.clone(),
    });

    if action == "secureLogin" {
        return Json(login(&state, &data));
    }

    let valid = state.valid_token.lock().clone();
    if token.is_none() || token != valid {
        return Json(json!({"success": false, "message": "Session expired", "reauth": true}));
    }

    Json(match action.as_str() {
        "secureVerifySession" => {
            json!({"success": true, "user": {"username": ADMIN_USER, "role": "admin"}})
        }
        "secureUploadImage" => upload(&state, &data),
        "secureAddProduct" => {
            let id = format!("P-{}", state.next());
            let mut row = data.clone();
            row["id"] = json!(id);
            state.rows.lock().push(row);
            json!({"success": true, "message": "Product added", "id": id})
        }
        "secureUpdateProduct" => {
            let mut rows = state.rows.lock();
            match rows.iter_mut().find(|r| r["id"] == data["id"]) {
                Some(row) => {
                    *row = data.clone();
                    json!({"success": true, "message": "Product updated"})
                }
                None => json!({"success": false, "message": "Product not found"}),
            }
        }
        "secureDeleteProduct" => {
            let mut rows = state.rows.lock();
            let before = rows.len();
            rows.retain(|r| r["id"] != data["id"]);
            if rows.len() < before {
                json!({"success": true, "message": "Product deleted"})
            } else {
                json!({"success": false, "message": "Product not found"})
            }
        }
        "secureUpdateOwnPassword" => {
            let mut password = state.password.lock();
            if data["currentPassword"].as_str() != Some(password.as_str()) {
                json!({"success": false, "message": "รหัสผ่านปัจจุบันไม่ถูกต้อง"})
            } else {
                *password = data["newPassword"].as_str().unwrap_or_default().to_string();
                json!({"success": true, "message": "Password updated"})
            }
        }
        "secureGetUsers" => json!({
            "success": true,
            "data": [{"username": ADMIN_USER, "role": "admin"}, {"username": "staff", "role": "editor"}]
        }),
        other => json!({"success": false, "message": format!("Unknown action: {other}")}),
    })
}

fn login(state: &BackendState, data: &Value) -> Value {
    let username = data["username"].as_str().unwrap_or_default();
    let password = data["password"].as_str().unwrap_or_default();
    if username != ADMIN_USER || password != state.password.lock().as_str() {
        return json!({"success": false, "message": "ชื่อผู้ใช้หรือรหัสผ่านไม่ถูกต้อง"});
    }
    let token = format!("token-{}", state.next());
    *state.valid_token.lock() = Some(token.clone());
    json!({
        "success": true,
        "token": token,
        "user": {"username": ADMIN_USER, "role": "admin"}
    })
}

fn upload(state: &BackendState, data: &Value) -> Value {
    let file_name = data["fileName"].as_str().unwrap_or_default().to_string();
    if state.fail_uploads.lock().contains(&file_name) {
        return json!({"success": false, "message": format!("Cannot store {file_name}")});
    }
    if data["imageData"].as_str().unwrap_or_default().is_empty() {
        return json!({"success": false, "message": "No image data"});
    }
    let url = format!("https://img.test/{}/{}", state.next(), file_name);
    json!({"success": true, "url": url})
}
