//! In-process stand-in for the portal REST API

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};
use tokio::net::TcpListener;

/// Refresh token the stub accepts
pub const VALID_REFRESH: &str = "valid-refresh";
/// Access token the stub issues and accepts
pub const FRESH_ACCESS: &str = "fresh-access";

#[derive(Default)]
pub struct PortalState {
    profile: Mutex<Value>,
    pub refresh_calls: AtomicUsize,
    pub profile_calls: AtomicUsize,
}

impl PortalState {
    fn profile(&self) -> Value {
        self.profile.lock().map(|p| p.clone()).unwrap_or(Value::Null)
    }
}

pub struct StubPortal {
    pub base_url: String,
    pub state: Arc<PortalState>,
}

impl StubPortal {
    /// Serve `profile` as the signed-in member on an ephemeral port
    pub async fn spawn(profile: Value) -> Self {
        let state = Arc::new(PortalState {
            profile: Mutex::new(profile),
            ..Default::default()
        });

        let app = Router::new()
            .route("/api/auth/token/refresh/", post(refresh_token))
            .route("/api/auth/user/", get(current_user))
            .route("/api/accounts/user/notifications/", get(notifications))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind stub portal");
        let addr = listener.local_addr().expect("stub portal address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("stub portal stopped");
        });

        Self {
            base_url: format!("http://{addr}/api"),
            state,
        }
    }

    pub fn set_profile(&self, profile: Value) {
        *self.state.profile.lock().expect("profile lock") = profile;
    }

    pub fn refresh_calls(&self) -> usize {
        self.state.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn profile_calls(&self) -> usize {
        self.state.profile_calls.load(Ordering::SeqCst)
    }
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"detail": "Token is invalid or expired"})),
    )
        .into_response()
}

fn has_fresh_access(headers: &HeaderMap) -> bool {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        == Some(FRESH_ACCESS)
}

async fn refresh_token(
    State(state): State<Arc<PortalState>>,
    Json(body): Json<Value>,
) -> Response {
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);
    if body["refresh"] != VALID_REFRESH {
        return unauthorized();
    }
    Json(json!({"user": state.profile(), "access": FRESH_ACCESS})).into_response()
}

async fn current_user(State(state): State<Arc<PortalState>>, headers: HeaderMap) -> Response {
    state.profile_calls.fetch_add(1, Ordering::SeqCst);
    if !has_fresh_access(&headers) {
        return unauthorized();
    }
    Json(state.profile()).into_response()
}

async fn notifications(headers: HeaderMap) -> Response {
    if !has_fresh_access(&headers) {
        return unauthorized();
    }
    Json(json!({
        "count": 3,
        "next": null,
        "previous": null,
        "results": [
            {
                "id": "n-1",
                "message": "Your membership payment was received",
                "notification_type": "payment",
                "is_read": false,
                "created_at": "2025-03-01T09:30:00Z"
            },
            {
                "id": "n-2",
                "message": "Welcome to the portal",
                "notification_type": "general",
                "is_read": true,
                "created_at": "2025-02-20T08:00:00Z"
            },
            {
                "id": "n-3",
                "message": "New resource published",
                "notification_type": "resource",
                "is_read": false,
                "created_at": "2025-03-02T12:15:00Z"
            }
        ]
    }))
    .into_response()
}
