// Fake AdGuard Home control API for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use parking_lot::Mutex;
use serde::Deserialize;
use tokio::net::TcpListener;

use adguardfilter_core::models::ServiceConfig;

pub const USERNAME: &str = "admin";
pub const PASSWORD: &str = "secret";

#[derive(Debug, Deserialize)]
struct LoginBody {
    name: String,
    password: String,
}

#[derive(Clone, Default)]
pub struct FakeAdGuard {
    pub logins: Arc<AtomicUsize>,
    pub gets: Arc<AtomicUsize>,
    pub updates: Arc<AtomicUsize>,
    /// Login answers 200 without any Set-Cookie header
    pub omit_cookies: Arc<AtomicBool>,
    /// Login answers 403 for every attempt
    pub reject_logins: Arc<AtomicBool>,
    /// Unauthenticated requests get 403 instead of 401
    pub forbid_instead: Arc<AtomicBool>,
    /// Every data request is refused, even with a fresh cookie
    pub always_unauthorized: Arc<AtomicBool>,
    valid_token: Arc<Mutex<Option<String>>>,
    config: Arc<Mutex<ServiceConfig>>,
    pub updates_seen: Arc<Mutex<Vec<ServiceConfig>>>,
}

impl FakeAdGuard {
    pub fn logins(&self) -> usize {
        self.logins.load(Ordering::SeqCst)
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn updates(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    /// Invalidate the session as if it timed out on the appliance
    pub fn expire_sessions(&self) {
        *self.valid_token.lock() = None;
    }

    pub fn set(&self, flag: &AtomicBool, value: bool) {
        flag.store(value, Ordering::SeqCst);
    }

    pub fn last_update(&self) -> Option<ServiceConfig> {
        self.updates_seen.lock().last().cloned()
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        if self.always_unauthorized.load(Ordering::SeqCst) {
            return false;
        }
        let Some(token) = self.valid_token.lock().clone() else {
            return false;
        };
        headers
            .get(header::COOKIE)
            .and_then(|v| v.to_str().ok())
            .map(|cookies| cookies.split("; ").any(|c| c == format!("agh_session={}", token)))
            .unwrap_or(false)
    }

    fn denied(&self) -> Response {
        if self.forbid_instead.load(Ordering::SeqCst) {
            (StatusCode::FORBIDDEN, "forbidden").into_response()
        } else {
            (StatusCode::UNAUTHORIZED, "unauthorized").into_response()
        }
    }
}

async fn login(State(fake): State<FakeAdGuard>, Json(body): Json<LoginBody>) -> Response {
    let n = fake.logins.fetch_add(1, Ordering::SeqCst) + 1;
    if fake.reject_logins.load(Ordering::SeqCst) || body.name != USERNAME || body.password != PASSWORD {
        return (StatusCode::FORBIDDEN, "invalid credentials").into_response();
    }
    if fake.omit_cookies.load(Ordering::SeqCst) {
        return (StatusCode::OK, "OK").into_response();
    }

    let token = format!("token-{}", n);
    *fake.valid_token.lock() = Some(token.clone());
    (
        StatusCode::OK,
        [(
            header::SET_COOKIE,
            format!("agh_session={}; Path=/; HttpOnly; Max-Age=3600", token),
        )],
        "OK",
    )
        .into_response()
}

async fn blocked_get(State(fake): State<FakeAdGuard>, headers: HeaderMap) -> Response {
    fake.gets.fetch_add(1, Ordering::SeqCst);
    if !fake.authorized(&headers) {
        return fake.denied();
    }
    let config = fake.config.lock().clone();
    Json(config).into_response()
}

async fn blocked_update(
    State(fake): State<FakeAdGuard>,
    headers: HeaderMap,
    Json(config): Json<ServiceConfig>,
) -> Response {
    fake.updates.fetch_add(1, Ordering::SeqCst);
    if !fake.authorized(&headers) {
        return fake.denied();
    }
    *fake.config.lock() = config.clone();
    fake.updates_seen.lock().push(config);
    StatusCode::OK.into_response()
}

async fn blocked_all(State(fake): State<FakeAdGuard>, headers: HeaderMap) -> Response {
    if !fake.authorized(&headers) {
        return fake.denied();
    }
    Json(serde_json::json!({
        "blocked_services": [
            {"id": "youtube", "name": "YouTube", "icon_svg": "", "rules": ["||youtube.com^"]},
            {"id": "roblox", "name": "Roblox", "icon_svg": "", "rules": ["||roblox.com^"]}
        ]
    }))
    .into_response()
}

async fn slow() -> Response {
    tokio::time::sleep(Duration::from_secs(5)).await;
    StatusCode::OK.into_response()
}

pub async fn start_fake() -> (SocketAddr, FakeAdGuard) {
    let fake = FakeAdGuard::default();
    *fake.config.lock() = ServiceConfig::new(vec!["youtube".to_string()], "America/Chicago");

    let app = Router::new()
        .route("/control/login", post(login))
        .route("/control/blocked_services/get", get(blocked_get))
        .route("/control/blocked_services/update", put(blocked_update))
        .route("/control/blocked_services/all", get(blocked_all))
        .route("/control/slow", get(slow))
        .with_state(fake.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, fake)
}
