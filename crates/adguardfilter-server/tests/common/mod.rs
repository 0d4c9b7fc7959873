// Fake appliance plus a running facade for end-to-end tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use parking_lot::Mutex;
use tokio::net::TcpListener;

use adguardfilter_core::auth::Credentials;
use adguardfilter_core::models::ServiceConfig;
use adguardfilter_core::{ApiClient, ResetScheduler, TimerRegistry};

const COOKIE: &str = "agh_session=abc123";

#[derive(Clone, Default)]
pub struct Upstream {
    pub logins: Arc<AtomicUsize>,
    /// Every data request answers 500
    pub broken: Arc<AtomicBool>,
    logged_in: Arc<AtomicBool>,
    config: Arc<Mutex<ServiceConfig>>,
    pub updates_seen: Arc<Mutex<Vec<ServiceConfig>>>,
}

impl Upstream {
    pub fn break_data_calls(&self) {
        self.broken.store(true, Ordering::SeqCst);
    }

    pub fn last_update(&self) -> Option<ServiceConfig> {
        self.updates_seen.lock().last().cloned()
    }

    pub fn update_count(&self) -> usize {
        self.updates_seen.lock().len()
    }

    fn check(&self, headers: &HeaderMap) -> Option<Response> {
        if self.broken.load(Ordering::SeqCst) {
            return Some((StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response());
        }
        let has_cookie = headers
            .get(header::COOKIE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.contains(COOKIE))
            .unwrap_or(false);
        if !has_cookie || !self.logged_in.load(Ordering::SeqCst) {
            return Some((StatusCode::UNAUTHORIZED, "unauthorized").into_response());
        }
        None
    }
}

async fn login(State(up): State<Upstream>) -> Response {
    up.logins.fetch_add(1, Ordering::SeqCst);
    up.logged_in.store(true, Ordering::SeqCst);
    (
        StatusCode::OK,
        [(header::SET_COOKIE, format!("{}; Path=/; HttpOnly", COOKIE))],
        "OK",
    )
        .into_response()
}

async fn blocked_get(State(up): State<Upstream>, headers: HeaderMap) -> Response {
    if let Some(denied) = up.check(&headers) {
        return denied;
    }
    Json(up.config.lock().clone()).into_response()
}

async fn blocked_update(
    State(up): State<Upstream>,
    headers: HeaderMap,
    Json(config): Json<ServiceConfig>,
) -> Response {
    if let Some(denied) = up.check(&headers) {
        return denied;
    }
    *up.config.lock() = config.clone();
    up.updates_seen.lock().push(config);
    StatusCode::OK.into_response()
}

async fn blocked_all(State(up): State<Upstream>, headers: HeaderMap) -> Response {
    if let Some(denied) = up.check(&headers) {
        return denied;
    }
    Json(serde_json::json!({
        "blocked_services": [
            {"id": "youtube", "name": "YouTube", "icon_svg": "", "rules": ["||youtube.com^"]}
        ]
    }))
    .into_response()
}

async fn serve(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

pub fn default_config() -> ServiceConfig {
    ServiceConfig::new(
        vec!["youtube".to_string(), "roblox".to_string()],
        "America/Chicago",
    )
}

pub struct Harness {
    /// Base URL of the facade under test
    pub url: String,
    pub upstream: Upstream,
    pub scheduler: ResetScheduler,
    pub http: reqwest::Client,
}

/// A fresh directory holding `files`, for serving as the web UI.
pub fn ui_dir(files: &[(&str, &str)]) -> PathBuf {
    static NEXT: AtomicUsize = AtomicUsize::new(0);
    let dir = std::env::temp_dir().join(format!(
        "adguardfilter-ui-{}-{}",
        std::process::id(),
        NEXT.fetch_add(1, Ordering::SeqCst)
    ));
    std::fs::create_dir_all(&dir).unwrap();
    for (name, body) in files {
        std::fs::write(dir.join(name), body).unwrap();
    }
    dir
}

/// Start a fake appliance and the facade in front of it.
pub async fn start() -> Harness {
    start_with_ui(ui_dir(&[])).await
}

/// Same as `start`, serving the web UI from `static_dir`.
pub async fn start_with_ui(static_dir: PathBuf) -> Harness {
    let upstream = Upstream::default();
    *upstream.config.lock() = ServiceConfig::new(vec!["youtube".to_string()], "America/Chicago");

    let upstream_app = Router::new()
        .route("/control/login", post(login))
        .route("/control/blocked_services/get", get(blocked_get))
        .route("/control/blocked_services/update", put(blocked_update))
        .route("/control/blocked_services/all", get(blocked_all))
        .with_state(upstream.clone());
    let upstream_addr = serve(upstream_app).await;

    let client = ApiClient::new().unwrap().with_credentials(Credentials::new(
        format!("http://{}", upstream_addr),
        "admin",
        "secret",
    ));
    let scheduler = ResetScheduler::new(client, TimerRegistry::new(), default_config());
    let facade_addr = serve(adguardfilter_server::router(scheduler.clone(), static_dir)).await;

    Harness {
        url: format!("http://{}", facade_addr),
        upstream,
        scheduler,
        http: reqwest::Client::new(),
    }
}
