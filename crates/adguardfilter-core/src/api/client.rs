//! API client for the AdGuard Home control API.
//!
//! `ApiClient` keeps a cookie session against the appliance and replays a
//! request once after a silent re-login when the session has expired.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{header, Client, Method, Request, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::auth::{Credentials, Session, SessionCookie};
use crate::models::{AllBlockedServicesResponse, BlockedService, ServiceConfig};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds. Also bounds the re-login exchange.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

const LOGIN_PATH: &str = "/control/login";
const BLOCKED_SERVICES_GET_PATH: &str = "/control/blocked_services/get";
const BLOCKED_SERVICES_UPDATE_PATH: &str = "/control/blocked_services/update";
const BLOCKED_SERVICES_ALL_PATH: &str = "/control/blocked_services/all";

/// The appliance's own web UI sends these; some reverse proxies in front of
/// it reject requests without them.
const ACCEPT_VALUE: &str = "application/json, text/plain, */*";
const USER_AGENT_VALUE: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    name: &'a str,
    password: &'a str,
}

/// API client for AdGuard Home.
/// Clone is cheap - the connection pool and session are shared.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    session: Arc<RwLock<Session>>,
    /// Serializes re-logins so a burst of 401s triggers a single login.
    reauth_lock: Arc<Mutex<()>>,
}

impl ApiClient {
    /// Create a new API client with the default request timeout
    pub fn new() -> Result<Self, ApiError> {
        Self::with_timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            session: Arc::new(RwLock::new(Session::new())),
            reauth_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Seed the session with configured credentials so the first 401 can be
    /// recovered even if the startup login failed.
    pub fn with_credentials(self, credentials: Credentials) -> Self {
        Self {
            session: Arc::new(RwLock::new(Session::with_credentials(credentials))),
            ..self
        }
    }

    /// Log in and store the session cookies.
    ///
    /// The stored credentials and cookies are replaced only when the appliance
    /// answers 200 *and* sets at least one cookie.
    pub async fn authenticate(
        &self,
        base_url: &str,
        username: &str,
        password: &str,
    ) -> Result<(), ApiError> {
        let credentials = Credentials::new(base_url, username, password);
        let url = format!("{}{}", credentials.base_url, LOGIN_PATH);

        let response = self
            .client
            .post(&url)
            .header(header::ACCEPT, ACCEPT_VALUE)
            .header(header::USER_AGENT, USER_AGENT_VALUE)
            .json(&LoginRequest {
                name: username,
                password,
            })
            .send()
            .await
            .map_err(|e| {
                error!(url = %url, error = %e, "Failed to send authentication request");
                ApiError::from(e)
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "Authentication failed");
            return Err(ApiError::LoginRejected(status));
        }

        let cookies: Vec<SessionCookie> = response
            .cookies()
            .map(|c| SessionCookie::new(c.name(), c.value()))
            .collect();
        let body = response.text().await.unwrap_or_default();
        debug!(body = %body, "Authentication response");

        if cookies.is_empty() {
            error!(url = %url, "No cookies received from authentication");
            return Err(ApiError::NoSessionCookies);
        }

        for cookie in &cookies {
            debug!(name = %cookie.name, "Session cookie stored");
        }

        self.session.write().await.update(credentials, cookies);
        info!(username = %username, "Successfully authenticated, cookies stored for future requests");
        Ok(())
    }

    /// Send a request with the current session, re-authenticating once on 401/403.
    ///
    /// Transport failures are returned as-is. Any status other than 401/403 is
    /// returned unmodified for the caller to interpret. The replay after a
    /// re-login is final: its outcome is returned whatever it is.
    pub async fn execute(&self, request: Request) -> Result<Response, ApiError> {
        let replay = request.try_clone();

        let (response, generation) = self.send_with_session(request).await?;
        let status = response.status();
        if !is_auth_status(status) {
            return Ok(response);
        }
        drop(response);

        let credentials = self.session.read().await.reauth_credentials().cloned();
        let Some(credentials) = credentials else {
            error!(status = %status, "Authentication failed and no credentials stored for re-authentication");
            return Err(ApiError::NoStoredCredentials);
        };

        info!(status = %status, "Session expired, attempting re-authentication");
        self.reauthenticate(&credentials, generation)
            .await
            .map_err(|e| {
                error!(error = %e, "Re-authentication failed");
                ApiError::ReauthFailed(Box::new(e))
            })?;

        let Some(replay) = replay else {
            warn!("Request body cannot be replayed after re-authentication");
            return Err(ApiError::InvalidResponse(
                "request body cannot be replayed".to_string(),
            ));
        };

        info!("Re-authentication successful, retrying original request");
        let (response, _) = self.send_with_session(replay).await?;
        Ok(response)
    }

    /// `execute`, abandoned as soon as `cancel` fires.
    pub async fn execute_with_cancel(
        &self,
        request: Request,
        cancel: &CancellationToken,
    ) -> Result<Response, ApiError> {
        tokio::select! {
            _ = cancel.cancelled() => Err(ApiError::Cancelled),
            result = self.execute(request) => result,
        }
    }

    /// True once a login has produced session cookies
    pub async fn is_authenticated(&self) -> bool {
        self.session.read().await.is_authenticated()
    }

    /// Stored credentials, if a login succeeded or credentials were seeded
    pub async fn credentials(&self) -> Option<Credentials> {
        self.session.read().await.credentials().cloned()
    }

    /// Re-login unless another task already replaced the session whose
    /// cookie was rejected (`seen_generation`).
    async fn reauthenticate(
        &self,
        credentials: &Credentials,
        seen_generation: u64,
    ) -> Result<(), ApiError> {
        let _guard = self.reauth_lock.lock().await;
        if self.session.read().await.generation() != seen_generation {
            debug!("Session already refreshed by a concurrent request");
            return Ok(());
        }
        self.authenticate(
            &credentials.base_url,
            &credentials.username,
            &credentials.password,
        )
        .await
    }

    /// Send with the current cookies. Also returns the generation those
    /// cookies belong to, read under the same lock.
    async fn send_with_session(&self, mut request: Request) -> Result<(Response, u64), ApiError> {
        let (cookie, generation) = {
            let session = self.session.read().await;
            (session.cookie_header(), session.generation())
        };
        if let Some(cookie) = cookie {
            let value = header::HeaderValue::from_str(&cookie)
                .map_err(|e| ApiError::InvalidResponse(format!("invalid session cookie: {}", e)))?;
            request.headers_mut().insert(header::COOKIE, value);
        }
        let response = self.client.execute(request).await?;
        Ok((response, generation))
    }

    async fn base_url(&self) -> Result<String, ApiError> {
        self.session
            .read()
            .await
            .base_url()
            .map(str::to_string)
            .ok_or(ApiError::NoStoredCredentials)
    }

    async fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        let url = format!("{}{}", self.base_url().await?, path);
        Ok(self
            .client
            .request(method, url)
            .header(header::ACCEPT, ACCEPT_VALUE)
            .header(header::USER_AGENT, USER_AGENT_VALUE))
    }

    /// Check the response is a 200, returning an error with body if not.
    async fn check_response(response: Response) -> Result<Response, ApiError> {
        if response.status() == StatusCode::OK {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "Request failed");
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let request = self.request(Method::GET, path).await?.build()?;
        let response = Self::check_response(self.execute(request).await?).await?;
        let body = response.text().await?;
        debug!(path = path, body = %body, "Response body");
        serde_json::from_str(&body)
            .map_err(|e| ApiError::InvalidResponse(format!("failed to parse {}: {}", path, e)))
    }

    // ===== Blocked Services =====

    /// Fetch the current blocked-services configuration
    pub async fn get_blocked_services(&self) -> Result<ServiceConfig, ApiError> {
        let config: ServiceConfig = self.get_json(BLOCKED_SERVICES_GET_PATH).await?;
        info!(
            count = config.ids.len(),
            time_zone = %config.schedule.time_zone,
            "Retrieved blocked services configuration"
        );
        Ok(config)
    }

    /// Fetch the catalog of services the appliance knows how to block
    pub async fn all_blocked_services(&self) -> Result<Vec<BlockedService>, ApiError> {
        let response: AllBlockedServicesResponse =
            self.get_json(BLOCKED_SERVICES_ALL_PATH).await?;
        info!(count = response.blocked_services.len(), "Retrieved blocked services catalog");
        Ok(response.blocked_services)
    }

    /// Replace the blocked-services configuration
    pub async fn update_blocked_services(&self, config: &ServiceConfig) -> Result<(), ApiError> {
        let request = self
            .request(Method::PUT, BLOCKED_SERVICES_UPDATE_PATH)
            .await?
            .json(config)
            .build()?;
        let response = Self::check_response(self.execute(request).await?).await?;
        let body = response.text().await.unwrap_or_default();
        debug!(body = %body, "Update response body");
        info!(count = config.ids.len(), "Updated blocked services configuration");
        Ok(())
    }
}

fn is_auth_status(status: StatusCode) -> bool {
    status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN
}
