//! HTTP facade over the reset scheduler.

use std::path::PathBuf;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use chrono::Utc;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::{debug, error, info};

use adguardfilter_core::models::{ResetAfterMinutesRequest, ResetAtRequest};
use adguardfilter_core::utils::{format_remaining, format_timestamp};
use adguardfilter_core::{parse_deadline, ResetScheduler, TimerError};

/// Build the facade router around a scheduler.
///
/// Paths outside the API are served from `static_dir`. `GET /` answers with
/// a liveness line when the directory has no `index.html`.
pub fn router(scheduler: ResetScheduler, static_dir: impl Into<PathBuf>) -> Router {
    let ui = ServeDir::new(static_dir.into()).fallback(Router::new().route("/", get(index)));

    Router::new()
        .route("/api/v1/getblockedservices", get(get_blocked_services))
        .route("/api/v1/getservicelist", get(get_service_list))
        .route(
            "/api/v1/updateblockedservicesmin",
            put(update_blocked_services_min)
                .post(update_blocked_services_min),
        )
        .route(
            "/api/v1/updateblockedservicesdatetime",
            put(update_blocked_services_datetime)
                .post(update_blocked_services_datetime),
        )
        .route("/api/v1/gettimer", get(get_timer))
        .fallback_service(ui)
        .layer(CorsLayer::permissive())
        .with_state(scheduler)
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

async fn index() -> &'static str {
    "adguardfilter is running"
}

async fn get_blocked_services(State(scheduler): State<ResetScheduler>) -> Response {
    match scheduler.client().get_blocked_services().await {
        Ok(config) => Json(config).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to get blocked services");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to get blocked services")
        }
    }
}

async fn get_service_list(State(scheduler): State<ResetScheduler>) -> Response {
    match scheduler.client().all_blocked_services().await {
        Ok(services) => Json(services).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to get service list");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to get service list")
        }
    }
}

async fn update_blocked_services_min(
    State(scheduler): State<ResetScheduler>,
    payload: Result<Json<ResetAfterMinutesRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(e) => {
            error!(error = %e, "Failed to parse request body");
            return error_response(StatusCode::BAD_REQUEST, "Failed to parse request body");
        }
    };

    let minutes = request.reset_after_min;
    if minutes > 0 {
        if let Err(e) = ResetScheduler::reset_delay(minutes) {
            error!(error = %e, minutes = minutes, "Rejected reset_after_min");
            return error_response(StatusCode::BAD_REQUEST, &e.to_string());
        }
    }

    if let Err(e) = scheduler.apply(&request.config).await {
        error!(error = %e, "Failed to update blocked services");
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to update blocked services");
    }
    info!(count = request.config.ids.len(), "Successfully updated blocked services");

    if minutes <= 0 {
        return Json(json!({
            "success": true,
            "message": "Blocked services updated (no reset timer set)",
        }))
        .into_response();
    }

    match scheduler.arm_after_minutes(minutes) {
        Ok(timer) => {
            info!(timer_id = %timer.id(), minutes = minutes, "Reset timer created");
            Json(json!({
                "success": true,
                "message": format!(
                    "Blocked services updated and will reset to default in {} minutes",
                    minutes
                ),
                "timer_id": timer.id(),
                "reset_after_min": minutes,
            }))
            .into_response()
        }
        Err(e) => timer_failed(e),
    }
}

async fn update_blocked_services_datetime(
    State(scheduler): State<ResetScheduler>,
    payload: Result<Json<ResetAtRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(e) => {
            error!(error = %e, "Failed to parse request body");
            return error_response(StatusCode::BAD_REQUEST, "Failed to parse request body");
        }
    };

    if request.reset_date_time.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "reset_date_time is required");
    }

    let deadline = match parse_deadline(&request.reset_date_time) {
        Ok(deadline) => deadline,
        Err(e) => {
            error!(error = %e, "Failed to parse reset_date_time");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": "Invalid datetime format. Use ISO 8601 format (e.g., 2025-10-12T15:30:00Z)",
                    "example": format_timestamp(Utc::now() + chrono::Duration::hours(1)),
                })),
            )
                .into_response();
        }
    };

    let now = Utc::now();
    if deadline <= now {
        error!(deadline = %format_timestamp(deadline), "Deadline is in the past");
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "Deadline must be in the future",
                "provided_time": format_timestamp(deadline),
                "current_time": format_timestamp(now),
                "time_difference": format!("-{}", format_remaining(now - deadline)),
            })),
        )
            .into_response();
    }

    if let Err(e) = scheduler.apply(&request.config).await {
        error!(error = %e, "Failed to update blocked services");
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to update blocked services");
    }
    info!(count = request.config.ids.len(), "Successfully updated blocked services");

    match scheduler.arm_at(deadline) {
        Ok(timer) => {
            let now = Utc::now();
            info!(timer_id = %timer.id(), deadline = %format_timestamp(deadline), "Reset timer created");
            Json(json!({
                "success": true,
                "message": "Blocked services updated and will reset to default at specified time",
                "timer_id": timer.id(),
                "reset_date_time": format_timestamp(deadline),
                "time_until_reset": format_remaining(deadline - now),
                "current_time": format_timestamp(now),
            }))
            .into_response()
        }
        Err(e) => timer_failed(e),
    }
}

/// The update already went through, so a timer failure is reported inside a
/// success response.
fn timer_failed(e: TimerError) -> Response {
    error!(error = %e, "Failed to create timer");
    Json(json!({
        "success": true,
        "message": "Blocked services updated, but timer creation failed",
        "timer_error": e.to_string(),
    }))
    .into_response()
}

async fn get_timer(State(scheduler): State<ResetScheduler>) -> Response {
    let Some(status) = scheduler.status() else {
        debug!("No active timer found");
        return Json(json!({
            "is_active": false,
            "message": "No active timer",
        }))
        .into_response();
    };

    Json(json!({
        "is_active": true,
        "timer_id": status.id,
        "expire_time": format_timestamp(status.expire_at),
        "current_time": format_timestamp(Utc::now()),
        "time_remaining": format_remaining(status.remaining),
        "seconds_left": status.remaining.num_seconds(),
        "minutes_left": status.remaining.num_minutes(),
        "message": "Active timer found",
    }))
    .into_response()
}
