use axum::Json;
use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::{Value, json};

use super::AppState;
use super::error::ApiError;
use super::extract::{JsonBody, cookie_header};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockRequest {
    /// Any JSON value; anything but a string counts as missing.
    #[serde(default)]
    passcode: Option<Value>,
    #[serde(default)]
    remember_me: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct MagicLinkRequest {
    #[serde(default)]
    email: Option<String>,
}

pub async fn unlock(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<UnlockRequest>,
) -> Result<Response, ApiError> {
    let passcode = match body.passcode {
        Some(Value::String(passcode)) => passcode,
        _ => String::new(),
    };
    match state.office.unlock(&passcode, body.remember_me).await? {
        Some(unlocked) => Ok((
            [(SET_COOKIE, unlocked.session.set_cookie)],
            Json(json!({ "ok": true, "role": unlocked.role })),
        )
            .into_response()),
        None => Ok((
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Invalid passcode" })),
        )
            .into_response()),
    }
}

pub async fn logout(State(state): State<AppState>) -> Result<Response, ApiError> {
    let cookie = state.office.logout_cookie()?;
    Ok(([(SET_COOKIE, cookie)], Json(json!({ "ok": true }))).into_response())
}

/// Who the browser is, for display only.
pub async fn current(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let session = state.office.session(cookie_header(&headers).as_deref());
    Json(json!({ "session": session })).into_response()
}

pub async fn send_magic_link(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<MagicLinkRequest>,
) -> Result<Response, ApiError> {
    state
        .office
        .send_magic_link(body.email.as_deref().unwrap_or_default())
        .await?;
    Ok(Json(json!({ "ok": true })).into_response())
}
