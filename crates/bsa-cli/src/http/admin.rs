//! Owner-only administration of access codes and staff profiles.

use axum::Json;
use axum::extract::{Path, State};
use bsa_api::{AccessCodeUpdate, ProfileUpdate};
use bsa_runtime::{AccessCodeInput, ProfileInput};
use serde_json::{Value, json};

use super::AppState;
use super::error::ApiError;
use super::extract::{Authorized, JsonBody, OwnerOnly};

type ApiResult = Result<Json<Value>, ApiError>;

pub async fn list_access_codes(_: Authorized<OwnerOnly>, State(state): State<AppState>) -> ApiResult {
    let data = state.office.list_access_codes().await?;
    Ok(Json(json!({ "data": data })))
}

pub async fn create_access_code(
    auth: Authorized<OwnerOnly>,
    State(state): State<AppState>,
    JsonBody(input): JsonBody<AccessCodeInput>,
) -> ApiResult {
    let data = state.office.create_access_code(input).await?;
    tracing::info!(by = %auth.session.role, code_id = %data.id, role = %data.role, "access code created");
    Ok(Json(json!({ "data": data })))
}

pub async fn update_access_code(
    _: Authorized<OwnerOnly>,
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(update): JsonBody<AccessCodeUpdate>,
) -> ApiResult {
    let data = state.office.update_access_code(&id, update).await?;
    Ok(Json(json!({ "data": data })))
}

pub async fn delete_access_code(
    auth: Authorized<OwnerOnly>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult {
    state.office.delete_access_code(&id).await?;
    tracing::info!(by = %auth.session.role, code_id = %id, "access code deleted");
    Ok(Json(json!({ "ok": true })))
}

pub async fn list_profiles(_: Authorized<OwnerOnly>, State(state): State<AppState>) -> ApiResult {
    let data = state.office.list_profiles().await?;
    Ok(Json(json!({ "data": data })))
}

pub async fn create_profile(
    _: Authorized<OwnerOnly>,
    State(state): State<AppState>,
    JsonBody(input): JsonBody<ProfileInput>,
) -> ApiResult {
    let data = state.office.create_profile(input).await?;
    Ok(Json(json!({ "data": data })))
}

pub async fn update_profile(
    _: Authorized<OwnerOnly>,
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(update): JsonBody<ProfileUpdate>,
) -> ApiResult {
    let data = state.office.update_profile(&id, update).await?;
    Ok(Json(json!({ "data": data })))
}

pub async fn delete_profile(
    _: Authorized<OwnerOnly>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult {
    state.office.delete_profile(&id).await?;
    Ok(Json(json!({ "ok": true })))
}
