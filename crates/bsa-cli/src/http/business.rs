use axum::Json;
use axum::extract::{Path, Query, State};
use bsa_runtime::{ClientInput, Overview, PayoutInput, SaleInput, ServiceInput};
use serde::Deserialize;
use serde_json::{Value, json};

use super::AppState;
use super::error::ApiError;
use super::extract::{Authorized, JsonBody, Read, Write};

type ApiResult = Result<Json<Value>, ApiError>;

#[derive(Debug, Deserialize)]
pub struct SaleIdQuery {
    #[serde(default)]
    id: Option<String>,
}

pub async fn list_clients(_: Authorized<Read>, State(state): State<AppState>) -> ApiResult {
    let data = state.office.list_clients().await?;
    Ok(Json(json!({ "data": data })))
}

pub async fn create_client(
    _: Authorized<Write>,
    State(state): State<AppState>,
    JsonBody(input): JsonBody<ClientInput>,
) -> ApiResult {
    let client = state.office.create_client(input).await?;
    Ok(Json(json!({ "ok": true, "id": client.id, "data": client })))
}

pub async fn client_visits(
    _: Authorized<Read>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult {
    let visits = state.office.client_visits(&id).await?;
    Ok(Json(json!({ "visits": visits })))
}

pub async fn list_sales(_: Authorized<Read>, State(state): State<AppState>) -> ApiResult {
    let data = state.office.recent_sales().await?;
    Ok(Json(json!({ "data": data })))
}

pub async fn create_sale(
    _: Authorized<Write>,
    State(state): State<AppState>,
    JsonBody(input): JsonBody<SaleInput>,
) -> ApiResult {
    let id = state.office.create_sale(input).await?;
    Ok(Json(json!({ "ok": true, "id": id })))
}

pub async fn delete_sale(
    _: Authorized<Write>,
    State(state): State<AppState>,
    Query(query): Query<SaleIdQuery>,
) -> ApiResult {
    state
        .office
        .delete_sale(query.id.as_deref().unwrap_or_default())
        .await?;
    Ok(Json(json!({ "ok": true })))
}

pub async fn list_services(_: Authorized<Read>, State(state): State<AppState>) -> ApiResult {
    let data = state.office.list_services().await?;
    Ok(Json(json!({ "data": data })))
}

pub async fn create_service(
    _: Authorized<Write>,
    State(state): State<AppState>,
    JsonBody(input): JsonBody<ServiceInput>,
) -> ApiResult {
    let service = state.office.create_service(input).await?;
    Ok(Json(json!({ "ok": true, "id": service.id, "data": service })))
}

pub async fn list_staff(_: Authorized<Read>, State(state): State<AppState>) -> ApiResult {
    let today = state.office.today();
    let data = state.office.list_staff(today).await?;
    Ok(Json(json!({ "data": data })))
}

pub async fn list_payouts(_: Authorized<Write>, State(state): State<AppState>) -> ApiResult {
    let data = state.office.list_payouts().await?;
    Ok(Json(json!({ "data": data })))
}

pub async fn create_payout(
    _: Authorized<Write>,
    State(state): State<AppState>,
    JsonBody(input): JsonBody<PayoutInput>,
) -> ApiResult {
    let payout = state.office.create_payout(input).await?;
    Ok(Json(json!({ "ok": true, "id": payout.id, "data": payout })))
}

pub async fn overview(
    _: Authorized<Read>,
    State(state): State<AppState>,
) -> Result<Json<Overview>, ApiError> {
    let today = state.office.today();
    Ok(Json(state.office.overview(today).await?))
}
