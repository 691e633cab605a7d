//! HTTP surface of the back office.

mod admin;
mod business;
mod error;
mod extract;
mod pages;
mod session;
#[cfg(test)]
mod tests;

use std::sync::Arc;

use axum::routing::{get, patch, post};
use axum::{Json, Router, middleware};
use bsa_runtime::BackOffice;
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub office: Arc<BackOffice>,
}

impl AppState {
    pub fn new(office: BackOffice) -> Self {
        Self {
            office: Arc::new(office),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let dashboard = Router::new()
        .route("/dashboard", get(pages::dashboard))
        .route("/dashboard/{*path}", get(pages::dashboard))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            pages::require_session,
        ));

    Router::new()
        .route("/health", get(health))
        .route("/api/unlock", post(session::unlock))
        .route("/api/logout", post(session::logout))
        .route("/api/session", get(session::current))
        .route("/api/auth/send-magic-link", post(session::send_magic_link))
        .route(
            "/api/clients",
            get(business::list_clients).post(business::create_client),
        )
        .route("/api/clients/{id}/visits", get(business::client_visits))
        .route(
            "/api/sales",
            get(business::list_sales)
                .post(business::create_sale)
                .delete(business::delete_sale),
        )
        .route(
            "/api/services",
            get(business::list_services).post(business::create_service),
        )
        .route("/api/staff", get(business::list_staff))
        .route(
            "/api/payouts",
            get(business::list_payouts).post(business::create_payout),
        )
        .route("/api/reports/overview", get(business::overview))
        .route(
            "/api/admin/access-codes",
            get(admin::list_access_codes).post(admin::create_access_code),
        )
        .route(
            "/api/admin/access-codes/{id}",
            patch(admin::update_access_code).delete(admin::delete_access_code),
        )
        .route(
            "/api/admin/profiles",
            get(admin::list_profiles).post(admin::create_profile),
        )
        .route(
            "/api/admin/profiles/{id}",
            patch(admin::update_profile).delete(admin::delete_profile),
        )
        .merge(dashboard)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
