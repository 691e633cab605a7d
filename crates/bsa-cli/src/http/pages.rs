use axum::Json;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use serde_json::json;

use super::AppState;
use super::extract::cookie_header;

/// Page requests without a live session are sent to the unlock screen.
pub async fn require_session(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let header = cookie_header(req.headers());
    if state.office.session(header.as_deref()).is_none() {
        return Redirect::temporary("/unlock").into_response();
    }
    next.run(req).await
}

pub async fn dashboard(State(state): State<AppState>, req: Request) -> Response {
    let session = state.office.session(cookie_header(req.headers()).as_deref());
    Json(json!({ "page": req.uri().path(), "session": session })).into_response()
}
