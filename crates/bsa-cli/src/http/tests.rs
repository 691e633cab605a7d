use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE};
use axum::http::{Request, StatusCode};
use bsa_api::{
    BsaError, BusinessStore, Client, NewClient, NewPayout, NewService, Payout, Role, Sale,
    SaleFilter, SaleInsert, Service, StaffMember,
};
use bsa_auth::{FixedClock, SessionSecret, SessionSettings};
use bsa_connectors::MemoryStore;
use bsa_runtime::{BackOffice, Stores};
use serde_json::{Value, json};
use tower::ServiceExt;

use super::{AppState, router};

/// 2025-03-15T12:00:00Z
const NOW_MS: i64 = 1_742_040_000_000;

struct Harness {
    app: axum::Router,
    store: Arc<MemoryStore>,
    clock: Arc<FixedClock>,
}

fn harness_with(stores: impl FnOnce(Arc<MemoryStore>) -> Stores) -> Harness {
    let store = Arc::new(MemoryStore::new());
    for (role, code) in [
        (Role::Owner, "owner-code"),
        (Role::Manager, "manager-code"),
        (Role::Investor, "investor-code"),
        (Role::Staff, "staff-code"),
    ] {
        store
            .seed_access_code(role, bcrypt::hash(code, 4).unwrap(), true)
            .unwrap();
    }
    let clock = Arc::new(FixedClock::new(NOW_MS));
    let settings = SessionSettings {
        default_ttl_seconds: 3600,
        remember_ttl_seconds: 86_400,
        secure: false,
    };
    let secret = SessionSecret::new("http-test-secret-http-test-secret").unwrap();
    let office = BackOffice::new(stores(store.clone()), &secret, clock.clone(), settings)
        .unwrap()
        .with_bcrypt_cost(4);
    Harness {
        app: router(AppState::new(office)),
        store,
        clock,
    }
}

fn harness() -> Harness {
    harness_with(Stores::shared)
}

async fn send(app: &axum::Router, req: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let headers = resp.headers().clone();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, headers, body)
}

fn json_req(method: &str, uri: &str, cookie: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json");
    if let Some(c) = cookie {
        builder = builder.header(COOKIE, c);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(c) = cookie {
        builder = builder.header(COOKIE, c);
    }
    builder.body(Body::empty()).unwrap()
}

fn set_cookie(headers: &axum::http::HeaderMap) -> String {
    headers
        .get(SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string()
}

/// `bsa_session=<token>` for a passcode, as a browser would send it back.
async fn login(app: &axum::Router, passcode: &str) -> String {
    let (status, headers, _) = send(
        app,
        json_req("POST", "/api/unlock", None, &json!({ "passcode": passcode })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let cookie = set_cookie(&headers);
    cookie.split(';').next().unwrap().to_string()
}

#[tokio::test]
async fn unlock_sets_session_cookie() {
    let h = harness();
    let (status, headers, body) = send(
        &h.app,
        json_req("POST", "/api/unlock", None, &json!({ "passcode": "manager-code" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": true, "role": "manager" }));

    let cookie = set_cookie(&headers);
    assert!(cookie.starts_with("bsa_session="));
    assert!(cookie.contains("; Path=/; HttpOnly; SameSite=Strict"));
    assert!(cookie.ends_with("Max-Age=3600"));
    assert!(!cookie.contains("Secure"));
}

#[tokio::test]
async fn remember_me_extends_max_age() {
    let h = harness();
    let (_, headers, _) = send(
        &h.app,
        json_req(
            "POST",
            "/api/unlock",
            None,
            &json!({ "passcode": "owner-code", "rememberMe": true }),
        ),
    )
    .await;
    assert!(set_cookie(&headers).ends_with("Max-Age=86400"));
}

#[tokio::test]
async fn unlock_rejects_bad_and_missing_passcodes() {
    let h = harness();
    let (status, headers, body) = send(
        &h.app,
        json_req("POST", "/api/unlock", None, &json!({ "passcode": "guess" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "error": "Invalid passcode" }));
    assert!(headers.get(SET_COOKIE).is_none());

    for missing in [json!({}), json!({ "passcode": 123 }), json!({ "passcode": null })] {
        let (status, _, body) = send(&h.app, json_req("POST", "/api/unlock", None, &missing)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{missing}");
        assert_eq!(body, json!({ "error": "Missing passcode" }));
    }
}

#[tokio::test]
async fn logout_clears_cookie() {
    let h = harness();
    let (status, headers, body) = send(&h.app, json_req("POST", "/api/logout", None, &json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": true }));
    assert_eq!(
        set_cookie(&headers),
        "bsa_session=; Path=/; HttpOnly; SameSite=Strict; Max-Age=0"
    );
}

#[tokio::test]
async fn session_introspection() {
    let h = harness();
    let (_, _, body) = send(&h.app, get("/api/session", None)).await;
    assert_eq!(body, json!({ "session": null }));

    let cookie = login(&h.app, "investor-code").await;
    let (_, _, body) = send(&h.app, get("/api/session", Some(&cookie))).await;
    assert_eq!(body["session"]["role"], "investor");
    assert_eq!(body["session"]["issuedAt"], NOW_MS);
    assert_eq!(body["session"]["expiresAt"], NOW_MS + 3_600_000);
}

#[tokio::test]
async fn protected_route_without_cookie_is_401() {
    let h = harness();
    let (status, _, body) = send(&h.app, get("/api/sales", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "error": "Not authenticated" }));
}

#[tokio::test]
async fn tampered_or_expired_cookie_is_401() {
    let h = harness();
    let cookie = login(&h.app, "owner-code").await;

    let mut tampered = cookie.clone();
    tampered.push('A');
    let (status, _, _) = send(&h.app, get("/api/sales", Some(&tampered))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _, _) = send(&h.app, get("/api/sales", Some(&cookie))).await;
    assert_eq!(status, StatusCode::OK);

    h.clock.advance_ms(3_600_001);
    let (status, _, body) = send(&h.app, get("/api/sales", Some(&cookie))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "error": "Not authenticated" }));
}

#[tokio::test]
async fn investor_cannot_write_and_body_is_not_read() {
    let h = harness();
    let cookie = login(&h.app, "investor-code").await;
    let req = Request::builder()
        .method("POST")
        .uri("/api/sales")
        .header(CONTENT_TYPE, "application/json")
        .header(COOKIE, &cookie)
        .body(Body::from("{not json"))
        .unwrap();
    let (status, _, body) = send(&h.app, req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, json!({ "error": "Forbidden" }));
    assert!(h.store.list_sales(SaleFilter::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn staff_sessions_are_forbidden_everywhere() {
    let h = harness();
    let cookie = login(&h.app, "staff-code").await;
    for uri in ["/api/clients", "/api/reports/overview", "/api/admin/profiles"] {
        let (status, _, _) = send(&h.app, get(uri, Some(&cookie))).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{uri}");
    }
}

#[tokio::test]
async fn admin_routes_are_owner_only_and_hide_hashes() {
    let h = harness();
    let manager = login(&h.app, "manager-code").await;
    let (status, _, _) = send(&h.app, get("/api/admin/access-codes", Some(&manager))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let owner = login(&h.app, "owner-code").await;
    let (status, _, body) = send(&h.app, get("/api/admin/access-codes", Some(&owner))).await;
    assert_eq!(status, StatusCode::OK);
    let rows = body["data"].as_array().unwrap();
    assert_eq!(rows.len(), 4);
    assert!(rows.iter().all(|r| r.get("hashed_code").is_none()));
}

#[tokio::test]
async fn owner_rotates_access_codes() {
    let h = harness();
    let owner = login(&h.app, "owner-code").await;
    let (status, _, body) = send(
        &h.app,
        json_req(
            "POST",
            "/api/admin/access-codes",
            Some(&owner),
            &json!({ "role": "manager", "passcode": "new-manager-code" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let id = body["data"]["id"].as_str().unwrap().to_string();
    login(&h.app, "new-manager-code").await;

    let (status, _, body) = send(
        &h.app,
        json_req(
            "PATCH",
            &format!("/api/admin/access-codes/{id}"),
            Some(&owner),
            &json!({ "active": false }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["active"], false);

    let (status, _, _) = send(
        &h.app,
        json_req("POST", "/api/unlock", None, &json!({ "passcode": "new-manager-code" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _, body) = send(
        &h.app,
        json_req("DELETE", &format!("/api/admin/access-codes/{id}"), Some(&owner), &json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": true }));
}

#[tokio::test]
async fn manager_records_a_sale_with_derived_fields() {
    let h = harness();
    let cookie = login(&h.app, "manager-code").await;
    let (status, _, body) = send(
        &h.app,
        json_req(
            "POST",
            "/api/sales",
            Some(&cookie),
            &json!({
                "service_id": "svc-1",
                "service_date": "2025-03-14",
                "price": 200,
                "amount_paid": 150,
                "staff_commission_pct": 40,
                "transport_cost": 10,
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);

    let (_, _, body) = send(&h.app, get("/api/sales", Some(&cookie))).await;
    let sale = &body["data"][0];
    assert_eq!(sale["staff_commission_amount"], 80.0);
    assert_eq!(sale["profit"], 60.0);
    assert_eq!(sale["balance"], 50.0);
    assert_eq!(sale["location_type"], "In-Shop");

    let (_, _, report) = send(&h.app, get("/api/reports/overview", Some(&cookie))).await;
    assert_eq!(report["servicesCompleted"], 1);
    assert_eq!(report["month"]["start"], "2025-03-01");
}

#[tokio::test]
async fn sale_validation_errors_are_400() {
    let h = harness();
    let cookie = login(&h.app, "owner-code").await;
    let (status, _, body) = send(
        &h.app,
        json_req("POST", "/api/sales", Some(&cookie), &json!({ "service_id": "svc" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Missing required fields" }));

    let (status, _, body) =
        send(&h.app, json_req("DELETE", "/api/sales", Some(&cookie), &json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Missing sale ID" }));

    let (status, _, body) = send(
        &h.app,
        json_req("POST", "/api/sales", Some(&cookie), &json!({ "price": "a lot" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Invalid request body" }));
}

#[tokio::test]
async fn magic_link_never_reveals_accounts() {
    let h = harness();
    for email in ["nobody@salon.test", "Someone@Salon.test"] {
        let (status, _, body) = send(
            &h.app,
            json_req("POST", "/api/auth/send-magic-link", None, &json!({ "email": email })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "ok": true }));
    }
    assert!(h.store.sent_magic_links().is_empty());

    let (status, _, body) = send(
        &h.app,
        json_req("POST", "/api/auth/send-magic-link", None, &json!({ "email": "  " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Missing email" }));
}

#[tokio::test]
async fn dashboard_pages_redirect_without_session() {
    let h = harness();
    let resp = h
        .app
        .clone()
        .oneshot(get("/dashboard/reports", None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(resp.headers().get(LOCATION).unwrap(), "/unlock");

    let resp = h
        .app
        .clone()
        .oneshot(get("/dashboard", Some("bsa_session=forged.value")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);

    let cookie = login(&h.app, "investor-code").await;
    let (status, _, body) = send(&h.app, get("/dashboard/reports", Some(&cookie))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["session"]["role"], "investor");
}

#[tokio::test]
async fn health_is_public() {
    let h = harness();
    let (status, _, body) = send(&h.app, get("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

struct DownStore;

fn down<T>() -> Result<T, BsaError> {
    Err(BsaError::Connection("select sales failed (503): upstream".to_string()))
}

#[async_trait]
impl BusinessStore for DownStore {
    async fn list_clients(&self) -> Result<Vec<Client>, BsaError> {
        down()
    }
    async fn create_client(&self, _: NewClient) -> Result<Client, BsaError> {
        down()
    }
    async fn list_services(&self) -> Result<Vec<Service>, BsaError> {
        down()
    }
    async fn create_service(&self, _: NewService) -> Result<Service, BsaError> {
        down()
    }
    async fn list_staff(&self) -> Result<Vec<StaffMember>, BsaError> {
        down()
    }
    async fn list_sales(&self, _: SaleFilter) -> Result<Vec<Sale>, BsaError> {
        down()
    }
    async fn create_sale(&self, _: SaleInsert) -> Result<String, BsaError> {
        down()
    }
    async fn delete_sale(&self, _: &str) -> Result<(), BsaError> {
        down()
    }
    async fn list_payouts(&self, _: usize) -> Result<Vec<Payout>, BsaError> {
        down()
    }
    async fn create_payout(&self, _: NewPayout) -> Result<Payout, BsaError> {
        down()
    }
}

#[tokio::test]
async fn store_failures_are_opaque_500s() {
    let h = harness_with(|store| Stores {
        business: Arc::new(DownStore),
        ..Stores::shared(store)
    });
    let cookie = login(&h.app, "owner-code").await;
    let (status, _, body) = send(&h.app, get("/api/reports/overview", Some(&cookie))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Server error" }));
}
