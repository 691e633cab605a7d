//! Request extractors: role-gated sessions and JSON bodies with `{error}` rejections.

use std::marker::PhantomData;

use axum::extract::{FromRequest, FromRequestParts};
use axum::http::HeaderMap;
use axum::http::header::COOKIE;
use axum::http::request::Parts;
use bsa_api::Role;
use bsa_auth::{OWNER_ONLY, READ_ROLES, SessionPayload, WRITE_ROLES};

use super::AppState;
use super::error::ApiError;

/// Which roles an endpoint admits.
pub trait Policy: Send + Sync + 'static {
    const ROLES: &'static [Role];
}

/// Owner, manager, investor.
pub struct Read;
/// Owner, manager.
pub struct Write;
pub struct OwnerOnly;

impl Policy for Read {
    const ROLES: &'static [Role] = READ_ROLES;
}

impl Policy for Write {
    const ROLES: &'static [Role] = WRITE_ROLES;
}

impl Policy for OwnerOnly {
    const ROLES: &'static [Role] = OWNER_ONLY;
}

/// A verified session whose role satisfies `P`.
///
/// Put it before any body extractor so unauthorized requests are refused
/// before the body is read.
pub struct Authorized<P: Policy> {
    pub session: SessionPayload,
    _policy: PhantomData<P>,
}

impl<P: Policy> FromRequestParts<AppState> for Authorized<P> {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let header = cookie_header(&parts.headers);
        let session = state.office.gate().require(header.as_deref(), P::ROLES)?;
        Ok(Self {
            session,
            _policy: PhantomData,
        })
    }
}

/// All `Cookie` headers joined into one, as HTTP/2 clients may split them.
pub fn cookie_header(headers: &HeaderMap) -> Option<String> {
    let parts: Vec<&str> = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("; "))
    }
}

/// `axum::Json` whose rejection renders as a 400 `{error}` body.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);
