//! bsa-auth
//!
//! Self-issued, stateless session cookies for the back-office API.
//!
//! - **`TokenCodec`** signs a small JSON payload as `<base64url(json)>.<base64url(hmac)>`
//! - **`SessionMinter`** turns a verified role into a token plus `Set-Cookie` value
//! - **`SessionVerifier`** recovers an unexpired payload from a `Cookie` header
//! - **`AccessGate`** applies a per-endpoint role policy on top of verification
//!
//! Nothing is stored server side. Rotating the secret invalidates every
//! outstanding session at once.
//!
//! ## Quick start
//! ```
//! use std::sync::Arc;
//! use bsa_api::Role;
//! use bsa_auth::{
//!     AccessGate, READ_ROLES, SessionMinter, SessionSecret, SessionSettings, SessionVerifier,
//!     SystemClock, TokenCodec,
//! };
//!
//! # fn main() -> Result<(), bsa_auth::Error> {
//! let codec = TokenCodec::new(&SessionSecret::new("change-me-change-me-change-me-32")?)?;
//! let clock = Arc::new(SystemClock);
//! let settings = SessionSettings { default_ttl_seconds: 3600, remember_ttl_seconds: 86_400, secure: true };
//!
//! let minter = SessionMinter::new(codec.clone(), clock.clone(), settings);
//! let gate = AccessGate::new(SessionVerifier::new(codec, clock));
//!
//! let minted = minter.mint(Role::Manager, 3600)?;
//! let header = format!("bsa_session={}", minted.token);
//! assert!(gate.require(Some(&header), READ_ROLES).is_ok());
//! # Ok(()) }
//! ```

#![forbid(unsafe_code)]

mod clock;
mod codec;
mod cookie;
mod error;
mod gate;
mod secret;
mod session;

pub use clock::{Clock, FixedClock, SystemClock};
pub use codec::TokenCodec;
pub use cookie::{CookieOptions, SameSite, build_clear_cookie, build_set_cookie, find_cookie};
pub use error::{Error, Result};
pub use gate::{AccessGate, OWNER_ONLY, READ_ROLES, Rejection, WRITE_ROLES};
pub use secret::SessionSecret;
pub use session::{
    MintedSession, SESSION_COOKIE, SessionMinter, SessionPayload, SessionSettings,
    SessionVerifier, TtlTier,
};
