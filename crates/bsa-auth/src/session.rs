//! Session minting and verification.

use std::sync::Arc;

use bsa_api::Role;
use serde::{Deserialize, Serialize};

use crate::cookie::{CookieOptions, build_clear_cookie, build_set_cookie, find_cookie};
use crate::{Clock, Error, Result, TokenCodec};

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "bsa_session";

/// What a session token authenticates: a role and its validity window.
///
/// There is no user identity here; sessions are role capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPayload {
    pub role: Role,
    /// Milliseconds since the Unix epoch.
    pub issued_at: i64,
    /// Milliseconds since the Unix epoch; always after `issued_at`.
    pub expires_at: i64,
}

impl SessionPayload {
    /// Valid strictly before `expires_at`.
    pub fn is_live_at(&self, now_ms: i64) -> bool {
        self.expires_at > now_ms
    }
}

/// Which TTL an unlock asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtlTier {
    Default,
    Remember,
}

impl TtlTier {
    /// Only an explicit `true` selects the long tier.
    pub fn from_remember_me(remember_me: Option<bool>) -> Self {
        if remember_me == Some(true) {
            TtlTier::Remember
        } else {
            TtlTier::Default
        }
    }
}

/// Cookie lifetime and transport settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    pub default_ttl_seconds: u64,
    pub remember_ttl_seconds: u64,
    /// Adds the `Secure` attribute.
    pub secure: bool,
}

impl SessionSettings {
    pub fn ttl_for(&self, tier: TtlTier) -> u64 {
        match tier {
            TtlTier::Default => self.default_ttl_seconds,
            TtlTier::Remember => self.remember_ttl_seconds,
        }
    }
}

/// Result of a successful mint.
#[derive(Debug, Clone)]
pub struct MintedSession {
    pub token: String,
    pub payload: SessionPayload,
    /// Ready-to-send `Set-Cookie` header value.
    pub set_cookie: String,
    pub max_age_seconds: u64,
}

/// Turns a verified role into a signed session cookie.
#[derive(Clone)]
pub struct SessionMinter {
    codec: TokenCodec,
    clock: Arc<dyn Clock>,
    settings: SessionSettings,
}

impl SessionMinter {
    pub fn new(codec: TokenCodec, clock: Arc<dyn Clock>, settings: SessionSettings) -> Self {
        Self {
            codec,
            clock,
            settings,
        }
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Mint a session for `role` with the TTL of `tier`.
    pub fn mint_tier(&self, role: Role, tier: TtlTier) -> Result<MintedSession> {
        self.mint(role, self.settings.ttl_for(tier))
    }

    /// Mint a session for `role` valid for `ttl_seconds` from now.
    pub fn mint(&self, role: Role, ttl_seconds: u64) -> Result<MintedSession> {
        let ttl_ms = ttl_ms(ttl_seconds)?;
        let issued_at = self.clock.now_ms();
        let expires_at = issued_at
            .checked_add(ttl_ms)
            .ok_or(Error::InvalidTtl(ttl_seconds))?;

        let payload = SessionPayload {
            role,
            issued_at,
            expires_at,
        };
        let token = self.codec.encode(&payload)?;
        let set_cookie = build_set_cookie(&token, &self.cookie_options(Some(ttl_seconds)))?;

        tracing::debug!(%role, ttl_seconds, "session minted");
        Ok(MintedSession {
            token,
            payload,
            set_cookie,
            max_age_seconds: ttl_seconds,
        })
    }

    /// `Set-Cookie` value that makes the browser drop the session.
    pub fn clear(&self) -> Result<String> {
        build_clear_cookie(&self.cookie_options(None))
    }

    fn cookie_options(&self, max_age_seconds: Option<u64>) -> CookieOptions {
        CookieOptions {
            secure: self.settings.secure,
            max_age_seconds,
            ..CookieOptions::default()
        }
    }
}

fn ttl_ms(ttl_seconds: u64) -> Result<i64> {
    if ttl_seconds == 0 {
        return Err(Error::InvalidTtl(ttl_seconds));
    }
    ttl_seconds
        .checked_mul(1000)
        .and_then(|ms| i64::try_from(ms).ok())
        .ok_or(Error::InvalidTtl(ttl_seconds))
}

/// Recovers a trustworthy payload from a request's cookies.
#[derive(Clone)]
pub struct SessionVerifier {
    codec: TokenCodec,
    clock: Arc<dyn Clock>,
}

impl SessionVerifier {
    pub fn new(codec: TokenCodec, clock: Arc<dyn Clock>) -> Self {
        Self { codec, clock }
    }

    /// Payload of the `bsa_session` cookie in `cookie_header`, if present, authentic and unexpired.
    pub fn verify(&self, cookie_header: Option<&str>) -> Option<SessionPayload> {
        let token = find_cookie(cookie_header?, SESSION_COOKIE)?;
        self.verify_token(token)
    }

    pub fn verify_token(&self, token: &str) -> Option<SessionPayload> {
        let payload: SessionPayload = self.codec.decode(token)?;
        if !payload.is_live_at(self.clock.now_ms()) {
            tracing::debug!(role = %payload.role, "session expired");
            return None;
        }
        Some(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FixedClock, SessionSecret};

    const T0: i64 = 1_700_000_000_000;

    fn setup(secure: bool) -> (SessionMinter, SessionVerifier, Arc<FixedClock>) {
        let codec = TokenCodec::new(&SessionSecret::new("test-secret-0123456789abcdef0123").unwrap())
            .unwrap();
        let clock = Arc::new(FixedClock::new(T0));
        let settings = SessionSettings {
            default_ttl_seconds: 3600,
            remember_ttl_seconds: 3600 * 24,
            secure,
        };
        (
            SessionMinter::new(codec.clone(), clock.clone(), settings),
            SessionVerifier::new(codec, clock.clone()),
            clock,
        )
    }

    fn cookie_header(minted: &MintedSession) -> String {
        format!("theme=dark; {SESSION_COOKIE}={}", minted.token)
    }

    #[test]
    fn mint_then_verify_immediately() {
        let (minter, verifier, _) = setup(false);
        let minted = minter.mint(Role::Owner, 3600).unwrap();
        assert_eq!(minted.max_age_seconds, 3600);
        assert!(minted.set_cookie.ends_with("Max-Age=3600"));

        let payload = verifier.verify(Some(&cookie_header(&minted))).unwrap();
        assert_eq!(
            payload,
            SessionPayload {
                role: Role::Owner,
                issued_at: T0,
                expires_at: T0 + 3_600_000,
            }
        );
    }

    #[test]
    fn expired_one_ms_after_deadline() {
        let (minter, verifier, clock) = setup(false);
        let minted = minter.mint(Role::Owner, 3600).unwrap();
        clock.set(T0 + 3_600_001);
        assert_eq!(verifier.verify(Some(&cookie_header(&minted))), None);
    }

    #[test]
    fn expired_exactly_at_deadline() {
        let (minter, verifier, clock) = setup(false);
        let minted = minter.mint(Role::Manager, 60).unwrap();
        clock.set(T0 + 59_999);
        assert!(verifier.verify_token(&minted.token).is_some());
        clock.set(T0 + 60_000);
        assert!(verifier.verify_token(&minted.token).is_none());
    }

    #[test]
    fn signed_but_stale_payload_is_rejected() {
        let (minter, verifier, _) = setup(false);
        let stale = SessionPayload {
            role: Role::Owner,
            issued_at: T0 - 10_000,
            expires_at: T0,
        };
        let token = minter.codec.encode(&stale).unwrap();
        assert_eq!(verifier.verify_token(&token), None);
    }

    #[test]
    fn remember_tier_uses_long_ttl() {
        let (minter, _, _) = setup(false);
        let minted = minter
            .mint_tier(Role::Manager, TtlTier::from_remember_me(Some(true)))
            .unwrap();
        assert_eq!(minted.max_age_seconds, 86_400);
        assert!(minted.set_cookie.contains("Max-Age=86400"));
        assert_eq!(minted.payload.expires_at - minted.payload.issued_at, 86_400_000);

        for flag in [None, Some(false)] {
            assert_eq!(TtlTier::from_remember_me(flag), TtlTier::Default);
        }
    }

    #[test]
    fn zero_ttl_is_refused() {
        let (minter, _, _) = setup(false);
        assert!(matches!(minter.mint(Role::Owner, 0), Err(Error::InvalidTtl(0))));
        assert!(matches!(
            minter.mint(Role::Owner, u64::MAX),
            Err(Error::InvalidTtl(_))
        ));
    }

    #[test]
    fn secure_attribute_follows_settings() {
        let (plain, _, _) = setup(false);
        let (prod, _, _) = setup(true);
        assert!(!plain.mint(Role::Owner, 10).unwrap().set_cookie.contains("Secure"));
        assert!(prod.mint(Role::Owner, 10).unwrap().set_cookie.contains("; Secure"));
        assert!(prod.clear().unwrap().contains("; Secure"));
    }

    #[test]
    fn clear_sets_max_age_zero() {
        let (minter, _, _) = setup(false);
        assert_eq!(
            minter.clear().unwrap(),
            "bsa_session=; Path=/; HttpOnly; SameSite=Strict; Max-Age=0"
        );
    }

    #[test]
    fn missing_or_foreign_cookie_is_no_session() {
        let (_, verifier, _) = setup(false);
        assert_eq!(verifier.verify(None), None);
        assert_eq!(verifier.verify(Some("theme=dark")), None);
        assert_eq!(verifier.verify(Some("bsa_session=garbage")), None);
    }

    #[test]
    fn payload_json_uses_camel_case() {
        let payload = SessionPayload {
            role: Role::Investor,
            issued_at: 1,
            expires_at: 2,
        };
        assert_eq!(
            serde_json::to_string(&payload).unwrap(),
            r#"{"role":"investor","issuedAt":1,"expiresAt":2}"#
        );
    }
}
