//! Per-endpoint role policy over session verification.

use bsa_api::Role;

use crate::{SessionPayload, SessionVerifier};

/// Reporting and listing endpoints.
pub const READ_ROLES: &[Role] = &[Role::Owner, Role::Manager, Role::Investor];

/// Endpoints that create, change or delete business data.
pub const WRITE_ROLES: &[Role] = &[Role::Owner, Role::Manager];

/// Identity and access-code administration.
pub const OWNER_ONLY: &[Role] = &[Role::Owner];

/// Why a request may not proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    /// No cookie, or a cookie that is malformed, forged or expired.
    #[error("Not authenticated")]
    Unauthenticated,
    /// Valid session whose role is outside the endpoint's policy.
    #[error("Forbidden")]
    Forbidden,
}

impl Rejection {
    pub fn status_code(self) -> u16 {
        match self {
            Rejection::Unauthenticated => 401,
            Rejection::Forbidden => 403,
        }
    }
}

#[derive(Clone)]
pub struct AccessGate {
    verifier: SessionVerifier,
}

impl AccessGate {
    pub fn new(verifier: SessionVerifier) -> Self {
        Self { verifier }
    }

    pub fn verifier(&self) -> &SessionVerifier {
        &self.verifier
    }

    /// Decide whether the bearer of `cookie_header` may use an endpoint open to `allowed`.
    ///
    /// Pure: no side effects beyond reading the clock.
    pub fn require(
        &self,
        cookie_header: Option<&str>,
        allowed: &[Role],
    ) -> Result<SessionPayload, Rejection> {
        let payload = self
            .verifier
            .verify(cookie_header)
            .ok_or(Rejection::Unauthenticated)?;
        if !allowed.contains(&payload.role) {
            tracing::debug!(role = %payload.role, "role not permitted");
            return Err(Rejection::Forbidden);
        }
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FixedClock, SessionMinter, SessionSecret, SessionSettings, TokenCodec};
    use std::sync::Arc;

    fn setup() -> (SessionMinter, AccessGate) {
        let codec = TokenCodec::new(&SessionSecret::new("gate-secret").unwrap()).unwrap();
        let clock = Arc::new(FixedClock::new(1_000_000));
        let settings = SessionSettings {
            default_ttl_seconds: 600,
            remember_ttl_seconds: 6000,
            secure: false,
        };
        let minter = SessionMinter::new(codec.clone(), clock.clone(), settings);
        let gate = AccessGate::new(SessionVerifier::new(codec, clock));
        (minter, gate)
    }

    fn header_for(minter: &SessionMinter, role: Role) -> String {
        format!("bsa_session={}", minter.mint(role, 600).unwrap().token)
    }

    #[test]
    fn owner_only_forbids_manager() {
        let (minter, gate) = setup();
        let manager = header_for(&minter, Role::Manager);
        assert_eq!(
            gate.require(Some(&manager), OWNER_ONLY),
            Err(Rejection::Forbidden)
        );
        let owner = header_for(&minter, Role::Owner);
        assert_eq!(gate.require(Some(&owner), OWNER_ONLY).unwrap().role, Role::Owner);
    }

    #[test]
    fn no_or_bad_cookie_is_unauthenticated() {
        let (_, gate) = setup();
        assert_eq!(gate.require(None, READ_ROLES), Err(Rejection::Unauthenticated));
        assert_eq!(
            gate.require(Some("bsa_session=abc.def"), READ_ROLES),
            Err(Rejection::Unauthenticated)
        );
    }

    #[test]
    fn staff_is_outside_every_builtin_policy() {
        let (minter, gate) = setup();
        let staff = header_for(&minter, Role::Staff);
        for policy in [READ_ROLES, WRITE_ROLES, OWNER_ONLY] {
            assert_eq!(gate.require(Some(&staff), policy), Err(Rejection::Forbidden));
        }
    }

    #[test]
    fn investor_reads_but_does_not_write() {
        let (minter, gate) = setup();
        let investor = header_for(&minter, Role::Investor);
        assert!(gate.require(Some(&investor), READ_ROLES).is_ok());
        assert_eq!(
            gate.require(Some(&investor), WRITE_ROLES),
            Err(Rejection::Forbidden)
        );
    }

    #[test]
    fn status_codes() {
        assert_eq!(Rejection::Unauthenticated.status_code(), 401);
        assert_eq!(Rejection::Forbidden.status_code(), 403);
    }
}
