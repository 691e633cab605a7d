//! Passcode unlock, owner administration of access codes and profiles, magic links.

use bsa_api::{
    AccessCodeSummary, AccessCodeUpdate, BsaError, NewAccessCode, NewProfile, Profile,
    ProfileUpdate, Role,
};
use bsa_auth::{MintedSession, SessionPayload, TtlTier};
use serde::Deserialize;

use crate::BackOffice;

/// A successful unlock: the matched role and its freshly minted session.
#[derive(Debug, Clone)]
pub struct Unlocked {
    pub role: Role,
    pub session: MintedSession,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccessCodeInput {
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub passcode: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileInput {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub active: Option<bool>,
}

/// bcrypt hash of `passcode` at `cost`, computed off the async runtime.
pub async fn hash_passcode(passcode: &str, cost: u32) -> Result<String, BsaError> {
    let passcode = passcode.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(passcode, cost))
        .await
        .map_err(|e| BsaError::Internal(format!("hash task failed: {e}")))?
        .map_err(|e| BsaError::Internal(format!("bcrypt hash failed: {e}")))
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl BackOffice {
    /// Exchange a passcode for a session.
    ///
    /// Tries every active access code in store order and takes the first
    /// match. `Ok(None)` means no code matched. Rows with an unknown role or
    /// a hash bcrypt cannot read are skipped.
    pub async fn unlock(
        &self,
        passcode: &str,
        remember_me: Option<bool>,
    ) -> Result<Option<Unlocked>, BsaError> {
        if passcode.is_empty() {
            return Err(BsaError::Validation("Missing passcode".to_string()));
        }

        let codes = self.stores.access_codes.active_access_codes().await?;
        let passcode = passcode.to_string();
        let matched = tokio::task::spawn_blocking(move || {
            for code in codes {
                match bcrypt::verify(&passcode, &code.hashed_code) {
                    Ok(true) => return Some((code.id, code.role)),
                    Ok(false) => {}
                    Err(e) => tracing::warn!(code_id = %code.id, error = %e, "bcrypt compare failed"),
                }
            }
            None
        })
        .await
        .map_err(|e| BsaError::Internal(format!("unlock task failed: {e}")))?;

        let Some((code_id, role_name)) = matched else {
            tracing::info!("unlock rejected: no active code matched");
            return Ok(None);
        };
        let role: Role = match role_name.parse() {
            Ok(role) => role,
            Err(_) => {
                tracing::warn!(%code_id, role = %role_name, "access code has an unknown role");
                return Ok(None);
            }
        };

        let session = self
            .minter
            .mint_tier(role, TtlTier::from_remember_me(remember_me))
            .map_err(|e| BsaError::Internal(e.to_string()))?;
        tracing::info!(%role, max_age = session.max_age_seconds, "unlocked");
        Ok(Some(Unlocked { role, session }))
    }

    /// `Set-Cookie` value for logout.
    pub fn logout_cookie(&self) -> Result<String, BsaError> {
        self.minter
            .clear()
            .map_err(|e| BsaError::Internal(e.to_string()))
    }

    /// Current session for UI hints. Never an authorization decision.
    pub fn session(&self, cookie_header: Option<&str>) -> Option<SessionPayload> {
        self.gate.verifier().verify(cookie_header)
    }

    /// Send a sign-in link to an active profile.
    ///
    /// Succeeds for every well-formed email, whether or not a link went out,
    /// so the response cannot be used to discover accounts.
    pub async fn send_magic_link(&self, email: &str) -> Result<(), BsaError> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(BsaError::Validation("Missing email".to_string()));
        }

        let profile = match self.stores.profiles.find_profile_by_email(&email).await {
            Ok(profile) => profile,
            Err(e) => {
                tracing::error!(error = %e, "profile lookup for magic link failed");
                return Ok(());
            }
        };
        if !profile.is_some_and(|p| p.active) {
            tracing::debug!("magic link skipped: no active profile");
            return Ok(());
        }

        let redirect = format!("{}/auth/callback", self.app_url.as_deref().unwrap_or(""));
        if let Err(e) = self.stores.magic_links.send_magic_link(&email, &redirect).await {
            tracing::error!(error = %e, "sending magic link failed");
        }
        Ok(())
    }

    pub async fn list_access_codes(&self) -> Result<Vec<AccessCodeSummary>, BsaError> {
        self.stores.access_codes.list_access_codes().await
    }

    /// Hash and store a new passcode. `active` defaults to true.
    pub async fn create_access_code(
        &self,
        input: AccessCodeInput,
    ) -> Result<AccessCodeSummary, BsaError> {
        let (Some(role), Some(passcode)) = (input.role, input.passcode.filter(|p| !p.is_empty()))
        else {
            return Err(BsaError::Validation("Missing fields".to_string()));
        };
        let hashed_code = hash_passcode(&passcode, self.bcrypt_cost).await?;
        let created = self
            .stores
            .access_codes
            .create_access_code(NewAccessCode {
                role,
                hashed_code,
                active: input.active.unwrap_or(true),
            })
            .await?;
        tracing::info!(code_id = %created.id, %role, "access code created");
        Ok(created)
    }

    pub async fn update_access_code(
        &self,
        id: &str,
        update: AccessCodeUpdate,
    ) -> Result<AccessCodeSummary, BsaError> {
        if update.is_empty() {
            return Err(BsaError::Validation("No fields to update".to_string()));
        }
        self.stores.access_codes.update_access_code(id, update).await
    }

    pub async fn delete_access_code(&self, id: &str) -> Result<(), BsaError> {
        self.stores.access_codes.delete_access_code(id).await?;
        tracing::info!(code_id = %id, "access code deleted");
        Ok(())
    }

    pub async fn list_profiles(&self) -> Result<Vec<Profile>, BsaError> {
        self.stores.profiles.list_profiles().await
    }

    /// Email is trimmed and lowercased; role defaults to staff, active to true.
    pub async fn create_profile(&self, input: ProfileInput) -> Result<Profile, BsaError> {
        let email = normalize_email(input.email.as_deref().unwrap_or_default());
        if email.is_empty() {
            return Err(BsaError::Validation("Email required".to_string()));
        }
        self.stores
            .profiles
            .create_profile(NewProfile {
                email,
                role: input.role.unwrap_or(Role::Staff),
                active: input.active.unwrap_or(true),
            })
            .await
    }

    pub async fn update_profile(
        &self,
        id: &str,
        mut update: ProfileUpdate,
    ) -> Result<Profile, BsaError> {
        update.email = update.email.as_deref().map(normalize_email);
        if update.is_empty() {
            return Err(BsaError::Validation("No fields to update".to_string()));
        }
        self.stores.profiles.update_profile(id, update).await
    }

    pub async fn delete_profile(&self, id: &str) -> Result<(), BsaError> {
        self.stores.profiles.delete_profile(id).await
    }
}
