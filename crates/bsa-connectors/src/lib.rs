use bsa_api::{BsaError, SecretStore};

mod memory;
mod postgrest;

pub use memory::MemoryStore;
pub use postgrest::PostgrestStore;

/// Secrets read from process environment variables named by `secret_ref`.
pub struct EnvSecretStore;

impl SecretStore for EnvSecretStore {
    fn get(&self, secret_ref: &str) -> Result<String, BsaError> {
        std::env::var(secret_ref)
            .ok()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| BsaError::NotFound(format!("missing secret env var {secret_ref}")))
    }
}
