//! Signing secret.

use std::fmt;
use std::sync::Arc;

use bsa_api::SecretStore;

use crate::{Error, Result};

/// Process-wide HMAC key. Read once at startup and handed to the codec.
#[derive(Clone)]
pub struct SessionSecret {
    bytes: Arc<[u8]>,
}

impl SessionSecret {
    /// Secrets shorter than this are accepted but logged.
    pub const RECOMMENDED_LEN: usize = 32;

    /// Wrap raw key material. Empty input is rejected.
    pub fn new(bytes: impl AsRef<[u8]>) -> Result<Self> {
        let bytes = bytes.as_ref();
        if bytes.is_empty() {
            return Err(Error::Config("session secret is empty".to_string()));
        }
        if bytes.len() < Self::RECOMMENDED_LEN {
            tracing::warn!(
                len = bytes.len(),
                recommended = Self::RECOMMENDED_LEN,
                "session secret is shorter than recommended"
            );
        }
        Ok(Self {
            bytes: Arc::from(bytes),
        })
    }

    /// Resolve `secret_ref` through `store`. A missing entry is fatal.
    pub fn from_store(store: &dyn SecretStore, secret_ref: &str) -> Result<Self> {
        let raw = store
            .get(secret_ref)
            .map_err(|e| Error::Config(format!("missing session secret {secret_ref}: {e}")))?;
        Self::new(raw.as_bytes())
    }

    pub(crate) fn expose(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for SessionSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionSecret")
            .field("len", &self.bytes.len())
            .finish_non_exhaustive()
    }
}
