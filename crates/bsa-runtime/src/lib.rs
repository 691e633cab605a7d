use std::sync::Arc;
use std::time::Duration;

use bsa_api::{
    AccessCodeStore, BsaError, BusinessStore, MagicLinkSender, ProfileStore, SecretStore,
};
use bsa_auth::{
    AccessGate, Clock, SessionMinter, SessionSecret, SessionSettings, SessionVerifier,
    SystemClock, TokenCodec,
};
use bsa_connectors::{MemoryStore, PostgrestStore};
use bsa_core::{AppConfig, StoreBackend, StoreConfig};
use chrono::{DateTime, NaiveDate};

mod access;
mod business;
mod reports;

pub use access::{AccessCodeInput, ProfileInput, Unlocked, hash_passcode};
pub use business::{
    ClientInput, ClientSummary, PayoutInput, SaleInput, ServiceInput, StaffSummary, Visit,
};
pub use reports::{
    KeyMetrics, LocationValue, MonthWindow, Overview, ServiceRevenue, StaffRevenue,
};

/// bcrypt cost for newly created access codes.
pub const DEFAULT_BCRYPT_COST: u32 = 12;

/// Datastore handles the service works against.
#[derive(Clone)]
pub struct Stores {
    pub access_codes: Arc<dyn AccessCodeStore>,
    pub profiles: Arc<dyn ProfileStore>,
    pub business: Arc<dyn BusinessStore>,
    pub magic_links: Arc<dyn MagicLinkSender>,
}

impl Stores {
    /// Every seam served by one backend.
    pub fn shared<S>(store: Arc<S>) -> Self
    where
        S: AccessCodeStore + ProfileStore + BusinessStore + MagicLinkSender + 'static,
    {
        Self {
            access_codes: store.clone(),
            profiles: store.clone(),
            business: store.clone(),
            magic_links: store,
        }
    }

    pub fn from_config(cfg: &StoreConfig, secrets: &dyn SecretStore) -> Result<Self, BsaError> {
        match cfg.backend {
            StoreBackend::Memory => {
                tracing::warn!("using in-memory store; data is lost on restart");
                Ok(Self::shared(Arc::new(MemoryStore::new())))
            }
            StoreBackend::Supabase => {
                let url = cfg.url.as_deref().ok_or_else(|| {
                    BsaError::Validation("supabase store requires a url".to_string())
                })?;
                let key = secrets.get(&cfg.service_key_ref)?;
                let store = PostgrestStore::new(
                    url,
                    key,
                    Duration::from_millis(cfg.request_timeout_ms),
                )?;
                Ok(Self::shared(Arc::new(store)))
            }
        }
    }
}

/// The back-office service: session issuance plus every business operation.
pub struct BackOffice {
    stores: Stores,
    minter: SessionMinter,
    gate: AccessGate,
    clock: Arc<dyn Clock>,
    bcrypt_cost: u32,
    app_url: Option<String>,
}

impl BackOffice {
    pub fn new(
        stores: Stores,
        secret: &SessionSecret,
        clock: Arc<dyn Clock>,
        settings: SessionSettings,
    ) -> Result<Self, BsaError> {
        let codec = TokenCodec::new(secret).map_err(auth_config_error)?;
        Ok(Self {
            stores,
            minter: SessionMinter::new(codec.clone(), clock.clone(), settings),
            gate: AccessGate::new(SessionVerifier::new(codec, clock.clone())),
            clock,
            bcrypt_cost: DEFAULT_BCRYPT_COST,
            app_url: None,
        })
    }

    /// Build from loaded configuration: reads the signing secret and opens the configured store.
    pub fn from_config(config: &AppConfig, secrets: &dyn SecretStore) -> Result<Self, BsaError> {
        let secret = SessionSecret::from_store(secrets, &config.session.secret_ref)
            .map_err(auth_config_error)?;
        let stores = Stores::from_config(&config.store, secrets)?;
        Self::from_config_with_stores(config, &secret, stores)
    }

    /// Like [`BackOffice::from_config`] but with stores built by the caller.
    pub fn from_config_with_stores(
        config: &AppConfig,
        secret: &SessionSecret,
        stores: Stores,
    ) -> Result<Self, BsaError> {
        let settings = SessionSettings {
            default_ttl_seconds: config.session.ttl_seconds,
            remember_ttl_seconds: config.session.remember_ttl_seconds,
            secure: config.session.production,
        };
        Ok(Self::new(stores, secret, Arc::new(SystemClock), settings)?
            .with_app_url(config.app_url.clone()))
    }

    #[must_use]
    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }

    #[must_use]
    pub fn with_app_url(mut self, app_url: Option<String>) -> Self {
        self.app_url = app_url;
        self
    }

    pub fn gate(&self) -> &AccessGate {
        &self.gate
    }

    pub fn session_settings(&self) -> &SessionSettings {
        self.minter.settings()
    }

    /// Current UTC calendar date according to the injected clock.
    pub fn today(&self) -> NaiveDate {
        DateTime::from_timestamp_millis(self.clock.now_ms())
            .map(|t| t.date_naive())
            .unwrap_or_default()
    }
}

fn auth_config_error(e: bsa_auth::Error) -> BsaError {
    BsaError::Validation(e.to_string())
}
