use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use bsa_api::BsaError;
use serde::Deserialize;

pub const CONFIG_FILE: &str = "bsa.toml";

const DEFAULT_BIND: &str = "127.0.0.1:3000";
const DEFAULT_TTL_SECONDS: u64 = 3600;
const REMEMBER_MULTIPLIER: u64 = 24;
/// Half the `i64` millisecond range, leaving room for the issue timestamp.
const MAX_TTL_MS: i64 = i64::MAX / 2;

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub session: SessionConfig,
    pub store: StoreConfig,
    /// Public base URL, used for magic-link redirects.
    pub app_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub bind: SocketAddr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Name of the secret holding the signing key, resolved through a `SecretStore`.
    pub secret_ref: String,
    pub ttl_seconds: u64,
    pub remember_ttl_seconds: u64,
    /// Production mode marks the cookie `Secure`.
    pub production: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    Memory,
    Supabase,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub url: Option<String>,
    pub service_key_ref: String,
    pub request_timeout_ms: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    server: RawServer,
    #[serde(default)]
    session: RawSession,
    #[serde(default)]
    store: RawStore,
    app_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawServer {
    bind: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSession {
    secret_ref: Option<String>,
    ttl_seconds: Option<u64>,
    remember_ttl_seconds: Option<u64>,
    production: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawStore {
    backend: Option<StoreBackend>,
    url: Option<String>,
    service_key_ref: Option<String>,
    request_timeout_ms: Option<u64>,
}

/// Non-empty process environment variable.
pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

pub fn default_config_dir() -> PathBuf {
    if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".config").join("bsa")
    } else {
        PathBuf::from(".bsa")
    }
}

/// Load `<dir>/bsa.toml` if it exists, then apply environment overrides.
pub fn load_config_from_dir(
    dir: &Path,
    env: &dyn Fn(&str) -> Option<String>,
) -> Result<AppConfig, BsaError> {
    let path = dir.join(CONFIG_FILE);
    if path.exists() {
        load_config_from_file(&path, env)
    } else {
        parse_config(None, env)
    }
}

pub fn load_config_from_file(
    path: &Path,
    env: &dyn Fn(&str) -> Option<String>,
) -> Result<AppConfig, BsaError> {
    let content = fs::read_to_string(path)
        .map_err(|e| BsaError::NotFound(format!("failed to read {}: {e}", path.display())))?;
    parse_config(Some(&content), env).map_err(|e| match e {
        BsaError::Validation(msg) => {
            BsaError::Validation(format!("{msg} (in {})", path.display()))
        }
        other => other,
    })
}

/// Defaults, then `toml_text`, then `env`. Environment wins.
pub fn parse_config(
    toml_text: Option<&str>,
    env: &dyn Fn(&str) -> Option<String>,
) -> Result<AppConfig, BsaError> {
    let raw: RawConfig = match toml_text {
        Some(text) => {
            toml::from_str(text).map_err(|e| BsaError::Validation(format!("invalid TOML: {e}")))?
        }
        None => RawConfig::default(),
    };

    let bind_text = env("BSA_BIND")
        .or(raw.server.bind)
        .unwrap_or_else(|| DEFAULT_BIND.to_string());
    let bind = bind_text
        .parse::<SocketAddr>()
        .map_err(|e| BsaError::Validation(format!("invalid bind address {bind_text}: {e}")))?;

    let ttl_seconds = match env("SESSION_TTL_SECONDS") {
        Some(v) => parse_u64("SESSION_TTL_SECONDS", &v)?,
        None => raw.session.ttl_seconds.unwrap_or(DEFAULT_TTL_SECONDS),
    };
    let remember_ttl_seconds = match env("SESSION_TTL_REMEMBER_SECONDS") {
        Some(v) => parse_u64("SESSION_TTL_REMEMBER_SECONDS", &v)?,
        None => match raw.session.remember_ttl_seconds {
            Some(v) => v,
            None => ttl_seconds.checked_mul(REMEMBER_MULTIPLIER).ok_or_else(|| {
                BsaError::Validation(format!("session ttl {ttl_seconds} is too large"))
            })?,
        },
    };
    let production = match env("APP_ENV") {
        Some(v) => v.eq_ignore_ascii_case("production"),
        None => raw.session.production.unwrap_or(false),
    };

    let backend = match env("BSA_STORE") {
        Some(v) => parse_backend(&v)?,
        None => raw.store.backend.unwrap_or(StoreBackend::Memory),
    };

    let config = AppConfig {
        server: ServerConfig { bind },
        session: SessionConfig {
            secret_ref: raw
                .session
                .secret_ref
                .unwrap_or_else(|| "SESSION_SECRET".to_string()),
            ttl_seconds,
            remember_ttl_seconds,
            production,
        },
        store: StoreConfig {
            backend,
            url: env("NEXT_PUBLIC_SUPABASE_URL").or(raw.store.url),
            service_key_ref: raw
                .store
                .service_key_ref
                .unwrap_or_else(|| "SUPABASE_SERVICE_ROLE_KEY".to_string()),
            request_timeout_ms: raw.store.request_timeout_ms.unwrap_or(15_000),
        },
        app_url: env("NEXT_PUBLIC_APP_URL")
            .or_else(|| env("NEXT_PUBLIC_SITE_URL"))
            .or(raw.app_url),
    };

    validate_config(&config)?;
    Ok(config)
}

pub fn validate_config(config: &AppConfig) -> Result<(), BsaError> {
    validate_ttl("ttl_seconds", config.session.ttl_seconds)?;
    validate_ttl("remember_ttl_seconds", config.session.remember_ttl_seconds)?;
    if config.session.secret_ref.trim().is_empty() {
        return Err(BsaError::Validation(
            "session secret_ref is empty".to_string(),
        ));
    }
    if config.store.backend == StoreBackend::Supabase
        && config.store.url.as_deref().is_none_or(str::is_empty)
    {
        return Err(BsaError::Validation(
            "supabase store requires store.url or NEXT_PUBLIC_SUPABASE_URL".to_string(),
        ));
    }
    Ok(())
}

/// Non-zero, and small enough that `issued_at + ttl` in milliseconds stays within `i64`.
fn validate_ttl(name: &str, ttl_seconds: u64) -> Result<(), BsaError> {
    if ttl_seconds == 0 {
        return Err(BsaError::Validation(format!(
            "session {name} must be greater than zero"
        )));
    }
    let fits = ttl_seconds
        .checked_mul(1000)
        .and_then(|ms| i64::try_from(ms).ok())
        .is_some_and(|ms| ms <= MAX_TTL_MS);
    if !fits {
        return Err(BsaError::Validation(format!(
            "session {name} {ttl_seconds} is too large"
        )));
    }
    Ok(())
}

fn parse_u64(key: &str, value: &str) -> Result<u64, BsaError> {
    value
        .trim()
        .parse()
        .map_err(|_| BsaError::Validation(format!("{key} must be a whole number of seconds, got {value}")))
}

fn parse_backend(value: &str) -> Result<StoreBackend, BsaError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "memory" => Ok(StoreBackend::Memory),
        "supabase" => Ok(StoreBackend::Supabase),
        other => Err(BsaError::Validation(format!("unknown store backend {other}"))),
    }
}

/// Write a commented `bsa.toml` into `dir` unless one exists (or `force`).
pub fn write_default_config_file(dir: &Path, force: bool) -> Result<PathBuf, BsaError> {
    fs::create_dir_all(dir)
        .map_err(|e| BsaError::Internal(format!("failed to create {}: {e}", dir.display())))?;

    let path = dir.join(CONFIG_FILE);
    if force || !path.exists() {
        fs::write(&path, include_str!("../bsa.toml.example")).map_err(|e| {
            BsaError::Internal(format!("failed to write {}: {e}", path.display()))
        })?;
    }
    Ok(path)
}
