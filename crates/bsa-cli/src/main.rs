mod http;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, ensure};
use bsa_api::Role;
use bsa_auth::SessionSecret;
use bsa_connectors::{EnvSecretStore, MemoryStore};
use bsa_core::{
    AppConfig, StoreBackend, default_config_dir, load_config_from_dir, load_config_from_file,
    process_env, write_default_config_file,
};
use bsa_runtime::{BackOffice, DEFAULT_BCRYPT_COST, Stores, hash_passcode};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "bsa", about = "Salon back office API server")]
struct Cli {
    #[arg(long, global = true)]
    json: bool,

    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    /// Explicit config file; overrides `--config-dir`.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Write a commented bsa.toml into the config dir
    Init {
        #[arg(long)]
        force: bool,
    },
    /// Run the HTTP API
    Serve {
        #[arg(long)]
        bind: Option<SocketAddr>,
        /// Seed the in-memory store with an access code, as ROLE=BCRYPT_HASH (repeatable)
        #[arg(long = "seed-code", value_parser = parse_key_val)]
        seed_codes: Vec<(String, String)>,
    },
    /// Print a bcrypt hash for a passcode, for seeding access_codes rows
    HashPasscode {
        /// Prompted for (hidden) when omitted
        passcode: Option<String>,
        #[arg(long, default_value_t = DEFAULT_BCRYPT_COST)]
        cost: u32,
    },
    /// Show the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    for file in [".env.local", ".env"] {
        let _ = dotenvy::from_filename(file);
    }
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg_dir = cli.config_dir.clone().unwrap_or_else(default_config_dir);

    match cli.command {
        Commands::Init { force } => {
            let path = write_default_config_file(&cfg_dir, force)?;
            pout(
                cli.json,
                serde_json::json!({"message": "init complete", "config_file": path}),
                &format!("Wrote {}", path.display()),
            )?;
        }
        Commands::Config => {
            let config = load_config(cli.config.as_ref(), &cfg_dir)?;
            pout(
                cli.json,
                serde_json::json!({
                    "bind": config.server.bind.to_string(),
                    "session": {
                        "secret_ref": config.session.secret_ref,
                        "ttl_seconds": config.session.ttl_seconds,
                        "remember_ttl_seconds": config.session.remember_ttl_seconds,
                        "production": config.session.production,
                    },
                    "store": {
                        "backend": format!("{:?}", config.store.backend).to_lowercase(),
                        "url": config.store.url,
                        "service_key_ref": config.store.service_key_ref,
                    },
                    "app_url": config.app_url,
                }),
                &format!(
                    "bind={} store={:?} ttl={}s",
                    config.server.bind, config.store.backend, config.session.ttl_seconds
                ),
            )?;
        }
        Commands::HashPasscode { passcode, cost } => {
            let passcode = match passcode {
                Some(p) => p,
                None => rpassword::prompt_password("Passcode (hidden): ")?,
            };
            ensure!(!passcode.trim().is_empty(), "Passcode cannot be empty");
            let hashed = hash_passcode(&passcode, cost).await?;
            pout(cli.json, serde_json::json!({"hashed_code": hashed}), &hashed)?;
        }
        Commands::Serve { bind, seed_codes } => {
            let mut config = load_config(cli.config.as_ref(), &cfg_dir)?;
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            serve(config, &seed_codes).await?;
        }
    }

    Ok(())
}

fn load_config(explicit: Option<&PathBuf>, cfg_dir: &Path) -> anyhow::Result<AppConfig> {
    let config = match explicit {
        Some(path) => load_config_from_file(path, &process_env)?,
        None => load_config_from_dir(cfg_dir, &process_env)?,
    };
    Ok(config)
}

fn build_office(config: &AppConfig, seed_codes: &[(String, String)]) -> anyhow::Result<BackOffice> {
    if seed_codes.is_empty() {
        return Ok(BackOffice::from_config(config, &EnvSecretStore)?);
    }
    ensure!(
        config.store.backend == StoreBackend::Memory,
        "--seed-code only applies to the memory store"
    );

    let store = Arc::new(MemoryStore::new());
    for (role, hashed) in seed_codes {
        let role: Role = role.parse()?;
        store.seed_access_code(role, hashed.clone(), true)?;
    }
    tracing::info!(count = seed_codes.len(), "seeded access codes");

    let secret = SessionSecret::from_store(&EnvSecretStore, &config.session.secret_ref)
        .with_context(|| format!("reading {}", config.session.secret_ref))?;
    Ok(BackOffice::from_config_with_stores(
        config,
        &secret,
        Stores::shared(store),
    )?)
}

async fn serve(config: AppConfig, seed_codes: &[(String, String)]) -> anyhow::Result<()> {
    let office = build_office(&config, seed_codes)?;
    let app = http::router(http::AppState::new(office));

    let listener = tokio::net::TcpListener::bind(config.server.bind)
        .await
        .with_context(|| format!("binding {}", config.server.bind))?;
    tracing::info!(
        bind = %config.server.bind,
        store = ?config.store.backend,
        secure_cookies = config.session.production,
        "listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await?;
    Ok(())
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (k, v) = s
        .split_once('=')
        .ok_or_else(|| format!("expected ROLE=HASH, got {s}"))?;
    Ok((k.trim().to_string(), v.trim().to_string()))
}

pub fn pout(json_mode: bool, value: serde_json::Value, text: &str) -> anyhow::Result<()> {
    if json_mode {
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("{text}");
    }
    Ok(())
}
