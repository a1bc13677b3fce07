//! taskpulse server entry point.
//!
//! # Environment Variables
//!
//! - `STORAGE_MODE`: `in_memory` (default) | `postgres`
//! - `DOCUMENT_MODE`: `in_memory` (default) | `redis`
//! - `BROKER_MODE`: `in_memory` (default) | `redis`
//! - `DATABASE_URL`: `PostgreSQL` URL (required when `STORAGE_MODE=postgres`)
//! - `REDIS_URL`: Redis URL (required when either mode above is `redis`)
//! - `JWT_PRIVATE_KEY_PATH` / `JWT_PUBLIC_KEY_PATH`: Ed25519 PEM key pair
//! - `APP_HOST` / `APP_PORT`: bind address (default `0.0.0.0:8080`)
//! - `RUST_LOG`: log filter (default `info,taskpulse=debug`)
//! - `LOG_FORMAT`: `json` for JSON log lines

use std::process::ExitCode;

use taskpulse::api::create_router;
use taskpulse::infrastructure::{
    AppConfig, AppDependencies, Backends, SigningError, TokenSigner,
};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    init_tracing();

    tracing::info!("Starting taskpulse");

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(error) => {
            tracing::error!(%error, "configuration error");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(
        storage = ?config.storage_mode,
        documents = ?config.document_mode,
        broker = ?config.broker_mode,
        "configuration loaded"
    );

    let signer = match load_signer(&config) {
        Ok(signer) => signer,
        Err(error) => {
            tracing::error!(%error, "failed to load signing keys");
            return ExitCode::FAILURE;
        }
    };

    let backends = match Backends::connect(&config).await {
        Ok(backends) => backends,
        Err(error) => {
            tracing::error!(%error, "failed to connect backends");
            return ExitCode::FAILURE;
        }
    };

    let bind_address = config.bind_address();
    let ingestor = backends.ingestor(&config);
    let dependencies = match AppDependencies::build(config, &backends, signer).await {
        Ok(dependencies) => dependencies,
        Err(error) => {
            tracing::error!(%error, "failed to initialise services");
            backends.close().await;
            return ExitCode::FAILURE;
        }
    };

    let (stop_ingestor, shutdown) = watch::channel(false);
    let ingestion = tokio::spawn(ingestor.run(shutdown));

    let exit = serve(&bind_address, dependencies).await;

    if stop_ingestor.send(true).is_err() {
        tracing::warn!("stream ingestor already stopped");
    }
    if let Err(error) = ingestion.await {
        tracing::error!(%error, "stream ingestor panicked");
    }
    backends.close().await;

    tracing::info!("taskpulse stopped");
    exit
}

async fn serve(bind_address: &str, dependencies: AppDependencies) -> ExitCode {
    let listener = match TcpListener::bind(bind_address).await {
        Ok(listener) => listener,
        Err(error) => {
            tracing::error!(%error, %bind_address, "failed to bind");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!("taskpulse listening on http://{bind_address}");

    match axum::serve(listener, create_router(dependencies))
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(%error, "server error");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,taskpulse=debug,tower_http=debug".into());
    let json = std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn load_signer(config: &AppConfig) -> Result<TokenSigner, SigningError> {
    match &config.key_pair {
        Some(paths) => {
            let signer = TokenSigner::from_pem_files(&paths.private_key, &paths.public_key)?;
            tracing::info!(public_key = %paths.public_key.display(), "loaded signing keys");
            Ok(signer)
        }
        None => {
            tracing::warn!(
                "JWT_PRIVATE_KEY_PATH/JWT_PUBLIC_KEY_PATH not set; using an ephemeral key pair, \
                 tokens will not survive a restart"
            );
            TokenSigner::generate()
        }
    }
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
