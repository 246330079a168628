// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `murmur serve` command implementation.
//!
//! Opens SQLite storage and the key-value store, selects the AI backend,
//! assembles the services, starts the reply workers, and serves the HTTP API
//! until SIGINT or SIGTERM.

use std::sync::Arc;
use std::time::Duration;

use murmur_agent::Services;
use murmur_auth::{JwtIdentity, OtpService, TokenIssuer};
use murmur_config::MurmurConfig;
use murmur_core::{MurmurError, ProviderAdapter, StorageAdapter};
use murmur_gateway::{GatewayState, HealthState};
use murmur_storage::SqliteStorage;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Upper bound on waiting for workers to finish their current job.
const WORKER_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs the `murmur serve` command.
pub async fn run_serve(config: MurmurConfig) -> Result<(), MurmurError> {
    init_tracing(&config.agent.log_level);

    info!("starting murmur serve");

    let tokens = Arc::new(TokenIssuer::from_config(&config.auth).map_err(|e| {
        error!(error = %e, "refusing to start without a JWT signing secret");
        eprintln!("error: set auth.jwt_secret in murmur.toml or MURMUR_AUTH_JWT_SECRET");
        e
    })?);

    let cancel = install_signal_handler();

    let storage = SqliteStorage::new(config.storage.clone());
    storage.initialize().await?;
    let storage: Arc<dyn StorageAdapter> = Arc::new(storage);

    let kv = murmur_kv::build_kv(&config.cache, cancel.clone());
    let provider = initialize_provider(&config);

    #[cfg(feature = "prometheus")]
    let prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>> =
        if config.prometheus.enabled {
            match murmur_prometheus::PrometheusAdapter::new() {
                Ok(adapter) => {
                    info!("prometheus metrics enabled");
                    let adapter = Arc::new(adapter);
                    Some(Arc::new(move || adapter.render()) as Arc<dyn Fn() -> String + Send + Sync>)
                }
                Err(e) => {
                    warn!(error = %e, "prometheus initialization failed, continuing without metrics");
                    None
                }
            }
        } else {
            debug!("prometheus metrics disabled by configuration");
            None
        };
    #[cfg(not(feature = "prometheus"))]
    let prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>> = None;

    let services = Services::assemble(&config, Arc::clone(&storage), Arc::clone(&kv), provider);

    let workers = services.runner.spawn(cancel.clone());

    let state = GatewayState {
        identity: Arc::new(JwtIdentity::new(Arc::clone(&tokens), Arc::clone(&storage))),
        tokens,
        otp: Arc::new(OtpService::new(
            Arc::clone(&kv),
            Duration::from_secs(config.auth.otp_ttl_secs),
        )),
        expose_otp: config.auth.expose_otp,
        health: HealthState {
            start_time: std::time::Instant::now(),
            prometheus_render,
        },
        services,
    };
    if config.auth.expose_otp {
        warn!("auth.expose_otp is on: OTP codes are returned in API responses");
    }

    let served = murmur_gateway::start_server(&config.server, state, cancel.clone()).await;
    // The server can also stop on a bind error; make sure workers follow.
    cancel.cancel();

    match tokio::time::timeout(WORKER_DRAIN_TIMEOUT, futures::future::join_all(workers)).await {
        Ok(results) => {
            for e in results.into_iter().filter_map(Result::err) {
                warn!(error = %e, "worker task ended abnormally");
            }
        }
        Err(_) => warn!("workers did not stop within {WORKER_DRAIN_TIMEOUT:?}"),
    }

    if let Err(e) = storage.close().await {
        warn!(error = %e, "failed to close storage cleanly");
    }

    served?;
    info!("murmur serve shutdown complete");
    Ok(())
}

/// The Gemini backend when an API key is configured; `None` selects mock mode.
#[cfg(feature = "gemini")]
fn initialize_provider(config: &MurmurConfig) -> Option<Arc<dyn ProviderAdapter>> {
    if config.gemini.api_key.is_none() {
        info!("no gemini.api_key configured, AI replies use mock mode");
        return None;
    }
    match murmur_gemini::GeminiProvider::new(&config.gemini) {
        Ok(provider) => Some(Arc::new(provider)),
        Err(e) => {
            warn!(error = %e, "Gemini provider initialization failed, using mock mode");
            None
        }
    }
}

#[cfg(not(feature = "gemini"))]
fn initialize_provider(_config: &MurmurConfig) -> Option<Arc<dyn ProviderAdapter>> {
    info!("built without an AI backend, replies use mock mode");
    None
}

/// Cancelled on SIGINT or SIGTERM.
fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = ctrl_c => info!("received SIGINT (Ctrl+C), initiating shutdown"),
                        _ = sigterm.recv() => info!("received SIGTERM, initiating shutdown"),
                    }
                }
                Err(e) => {
                    warn!(error = %e, "failed to install SIGTERM handler, listening for Ctrl+C only");
                    let _ = ctrl_c.await;
                    info!("received SIGINT (Ctrl+C), initiating shutdown");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!("received Ctrl+C, initiating shutdown");
        }

        token_clone.cancel();
        debug!("shutdown signal handler completed");
    });

    token
}

/// `RUST_LOG` wins over `agent.log_level`.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("murmur={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
