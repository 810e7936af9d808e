//! Event feed server binary.
//!
//! Starts an axum HTTP server with structured logging, an in-memory event
//! ledger, optional simulated device traffic, and graceful shutdown on
//! SIGTERM/SIGINT.

use feed_identity::{Authenticator, LocalAuthenticator, TokenSigner, UserDirectory};
use feed_ledger::{CatalogGenerator, DemoSeed, EmptySeed, FeedService, Ledger, SeedSource};
use feed_server::{app, background, config, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

fn resolve_config_path() -> (Option<String>, &'static str) {
    if let Some(path) = std::env::args()
        .nth(1)
        .filter(|value| !value.trim().is_empty())
    {
        return (Some(path), "cli-arg");
    }

    if let Ok(path) = std::env::var("FEED_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (Some(path), "env-var");
        }
    }

    (None, "default")
}

#[tokio::main]
async fn main() {
    let (resolved_config_path, config_source) = resolve_config_path();
    let selected_config_path = resolved_config_path.as_deref().or(Some("config.toml"));

    // Load configuration
    let config = config::load_config(selected_config_path)
        .expect("failed to load configuration: the server cannot start without valid config");

    // Initialize tracing
    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!(
        source = config_source,
        path = selected_config_path.unwrap_or("<none>"),
        "resolved startup configuration path"
    );

    // Authentication
    let users = if config.feed.seed_demo_data {
        UserDirectory::demo().expect("failed to hash demo user passwords")
    } else {
        UserDirectory::new()
    };
    let signer = match &config.auth.token_secret {
        Some(secret) => TokenSigner::new(secret.as_bytes().to_vec(), config.auth.token_ttl_secs),
        None => {
            tracing::warn!("no auth.token_secret configured; tokens will not survive a restart");
            TokenSigner::random(config.auth.token_ttl_secs)
        }
    };
    tracing::info!(users = users.len(), "user directory loaded");
    let auth: Arc<dyn Authenticator> = Arc::new(LocalAuthenticator::new(users, signer));

    // Files directory
    std::fs::create_dir_all(&config.files.dir)
        .expect("failed to create files directory: check files.dir in config");

    // Event ledger
    let seed: Box<dyn SeedSource> = if config.feed.seed_demo_data {
        Box::new(DemoSeed::from_files_dir(&config.files.dir))
    } else {
        Box::new(EmptySeed)
    };
    let ledger = Ledger::with_seed(seed.as_ref(), chrono::Utc::now())
        .expect("failed to seed the event ledger");
    tracing::info!(
        events = ledger.len().unwrap_or_default(),
        "event ledger initialized"
    );
    let feed = Arc::new(FeedService::new(ledger, CatalogGenerator));

    // Background simulation
    tokio::spawn(background::start_simulation_task(
        feed.clone(),
        config.simulation.interval_secs,
        config.simulation.batch_size,
    ));

    // Build application
    let app = app(AppState {
        feed,
        auth,
        files_dir: config.files.dir.clone(),
    });
    let addr = SocketAddr::new(config.server.host, config.server.port);

    tracing::info!(%addr, "starting event feed server");

    let listener = TcpListener::bind(addr)
        .await
        .expect("failed to bind to address: is another process using this port?");

    // Serve with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("event feed server shut down");
}

/// Waits for a SIGINT (Ctrl+C) or SIGTERM signal for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { tracing::info!("received SIGINT, initiating graceful shutdown"); }
        () = terminate => { tracing::info!("received SIGTERM, initiating graceful shutdown"); }
    }
}
