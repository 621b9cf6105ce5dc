//! Wayfarer - tour-booking web API

use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod config;

use config::Config;
use wayfarer_api::{AppState, LogMailer, create_router};
use wayfarer_auth::{CredentialHasher, CredentialStore, NewCredential, SessionGate, TokenService};
use wayfarer_db::{Database, Role};

/// Wayfarer - tour-booking web API
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.toml")]
    config: String,

    /// Bind address
    #[arg(long, env = "WAYFARER_BIND")]
    bind: Option<String>,

    /// Port
    #[arg(short, long, env = "WAYFARER_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Load configuration
    let config = Config::load(&args.config)?;

    // Initialize logging
    init_logging(&config.logging.level);

    info!("Starting Wayfarer v{}", env!("CARGO_PKG_VERSION"));

    if config.auth.token_secret == "change-me-in-production" {
        warn!("Running with the default token secret; set [auth] token_secret");
    }

    // Initialize database
    let db_url = format!("sqlite:{}?mode=rwc", config.database.path);
    let db = Database::new(&db_url).await?;

    // Build the credential services from the one config value
    let hasher = CredentialHasher::new(config.auth.hash_memory_kib, config.auth.hash_iterations)?;
    let tokens = TokenService::new(&config.auth.token_secret, config.auth.token_ttl_days);
    let store = CredentialStore::new(db.clone(), hasher, config.auth.reset_ttl_minutes);

    // Create a first administrator if the database is empty
    if !db.has_travellers().await? {
        bootstrap_admin(&store, &config).await?;
    }

    // Authentication gate
    let gate = Arc::new(SessionGate::new(
        tokens.clone(),
        db.clone(),
        config.auth.response_style,
        config.auth.login_path.clone(),
    ));

    // Create application state
    let state = AppState::new(
        db,
        store,
        tokens,
        gate,
        Arc::new(LogMailer),
        config.environment,
        config.server.public_url.clone(),
        Duration::from_secs(config.mail.timeout_secs),
    );

    // Create router
    let app = create_router(state).layer(TraceLayer::new_for_http());

    // Determine bind address
    let bind_addr = args.bind.unwrap_or(config.server.bind_address);
    let port = args.port.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{}:{}", bind_addr, port).parse()?;

    info!("Listening on {}", addr);

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Create the first administrator account on an empty database
async fn bootstrap_admin(store: &CredentialStore, config: &Config) -> Result<()> {
    let email = config
        .auth
        .admin_email
        .clone()
        .unwrap_or_else(|| "admin@wayfarer.local".to_string());
    let password = match &config.auth.admin_password {
        Some(password) => password.clone(),
        None => {
            warn!("No [auth] admin_password configured; using a placeholder - change it immediately");
            "change-me-now".to_string()
        }
    };

    info!("Creating first administrator account: {}", email);
    store
        .signup(NewCredential {
            name: "Administrator".to_string(),
            email,
            password: password.clone(),
            password_confirm: password,
            role: Some(Role::Admin),
        })
        .await?;
    Ok(())
}

/// Initialize logging
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C handler");
    info!("Shutdown signal received");
}
