use auth_service::{
    build_router,
    config::AuthConfig,
    services::{
        AuthService, DispatchQueue, EmailService, MemoryUserStore, MemoryVerificationCodeStore,
        SessionRegistry, TokenService, VerificationCodeService,
    },
    AppState,
};
use service_core::observability::logging::init_tracing;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<(), service_core::error::AppError> {
    // Load configuration - fail fast if invalid
    let config = AuthConfig::from_env()?;

    init_tracing(&config.log_level);

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
        "Starting authentication service"
    );

    // Revocation registry, shared between token verification and logout.
    let registry = Arc::new(SessionRegistry::new());

    // Signing keys are loaded here; the process does not start without
    // them.
    let tokens = TokenService::new(&config.jwt, registry.clone())
        .map_err(service_core::error::AppError::ConfigError)?;
    tracing::info!("Token service initialized");

    let users = Arc::new(MemoryUserStore::new());
    let codes = VerificationCodeService::new(
        Arc::new(MemoryVerificationCodeStore::new()),
        &config.verification,
    );

    let email = Arc::new(EmailService::new(&config.smtp)?);
    tracing::info!("Email service initialized");

    let dispatch = Arc::new(DispatchQueue::start(config.dispatch, email));
    tracing::info!("Delivery dispatch queue started");

    let auth_service = AuthService::new(
        users,
        codes,
        tokens.clone(),
        registry.clone(),
        dispatch.clone(),
    );

    // Periodic housekeeping: drop revocation records for tokens that have
    // expired on their own.
    let prune_registry = registry.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(3600));
        loop {
            interval.tick().await;
            prune_registry.prune_expired();
        }
    });

    let state = AppState {
        config: config.clone(),
        tokens,
        auth_service,
    };

    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
    tracing::info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    dispatch.shutdown();

    tracing::info!("Service shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
