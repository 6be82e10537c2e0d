use std::net::SocketAddr;
use std::sync::Arc;

use tokio::signal;

use pos_core::error::AppError;
use pos_core::middleware::rate_limit::create_ip_rate_limiter;
use pos_core::observability::logging::init_tracing;
use pos_service::config::{Environment, PosConfig};
use pos_service::services::{
    Database, InMemoryPermissionCache, JwtService, LogMailer, Mailer, OnboardingService,
    OtpService, SmtpMailer,
};
use pos_service::{build_router, AppState};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Load configuration - fail fast if invalid
    let config = PosConfig::from_env()?;

    init_tracing(&config.service_name, &config.log_level);

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
        "Starting POS service"
    );

    tracing::info!("Connecting to database");
    let pool = pos_service::db::create_pool(&config.database)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
    pos_service::db::run_migrations(&pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
    tracing::info!("Database ready");

    let db = Database::new(pool);

    // Dev uses the log mailer so the whole flow works without SMTP
    // credentials; prod requires a working relay.
    let mailer: Arc<dyn Mailer> = match config.environment {
        Environment::Dev => Arc::new(LogMailer),
        Environment::Prod => Arc::new(SmtpMailer::new(&config.smtp)?),
    };
    tracing::info!("Mail delivery initialized");

    let jwt = JwtService::new(&config.jwt).map_err(AppError::ConfigError)?;
    tracing::info!("JWT service initialized");

    let otp = OtpService::new(db.clone(), mailer);
    let permission_cache = Arc::new(InMemoryPermissionCache::new());
    let onboarding = Arc::new(OnboardingService::new(db.clone(), permission_cache));

    let otp_request_rate_limiter = create_ip_rate_limiter(
        config.rate_limit.otp_request_attempts,
        config.rate_limit.otp_request_window_seconds,
    );
    let otp_verify_rate_limiter = create_ip_rate_limiter(
        config.rate_limit.otp_verify_attempts,
        config.rate_limit.otp_verify_window_seconds,
    );
    let ip_rate_limiter = create_ip_rate_limiter(
        config.rate_limit.global_ip_limit,
        config.rate_limit.global_ip_window_seconds,
    );
    tracing::info!("Rate limiters initialized: OTP request, OTP verify, and global IP");

    let state = AppState {
        config: config.clone(),
        db,
        otp,
        jwt,
        onboarding,
        otp_request_rate_limiter,
        otp_verify_rate_limiter,
        ip_rate_limiter,
    };

    let app = build_router(state);

    let addr = format!("{}:{}", config.common.host, config.common.port);
    tracing::info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::InternalError(anyhow::anyhow!(e)))?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|e| AppError::InternalError(anyhow::anyhow!(e)))?;

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
