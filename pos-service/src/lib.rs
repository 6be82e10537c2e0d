pub mod config;
pub mod db;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod scope;
pub mod services;
pub mod utils;

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::PosConfig;
use crate::services::{Database, JwtService, OnboardingService, OtpService};
use pos_core::error::AppError;
use pos_core::middleware::rate_limit::{ip_rate_limit_middleware, IpRateLimiter};
use pos_core::middleware::security_headers::security_headers_middleware;
use pos_core::middleware::tracing::request_id_middleware;

#[derive(Clone)]
pub struct AppState {
    pub config: PosConfig,
    pub db: Database,
    pub otp: OtpService,
    pub jwt: JwtService,
    pub onboarding: Arc<OnboardingService>,
    pub otp_request_rate_limiter: IpRateLimiter,
    pub otp_verify_rate_limiter: IpRateLimiter,
    pub ip_rate_limiter: IpRateLimiter,
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    service: String,
    version: String,
}

/// Liveness endpoint; checks database connectivity.
///
/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>, AppError> {
    state
        .db
        .health_check()
        .await
        .map_err(|_| AppError::ServiceUnavailable)?;

    Ok(Json(HealthResponse {
        status: "ok",
        service: state.config.service_name.clone(),
        version: state.config.service_version.clone(),
    }))
}

pub fn build_router(state: AppState) -> Router {
    // OTP issuance routes share one limiter; verification gets its own
    // so failed-guess traffic cannot starve issuance.
    let otp_request_limiter = state.otp_request_rate_limiter.clone();
    let otp_request_routes = Router::new()
        .route("/auth/otp/request", post(handlers::auth::request_otp))
        .route("/auth/register", post(handlers::auth::register))
        .route(
            "/auth/password-reset/request",
            post(handlers::auth::request_password_reset),
        )
        .layer(from_fn_with_state(
            otp_request_limiter,
            ip_rate_limit_middleware,
        ));

    let otp_verify_limiter = state.otp_verify_rate_limiter.clone();
    let otp_verify_routes = Router::new()
        .route("/auth/otp/verify", post(handlers::auth::verify_otp))
        .route(
            "/auth/password-reset/confirm",
            post(handlers::auth::confirm_password_reset),
        )
        .layer(from_fn_with_state(
            otp_verify_limiter,
            ip_rate_limit_middleware,
        ));

    // Everything below requires a valid access token; the principal
    // middleware derives the tenant scope from the claims.
    let protected_routes = Router::new()
        .route("/users/me", get(handlers::user::get_me))
        .route("/tenants", post(handlers::tenant::create_tenant))
        .route("/tenants/:tenant_id", get(handlers::tenant::get_tenant))
        .route(
            "/roles",
            get(handlers::role::list_roles).post(handlers::role::create_role),
        )
        .route(
            "/roles/:role_id",
            get(handlers::role::get_role).delete(handlers::role::delete_role),
        )
        .route(
            "/products",
            get(handlers::product::list_products).post(handlers::product::create_product),
        )
        .route(
            "/products/import",
            post(handlers::product::import_products),
        )
        .route(
            "/products/:product_id",
            get(handlers::product::get_product),
        )
        .route(
            "/sales",
            get(handlers::sale::list_sales).post(handlers::sale::create_sale),
        )
        .route("/sales/:sale_id", get(handlers::sale::get_sale))
        .route(
            "/reports/sales/daily",
            get(handlers::sale::daily_sales_report),
        )
        .layer(from_fn(middleware::principal_middleware))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    let ip_limiter = state.ip_rate_limiter.clone();
    let allowed_origins = state
        .config
        .security
        .allowed_origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!(origin = %o, error = %e, "Invalid CORS origin, skipping");
                None
            }
        })
        .collect::<Vec<HeaderValue>>();

    Router::new()
        .route("/health", get(health_check))
        .route("/auth/refresh", post(handlers::auth::refresh))
        .merge(otp_request_routes)
        .merge(otp_verify_routes)
        .merge(protected_routes)
        .with_state(state)
        // Global IP rate limiting
        .layer(from_fn_with_state(ip_limiter, ip_rate_limit_middleware))
        // Tracing layer with request_id propagation
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            },
        ))
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(allowed_origins)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PATCH,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]),
        )
}
