//! HTTP gateway
//!
//! Every route lives under `/api/v1`. Auth endpoints are public except
//! logout and update-phone; everything else needs a session cookie or a
//! bearer token, and `/admin` additionally needs the admin role.

pub mod handlers;
pub mod openapi;
pub mod state;
pub mod types;

use anyhow::Context;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

// OpenAPI / Swagger UI
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::user_auth::handlers as auth;
use crate::user_auth::middleware::{admin_middleware, jwt_auth_middleware};
use state::AppState;

/// Upper bound for a trading results upload
const UPLOAD_LIMIT_BYTES: usize = 16 * 1024 * 1024;

pub fn build_router(state: Arc<AppState>) -> Router {
    // ==========================================================================
    // Auth Routes (public)
    // ==========================================================================
    let auth_routes = Router::new()
        .route("/send-otp", post(auth::send_otp))
        .route("/verify-otp", post(auth::verify_otp))
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/session-data", get(auth::session_data))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/reset-password", post(auth::reset_password))
        .merge(
            Router::new()
                .route("/logout", post(auth::logout))
                .route("/update-phone", post(auth::update_phone))
                .layer(from_fn_with_state(state.clone(), jwt_auth_middleware)),
        );

    // ==========================================================================
    // Admin Routes (admin role)
    // ==========================================================================
    let admin_routes = Router::new()
        .route("/users", get(handlers::list_users))
        .route("/strategies", post(handlers::create_strategy))
        .route(
            "/strategies/{id}/deactivate",
            post(handlers::deactivate_strategy),
        )
        .route("/coupons", post(handlers::create_coupon))
        .route(
            "/upload-trading-results",
            post(handlers::upload_trading_results).layer(DefaultBodyLimit::max(UPLOAD_LIMIT_BYTES)),
        )
        .route(
            "/subscription-requests",
            get(handlers::list_subscription_requests),
        )
        .layer(from_fn(admin_middleware));

    // ==========================================================================
    // User Routes (auth required)
    // ==========================================================================
    let user_routes = Router::new()
        .route("/strategies", get(handlers::list_strategies))
        .route("/strategies/{id}", get(handlers::get_strategy))
        .route(
            "/user-strategies",
            get(handlers::list_positions).post(handlers::open_position),
        )
        .route("/wallet", get(handlers::get_wallet))
        .route("/transactions", get(handlers::list_transactions))
        .route("/coupons", get(handlers::list_coupons))
        .route("/coupons/request-otp", post(handlers::request_coupon_otp))
        .route("/coupons/redeem", post(handlers::redeem_coupon))
        .route("/rewards/video-ad", post(handlers::video_ad))
        .route(
            "/subscription-requests",
            post(handlers::create_subscription_request),
        )
        .nest("/admin", admin_routes)
        .layer(from_fn_with_state(state.clone(), jwt_auth_middleware));

    let api = Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/auth", auth_routes)
        .merge(user_routes);

    Router::new()
        .nest("/api/v1", api)
        .with_state(state)
        // Stateless, added after with_state
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()))
}

pub async fn run_server(host: &str, port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = build_router(state);

    let addr = format!("{}:{}", host, port);
    let listener = TcpListener::bind(&addr).await.with_context(|| {
        format!(
            "Failed to bind to {} (port may already be in use, check with: lsof -i :{})",
            addr, port
        )
    })?;

    info!("🚀 Gateway listening on http://{}", addr);
    info!("📖 API Docs: http://{}/docs", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;
    info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
