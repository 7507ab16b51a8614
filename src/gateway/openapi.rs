//! OpenAPI / Swagger UI Documentation
//!
//! - Swagger UI: `http://localhost:8080/docs`
//! - OpenAPI JSON: `http://localhost:8080/api-docs/openapi.json`

use utoipa::openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::account::{AccountView, Pool, Role, WalletSummary};
use crate::coupon::{Coupon, CouponRedemption, NewCoupon};
use crate::gateway::handlers::HealthResponse;
use crate::gateway::handlers::investment::OpenPositionData;
use crate::gateway::types::{
    CodeRequest, EmailRequest, MessageData, OpenPositionRequest, RedeemCouponRequest,
    ResetPasswordRequest, UpdatePhoneRequest, VideoAdRequest,
};
use crate::investment::PositionView;
use crate::ledger::{Transaction, TransactionKind, TxnStatus};
use crate::settlement::{SettlementFailure, SettlementReport};
use crate::strategy::{NewStrategy, RiskCategory, Strategy};
use crate::subscription::{NewSubscriptionRequest, SubscriptionRequest, SubscriptionStatus};
use crate::user_auth::handlers::VerificationTokenData;
use crate::user_auth::{AuthResponse, LoginRequest, OAuthLogin, RegisterRequest};

/// JWT bearer and session-cookie security schemes
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
            components.add_security_scheme(
                "session_cookie",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                    "session_token",
                    "Login session set by /api/v1/auth/session-data",
                ))),
            );
        }
    }
}

/// Main API Documentation struct
#[derive(OpenApi)]
#[openapi(
    info(
        title = "TradeSim API",
        version = "1.0.0",
        description = "Trading-simulation rewards backend: virtual balances, strategy positions, rewards and coupons.",
        license(
            name = "MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Development"),
    ),
    paths(
        crate::gateway::handlers::health::health_check,
        // Auth
        crate::user_auth::handlers::send_otp,
        crate::user_auth::handlers::verify_otp,
        crate::user_auth::handlers::register,
        crate::user_auth::handlers::login,
        crate::user_auth::handlers::session_data,
        crate::user_auth::handlers::logout,
        crate::user_auth::handlers::forgot_password,
        crate::user_auth::handlers::reset_password,
        crate::user_auth::handlers::update_phone,
        // User
        crate::gateway::handlers::strategy::list_strategies,
        crate::gateway::handlers::strategy::get_strategy,
        crate::gateway::handlers::investment::open_position,
        crate::gateway::handlers::investment::list_positions,
        crate::gateway::handlers::wallet::get_wallet,
        crate::gateway::handlers::wallet::list_transactions,
        crate::gateway::handlers::coupon::list_coupons,
        crate::gateway::handlers::coupon::request_coupon_otp,
        crate::gateway::handlers::coupon::redeem_coupon,
        crate::gateway::handlers::reward::video_ad,
        crate::gateway::handlers::subscription::create_subscription_request,
        // Admin
        crate::gateway::handlers::admin::list_users,
        crate::gateway::handlers::admin::create_strategy,
        crate::gateway::handlers::admin::deactivate_strategy,
        crate::gateway::handlers::admin::create_coupon,
        crate::gateway::handlers::admin::upload_trading_results,
        crate::gateway::handlers::admin::list_subscription_requests,
    ),
    components(
        schemas(
            HealthResponse,
            MessageData,
            EmailRequest,
            CodeRequest,
            ResetPasswordRequest,
            UpdatePhoneRequest,
            VerificationTokenData,
            RegisterRequest,
            LoginRequest,
            AuthResponse,
            OAuthLogin,
            AccountView,
            Role,
            Pool,
            WalletSummary,
            Strategy,
            NewStrategy,
            RiskCategory,
            OpenPositionRequest,
            OpenPositionData,
            PositionView,
            Transaction,
            TransactionKind,
            TxnStatus,
            Coupon,
            NewCoupon,
            CouponRedemption,
            RedeemCouponRequest,
            VideoAdRequest,
            NewSubscriptionRequest,
            SubscriptionRequest,
            SubscriptionStatus,
            SettlementReport,
            SettlementFailure,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Registration, sign-in and sessions"),
        (name = "Strategies", description = "Strategy catalog"),
        (name = "Investments", description = "Positions in strategies"),
        (name = "Wallet", description = "Balances and transaction history"),
        (name = "Coupons", description = "Coupon catalog and redemption"),
        (name = "Rewards", description = "Task-pool rewards"),
        (name = "Subscriptions", description = "Strategy subscription requests"),
        (name = "Admin", description = "Admin-only operations"),
        (name = "System", description = "Health checks and system info")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use utoipa::OpenApi;

    #[test]
    fn test_openapi_document_generates() {
        let doc = ApiDoc::openapi();
        assert_eq!(doc.info.title, "TradeSim API");
        assert_eq!(doc.info.version, "1.0.0");
    }

    #[test]
    fn test_openapi_json_serializable() {
        let json = ApiDoc::openapi().to_json().unwrap();
        assert!(json.contains("TradeSim API"));
    }

    #[test]
    fn test_endpoints_registered() {
        let paths = ApiDoc::openapi().paths;
        for path in [
            "/api/v1/health",
            "/api/v1/auth/register",
            "/api/v1/auth/session-data",
            "/api/v1/wallet",
            "/api/v1/coupons/redeem",
            "/api/v1/strategies/{id}",
            "/api/v1/admin/upload-trading-results",
        ] {
            assert!(paths.paths.contains_key(path), "missing {}", path);
        }
    }

    #[test]
    fn test_security_schemes_registered() {
        let components = ApiDoc::openapi().components.unwrap();
        assert!(components.security_schemes.contains_key("bearer_auth"));
        assert!(components.security_schemes.contains_key("session_cookie"));
    }
}
