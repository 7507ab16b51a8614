//! Identity: OTP-verified registration, password and OAuth sign-in,
//! JWT bearer tokens and cookie sessions.

pub mod handlers;
pub mod middleware;
pub mod oauth;
pub mod service;

pub use oauth::{
    DisabledOAuthProvider, HttpOAuthProvider, OAuthIdentity, OAuthProvider, StaticOAuthProvider,
    provider_from_config,
};
pub use service::{
    AuthResponse, AuthenticatedAccount, Claims, LoginRequest, LoginSession, OAuthLogin,
    RegisterRequest, UserAuthService,
};
