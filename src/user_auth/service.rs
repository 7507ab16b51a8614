use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::serde::ts_milliseconds;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, json};
use std::sync::Arc;
use tracing::{info, warn};
use utoipa::ToSchema;
use validator::Validate;

use super::oauth::OAuthProvider;
use crate::account::{Account, AccountDraft, AccountView, Role, normalize_email};
use crate::clock::Clock;
use crate::config::AuthConfig;
use crate::core_types::AccountId;
use crate::error::{CoreError, CoreResult};
use crate::ledger::Ledger;
use crate::otp::{OtpGate, OtpPurpose};
use crate::rewards::RewardIssuer;
use crate::store::{DocumentStore, Filter, collections, from_document, to_document};

/// JWT Claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // account id
    pub role: Role,
    pub exp: usize,
    pub iat: usize,
}

/// Cookie-backed session created by OAuth sign-in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LoginSession {
    pub session_token: String,
    #[schema(value_type = uuid::Uuid)]
    pub account_id: AccountId,
    #[serde(with = "ts_milliseconds")]
    #[schema(value_type = i64)]
    pub expires_at: DateTime<Utc>,
    #[serde(with = "ts_milliseconds")]
    #[schema(value_type = i64)]
    pub created_at: DateTime<Utc>,
}

/// Caller identity resolved from a session cookie or bearer token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedAccount {
    pub account_id: AccountId,
    pub role: Role,
}

impl AuthenticatedAccount {
    pub fn require_admin(&self) -> CoreResult<()> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(CoreError::Forbidden)
        }
    }
}

/// Account Registration Request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(email)]
    #[schema(example = "alice@example.com")]
    pub email: String,
    #[validate(length(min = 1, max = 128))]
    #[schema(example = "Alice")]
    pub name: String,
    #[serde(default)]
    #[schema(example = "+15550100")]
    pub phone_number: Option<String>,
    #[validate(length(min = 8, max = 128))]
    #[schema(example = "password123")]
    pub password: String,
    /// Token returned by verify-otp
    pub verification_token: String,
}

/// Account Login Request
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "alice@example.com")]
    pub email: String,
    #[schema(example = "password123")]
    pub password: String,
}

/// Auth Response (JWT)
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub access_token: String,
    #[schema(example = "bearer")]
    pub token_type: String,
    pub user: AccountView,
    /// Daily login bonus granted by this sign-in
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, example = "100")]
    pub daily_bonus: Option<Decimal>,
}

/// OAuth sign-in result
#[derive(Debug, Serialize, ToSchema)]
pub struct OAuthLogin {
    pub user: AccountView,
    pub session_token: String,
    #[serde(with = "ts_milliseconds")]
    #[schema(value_type = i64)]
    pub expires_at: DateTime<Utc>,
}

pub struct UserAuthService {
    store: Arc<dyn DocumentStore>,
    ledger: Arc<Ledger>,
    rewards: Arc<RewardIssuer>,
    otp: Arc<OtpGate>,
    oauth: Arc<dyn OAuthProvider>,
    clock: Arc<dyn Clock>,
    config: AuthConfig,
}

impl UserAuthService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        ledger: Arc<Ledger>,
        rewards: Arc<RewardIssuer>,
        otp: Arc<OtpGate>,
        oauth: Arc<dyn OAuthProvider>,
        clock: Arc<dyn Clock>,
        config: AuthConfig,
    ) -> Self {
        Self {
            store,
            ledger,
            rewards,
            otp,
            oauth,
            clock,
            config,
        }
    }

    // ========================================================================
    // Registration
    // ========================================================================

    pub async fn send_registration_otp(&self, email: &str) -> CoreResult<()> {
        let email = normalize_email(email)?;
        if self.ledger.find_by_email(&email).await?.is_some() {
            return Err(CoreError::AlreadyExists("Email already registered".into()));
        }
        self.otp.issue(&email, OtpPurpose::Registration).await?;
        Ok(())
    }

    /// Returns the verification token that `register` redeems
    pub async fn verify_registration_otp(&self, email: &str, code: &str) -> CoreResult<String> {
        let id = self
            .otp
            .verify(email, code.trim(), OtpPurpose::Registration)
            .await?;
        Ok(id.to_string())
    }

    pub async fn register(&self, req: RegisterRequest) -> CoreResult<AuthResponse> {
        req.validate()
            .map_err(|e| CoreError::InvalidInput(e.to_string()))?;
        let verification = self
            .otp
            .redeem_token(&req.verification_token, &req.email, OtpPurpose::Registration)
            .await?;

        let (account, _) = self
            .rewards
            .open_account(AccountDraft {
                email: req.email,
                name: req.name.trim().to_string(),
                phone_number: req.phone_number.filter(|p| !p.trim().is_empty()),
                password_hash: Some(hash_password(&req.password)?),
                email_verified: true,
                ..Default::default()
            })
            .await?;

        if let Err(e) = self.otp.discard(verification.id).await {
            warn!(session_id = %verification.id, error = %e, "Failed to discard used verification");
        }
        info!(account_id = %account.id, "Account registered");
        self.auth_response(&account, None)
    }

    // ========================================================================
    // Sign-in / sign-out
    // ========================================================================

    /// Password sign-in. Also grants the daily login bonus.
    pub async fn login(&self, req: LoginRequest) -> CoreResult<AuthResponse> {
        let account = self
            .ledger
            .find_by_email(&req.email)
            .await?
            .ok_or(CoreError::Unauthenticated)?;
        if !account.is_active || !verify_password(account.password_hash.as_deref(), &req.password)
        {
            return Err(CoreError::Unauthenticated);
        }

        let mut fields = Map::new();
        fields.insert(
            "last_login".into(),
            json!(self.clock.now().timestamp_millis()),
        );
        self.ledger.update_profile(account.id, fields).await?;

        let bonus = self.rewards.daily_login(account.id).await?;
        let account = self.ledger.account(account.id).await?;
        info!(account_id = %account.id, daily_bonus = bonus.is_some(), "Login");
        self.auth_response(&account, bonus.map(|txn| txn.amount))
    }

    /// Exchange an identity-provider session id for a local login session
    pub async fn oauth_session(&self, session_id: &str) -> CoreResult<OAuthLogin> {
        let session_id = session_id.trim();
        if session_id.is_empty() {
            return Err(CoreError::InvalidInput("Session ID required".into()));
        }
        let identity = self.oauth.session_data(session_id).await?;

        let account = match self.ledger.find_by_email(&identity.email).await? {
            Some(account) => account,
            None => {
                let draft = AccountDraft {
                    email: identity.email.clone(),
                    name: identity.name.clone(),
                    external_id: Some(identity.id.clone()),
                    picture: identity.picture.clone(),
                    email_verified: true,
                    ..Default::default()
                };
                match self.rewards.open_account(draft).await {
                    Ok((account, _)) => account,
                    // Lost a race with a concurrent first sign-in
                    Err(CoreError::AlreadyExists(_)) => self
                        .ledger
                        .find_by_email(&identity.email)
                        .await?
                        .ok_or_else(|| CoreError::not_found("Account"))?,
                    Err(e) => return Err(e),
                }
            }
        };
        if !account.is_active {
            return Err(CoreError::Unauthenticated);
        }

        let now = self.clock.now();
        let session = LoginSession {
            session_token: identity.session_token,
            account_id: account.id,
            expires_at: now + Duration::days(self.config.session_ttl_days),
            created_at: now,
        };
        self.store
            .put(
                collections::LOGIN_SESSIONS,
                &session.session_token,
                to_document(&session)?,
            )
            .await?;
        info!(account_id = %account.id, "OAuth session created");

        Ok(OAuthLogin {
            user: AccountView::from(&account),
            session_token: session.session_token,
            expires_at: session.expires_at,
        })
    }

    pub async fn logout(&self, session_token: Option<&str>) -> CoreResult<()> {
        if let Some(token) = session_token {
            self.store
                .delete(collections::LOGIN_SESSIONS, token)
                .await?;
        }
        Ok(())
    }

    // ========================================================================
    // Profile / password
    // ========================================================================

    pub async fn update_phone(&self, account_id: AccountId, phone: &str) -> CoreResult<AccountView> {
        let phone = phone.trim();
        if phone.is_empty() || phone.len() > 32 {
            return Err(CoreError::InvalidInput("phone_number is invalid".into()));
        }
        let mut fields = Map::new();
        fields.insert("phone_number".into(), json!(phone));
        self.ledger.update_profile(account_id, fields).await?;
        Ok(AccountView::from(&self.ledger.account(account_id).await?))
    }

    /// Emails a reset code. Unknown addresses succeed without sending anything.
    pub async fn forgot_password(&self, email: &str) -> CoreResult<()> {
        let email = normalize_email(email)?;
        match self.ledger.find_by_email(&email).await? {
            Some(account) if account.is_active => {
                self.otp.issue(&email, OtpPurpose::PasswordReset).await?;
            }
            _ => info!(email = %email, "Password reset requested for unknown account"),
        }
        Ok(())
    }

    pub async fn reset_password(&self, email: &str, code: &str, new_password: &str) -> CoreResult<()> {
        if !(8..=128).contains(&new_password.len()) {
            return Err(CoreError::InvalidInput(
                "password must be 8 to 128 characters".into(),
            ));
        }
        let account = self
            .ledger
            .find_by_email(email)
            .await?
            .ok_or(CoreError::InvalidCode)?;
        let session_id = self
            .otp
            .verify(email, code.trim(), OtpPurpose::PasswordReset)
            .await?;

        let mut fields = Map::new();
        fields.insert("password_hash".into(), json!(hash_password(new_password)?));
        if let Err(e) = self.ledger.update_profile(account.id, fields).await {
            self.otp.release(session_id).await?;
            return Err(e);
        }
        self.otp.discard(session_id).await?;
        self.revoke_sessions(account.id).await?;
        info!(account_id = %account.id, "Password reset");
        Ok(())
    }

    // ========================================================================
    // Tokens
    // ========================================================================

    pub fn issue_token(&self, account: &Account) -> CoreResult<String> {
        let now = self.clock.now();
        let claims = Claims {
            sub: account.id.to_string(),
            role: account.role,
            exp: (now + Duration::minutes(self.config.token_ttl_minutes)).timestamp() as usize,
            iat: now.timestamp() as usize,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| CoreError::InvalidInput(format!("Failed to generate token: {}", e)))
    }

    /// Verify JWT token. Expiry is judged against the service clock.
    pub fn verify_token(&self, token: &str) -> CoreResult<Claims> {
        let decoding_key = DecodingKey::from_secret(self.config.jwt_secret.as_bytes());
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        let claims = decode::<Claims>(token, &decoding_key, &validation)
            .map_err(|_| CoreError::Unauthenticated)?
            .claims;
        if (claims.exp as i64) < self.clock.now().timestamp() {
            return Err(CoreError::Unauthenticated);
        }
        Ok(claims)
    }

    /// Session cookie first, then bearer token
    pub async fn authenticate(
        &self,
        session_token: Option<&str>,
        bearer: Option<&str>,
    ) -> CoreResult<AuthenticatedAccount> {
        if let Some(token) = session_token {
            if let Some(account_id) = self.live_session(token).await? {
                if let Some(account) = self.active_account(account_id).await? {
                    return Ok(AuthenticatedAccount {
                        account_id: account.id,
                        role: account.role,
                    });
                }
            }
        }

        let claims = self.verify_token(bearer.ok_or(CoreError::Unauthenticated)?)?;
        let account_id: AccountId = claims
            .sub
            .parse()
            .map_err(|_| CoreError::Unauthenticated)?;
        // Role comes from the record, not the token, so demotions apply at once
        let account = self
            .active_account(account_id)
            .await?
            .ok_or(CoreError::Unauthenticated)?;
        Ok(AuthenticatedAccount {
            account_id: account.id,
            role: account.role,
        })
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn auth_response(&self, account: &Account, daily_bonus: Option<Decimal>) -> CoreResult<AuthResponse> {
        Ok(AuthResponse {
            access_token: self.issue_token(account)?,
            token_type: "bearer".to_string(),
            user: AccountView::from(account),
            daily_bonus,
        })
    }

    async fn live_session(&self, token: &str) -> CoreResult<Option<AccountId>> {
        let Some(doc) = self.store.get(collections::LOGIN_SESSIONS, token).await? else {
            return Ok(None);
        };
        let session: LoginSession = from_document(doc)?;
        if session.expires_at <= self.clock.now() {
            return Ok(None);
        }
        Ok(Some(session.account_id))
    }

    async fn active_account(&self, id: AccountId) -> CoreResult<Option<Account>> {
        match self.ledger.account(id).await {
            Ok(account) if account.is_active => Ok(Some(account)),
            Ok(_) | Err(CoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn revoke_sessions(&self, account_id: AccountId) -> CoreResult<()> {
        let filter = Filter::new().eq("account_id", account_id.to_string());
        for doc in self
            .store
            .find(collections::LOGIN_SESSIONS, &filter, None, None)
            .await?
        {
            let session: LoginSession = from_document(doc)?;
            self.store
                .delete(collections::LOGIN_SESSIONS, &session.session_token)
                .await?;
        }
        Ok(())
    }
}

fn hash_password(password: &str) -> CoreResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| CoreError::InvalidInput(format!("Hashing failed: {}", e)))
}

/// False for OAuth-only accounts, which have no password
fn verify_password(hash: Option<&str>, password: &str) -> bool {
    let Some(parsed) = hash.and_then(|h| PasswordHash::new(h).ok()) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}
