use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs;

/// Environment variable that overrides `auth.jwt_secret`
pub const JWT_SECRET_ENV: &str = "APP_JWT_SECRET";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    /// Emit every ledger posting on the `LEDGER` target
    #[serde(default = "default_true")]
    pub enable_ledger_audit: bool,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub otp: OtpConfig,
    #[serde(default)]
    pub email: EmailConfig,
    #[serde(default)]
    pub oauth: OAuthConfig,
    #[serde(default)]
    pub settlement: SettlementConfig,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Postgres,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    /// Required when `backend: postgres`
    #[serde(default)]
    pub postgres_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Bearer token lifetime (30 days)
    pub token_ttl_minutes: i64,
    /// Cookie session lifetime after OAuth sign-in
    pub session_ttl_days: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "change-me-in-production".to_string(),
            token_ttl_minutes: 30 * 24 * 60,
            session_ttl_days: 7,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LedgerConfig {
    pub default_virtual_seed: Decimal,
    pub registration_bonus: Decimal,
    pub daily_login_bonus: Decimal,
    pub video_ad_bonus: Decimal,
    /// Most recent transactions returned by history
    pub history_limit: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            default_virtual_seed: Decimal::from(10_000),
            registration_bonus: Decimal::from(10_000),
            daily_login_bonus: Decimal::from(100),
            video_ad_bonus: Decimal::from(1_000),
            history_limit: 1000,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OtpConfig {
    pub ttl_minutes: i64,
    /// How long a verified registration code stays redeemable
    pub registration_token_ttl_minutes: i64,
    /// Drop earlier unconsumed codes for the same email and purpose on issue
    pub invalidate_previous: bool,
    pub sweep_interval_secs: u64,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: 10,
            registration_token_ttl_minutes: 30,
            invalidate_previous: false,
            sweep_interval_secs: 300,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmailProvider {
    /// Write the message to the log instead of sending it
    #[default]
    Log,
    Http,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EmailConfig {
    #[serde(default)]
    pub provider: EmailProvider,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    pub from: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            provider: EmailProvider::Log,
            endpoint: None,
            api_key: None,
            from: "no-reply@tradesim.local".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct OAuthConfig {
    /// Session-data endpoint of the identity provider; OAuth is disabled when unset
    #[serde(default)]
    pub endpoint: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SettlementConfig {
    /// Positions of one row settled in parallel
    pub concurrency: usize,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self { concurrency: 16 }
    }
}

impl AppConfig {
    pub fn load(env: &str) -> Result<Self> {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path))?;
        let mut config = Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path))?;

        if let Ok(secret) = std::env::var(JWT_SECRET_ENV) {
            config.auth.jwt_secret = secret;
        }
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: AppConfig = serde_yaml::from_str(content)?;
        if config.storage.backend == StorageBackend::Postgres && config.storage.postgres_url.is_none()
        {
            anyhow::bail!("storage.postgres_url is required for the postgres backend");
        }
        if config.settlement.concurrency == 0 {
            anyhow::bail!("settlement.concurrency must be at least 1");
        }
        Ok(config)
    }
}
