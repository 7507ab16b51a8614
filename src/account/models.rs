//! Account data model

use chrono::serde::{ts_milliseconds, ts_milliseconds_option};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::core_types::{AccountId, Amount, SeqNum};

// ============================================================================
// Role / Pool tags
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    User,
    Admin,
}

/// Balance pool. The serialized tag is what transactions record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Pool {
    /// Seed capital
    #[serde(rename = "initial")]
    Virtual,
    /// Trading profit/loss. Only pool eligible for coupon redemption.
    #[serde(rename = "earned_trading")]
    Earnings,
    /// Registration, daily login and ad rewards
    #[serde(rename = "task")]
    Task,
}

impl Pool {
    pub fn as_str(&self) -> &'static str {
        match self {
            Pool::Virtual => "initial",
            Pool::Earnings => "earned_trading",
            Pool::Task => "task",
        }
    }
}

// ============================================================================
// Account
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    /// Absent for accounts created through OAuth sign-in
    #[serde(default)]
    pub password_hash: Option<String>,
    pub role: Role,

    pub virtual_balance: Amount,
    pub earnings_balance: Amount,
    pub task_balance: Amount,
    pub total_investment: Amount,

    #[serde(default)]
    pub external_id: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
    pub is_active: bool,
    pub email_verified: bool,

    #[serde(default, with = "ts_milliseconds_option")]
    pub last_daily_login: Option<DateTime<Utc>>,
    #[serde(default, with = "ts_milliseconds_option")]
    pub last_login: Option<DateTime<Utc>>,
    #[serde(with = "ts_milliseconds")]
    pub created_at: DateTime<Utc>,

    /// Bumped by every ledger mutation; the seq of the latest transaction
    pub ledger_version: SeqNum,
}

impl Account {
    pub fn balance(&self, pool: Pool) -> Amount {
        match pool {
            Pool::Virtual => self.virtual_balance,
            Pool::Earnings => self.earnings_balance,
            Pool::Task => self.task_balance,
        }
    }

    pub(crate) fn balance_mut(&mut self, pool: Pool) -> &mut Amount {
        match pool {
            Pool::Virtual => &mut self.virtual_balance,
            Pool::Earnings => &mut self.earnings_balance,
            Pool::Task => &mut self.task_balance,
        }
    }

    /// Funds an investment may draw on
    pub fn investable(&self) -> Amount {
        self.virtual_balance.saturating_add(self.earnings_balance)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn ledger_fields(&self) -> LedgerFields {
        LedgerFields {
            virtual_balance: self.virtual_balance,
            earnings_balance: self.earnings_balance,
            task_balance: self.task_balance,
            total_investment: self.total_investment,
            ledger_version: self.ledger_version,
        }
    }
}

/// The fields a ledger mutation rewrites, as one single-record update
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerFields {
    pub virtual_balance: Amount,
    pub earnings_balance: Amount,
    pub task_balance: Amount,
    pub total_investment: Amount,
    pub ledger_version: SeqNum,
}

/// Everything needed to open an account except the balances
#[derive(Debug, Clone, Default)]
pub struct AccountDraft {
    pub email: String,
    pub name: String,
    pub phone_number: Option<String>,
    pub password_hash: Option<String>,
    pub role: Role,
    pub external_id: Option<String>,
    pub picture: Option<String>,
    pub email_verified: bool,
}

// ============================================================================
// Views
// ============================================================================

/// Account as returned to clients. Never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AccountView {
    #[schema(value_type = uuid::Uuid)]
    pub id: AccountId,
    #[schema(example = "alice@example.com")]
    pub email: String,
    pub name: String,
    pub phone_number: Option<String>,
    pub role: Role,
    pub picture: Option<String>,
    #[schema(value_type = String, example = "10000")]
    pub virtual_balance: Decimal,
    #[schema(value_type = String, example = "0")]
    pub earnings_balance: Decimal,
    #[schema(value_type = String, example = "10000")]
    pub task_balance: Decimal,
    #[schema(value_type = String, example = "0")]
    pub total_investment: Decimal,
    pub is_active: bool,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&Account> for AccountView {
    fn from(a: &Account) -> Self {
        Self {
            id: a.id,
            email: a.email.clone(),
            name: a.name.clone(),
            phone_number: a.phone_number.clone(),
            role: a.role,
            picture: a.picture.clone(),
            virtual_balance: a.virtual_balance,
            earnings_balance: a.earnings_balance,
            task_balance: a.task_balance,
            total_investment: a.total_investment,
            is_active: a.is_active,
            email_verified: a.email_verified,
            created_at: a.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct WalletSummary {
    #[schema(value_type = String)]
    pub virtual_balance: Decimal,
    #[schema(value_type = String)]
    pub earnings_balance: Decimal,
    #[schema(value_type = String)]
    pub task_balance: Decimal,
    #[schema(value_type = String)]
    pub total_investment: Decimal,
    /// Sum of the three pools
    #[schema(value_type = String)]
    pub total_balance: Decimal,
}

impl From<&Account> for WalletSummary {
    fn from(a: &Account) -> Self {
        Self {
            virtual_balance: a.virtual_balance,
            earnings_balance: a.earnings_balance,
            task_balance: a.task_balance,
            total_investment: a.total_investment,
            total_balance: a.virtual_balance + a.earnings_balance + a.task_balance,
        }
    }
}
