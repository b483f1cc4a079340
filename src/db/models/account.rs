//! Account models and DTOs.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::FromRow;

use super::json_column;

/// Account roles. Fixed at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Manages events, approvals and every interview
    Admin,
    /// Schedules and runs interviews
    Interviewer,
    /// Applies to events and takes interviews
    Interviewee,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Interviewer => "interviewer",
            Role::Interviewee => "interviewee",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "interviewer" => Ok(Role::Interviewer),
            "interviewee" => Ok(Role::Interviewee),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

/// Account row. The password hash never leaves the storage boundary; use
/// [`AccountResponse`] for anything sent to a client.
#[derive(Debug, Clone, FromRow)]
pub struct Account {
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub details: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Account {
    /// Get the role as a Role enum. Unknown values degrade to the least
    /// privileged role.
    pub fn role_enum(&self) -> Role {
        self.role.parse().unwrap_or(Role::Interviewee)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountResponse {
    pub email: String,
    pub role: Role,
    pub details: Value,
    pub created_at: String,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            role: account.role_enum(),
            details: json_column(account.details.as_deref()),
            email: account.email,
            created_at: account.created_at,
        }
    }
}

/// `PUT /users` body. Every field besides email, password and role is kept
/// as free-form account details.
#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ResetPasswordResponse {
    pub reset: bool,
    pub temporary_password: String,
}
