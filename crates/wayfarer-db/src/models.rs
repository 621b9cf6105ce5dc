//! Database models

use crate::utils::{parse_datetime, parse_datetime_or_now};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Row;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Error type for parsing models from strings
#[derive(Debug, Clone)]
pub enum ParseError {
    InvalidRole(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::InvalidRole(s) => write!(f, "Invalid role: {}", s),
        }
    }
}

impl std::error::Error for ParseError {}

/// Traveller role
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    User,
    Guide,
    LeadGuide,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Guide => "guide",
            Role::LeadGuide => "lead-guide",
            Role::Admin => "admin",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }

    /// Staff roles run tours; they are not account administrators.
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Guide | Role::LeadGuide)
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::User
    }
}

impl FromStr for Role {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "guide" => Ok(Role::Guide),
            "lead-guide" => Ok(Role::LeadGuide),
            "admin" => Ok(Role::Admin),
            _ => Err(ParseError::InvalidRole(s.to_string())),
        }
    }
}

/// Traveller model
///
/// The credential record: one row per principal. The password hash and the
/// reset-token fields never leave the process; serialization skips them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Traveller {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub active: bool,
    /// Set whenever the password is mutated after creation; never on signup.
    pub password_changed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing)]
    pub reset_token_hash: Option<String>,
    #[serde(skip_serializing)]
    pub reset_token_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Traveller {
    /// True if a session token minted at `issued_at` (Unix seconds) predates
    /// the most recent password change.
    pub fn password_changed_since(&self, issued_at: i64) -> bool {
        match self.password_changed_at {
            Some(changed) => issued_at < changed.timestamp(),
            None => false,
        }
    }
}

/// New traveller (for insertion)
#[derive(Debug, Clone)]
pub struct NewTraveller {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

impl TryFrom<&sqlx::sqlite::SqliteRow> for Traveller {
    type Error = sqlx::Error;

    fn try_from(row: &sqlx::sqlite::SqliteRow) -> Result<Self, Self::Error> {
        let id_str: String = row.try_get("id")?;
        let id = Uuid::parse_str(&id_str).map_err(|e| sqlx::Error::ColumnDecode {
            index: "id".to_string(),
            source: Box::new(e),
        })?;
        let role_str: String = row.try_get("role")?;
        Ok(Traveller {
            id,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            role: Role::from_str(&role_str).unwrap_or(Role::User),
            active: row.try_get("active")?,
            password_changed_at: row
                .try_get::<Option<String>, _>("password_changed_at")?
                .as_deref()
                .and_then(parse_datetime),
            reset_token_hash: row.try_get("reset_token_hash")?,
            reset_token_expires_at: row
                .try_get::<Option<String>, _>("reset_token_expires_at")?
                .as_deref()
                .and_then(parse_datetime),
            created_at: parse_datetime_or_now(&row.try_get::<String, _>("created_at")?),
            updated_at: parse_datetime_or_now(&row.try_get::<String, _>("updated_at")?),
        })
    }
}
