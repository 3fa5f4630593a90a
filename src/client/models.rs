//! BoincHub API data models

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Admin,
    SuperAdmin,
}

impl Role {
    /// Whether the role grants administrative access
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin | Role::SuperAdmin)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
            Role::SuperAdmin => "super_admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authenticated identity returned by `/auth/me`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// User ID (UUID)
    pub id: String,

    pub username: String,

    pub email: String,

    pub role: Role,

    /// Inactive accounts cannot log in or refresh
    pub is_active: bool,
}

/// A login session as listed by `/auth/sessions`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSession {
    /// Session ID (UUID)
    pub id: String,

    /// Human-readable device name
    pub device_name: String,

    #[serde(default)]
    pub user_agent: String,

    #[serde(default)]
    pub ip_address: String,

    #[serde(default = "default_true")]
    pub is_active: bool,

    #[serde(deserialize_with = "timestamp")]
    pub last_accessed_at: DateTime<Utc>,

    #[serde(
        default,
        deserialize_with = "optional_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,

    /// True for the session making the request
    #[serde(default)]
    pub is_current: bool,
}

fn default_true() -> bool {
    true
}

/// Parse an RFC 3339 timestamp, or a naive ISO-8601 one taken as UTC.
///
/// The backend's SQLite columns carry no timezone, so it emits values such
/// as `2025-03-01T12:00:00.123456` without an offset.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| naive.and_utc())
}

fn timestamp<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", raw)))
}

fn optional_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error> {
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) => parse_timestamp(&raw)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", raw))),
        None => Ok(None),
    }
}

/// Body of `POST /users/register`
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Plain `{"message": ...}` acknowledgement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}
