//! Display model implementations for table and JSON output
//!
//! Display models turn API types into rows with CLI column names.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tabled::Tabled;

use crate::client::{User, UserSession};

/// Identity row for `whoami`
#[derive(Debug, Clone, Tabled, Serialize)]
pub struct UserDisplay {
    #[tabled(rename = "USER ID")]
    pub id: String,

    #[tabled(rename = "USERNAME")]
    pub username: String,

    #[tabled(rename = "EMAIL")]
    pub email: String,

    #[tabled(rename = "ROLE")]
    pub role: String,

    #[tabled(rename = "ACTIVE")]
    pub active: String,
}

impl From<User> for UserDisplay {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role.to_string(),
            active: yes_no(user.is_active),
        }
    }
}

/// Session row for `sessions list`
#[derive(Debug, Clone, Tabled, Serialize)]
pub struct SessionDisplay {
    #[tabled(rename = "SESSION ID")]
    pub id: String,

    #[tabled(rename = "DEVICE")]
    pub device: String,

    #[tabled(rename = "IP ADDRESS")]
    pub ip_address: String,

    #[tabled(rename = "LAST ACTIVE")]
    pub last_active: String,

    #[tabled(rename = "CURRENT")]
    pub current: String,
}

impl SessionDisplay {
    /// Build a row relative to `now`
    pub fn at(session: UserSession, now: DateTime<Utc>) -> Self {
        Self {
            id: session.id,
            device: truncate_string(&session.device_name, 40),
            ip_address: if session.ip_address.is_empty() {
                "--".to_string()
            } else {
                session.ip_address
            },
            last_active: format_age(session.last_accessed_at, now),
            current: if session.is_current {
                "*".to_string()
            } else {
                String::new()
            },
        }
    }
}

impl From<UserSession> for SessionDisplay {
    fn from(session: UserSession) -> Self {
        Self::at(session, Utc::now())
    }
}

fn yes_no(value: bool) -> String {
    if value { "yes" } else { "no" }.to_string()
}

/// Truncate to `max_len` characters with an ellipsis
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Coarse "how long ago" label
pub fn format_age(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(then);
    if elapsed.num_seconds() < 60 {
        "just now".to_string()
    } else if elapsed.num_minutes() < 60 {
        format!("{}m ago", elapsed.num_minutes())
    } else if elapsed.num_hours() < 24 {
        format!("{}h ago", elapsed.num_hours())
    } else {
        format!("{}d ago", elapsed.num_days())
    }
}
