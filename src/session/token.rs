//! Access token model and token-response parsing

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, Result};

/// Lifetime assumed when the backend reports none (BoincHub's default is 30 minutes)
pub const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 30 * 60;

/// Short-lived bearer credential with its absolute expiry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    /// The bearer token string
    pub token: String,

    /// Token expiration time
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    /// Whether the token is still usable, treating it as expired `buffer` early
    pub fn is_live(&self, buffer: Duration) -> bool {
        self.expires_at - buffer > Utc::now()
    }

    /// Build a token from a login/refresh response received at `now`.
    ///
    /// Expiry comes from `expires_in`; failing that, the JWT `exp` claim;
    /// failing that, [`DEFAULT_TOKEN_LIFETIME_SECS`].
    pub fn from_response(response: TokenResponse, now: DateTime<Utc>) -> Result<Self> {
        if !response.token_type.eq_ignore_ascii_case("bearer") {
            return Err(ApiError::InvalidResponse(format!(
                "Unsupported token type: {}",
                response.token_type
            ))
            .into());
        }

        if response.access_token.trim().is_empty() {
            return Err(ApiError::InvalidToken.into());
        }

        let expires_at = match response.expires_in {
            Some(secs) => Duration::try_seconds(secs.max(0))
                .and_then(|lifetime| now.checked_add_signed(lifetime))
                .ok_or_else(|| {
                    ApiError::InvalidResponse(format!("Token lifetime out of range: {}s", secs))
                })?,
            None => jwt_expiry(&response.access_token)
                .unwrap_or_else(|| now + Duration::seconds(DEFAULT_TOKEN_LIFETIME_SECS)),
        };

        Ok(Self {
            token: response.access_token,
            expires_at,
        })
    }
}

/// Body returned by `/auth/login` and `/auth/refresh`
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,

    #[serde(default = "default_token_type")]
    pub token_type: String,

    #[serde(default)]
    pub expires_in: Option<i64>,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// Decode base64url (URL-safe base64 without padding)
fn base64_decode_url(input: &str) -> std::result::Result<Vec<u8>, String> {
    use base64::{Engine as _, engine::general_purpose};

    general_purpose::URL_SAFE_NO_PAD
        .decode(input.trim_end_matches('='))
        .map_err(|e| e.to_string())
}

/// Read the `exp` claim from a JWT without verifying it
fn jwt_expiry(token: &str) -> Option<DateTime<Utc>> {
    #[derive(Deserialize)]
    struct JwtPayload {
        exp: i64,
    }

    // JWT format: header.payload.signature
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return None;
    }

    let payload_bytes = base64_decode_url(parts[1]).ok()?;
    let payload: JwtPayload = serde_json::from_slice(&payload_bytes).ok()?;
    DateTime::from_timestamp(payload.exp, 0)
}
