//! Google service-account auth (OAuth 2.0 JWT bearer grant).

use std::path::Path;

use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, ReviewDeskError};

pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// The fields of a service-account JSON key that the grant needs.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"[REDACTED]")
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    iss: String,
    scope: String,
    aud: String,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl ServiceAccountKey {
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path).map_err(|e| {
            ReviewDeskError::Config(format!(
                "Failed to read service-account key {}: {}",
                path.display(),
                e
            ))
        })?;
        serde_json::from_str(&data).map_err(|e| {
            ReviewDeskError::Config(format!(
                "Invalid service-account key {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// Signed RS256 assertion for `scope`, valid for one hour from `now`.
    pub fn assertion(&self, scope: &str, now: i64) -> Result<String> {
        let claims = Claims {
            iss: self.client_email.clone(),
            scope: scope.to_string(),
            aud: self.token_uri.clone(),
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };
        let key = EncodingKey::from_rsa_pem(self.private_key.as_bytes())
            .map_err(|e| ReviewDeskError::Config(format!("Invalid service-account private key: {}", e)))?;
        encode(&Header::new(Algorithm::RS256), &claims, &key)
            .map_err(|e| ReviewDeskError::Config(format!("Failed to sign service-account assertion: {}", e)))
    }

    /// Exchange a fresh assertion for an access token.
    pub async fn fetch_access_token(&self, client: &Client, scope: &str) -> Result<String> {
        let assertion = self.assertion(scope, Utc::now().timestamp())?;
        let response = client
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| ReviewDeskError::Provider(format!("Google token request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReviewDeskError::Provider(format!(
                "Google token endpoint returned {}: {}",
                status.as_u16(),
                body
            )));
        }
        let token: TokenResponse = response.json().await.map_err(|e| {
            ReviewDeskError::Provider(format!("Failed to parse Google token response: {}", e))
        })?;
        debug!(client_email = %self.client_email, "Obtained Google access token");
        Ok(token.access_token)
    }
}
