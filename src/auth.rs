//! Client-credential authentication against the Microsoft identity platform.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{Result, SweepError};
use crate::models::TokenResponse;

/// Default Microsoft identity platform host.
pub const AUTHORITY_HOST: &str = "https://login.microsoftonline.com";

/// Application-permission scope for Microsoft Graph.
const GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";

const CLIENT_ASSERTION_TYPE: &str = "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";

/// Refresh tokens this long before they expire.
const EXPIRY_BUFFER: Duration = Duration::from_secs(60);

/// How the application proves its identity.
#[derive(Clone)]
pub enum ClientCredential {
    Secret(String),
    /// PEM-encoded RSA private key and the hex SHA-1 thumbprint of its certificate.
    Certificate {
        private_key_pem: String,
        thumbprint: String,
    },
}

impl std::fmt::Debug for ClientCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientCredential::Secret(_) => f.write_str("Secret(***)"),
            ClientCredential::Certificate { thumbprint, .. } => f
                .debug_struct("Certificate")
                .field("thumbprint", thumbprint)
                .finish_non_exhaustive(),
        }
    }
}

/// JWT claims for a certificate client assertion.
#[derive(Debug, Serialize)]
struct AssertionClaims {
    aud: String,
    iss: String,
    sub: String,
    jti: String,
    nbf: u64,
    exp: u64,
}

/// Cached access token with expiration.
#[derive(Clone)]
struct CachedToken {
    access_token: String,
    expires_at: SystemTime,
}

/// Acquires and caches Graph access tokens for one app registration.
#[derive(Clone)]
pub struct Authenticator {
    tenant_id: String,
    client_id: String,
    credential: ClientCredential,
    authority_host: String,
    client: Client,
    cached_token: Arc<RwLock<Option<CachedToken>>>,
}

impl Authenticator {
    /// Create a new authenticator for the given tenant and app registration.
    pub fn new(tenant_id: String, client_id: String, credential: ClientCredential) -> Result<Self> {
        if tenant_id.trim().is_empty() {
            return Err(SweepError::AuthenticationError("tenant id is empty".to_string()));
        }
        if client_id.trim().is_empty() {
            return Err(SweepError::AuthenticationError("client id is empty".to_string()));
        }

        Ok(Self {
            tenant_id,
            client_id,
            credential,
            authority_host: AUTHORITY_HOST.to_string(),
            client: Client::new(),
            cached_token: Arc::new(RwLock::new(None)),
        })
    }

    /// Point token requests at a different authority host (sovereign clouds, tests).
    pub fn with_authority_host(mut self, host: impl Into<String>) -> Self {
        self.authority_host = host.into();
        self
    }

    /// Token endpoint for the configured tenant.
    pub fn token_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority_host.trim_end_matches('/'),
            self.tenant_id
        )
    }

    /// Get a valid access token, refreshing if necessary.
    pub async fn get_access_token(&self) -> Result<String> {
        // Reuse the cached token while it has more than the buffer left
        {
            let cached = self.cached_token.read().await;
            if let Some(token) = cached.as_ref() {
                if token.expires_at > SystemTime::now() + EXPIRY_BUFFER {
                    return Ok(token.access_token.clone());
                }
            }
        }

        let new_token = self.refresh_token().await?;

        // Cache the new token
        {
            let mut cached = self.cached_token.write().await;
            *cached = Some(new_token.clone());
        }

        Ok(new_token.access_token)
    }

    async fn refresh_token(&self) -> Result<CachedToken> {
        let token_url = self.token_url();
        debug!(tenant = %self.tenant_id, "requesting Graph access token");

        let mut params: Vec<(&str, String)> = vec![
            ("grant_type", "client_credentials".to_string()),
            ("client_id", self.client_id.clone()),
            ("scope", GRAPH_SCOPE.to_string()),
        ];

        // Prove the app's identity with whichever credential was configured
        match &self.credential {
            ClientCredential::Secret(secret) => {
                params.push(("client_secret", secret.clone()));
            }
            ClientCredential::Certificate {
                private_key_pem,
                thumbprint,
            } => {
                let assertion =
                    self.client_assertion(&token_url, private_key_pem, thumbprint)?;
                params.push(("client_assertion_type", CLIENT_ASSERTION_TYPE.to_string()));
                params.push(("client_assertion", assertion));
            }
        }

        let response = self.client.post(&token_url).form(&params).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SweepError::TokenRefreshError(format!(
                "Status {}: {}",
                status, body
            )));
        }

        // Parse token response
        let token_response: TokenResponse = response.json().await?;
        let expires_at = SystemTime::now() + Duration::from_secs(token_response.expires_in);

        Ok(CachedToken {
            access_token: token_response.access_token,
            expires_at,
        })
    }

    /// Build the RS256 client assertion signed with the certificate key.
    fn client_assertion(&self, audience: &str, private_key_pem: &str, thumbprint: &str) -> Result<String> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        let claims = AssertionClaims {
            aud: audience.to_string(),
            iss: self.client_id.clone(),
            sub: self.client_id.clone(),
            jti: uuid::Uuid::new_v4().to_string(),
            nbf: now,
            exp: now + 600,
        };

        // Azure AD matches the signing certificate by x5t
        let mut header = Header::new(Algorithm::RS256);
        header.x5t = Some(thumbprint_to_x5t(thumbprint)?);

        let key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes())?;
        Ok(encode(&header, &claims, &key)?)
    }
}

/// Convert a hex certificate thumbprint into the base64url `x5t` header value.
fn thumbprint_to_x5t(thumbprint: &str) -> Result<String> {
    let cleaned: String = thumbprint
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':')
        .collect();
    let bytes = hex::decode(&cleaned).map_err(|e| {
        SweepError::AuthenticationError(format!("invalid certificate thumbprint: {}", e))
    })?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}
