//! OAuth2 client-credentials token acquisition for Party calls.

use super::PartyError;
use log::debug;
use reqwest::blocking::Client;
use serde::Deserialize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(300);
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(30);

/// Client credentials registered with the token endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuth2Credentials {
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<u64>,
}

struct CachedToken {
    access_token: String,
    refresh_at: Instant,
}

/// Reuses one access token until shortly before it expires.
pub(super) struct TokenSource {
    credentials: OAuth2Credentials,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenSource {
    pub(super) fn new(credentials: OAuth2Credentials) -> Self {
        Self {
            credentials,
            cached: Mutex::new(None),
        }
    }

    /// Returns a valid bearer token, fetching a new one when needed.
    pub(super) fn bearer_token(&self, http: &Client) -> Result<String, PartyError> {
        let mut cached = self
            .cached
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.access_token.clone());
            }
        }

        let fresh = self.fetch(http)?;
        let access_token = fresh.access_token.clone();
        *cached = Some(fresh);
        Ok(access_token)
    }

    fn fetch(&self, http: &Client) -> Result<CachedToken, PartyError> {
        let response = http
            .post(self.credentials.token_url.as_str())
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.as_str()),
            ])
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(PartyError::TokenRejected(status.as_u16()));
        }

        let body: TokenResponse = response.json()?;
        let ttl = body
            .expires_in
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TOKEN_TTL);
        debug!(
            "event=oauth2_token module=party status=ok expires_in_secs={}",
            ttl.as_secs()
        );

        Ok(CachedToken {
            access_token: body.access_token,
            refresh_at: Instant::now() + ttl.saturating_sub(TOKEN_REFRESH_MARGIN),
        })
    }
}
