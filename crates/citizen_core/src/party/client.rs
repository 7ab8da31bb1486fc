//! Blocking HTTP client for the Party service.

use super::oauth2::{OAuth2Credentials, TokenSource};
use super::{PartyError, PartyResolver};
use log::{debug, warn};
use reqwest::blocking::Client;
use reqwest::{StatusCode, Url};
use std::time::Duration;

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for the Party integration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartyClientConfig {
    pub base_url: String,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub oauth2: OAuth2Credentials,
}

impl PartyClientConfig {
    pub fn new(base_url: impl Into<String>, oauth2: OAuth2Credentials) -> Self {
        Self {
            base_url: base_url.into(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            oauth2,
        }
    }
}

/// Party client over `reqwest::blocking`.
///
/// Must be created and dropped outside of an async runtime context.
pub struct PartyClient {
    http: Client,
    base_url: Url,
    tokens: TokenSource,
}

impl PartyClient {
    pub fn new(config: PartyClientConfig) -> Result<Self, PartyError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|err| PartyError::InvalidUrl(format!("{}: {err}", config.base_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(PartyError::InvalidUrl(config.base_url));
        }

        let http = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.read_timeout)
            .build()?;

        Ok(Self {
            http,
            base_url,
            tokens: TokenSource::new(config.oauth2),
        })
    }

    /// Looks up the Party id for `legal_id`.
    ///
    /// Returns `Ok(None)` for 404 or an empty body.
    pub fn try_resolve(
        &self,
        legal_id: &str,
        municipality_id: &str,
        subject_type: &str,
    ) -> Result<Option<String>, PartyError> {
        let url = self.party_id_url(legal_id, municipality_id, subject_type)?;
        let token = self.tokens.bearer_token(&self.http)?;

        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .header(reqwest::header::ACCEPT, "text/plain")
            .send()?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let body = response.text()?;
                let party_id = body.trim();
                Ok((!party_id.is_empty()).then(|| party_id.to_string()))
            }
            status => Err(PartyError::Status(status.as_u16())),
        }
    }

    fn party_id_url(
        &self,
        legal_id: &str,
        municipality_id: &str,
        subject_type: &str,
    ) -> Result<Url, PartyError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| PartyError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend([municipality_id, subject_type, legal_id, "partyId"]);
        Ok(url)
    }
}

impl PartyResolver for PartyClient {
    fn resolve(
        &self,
        personal_number: &str,
        municipality_id: &str,
        subject_type: &str,
    ) -> Option<String> {
        match self.try_resolve(personal_number, municipality_id, subject_type) {
            Ok(party_id) => {
                debug!(
                    "event=party_resolve module=party status=ok municipality_id={} found={}",
                    municipality_id,
                    party_id.is_some()
                );
                party_id
            }
            Err(err) => {
                warn!(
                    "event=party_resolve module=party status=error municipality_id={} error={}",
                    municipality_id, err
                );
                None
            }
        }
    }
}
