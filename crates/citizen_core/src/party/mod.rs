//! Upstream Party identity integration.
//!
//! # Responsibility
//! - Resolve a personal number to a Party id for a given municipality.
//! - Absorb upstream failures into an absent result for callers.
//!
//! # Invariants
//! - `PartyResolver::resolve` never fails; errors are logged and become `None`.
//! - Not-found and transport failures are only distinguishable through
//!   `PartyClient::try_resolve`.

mod client;
mod oauth2;

pub use client::{PartyClient, PartyClientConfig, DEFAULT_CONNECT_TIMEOUT, DEFAULT_READ_TIMEOUT};
pub use oauth2::OAuth2Credentials;

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Subject type for private persons in Party paths.
pub const SUBJECT_TYPE_PRIVATE: &str = "PRIVATE";

/// Best-effort personal-number to Party id resolution.
pub trait PartyResolver {
    fn resolve(
        &self,
        personal_number: &str,
        municipality_id: &str,
        subject_type: &str,
    ) -> Option<String>;
}

impl<T: PartyResolver + ?Sized> PartyResolver for &T {
    fn resolve(
        &self,
        personal_number: &str,
        municipality_id: &str,
        subject_type: &str,
    ) -> Option<String> {
        (**self).resolve(personal_number, municipality_id, subject_type)
    }
}

impl<T: PartyResolver + ?Sized> PartyResolver for Arc<T> {
    fn resolve(
        &self,
        personal_number: &str,
        municipality_id: &str,
        subject_type: &str,
    ) -> Option<String> {
        (**self).resolve(personal_number, municipality_id, subject_type)
    }
}

/// Failure talking to Party or its token endpoint.
#[derive(Debug)]
pub enum PartyError {
    /// Base or token URL cannot be used to build request paths.
    InvalidUrl(String),
    Http(reqwest::Error),
    /// Party answered with a non-success status other than 404.
    Status(u16),
    /// Token endpoint rejected the client credentials.
    TokenRejected(u16),
}

impl Display for PartyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidUrl(value) => write!(f, "invalid party url: {value}"),
            Self::Http(err) => write!(f, "party request failed: {err}"),
            Self::Status(code) => write!(f, "party responded with status {code}"),
            Self::TokenRejected(code) => write!(f, "token endpoint responded with status {code}"),
        }
    }
}

impl Error for PartyError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Http(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for PartyError {
    fn from(value: reqwest::Error) -> Self {
        Self::Http(value)
    }
}
