//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository and Party calls into use-case level APIs.
//! - Translate storage absence into semantic service errors.

pub mod address_service;
pub mod citizen_service;

use crate::model::citizen::PersonId;
use crate::repo::citizen_repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const ERROR_CITIZEN_NOT_FOUND: &str = "No citizen found with ID";
pub const ERROR_PERSONAL_NUMBER_NOT_FOUND: &str = "No citizen found with personal number";
pub const ERROR_PERSONAL_NUMBER_REQUIRED: &str = "Personal number is required";

/// Service error for citizen use-cases.
#[derive(Debug)]
pub enum ServiceError {
    /// No citizen matches the given person id.
    CitizenNotFound(PersonId),
    /// No citizen matches the given personal number.
    PersonalNumberNotFound(String),
    /// Required input is missing or blank.
    BadRequest(String),
    /// A citizen with this personal number already exists.
    Conflict(String),
    /// Persistence-layer failure.
    Repo(RepoError),
}

/// Coarse classification used by transport layers to pick a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceErrorKind {
    NotFound,
    BadRequest,
    Conflict,
    Internal,
}

impl ServiceError {
    pub fn kind(&self) -> ServiceErrorKind {
        match self {
            Self::CitizenNotFound(_) | Self::PersonalNumberNotFound(_) => {
                ServiceErrorKind::NotFound
            }
            Self::BadRequest(_) => ServiceErrorKind::BadRequest,
            Self::Conflict(_) => ServiceErrorKind::Conflict,
            Self::Repo(_) => ServiceErrorKind::Internal,
        }
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CitizenNotFound(id) => write!(f, "{ERROR_CITIZEN_NOT_FOUND}: {id}"),
            Self::PersonalNumberNotFound(number) => {
                write!(f, "{ERROR_PERSONAL_NUMBER_NOT_FOUND}: {number}")
            }
            Self::BadRequest(message) => write!(f, "{message}"),
            Self::Conflict(number) => {
                write!(f, "Person with personal number {number} already exists")
            }
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::DuplicatePersonalNumber(number) => Self::Conflict(number),
            other => Self::Repo(other),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
