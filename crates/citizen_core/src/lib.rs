//! Core domain logic for the citizen registry.
//! This crate is the single source of truth for business invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod party;
pub mod repo;
pub mod service;

pub use logging::{default_log_level, init_logging, logging_status, LogSink};
pub use model::citizen::{
    Address, AddressWithOwner, Citizen, CitizenValidationError, NewPerson, OwnerSummary, PersonId,
};
pub use model::mapper::{
    CitizenAddress, CitizenExtended, CitizenWithChangedAddress, PersonGuidBatch,
};
pub use party::{
    OAuth2Credentials, PartyClient, PartyClientConfig, PartyError, PartyResolver,
    SUBJECT_TYPE_PRIVATE,
};
pub use repo::citizen_repo::{
    AddressFilter, CitizenListQuery, CitizenRepository, RepoError, RepoResult,
    SqliteCitizenRepository,
};
pub use service::address_service::AddressService;
pub use service::citizen_service::{CitizenService, PARTY_MUNICIPALITY_ID};
pub use service::{ServiceError, ServiceErrorKind, ServiceResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
