//! Shared handler state and blocking service access.
//!
//! # Invariants
//! - The connection lock is held for one repository call at a time, never
//!   across a Party request.

use crate::error::ApiError;
use citizen_core::{
    AddressFilter, AddressService, AddressWithOwner, Citizen, CitizenListQuery,
    CitizenRepository, CitizenService, PartyResolver, PersonId, RepoResult,
    SqliteCitizenRepository,
};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

pub type SharedResolver = Arc<dyn PartyResolver + Send + Sync>;

pub type SharedCitizenService = CitizenService<SharedCitizenRepository, SharedResolver>;

/// Citizen store over the process-wide connection.
///
/// Each call locks the connection for its own duration only.
#[derive(Clone)]
pub struct SharedCitizenRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SharedCitizenRepository {
    fn locked<T>(
        &self,
        work: impl FnOnce(&SqliteCitizenRepository<'_>) -> RepoResult<T>,
    ) -> RepoResult<T> {
        let conn = self
            .conn
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let repo = SqliteCitizenRepository::try_new(&conn)?;
        work(&repo)
    }
}

impl CitizenRepository for SharedCitizenRepository {
    fn find_by_id(&self, id: PersonId) -> RepoResult<Option<Citizen>> {
        self.locked(|repo| repo.find_by_id(id))
    }

    fn find_by_personal_number(&self, personal_number: &str) -> RepoResult<Option<Citizen>> {
        self.locked(|repo| repo.find_by_personal_number(personal_number))
    }

    fn find_changed_since(&self, since: Option<i64>) -> RepoResult<Vec<AddressWithOwner>> {
        self.locked(|repo| repo.find_changed_since(since))
    }

    fn find_addresses(&self, filter: &AddressFilter) -> RepoResult<Vec<AddressWithOwner>> {
        self.locked(|repo| repo.find_addresses(filter))
    }

    fn list_citizens(&self, query: &CitizenListQuery) -> RepoResult<Vec<Citizen>> {
        self.locked(|repo| repo.list_citizens(query))
    }

    fn save(&self, citizen: &Citizen) -> RepoResult<Citizen> {
        self.locked(|repo| repo.save(citizen))
    }
}

#[derive(Clone)]
pub struct AppState {
    repo: SharedCitizenRepository,
    party: SharedResolver,
    default_municipality_id: Arc<str>,
}

impl AppState {
    /// `conn` must come from `citizen_core::db::open_db*`.
    pub fn new(conn: Connection, party: SharedResolver, default_municipality_id: &str) -> Self {
        Self {
            repo: SharedCitizenRepository {
                conn: Arc::new(Mutex::new(conn)),
            },
            party,
            default_municipality_id: Arc::from(default_municipality_id),
        }
    }

    pub fn default_municipality_id(&self) -> &str {
        &self.default_municipality_id
    }

    /// Runs `work` against a citizen service on the blocking pool.
    pub async fn with_citizen_service<T, F>(&self, work: F) -> Result<T, ApiError>
    where
        T: Send + 'static,
        F: FnOnce(&SharedCitizenService) -> Result<T, ApiError> + Send + 'static,
    {
        let service = CitizenService::new(self.repo.clone(), Arc::clone(&self.party));
        run_blocking(move || work(&service)).await
    }

    /// Runs `work` against an address service on the blocking pool.
    pub async fn with_address_service<T, F>(&self, work: F) -> Result<T, ApiError>
    where
        T: Send + 'static,
        F: FnOnce(&AddressService<SharedCitizenRepository>) -> Result<T, ApiError>
            + Send
            + 'static,
    {
        let service = AddressService::new(self.repo.clone());
        run_blocking(move || work(&service)).await
    }
}

async fn run_blocking<T, F>(work: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(ApiError::internal)?
}
