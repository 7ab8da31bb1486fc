//! Citizen lookup and registration service.
//!
//! # Responsibility
//! - Single, batch and paged citizen lookups with classified-visibility filtering.
//! - Person id / personal number resolution, local or through Party.
//! - Person creation with personal-number uniqueness.
//!
//! # Invariants
//! - Classified citizens are returned only when the caller opts in.
//! - Batch lookups never fail as a whole for per-item problems.
//! - The Party branch of id resolution returns the resolver result verbatim.

use crate::model::citizen::{Citizen, NewPerson, PersonId};
use crate::model::mapper::{
    to_citizen_extended, to_citizen_with_changed_address, CitizenExtended,
    CitizenWithChangedAddress, PersonGuidBatch,
};
use crate::party::{PartyResolver, SUBJECT_TYPE_PRIVATE};
use crate::repo::citizen_repo::{CitizenListQuery, CitizenRepository};
use crate::service::{ServiceError, ServiceResult, ERROR_PERSONAL_NUMBER_REQUIRED};
use log::{debug, info, warn};

/// Municipality whose id resolution is delegated to Party.
pub const PARTY_MUNICIPALITY_ID: &str = "2281";

const BATCH_NOT_FOUND_MESSAGE: &str = "Citizen not found";

/// Use-case service over a citizen repository and a Party resolver.
pub struct CitizenService<R: CitizenRepository, P: PartyResolver> {
    repo: R,
    party: P,
}

impl<R: CitizenRepository, P: PartyResolver> CitizenService<R, P> {
    pub fn new(repo: R, party: P) -> Self {
        Self { repo, party }
    }

    /// Gets one citizen by id.
    ///
    /// # Contract
    /// - `CitizenNotFound` when no record exists.
    /// - `Ok(None)` when the record is classified and `include_classified` is false.
    pub fn get_by_id(
        &self,
        person_id: PersonId,
        include_classified: bool,
    ) -> ServiceResult<Option<CitizenExtended>> {
        let citizen = self
            .repo
            .find_by_id(person_id)?
            .ok_or(ServiceError::CitizenNotFound(person_id))?;

        if !citizen.is_visible(include_classified) {
            debug!(
                "event=citizen_get module=service status=hidden person_id={}",
                person_id
            );
            return Ok(None);
        }

        Ok(Some(to_citizen_extended(&citizen)))
    }

    /// Gets every visible citizen among `person_ids`, in input order.
    ///
    /// Unknown ids and hidden classified citizens are omitted.
    pub fn get_by_ids(
        &self,
        person_ids: &[PersonId],
        include_classified: bool,
    ) -> ServiceResult<Vec<CitizenExtended>> {
        let mut citizens = Vec::with_capacity(person_ids.len());
        for person_id in person_ids {
            if let Some(citizen) = self.repo.find_by_id(*person_id)? {
                if citizen.is_visible(include_classified) {
                    citizens.push(to_citizen_extended(&citizen));
                }
            }
        }

        debug!(
            "event=citizen_batch_get module=service status=ok requested={} returned={}",
            person_ids.len(),
            citizens.len()
        );
        Ok(citizens)
    }

    /// Lists citizens page by page, ordered by personal number.
    ///
    /// Classified citizens are filtered by the store unless `query` opts in.
    pub fn list_citizens(&self, query: &CitizenListQuery) -> ServiceResult<Vec<CitizenExtended>> {
        let citizens = self.repo.list_citizens(query)?;
        debug!(
            "event=citizen_list module=service status=ok returned={} offset={}",
            citizens.len(),
            query.offset
        );
        Ok(citizens.iter().map(to_citizen_extended).collect())
    }

    /// Lists citizens whose owner record changed at or after `since` (epoch ms).
    pub fn get_changed_since(
        &self,
        since: Option<i64>,
    ) -> ServiceResult<Vec<CitizenWithChangedAddress>> {
        let rows = self.repo.find_changed_since(since)?;
        Ok(rows.iter().map(to_citizen_with_changed_address).collect())
    }

    /// Returns the personal number registered for `person_id`.
    pub fn get_personal_number_by_id(&self, person_id: PersonId) -> ServiceResult<String> {
        self.repo
            .find_by_id(person_id)?
            .map(|citizen| citizen.personal_number)
            .ok_or(ServiceError::CitizenNotFound(person_id))
    }

    /// Resolves a personal number to a person id.
    ///
    /// # Contract
    /// - `PARTY_MUNICIPALITY_ID`: asks Party with subject type `PRIVATE` and
    ///   returns its answer unchanged, including `None`.
    /// - Any other municipality: local lookup, `PersonalNumberNotFound` when absent.
    pub fn get_id_by_personal_number(
        &self,
        personal_number: &str,
        municipality_id: &str,
    ) -> ServiceResult<Option<String>> {
        if municipality_id == PARTY_MUNICIPALITY_ID {
            return Ok(self
                .party
                .resolve(personal_number, municipality_id, SUBJECT_TYPE_PRIVATE));
        }

        let citizen = self
            .repo
            .find_by_personal_number(personal_number)?
            .ok_or_else(|| ServiceError::PersonalNumberNotFound(personal_number.to_string()))?;
        Ok(Some(citizen.person_id.to_string()))
    }

    /// Resolves each personal number locally, one result entry per input.
    pub fn get_ids_in_batch(&self, personal_numbers: &[String]) -> Vec<PersonGuidBatch> {
        let results: Vec<PersonGuidBatch> = personal_numbers
            .iter()
            .map(
                |personal_number| match self.repo.find_by_personal_number(personal_number) {
                    Ok(Some(citizen)) => PersonGuidBatch::resolved(personal_number, citizen.person_id),
                    Ok(None) => PersonGuidBatch::failed(personal_number, BATCH_NOT_FOUND_MESSAGE),
                    Err(err) => {
                        warn!(
                            "event=citizen_guid_batch module=service status=item_error error={}",
                            err
                        );
                        PersonGuidBatch::failed(
                            personal_number,
                            format!("Error processing request: {err}"),
                        )
                    }
                },
            )
            .collect();

        debug!(
            "event=citizen_guid_batch module=service status=ok requested={} resolved={}",
            results.len(),
            results.iter().filter(|entry| entry.success).count()
        );
        results
    }

    /// Registers a new person and returns the generated id.
    ///
    /// # Contract
    /// - `BadRequest` when input or personal number is missing or blank.
    /// - `Conflict` when the personal number is already registered.
    pub fn create_person(&self, person: Option<&NewPerson>) -> ServiceResult<PersonId> {
        let personal_number = person
            .and_then(|person| person.personal_number.as_deref())
            .filter(|number| !number.trim().is_empty())
            .ok_or_else(|| ServiceError::BadRequest(ERROR_PERSONAL_NUMBER_REQUIRED.to_string()))?;

        if self
            .repo
            .find_by_personal_number(personal_number)?
            .is_some()
        {
            return Err(ServiceError::Conflict(personal_number.to_string()));
        }

        let saved = self.repo.save(&Citizen::new(personal_number))?;
        info!(
            "event=citizen_create module=service status=ok person_id={}",
            saved.person_id
        );
        Ok(saved.person_id)
    }
}
