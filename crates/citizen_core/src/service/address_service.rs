//! Read-only address change queries.

use crate::model::mapper::{to_citizen_with_changed_address, CitizenWithChangedAddress};
use crate::repo::citizen_repo::{AddressFilter, CitizenRepository};
use crate::service::ServiceResult;

/// Query surface over citizen addresses.
pub struct AddressService<R: CitizenRepository> {
    repo: R,
}

impl<R: CitizenRepository> AddressService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Addresses whose owner changed at or after `since` (epoch ms).
    ///
    /// `None` returns every address; no match yields an empty list.
    pub fn get_changed_since(
        &self,
        since: Option<i64>,
    ) -> ServiceResult<Vec<CitizenWithChangedAddress>> {
        let rows = self.repo.find_changed_since(since)?;
        Ok(rows.iter().map(to_citizen_with_changed_address).collect())
    }

    /// Addresses matching every set field of `filter`.
    pub fn find_addresses(
        &self,
        filter: &AddressFilter,
    ) -> ServiceResult<Vec<CitizenWithChangedAddress>> {
        let rows = self.repo.find_addresses(filter)?;
        Ok(rows.iter().map(to_citizen_with_changed_address).collect())
    }
}
