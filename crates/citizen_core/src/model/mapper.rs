//! Conversions from stored records into caller-facing shapes.
//!
//! All functions here are pure structural transforms.

use crate::model::citizen::{Address, AddressWithOwner, Citizen, PersonId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Full citizen projection returned by id lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CitizenExtended {
    pub person_id: PersonId,
    pub givenname: Option<String>,
    pub lastname: Option<String>,
    pub gender: Option<String>,
    pub civil_status: Option<String>,
    /// `YYYY-MM-DD` when known.
    pub nr_date: Option<String>,
    pub personal_number: String,
    pub classified: Option<String>,
    #[serde(rename = "protectedNR")]
    pub protected_nr: Option<String>,
    pub addresses: Vec<CitizenAddress>,
}

/// Address projection embedded in citizen responses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CitizenAddress {
    pub status: Option<String>,
    pub nr_date: Option<String>,
    pub co: Option<String>,
    pub address: Option<String>,
    pub address_area: Option<String>,
    pub address_number: Option<String>,
    pub address_letter: Option<String>,
    pub apartment_number: Option<String>,
    pub postal_code: Option<String>,
    pub city: Option<String>,
    pub county: Option<String>,
    pub municipality: Option<String>,
    pub country: Option<String>,
    pub address_type: Option<String>,
}

/// One row of a "changed address since" response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CitizenWithChangedAddress {
    pub person_id: PersonId,
    pub classified: Option<String>,
    pub gender: Option<String>,
    pub givenname: Option<String>,
    pub lastname: Option<String>,
    pub address: CitizenAddress,
}

/// Per-input outcome of a batch personal-number resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonGuidBatch {
    pub person_number: String,
    pub person_id: Option<PersonId>,
    pub success: bool,
    pub error_message: Option<String>,
}

impl PersonGuidBatch {
    pub fn resolved(person_number: impl Into<String>, person_id: PersonId) -> Self {
        Self {
            person_number: person_number.into(),
            person_id: Some(person_id),
            success: true,
            error_message: None,
        }
    }

    pub fn failed(person_number: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            person_number: person_number.into(),
            person_id: None,
            success: false,
            error_message: Some(message.into()),
        }
    }
}

pub fn to_citizen_extended(citizen: &Citizen) -> CitizenExtended {
    CitizenExtended {
        person_id: citizen.person_id,
        givenname: citizen.givenname.clone(),
        lastname: citizen.lastname.clone(),
        gender: citizen.gender.clone(),
        civil_status: citizen.civil_status.clone(),
        nr_date: citizen.nr_date.map(format_date),
        personal_number: citizen.personal_number.clone(),
        classified: citizen.classified.clone(),
        protected_nr: citizen.protected_nr.clone(),
        addresses: citizen.addresses.iter().map(to_citizen_address).collect(),
    }
}

pub fn to_citizen_address(address: &Address) -> CitizenAddress {
    CitizenAddress {
        status: address.status.clone(),
        nr_date: address.nr_date.map(format_date),
        co: address.co.clone(),
        address: address.address.clone(),
        address_area: address.address_area.clone(),
        address_number: address.address_number.clone(),
        address_letter: address.address_letter.clone(),
        apartment_number: address.apartment_number.clone(),
        postal_code: address.postal_code.clone(),
        city: address.city.clone(),
        county: address.county.clone(),
        municipality: address.municipality.clone(),
        country: address.country.clone(),
        address_type: address.address_type.clone(),
    }
}

pub fn to_citizen_with_changed_address(row: &AddressWithOwner) -> CitizenWithChangedAddress {
    CitizenWithChangedAddress {
        person_id: row.owner.person_id,
        classified: row.owner.classified.clone(),
        gender: row.owner.gender.clone(),
        givenname: row.owner.givenname.clone(),
        lastname: row.owner.lastname.clone(),
        address: to_citizen_address(&row.address),
    }
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
