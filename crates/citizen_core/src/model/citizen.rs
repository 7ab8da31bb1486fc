//! Citizen domain model.
//!
//! # Responsibility
//! - Define the canonical citizen record and its owned address records.
//! - Provide the classification visibility rule shared by every lookup.
//!
//! # Invariants
//! - `person_id` is stable and never reused for another citizen.
//! - `personal_number` is non-blank and unique across citizens.
//! - A citizen is classified exactly when `classified` is set.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Internal identifier of a citizen.
pub type PersonId = Uuid;

/// Identifier of one address row.
pub type AddressId = Uuid;

/// Validation failures for citizen records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CitizenValidationError {
    BlankPersonalNumber,
}

impl Display for CitizenValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankPersonalNumber => write!(f, "personal number must not be blank"),
        }
    }
}

impl Error for CitizenValidationError {}

/// Canonical identity record for one person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citizen {
    pub person_id: PersonId,
    /// National identity number. Unique across citizens.
    pub personal_number: String,
    pub givenname: Option<String>,
    pub lastname: Option<String>,
    pub gender: Option<String>,
    pub civil_status: Option<String>,
    /// Date derived from the personal number registration.
    pub nr_date: Option<NaiveDate>,
    /// Classification marker. Any value hides the citizen by default.
    pub classified: Option<String>,
    /// Protected identity flag as delivered by the registry sync.
    pub protected_nr: Option<String>,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Unix epoch milliseconds. Drives "changed since" queries.
    pub updated_at: i64,
    pub addresses: Vec<Address>,
}

impl Citizen {
    /// Creates a new citizen with a generated stable ID.
    pub fn new(personal_number: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), personal_number)
    }

    /// Creates a citizen with a caller-provided ID.
    ///
    /// Used by sync/import paths where identity already exists.
    pub fn with_id(person_id: PersonId, personal_number: impl Into<String>) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            person_id,
            personal_number: personal_number.into(),
            givenname: None,
            lastname: None,
            gender: None,
            civil_status: None,
            nr_date: None,
            classified: None,
            protected_nr: None,
            created_at: now,
            updated_at: now,
            addresses: Vec::new(),
        }
    }

    /// Returns whether this citizen carries a classification marker.
    pub fn is_classified(&self) -> bool {
        self.classified.is_some()
    }

    /// Returns whether a caller with the given opt-in may see this citizen.
    pub fn is_visible(&self, include_classified: bool) -> bool {
        include_classified || !self.is_classified()
    }

    /// Checks record invariants before persistence.
    pub fn validate(&self) -> Result<(), CitizenValidationError> {
        if self.personal_number.trim().is_empty() {
            return Err(CitizenValidationError::BlankPersonalNumber);
        }
        Ok(())
    }
}

/// Postal address owned by one citizen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub id: AddressId,
    pub status: Option<String>,
    pub nr_date: Option<NaiveDate>,
    pub co: Option<String>,
    /// Street line.
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
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Unix epoch milliseconds.
    pub updated_at: i64,
}

impl Address {
    /// Creates an empty address with a generated ID and current timestamps.
    pub fn new() -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            ..Self::default()
        }
    }
}

/// Address row joined with the identity fields of its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressWithOwner {
    pub address: Address,
    pub owner: OwnerSummary,
}

/// Owner fields carried alongside an address in change queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerSummary {
    pub person_id: PersonId,
    pub givenname: Option<String>,
    pub lastname: Option<String>,
    pub gender: Option<String>,
    pub classified: Option<String>,
    /// Owner update timestamp in epoch milliseconds.
    pub updated_at: i64,
}

/// Input for registering a new person.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPerson {
    pub personal_number: Option<String>,
}

impl NewPerson {
    pub fn new(personal_number: impl Into<String>) -> Self {
        Self {
            personal_number: Some(personal_number.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Citizen, CitizenValidationError};

    #[test]
    fn classified_citizen_is_hidden_without_opt_in() {
        let mut citizen = Citizen::new("198001011234");
        assert!(citizen.is_visible(false));

        citizen.classified = Some("J".to_string());
        assert!(!citizen.is_visible(false));
        assert!(citizen.is_visible(true));
    }

    #[test]
    fn validate_rejects_blank_personal_number() {
        let citizen = Citizen::new("   ");
        assert_eq!(
            citizen.validate(),
            Err(CitizenValidationError::BlankPersonalNumber)
        );
    }
}
