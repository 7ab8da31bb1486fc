//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repository writes enforce `Citizen::validate()` before persistence.
//! - Repository APIs report absence as `Ok(None)`; semantic not-found errors
//!   belong to the service layer.

pub mod citizen_repo;
