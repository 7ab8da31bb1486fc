//! Citizen domain model and API projections.
//!
//! # Responsibility
//! - Define canonical citizen/address records used by core business logic.
//! - Provide pure conversions into caller-facing response shapes.
//!
//! # Invariants
//! - Every citizen is identified by a stable `PersonId`.
//! - Citizens are never hard-deleted through exposed operations.

pub mod citizen;
pub mod mapper;
