//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Map between storage rows and domain records.
//!
//! # Invariants
//! - Writes validate meals before persistence.
//! - Repository APIs return semantic errors (`NotFound`, `InvalidData`) in
//!   addition to storage transport errors.

pub mod meal_repo;
