//! Domain model for meals and cart lines.
//!
//! # Responsibility
//! - Define the canonical meal record shared by every category view.
//! - Keep cart lines in the same shape as meals.
//!
//! # Invariants
//! - Every stored meal is identified by a stable `MealId`.
//! - Categories form a closed set.

pub mod meal;
