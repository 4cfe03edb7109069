//! Core persistence and use-case logic for MealKit.
//! This crate owns meal storage, cart promotion and change notifications.

pub mod config;
pub mod db;
pub mod events;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod store;

pub use config::{ConfigError, CoreConfig};
pub use events::{ChangeBus, ChangeObserver, ChangeSignal, SubscriptionId};
pub use logging::{default_log_level, init_logging, logging_status, LogLevel};
pub use model::meal::{Meal, MealCategory, MealId, MealRecord, MealValidationError};
pub use repo::meal_repo::{
    MealField, MealRepository, RepoError, RepoResult, SqliteMealRepository,
};
pub use service::meal_service::{MealService, MealServiceError, MealServiceResult};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
