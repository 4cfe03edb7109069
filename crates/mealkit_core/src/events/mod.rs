//! Payload-free change notifications for UI refresh.
//!
//! # Responsibility
//! - Let the service layer announce that meal or cart listings are stale.
//! - Keep subscribers decoupled from any UI notification mechanism.
//!
//! # Invariants
//! - Delivery is synchronous on the publishing thread.
//! - Signals are not queued: a subscriber registered after a publish never
//!   sees it.

mod change_bus;

pub use change_bus::{ChangeBus, ChangeObserver, ChangeSignal, SubscriptionId};
