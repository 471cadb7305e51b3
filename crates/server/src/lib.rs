//! Metadata depot process.
//!
//! This crate wires the store and the notification queue into a running
//! process:
//! - Configuration loading
//! - Index bootstrap and administration
//! - Queue observers and notification housekeeping on fixed schedules

pub mod config;
pub mod scheduler;
pub mod state;

pub use config::load_config;
pub use state::{DepotState, HousekeepingReport};
