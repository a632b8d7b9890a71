//! Background jobs.
//!
//! - `sweeper`: periodic cleanup of stale failed-login windows

pub mod sweeper;

pub use sweeper::{SweeperHandle, SweeperStats, spawn_tracker_sweeper};
