//! The queue worker: claims pending jobs from Postgres, assembles their
//! execution context, and drives them through the registered executors.

pub mod controls;
pub mod profile_data;
pub mod runner;

pub use runner::{FailureOutcome, Worker};
