//! Domain logic shared across the formflow workspace.
//!
//! This crate has zero internal dependencies so it can be used by the
//! persistence layer, the automation engine, the worker, and any future
//! CLI tooling alike.

pub mod action;
pub mod dates;
pub mod error;
pub mod keywords;
pub mod matcher;
pub mod scheduling;
pub mod settings;
pub mod types;
