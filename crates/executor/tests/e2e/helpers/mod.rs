//! Shared E2E test helpers.

pub mod log;
pub mod steps;
