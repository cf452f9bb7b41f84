//! Shared utilities

pub mod arrow_utils;
pub mod logging;
