//! Output module for reporting harvest state
//!
//! This module handles:
//! - Gathering a status report from the progress, result and asset files
//! - Printing that report for the `--status` command

pub mod stats;

pub use stats::{gather_status, print_status, StatusReport};
