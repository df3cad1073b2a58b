//! dnac CLI library
//!
//! Exposes the command modules for integration testing.
//! The binary entry point is in main.rs.

pub mod commands;
pub mod error;
pub mod logging;
pub mod state_file;
