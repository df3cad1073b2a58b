//! CLI command implementations

pub mod apply;
pub mod devices;
pub mod doctor;
pub mod tag_members;

use std::sync::Arc;

use dnac_connector_rest::{DnacConfig, DnacRestClient};

use crate::error::CliResult;

/// Build a controller client from `DNAC_*` environment variables.
pub fn connect() -> CliResult<Arc<DnacRestClient>> {
    let config = DnacConfig::from_env()?;
    tracing::debug!(config = ?config, "Controller configuration loaded");
    Ok(Arc::new(DnacRestClient::new(config)?))
}

/// Print a value as pretty JSON.
pub fn print_json<T: serde::Serialize>(value: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
