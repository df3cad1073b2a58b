//! # Controller REST Client
//!
//! REST implementation of the inventory capability traits.
//!
//! Talks to the controller's intent API: token authentication, site and tag
//! lookups and mutations, execution and task status, tag membership and
//! device insight queries.
//!
//! ## Features
//!
//! - Session token authentication (`X-Auth-Token`) with re-authentication
//!   when the controller rejects a cached token
//! - Configurable endpoint paths
//! - Retry with exponential backoff for 429/502/503/504 and connection errors
//! - TLS verification controls for lab controllers
//!
//! ## Example
//!
//! ```ignore
//! use dnac_connector::prelude::*;
//! use dnac_connector_rest::{DnacConfig, DnacRestClient};
//!
//! let config = DnacConfig::from_env()?;
//! let client = DnacRestClient::new(config)?;
//! client.test_connection().await?;
//! ```

pub mod config;
pub mod connector;
pub mod retry;

// Re-exports
pub use config::{ConfigError, DnacConfig, EndpointConfig, HttpMethod};
pub use connector::{DnacRestClient, AUTH_TOKEN_HEADER};
pub use retry::{parse_retry_after, LogVerbosity, RetryConfig};
