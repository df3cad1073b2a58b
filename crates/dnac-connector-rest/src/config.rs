//! Controller client configuration
//!
//! Connection, credential and endpoint settings for the REST client.
//! Settings load from serde sources or from `DNAC_*` environment variables.

use serde::{Deserialize, Serialize};

use dnac_connector::config::{
    ConnectionSettings, ConnectorConfig, TlsConfig, REDACTED,
};
use dnac_connector::error::{ConnectorError, ConnectorResult};

use crate::retry::{LogVerbosity, RetryConfig};

/// HTTP method for API operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// Configuration for the controller REST client.
#[derive(Clone, Serialize, Deserialize)]
pub struct DnacConfig {
    /// Controller hostname or IP address.
    pub host: String,

    /// HTTPS port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// URL scheme (`https`; `http` only for lab setups and tests).
    #[serde(default = "default_scheme")]
    pub scheme: String,

    /// API user.
    pub username: String,

    /// API password.
    pub password: String,

    /// Controller release the payloads target.
    #[serde(default = "default_version")]
    pub version: String,

    /// TLS configuration.
    #[serde(default)]
    pub tls: TlsConfig,

    /// Connection settings (timeouts).
    #[serde(default)]
    pub connection: ConnectionSettings,

    /// Endpoint paths.
    #[serde(default)]
    pub endpoints: EndpointConfig,

    /// Retry configuration with exponential backoff.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Logging verbosity for request/response logging.
    #[serde(default)]
    pub log_verbosity: LogVerbosity,
}

fn default_port() -> u16 {
    443
}

fn default_scheme() -> String {
    "https".to_string()
}

fn default_version() -> String {
    "2.3.7.6".to_string()
}

impl std::fmt::Debug for DnacConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DnacConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("scheme", &self.scheme)
            .field("username", &self.username)
            .field("password", &REDACTED)
            .field("version", &self.version)
            .field("tls", &self.tls)
            .field("connection", &self.connection)
            .field("retry", &self.retry)
            .field("log_verbosity", &self.log_verbosity)
            .finish_non_exhaustive()
    }
}

impl DnacConfig {
    /// Create a new config with required fields.
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port: default_port(),
            scheme: default_scheme(),
            username: username.into(),
            password: password.into(),
            version: default_version(),
            tls: TlsConfig::default(),
            connection: ConnectionSettings::default(),
            endpoints: EndpointConfig::default(),
            retry: RetryConfig::default(),
            log_verbosity: LogVerbosity::default(),
        }
    }

    /// Point the client at a full base URL such as `http://127.0.0.1:8080`.
    ///
    /// Used for mock servers; scheme, host and port are taken from the URL.
    pub fn for_base_url(
        base_url: &str,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> ConnectorResult<Self> {
        let url = url::Url::parse(base_url).map_err(|e| ConnectorError::InvalidConfiguration {
            message: format!("invalid base url '{base_url}': {e}"),
        })?;
        let host = url
            .host_str()
            .ok_or_else(|| ConnectorError::InvalidConfiguration {
                message: format!("base url '{base_url}' has no host"),
            })?;
        let port = url
            .port_or_known_default()
            .ok_or_else(|| ConnectorError::InvalidConfiguration {
                message: format!("base url '{base_url}' has no port"),
            })?;

        let mut config = Self::new(host, username, password);
        config.scheme = url.scheme().to_string();
        config.port = port;
        Ok(config)
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_reader(|key| std::env::var(key))
    }

    /// Load configuration from a custom variable reader.
    ///
    /// This allows tests to supply variables without mutating process-global
    /// environment state.
    pub fn from_reader<F>(reader: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Result<String, std::env::VarError>,
    {
        let host = reader("DNAC_HOST").map_err(|_| ConfigError::MissingVar("DNAC_HOST".into()))?;
        let username =
            reader("DNAC_USERNAME").map_err(|_| ConfigError::MissingVar("DNAC_USERNAME".into()))?;
        let password =
            reader("DNAC_PASSWORD").map_err(|_| ConfigError::MissingVar("DNAC_PASSWORD".into()))?;

        let port = reader("DNAC_PORT")
            .unwrap_or_else(|_| default_port().to_string())
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidValue("DNAC_PORT".into(), e.to_string()))?;

        let verify = parse_bool(
            "DNAC_VERIFY",
            &reader("DNAC_VERIFY").unwrap_or_else(|_| "true".to_string()),
        )?;

        let debug = parse_bool(
            "DNAC_DEBUG",
            &reader("DNAC_DEBUG").unwrap_or_else(|_| "false".to_string()),
        )?;

        let mut config = Self::new(host, username, password).with_port(port);
        if let Ok(version) = reader("DNAC_VERSION") {
            config.version = version;
        }
        if let Ok(scheme) = reader("DNAC_SCHEME") {
            config.scheme = scheme;
        }
        if !verify {
            config.tls = TlsConfig::insecure();
        }
        if debug {
            config.log_verbosity = LogVerbosity::Debug;
        }

        Ok(config)
    }

    /// Set the port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the controller release.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Set TLS settings.
    #[must_use]
    pub fn with_tls(mut self, tls: TlsConfig) -> Self {
        self.tls = tls;
        self
    }

    /// Set connection settings.
    #[must_use]
    pub fn with_connection(mut self, connection: ConnectionSettings) -> Self {
        self.connection = connection;
        self
    }

    /// Set endpoint paths.
    #[must_use]
    pub fn with_endpoints(mut self, endpoints: EndpointConfig) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Set retry configuration.
    #[must_use]
    pub fn with_retry(mut self, config: RetryConfig) -> Self {
        self.retry = config;
        self
    }

    /// Disable retries.
    #[must_use]
    pub fn without_retry(mut self) -> Self {
        self.retry = RetryConfig::disabled();
        self
    }

    /// Set logging verbosity.
    #[must_use]
    pub fn with_log_verbosity(mut self, verbosity: LogVerbosity) -> Self {
        self.log_verbosity = verbosity;
        self
    }

    /// Base URL of the controller, without trailing slash.
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }

    /// Build the full URL for an endpoint path.
    pub fn url(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        format!("{}/{}", self.base_url(), path)
    }
}

impl ConnectorConfig for DnacConfig {
    fn validate(&self) -> ConnectorResult<()> {
        if self.host.trim().is_empty() {
            return Err(ConnectorError::InvalidConfiguration {
                message: "host is required".to_string(),
            });
        }
        if self.username.is_empty() {
            return Err(ConnectorError::InvalidConfiguration {
                message: "username is required".to_string(),
            });
        }
        if self.password.is_empty() {
            return Err(ConnectorError::InvalidConfiguration {
                message: "password is required".to_string(),
            });
        }
        if self.scheme != "https" && self.scheme != "http" {
            return Err(ConnectorError::InvalidConfiguration {
                message: format!("unsupported scheme: {}", self.scheme),
            });
        }

        url::Url::parse(&self.base_url()).map_err(|e| ConnectorError::InvalidConfiguration {
            message: format!("invalid controller address: {e}"),
        })?;

        self.tls.validate_security();
        Ok(())
    }

    fn redacted(&self) -> Self {
        let mut config = self.clone();
        config.password = REDACTED.to_string();
        config
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidValue(
            key.to_string(),
            format!("expected a boolean, got '{other}'"),
        )),
    }
}

/// Controller endpoint paths.
///
/// `{id}` is replaced with the entity, execution or task id; `{member_id}`
/// with a tag member id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Token issuance (POST, basic auth).
    #[serde(default = "default_auth_token")]
    pub auth_token: String,

    /// Site collection (GET with `name`, POST).
    #[serde(default = "default_sites")]
    pub sites: String,

    /// Single site (PUT, DELETE).
    #[serde(default = "default_site")]
    pub site: String,

    /// Business API execution status.
    #[serde(default = "default_execution_status")]
    pub execution_status: String,

    /// Task status.
    #[serde(default = "default_task")]
    pub task: String,

    /// Tag collection (GET with `name`, POST, PUT).
    #[serde(default = "default_tags")]
    pub tags: String,

    /// Single tag (GET, DELETE).
    #[serde(default = "default_tag")]
    pub tag: String,

    /// Members of a tag (GET, POST).
    #[serde(default = "default_tag_members")]
    pub tag_members: String,

    /// Single member of a tag (DELETE).
    #[serde(default = "default_tag_member")]
    pub tag_member: String,

    /// Member count of a tag.
    #[serde(default = "default_tag_member_count")]
    pub tag_member_count: String,

    /// Supported member types.
    #[serde(default = "default_tag_member_types")]
    pub tag_member_types: String,

    /// Membership update (PUT).
    #[serde(default = "default_tag_membership")]
    pub tag_membership: String,

    /// Devices of a site still using SNMPv3 with DES.
    #[serde(default = "default_snmp_v3_des_devices")]
    pub snmp_v3_des_devices: String,

    /// ID placeholder in paths (default: "{id}").
    #[serde(default = "default_id_placeholder")]
    pub id_placeholder: String,

    /// Member ID placeholder in paths (default: "{member_id}").
    #[serde(default = "default_member_id_placeholder")]
    pub member_id_placeholder: String,
}

fn default_auth_token() -> String {
    "/dna/system/api/v1/auth/token".to_string()
}

fn default_sites() -> String {
    "/dna/intent/api/v1/site".to_string()
}

fn default_site() -> String {
    "/dna/intent/api/v1/site/{id}".to_string()
}

fn default_execution_status() -> String {
    "/dna/intent/api/v1/dnacaap/management/execution-status/{id}".to_string()
}

fn default_task() -> String {
    "/dna/intent/api/v1/task/{id}".to_string()
}

fn default_tags() -> String {
    "/dna/intent/api/v1/tag".to_string()
}

fn default_tag() -> String {
    "/dna/intent/api/v1/tag/{id}".to_string()
}

fn default_tag_members() -> String {
    "/dna/intent/api/v1/tag/{id}/member".to_string()
}

fn default_tag_member() -> String {
    "/dna/intent/api/v1/tag/{id}/member/{member_id}".to_string()
}

fn default_tag_member_count() -> String {
    "/dna/intent/api/v1/tag/{id}/member/count".to_string()
}

fn default_tag_member_types() -> String {
    "/dna/intent/api/v1/tag/member/type".to_string()
}

fn default_tag_membership() -> String {
    "/dna/intent/api/v1/tag/member".to_string()
}

fn default_snmp_v3_des_devices() -> String {
    "/dna/intent/api/v1/network-device/insight/{id}/insecure-connection".to_string()
}

fn default_id_placeholder() -> String {
    "{id}".to_string()
}

fn default_member_id_placeholder() -> String {
    "{member_id}".to_string()
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            auth_token: default_auth_token(),
            sites: default_sites(),
            site: default_site(),
            execution_status: default_execution_status(),
            task: default_task(),
            tags: default_tags(),
            tag: default_tag(),
            tag_members: default_tag_members(),
            tag_member: default_tag_member(),
            tag_member_count: default_tag_member_count(),
            tag_member_types: default_tag_member_types(),
            tag_membership: default_tag_membership(),
            snmp_v3_des_devices: default_snmp_v3_des_devices(),
            id_placeholder: default_id_placeholder(),
            member_id_placeholder: default_member_id_placeholder(),
        }
    }
}

impl EndpointConfig {
    /// Get the endpoint for an object by ID, replacing the placeholder.
    pub fn endpoint_for_id(&self, template: &str, id: &str) -> String {
        template.replace(&self.id_placeholder, id)
    }

    /// Get the endpoint for a tag member, replacing both placeholders.
    pub fn endpoint_for_member(&self, template: &str, tag_id: &str, member_id: &str) -> String {
        template
            .replace(&self.member_id_placeholder, member_id)
            .replace(&self.id_placeholder, tag_id)
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingVar(String),

    #[error("invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl From<ConfigError> for ConnectorError {
    fn from(err: ConfigError) -> Self {
        ConnectorError::InvalidConfiguration {
            message: err.to_string(),
        }
    }
}
