//! CLI error types and exit codes

use thiserror::Error;

use dnac_connector::error::ConnectorError;
use dnac_connector_rest::ConfigError;
use dnac_intent::IntentError;

/// Exit codes for the CLI
/// - 0: Success
/// - 1: General error
/// - 2: Authentication failed
/// - 3: Network error
/// - 4: Validation error
/// - 5: Controller rejected the change
/// - 130: Interrupted
pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error(transparent)]
    Connector(#[from] ConnectorError),

    #[error(transparent)]
    Intent(#[from] IntentError),
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) | CliError::Io(_) => 1,
            CliError::Validation(_) => 4,
            CliError::Connector(e) => connector_exit_code(e),
            CliError::Intent(e) => match e.root() {
                IntentError::Validation { .. }
                | IntentError::Normalization(_)
                | IntentError::EntityTypeMismatch(_)
                | IntentError::TagNotFound { .. } => 4,
                IntentError::RemoteExecution { .. } => 5,
                IntentError::PollTimeout { .. } => 3,
                IntentError::Cancelled { .. } => 130,
                IntentError::Lookup { source, .. } | IntentError::Connector(source) => {
                    connector_exit_code(source)
                }
                IntentError::Internal { .. } | IntentError::Interrupted { .. } => 1,
            },
        }
    }

    /// Print the error to stderr with appropriate formatting
    pub fn print(&self) {
        let use_color = std::env::var("NO_COLOR").is_err();

        if use_color {
            eprintln!("\x1b[31mError:\x1b[0m {self}");
        } else {
            eprintln!("Error: {self}");
        }

        if let Some(suggestion) = self.suggestion() {
            if use_color {
                eprintln!("\n\x1b[33mSuggestion:\x1b[0m {suggestion}");
            } else {
                eprintln!("\nSuggestion: {suggestion}");
            }
        }
    }

    /// Get a suggested action for this error
    fn suggestion(&self) -> Option<&'static str> {
        match self {
            CliError::Config(_) => {
                Some("Set DNAC_HOST, DNAC_USERNAME and DNAC_PASSWORD, or put them in a .env file.")
            }
            CliError::Connector(ConnectorError::AuthenticationFailed) => {
                Some("Check DNAC_USERNAME and DNAC_PASSWORD.")
            }
            CliError::Connector(e) if e.is_transient() => {
                Some("Run `dnac doctor` to check controller connectivity.")
            }
            CliError::Intent(e) if matches!(e.root(), IntentError::PollTimeout { .. }) => Some(
                "The change may still complete on the controller. Re-run apply to converge.",
            ),
            _ => None,
        }
    }
}

fn connector_exit_code(error: &ConnectorError) -> i32 {
    match error {
        ConnectorError::AuthenticationFailed
        | ConnectorError::TokenExpired
        | ConnectorError::AuthorizationFailed { .. } => 2,
        ConnectorError::InvalidConfiguration { .. } => 1,
        ConnectorError::InvalidData { .. } => 4,
        e if e.is_transient() => 3,
        _ => 5,
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Config(format!("JSON error: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_exit_code_validation() {
        assert_eq!(CliError::Validation("bad".to_string()).exit_code(), 4);
        assert_eq!(
            CliError::Intent(IntentError::validation(vec!["entry 0: x".to_string()])).exit_code(),
            4
        );
    }

    #[test]
    fn test_exit_code_auth_failed() {
        assert_eq!(
            CliError::Connector(ConnectorError::AuthenticationFailed).exit_code(),
            2
        );
    }

    #[test]
    fn test_exit_code_network_error() {
        assert_eq!(
            CliError::Connector(ConnectorError::connection_failed("reset")).exit_code(),
            3
        );
    }

    #[test]
    fn test_exit_code_remote_execution() {
        let error = CliError::Intent(IntentError::RemoteExecution {
            message: "Invalid parent".to_string(),
        });
        assert_eq!(error.exit_code(), 5);
        assert_eq!(error.to_string(), "Invalid parent");
    }

    #[test]
    fn test_exit_code_poll_timeout() {
        let error = CliError::Intent(IntentError::PollTimeout {
            execution_id: "e1".into(),
            attempts: 3,
            elapsed: Duration::from_secs(3),
        });
        assert_eq!(error.exit_code(), 3);
    }

    #[test]
    fn test_exit_code_after_partial_apply() {
        let error = CliError::Intent(IntentError::Interrupted {
            completed: Vec::new(),
            source: Box::new(IntentError::RemoteExecution {
                message: "Invalid parent".to_string(),
            }),
        });
        assert_eq!(error.exit_code(), 5);
        assert_eq!(error.to_string(), "Invalid parent");
    }

    #[test]
    fn test_config_error_conversion() {
        let error: CliError = ConfigError::MissingVar("DNAC_HOST".to_string()).into();
        assert_eq!(error.exit_code(), 1);
        assert!(error.to_string().contains("DNAC_HOST"));
    }
}
