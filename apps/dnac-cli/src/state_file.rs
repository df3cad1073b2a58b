//! Desired-state file loading.
//!
//! A state file is YAML, either a bare list of entries or a mapping:
//!
//! ```yaml
//! state: merged
//! config:
//!   - type: building
//!     site:
//!       building:
//!         name: Building1
//!         parentName: Global/USA
//! ```

use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::Path;

use dnac_intent::Lifecycle;

use crate::error::{CliError, CliResult};

/// A loaded desired-state file.
#[derive(Debug, Clone, PartialEq)]
pub struct StateFile {
    /// Lifecycle requested by the file, if any.
    pub state: Option<Lifecycle>,
    /// Raw configuration entries, validated later by the reconciler.
    pub entries: Vec<Value>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawStateFile {
    Entries(Vec<Value>),
    Document {
        #[serde(default)]
        state: Option<Lifecycle>,
        config: Vec<Value>,
    },
}

/// Parse a state file from YAML text.
pub fn parse_state(content: &str) -> CliResult<StateFile> {
    let raw: RawStateFile = serde_yaml::from_str(content).map_err(|e| {
        let location = if let Some(loc) = e.location() {
            format!(" at line {}, column {}", loc.line(), loc.column())
        } else {
            String::new()
        };
        CliError::Validation(format!("Invalid YAML{location}: {e}"))
    })?;

    Ok(match raw {
        RawStateFile::Entries(entries) => StateFile {
            state: None,
            entries,
        },
        RawStateFile::Document { state, config } => StateFile {
            state,
            entries: config,
        },
    })
}

/// Load and parse a state file.
pub fn load_state(path: &Path) -> CliResult<StateFile> {
    if !path.exists() {
        return Err(CliError::Validation(format!(
            "File not found: {}",
            path.display()
        )));
    }

    let content = fs::read_to_string(path)
        .map_err(|e| CliError::Io(format!("Failed to read file {}: {e}", path.display())))?;

    parse_state(&content)
}
