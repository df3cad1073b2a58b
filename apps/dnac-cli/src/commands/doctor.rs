//! Doctor command - Diagnose controller configuration and connectivity

use clap::Args;
use serde::Serialize;

use dnac_connector::traits::{InventoryConnector, TagMemberOp};
use dnac_connector_rest::{DnacConfig, DnacRestClient};

use crate::commands::print_json;
use crate::error::{CliError, CliResult};

const RESET: &str = "\x1b[0m";

/// Arguments for the doctor command
#[derive(Args, Debug)]
pub struct DoctorArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticStatus {
    Pass,
    Fail,
    Skip,
}

impl DiagnosticStatus {
    fn symbol(self) -> &'static str {
        match self {
            DiagnosticStatus::Pass => "✓",
            DiagnosticStatus::Fail => "✗",
            DiagnosticStatus::Skip => "-",
        }
    }

    fn color(self) -> &'static str {
        match self {
            DiagnosticStatus::Pass => "\x1b[32m",
            DiagnosticStatus::Fail => "\x1b[31m",
            DiagnosticStatus::Skip => "\x1b[90m",
        }
    }
}

/// One diagnostic check.
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticCheck {
    pub name: &'static str,
    pub status: DiagnosticStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl DiagnosticCheck {
    pub fn pass(name: &'static str, message: impl Into<String>) -> Self {
        Self {
            name,
            status: DiagnosticStatus::Pass,
            message: message.into(),
            suggestion: None,
        }
    }

    pub fn fail(name: &'static str, message: impl Into<String>, suggestion: &str) -> Self {
        Self {
            name,
            status: DiagnosticStatus::Fail,
            message: message.into(),
            suggestion: Some(suggestion.to_string()),
        }
    }

    pub fn skip(name: &'static str, message: impl Into<String>) -> Self {
        Self {
            name,
            status: DiagnosticStatus::Skip,
            message: message.into(),
            suggestion: None,
        }
    }
}

/// All checks of one doctor run.
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticReport {
    pub checks: Vec<DiagnosticCheck>,
    pub cli_version: &'static str,
}

impl DiagnosticReport {
    pub fn new(checks: Vec<DiagnosticCheck>) -> Self {
        Self {
            checks,
            cli_version: env!("CARGO_PKG_VERSION"),
        }
    }

    pub fn fail_count(&self) -> usize {
        self.checks
            .iter()
            .filter(|c| c.status == DiagnosticStatus::Fail)
            .count()
    }
}

/// Check that the controller configuration is complete.
pub fn check_configuration<F>(reader: F) -> (DiagnosticCheck, Option<DnacConfig>)
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    match DnacConfig::from_reader(reader) {
        Ok(config) => (
            DiagnosticCheck::pass(
                "configuration",
                format!("Controller {} as {}", config.base_url(), config.username),
            ),
            Some(config),
        ),
        Err(e) => (
            DiagnosticCheck::fail(
                "configuration",
                e.to_string(),
                "Set DNAC_HOST, DNAC_USERNAME and DNAC_PASSWORD, or put them in a .env file",
            ),
            None,
        ),
    }
}

async fn check_authentication(client: &DnacRestClient) -> DiagnosticCheck {
    match client.test_connection().await {
        Ok(()) => DiagnosticCheck::pass("authentication", "Token issued"),
        Err(e) => DiagnosticCheck::fail(
            "authentication",
            e.to_string(),
            "Check the controller address, credentials and DNAC_VERIFY",
        ),
    }
}

async fn check_inventory_api(client: &DnacRestClient) -> DiagnosticCheck {
    match client.member_types().await {
        Ok(types) => DiagnosticCheck::pass(
            "inventory_api",
            format!("Inventory API answers ({} member types)", types.len()),
        ),
        Err(e) => DiagnosticCheck::fail(
            "inventory_api",
            e.to_string(),
            "Check that the API user has read access to tags",
        ),
    }
}

/// Run all diagnostic checks
async fn run_all_checks() -> DiagnosticReport {
    let mut checks = Vec::new();

    let (config_check, config) = check_configuration(|key| std::env::var(key));
    checks.push(config_check);

    let client = match config.map(DnacRestClient::new) {
        Some(Ok(client)) => Some(client),
        Some(Err(e)) => {
            checks.push(DiagnosticCheck::fail(
                "client",
                e.to_string(),
                "Check the TLS and timeout settings",
            ));
            None
        }
        None => None,
    };

    match client {
        Some(client) => {
            let auth = check_authentication(&client).await;
            let auth_ok = auth.status == DiagnosticStatus::Pass;
            checks.push(auth);

            if auth_ok {
                checks.push(check_inventory_api(&client).await);
            } else {
                checks.push(DiagnosticCheck::skip(
                    "inventory_api",
                    "Skipped - authentication failed",
                ));
            }
        }
        None => {
            checks.push(DiagnosticCheck::skip(
                "authentication",
                "Skipped - no client",
            ));
            checks.push(DiagnosticCheck::skip("inventory_api", "Skipped - no client"));
        }
    }

    DiagnosticReport::new(checks)
}

fn print_report(report: &DiagnosticReport) {
    let use_color = std::env::var("NO_COLOR").is_err();

    println!();
    println!("dnac doctor");
    println!();

    for check in &report.checks {
        let status = if use_color {
            format!("{}{}{RESET}", check.status.color(), check.status.symbol())
        } else {
            check.status.symbol().to_string()
        };

        println!("  {status} {:<16} {}", check.name, check.message);

        if let Some(ref suggestion) = check.suggestion {
            println!("      └─ {suggestion}");
        }
    }

    println!();
    match report.fail_count() {
        0 => println!("  All checks passed"),
        n => println!("  {n} check(s) failed"),
    }
    println!();
}

/// Execute the doctor command
pub async fn execute(args: DoctorArgs) -> CliResult<()> {
    let report = run_all_checks().await;

    if args.json {
        print_json(&report)?;
    } else {
        print_report(&report);
    }

    match report.fail_count() {
        0 => Ok(()),
        n => Err(CliError::Config(format!("{n} diagnostic check(s) failed"))),
    }
}
