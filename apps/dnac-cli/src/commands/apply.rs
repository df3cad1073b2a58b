//! Apply a desired-state file

use clap::Args;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use dnac_intent::{DiffOptions, Lifecycle, PollPolicy, ReconcileOptions, ReconcileResult, Reconciler};

use crate::commands::{connect, print_json};
use crate::error::CliResult;
use crate::state_file::load_state;

/// Reconcile the controller with a desired-state file
#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// Path to the desired-state YAML file
    #[arg(short = 'f', long = "file")]
    pub file: PathBuf,

    /// Target state; overrides the file's `state` (default: merged)
    #[arg(long)]
    pub state: Option<Lifecycle>,

    /// Plan and report without changing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Give up polling an execution after this many seconds
    #[arg(long, default_value_t = 600)]
    pub poll_timeout: u64,

    /// Maximum number of status checks per execution
    #[arg(long, default_value_t = 60)]
    pub poll_attempts: u32,

    /// Absolute tolerance when comparing coordinates and dimensions
    #[arg(long, default_value_t = 0.0)]
    pub tolerance: f64,
}

impl ApplyArgs {
    /// Reconciliation options requested on the command line.
    pub fn options(&self) -> ReconcileOptions {
        ReconcileOptions::default()
            .with_dry_run(self.dry_run)
            .with_diff_options(DiffOptions::default().with_tolerance(self.tolerance))
            .with_poll_policy(
                PollPolicy::default()
                    .with_max_attempts(self.poll_attempts)
                    .with_deadline(Duration::from_secs(self.poll_timeout)),
            )
    }
}

/// Pick the lifecycle: command line first, then file, then `merged`.
pub fn resolve_lifecycle(flag: Option<Lifecycle>, file: Option<Lifecycle>) -> Lifecycle {
    flag.or(file).unwrap_or_default()
}

/// Execute the apply command
pub async fn execute(args: ApplyArgs) -> CliResult<()> {
    let state = load_state(&args.file)?;
    let lifecycle = resolve_lifecycle(args.state, state.state);

    tracing::info!(
        file = %args.file.display(),
        entries = state.entries.len(),
        state = %lifecycle,
        dry_run = args.dry_run,
        "Applying desired state"
    );

    let client = connect()?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling");
            on_interrupt.cancel();
        }
    });

    let reconciler = Reconciler::new(client)
        .with_options(args.options())
        .with_cancellation(cancel);

    let result = match reconciler.reconcile(&state.entries, lifecycle).await {
        Ok(result) => result,
        Err(e) => {
            for outcome in e.completed() {
                eprintln!("applied: {} [{}]: {}", outcome.name, outcome.action, outcome.msg);
            }
            return Err(e.into());
        }
    };

    if args.json {
        print_json(&result)?;
    } else {
        print_result(&result, args.dry_run);
    }

    Ok(())
}

fn print_result(result: &ReconcileResult, dry_run: bool) {
    if dry_run {
        println!("Dry run, nothing was changed.");
    }

    println!("changed: {}", result.changed);
    println!("msg: {}", result.msg);

    if result.outcomes.len() > 1 {
        for outcome in &result.outcomes {
            println!("  - {} [{}]: {}", outcome.name, outcome.action, outcome.msg);
        }
    }

    for warning in &result.warnings {
        eprintln!("warning: {warning}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> ApplyArgs {
        ApplyArgs {
            file: PathBuf::from("sites.yaml"),
            state: None,
            dry_run: true,
            json: false,
            poll_timeout: 30,
            poll_attempts: 10,
            tolerance: 0.001,
        }
    }

    #[test]
    fn test_lifecycle_precedence() {
        assert_eq!(resolve_lifecycle(None, None), Lifecycle::Merged);
        assert_eq!(
            resolve_lifecycle(None, Some(Lifecycle::Deleted)),
            Lifecycle::Deleted
        );
        assert_eq!(
            resolve_lifecycle(Some(Lifecycle::Merged), Some(Lifecycle::Deleted)),
            Lifecycle::Merged
        );
    }

    #[test]
    fn test_options_from_args() {
        let options = args().options();
        assert!(options.dry_run);
        assert_eq!(options.diff.tolerance, 0.001);
        assert_eq!(options.poll.max_attempts, 10);
        assert_eq!(options.poll.deadline(), Duration::from_secs(30));
    }
}
