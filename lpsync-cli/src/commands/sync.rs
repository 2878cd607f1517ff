//! `lpsync sync`: one full Launchpad → Jira cycle.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use lpsync_sync::{pipeline, RunReport};

use super::RunArgs;

/// Arguments for `lpsync sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    #[command(flatten)]
    pub common: RunArgs,

    /// Log what would change without writing to Jira.
    #[arg(long)]
    pub dry_run: bool,
}

impl SyncArgs {
    pub fn run(self) -> Result<()> {
        let session = self.common.open(self.dry_run)?;
        let report = pipeline::run(&session.launchpad, &session.jira, &session.config)
            .with_context(|| format!("sync of {} failed", session.config.project))?;
        print_summary(&session.config.project, &report);
        Ok(())
    }
}

pub(crate) fn print_summary(project: &str, report: &RunReport) {
    let prefix = if report.dry_run { "[dry-run] " } else { "" };
    let started = report.started_at.with_timezone(&chrono::Local);
    tracing::debug!("run started {}", started.format("%Y-%m-%d %H:%M:%S"));
    if report.is_noop() {
        println!(
            "{prefix}{} {project} is in sync ({} tasks, {} tracked bugs)",
            "✓".green(),
            report.fetched_tasks,
            report.actions.len()
        );
        return;
    }
    println!(
        "{prefix}{} {project}: {} created, {} reopened, {} retired, {} field changes",
        "✓".green(),
        report.created(),
        report.reopened(),
        report.retired(),
        report.field_changes()
    );
}
