//! `lpsync plan`: preview a sync without writing.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use lpsync_sync::{pipeline, Action, RunReport};

use super::sync::print_summary;
use super::RunArgs;

/// Arguments for `lpsync plan`.
#[derive(Args, Debug)]
pub struct PlanArgs {
    #[command(flatten)]
    pub common: RunArgs,

    /// Emit the run report as JSON.
    #[arg(long)]
    pub json: bool,
}

impl PlanArgs {
    pub fn run(self) -> Result<()> {
        let session = self.common.open(true)?;
        let report = pipeline::run(&session.launchpad, &session.jira, &session.config)
            .with_context(|| format!("planning {} failed", session.config.project))?;

        if self.json {
            let json = serde_json::to_string_pretty(&report).context("failed to encode report")?;
            println!("{json}");
            return Ok(());
        }
        print_table(&report);
        print_summary(&session.config.project, &report);
        Ok(())
    }
}

#[derive(Tabled)]
struct PlanRow {
    #[tabled(rename = "case")]
    case: String,
    #[tabled(rename = "bug")]
    bug: String,
    #[tabled(rename = "issue")]
    issue: String,
    #[tabled(rename = "changes")]
    changes: String,
}

fn row(action: &Action) -> PlanRow {
    let (case, issue) = match action {
        Action::Reconciled { issue_key, .. } => ("A reconcile".normal(), issue_key.clone()),
        Action::Created { issue_key, .. } => (
            "B create".green(),
            issue_key.clone().unwrap_or_else(|| "(new)".to_owned()),
        ),
        Action::Reopened { issue_key, .. } => ("B reopen".yellow(), issue_key.clone()),
        Action::Retired { issue_key, .. } => ("C retire".red(), issue_key.clone()),
    };
    let changes = action
        .changes()
        .iter()
        .map(|change| change.describe())
        .collect::<Vec<_>>()
        .join("\n");
    PlanRow {
        case: case.to_string(),
        bug: action.key().to_string(),
        issue,
        changes: if changes.is_empty() {
            "·".to_owned()
        } else {
            changes
        },
    }
}

fn print_table(report: &RunReport) {
    let rows: Vec<PlanRow> = report
        .actions
        .iter()
        .filter(|action| {
            !action.changes().is_empty() || !matches!(action, Action::Reconciled { .. })
        })
        .map(row)
        .collect();
    if rows.is_empty() {
        return;
    }
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}
