//! Field-level reconciliation of one Jira issue with its Launchpad task-set.
//!
//! [`plan`] compares the two sides and returns the minimal list of
//! [`FieldChange`]s; [`apply`] performs them with one field update, the
//! needed transitions and a single audit comment. Each rule only fires
//! while its field is out of sync, so reconciling an already synced pair
//! makes no remote call.

use std::collections::BTreeMap;

use serde::Serialize;

use lpsync_core::{
    codec, BugKey, DestinationIssue, Importance, IssueStatus, ParentBug, Priority, SourceTask,
    SyncConfig, TeamMember,
};

use crate::tracker::{DestinationTracker, IssueUpdate, NewIssue, TrackerError};

/// Prefix of every comment the sync posts.
pub const BOT_TAG: &str = "{jira-bot}";

/// Subscriber link suffix of the Ubuntu sponsors team.
pub const SPONSOR_TEAM: &str = "/~ubuntu-sponsors";

/// Inputs shared by every reconciliation of a run.
#[derive(Debug, Clone, Copy)]
pub struct ReconcileContext<'a> {
    pub config: &'a SyncConfig,
    /// Components declared by the Jira project; only fetched when a component mapping is set.
    pub project_components: &'a [String],
}

/// Why a status transition is needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusReason {
    /// Imported issues leave the initial status once they are known to be tracked.
    Untriaged,
    /// The sponsors team is subscribed to the bug. Only with `sponsor_rule` on.
    SponsorSubscribed,
}

/// One field brought in line with Launchpad.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "field", rename_all = "snake_case")]
pub enum FieldChange {
    Title {
        summary: String,
    },
    Status {
        transition: String,
        status: String,
        reason: StatusReason,
    },
    Checklist {
        checklist: String,
    },
    Assignee {
        account_id: String,
        display_name: String,
    },
    Priority {
        priority: Priority,
        importance: Importance,
    },
    Component {
        component: String,
        package: String,
    },
}

impl FieldChange {
    /// Short imperative description for logs and reports.
    pub fn describe(&self) -> String {
        match self {
            FieldChange::Title { .. } => "sync title".to_owned(),
            FieldChange::Status { status, .. } => format!("move to {status}"),
            FieldChange::Checklist { .. } => "update series checklist".to_owned(),
            FieldChange::Assignee { display_name, .. } => format!("assign to {display_name}"),
            FieldChange::Priority { priority, .. } => format!("set priority to {priority}"),
            FieldChange::Component { component, .. } => format!("set component to {component}"),
        }
    }

    /// Line of the audit comment explaining the change.
    pub fn audit_line(&self, bug_id: u64, tag: &str) -> String {
        match self {
            FieldChange::Title { .. } => {
                format!("Fixed out of sync title with LP: #{bug_id}")
            }
            FieldChange::Status {
                status,
                reason: StatusReason::Untriaged,
                ..
            } => format!("LP: #{bug_id} is tagged {tag}, moved to {status}"),
            FieldChange::Status {
                status,
                reason: StatusReason::SponsorSubscribed,
                ..
            } => format!("ubuntu-sponsors is subscribed to LP: #{bug_id}, moved to {status}"),
            FieldChange::Checklist { .. } => {
                format!("Updated series checklist from LP: #{bug_id}")
            }
            FieldChange::Assignee { display_name, .. } => {
                format!("Assigned to {display_name} as in LP: #{bug_id}")
            }
            FieldChange::Priority {
                priority,
                importance,
            } => format!("Priority set to {priority} from LP: #{bug_id} importance {importance}"),
            FieldChange::Component { component, package } => {
                format!("Component set to {component} for package {package}")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Derived values
// ---------------------------------------------------------------------------

/// Series checklist, or `None` for single-task sets.
pub fn checklist(tasks: &[SourceTask]) -> Option<String> {
    if tasks.len() < 2 {
        return None;
    }
    let mut out = String::from("# Default checklist");
    for task in tasks {
        let checked = if task.is_complete { "x" } else { "" };
        out.push_str(&format!(
            "\n* [{checked}] {} - {} - {}",
            codec::series_name(&task.title),
            task.status,
            task.importance
        ));
    }
    Some(out)
}

/// Jira account of the first assigned task, when its Launchpad name is mapped.
pub fn assignee<'a>(
    tasks: &[SourceTask],
    team_ids: &'a BTreeMap<String, TeamMember>,
) -> Option<&'a TeamMember> {
    let link = tasks.iter().find_map(|task| task.assignee_link.as_deref())?;
    let name = &link[link.rfind('~')? + 1..];
    team_ids.get(name)
}

/// Mapped component of the primary task's package, if the project declares it.
///
/// Returns `(component, package)`.
pub fn component(tasks: &[SourceTask], ctx: &ReconcileContext<'_>) -> Option<(String, String)> {
    ctx.config.components.as_ref()?;
    let package = codec::task_package(&tasks.first()?.title)?;
    let component = ctx.config.package_to_component(&package)?;
    if !ctx.project_components.iter().any(|c| c == component) {
        tracing::debug!("component {component} is not declared by {}", ctx.config.project);
        return None;
    }
    Some((component.to_owned(), package))
}

fn sponsor_subscribed(bug: &ParentBug) -> bool {
    bug.subscriber_links
        .iter()
        .any(|link| link.ends_with(SPONSOR_TEAM))
}

fn status_change(
    bug: &ParentBug,
    issue: &DestinationIssue,
    config: &SyncConfig,
) -> Option<FieldChange> {
    let triage_stage = issue.status.is_untriaged() || issue.status.0 == IssueStatus::TRIAGED;
    if config.sponsor_rule && triage_stage && sponsor_subscribed(bug) {
        let sponsoring = &config.transitions.sponsoring;
        return Some(FieldChange::Status {
            transition: sponsoring.clone(),
            status: sponsoring.clone(),
            reason: StatusReason::SponsorSubscribed,
        });
    }
    issue.status.is_untriaged().then(|| FieldChange::Status {
        transition: config.transitions.triaged.clone(),
        status: IssueStatus::TRIAGED.to_owned(),
        reason: StatusReason::Untriaged,
    })
}

fn retitled_summary(summary: &str, primary: &SourceTask) -> Option<String> {
    let title = &primary.bug.title;
    codec::retitle(summary, title).or_else(|| {
        let key = codec::task_key(&primary.title)?;
        Some(codec::render(key.bug_id, &key.package, title))
    })
}

// ---------------------------------------------------------------------------
// Plan / apply
// ---------------------------------------------------------------------------

/// Field changes needed to bring `issue` in line with `tasks`. Empty for an empty set.
pub fn plan(
    tasks: &[SourceTask],
    issue: &DestinationIssue,
    ctx: &ReconcileContext<'_>,
) -> Vec<FieldChange> {
    let Some(primary) = tasks.first() else {
        return vec![];
    };
    let bug = &primary.bug;
    let mut changes = Vec::new();

    if !issue.summary.contains(bug.title.as_str()) {
        match retitled_summary(&issue.summary, primary) {
            Some(summary) => changes.push(FieldChange::Title { summary }),
            None => tracing::warn!("{}: cannot rebuild summary '{}'", issue.key, issue.summary),
        }
    }

    if let Some(change) = status_change(bug, issue, ctx.config) {
        changes.push(change);
    }

    if let Some(checklist) = checklist(tasks) {
        if issue.checklist.as_deref() != Some(checklist.as_str()) {
            changes.push(FieldChange::Checklist { checklist });
        }
    }

    if let Some(team_ids) = &ctx.config.team_ids {
        if let Some(member) = assignee(tasks, team_ids) {
            if issue.assignee.is_none() {
                changes.push(FieldChange::Assignee {
                    account_id: member.id.clone(),
                    display_name: member.name.clone(),
                });
            }
        }
    }

    let priority = Priority::from(primary.importance);
    if issue.priority != Some(priority) {
        changes.push(FieldChange::Priority {
            priority,
            importance: primary.importance,
        });
    }

    if let Some((component, package)) = component(tasks, ctx) {
        if !issue.components.contains(&component) {
            changes.push(FieldChange::Component { component, package });
        }
    }

    changes
}

/// Perform `changes` on `issue`: one field update, then transitions, then one audit comment.
///
/// `issue` is updated in place to match what was written.
pub fn apply(
    tracker: &dyn DestinationTracker,
    issue: &mut DestinationIssue,
    changes: &[FieldChange],
    bug_id: u64,
    tag: &str,
) -> Result<(), TrackerError> {
    if changes.is_empty() {
        return Ok(());
    }

    let mut update = IssueUpdate::default();
    let mut transitions = Vec::new();
    for change in changes {
        match change {
            FieldChange::Title { summary } => update.summary = Some(summary.clone()),
            FieldChange::Status {
                transition, status, ..
            } => transitions.push((transition, status)),
            FieldChange::Checklist { checklist } => update.checklist = Some(checklist.clone()),
            FieldChange::Assignee { account_id, .. } => update.assignee = Some(account_id.clone()),
            FieldChange::Priority { priority, .. } => update.priority = Some(*priority),
            FieldChange::Component { component, .. } => {
                update.components = Some(vec![component.clone()])
            }
        }
    }

    if !update.is_empty() {
        tracker.update_issue(&issue.key, &update)?;
        merge_update(issue, update);
    }
    for (transition, status) in transitions {
        tracker.transition_issue(&issue.key, transition)?;
        issue.status = IssueStatus::from(status.as_str());
    }

    tracker.add_comment(&issue.key, &audit_comment(changes, bug_id, tag))?;
    Ok(())
}

/// Plan and, unless the run is a dry run, apply. Returns the changes either way.
pub fn reconcile(
    tracker: &dyn DestinationTracker,
    tasks: &[SourceTask],
    issue: &mut DestinationIssue,
    ctx: &ReconcileContext<'_>,
) -> Result<Vec<FieldChange>, TrackerError> {
    let changes = plan(tasks, issue, ctx);
    let Some(primary) = tasks.first() else {
        return Ok(changes);
    };

    let dry_run = ctx.config.dry_run;
    for change in &changes {
        if dry_run {
            tracing::info!("[dry-run] would {} on {}", change.describe(), issue.key);
        } else {
            tracing::info!("-> {} on {}", change.describe(), issue.key);
        }
    }
    if !dry_run {
        apply(tracker, issue, &changes, primary.bug.id, &ctx.config.tag)?;
    }
    Ok(changes)
}

/// Fields of a new issue for `key`, already in sync with `tasks` except for status.
pub fn new_issue(key: &BugKey, tasks: &[SourceTask], ctx: &ReconcileContext<'_>) -> Option<NewIssue> {
    let primary = tasks.first()?;
    let assignee = ctx
        .config
        .team_ids
        .as_ref()
        .and_then(|team_ids| assignee(tasks, team_ids))
        .map(|member| member.id.clone());

    Some(NewIssue {
        project: ctx.config.project.clone(),
        summary: codec::render(key.bug_id, &key.package, &primary.bug.title),
        description: primary.bug.description.clone(),
        issue_type: "Bug".to_owned(),
        priority: Some(Priority::from(primary.importance)),
        checklist: checklist(tasks),
        assignee,
        components: component(tasks, ctx)
            .map(|(component, _)| vec![component])
            .unwrap_or_default(),
    })
}

fn audit_comment(changes: &[FieldChange], bug_id: u64, tag: &str) -> String {
    let mut body = String::from(BOT_TAG);
    for change in changes {
        body.push('\n');
        body.push_str(&change.audit_line(bug_id, tag));
    }
    body
}

fn merge_update(issue: &mut DestinationIssue, update: IssueUpdate) {
    if let Some(summary) = update.summary {
        issue.summary = summary;
    }
    if update.checklist.is_some() {
        issue.checklist = update.checklist;
    }
    if update.assignee.is_some() {
        issue.assignee = update.assignee;
    }
    if update.priority.is_some() {
        issue.priority = update.priority;
    }
    if let Some(components) = update.components {
        issue.components = components;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
