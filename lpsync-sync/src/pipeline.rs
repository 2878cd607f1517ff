//! One sync run: fetch, aggregate, index, partition, then act on each group.
//!
//! Keys tracked on both sides are reconciled (case A). Launchpad-only keys
//! get their issue reopened or created before being reconciled (case B).
//! Jira-only keys are retired to Done (case C). Remote calls are issued one
//! at a time and the first failure ends the run.

use chrono::{DateTime, Utc};
use serde::Serialize;

use lpsync_core::{BugKey, DestinationIssue, IssueStatus, SyncConfig, TaskSet};

use crate::aggregate::aggregate;
use crate::classify::{partition, Matched};
use crate::error::SyncError;
use crate::index::{find_issue, index_issues};
use crate::reconcile::{self, FieldChange, ReconcileContext, BOT_TAG};
use crate::tracker::{DestinationTracker, RemoteLink, SourceTracker};

/// Title of the link from a created issue back to its bug.
pub const LINK_TITLE: &str = "Launchpad Link";

pub const LINK_ICON: &str = "https://bugs.launchpad.net/favicon.ico";

/// What the run did (or, in a dry run, would do) for one key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Tracked on both sides.
    Reconciled {
        key: BugKey,
        issue_key: String,
        changes: Vec<FieldChange>,
    },
    /// No issue existed; `issue_key` is `None` in a dry run.
    Created {
        key: BugKey,
        issue_key: Option<String>,
        changes: Vec<FieldChange>,
    },
    /// A Done or Rejected issue was moved back to the backlog.
    Reopened {
        key: BugKey,
        issue_key: String,
        changes: Vec<FieldChange>,
    },
    /// The bug is no longer tagged or active; the issue was moved to Done.
    Retired { key: BugKey, issue_key: String },
}

impl Action {
    pub fn key(&self) -> &BugKey {
        match self {
            Action::Reconciled { key, .. }
            | Action::Created { key, .. }
            | Action::Reopened { key, .. }
            | Action::Retired { key, .. } => key,
        }
    }

    /// Field changes made by the reconcile pass of this action.
    pub fn changes(&self) -> &[FieldChange] {
        match self {
            Action::Reconciled { changes, .. }
            | Action::Created { changes, .. }
            | Action::Reopened { changes, .. } => changes,
            Action::Retired { .. } => &[],
        }
    }
}

/// Outcome of [`run`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub dry_run: bool,
    /// Tasks returned by the Launchpad search, before aggregation.
    pub fetched_tasks: usize,
    pub actions: Vec<Action>,
}

impl RunReport {
    pub fn created(&self) -> usize {
        self.count(|a| matches!(a, Action::Created { .. }))
    }

    pub fn reopened(&self) -> usize {
        self.count(|a| matches!(a, Action::Reopened { .. }))
    }

    pub fn retired(&self) -> usize {
        self.count(|a| matches!(a, Action::Retired { .. }))
    }

    /// Total field changes across all reconcile passes.
    pub fn field_changes(&self) -> usize {
        self.actions.iter().map(|a| a.changes().len()).sum()
    }

    /// True when the run changed (or would change) nothing.
    pub fn is_noop(&self) -> bool {
        self.actions
            .iter()
            .all(|a| matches!(a, Action::Reconciled { changes, .. } if changes.is_empty()))
    }

    fn count(&self, f: impl Fn(&Action) -> bool) -> usize {
        self.actions.iter().filter(|a| f(a)).count()
    }
}

/// Run one full sync cycle of `config.project` against `config.tag`.
pub fn run(
    source: &dyn SourceTracker,
    destination: &dyn DestinationTracker,
    config: &SyncConfig,
) -> Result<RunReport, SyncError> {
    if config.project.is_empty() {
        return Err(SyncError::MissingSetting("project"));
    }
    if config.tag.is_empty() {
        return Err(SyncError::MissingSetting("tag"));
    }

    let started_at = Utc::now();
    tracing::info!(
        "syncing Launchpad tag '{}' into {}{}",
        config.tag,
        config.project,
        if config.dry_run { " [dry-run]" } else { "" }
    );

    let tasks = source.search_tasks(&config.tag, &config.source_statuses)?;
    let fetched_tasks = tasks.len();
    let tasksets = aggregate(tasks, &config.restricted_packages, &config.special_packages);
    tracing::info!("{fetched_tasks} tasks fetched, {} bug sets tracked", tasksets.len());

    let issues = index_issues(Some(destination), &config.project)?;
    tracing::debug!("{} active issues indexed", issues.len());

    let project_components = match config.components {
        Some(_) => destination.project_components(&config.project)?,
        None => Vec::new(),
    };
    let ctx = ReconcileContext {
        config,
        project_components: &project_components,
    };

    let membership = partition(tasksets, issues);
    let mut actions = Vec::new();

    for matched in membership.matched {
        actions.push(tracked_both(destination, matched, &ctx)?);
    }
    for (key, tasks) in membership.source_only {
        actions.push(source_only(destination, key, &tasks, &ctx)?);
    }
    for (key, issue) in membership.destination_only {
        actions.push(destination_only(destination, key, &issue, config)?);
    }

    Ok(RunReport {
        started_at,
        dry_run: config.dry_run,
        fetched_tasks,
        actions,
    })
}

// ---------------------------------------------------------------------------
// Cases
// ---------------------------------------------------------------------------

fn tracked_both(
    destination: &dyn DestinationTracker,
    matched: Matched,
    ctx: &ReconcileContext<'_>,
) -> Result<Action, SyncError> {
    let Matched {
        key,
        tasks,
        mut issue,
    } = matched;
    tracing::info!("A: {key} is in Jira as {}", issue.key);

    let changes = reconcile::reconcile(destination, &tasks, &mut issue, ctx)?;
    Ok(Action::Reconciled {
        key,
        issue_key: issue.key,
        changes,
    })
}

fn source_only(
    destination: &dyn DestinationTracker,
    key: BugKey,
    tasks: &TaskSet,
    ctx: &ReconcileContext<'_>,
) -> Result<Action, SyncError> {
    let config = ctx.config;
    tracing::info!("B: {key} is not active in Jira");

    match find_issue(destination, &config.project, &key)? {
        Some(mut issue) if issue.status.is_terminal() => {
            reopen(destination, &mut issue, config)?;
            let changes = reconcile::reconcile(destination, tasks, &mut issue, ctx)?;
            Ok(Action::Reopened {
                key,
                issue_key: issue.key,
                changes,
            })
        }
        Some(mut issue) => {
            // Active but missing from the index, e.g. created after the index was built.
            tracing::info!("{key} already exists as {}", issue.key);
            let changes = reconcile::reconcile(destination, tasks, &mut issue, ctx)?;
            Ok(Action::Reconciled {
                key,
                issue_key: issue.key,
                changes,
            })
        }
        None => create(destination, key, tasks, ctx),
    }
}

fn reopen(
    destination: &dyn DestinationTracker,
    issue: &mut DestinationIssue,
    config: &SyncConfig,
) -> Result<(), SyncError> {
    if config.dry_run {
        tracing::info!("[dry-run] would reopen {} from {}", issue.key, issue.status);
    } else {
        tracing::info!("-> reopening {} from {}", issue.key, issue.status);
        destination.transition_issue(&issue.key, &config.transitions.triaged)?;
        destination.add_comment(&issue.key, &reopen_comment(&config.tag))?;
    }
    issue.status = IssueStatus::from(IssueStatus::TRIAGED);
    Ok(())
}

fn create(
    destination: &dyn DestinationTracker,
    key: BugKey,
    tasks: &TaskSet,
    ctx: &ReconcileContext<'_>,
) -> Result<Action, SyncError> {
    let (Some(new), Some(primary)) = (reconcile::new_issue(&key, tasks, ctx), tasks.first()) else {
        return Ok(Action::Created {
            key,
            issue_key: None,
            changes: vec![],
        });
    };

    if ctx.config.dry_run {
        tracing::info!("[dry-run] would create '{}' in {}", new.summary, new.project);
        return Ok(Action::Created {
            key,
            issue_key: None,
            changes: vec![],
        });
    }

    let mut issue = destination.create_issue(&new)?;
    tracing::info!("-> created {} for {key}", issue.key);
    destination.add_simple_link(
        &issue.key,
        &RemoteLink {
            url: primary.bug.web_link.clone(),
            title: LINK_TITLE.to_owned(),
            icon_url: LINK_ICON.to_owned(),
        },
    )?;

    let changes = reconcile::reconcile(destination, tasks, &mut issue, ctx)?;
    Ok(Action::Created {
        key,
        issue_key: Some(issue.key),
        changes,
    })
}

fn destination_only(
    destination: &dyn DestinationTracker,
    key: BugKey,
    issue: &DestinationIssue,
    config: &SyncConfig,
) -> Result<Action, SyncError> {
    tracing::info!("C: {key} is in Jira as {} but not tagged in LP", issue.key);

    if config.dry_run {
        tracing::info!("[dry-run] would move {} to {}", issue.key, config.transitions.done);
    } else {
        tracing::info!("-> moving {} to {}", issue.key, config.transitions.done);
        destination.transition_issue(&issue.key, &config.transitions.done)?;
        destination.add_comment(&issue.key, &retire_comment(key.bug_id, &config.tag))?;
    }
    Ok(Action::Retired {
        key,
        issue_key: issue.key.clone(),
    })
}

fn reopen_comment(tag: &str) -> String {
    format!(
        "{BOT_TAG} This bug is still active and tagged {tag} in LP. \
         It will be moved back to the Backlog as Triaged. \
         If no work is necessary or the bug isn't relevant anymore, please untag the bug in LP."
    )
}

fn retire_comment(bug_id: u64, tag: &str) -> String {
    format!(
        "{BOT_TAG} LP: #{bug_id} is either not tagged {tag} or active at this time. \
         Moving issue to Done. If this is incorrect, check the status of the bug in LaunchPad."
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use lpsync_core::{codec, Importance, ParentBug, Priority, SourceTask, TaskStatus};

    use super::*;
    use crate::memory::{MemoryDestination, MemorySource, Write};

    fn bug(id: u64) -> ParentBug {
        ParentBug {
            id,
            title: format!("crash number {id}"),
            description: format!("details of {id}"),
            web_link: format!("https://bugs.launchpad.net/bugs/{id}"),
            subscriber_links: vec![],
        }
    }

    fn task(id: u64, target: &str, status: TaskStatus) -> SourceTask {
        SourceTask {
            title: format!("Bug #{id} in {target}: \"crash number {id}\""),
            bug_target_name: target.to_owned(),
            status,
            importance: Importance::High,
            assignee_link: None,
            is_complete: matches!(status, TaskStatus::FixReleased | TaskStatus::WontFix),
            bug: bug(id),
        }
    }

    fn config() -> SyncConfig {
        SyncConfig {
            project: "FS".to_owned(),
            tag: "todo".to_owned(),
            restricted_packages: ["vim".to_owned()].into_iter().collect(),
            source_statuses: TaskStatus::ALL.to_vec(),
            ..SyncConfig::default()
        }
    }

    fn issue(key: &str, summary: String, status: &str) -> DestinationIssue {
        DestinationIssue {
            key: key.to_owned(),
            summary,
            status: IssueStatus::from(status),
            checklist: None,
            assignee: None,
            priority: Some(Priority::High),
            components: vec![],
        }
    }

    fn revert_tasks() -> Vec<SourceTask> {
        vec![
            task(7, "vim (Ubuntu)", TaskStatus::FixReleased),
            task(7, "vim (Ubuntu Jammy)", TaskStatus::InProgress),
            task(7, "vim (Ubuntu Focal)", TaskStatus::WontFix),
            task(7, "vim (Ubuntu Noble)", TaskStatus::InProgress),
        ]
    }

    fn transitions(writes: &[Write]) -> Vec<String> {
        writes
            .iter()
            .filter_map(|w| match w {
                Write::Transition { transition, .. } => Some(transition.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn new_bug_is_created_once_and_already_in_sync() {
        let source = MemorySource::new(vec![task(1, "vim (Ubuntu)", TaskStatus::Triaged)]);
        let jira = MemoryDestination::new("FS");

        let report = run(&source, &jira, &config()).expect("run");
        assert_eq!(report.created(), 1);

        let writes = jira.writes();
        let creates = writes.iter().filter(|w| matches!(w, Write::Create { .. })).count();
        let updates = writes.iter().filter(|w| matches!(w, Write::Update { .. })).count();
        assert_eq!(creates, 1);
        assert_eq!(updates, 0, "created issue must not need field edits: {writes:?}");
        assert_eq!(transitions(&writes), vec!["Triaged".to_owned()]);
        assert!(writes.iter().any(|w| matches!(
            w,
            Write::Link { url, .. } if url == "https://bugs.launchpad.net/bugs/1"
        )));

        let created = jira.issue("FS-1").expect("created");
        assert_eq!(created.summary, "LP#1 [vim] crash number 1");
        assert_eq!(report.actions[0].changes().len(), 1);
    }

    #[test]
    fn terminal_issue_is_reopened_instead_of_duplicated() {
        let existing = issue("FS-9", codec::render(7, "vim", "crash number 7"), "Done");
        let jira = MemoryDestination::new("FS").with_issue(existing);
        let source = MemorySource::new(revert_tasks());

        let report = run(&source, &jira, &config()).expect("run");
        assert_eq!(report.reopened(), 1);
        assert_eq!(report.created(), 0);

        let writes = jira.writes();
        assert_eq!(transitions(&writes), vec!["Triaged".to_owned()]);
        assert!(writes.iter().all(|w| w.key() == "FS-9"));
        assert_eq!(jira.issue("FS-9").map(|i| i.status.0), Some("Triaged".to_owned()));
    }

    #[test]
    fn active_issue_is_not_transitioned() {
        let mut existing = issue("FS-9", codec::render(7, "vim", "crash number 7"), "In Progress");
        existing.checklist = reconcile::checklist(&revert_tasks());
        let jira = MemoryDestination::new("FS").with_issue(existing);
        let source = MemorySource::new(revert_tasks());

        let report = run(&source, &jira, &config()).expect("run");
        assert!(report.is_noop(), "{report:?}");
        assert!(transitions(&jira.writes()).is_empty());
    }

    #[test]
    fn untagged_issue_is_retired() {
        let orphan = issue("FS-3", codec::render(5, "vim", "gone"), "Triaged");
        let jira = MemoryDestination::new("FS").with_issue(orphan);
        let source = MemorySource::new(vec![]);

        let report = run(&source, &jira, &config()).expect("run");
        assert_eq!(report.retired(), 1);

        let writes = jira.writes();
        assert_eq!(transitions(&writes), vec!["Done".to_owned()]);
        let comment = writes.iter().find_map(|w| match w {
            Write::Comment { body, .. } => Some(body.clone()),
            _ => None,
        });
        assert!(comment
            .expect("comment")
            .contains("LP: #5 is either not tagged todo or active at this time"));
    }

    #[test]
    fn dry_run_writes_nothing() {
        let orphan = issue("FS-3", codec::render(5, "vim", "gone"), "Triaged");
        let done = issue("FS-4", codec::render(7, "vim", "crash number 7"), "Rejected");
        let jira = MemoryDestination::new("FS").with_issue(orphan).with_issue(done);
        let mut tasks = revert_tasks();
        tasks.push(task(8, "vim (Ubuntu)", TaskStatus::New));
        let source = MemorySource::new(tasks);
        let config = SyncConfig {
            dry_run: true,
            ..config()
        };

        let report = run(&source, &jira, &config).expect("run");
        assert!(report.dry_run);
        assert_eq!((report.created(), report.reopened(), report.retired()), (1, 1, 1));
        assert!(jira.writes().is_empty());
    }

    #[test]
    fn second_run_writes_nothing() {
        let orphan = issue("FS-30", codec::render(5, "vim", "gone"), "Triaged");
        let jira = MemoryDestination::new("FS").with_issue(orphan);
        let mut tasks = revert_tasks();
        tasks.push(task(8, "vim (Ubuntu)", TaskStatus::New));
        let source = MemorySource::new(tasks);

        run(&source, &jira, &config()).expect("first run");
        jira.clear_writes();

        let report = run(&source, &jira, &config()).expect("second run");
        assert!(report.is_noop(), "{report:?}");
        assert!(jira.writes().is_empty(), "{:?}", jira.writes());
    }

    #[test]
    fn retitled_summary_still_matches_on_next_run() {
        let stale = issue("FS-1", "[ignored] LP#5 [vim] old title".to_owned(), "Triaged");
        let jira = MemoryDestination::new("FS").with_issue(stale);
        let source = MemorySource::new(vec![task(5, "vim (Ubuntu)", TaskStatus::Triaged)]);

        run(&source, &jira, &config()).expect("first run");
        assert_eq!(
            jira.issue("FS-1").map(|i| i.summary),
            Some("[ignored] LP#5 [vim] crash number 5".to_owned())
        );
        jira.clear_writes();

        let report = run(&source, &jira, &config()).expect("second run");
        assert!(report.is_noop(), "{report:?}");
        assert!(jira.writes().is_empty(), "{:?}", jira.writes());
        assert_eq!(jira.issues().len(), 1);
    }

    #[test]
    fn all_transition_lands_on_triaged() {
        let config = SyncConfig {
            transitions: lpsync_core::Transitions {
                triaged: "All".to_owned(),
                ..lpsync_core::Transitions::default()
            },
            ..config()
        };
        let jira = MemoryDestination::new("FS").with_transition("All", "Triaged");
        let source = MemorySource::new(vec![task(1, "vim (Ubuntu)", TaskStatus::New)]);

        run(&source, &jira, &config).expect("first run");
        assert_eq!(transitions(&jira.writes()), vec!["All".to_owned()]);
        assert_eq!(jira.issue("FS-1").map(|i| i.status.0), Some("Triaged".to_owned()));
        jira.clear_writes();

        let report = run(&source, &jira, &config).expect("second run");
        assert!(report.is_noop(), "{report:?}");
        assert!(jira.writes().is_empty());
    }

    #[test]
    fn ineligible_sets_are_left_alone() {
        let source = MemorySource::new(vec![
            task(1, "vim (Ubuntu)", TaskStatus::New),
            task(1, "vim (Debian)", TaskStatus::New),
            task(2, "emacs (Ubuntu)", TaskStatus::New),
        ]);
        let jira = MemoryDestination::new("FS");

        let report = run(&source, &jira, &config()).expect("run");
        assert!(report.actions.is_empty());
        assert_eq!(report.fetched_tasks, 3);
        assert!(jira.issues().is_empty());
    }

    #[test]
    fn remote_failure_stops_the_run() {
        let source = MemorySource::new(vec![task(1, "vim (Ubuntu)", TaskStatus::New)]);
        let jira = MemoryDestination::new("FS").failing("create");

        let err = run(&source, &jira, &config()).unwrap_err();
        assert!(matches!(
            err,
            SyncError::Tracker(crate::tracker::TrackerError::Request { operation: "create", .. })
        ));
        assert!(jira.writes().is_empty());
    }

    #[test]
    fn components_are_fetched_only_when_mapped() {
        let source = MemorySource::new(vec![]);
        let jira = MemoryDestination::new("FS").failing("components");
        run(&source, &jira, &config()).expect("no mapping, no fetch");

        let mapped = SyncConfig {
            components: Some(
                [("Editors".to_owned(), vec!["vim".to_owned()])]
                    .into_iter()
                    .collect(),
            ),
            ..config()
        };
        assert!(run(&source, &jira, &mapped).is_err());
    }

    #[test]
    fn empty_project_is_rejected() {
        let config = SyncConfig {
            project: String::new(),
            ..config()
        };
        let err = run(&MemorySource::default(), &MemoryDestination::new("FS"), &config).unwrap_err();
        assert!(matches!(err, SyncError::MissingSetting("project")));
    }

    #[test]
    fn report_serializes_with_action_tags() {
        let source = MemorySource::new(vec![task(1, "vim (Ubuntu)", TaskStatus::Triaged)]);
        let jira = MemoryDestination::new("FS");
        let report = run(&source, &jira, &config()).expect("run");

        let json = serde_json::to_value(&report).expect("json");
        assert_eq!(json["actions"][0]["action"], "created");
        assert_eq!(json["actions"][0]["issue_key"], "FS-1");
        assert_eq!(json["actions"][0]["changes"][0]["field"], "status");
    }
}
