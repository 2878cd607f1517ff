//! Remote tracker seams.
//!
//! The sync never talks HTTP itself: Launchpad and Jira are reached through
//! [`SourceTracker`] and [`DestinationTracker`]. Every call is a blocking
//! round trip and every failure is returned as [`TrackerError`] untouched.

use lpsync_core::{codec, BugKey, DestinationIssue, Priority, SourceTask, TaskStatus};
use thiserror::Error;

/// Errors raised by tracker implementations.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// Network, HTTP status or authentication failure.
    #[error("{operation} request failed: {message}")]
    Request {
        operation: &'static str,
        message: String,
    },

    /// The tracker answered with a payload that could not be decoded.
    #[error("{operation} returned an unexpected payload: {message}")]
    Decode {
        operation: &'static str,
        message: String,
    },

    /// No workflow transition with that name (or target status) is available.
    #[error("issue {key} has no transition named '{transition}'")]
    UnknownTransition { key: String, transition: String },

    #[error("issue {0} not found")]
    IssueNotFound(String),
}

/// Issue searches the sync issues against the destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueQuery {
    /// Imported issues (`LP#` in the summary) that are not Done or Rejected.
    Active { project: String },
    /// Issues of any status whose summary matches the `LP#{id} [{pkg}]` prefix.
    ByKey { project: String, key: BugKey },
}

impl IssueQuery {
    /// JQL rendering of the query.
    pub fn jql(&self) -> String {
        match self {
            IssueQuery::Active { project } => format!(
                "project = {project} AND summary ~ \"LP#\" AND status not in (Done, \"Rejected\")"
            ),
            IssueQuery::ByKey { project, key } => format!(
                "project = \"{project}\" AND summary ~ '\"{}\"'",
                codec::prefix(key.bug_id, &key.package)
            ),
        }
    }
}

/// Fields of an issue to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIssue {
    pub project: String,
    pub summary: String,
    pub description: String,
    pub issue_type: String,
    pub priority: Option<Priority>,
    pub checklist: Option<String>,
    pub assignee: Option<String>,
    pub components: Vec<String>,
}

/// Field edits for an existing issue. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueUpdate {
    pub summary: Option<String>,
    pub checklist: Option<String>,
    pub assignee: Option<String>,
    pub priority: Option<Priority>,
    /// Replaces the whole component list.
    pub components: Option<Vec<String>>,
}

impl IssueUpdate {
    pub fn is_empty(&self) -> bool {
        *self == IssueUpdate::default()
    }
}

/// A titled hyperlink attached to an issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteLink {
    pub url: String,
    pub title: String,
    pub icon_url: String,
}

/// The bug tracker tasks are read from.
pub trait SourceTracker {
    /// All bug tasks tagged `tag` whose status is one of `statuses`.
    fn search_tasks(&self, tag: &str, statuses: &[TaskStatus])
        -> Result<Vec<SourceTask>, TrackerError>;
}

/// The issue tracker the sync writes to.
pub trait DestinationTracker {
    /// One page of results, starting at `start_at`. An empty page ends the result set.
    fn search_issues(
        &self,
        query: &IssueQuery,
        start_at: usize,
        max_results: usize,
    ) -> Result<Vec<DestinationIssue>, TrackerError>;

    fn create_issue(&self, issue: &NewIssue) -> Result<DestinationIssue, TrackerError>;

    fn update_issue(&self, key: &str, update: &IssueUpdate) -> Result<(), TrackerError>;

    /// Move the issue through the named workflow transition.
    fn transition_issue(&self, key: &str, transition: &str) -> Result<(), TrackerError>;

    fn add_comment(&self, key: &str, body: &str) -> Result<(), TrackerError>;

    fn add_simple_link(&self, key: &str, link: &RemoteLink) -> Result<(), TrackerError>;

    /// Component names declared by the project.
    fn project_components(&self, project: &str) -> Result<Vec<String>, TrackerError>;
}
