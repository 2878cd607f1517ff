//! Domain types shared by the aggregator, indexer and reconciler.
//!
//! Launchpad values (task status, importance) and Jira values (priority)
//! serialize with the exact display strings the trackers use, so the same
//! enums round-trip through config files and REST payloads.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::UnknownVariant;

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

/// The `(bug id, package)` pair correlating a Launchpad task-set with a Jira issue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BugKey {
    pub bug_id: u64,
    pub package: String,
}

impl BugKey {
    pub fn new(bug_id: u64, package: impl Into<String>) -> Self {
        Self {
            bug_id,
            package: package.into(),
        }
    }
}

impl fmt::Display for BugKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LP: #{} [{}]", self.bug_id, self.package)
    }
}

// ---------------------------------------------------------------------------
// Launchpad enums
// ---------------------------------------------------------------------------

/// Status of a Launchpad bug task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    New,
    Incomplete,
    Opinion,
    Invalid,
    #[serde(rename = "Won't Fix")]
    WontFix,
    Expired,
    Confirmed,
    Triaged,
    #[serde(rename = "In Progress")]
    InProgress,
    Deferred,
    #[serde(rename = "Fix Committed")]
    FixCommitted,
    #[serde(rename = "Fix Released")]
    FixReleased,
    #[serde(rename = "Does Not Exist")]
    DoesNotExist,
    Unknown,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 14] = [
        TaskStatus::New,
        TaskStatus::Incomplete,
        TaskStatus::Opinion,
        TaskStatus::Invalid,
        TaskStatus::WontFix,
        TaskStatus::Expired,
        TaskStatus::Confirmed,
        TaskStatus::Triaged,
        TaskStatus::InProgress,
        TaskStatus::Deferred,
        TaskStatus::FixCommitted,
        TaskStatus::FixReleased,
        TaskStatus::DoesNotExist,
        TaskStatus::Unknown,
    ];

    /// Statuses searched on Launchpad when the config does not say otherwise.
    pub const DEFAULT_SEARCH: [TaskStatus; 7] = [
        TaskStatus::Triaged,
        TaskStatus::FixCommitted,
        TaskStatus::New,
        TaskStatus::InProgress,
        TaskStatus::Incomplete,
        TaskStatus::Confirmed,
        TaskStatus::FixReleased,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::New => "New",
            TaskStatus::Incomplete => "Incomplete",
            TaskStatus::Opinion => "Opinion",
            TaskStatus::Invalid => "Invalid",
            TaskStatus::WontFix => "Won't Fix",
            TaskStatus::Expired => "Expired",
            TaskStatus::Confirmed => "Confirmed",
            TaskStatus::Triaged => "Triaged",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Deferred => "Deferred",
            TaskStatus::FixCommitted => "Fix Committed",
            TaskStatus::FixReleased => "Fix Released",
            TaskStatus::DoesNotExist => "Does Not Exist",
            TaskStatus::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("task status", s))
    }
}

/// Importance of a Launchpad bug task, highest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Importance {
    Critical,
    High,
    Medium,
    Low,
    Wishlist,
    Undecided,
    Unknown,
}

impl Importance {
    pub const ALL: [Importance; 7] = [
        Importance::Critical,
        Importance::High,
        Importance::Medium,
        Importance::Low,
        Importance::Wishlist,
        Importance::Undecided,
        Importance::Unknown,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Importance::Critical => "Critical",
            Importance::High => "High",
            Importance::Medium => "Medium",
            Importance::Low => "Low",
            Importance::Wishlist => "Wishlist",
            Importance::Undecided => "Undecided",
            Importance::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Importance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Importance {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Importance::ALL
            .into_iter()
            .find(|importance| importance.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("importance", s))
    }
}

// ---------------------------------------------------------------------------
// Jira enums and newtypes
// ---------------------------------------------------------------------------

/// Jira issue priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    Highest,
    High,
    Medium,
    Low,
    Lowest,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Highest => "Highest",
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
            Priority::Lowest => "Lowest",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Highest" => Ok(Priority::Highest),
            "High" => Ok(Priority::High),
            "Medium" => Ok(Priority::Medium),
            "Low" => Ok(Priority::Low),
            "Lowest" => Ok(Priority::Lowest),
            other => Err(UnknownVariant::new("priority", other)),
        }
    }
}

/// Fixed importance → priority table. Exhaustive over [`Importance`].
impl From<Importance> for Priority {
    fn from(importance: Importance) -> Self {
        match importance {
            Importance::Unknown => Priority::Medium,
            Importance::Undecided => Priority::Low,
            Importance::Critical => Priority::Highest,
            Importance::High => Priority::High,
            Importance::Medium => Priority::Medium,
            Importance::Low => Priority::Low,
            Importance::Wishlist => Priority::Lowest,
        }
    }
}

/// A Jira workflow status name. Workflows are project-specific, so any name is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IssueStatus(pub String);

impl IssueStatus {
    pub const UNTRIAGED: &'static str = "Untriaged";
    pub const TRIAGED: &'static str = "Triaged";
    pub const DONE: &'static str = "Done";
    pub const REJECTED: &'static str = "Rejected";

    /// Initial status of freshly imported issues.
    pub fn is_untriaged(&self) -> bool {
        self.0 == Self::UNTRIAGED
    }

    /// `Done` and `Rejected`: nothing further is expected of the issue.
    pub fn is_terminal(&self) -> bool {
        self.0 == Self::DONE || self.0 == Self::REJECTED
    }
}

impl fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for IssueStatus {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for IssueStatus {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

/// The Launchpad bug every task of a task-set belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentBug {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub web_link: String,
    /// API links of subscribed people and teams. Only fetched when the sponsor rule is on.
    #[serde(default)]
    pub subscriber_links: Vec<String>,
}

/// One Launchpad bug task: a bug against a single package/series target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceTask {
    /// `Bug #1234 in pkg (Ubuntu Jammy): "title"`
    pub title: String,
    /// `pkg (Ubuntu Jammy)`
    pub bug_target_name: String,
    pub status: TaskStatus,
    pub importance: Importance,
    #[serde(default)]
    pub assignee_link: Option<String>,
    #[serde(default)]
    pub is_complete: bool,
    pub bug: ParentBug,
}

/// A Jira issue as seen by the reconciler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationIssue {
    pub key: String,
    pub summary: String,
    pub status: IssueStatus,
    #[serde(default)]
    pub checklist: Option<String>,
    /// Jira account id of the assignee.
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub components: Vec<String>,
}

/// A Jira account a Launchpad identity maps to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMember {
    pub id: String,
    pub name: String,
}

/// Tasks sharing one [`BugKey`], in Launchpad order. The first task is the primary one.
pub type TaskSet = Vec<SourceTask>;

/// Aggregated task-sets by key.
pub type TaskSets = BTreeMap<BugKey, TaskSet>;

/// Active Jira issues by key, rebuilt every run.
pub type IssueIndex = BTreeMap<BugKey, DestinationIssue>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
