//! Three-way partition of task-sets and indexed issues by bug key.

use lpsync_core::{BugKey, DestinationIssue, IssueIndex, TaskSet, TaskSets};

/// A key present on both sides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matched {
    pub key: BugKey,
    pub tasks: TaskSet,
    pub issue: DestinationIssue,
}

/// Disjoint groups covering every key of both inputs, each in key order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Membership {
    /// Active in Launchpad and Jira.
    pub matched: Vec<Matched>,
    /// Active in Launchpad only.
    pub source_only: Vec<(BugKey, TaskSet)>,
    /// Active in Jira only.
    pub destination_only: Vec<(BugKey, DestinationIssue)>,
}

/// Partition by key equality.
pub fn partition(tasksets: TaskSets, mut issues: IssueIndex) -> Membership {
    let mut membership = Membership::default();
    for (key, tasks) in tasksets {
        match issues.remove(&key) {
            Some(issue) => membership.matched.push(Matched { key, tasks, issue }),
            None => membership.source_only.push((key, tasks)),
        }
    }
    membership.destination_only = issues.into_iter().collect();
    membership
}
