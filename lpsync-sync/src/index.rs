//! Index active Jira issues by the bug key encoded in their summary.

use lpsync_core::{codec, BugKey, DestinationIssue, IssueIndex};

use crate::tracker::{DestinationTracker, IssueQuery, TrackerError};

/// Fixed page size of issue searches.
pub const PAGE_SIZE: usize = 50;

/// Page through every active imported issue of `project` and key it by its summary.
///
/// Issues whose summary has no bug id are skipped. Without a tracker or a
/// project there is nothing to index and the result is empty.
pub fn index_issues(
    tracker: Option<&dyn DestinationTracker>,
    project: &str,
) -> Result<IssueIndex, TrackerError> {
    let mut index = IssueIndex::new();
    let Some(tracker) = tracker else {
        return Ok(index);
    };
    if project.is_empty() {
        return Ok(index);
    }

    let query = IssueQuery::Active {
        project: project.to_owned(),
    };
    let mut page = 0;
    loop {
        let issues = tracker.search_issues(&query, page * PAGE_SIZE, PAGE_SIZE)?;
        if issues.is_empty() {
            break;
        }
        page += 1;

        for issue in issues {
            let Some(key) = codec::parse(&issue.summary) else {
                tracing::debug!("{}: no bug id in '{}', not indexed", issue.key, issue.summary);
                continue;
            };
            if let Some(previous) = index.get(&key) {
                tracing::warn!("{key} is tracked by both {} and {}", previous.key, issue.key);
            }
            index.insert(key, issue);
        }
    }
    Ok(index)
}

/// Look up the issue for `key` in any status, terminal ones included.
///
/// The summary search is a fuzzy text match, so only results whose summary
/// parses back to `key` count.
pub fn find_issue(
    tracker: &dyn DestinationTracker,
    project: &str,
    key: &BugKey,
) -> Result<Option<DestinationIssue>, TrackerError> {
    let query = IssueQuery::ByKey {
        project: project.to_owned(),
        key: key.clone(),
    };
    let issues = tracker.search_issues(&query, 0, PAGE_SIZE)?;
    Ok(issues
        .into_iter()
        .find(|issue| codec::parse(&issue.summary).as_ref() == Some(key)))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
