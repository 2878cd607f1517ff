//! In-memory trackers.
//!
//! [`MemoryDestination`] keeps a single Jira-like project in memory and
//! records every write so callers can assert exactly which remote calls a
//! run would make. [`MemorySource`] serves a fixed list of Launchpad tasks.

use std::cell::RefCell;
use std::collections::BTreeMap;

use lpsync_core::{DestinationIssue, IssueStatus, SourceTask, TaskStatus};

use crate::tracker::{
    DestinationTracker, IssueQuery, IssueUpdate, NewIssue, RemoteLink, SourceTracker,
    TrackerError,
};

/// A recorded remote write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Write {
    Create { key: String, summary: String },
    Update { key: String, update: IssueUpdate },
    Transition { key: String, transition: String },
    Comment { key: String, body: String },
    Link { key: String, url: String },
}

impl Write {
    pub fn key(&self) -> &str {
        match self {
            Write::Create { key, .. }
            | Write::Update { key, .. }
            | Write::Transition { key, .. }
            | Write::Comment { key, .. }
            | Write::Link { key, .. } => key,
        }
    }
}

#[derive(Debug, Default)]
struct State {
    issues: Vec<DestinationIssue>,
    writes: Vec<Write>,
    searches: usize,
    next_number: u64,
}

/// A single in-memory project.
#[derive(Debug)]
pub struct MemoryDestination {
    project: String,
    components: Vec<String>,
    /// Transition name → resulting status. Unlisted transitions land on a status of the same name.
    transitions: BTreeMap<String, String>,
    fail_operation: Option<&'static str>,
    state: RefCell<State>,
}

impl MemoryDestination {
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            components: vec![],
            transitions: BTreeMap::new(),
            fail_operation: None,
            state: RefCell::new(State {
                next_number: 1,
                ..State::default()
            }),
        }
    }

    /// Seed an existing issue. Created issues are numbered after it.
    pub fn with_issue(self, issue: DestinationIssue) -> Self {
        let mut state = self.state.borrow_mut();
        let number = issue
            .key
            .rsplit_once('-')
            .and_then(|(_, n)| n.parse::<u64>().ok());
        if let Some(number) = number {
            state.next_number = state.next_number.max(number + 1);
        }
        state.issues.push(issue);
        drop(state);
        self
    }

    pub fn with_components<I, S>(mut self, components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.components = components.into_iter().map(Into::into).collect();
        self
    }

    /// Route a transition name to a differently named status (Jira's `All` → `Triaged`).
    pub fn with_transition(mut self, transition: &str, status: &str) -> Self {
        self.transitions
            .insert(transition.to_owned(), status.to_owned());
        self
    }

    /// Make every call of one operation (`"update"`, `"transition"`, …) fail.
    pub fn failing(mut self, operation: &'static str) -> Self {
        self.fail_operation = Some(operation);
        self
    }

    /// Snapshot of every issue, including created ones.
    pub fn issues(&self) -> Vec<DestinationIssue> {
        self.state.borrow().issues.clone()
    }

    pub fn issue(&self, key: &str) -> Option<DestinationIssue> {
        self.state
            .borrow()
            .issues
            .iter()
            .find(|issue| issue.key == key)
            .cloned()
    }

    /// Every write recorded so far, in call order.
    pub fn writes(&self) -> Vec<Write> {
        self.state.borrow().writes.clone()
    }

    pub fn clear_writes(&self) {
        self.state.borrow_mut().writes.clear();
    }

    /// Number of `search_issues` calls served.
    pub fn search_count(&self) -> usize {
        self.state.borrow().searches
    }

    fn check(&self, operation: &'static str) -> Result<(), TrackerError> {
        if self.fail_operation == Some(operation) {
            return Err(TrackerError::Request {
                operation,
                message: "injected failure".to_owned(),
            });
        }
        Ok(())
    }

    fn with_issue_mut<T>(
        &self,
        key: &str,
        f: impl FnOnce(&mut DestinationIssue) -> T,
    ) -> Result<T, TrackerError> {
        let mut state = self.state.borrow_mut();
        let issue = state
            .issues
            .iter_mut()
            .find(|issue| issue.key == key)
            .ok_or_else(|| TrackerError::IssueNotFound(key.to_owned()))?;
        Ok(f(issue))
    }

    fn record(&self, write: Write) {
        self.state.borrow_mut().writes.push(write);
    }
}

impl DestinationTracker for MemoryDestination {
    fn search_issues(
        &self,
        query: &IssueQuery,
        start_at: usize,
        max_results: usize,
    ) -> Result<Vec<DestinationIssue>, TrackerError> {
        self.check("search")?;
        let mut state = self.state.borrow_mut();
        state.searches += 1;

        let (project, prefix) = match query {
            IssueQuery::Active { project } => (project.as_str(), None),
            IssueQuery::ByKey { project, key } => (
                project.as_str(),
                Some(lpsync_core::codec::prefix(key.bug_id, &key.package)),
            ),
        };
        if project != self.project {
            return Ok(vec![]);
        }
        let matches = |issue: &DestinationIssue| match &prefix {
            None => issue.summary.contains("LP#") && !issue.status.is_terminal(),
            Some(prefix) => issue.summary.contains(prefix.as_str()),
        };

        Ok(state
            .issues
            .iter()
            .filter(|&issue| matches(issue))
            .skip(start_at)
            .take(max_results)
            .cloned()
            .collect())
    }

    fn create_issue(&self, new: &NewIssue) -> Result<DestinationIssue, TrackerError> {
        self.check("create")?;
        let mut state = self.state.borrow_mut();
        let key = format!("{}-{}", self.project, state.next_number);
        state.next_number += 1;

        let issue = DestinationIssue {
            key: key.clone(),
            summary: new.summary.clone(),
            status: IssueStatus::from(IssueStatus::UNTRIAGED),
            checklist: new.checklist.clone(),
            assignee: new.assignee.clone(),
            priority: new.priority,
            components: new.components.clone(),
        };
        state.issues.push(issue.clone());
        state.writes.push(Write::Create {
            key,
            summary: new.summary.clone(),
        });
        Ok(issue)
    }

    fn update_issue(&self, key: &str, update: &IssueUpdate) -> Result<(), TrackerError> {
        self.check("update")?;
        self.with_issue_mut(key, |issue| {
            if let Some(summary) = &update.summary {
                issue.summary = summary.clone();
            }
            if let Some(checklist) = &update.checklist {
                issue.checklist = Some(checklist.clone());
            }
            if let Some(assignee) = &update.assignee {
                issue.assignee = Some(assignee.clone());
            }
            if let Some(priority) = update.priority {
                issue.priority = Some(priority);
            }
            if let Some(components) = &update.components {
                issue.components = components.clone();
            }
        })?;
        self.record(Write::Update {
            key: key.to_owned(),
            update: update.clone(),
        });
        Ok(())
    }

    fn transition_issue(&self, key: &str, transition: &str) -> Result<(), TrackerError> {
        self.check("transition")?;
        let status = self
            .transitions
            .get(transition)
            .cloned()
            .unwrap_or_else(|| transition.to_owned());
        self.with_issue_mut(key, |issue| issue.status = IssueStatus::from(status))?;
        self.record(Write::Transition {
            key: key.to_owned(),
            transition: transition.to_owned(),
        });
        Ok(())
    }

    fn add_comment(&self, key: &str, body: &str) -> Result<(), TrackerError> {
        self.check("comment")?;
        self.with_issue_mut(key, |_| ())?;
        self.record(Write::Comment {
            key: key.to_owned(),
            body: body.to_owned(),
        });
        Ok(())
    }

    fn add_simple_link(&self, key: &str, link: &RemoteLink) -> Result<(), TrackerError> {
        self.check("link")?;
        self.with_issue_mut(key, |_| ())?;
        self.record(Write::Link {
            key: key.to_owned(),
            url: link.url.clone(),
        });
        Ok(())
    }

    fn project_components(&self, project: &str) -> Result<Vec<String>, TrackerError> {
        self.check("components")?;
        if project != self.project {
            return Ok(vec![]);
        }
        Ok(self.components.clone())
    }
}

/// A fixed list of Launchpad tasks.
#[derive(Debug, Default)]
pub struct MemorySource {
    tasks: Vec<SourceTask>,
}

impl MemorySource {
    pub fn new(tasks: Vec<SourceTask>) -> Self {
        Self { tasks }
    }
}

impl SourceTracker for MemorySource {
    fn search_tasks(
        &self,
        _tag: &str,
        statuses: &[TaskStatus],
    ) -> Result<Vec<SourceTask>, TrackerError> {
        Ok(self
            .tasks
            .iter()
            .filter(|task| statuses.contains(&task.status))
            .cloned()
            .collect())
    }
}
