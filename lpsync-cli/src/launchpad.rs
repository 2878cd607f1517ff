//! Anonymous, read-only Launchpad client over the `devel` web service.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use lpsync_core::{Importance, ParentBug, SourceTask, TaskStatus};
use lpsync_sync::{SourceTracker, TrackerError};

use crate::http;

pub const API_ROOT: &str = "https://api.launchpad.net/devel";

/// One page of a Launchpad collection.
#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    entries: Vec<T>,
    #[serde(default)]
    next_collection_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TaskEntry {
    title: String,
    bug_target_name: String,
    status: TaskStatus,
    importance: Importance,
    #[serde(default)]
    assignee_link: Option<String>,
    #[serde(default)]
    is_complete: bool,
    bug_link: String,
}

#[derive(Debug, Deserialize)]
struct BugEntry {
    id: u64,
    title: String,
    #[serde(default)]
    description: Option<String>,
    web_link: String,
    #[serde(default)]
    subscriptions_collection_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SubscriptionEntry {
    person_link: String,
}

#[derive(Debug, Deserialize)]
struct PackageEntry {
    name: String,
}

impl TaskEntry {
    fn into_task(self, bug: ParentBug) -> SourceTask {
        SourceTask {
            title: self.title,
            bug_target_name: self.bug_target_name,
            status: self.status,
            importance: self.importance,
            assignee_link: self.assignee_link,
            is_complete: self.is_complete,
            bug,
        }
    }
}

pub struct LaunchpadClient {
    agent: ureq::Agent,
    root: String,
    /// Fetch each bug's subscriber list (one extra request per bug).
    with_subscribers: bool,
}

impl LaunchpadClient {
    pub fn new(agent: ureq::Agent, with_subscribers: bool) -> Self {
        Self {
            agent,
            root: API_ROOT.to_owned(),
            with_subscribers,
        }
    }

    /// Every entry of a collection, following `next_collection_link`.
    fn collection<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        first: ureq::Request,
    ) -> Result<Vec<T>, TrackerError> {
        let mut page: Page<T> = http::call_json(operation, first)?;
        let mut entries = std::mem::take(&mut page.entries);
        while let Some(next) = page.next_collection_link.take() {
            page = http::call_json(operation, self.agent.get(&next))?;
            entries.append(&mut page.entries);
        }
        Ok(entries)
    }

    fn bug(&self, link: &str) -> Result<ParentBug, TrackerError> {
        let entry: BugEntry = http::call_json("bug", self.agent.get(link))?;
        let subscriber_links = match (&entry.subscriptions_collection_link, self.with_subscribers) {
            (Some(link), true) => self
                .collection::<SubscriptionEntry>("subscriptions", self.agent.get(link))?
                .into_iter()
                .map(|s| s.person_link)
                .collect(),
            _ => Vec::new(),
        };
        Ok(ParentBug {
            id: entry.id,
            title: entry.title,
            description: entry.description.unwrap_or_default(),
            web_link: entry.web_link,
            subscriber_links,
        })
    }

    /// Source packages whose bug mail `team` is subscribed to.
    pub fn bug_subscriber_packages(&self, team: &str) -> Result<Vec<String>, TrackerError> {
        let request = self
            .agent
            .get(&format!("{}/~{team}", self.root))
            .query("ws.op", "getBugSubscriberPackages");
        Ok(self
            .collection::<PackageEntry>("subscriber packages", request)?
            .into_iter()
            .map(|p| p.name)
            .collect())
    }
}

impl SourceTracker for LaunchpadClient {
    fn search_tasks(
        &self,
        tag: &str,
        statuses: &[TaskStatus],
    ) -> Result<Vec<SourceTask>, TrackerError> {
        let mut request = self
            .agent
            .get(&format!("{}/bugs", self.root))
            .query("ws.op", "searchTasks")
            .query("tags", tag);
        for status in statuses {
            request = request.query("status", status.as_str());
        }
        let entries: Vec<TaskEntry> = self.collection("search tasks", request)?;
        tracing::debug!("{} tasks tagged {tag}", entries.len());

        // Series tasks of one bug share the parent; fetch it once.
        let mut bugs: BTreeMap<String, ParentBug> = BTreeMap::new();
        let mut tasks = Vec::with_capacity(entries.len());
        for entry in entries {
            let bug = match bugs.get(&entry.bug_link) {
                Some(bug) => bug.clone(),
                None => {
                    let bug = self.bug(&entry.bug_link)?;
                    bugs.insert(entry.bug_link.clone(), bug.clone());
                    bug
                }
            };
            tasks.push(entry.into_task(bug));
        }
        Ok(tasks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_a_search_page() {
        let json = r#"{
            "start": 0,
            "total_size": 2,
            "next_collection_link": "https://api.launchpad.net/devel/bugs?ws.op=searchTasks&ws.start=75",
            "entries": [
                {
                    "title": "Bug #1990000 in subiquity: \"crash on storage screen\"",
                    "bug_target_name": "subiquity",
                    "status": "Fix Committed",
                    "importance": "High",
                    "assignee_link": "https://api.launchpad.net/devel/~dbungert",
                    "is_complete": true,
                    "bug_link": "https://api.launchpad.net/devel/bugs/1990000",
                    "web_link": "https://bugs.launchpad.net/subiquity/+bug/1990000"
                },
                {
                    "title": "Bug #1990000 in subiquity (Ubuntu): \"crash on storage screen\"",
                    "bug_target_name": "subiquity (Ubuntu)",
                    "status": "Won't Fix",
                    "importance": "Undecided",
                    "assignee_link": null,
                    "is_complete": true,
                    "bug_link": "https://api.launchpad.net/devel/bugs/1990000"
                }
            ]
        }"#;
        let page: Page<TaskEntry> = serde_json::from_str(json).expect("page");
        assert_eq!(page.entries.len(), 2);
        assert!(page.next_collection_link.is_some());
        assert_eq!(page.entries[0].status, TaskStatus::FixCommitted);
        assert_eq!(page.entries[1].status, TaskStatus::WontFix);
        assert_eq!(page.entries[1].assignee_link, None);
    }

    #[test]
    fn last_page_has_no_next_link() {
        let page: Page<PackageEntry> =
            serde_json::from_str(r#"{"entries": [{"name": "grub2"}, {"name": "shim"}]}"#)
                .expect("page");
        assert!(page.next_collection_link.is_none());
        assert_eq!(page.entries[1].name, "shim");
    }

    #[test]
    fn task_takes_parent_bug() {
        let entry = TaskEntry {
            title: "Bug #5 in vim (Ubuntu): \"x\"".to_owned(),
            bug_target_name: "vim (Ubuntu)".to_owned(),
            status: TaskStatus::New,
            importance: Importance::Low,
            assignee_link: None,
            is_complete: false,
            bug_link: "https://api.launchpad.net/devel/bugs/5".to_owned(),
        };
        let bug: BugEntry = serde_json::from_str(
            r#"{"id": 5, "title": "x", "description": null,
                "web_link": "https://bugs.launchpad.net/bugs/5"}"#,
        )
        .expect("bug");
        let task = entry.into_task(ParentBug {
            id: bug.id,
            title: bug.title,
            description: bug.description.unwrap_or_default(),
            web_link: bug.web_link,
            subscriber_links: vec![],
        });
        assert_eq!(task.bug.id, 5);
        assert_eq!(task.bug.description, "");
    }
}
