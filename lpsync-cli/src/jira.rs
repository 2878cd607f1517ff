//! Jira Cloud client over REST API v2 with basic (login + API token) auth.

use serde::Deserialize;
use serde_json::{json, Map, Value};

use lpsync_core::{DestinationIssue, IssueStatus, Priority};
use lpsync_sync::{
    DestinationTracker, IssueQuery, IssueUpdate, NewIssue, RemoteLink, TrackerError,
};

use crate::credentials::JiraCredentials;
use crate::http;

// ---------------------------------------------------------------------------
// Wire models
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    issues: Vec<IssueRecord>,
}

#[derive(Debug, Deserialize)]
struct IssueRecord {
    key: String,
    fields: IssueFields,
}

#[derive(Debug, Deserialize)]
struct IssueFields {
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    status: Option<Named>,
    #[serde(default)]
    assignee: Option<Account>,
    #[serde(default)]
    priority: Option<Named>,
    #[serde(default)]
    components: Option<Vec<Named>>,
    /// Custom fields, the checklist among them.
    #[serde(flatten)]
    extra: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct Named {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Account {
    #[serde(rename = "accountId")]
    account_id: String,
}

#[derive(Debug, Deserialize)]
struct Created {
    key: String,
}

#[derive(Debug, Deserialize)]
struct TransitionList {
    #[serde(default)]
    transitions: Vec<TransitionEntry>,
}

#[derive(Debug, Deserialize)]
struct TransitionEntry {
    id: String,
    name: String,
    #[serde(default)]
    to: Option<Named>,
}

impl IssueRecord {
    fn into_issue(self, checklist_field: &str) -> DestinationIssue {
        let fields = self.fields;
        let priority = fields.priority.and_then(|p| match p.name.parse::<Priority>() {
            Ok(priority) => Some(priority),
            Err(err) => {
                tracing::debug!("{}: {err}", self.key);
                None
            }
        });
        DestinationIssue {
            checklist: fields
                .extra
                .get(checklist_field)
                .and_then(Value::as_str)
                .map(str::to_owned),
            summary: fields.summary.unwrap_or_default(),
            status: IssueStatus::from(fields.status.map(|s| s.name).unwrap_or_default()),
            assignee: fields.assignee.map(|a| a.account_id),
            priority,
            components: fields
                .components
                .unwrap_or_default()
                .into_iter()
                .map(|c| c.name)
                .collect(),
            key: self.key,
        }
    }
}

/// Workflow transition matching `wanted` by name, or else by target status.
fn pick_transition<'a>(entries: &'a [TransitionEntry], wanted: &str) -> Option<&'a TransitionEntry> {
    entries
        .iter()
        .find(|t| t.name.eq_ignore_ascii_case(wanted))
        .or_else(|| {
            entries.iter().find(|t| {
                t.to
                    .as_ref()
                    .is_some_and(|to| to.name.eq_ignore_ascii_case(wanted))
            })
        })
}

fn names(values: &[String]) -> Value {
    Value::Array(values.iter().map(|name| json!({ "name": name })).collect())
}

fn update_fields(update: &IssueUpdate, checklist_field: &str) -> Value {
    let mut fields = Map::new();
    if let Some(summary) = &update.summary {
        fields.insert("summary".to_owned(), json!(summary));
    }
    if let Some(checklist) = &update.checklist {
        fields.insert(checklist_field.to_owned(), json!(checklist));
    }
    if let Some(account_id) = &update.assignee {
        fields.insert("assignee".to_owned(), json!({ "accountId": account_id }));
    }
    if let Some(priority) = update.priority {
        fields.insert("priority".to_owned(), json!({ "name": priority.as_str() }));
    }
    if let Some(components) = &update.components {
        fields.insert("components".to_owned(), names(components));
    }
    json!({ "fields": fields })
}

fn create_fields(new: &NewIssue, checklist_field: &str) -> Value {
    let mut fields = Map::new();
    fields.insert("project".to_owned(), json!({ "key": new.project }));
    fields.insert("summary".to_owned(), json!(new.summary));
    fields.insert("description".to_owned(), json!(new.description));
    fields.insert("issuetype".to_owned(), json!({ "name": new.issue_type }));
    if let Some(priority) = new.priority {
        fields.insert("priority".to_owned(), json!({ "name": priority.as_str() }));
    }
    if let Some(checklist) = &new.checklist {
        fields.insert(checklist_field.to_owned(), json!(checklist));
    }
    if let Some(account_id) = &new.assignee {
        fields.insert("assignee".to_owned(), json!({ "accountId": account_id }));
    }
    if !new.components.is_empty() {
        fields.insert("components".to_owned(), names(&new.components));
    }
    json!({ "fields": fields })
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct JiraClient {
    agent: ureq::Agent,
    base_url: String,
    auth: String,
    checklist_field: String,
}

impl JiraClient {
    pub fn new(
        agent: ureq::Agent,
        credentials: &JiraCredentials,
        checklist_field: impl Into<String>,
    ) -> Self {
        Self {
            agent,
            base_url: credentials.server.trim_end_matches('/').to_owned(),
            auth: credentials.basic_auth(),
            checklist_field: checklist_field.into(),
        }
    }

    fn request(&self, method: &str, path: &str) -> ureq::Request {
        self.agent
            .request(method, &format!("{}/rest/api/2/{path}", self.base_url))
            .set("Authorization", &self.auth)
            .set("Accept", "application/json")
    }

    fn fields(&self) -> String {
        format!(
            "summary,status,assignee,priority,components,{}",
            self.checklist_field
        )
    }

    fn fetch_issue(&self, key: &str) -> Result<DestinationIssue, TrackerError> {
        let request = self
            .request("GET", &format!("issue/{key}"))
            .query("fields", &self.fields());
        let record: IssueRecord = http::call_json("get issue", request)?;
        Ok(record.into_issue(&self.checklist_field))
    }
}

impl DestinationTracker for JiraClient {
    fn search_issues(
        &self,
        query: &IssueQuery,
        start_at: usize,
        max_results: usize,
    ) -> Result<Vec<DestinationIssue>, TrackerError> {
        let request = self
            .request("GET", "search")
            .query("jql", &query.jql())
            .query("startAt", &start_at.to_string())
            .query("maxResults", &max_results.to_string())
            .query("fields", &self.fields());
        let page: SearchPage = http::call_json("search", request)?;
        Ok(page
            .issues
            .into_iter()
            .map(|record| record.into_issue(&self.checklist_field))
            .collect())
    }

    fn create_issue(&self, issue: &NewIssue) -> Result<DestinationIssue, TrackerError> {
        let created: Created = http::send_json(
            "create",
            self.request("POST", "issue"),
            create_fields(issue, &self.checklist_field),
        )?;
        self.fetch_issue(&created.key)
    }

    fn update_issue(&self, key: &str, update: &IssueUpdate) -> Result<(), TrackerError> {
        http::send_json_unit(
            "update",
            self.request("PUT", &format!("issue/{key}")),
            update_fields(update, &self.checklist_field),
        )
    }

    fn transition_issue(&self, key: &str, transition: &str) -> Result<(), TrackerError> {
        let path = format!("issue/{key}/transitions");
        let list: TransitionList = http::call_json("transitions", self.request("GET", &path))?;
        let Some(entry) = pick_transition(&list.transitions, transition) else {
            return Err(TrackerError::UnknownTransition {
                key: key.to_owned(),
                transition: transition.to_owned(),
            });
        };
        http::send_json_unit(
            "transition",
            self.request("POST", &path),
            json!({ "transition": { "id": entry.id } }),
        )
    }

    fn add_comment(&self, key: &str, body: &str) -> Result<(), TrackerError> {
        http::send_json_unit(
            "comment",
            self.request("POST", &format!("issue/{key}/comment")),
            json!({ "body": body }),
        )
    }

    fn add_simple_link(&self, key: &str, link: &RemoteLink) -> Result<(), TrackerError> {
        http::send_json_unit(
            "link",
            self.request("POST", &format!("issue/{key}/remotelink")),
            json!({
                "object": {
                    "url": link.url,
                    "title": link.title,
                    "icon": { "url16x16": link.icon_url },
                }
            }),
        )
    }

    fn project_components(&self, project: &str) -> Result<Vec<String>, TrackerError> {
        let components: Vec<Named> = http::call_json(
            "components",
            self.request("GET", &format!("project/{project}/components")),
        )?;
        Ok(components.into_iter().map(|c| c.name).collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const CHECKLIST: &str = "customfield_10039";

    #[test]
    fn decodes_search_results() {
        let json = r##"{
            "startAt": 0,
            "maxResults": 50,
            "total": 2,
            "issues": [
                {
                    "key": "FS-101",
                    "fields": {
                        "summary": "LP#1990000 [subiquity] crash on storage screen",
                        "status": {"name": "In Progress"},
                        "assignee": {"accountId": "5b10a2844c20165700ede21g", "displayName": "Dan"},
                        "priority": {"name": "High"},
                        "components": [{"name": "Installer"}],
                        "customfield_10039": "# Default checklist\n* [] subiquity - New - High"
                    }
                },
                {
                    "key": "FS-102",
                    "fields": {
                        "summary": null,
                        "status": {"name": "Untriaged"},
                        "assignee": null,
                        "priority": {"name": "Blocker"},
                        "components": [],
                        "customfield_10039": null
                    }
                }
            ]
        }"##;
        let page: SearchPage = serde_json::from_str(json).expect("page");
        let issues: Vec<_> = page
            .issues
            .into_iter()
            .map(|r| r.into_issue(CHECKLIST))
            .collect();

        assert_eq!(issues[0].key, "FS-101");
        assert_eq!(issues[0].status, IssueStatus::from("In Progress"));
        assert_eq!(issues[0].assignee.as_deref(), Some("5b10a2844c20165700ede21g"));
        assert_eq!(issues[0].priority, Some(Priority::High));
        assert_eq!(issues[0].components, vec!["Installer".to_owned()]);
        assert!(issues[0]
            .checklist
            .as_deref()
            .is_some_and(|c| c.starts_with("# Default checklist")));

        assert_eq!(issues[1].summary, "");
        assert!(issues[1].status.is_untriaged());
        assert_eq!(issues[1].priority, None);
        assert_eq!(issues[1].checklist, None);
    }

    fn transitions() -> Vec<TransitionEntry> {
        serde_json::from_str::<TransitionList>(
            r#"{"transitions": [
                {"id": "11", "name": "All", "to": {"name": "Triaged"}},
                {"id": "31", "name": "Done", "to": {"name": "Done"}},
                {"id": "41", "name": "Needs sponsor", "to": {"name": "Sponsoring Needed"}}
            ]}"#,
        )
        .expect("transitions")
        .transitions
    }

    #[test]
    fn transition_by_name_or_target_status() {
        let entries = transitions();
        assert_eq!(pick_transition(&entries, "done").map(|t| t.id.as_str()), Some("31"));
        assert_eq!(pick_transition(&entries, "All").map(|t| t.id.as_str()), Some("11"));
        assert_eq!(pick_transition(&entries, "Triaged").map(|t| t.id.as_str()), Some("11"));
        assert_eq!(
            pick_transition(&entries, "Sponsoring Needed").map(|t| t.id.as_str()),
            Some("41")
        );
        assert!(pick_transition(&entries, "Rejected").is_none());
    }

    #[test]
    fn update_sends_only_changed_fields() {
        let update = IssueUpdate {
            checklist: Some("# Default checklist".to_owned()),
            priority: Some(Priority::Lowest),
            components: Some(vec!["Installer".to_owned()]),
            ..IssueUpdate::default()
        };
        let body = update_fields(&update, CHECKLIST);
        assert_eq!(
            body,
            json!({
                "fields": {
                    "customfield_10039": "# Default checklist",
                    "priority": {"name": "Lowest"},
                    "components": [{"name": "Installer"}]
                }
            })
        );
    }

    #[test]
    fn create_body_is_prefilled() {
        let new = NewIssue {
            project: "FS".to_owned(),
            summary: "LP#7 [vim] crash".to_owned(),
            description: "details".to_owned(),
            issue_type: "Bug".to_owned(),
            priority: Some(Priority::Medium),
            checklist: None,
            assignee: Some("acc-1".to_owned()),
            components: vec![],
        };
        let body = create_fields(&new, CHECKLIST);
        assert_eq!(body["fields"]["project"]["key"], "FS");
        assert_eq!(body["fields"]["issuetype"]["name"], "Bug");
        assert_eq!(body["fields"]["priority"]["name"], "Medium");
        assert_eq!(body["fields"]["assignee"]["accountId"], "acc-1");
        assert!(body["fields"].get(CHECKLIST).is_none());
        assert!(body["fields"].get("components").is_none());
    }
}
