//! lpsync core library: domain types, summary codec, configuration, errors.
//!
//! Public API surface:
//! - [`types`]: bug keys, Launchpad tasks, Jira issues and their enums
//! - [`codec`]: `LP#{id} [{pkg}] {title}` summaries and task-title parsing
//! - [`config`]: YAML settings file and the resolved [`SyncConfig`]
//! - [`error`]: [`ConfigError`], [`UnknownVariant`]

pub mod codec;
pub mod config;
pub mod error;
pub mod types;

pub use config::{ConfigFile, SyncConfig, Transitions};
pub use error::{ConfigError, UnknownVariant};
pub use types::{
    BugKey, DestinationIssue, Importance, IssueIndex, IssueStatus, ParentBug, Priority,
    SourceTask, TaskSet, TaskSets, TaskStatus, TeamMember,
};
