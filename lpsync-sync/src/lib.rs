//! # lpsync-sync
//!
//! Launchpad → Jira synchronization engine.
//!
//! Call [`run`] with a [`SourceTracker`], a [`DestinationTracker`] and a
//! resolved [`lpsync_core::SyncConfig`] to perform one sync cycle. The
//! stages are exposed individually as well: [`aggregate()`], [`index_issues`],
//! [`partition`] and [`reconcile()`]. [`memory`] provides in-memory trackers
//! that record every write.

pub mod aggregate;
pub mod classify;
pub mod error;
pub mod index;
pub mod memory;
pub mod pipeline;
pub mod reconcile;
pub mod tracker;

pub use aggregate::aggregate;
pub use classify::{partition, Matched, Membership};
pub use error::SyncError;
pub use index::{find_issue, index_issues, PAGE_SIZE};
pub use pipeline::{run, Action, RunReport};
pub use reconcile::{reconcile, FieldChange, ReconcileContext, StatusReason};
pub use tracker::{
    DestinationTracker, IssueQuery, IssueUpdate, NewIssue, RemoteLink, SourceTracker,
    TrackerError,
};
