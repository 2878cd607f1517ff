//! Error types for lpsync-sync.

use thiserror::Error;

use crate::tracker::TrackerError;

/// Errors that abort a sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A remote call failed; the run stops at the first failure.
    #[error(transparent)]
    Tracker(#[from] TrackerError),

    /// A required setting is empty.
    #[error("missing setting '{0}', hint: set it in the config file")]
    MissingSetting(&'static str),
}
