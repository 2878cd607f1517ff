//! Collapse Launchpad bug tasks into task-sets keyed by `(bug id, package)`.
//!
//! A task is eligible when it targets an Ubuntu package the team is
//! subscribed to, or a special package on any target. Membership is
//! all-or-nothing per key: one ineligible task discards the whole set, and
//! later tasks for that key are ignored.

use std::collections::BTreeSet;

use lpsync_core::{codec, BugKey, SourceTask, TaskSets, TaskStatus};

/// Marker of a distribution target in `bug_target_name`.
const UBUNTU_TARGET: &str = "(Ubuntu";

/// Group `tasks` into task-sets, keeping Launchpad order within each set.
///
/// Sets where every task is Fix Released are dropped.
pub fn aggregate(
    tasks: impl IntoIterator<Item = SourceTask>,
    restricted: &BTreeSet<String>,
    special: &BTreeSet<String>,
) -> TaskSets {
    let mut sets = TaskSets::new();
    let mut rejected: BTreeSet<BugKey> = BTreeSet::new();

    for task in tasks {
        let Some(key) = codec::task_key(&task.title) else {
            tracing::warn!("skipping task with unparsable title: {}", task.title);
            continue;
        };
        if rejected.contains(&key) {
            continue;
        }
        if is_eligible(&task, &key.package, restricted, special) {
            sets.entry(key).or_default().push(task);
        } else {
            tracing::debug!("{key}: {} is not tracked, dropping set", task.bug_target_name);
            sets.remove(&key);
            rejected.insert(key);
        }
    }

    sets.retain(|key, tasks| {
        let resolved = tasks
            .iter()
            .all(|task| task.status == TaskStatus::FixReleased);
        if resolved {
            tracing::debug!("{key}: every task is Fix Released, nothing to track");
        }
        !resolved
    });
    sets
}

fn is_eligible(
    task: &SourceTask,
    package: &str,
    restricted: &BTreeSet<String>,
    special: &BTreeSet<String>,
) -> bool {
    (task.bug_target_name.contains(UBUNTU_TARGET) && restricted.contains(package))
        || special.contains(package)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
