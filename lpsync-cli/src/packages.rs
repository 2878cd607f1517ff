//! Packages a Launchpad team is responsible for.

use std::collections::BTreeMap;

use anyhow::{Context, Result};

use lpsync_sync::TrackerError;

use crate::http;
use crate::launchpad::LaunchpadClient;

/// Published team → packages mapping, regenerated daily.
pub const TEAM_MAPPING_URL: &str =
    "http://reqorts.qa.ubuntu.com/reports/m-r-package-team-mapping.json";

/// Packages of `team` from the published mapping, or from its Launchpad
/// bug subscriptions when the mapping is unreachable or does not list it.
///
/// An empty team yields an empty list without any request.
pub fn team_packages(
    agent: &ureq::Agent,
    launchpad: &LaunchpadClient,
    team: &str,
) -> Result<Vec<String>> {
    if team.is_empty() {
        return Ok(Vec::new());
    }

    match fetch_mapping(agent) {
        Ok(mapping) => {
            if let Some(packages) = packages_from_mapping(mapping, team) {
                tracing::info!(
                    "{} packages for team {team} from the team mapping",
                    packages.len()
                );
                return Ok(packages);
            }
            tracing::info!("team {team} is not in the team mapping, asking Launchpad");
        }
        Err(err) => tracing::warn!("team mapping unavailable ({err}), asking Launchpad"),
    }

    let packages = launchpad
        .bug_subscriber_packages(team)
        .with_context(|| format!("cannot list packages subscribed by team {team}"))?;
    tracing::info!("{} packages subscribed by team {team}", packages.len());
    Ok(packages)
}

type TeamMapping = BTreeMap<String, Vec<String>>;

fn fetch_mapping(agent: &ureq::Agent) -> std::result::Result<TeamMapping, TrackerError> {
    http::call_json("team mapping", agent.get(TEAM_MAPPING_URL))
}

/// `None` when the team is missing or has no packages.
fn packages_from_mapping(mut mapping: TeamMapping, team: &str) -> Option<Vec<String>> {
    mapping.remove(team).filter(|packages| !packages.is_empty())
}
