//! Subcommands and the setup they share.

pub mod init;
pub mod plan;
pub mod sync;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use lpsync_core::{config, SyncConfig};

use crate::credentials;
use crate::http;
use crate::jira::JiraClient;
use crate::launchpad::LaunchpadClient;
use crate::packages;

/// Options shared by the commands that talk to both trackers.
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Settings file [default: ~/.lpsync/config.yaml].
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Jira project key, overriding the settings file.
    #[arg(long, short = 'p')]
    pub project: Option<String>,

    /// Launchpad tag, overriding the settings file.
    #[arg(long, short = 't')]
    pub tag: Option<String>,

    /// Jira token file [default: ~/.jira.token, or $SNAP_USER_COMMON/.jira.token].
    #[arg(long, value_name = "PATH")]
    pub jira_token: Option<PathBuf>,
}

/// Resolved settings and connected clients for one run.
pub struct Session {
    pub config: SyncConfig,
    pub launchpad: LaunchpadClient,
    pub jira: JiraClient,
}

impl RunArgs {
    fn config_path(&self) -> Result<PathBuf> {
        match &self.config {
            Some(path) => Ok(path.clone()),
            None => {
                let home = dirs::home_dir().context("could not determine home directory")?;
                Ok(config::config_path_at(&home))
            }
        }
    }

    /// Load settings and credentials, then resolve the team's packages.
    ///
    /// Local files are read before any network request.
    pub fn open(&self, dry_run: bool) -> Result<Session> {
        let path = self.config_path()?;
        let mut file = config::load_from(&path)
            .with_context(|| format!("cannot load settings from {}", path.display()))?;
        if let Some(project) = &self.project {
            file.project = project.clone();
        }
        if let Some(tag) = &self.tag {
            file.tag = tag.clone();
        }
        file.dry_run |= dry_run;

        let base_dir = path.parent().unwrap_or(Path::new("."));
        let mut config = SyncConfig::resolve(&file, base_dir, Vec::new())
            .context("cannot load mapping files")?;

        let token_path = credentials::token_path(self.jira_token.as_deref())?;
        let credentials = credentials::load(&token_path)?;

        let agent = http::agent();
        let launchpad = LaunchpadClient::new(agent.clone(), file.sponsor_rule);
        let team_packages = packages::team_packages(&agent, &launchpad, &file.team)?;
        config.restricted_packages.extend(team_packages);
        tracing::info!(
            "{} restricted packages, {} special packages",
            config.restricted_packages.len(),
            config.special_packages.len()
        );

        let jira = JiraClient::new(agent, &credentials, file.checklist_field);
        Ok(Session {
            config,
            launchpad,
            jira,
        })
    }
}
