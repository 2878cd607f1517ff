//! YAML settings file and the resolved run configuration.
//!
//! # Storage layout
//!
//! ```text
//! ~/.lpsync/
//!   config.yaml        (settings: mode 0600, created by `lpsync init`)
//! ```
//!
//! `team_ids_path` and `packages_mapping_path` point at JSON files; relative
//! paths are resolved against the directory holding `config.yaml`.
//!
//! # API pattern
//!
//! Every filesystem function has two forms:
//! - `fn_at(home: &Path, …)`: explicit home; used in tests with `TempDir`
//! - `fn(…)`: derives home from `dirs::home_dir()`, delegates to `_at`

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::{io_err, ConfigError};
use crate::types::{TaskStatus, TeamMember};

pub const CONFIG_DIR: &str = ".lpsync";
pub const CONFIG_FILE: &str = "config.yaml";

const DEFAULT_CHECKLIST_FIELD: &str = "customfield_10039";

const CONFIG_TEMPLATE: &str = "\
# lpsync settings.
#
# Jira project key that receives the imported bugs.
project: FS
# Launchpad tag marking bugs to track.
tag: todo
# Launchpad team whose subscribed packages are tracked.
team: ''
# Packages tracked regardless of team subscription or distribution.
special_packages:
  - subiquity
  - netplan
  - apport
# Extra packages merged into the team's list.
restricted_packages: []
# JSON: {\"<lp-name>\": {\"id\": \"<jira-account-id>\", \"name\": \"<display name>\"}}
# team_ids_path: team_ids.json
# JSON: {\"<component>\": [\"<package>\", ...]}
# packages_mapping_path: components.json
dry_run: false
transitions:
  triaged: Triaged
  done: Done
  sponsoring: Sponsoring Needed
checklist_field: customfield_10039
# Move bugs with ~ubuntu-sponsors subscribed to Sponsoring Needed (slow: one request per bug).
sponsor_rule: false
";

// ---------------------------------------------------------------------------
// On-disk settings
// ---------------------------------------------------------------------------

/// Jira transition names used by the sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transitions {
    pub triaged: String,
    pub done: String,
    pub sponsoring: String,
}

impl Default for Transitions {
    fn default() -> Self {
        Self {
            triaged: "Triaged".to_owned(),
            done: "Done".to_owned(),
            sponsoring: "Sponsoring Needed".to_owned(),
        }
    }
}

/// Contents of `config.yaml`. Every field is optional on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub project: String,
    pub tag: String,
    pub team: String,
    pub special_packages: Vec<String>,
    pub restricted_packages: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_ids_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub packages_mapping_path: Option<PathBuf>,
    pub dry_run: bool,
    pub source_statuses: Vec<TaskStatus>,
    pub transitions: Transitions,
    /// Jira custom field holding the series checklist.
    pub checklist_field: String,
    pub sponsor_rule: bool,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            project: String::new(),
            tag: String::new(),
            team: String::new(),
            special_packages: vec![],
            restricted_packages: vec![],
            team_ids_path: None,
            packages_mapping_path: None,
            dry_run: false,
            source_statuses: TaskStatus::DEFAULT_SEARCH.to_vec(),
            transitions: Transitions::default(),
            checklist_field: DEFAULT_CHECKLIST_FIELD.to_owned(),
            sponsor_rule: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

/// Everything a sync run reads, resolved once and passed by reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    pub project: String,
    pub tag: String,
    /// Packages subscribed by the team; tracked for Ubuntu targets only.
    pub restricted_packages: BTreeSet<String>,
    /// Packages tracked for any target.
    pub special_packages: BTreeSet<String>,
    /// Launchpad name → Jira account. `None` disables assignee sync.
    pub team_ids: Option<BTreeMap<String, TeamMember>>,
    /// Jira component → packages. `None` disables component sync.
    pub components: Option<BTreeMap<String, Vec<String>>>,
    pub dry_run: bool,
    pub source_statuses: Vec<TaskStatus>,
    pub transitions: Transitions,
    pub sponsor_rule: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            project: String::new(),
            tag: String::new(),
            restricted_packages: BTreeSet::new(),
            special_packages: BTreeSet::new(),
            team_ids: None,
            components: None,
            dry_run: false,
            source_statuses: TaskStatus::DEFAULT_SEARCH.to_vec(),
            transitions: Transitions::default(),
            sponsor_rule: false,
        }
    }
}

impl SyncConfig {
    /// Build the run configuration from settings, loading the mapping files
    /// relative to `base_dir` and merging `team_packages` into the restricted list.
    pub fn resolve(
        file: &ConfigFile,
        base_dir: &Path,
        team_packages: impl IntoIterator<Item = String>,
    ) -> Result<Self, ConfigError> {
        let team_ids = match &file.team_ids_path {
            Some(path) => non_empty(load_json::<BTreeMap<String, TeamMember>>(
                &base_dir.join(path),
            )?),
            None => None,
        };
        let components = match &file.packages_mapping_path {
            Some(path) => non_empty(load_json::<BTreeMap<String, Vec<String>>>(
                &base_dir.join(path),
            )?),
            None => None,
        };

        let mut restricted_packages: BTreeSet<String> = team_packages.into_iter().collect();
        restricted_packages.extend(file.restricted_packages.iter().cloned());

        Ok(Self {
            project: file.project.clone(),
            tag: file.tag.clone(),
            restricted_packages,
            special_packages: file.special_packages.iter().cloned().collect(),
            team_ids,
            components,
            dry_run: file.dry_run,
            source_statuses: file.source_statuses.clone(),
            transitions: file.transitions.clone(),
            sponsor_rule: file.sponsor_rule,
        })
    }

    /// First component (in name order) whose package list contains `package`.
    pub fn package_to_component(&self, package: &str) -> Option<&str> {
        self.components.as_ref()?.iter().find_map(|(component, packages)| {
            packages
                .iter()
                .any(|p| p == package)
                .then_some(component.as_str())
        })
    }
}

fn non_empty<K, V>(map: BTreeMap<K, V>) -> Option<BTreeMap<K, V>> {
    (!map.is_empty()).then_some(map)
}

fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    serde_json::from_str(&contents).map_err(|source| ConfigError::Mapping {
        path: path.to_path_buf(),
        source,
    })
}

// ---------------------------------------------------------------------------
// Load
// ---------------------------------------------------------------------------

/// `<home>/.lpsync/config.yaml`: pure, no I/O.
pub fn config_path_at(home: &Path) -> PathBuf {
    home.join(CONFIG_DIR).join(CONFIG_FILE)
}

/// Load settings from an explicit path.
///
/// Returns `ConfigError::ConfigNotFound` if absent,
/// `ConfigError::Parse` (with path + line context) if malformed YAML.
pub fn load_from(path: &Path) -> Result<ConfigFile, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::ConfigNotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load `<home>/.lpsync/config.yaml`.
pub fn load_at(home: &Path) -> Result<ConfigFile, ConfigError> {
    load_from(&config_path_at(home))
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<ConfigFile, ConfigError> {
    load_at(&home()?)
}

// ---------------------------------------------------------------------------
// Init
// ---------------------------------------------------------------------------

/// Write the commented default settings to `<home>/.lpsync/config.yaml`.
///
/// Idempotent: an existing file is left untouched. Returns the path and
/// whether the file was created.
pub fn init_at(home: &Path) -> Result<(PathBuf, bool), ConfigError> {
    let path = config_path_at(home);
    if path.exists() {
        return Ok((path, false));
    }
    let dir = home.join(CONFIG_DIR);
    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
        set_permissions(&dir, 0o700)?;
    }

    let tmp = path.with_file_name(format!("{CONFIG_FILE}.tmp"));
    std::fs::write(&tmp, CONFIG_TEMPLATE).map_err(|e| io_err(&tmp, e))?;
    set_permissions(&tmp, 0o600)?;
    std::fs::rename(&tmp, &path).map_err(|e| io_err(&path, e))?;
    Ok((path, true))
}

/// `init_at` convenience wrapper.
pub fn init() -> Result<(PathBuf, bool), ConfigError> {
    init_at(&home()?)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}

#[cfg(unix)]
fn set_permissions(path: &Path, mode: u32) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_permissions(_path: &Path, _mode: u32) -> Result<(), ConfigError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn config_path_is_correct() {
        let home = TempDir::new().expect("tempdir");
        assert!(config_path_at(home.path()).ends_with(".lpsync/config.yaml"));
    }

    #[test]
    fn template_parses_to_defaults_plus_examples() {
        let file: ConfigFile = serde_yaml::from_str(CONFIG_TEMPLATE).expect("template");
        assert_eq!(file.project, "FS");
        assert_eq!(file.tag, "todo");
        assert_eq!(file.special_packages, vec!["subiquity", "netplan", "apport"]);
        assert_eq!(file.source_statuses, TaskStatus::DEFAULT_SEARCH.to_vec());
        assert_eq!(file.transitions, Transitions::default());
        assert!(!file.sponsor_rule);
    }

    #[test]
    fn empty_yaml_uses_defaults() {
        let file: ConfigFile = serde_yaml::from_str("{}").expect("parse");
        assert_eq!(file, ConfigFile::default());
        assert_eq!(file.checklist_field, "customfield_10039");
    }

    #[test]
    fn package_to_component_scans_mapping() {
        let mut components = BTreeMap::new();
        components.insert("Installer".to_owned(), vec!["subiquity".to_owned()]);
        components.insert(
            "Networking".to_owned(),
            vec!["netplan".to_owned(), "network-manager".to_owned()],
        );
        let config = SyncConfig {
            components: Some(components),
            ..SyncConfig::default()
        };
        assert_eq!(config.package_to_component("netplan"), Some("Networking"));
        assert_eq!(config.package_to_component("subiquity"), Some("Installer"));
        assert_eq!(config.package_to_component("vim"), None);
    }

    #[test]
    fn package_to_component_without_mapping() {
        assert_eq!(SyncConfig::default().package_to_component("netplan"), None);
    }
}
