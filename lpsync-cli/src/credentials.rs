//! Jira API credentials from the `.jira.token` JSON file.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;

pub const TOKEN_FILE: &str = ".jira.token";

/// Where Atlassian API tokens are issued.
const TOKEN_HELP: &str = "https://id.atlassian.com/manage-profile/security/api-tokens";

#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct JiraCredentials {
    #[serde(rename = "jira-server")]
    pub server: String,
    #[serde(rename = "jira-login")]
    pub login: String,
    #[serde(rename = "jira-token")]
    pub token: String,
}

impl fmt::Debug for JiraCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JiraCredentials")
            .field("server", &self.server)
            .field("login", &self.login)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl JiraCredentials {
    /// Value of the `Authorization` header.
    pub fn basic_auth(&self) -> String {
        let pair = format!("{}:{}", self.login, self.token);
        format!("Basic {}", STANDARD.encode(pair))
    }
}

/// Token file location: an explicit path wins, then `$SNAP_USER_COMMON`, then home.
pub fn token_path_at(explicit: Option<&Path>, home: &Path, snap_common: Option<&Path>) -> PathBuf {
    match (explicit, snap_common) {
        (Some(path), _) => path.to_path_buf(),
        (None, Some(snap)) => snap.join(TOKEN_FILE),
        (None, None) => home.join(TOKEN_FILE),
    }
}

/// `token_path_at` reading home and `SNAP_USER_COMMON` from the environment.
pub fn token_path(explicit: Option<&Path>) -> Result<PathBuf> {
    let home = dirs::home_dir().context("could not determine home directory")?;
    let snap = std::env::var_os("SNAP_USER_COMMON")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from);
    Ok(token_path_at(explicit, &home, snap.as_deref()))
}

pub fn load(path: &Path) -> Result<JiraCredentials> {
    let contents = std::fs::read_to_string(path).with_context(|| {
        format!(
            "Jira token file {} could not be read\n  hint: create it with \
             {{\"jira-server\": …, \"jira-login\": …, \"jira-token\": …}} (tokens: {TOKEN_HELP})",
            path.display()
        )
    })?;
    let credentials: JiraCredentials = serde_json::from_str(&contents)
        .with_context(|| format!("Jira token file {} could not be parsed", path.display()))?;
    Ok(credentials)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const TOKEN_JSON: &str = r#"{
        "jira-server": "https://example.atlassian.net",
        "jira-login": "user@example.com",
        "jira-token": "api-token"
    }"#;

    #[test]
    fn loads_token_file() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join(TOKEN_FILE);
        std::fs::write(&path, TOKEN_JSON).expect("write");

        let credentials = load(&path).expect("load");
        assert_eq!(credentials.server, "https://example.atlassian.net");
        assert_eq!(credentials.login, "user@example.com");
        assert_eq!(credentials.token, "api-token");
    }

    #[test]
    fn missing_key_is_an_error() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join(TOKEN_FILE);
        std::fs::write(&path, r#"{"jira-server": "https://x", "jira-login": "me"}"#)
            .expect("write");
        let err = load(&path).unwrap_err();
        assert!(err.to_string().contains("could not be parsed"));
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = load(Path::new("/nonexistent/.jira.token")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/.jira.token"));
    }

    #[test]
    fn path_precedence() {
        let home = Path::new("/home/me");
        let snap = Path::new("/snap/common");
        let explicit = Path::new("/etc/token.json");

        assert_eq!(token_path_at(None, home, None), home.join(".jira.token"));
        assert_eq!(token_path_at(None, home, Some(snap)), snap.join(".jira.token"));
        assert_eq!(token_path_at(Some(explicit), home, Some(snap)), explicit);
    }

    #[test]
    fn basic_auth_header() {
        let credentials: JiraCredentials = serde_json::from_str(TOKEN_JSON).expect("json");
        // base64("user@example.com:api-token")
        assert_eq!(
            credentials.basic_auth(),
            "Basic dXNlckBleGFtcGxlLmNvbTphcGktdG9rZW4="
        );
        assert!(!format!("{credentials:?}").contains("api-token"));
    }
}
