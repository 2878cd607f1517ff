//! Jira summary codec and Launchpad task-title parsing.
//!
//! Jira summaries carry the bug key as `LP#{id} [{pkg}] {title}`. Launchpad
//! task titles look like `Bug #1234 in pkg (Ubuntu Jammy): "title"`.
//!
//! Both are parsed by position on literal tokens. Summaries already in Jira
//! must keep parsing identically, so the rules below stay exactly as they
//! are: digits must follow the marker with no whitespace, and only the first
//! bracket pair after the marker names the package.

use crate::types::BugKey;

/// Marker preceding the bug id in a Jira summary.
pub const MARKER: &str = "LP#";

/// Extract the bug id: the run of ASCII digits immediately after [`MARKER`].
///
/// `None` when the marker is missing or not directly followed by a digit.
pub fn bug_id(summary: &str) -> Option<u64> {
    let start = summary.find(MARKER)? + MARKER.len();
    let digits: String = summary[start..]
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

/// Extract the package: the text between the first `[` after the marker and
/// the next `]`. Empty when there is no marker or no bracket pair.
///
/// Independent of [`bug_id`] succeeding.
pub fn bug_package(summary: &str) -> String {
    match package_span(summary) {
        Some((open, close)) => summary[open + 1..close].to_owned(),
        None => String::new(),
    }
}

/// Byte offsets of the `[` and `]` enclosing the package after the marker.
fn package_span(summary: &str) -> Option<(usize, usize)> {
    let after_marker = summary.find(MARKER)? + MARKER.len();
    let open = after_marker + summary[after_marker..].find('[')?;
    let close = open + 1 + summary[open + 1..].find(']')?;
    Some((open, close))
}

/// Parse a Jira summary into its [`BugKey`]. `None` unless a bug id is present.
pub fn parse(summary: &str) -> Option<BugKey> {
    let bug_id = bug_id(summary)?;
    Some(BugKey::new(bug_id, bug_package(summary)))
}

/// `LP#{bug_id} [{package}]`
pub fn prefix(bug_id: u64, package: &str) -> String {
    format!("{MARKER}{bug_id} [{package}]")
}

/// `LP#{bug_id} [{package}] {title}`
pub fn render(bug_id: u64, package: &str, title: &str) -> String {
    format!("{} {title}", prefix(bug_id, package))
}

/// Replace the free text of `summary` with `title`, keeping everything up to
/// and including the character after the package's closing `]` verbatim.
///
/// Text before the marker is kept too, so the summary still parses to the
/// same key. `None` when the summary has no package bracket pair.
pub fn retitle(summary: &str, title: &str) -> Option<String> {
    let (_, close) = package_span(summary)?;
    let mut end = close + 1;
    if let Some(next) = summary[end..].chars().next() {
        end += next.len_utf8();
    }
    Some(format!("{}{title}", &summary[..end]))
}

// ---------------------------------------------------------------------------
// Launchpad task titles
// ---------------------------------------------------------------------------

/// Package named by a task title: the 4th whitespace token, one trailing `:` removed.
///
/// Upstream projects render as `Bug #1 in subiquity: "…"`, hence the colon.
pub fn task_package(title: &str) -> Option<String> {
    let name = title.split_whitespace().nth(3)?;
    let name = name.strip_suffix(':').unwrap_or(name);
    Some(name.to_owned())
}

/// Key of a task title: the number of the `#1234` token plus [`task_package`].
pub fn task_key(title: &str) -> Option<BugKey> {
    let token = title.split_whitespace().nth(1)?;
    let mut chars = token.chars();
    chars.next()?;
    let bug_id = chars.as_str().parse().ok()?;
    Some(BugKey::new(bug_id, task_package(title)?))
}

/// Series target of a task title: the text between `in ` and the first `:`.
///
/// `Bug #1 in pkg (Ubuntu Jammy): "x"` → `pkg (Ubuntu Jammy)`. Empty when the title has no `in `.
pub fn series_name(title: &str) -> &str {
    let head = title.split(':').next().unwrap_or_default();
    head.split("in ").nth(1).unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
