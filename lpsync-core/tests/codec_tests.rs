//! Summary codec behaviour on the summaries found in production Jira projects.

use lpsync_core::{codec, BugKey};
use rstest::rstest;

// ---------------------------------------------------------------------------
// 1. Bug id
// ---------------------------------------------------------------------------

#[rstest]
#[case("", None)]
#[case("This isn't the right title", None)]
#[case("LP#123234", Some(123234))]
#[case("LP#123234 [busybox] There is a problemm", Some(123234))]
#[case("LP# 123234 [busybox] There is a problemm", None)]
#[case("Review LP#123234 [busybox] There is a problemm", Some(123234))]
#[case("LP#", None)]
fn bug_id_cases(#[case] summary: &str, #[case] expected: Option<u64>) {
    assert_eq!(codec::bug_id(summary), expected);
}

// ---------------------------------------------------------------------------
// 2. Package
// ---------------------------------------------------------------------------

#[rstest]
#[case("", "")]
#[case("This isn't the right title", "")]
#[case("LP#123234", "")]
#[case("LP#123234 [busybox] There is a problemm", "busybox")]
#[case("LP# 123234 [busybox] There is a problemm", "busybox")]
#[case("[ignored] LP#1 [netplan] title", "netplan")]
#[case("LP#1 [netplan] title with [brackets]", "netplan")]
#[case("LP#1 [unclosed title", "")]
fn bug_package_cases(#[case] summary: &str, #[case] expected: &str) {
    assert_eq!(codec::bug_package(summary), expected);
}

// ---------------------------------------------------------------------------
// 3. Parse
// ---------------------------------------------------------------------------

#[test]
fn parse_requires_bug_id() {
    assert_eq!(codec::parse(""), None);
    assert_eq!(codec::parse("LP# 123234 [busybox] There is a problemm"), None);
}

#[test]
fn parse_without_brackets_has_empty_package() {
    assert_eq!(codec::parse("LP#123234"), Some(BugKey::new(123234, "")));
}

#[test]
fn parse_recovers_rendered_key() {
    let cases = [
        (0, "busybox", "There is a problem"),
        (1967926, "netplan.io", "LP#99 [decoy] in the title"),
        (u64::from(u32::MAX), "linux-firmware", ""),
        (7, "", "no package"),
    ];
    for (bug_id, package, title) in cases {
        let summary = codec::render(bug_id, package, title);
        assert_eq!(
            codec::parse(&summary),
            Some(BugKey::new(bug_id, package)),
            "summary: {summary}"
        );
    }
}
