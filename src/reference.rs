use std::sync::OnceLock;

use regex::Regex;

use crate::model::IssueReference;

/// Linear links source-control activity to issues through a `TEAM-123`
/// token embedded in the branch name, PR title, or PR description.
fn reference_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)(\w+)-(\d+)").unwrap())
}

/// Find the first issue reference in `text`. The team key is uppercased;
/// multiple candidates are not disambiguated. A digit run too large for
/// a `u64` cannot name a real issue and is treated as no reference, so
/// the caller falls through to its next source.
pub fn parse(text: &str) -> Option<IssueReference> {
    let caps = reference_pattern().captures(text)?;
    let issue_number = caps[2].parse().ok()?;
    Some(IssueReference {
        team_key: caps[1].to_uppercase(),
        issue_number,
    })
}
