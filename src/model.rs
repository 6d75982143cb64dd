use std::collections::BTreeSet;
use std::fmt;

/// A `TEAM-123` style reference extracted from branch name, PR title, or
/// PR description. Derived once per invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueReference {
    pub team_key: String,
    pub issue_number: u64,
}

impl fmt::Display for IssueReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.team_key, self.issue_number)
    }
}

/// A Linear issue, fetched fresh each run. The label set is read once,
/// merged locally, and written back as a whole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub id: String,
    // branch_name and parent_id come back with every issue lookup; no
    // mutation path consumes them yet.
    #[allow(dead_code)]
    pub branch_name: String,
    #[allow(dead_code)]
    pub parent_id: Option<String>,
    pub team_id: String,
    pub label_ids: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowState {
    pub id: String,
    #[allow(dead_code)]
    pub description: String,
}

/// A team-scoped label. Names are matched case-sensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub id: String,
    pub name: String,
}
