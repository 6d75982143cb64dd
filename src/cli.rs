use anyhow::{bail, Result};

/// The one mutation applied to the matched issue. Parsing the kind up
/// front means an unknown kind is rejected before any network call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// Free text, possibly pipe-delimited with data-URI segments.
    Comment(String),
    /// Exact workflow state name, e.g. "Done".
    State(String),
    /// Label name, created in the team if absent.
    Label(String),
}

#[derive(Debug, PartialEq, Eq)]
pub struct Cli {
    pub token: Option<String>,
    pub branch: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub mutation: Mutation,
}

impl Cli {
    /// Reference sources in the order they are scanned: branch name
    /// first, then PR title, then PR description.
    pub fn reference_sources(&self) -> Vec<(&'static str, &str)> {
        let mut sources = Vec::new();
        if let Some(branch) = &self.branch {
            sources.push(("branch name", branch.as_str()));
        }
        if let Some(title) = &self.title {
            sources.push(("PR title", title.as_str()));
        }
        if let Some(description) = &self.description {
            sources.push(("PR description", description.as_str()));
        }
        sources
    }
}

/// Parse command-line arguments.
///
/// Supported forms:
///   linear-hook --branch eng-123-fix state Done
///   linear-hook --title "Fixes ENG-123" comment "LGTM"
///   linear-hook --token lin_api_xxx --branch eng-123-fix label bug
pub fn parse_args(args: &[String]) -> Result<Cli> {
    let mut token = None;
    let mut branch = None;
    let mut title = None;
    let mut description = None;
    let mut positional: Vec<String> = Vec::new();
    let mut i = 0;

    while i < args.len() {
        match args[i].as_str() {
            "--token" => {
                i += 1;
                token = Some(flag_value(args, i, "--token")?);
            }
            "--branch" | "-b" => {
                i += 1;
                branch = Some(flag_value(args, i, "--branch")?);
            }
            "--title" | "-t" => {
                i += 1;
                title = Some(flag_value(args, i, "--title")?);
            }
            "--description" | "-d" => {
                i += 1;
                description = Some(flag_value(args, i, "--description")?);
            }
            other if other.starts_with('-') => {
                bail!("Unknown flag {other}\n\n{}", usage());
            }
            _ => {
                positional.push(args[i].clone());
            }
        }
        i += 1;
    }

    if positional.len() < 2 {
        bail!("Missing mutation kind or value\n\n{}", usage());
    }

    let kind = positional.remove(0);
    let value = positional.join(" ");
    let mutation = match kind.as_str() {
        "comment" => Mutation::Comment(value),
        "state" => Mutation::State(value),
        "label" => Mutation::Label(value),
        other => bail!("Unsupported mutation kind '{other}' (expected comment, state, or label)"),
    };

    if branch.is_none() && title.is_none() && description.is_none() {
        bail!("No reference source given; pass at least one of --branch, --title, --description");
    }

    Ok(Cli {
        token,
        branch,
        title,
        description,
        mutation,
    })
}

fn flag_value(args: &[String], i: usize, flag: &str) -> Result<String> {
    match args.get(i) {
        Some(value) => Ok(value.clone()),
        None => bail!("Missing value for {flag} flag"),
    }
}

pub fn usage() -> String {
    [
        "linear-hook — update a Linear issue from branch/PR metadata",
        "",
        "USAGE:",
        "  linear-hook [OPTIONS] <comment|state|label> <value>",
        "",
        "OPTIONS:",
        "  --token <key>        Linear API key or OAuth token (or LINEAR_API_KEY)",
        "  -b, --branch <text>       Branch name to scan for an issue reference",
        "  -t, --title <text>        PR title to scan next",
        "  -d, --description <text>  PR description to scan last",
        "",
        "EXAMPLES:",
        "  linear-hook --branch eng-123-fix-login state Done",
        "  linear-hook --title \"Fixes ENG-123\" comment \"Deployed to staging\"",
        "  linear-hook --branch eng-123-fix-login label bug",
    ]
    .join("\n")
}
