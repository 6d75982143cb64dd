use thiserror::Error;

use crate::model::IssueReference;

/// Everything that can end a run early. Each variant maps to a diagnostic
/// and a non-zero exit in `main`; nothing below this retries.
#[derive(Debug, Error)]
pub enum HookError {
    #[error("unable to infer an issue code from any supplied source")]
    ReferenceNotFound,

    #[error("no issue matches {0}")]
    IssueNotFound(IssueReference),

    #[error("no workflow state named '{0}'")]
    StateNotFound(String),

    #[error("label '{0}' could not be found or created")]
    LabelCreateFailed(String),

    #[error(transparent)]
    Remote(#[from] anyhow::Error),
}
