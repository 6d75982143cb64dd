use std::collections::BTreeSet;

use crate::error::HookError;
use crate::linear::Gateway;

/// Attach a label by name: resolve it against the team's existing labels
/// (creating it if absent), merge the id into the issue's observed label
/// set, and write the union back. Re-running with the same name never
/// duplicates or removes other labels.
pub async fn reconcile(
    gateway: &dyn Gateway,
    issue_id: &str,
    team_id: &str,
    current: &BTreeSet<String>,
    name: &str,
) -> Result<(), HookError> {
    let labels = gateway.list_labels(team_id).await?;
    let resolved = match labels.iter().find(|label| label.name == name) {
        Some(label) => label.id.clone(),
        None => gateway
            .create_label(team_id, name)
            .await?
            .ok_or_else(|| HookError::LabelCreateFailed(name.to_string()))?,
    };

    let mut merged = current.clone();
    merged.insert(resolved);
    gateway.update_labels(issue_id, &merged).await?;
    Ok(())
}
