use crate::cli::{Cli, Mutation};
use crate::comment;
use crate::error::HookError;
use crate::labels;
use crate::linear::Gateway;
use crate::model::IssueReference;
use crate::reference;

/// The whole pipeline for one invocation: find a reference, resolve the
/// issue, apply the requested mutation. Fully sequential; any fatal
/// condition stops here and no further mutation is attempted.
pub async fn run(cli: &Cli, gateway: &dyn Gateway) -> Result<(), HookError> {
    let reference = find_reference(&cli.reference_sources()).ok_or(HookError::ReferenceNotFound)?;

    // A missing issue aborts before anything touches the gateway again.
    let issue = gateway
        .find_issue(&reference.team_key, reference.issue_number)
        .await?
        .ok_or_else(|| HookError::IssueNotFound(reference.clone()))?;

    match &cli.mutation {
        Mutation::Comment(raw) => {
            let body = comment::compose(gateway, raw).await?;
            gateway.add_comment(&issue.id, &body).await?;
        }
        Mutation::State(name) => {
            let state = gateway
                .find_workflow_state(name)
                .await?
                .ok_or_else(|| HookError::StateNotFound(name.clone()))?;
            gateway.update_state(&issue.id, &state.id).await?;
        }
        Mutation::Label(name) => {
            labels::reconcile(gateway, &issue.id, &issue.team_id, &issue.label_ids, name).await?;
        }
    }

    Ok(())
}

/// Scan the supplied sources in priority order; the first source with a
/// token wins. Exhausted sources get a diagnostic line, matching what CI
/// logs have always shown.
fn find_reference(sources: &[(&'static str, &str)]) -> Option<IssueReference> {
    for (name, text) in sources {
        match reference::parse(text) {
            Some(reference) => return Some(reference),
            None => println!("Unable to infer issue code from {name}"),
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use crate::model::{Issue, Label, WorkflowState};
    use crate::testutil::MockGateway;
    use std::collections::BTreeSet;

    fn cli(branch: &str, mutation: Mutation) -> Cli {
        Cli {
            token: None,
            branch: Some(branch.to_string()),
            title: None,
            description: None,
            mutation,
        }
    }

    fn issue(label_ids: &[&str]) -> Issue {
        Issue {
            id: "I1".into(),
            branch_name: "eng-123-fix-login".into(),
            parent_id: None,
            team_id: "T1".into(),
            label_ids: label_ids.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn state_mutation_end_to_end() {
        let gateway = MockGateway::new()
            .with_issue(issue(&[]))
            .with_state(WorkflowState { id: "S1".into(), description: String::new() });

        run(&cli("Fixes eng-123", Mutation::State("Done".into())), &gateway)
            .await
            .unwrap();

        let lookups = gateway.issue_lookups.lock().unwrap();
        assert_eq!(lookups.as_slice(), &[("ENG".to_string(), 123)]);
        let updates = gateway.state_updates.lock().unwrap();
        assert_eq!(updates.as_slice(), &[("I1".to_string(), "S1".to_string())]);
    }

    #[tokio::test]
    async fn comment_mutation_posts_exactly_once() {
        let gateway = MockGateway::new().with_issue(issue(&[]));

        run(&cli("eng-7-branch", Mutation::Comment("ship it".into())), &gateway)
            .await
            .unwrap();

        let comments = gateway.comments.lock().unwrap();
        assert_eq!(comments.as_slice(), &[("I1".to_string(), "ship it".to_string())]);
    }

    #[tokio::test]
    async fn label_mutation_creates_and_unions() {
        let gateway = MockGateway::new()
            .with_issue(issue(&["L9"]))
            .with_created_label("L7");

        run(&cli("eng-7-branch", Mutation::Label("bug".into())), &gateway)
            .await
            .unwrap();

        assert_eq!(gateway.created_labels.lock().unwrap().len(), 1);
        let expected: BTreeSet<String> = ["L9", "L7"].iter().map(|s| s.to_string()).collect();
        let updates = gateway.label_updates.lock().unwrap();
        assert_eq!(updates.as_slice(), &[("I1".to_string(), expected)]);
    }

    #[tokio::test]
    async fn label_mutation_reuses_existing_label() {
        let gateway = MockGateway::new()
            .with_issue(issue(&["L1"]))
            .with_labels(vec![Label { id: "L2".into(), name: "bug".into() }]);

        run(&cli("eng-7-branch", Mutation::Label("bug".into())), &gateway)
            .await
            .unwrap();

        assert!(gateway.created_labels.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn no_reference_anywhere_makes_no_network_call() {
        let gateway = MockGateway::new().with_issue(issue(&[]));
        let cli = Cli {
            token: None,
            branch: Some("no-ticket-here".into()),
            title: Some("plain title".into()),
            description: None,
            mutation: Mutation::State("Done".into()),
        };

        let result = run(&cli, &gateway).await;

        assert!(matches!(result, Err(HookError::ReferenceNotFound)));
        assert!(gateway.issue_lookups.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn falls_back_from_branch_to_title() {
        let gateway = MockGateway::new().with_issue(issue(&[]));
        let cli = Cli {
            token: None,
            branch: Some("no-ticket-here".into()),
            title: Some("Fixes OPS-9".into()),
            description: None,
            mutation: Mutation::Comment("done".into()),
        };

        run(&cli, &gateway).await.unwrap();

        let lookups = gateway.issue_lookups.lock().unwrap();
        assert_eq!(lookups.as_slice(), &[("OPS".to_string(), 9)]);
    }

    #[tokio::test]
    async fn missing_issue_aborts_before_mutating() {
        let gateway = MockGateway::new();

        let result = run(&cli("eng-123-x", Mutation::State("Done".into())), &gateway).await;

        assert!(matches!(result, Err(HookError::IssueNotFound(_))));
        assert!(gateway.state_updates.lock().unwrap().is_empty());
        assert!(gateway.comments.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_state_name_aborts() {
        let gateway = MockGateway::new().with_issue(issue(&[]));

        let result = run(&cli("eng-1-x", Mutation::State("Shipped".into())), &gateway).await;

        assert!(matches!(result, Err(HookError::StateNotFound(_))));
        assert!(gateway.state_updates.lock().unwrap().is_empty());
    }
}
