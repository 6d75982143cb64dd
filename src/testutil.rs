//! Shared mock gateway for unit tests, recording every call it receives.

use std::collections::BTreeSet;
use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::linear::Gateway;
use crate::model::{Issue, Label, WorkflowState};

pub struct UploadCall {
    pub content_type: String,
    pub filename: String,
    pub bytes: Vec<u8>,
}

#[derive(Default)]
pub struct MockGateway {
    issue: Option<Issue>,
    state: Option<WorkflowState>,
    labels: Vec<Label>,
    created_label_id: Option<String>,
    fail_upload: bool,
    fail_list: bool,

    pub issue_lookups: Mutex<Vec<(String, u64)>>,
    pub created_labels: Mutex<Vec<(String, String)>>,
    pub label_updates: Mutex<Vec<(String, BTreeSet<String>)>>,
    pub state_updates: Mutex<Vec<(String, String)>>,
    pub comments: Mutex<Vec<(String, String)>>,
    pub uploads: Mutex<Vec<UploadCall>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_issue(mut self, issue: Issue) -> Self {
        self.issue = Some(issue);
        self
    }

    pub fn with_state(mut self, state: WorkflowState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn with_labels(mut self, labels: Vec<Label>) -> Self {
        self.labels = labels;
        self
    }

    pub fn with_created_label(mut self, id: &str) -> Self {
        self.created_label_id = Some(id.to_string());
        self
    }

    pub fn with_upload_failure(mut self) -> Self {
        self.fail_upload = true;
        self
    }

    pub fn with_list_failure(mut self) -> Self {
        self.fail_list = true;
        self
    }
}

#[async_trait]
impl Gateway for MockGateway {
    async fn find_issue(&self, team_key: &str, issue_number: u64) -> Result<Option<Issue>> {
        self.issue_lookups
            .lock()
            .unwrap()
            .push((team_key.to_string(), issue_number));
        Ok(self.issue.clone())
    }

    async fn find_workflow_state(&self, _name: &str) -> Result<Option<WorkflowState>> {
        Ok(self.state.clone())
    }

    async fn list_labels(&self, _team_id: &str) -> Result<Vec<Label>> {
        if self.fail_list {
            bail!("Mock label listing failure");
        }
        Ok(self.labels.clone())
    }

    async fn create_label(&self, team_id: &str, name: &str) -> Result<Option<String>> {
        self.created_labels
            .lock()
            .unwrap()
            .push((team_id.to_string(), name.to_string()));
        Ok(self.created_label_id.clone())
    }

    async fn update_labels(&self, issue_id: &str, label_ids: &BTreeSet<String>) -> Result<()> {
        self.label_updates
            .lock()
            .unwrap()
            .push((issue_id.to_string(), label_ids.clone()));
        Ok(())
    }

    async fn update_state(&self, issue_id: &str, state_id: &str) -> Result<()> {
        self.state_updates
            .lock()
            .unwrap()
            .push((issue_id.to_string(), state_id.to_string()));
        Ok(())
    }

    async fn add_comment(&self, issue_id: &str, body: &str) -> Result<()> {
        self.comments
            .lock()
            .unwrap()
            .push((issue_id.to_string(), body.to_string()));
        Ok(())
    }

    async fn upload_asset(
        &self,
        content_type: &str,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<String> {
        if self.fail_upload {
            bail!("Mock upload failure");
        }
        let mut uploads = self.uploads.lock().unwrap();
        uploads.push(UploadCall {
            content_type: content_type.to_string(),
            filename: filename.to_string(),
            bytes,
        });
        Ok(format!("https://assets.test/upload-{}", uploads.len()))
    }
}
