use std::collections::BTreeSet;
use std::future::Future;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use futures::stream::{self, Stream, TryStreamExt};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use crate::config::Credential;
use crate::model::{Issue, Label, WorkflowState};

const API_URL: &str = "https://api.linear.app/graphql";
const LABEL_PAGE_SIZE: u32 = 50;
// Uploaded assets are content-addressed by Linear, so a long cache lifetime is safe.
const ASSET_CACHE_CONTROL: &str = "public, max-age=31536000";

/// Everything the pipeline needs from Linear, one logical call per method.
/// No method retries; any transport or API-level failure is fatal.
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn find_issue(&self, team_key: &str, issue_number: u64) -> Result<Option<Issue>>;
    async fn find_workflow_state(&self, name: &str) -> Result<Option<WorkflowState>>;
    async fn list_labels(&self, team_id: &str) -> Result<Vec<Label>>;
    /// Returns `None` when the server reports no created label.
    async fn create_label(&self, team_id: &str, name: &str) -> Result<Option<String>>;
    /// Whole-set replace; callers form the union beforehand.
    async fn update_labels(&self, issue_id: &str, label_ids: &BTreeSet<String>) -> Result<()>;
    async fn update_state(&self, issue_id: &str, state_id: &str) -> Result<()>;
    async fn add_comment(&self, issue_id: &str, body: &str) -> Result<()>;
    /// Two-phase upload: negotiate a signed destination, then transfer the
    /// bytes. Returns the durable asset URL.
    async fn upload_asset(&self, content_type: &str, filename: &str, bytes: Vec<u8>)
        -> Result<String>;
}

pub struct LinearClient {
    credential: Credential,
    client: reqwest::Client,
}

impl LinearClient {
    pub fn new(credential: Credential) -> Self {
        Self {
            credential,
            client: reqwest::Client::new(),
        }
    }

    async fn post<T: DeserializeOwned>(&self, query: &str, variables: serde_json::Value) -> Result<T> {
        let body = json!({ "query": query, "variables": variables });
        let response = self
            .client
            .post(API_URL)
            .header("Authorization", self.credential.header_value())
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .context("Linear API request failed")?;

        let status = response.status();
        let text = response
            .text()
            .await
            .context("Failed to read Linear response")?;
        if !status.is_success() {
            bail!("Linear API returned {status}. API response: {text}");
        }
        decode(&text)
    }

    /// Lazy page sequence over a team's labels.
    fn label_pages<'a>(&'a self, team_id: &'a str) -> impl Stream<Item = Result<Vec<Label>>> + 'a {
        paginate(move |after| async move {
            let data: LabelsData = self
                .post(
                    LABELS_QUERY,
                    json!({ "teamId": team_id, "first": LABEL_PAGE_SIZE, "after": after }),
                )
                .await?;
            let connection = data.issue_labels;
            let next = if connection.page_info.has_next_page {
                Some(
                    connection
                        .page_info
                        .end_cursor
                        .context("Linear reported another label page but no cursor")?,
                )
            } else {
                None
            };
            let labels = connection
                .nodes
                .into_iter()
                .map(|node| Label {
                    id: node.id,
                    name: node.name,
                })
                .collect();
            Ok((labels, next))
        })
    }
}

/// Drive an opaque-cursor listing as a lazy stream of pages. `fetch`
/// takes the cursor (`None` for the first page) and returns one page of
/// entries plus the cursor for the next page, or `None` when the server
/// reports no further page. A failed fetch ends the stream with that
/// error, so a listing is never silently partial.
fn paginate<T, F, Fut>(fetch: F) -> impl Stream<Item = Result<Vec<T>>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<(Vec<T>, Option<String>)>>,
{
    stream::try_unfold((Some(None), fetch), |(cursor, mut fetch)| async move {
        let Some(after) = cursor else {
            return Ok(None);
        };
        let (items, end_cursor) = fetch(after).await?;
        Ok(Some((items, (end_cursor.map(Some), fetch))))
    })
}

/// Split from `post` so envelope handling is testable: a GraphQL `errors`
/// array inside a 200 response is still a fatal failure, and the raw body
/// is kept for diagnosis.
fn decode<T: DeserializeOwned>(text: &str) -> Result<T> {
    let envelope: GqlEnvelope =
        serde_json::from_str(text).context("Failed to parse Linear response")?;
    if let Some(errors) = envelope.errors {
        if !errors.is_empty() {
            bail!("Linear API returned errors: {}", serde_json::Value::Array(errors));
        }
    }
    let data = envelope.data.context("No data in Linear response")?;
    serde_json::from_value(data).context("Unexpected shape in Linear response")
}

#[async_trait]
impl Gateway for LinearClient {
    async fn find_issue(&self, team_key: &str, issue_number: u64) -> Result<Option<Issue>> {
        let data: IssuesData = self
            .post(
                ISSUES_QUERY,
                json!({ "teamKey": team_key, "issueNumber": issue_number }),
            )
            .await?;
        // The server guarantees at most one issue per (team, number).
        let Some(node) = data.issues.nodes.into_iter().next() else {
            return Ok(None);
        };
        Ok(Some(Issue {
            id: node.id,
            branch_name: node.branch_name,
            parent_id: node.parent.map(|p| p.id),
            team_id: node.team.id,
            label_ids: node.labels.nodes.into_iter().map(|l| l.id).collect(),
        }))
    }

    async fn find_workflow_state(&self, name: &str) -> Result<Option<WorkflowState>> {
        let data: WorkflowStatesData = self
            .post(WORKFLOW_STATES_QUERY, json!({ "stateName": name }))
            .await?;
        Ok(data.workflow_states.nodes.into_iter().next().map(|node| WorkflowState {
            id: node.id,
            description: node.description.unwrap_or_default(),
        }))
    }

    async fn list_labels(&self, team_id: &str) -> Result<Vec<Label>> {
        self.label_pages(team_id).try_concat().await
    }

    async fn create_label(&self, team_id: &str, name: &str) -> Result<Option<String>> {
        let data: LabelCreateData = self
            .post(
                LABEL_CREATE_MUTATION,
                json!({ "teamId": team_id, "labelName": name }),
            )
            .await?;
        Ok(data.issue_label_create.issue_label.map(|label| label.id))
    }

    async fn update_labels(&self, issue_id: &str, label_ids: &BTreeSet<String>) -> Result<()> {
        let _: serde_json::Value = self
            .post(
                ISSUE_UPDATE_LABELS_MUTATION,
                json!({ "issueId": issue_id, "labelIds": label_ids }),
            )
            .await?;
        Ok(())
    }

    async fn update_state(&self, issue_id: &str, state_id: &str) -> Result<()> {
        let _: serde_json::Value = self
            .post(
                ISSUE_UPDATE_STATE_MUTATION,
                json!({ "issueId": issue_id, "stateId": state_id }),
            )
            .await?;
        Ok(())
    }

    async fn add_comment(&self, issue_id: &str, body: &str) -> Result<()> {
        let _: serde_json::Value = self
            .post(
                COMMENT_CREATE_MUTATION,
                json!({ "issueId": issue_id, "body": body }),
            )
            .await?;
        Ok(())
    }

    async fn upload_asset(
        &self,
        content_type: &str,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<String> {
        // Phase 1: negotiate the signed destination.
        let data: FileUploadData = self
            .post(
                FILE_UPLOAD_MUTATION,
                json!({ "contentType": content_type, "filename": filename, "size": bytes.len() }),
            )
            .await?;
        let upload = data
            .file_upload
            .upload_file
            .context("Linear returned no signed upload destination")?;

        // Phase 2: transfer the whole payload in one PUT, passing the
        // server-supplied headers through untouched.
        let mut request = self
            .client
            .put(&upload.upload_url)
            .header("Content-Type", content_type)
            .header("Cache-Control", ASSET_CACHE_CONTROL);
        for header in &upload.headers {
            request = request.header(header.key.as_str(), header.value.as_str());
        }
        let response = request
            .body(bytes)
            .send()
            .await
            .context("Asset upload failed")?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            bail!("Asset upload returned {status}. API response: {text}");
        }

        Ok(upload.asset_url)
    }
}

const ISSUES_QUERY: &str = r#"
query Issues($teamKey: String!, $issueNumber: Float) {
  issues(filter: {team: {key: {eq: $teamKey}}, number: {eq: $issueNumber}}) {
    nodes {
      id
      branchName
      parent { id }
      team { id }
      labels { nodes { id } }
    }
  }
}
"#;

const WORKFLOW_STATES_QUERY: &str = r#"
query WorkflowState($stateName: String!) {
  workflowStates(filter: {name: {eq: $stateName}}) {
    nodes { id description }
  }
}
"#;

const LABELS_QUERY: &str = r#"
query LabelsByTeam($teamId: ID, $first: Int!, $after: String) {
  issueLabels(first: $first, after: $after, filter: {team: {id: {eq: $teamId}}}) {
    nodes { id name }
    pageInfo { hasNextPage endCursor }
  }
}
"#;

const LABEL_CREATE_MUTATION: &str = r#"
mutation IssueLabelCreate($teamId: String, $labelName: String!) {
  issueLabelCreate(input: {name: $labelName, teamId: $teamId}) {
    success
    issueLabel { id }
  }
}
"#;

const ISSUE_UPDATE_LABELS_MUTATION: &str = r#"
mutation IssueUpdate($issueId: String!, $labelIds: [String!]) {
  issueUpdate(id: $issueId, input: {labelIds: $labelIds}) {
    success
    issue { id }
  }
}
"#;

const ISSUE_UPDATE_STATE_MUTATION: &str = r#"
mutation IssueUpdate($issueId: String!, $stateId: String!) {
  issueUpdate(id: $issueId, input: {stateId: $stateId}) {
    success
    issue { id }
  }
}
"#;

const COMMENT_CREATE_MUTATION: &str = r#"
mutation CommentCreateInput($issueId: String!, $body: String!) {
  commentCreate(input: {issueId: $issueId, body: $body}) {
    success
    comment { id }
  }
}
"#;

const FILE_UPLOAD_MUTATION: &str = r#"
mutation FileUpload($contentType: String!, $filename: String!, $size: Int!) {
  fileUpload(contentType: $contentType, filename: $filename, size: $size) {
    success
    uploadFile {
      uploadUrl
      assetUrl
      headers { key value }
    }
  }
}
"#;

#[derive(Deserialize)]
struct GqlEnvelope {
    data: Option<serde_json::Value>,
    errors: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct NodeRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct IssuesData {
    issues: IssueConnection,
}

#[derive(Debug, Deserialize)]
struct IssueConnection {
    nodes: Vec<IssueNode>,
}

#[derive(Debug, Deserialize)]
struct IssueNode {
    id: String,
    #[serde(rename = "branchName")]
    branch_name: String,
    parent: Option<NodeRef>,
    team: NodeRef,
    labels: LabelIdConnection,
}

#[derive(Debug, Deserialize)]
struct LabelIdConnection {
    nodes: Vec<NodeRef>,
}

#[derive(Deserialize)]
struct WorkflowStatesData {
    #[serde(rename = "workflowStates")]
    workflow_states: WorkflowStateConnection,
}

#[derive(Deserialize)]
struct WorkflowStateConnection {
    nodes: Vec<WorkflowStateNode>,
}

#[derive(Deserialize)]
struct WorkflowStateNode {
    id: String,
    description: Option<String>,
}

#[derive(Deserialize)]
struct LabelsData {
    #[serde(rename = "issueLabels")]
    issue_labels: LabelConnection,
}

#[derive(Deserialize)]
struct LabelConnection {
    nodes: Vec<LabelNode>,
    #[serde(rename = "pageInfo")]
    page_info: PageInfo,
}

#[derive(Deserialize)]
struct LabelNode {
    id: String,
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    has_next_page: bool,
    end_cursor: Option<String>,
}

#[derive(Deserialize)]
struct LabelCreateData {
    #[serde(rename = "issueLabelCreate")]
    issue_label_create: LabelCreatePayload,
}

#[derive(Deserialize)]
struct LabelCreatePayload {
    #[serde(rename = "issueLabel")]
    issue_label: Option<NodeRef>,
}

#[derive(Deserialize)]
struct FileUploadData {
    #[serde(rename = "fileUpload")]
    file_upload: FileUploadPayload,
}

#[derive(Deserialize)]
struct FileUploadPayload {
    #[serde(rename = "uploadFile")]
    upload_file: Option<SignedUpload>,
}

/// Single-use destination issued by Linear for one direct binary transfer.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignedUpload {
    upload_url: String,
    asset_url: String,
    headers: Vec<UploadHeader>,
}

#[derive(Deserialize)]
struct UploadHeader {
    key: String,
    value: String,
}
