use async_trait::async_trait;
use chrono::{DateTime, Utc};
use octocrab::Octocrab;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::error::{PaneError, Result};
use crate::source::IssueSource;
use crate::types::{Issue, IssuePage, IssueStateFilter, Label, PageCursor};

const ISSUES_QUERY: &str = r#"
query($owner: String!, $name: String!, $first: Int, $last: Int, $after: String, $before: String, $states: [IssueState!]) {
  repository(owner: $owner, name: $name) {
    hasIssuesEnabled
    issues(first: $first, last: $last, after: $after, before: $before, states: $states, orderBy: {field: CREATED_AT, direction: DESC}) {
      totalCount
      edges {
        cursor
        node {
          id
          number
          title
          url
          createdAt
          author { login }
          labels(first: 10) { nodes { name color } }
          participants(first: 10) { totalCount nodes { login } }
          comments { totalCount }
          milestone { title }
        }
      }
    }
  }
}
"#;

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct RepositoryData {
    repository: Option<RepositoryNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepositoryNode {
    has_issues_enabled: bool,
    issues: IssueConnection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IssueConnection {
    total_count: u64,
    #[serde(default)]
    edges: Vec<IssueEdge>,
}

#[derive(Debug, Deserialize)]
struct IssueEdge {
    cursor: String,
    node: IssueNode,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IssueNode {
    id: String,
    number: u64,
    title: String,
    url: String,
    created_at: DateTime<Utc>,
    author: Option<Login>,
    labels: Option<Nodes<LabelNode>>,
    participants: Counted<Login>,
    comments: Counted<Login>,
    milestone: Option<MilestoneNode>,
}

#[derive(Debug, Deserialize)]
struct Login {
    login: String,
}

#[derive(Debug, Deserialize)]
struct LabelNode {
    name: String,
    color: String,
}

#[derive(Debug, Deserialize)]
struct MilestoneNode {
    title: String,
}

#[derive(Debug, Deserialize)]
struct Nodes<T> {
    #[serde(default = "Vec::new")]
    nodes: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Counted<T> {
    total_count: u32,
    #[serde(default = "Vec::new")]
    nodes: Vec<T>,
}

impl From<IssueEdge> for Issue {
    fn from(edge: IssueEdge) -> Self {
        let node = edge.node;
        Issue {
            id: node.id,
            number: node.number,
            title: node.title,
            url: node.url,
            // Deleted accounts come back as a null author.
            author: node
                .author
                .map(|a| a.login)
                .unwrap_or_else(|| "ghost".to_string()),
            created_at: node.created_at,
            labels: node
                .labels
                .map(|l| {
                    l.nodes
                        .into_iter()
                        .map(|n| Label {
                            name: n.name,
                            color: n.color,
                        })
                        .collect()
                })
                .unwrap_or_default(),
            participants: node.participants.nodes.into_iter().map(|p| p.login).collect(),
            participant_count: node.participants.total_count,
            comments: node.comments.total_count,
            milestone: node.milestone.map(|m| m.title),
            cursor: edge.cursor,
        }
    }
}

impl From<octocrab::Error> for PaneError {
    fn from(err: octocrab::Error) -> Self {
        PaneError::Api(err.to_string())
    }
}

pub struct GitHub {
    client: Octocrab,
    state: IssueStateFilter,
}

impl std::fmt::Debug for GitHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHub")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl GitHub {
    pub fn new(token: String, api_url: Option<&str>, state: IssueStateFilter) -> Result<Self> {
        let mut builder = Octocrab::builder();
        if let Some(url) = api_url {
            builder = builder
                .base_uri(url)
                .map_err(|e| PaneError::Config(format!("invalid api_url '{}': {}", url, e)))?;
        }
        let client = builder
            .personal_token(token)
            .build()
            .map_err(|e| PaneError::Auth(e.to_string()))?;

        Ok(Self { client, state })
    }

    fn variables(
        &self,
        owner: &str,
        repo: &str,
        size: u32,
        cursor: &PageCursor,
    ) -> serde_json::Value {
        let mut vars = json!({
            "owner": owner,
            "name": repo,
            "states": self.state.as_graphql_states(),
        });
        match cursor {
            PageCursor::First => {
                vars["first"] = json!(size);
            }
            PageCursor::After(c) => {
                vars["first"] = json!(size);
                vars["after"] = json!(c);
            }
            PageCursor::Before(c) => {
                vars["last"] = json!(size);
                vars["before"] = json!(c);
            }
        }
        vars
    }
}

#[async_trait]
impl IssueSource for GitHub {
    fn name(&self) -> &str {
        "GitHub"
    }

    async fn fetch_issues(
        &self,
        owner: &str,
        repo: &str,
        size: u32,
        cursor: &PageCursor,
    ) -> Result<IssuePage> {
        debug!(owner, repo, size, ?cursor, "fetching issues page");

        let body = json!({
            "query": ISSUES_QUERY,
            "variables": self.variables(owner, repo, size, cursor),
        });
        let response: GraphQlResponse<RepositoryData> = self.client.graphql(&body).await?;

        if let Some(errors) = response.errors {
            let messages: Vec<&str> = errors.iter().map(|e| e.message.as_str()).collect();
            return Err(PaneError::GraphQl(messages.join(", ")));
        }

        let repository = response
            .data
            .and_then(|d| d.repository)
            .ok_or_else(|| PaneError::NotFound(format!("{}/{}", owner, repo)))?;

        Ok(IssuePage {
            issues: repository
                .issues
                .edges
                .into_iter()
                .map(Issue::from)
                .collect(),
            total_count: repository.issues.total_count,
            has_issues_enabled: repository.has_issues_enabled,
        })
    }
}
