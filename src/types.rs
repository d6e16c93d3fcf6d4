use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Owner and name of the repository whose issues are shown
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Parse `owner/repo`. A trailing `.git` is dropped.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim().trim_end_matches('/');
        let s = s.strip_suffix(".git").unwrap_or(s);
        let (owner, name) = s.split_once('/')?;
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return None;
        }
        Some(Self::new(owner, name))
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Which issues to list
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum IssueStateFilter {
    #[default]
    Open,
    Closed,
    All,
}

impl IssueStateFilter {
    pub fn as_graphql_states(&self) -> Option<Vec<&'static str>> {
        match self {
            IssueStateFilter::Open => Some(vec!["OPEN"]),
            IssueStateFilter::Closed => Some(vec!["CLOSED"]),
            IssueStateFilter::All => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub name: String,
    pub color: String,
}

/// One issue row, with the cursor that locates it in the connection
#[derive(Debug, Clone, PartialEq)]
pub struct Issue {
    pub id: String,
    pub number: u64,
    pub title: String,
    pub url: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
    pub labels: Vec<Label>,
    pub participants: Vec<String>,
    pub participant_count: u32,
    pub comments: u32,
    pub milestone: Option<String>,
    pub cursor: String,
}

/// A single page of issues plus repository-level facts returned alongside it
#[derive(Debug, Clone, PartialEq)]
pub struct IssuePage {
    pub issues: Vec<Issue>,
    pub total_count: u64,
    pub has_issues_enabled: bool,
}

impl IssuePage {
    /// Cursor of the first row; `None` for an empty page.
    pub fn start_cursor(&self) -> Option<&str> {
        self.issues.first().map(|i| i.cursor.as_str())
    }

    /// Cursor of the last row; `None` for an empty page.
    pub fn end_cursor(&self) -> Option<&str> {
        self.issues.last().map(|i| i.cursor.as_str())
    }
}

/// Where a requested page sits relative to a cursor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageCursor {
    First,
    After(String),
    Before(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_ref_parses_owner_and_name() {
        assert_eq!(
            RepoRef::parse("rust-lang/rust"),
            Some(RepoRef::new("rust-lang", "rust"))
        );
    }

    #[test]
    fn repo_ref_strips_git_suffix() {
        assert_eq!(
            RepoRef::parse("owner/repo.git"),
            Some(RepoRef::new("owner", "repo"))
        );
    }

    #[test]
    fn repo_ref_rejects_malformed() {
        assert_eq!(RepoRef::parse("owner"), None);
        assert_eq!(RepoRef::parse("/repo"), None);
        assert_eq!(RepoRef::parse("owner/"), None);
        assert_eq!(RepoRef::parse("a/b/c"), None);
    }

    #[test]
    fn empty_page_has_no_cursors() {
        let page = IssuePage {
            issues: vec![],
            total_count: 0,
            has_issues_enabled: true,
        };
        assert_eq!(page.start_cursor(), None);
        assert_eq!(page.end_cursor(), None);
    }

    #[test]
    fn state_filter_maps_to_graphql() {
        assert_eq!(
            IssueStateFilter::Open.as_graphql_states(),
            Some(vec!["OPEN"])
        );
        assert_eq!(IssueStateFilter::All.as_graphql_states(), None);
    }
}
