use async_trait::async_trait;

use crate::error::Result;
use crate::types::{IssuePage, PageCursor};

/// Anything that can hand out pages of a repository's issues.
#[async_trait]
pub trait IssueSource: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &str;

    /// Fetch `size` issues for `owner/repo` positioned by `cursor`.
    async fn fetch_issues(
        &self,
        owner: &str,
        repo: &str,
        size: u32,
        cursor: &PageCursor,
    ) -> Result<IssuePage>;
}
