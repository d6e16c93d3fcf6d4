use crate::error::PaneError;
use crate::types::{IssuePage, RepoRef};

#[derive(Debug, Clone)]
pub enum Action {
    Quit,
    ScrollUp,
    ScrollDown,

    // Pagination
    NextPage,
    PrevPage,
    Retry,

    // Repository resolution
    ResolveRepo,
    RepoResolved(RepoRef),

    // Fetch results, tagged with the load id they answer
    IssuesLoaded(Box<IssuePage>, u64),
    IssuesFailed(String, u64),

    OpenInBrowser,
    YankUrl,

    Error(String),
    None,
}

impl From<PaneError> for Action {
    fn from(err: PaneError) -> Self {
        Action::Error(err.to_string())
    }
}
