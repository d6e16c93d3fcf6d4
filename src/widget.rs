//! State machine behind the issues card.
//!
//! The widget never performs I/O itself. Operations that need a page return a
//! [`FetchRequest`]; the caller runs it and feeds the outcome back through
//! [`IssuesWidget::apply_loaded`] or [`IssuesWidget::apply_failed`]. Each request
//! carries a load id, and only the outstanding id is accepted.

use tracing::{debug, warn};

use crate::types::{Direction, Issue, IssuePage, PageCursor, RepoRef};

pub const DEFAULT_PAGE_SIZE: u32 = 5;

/// Which fetch a failure belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStage {
    Initial,
    Page(Direction),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    /// Owner not known yet; nothing is fetched.
    Unresolved,
    LoadingInitial,
    Ready(IssuePage),
    LoadingPage {
        previous: IssuePage,
        direction: Direction,
    },
    Failed {
        stage: FetchStage,
        message: String,
        previous: Option<IssuePage>,
    },
}

/// Whether the repository has issues switched on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssuesEnabled {
    Unknown,
    Enabled,
    Disabled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub load_id: u64,
    pub repo: RepoRef,
    pub size: u32,
    pub cursor: PageCursor,
}

/// What the card should show; computed from state on every render.
#[derive(Debug, Clone, PartialEq)]
pub enum View<'a> {
    Placeholder,
    Card(CardBody<'a>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum CardBody<'a> {
    /// `rows` is `None` while a page fetch is in flight.
    Issues {
        rows: Option<&'a [Issue]>,
        show_prev: bool,
        show_next: bool,
        current_page: u64,
        total_pages: u64,
        error: Option<&'a str>,
    },
    Loading,
    Empty {
        enabled: bool,
    },
    Failed {
        message: &'a str,
    },
}

#[derive(Debug)]
pub struct IssuesWidget {
    repo: Option<RepoRef>,
    page_size: u32,
    offset: u64,
    phase: Phase,
    next_load_id: u64,
    in_flight: Option<u64>,
    selected: usize,
    /// id of the issue selected when the outstanding fetch began
    reselect: Option<String>,
}

impl IssuesWidget {
    pub fn new(page_size: u32) -> Self {
        Self {
            repo: None,
            page_size: page_size.max(1),
            offset: 0,
            phase: Phase::Unresolved,
            next_load_id: 0,
            in_flight: None,
            selected: 0,
            reselect: None,
        }
    }

    pub fn repo(&self) -> Option<&RepoRef> {
        self.repo.as_ref()
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    /// Set the repository and, the first time, start the initial load.
    pub fn resolve(&mut self, repo: RepoRef) -> Option<FetchRequest> {
        let first = self.repo.is_none();
        self.repo = Some(repo);
        if first && self.phase == Phase::Unresolved {
            self.begin_initial()
        } else {
            None
        }
    }

    fn begin_initial(&mut self) -> Option<FetchRequest> {
        let repo = self.repo.clone()?;
        self.reselect = self.selected_issue().map(|i| i.id.clone());
        self.offset = 0;
        self.selected = 0;
        self.phase = Phase::LoadingInitial;
        Some(self.dispatch(repo, PageCursor::First))
    }

    fn dispatch(&mut self, repo: RepoRef, cursor: PageCursor) -> FetchRequest {
        self.next_load_id += 1;
        self.in_flight = Some(self.next_load_id);
        debug!(load_id = self.next_load_id, %repo, ?cursor, "issuing fetch");
        FetchRequest {
            load_id: self.next_load_id,
            repo,
            size: self.page_size,
            cursor,
        }
    }

    pub fn is_fetching(&self) -> bool {
        self.in_flight.is_some()
    }

    /// The page whose figures drive the card: the loaded one, or the one a
    /// pending or failed page fetch started from.
    pub fn page(&self) -> Option<&IssuePage> {
        match &self.phase {
            Phase::Ready(page) => Some(page),
            Phase::LoadingPage { previous, .. } => Some(previous),
            Phase::Failed { previous, .. } => previous.as_ref(),
            Phase::Unresolved | Phase::LoadingInitial => None,
        }
    }

    pub fn issues(&self) -> Option<&[Issue]> {
        match &self.phase {
            Phase::Ready(page) => Some(&page.issues),
            Phase::Failed {
                previous: Some(page),
                ..
            } => Some(&page.issues),
            _ => None,
        }
    }

    pub fn total_count(&self) -> u64 {
        self.page().map(|p| p.total_count).unwrap_or(0)
    }

    pub fn issues_enabled(&self) -> IssuesEnabled {
        match self.page() {
            Some(p) if p.has_issues_enabled => IssuesEnabled::Enabled,
            Some(_) => IssuesEnabled::Disabled,
            None => IssuesEnabled::Unknown,
        }
    }

    pub fn current_page(&self) -> u64 {
        self.offset / self.page_size as u64 + 1
    }

    /// `total_count / page_size` rounded half up.
    pub fn total_pages(&self) -> u64 {
        let size = self.page_size as u64;
        (2 * self.total_count() + size) / (2 * size)
    }

    pub fn has_prev(&self) -> bool {
        self.offset > 0
    }

    /// An empty page carries no cursor, so there is nothing to page past.
    pub fn has_next(&self) -> bool {
        self.current_page() != self.total_pages()
            && self.page().and_then(|p| p.end_cursor()).is_some()
    }

    pub fn next_page(&mut self) -> Option<FetchRequest> {
        if self.is_fetching() || !self.has_next() {
            return None;
        }
        self.begin_page(Direction::Forward)
    }

    pub fn prev_page(&mut self) -> Option<FetchRequest> {
        if self.is_fetching() || !self.has_prev() {
            return None;
        }
        self.begin_page(Direction::Backward)
    }

    fn begin_page(&mut self, direction: Direction) -> Option<FetchRequest> {
        let repo = self.repo.clone()?;
        let previous = self.page()?.clone();
        let cursor = match direction {
            Direction::Forward => PageCursor::After(previous.end_cursor()?.to_string()),
            Direction::Backward => match previous.start_cursor() {
                Some(c) => PageCursor::Before(c.to_string()),
                // Landed on an empty page past the end; start over.
                None => return self.begin_initial(),
            },
        };
        self.reselect = self.selected_issue().map(|i| i.id.clone());
        self.phase = Phase::LoadingPage {
            previous,
            direction,
        };
        Some(self.dispatch(repo, cursor))
    }

    /// Retry a failed fetch, or reload from the first page otherwise.
    pub fn retry(&mut self) -> Option<FetchRequest> {
        if self.is_fetching() {
            return None;
        }
        match self.phase.clone() {
            Phase::Failed {
                stage: FetchStage::Page(direction),
                previous: Some(previous),
                ..
            } => {
                self.phase = Phase::Ready(previous);
                self.begin_page(direction)
            }
            _ => self.begin_initial(),
        }
    }

    /// Apply a fetched page. Returns `false` when `load_id` is stale.
    pub fn apply_loaded(&mut self, load_id: u64, page: IssuePage) -> bool {
        if self.in_flight != Some(load_id) {
            warn!(load_id, "ignoring stale issues page");
            return false;
        }
        self.in_flight = None;
        if let Phase::LoadingPage { direction, .. } = &self.phase {
            let step = self.page_size as u64;
            self.offset = match direction {
                Direction::Forward => self.offset + step,
                Direction::Backward => self.offset.saturating_sub(step),
            };
        }
        // Keep the same issue selected if the new page still has it.
        self.selected = self
            .reselect
            .take()
            .and_then(|id| page.issues.iter().position(|i| i.id == id))
            .unwrap_or(0);
        self.phase = Phase::Ready(page);
        true
    }

    /// Record a failed fetch. Returns `false` when `load_id` is stale.
    pub fn apply_failed(&mut self, load_id: u64, message: String) -> bool {
        if self.in_flight != Some(load_id) {
            warn!(load_id, "ignoring stale fetch failure");
            return false;
        }
        self.in_flight = None;
        self.reselect = None;
        let (stage, previous) = match std::mem::replace(&mut self.phase, Phase::Unresolved) {
            Phase::LoadingPage {
                previous,
                direction,
            } => (FetchStage::Page(direction), Some(previous)),
            _ => (FetchStage::Initial, None),
        };
        self.phase = Phase::Failed {
            stage,
            message,
            previous,
        };
        true
    }

    pub fn select_next(&mut self) {
        if let Some(issues) = self.issues() {
            if !issues.is_empty() && self.selected < issues.len() - 1 {
                self.selected += 1;
            }
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn selected_issue(&self) -> Option<&Issue> {
        self.issues()?.get(self.selected)
    }

    pub fn view(&self) -> View<'_> {
        if self.repo.is_none() {
            return View::Placeholder;
        }

        if self.total_count() > 0 {
            let fetching = self.is_fetching();
            let error = match &self.phase {
                Phase::Failed { message, .. } => Some(message.as_str()),
                _ => None,
            };
            return View::Card(CardBody::Issues {
                rows: self.issues(),
                show_prev: !fetching && self.has_prev(),
                show_next: !fetching && self.has_next(),
                current_page: self.current_page(),
                total_pages: self.total_pages(),
                error,
            });
        }

        match &self.phase {
            Phase::Unresolved | Phase::LoadingInitial => View::Card(CardBody::Loading),
            Phase::Failed { message, .. } => View::Card(CardBody::Failed { message }),
            _ => View::Card(CardBody::Empty {
                enabled: self.issues_enabled() == IssuesEnabled::Enabled,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::testing::page;

    fn repo() -> RepoRef {
        RepoRef::new("owner", "repo")
    }

    fn loaded(p: IssuePage) -> IssuesWidget {
        let mut w = IssuesWidget::new(DEFAULT_PAGE_SIZE);
        let req = w.resolve(repo()).unwrap();
        assert!(w.apply_loaded(req.load_id, p));
        w
    }

    #[test]
    fn unresolved_owner_renders_placeholder_without_fetching() {
        let w = IssuesWidget::new(DEFAULT_PAGE_SIZE);
        assert_eq!(w.view(), View::Placeholder);
        assert!(!w.is_fetching());
    }

    #[test]
    fn resolving_issues_first_page_request() {
        let mut w = IssuesWidget::new(DEFAULT_PAGE_SIZE);
        let req = w.resolve(repo()).unwrap();
        assert_eq!(req.cursor, PageCursor::First);
        assert_eq!(req.size, 5);
        assert_eq!(req.repo, repo());
        assert_eq!(w.phase(), &Phase::LoadingInitial);
        assert_eq!(w.view(), View::Card(CardBody::Loading));
    }

    #[test]
    fn resolving_twice_fetches_once() {
        let mut w = IssuesWidget::new(DEFAULT_PAGE_SIZE);
        assert!(w.resolve(repo()).is_some());
        assert!(w.resolve(repo()).is_none());
    }

    #[test]
    fn empty_repository_with_issues_enabled() {
        let w = loaded(IssuePage {
            issues: vec![],
            total_count: 0,
            has_issues_enabled: true,
        });
        assert_eq!(w.view(), View::Card(CardBody::Empty { enabled: true }));
    }

    #[test]
    fn empty_repository_with_issues_disabled() {
        let w = loaded(IssuePage {
            issues: vec![],
            total_count: 0,
            has_issues_enabled: false,
        });
        assert_eq!(w.issues_enabled(), IssuesEnabled::Disabled);
        assert_eq!(w.view(), View::Card(CardBody::Empty { enabled: false }));
    }

    #[test]
    fn first_of_twelve_shows_next_only() {
        let w = loaded(page(8..=12, 12));
        assert_eq!(w.current_page(), 1);
        assert_eq!(w.total_pages(), 2);
        match w.view() {
            View::Card(CardBody::Issues {
                rows,
                show_prev,
                show_next,
                ..
            }) => {
                assert_eq!(rows.map(|r| r.len()), Some(5));
                assert!(!show_prev);
                assert!(show_next);
            }
            other => panic!("unexpected view: {other:?}"),
        }
    }

    #[test]
    fn next_uses_stored_end_cursor_and_steps_offset() {
        let mut w = loaded(page(8..=12, 12));
        let req = w.next_page().unwrap();
        assert_eq!(req.cursor, PageCursor::After("cursor-12".to_string()));
        // A second press while loading issues nothing.
        assert!(w.next_page().is_none());
        assert_eq!(w.offset(), 0);

        assert!(w.apply_loaded(req.load_id, page(3..=7, 12)));
        assert_eq!(w.offset(), 5);
        assert_eq!(w.current_page(), 2);
        assert!(w.has_prev());
        assert!(!w.has_next());
    }

    #[test]
    fn prev_uses_start_cursor_backwards() {
        let mut w = loaded(page(8..=12, 12));
        let req = w.next_page().unwrap();
        w.apply_loaded(req.load_id, page(3..=7, 12));

        let req = w.prev_page().unwrap();
        assert_eq!(req.cursor, PageCursor::Before("cursor-3".to_string()));
        assert!(w.apply_loaded(req.load_id, page(8..=12, 12)));
        assert_eq!(w.offset(), 0);
        assert!(!w.has_prev());
    }

    #[test]
    fn prev_refused_on_first_page() {
        let mut w = loaded(page(8..=12, 12));
        assert!(w.prev_page().is_none());
    }

    #[test]
    fn page_loading_hides_rows_and_controls() {
        let mut w = loaded(page(8..=12, 12));
        w.next_page().unwrap();
        match w.view() {
            View::Card(CardBody::Issues {
                rows,
                show_prev,
                show_next,
                ..
            }) => {
                assert!(rows.is_none());
                assert!(!show_prev);
                assert!(!show_next);
            }
            other => panic!("unexpected view: {other:?}"),
        }
    }

    #[test]
    fn controls_follow_offset_and_rounded_page_count() {
        for total in [1u64, 4, 7, 12, 13, 25, 48] {
            let mut w = loaded(page(1..=5, total));
            for _ in 0..4 {
                let expected_page = w.offset() / 5 + 1;
                assert_eq!(w.current_page(), expected_page);
                assert_eq!(w.has_prev(), w.offset() > 0);
                let rounded = ((total as f64) / 5.0).round() as u64;
                assert_eq!(w.has_next(), w.current_page() != rounded);
                match w.next_page() {
                    Some(req) => {
                        w.apply_loaded(req.load_id, page(1..=5, total));
                    }
                    None => break,
                }
            }
        }
    }

    #[test]
    fn empty_page_disables_next() {
        let mut w = loaded(page(1..=2, 2));
        // round(2 / 5) == 0, so the rounded rule still offers Next.
        let req = w.next_page().unwrap();
        w.apply_loaded(
            req.load_id,
            IssuePage {
                issues: vec![],
                total_count: 2,
                has_issues_enabled: true,
            },
        );
        assert!(!w.has_next());
        assert!(w.has_prev());
        // Going back from an empty page restarts at the first page.
        let req = w.prev_page().unwrap();
        assert_eq!(req.cursor, PageCursor::First);
        assert_eq!(w.offset(), 0);
    }

    #[test]
    fn stale_responses_are_ignored() {
        let mut w = IssuesWidget::new(DEFAULT_PAGE_SIZE);
        let req = w.resolve(repo()).unwrap();
        assert!(!w.apply_loaded(req.load_id + 1, page(1..=5, 5)));
        assert!(!w.apply_failed(req.load_id + 1, "boom".into()));
        assert_eq!(w.phase(), &Phase::LoadingInitial);
    }

    #[test]
    fn initial_failure_is_distinct_and_retryable() {
        let mut w = IssuesWidget::new(DEFAULT_PAGE_SIZE);
        let req = w.resolve(repo()).unwrap();
        assert!(w.apply_failed(req.load_id, "network down".into()));
        assert_eq!(
            w.view(),
            View::Card(CardBody::Failed {
                message: "network down"
            })
        );
        let retry = w.retry().unwrap();
        assert_eq!(retry.cursor, PageCursor::First);
        assert!(retry.load_id > req.load_id);
    }

    #[test]
    fn page_failure_keeps_previous_page_and_retries_same_direction() {
        let mut w = loaded(page(8..=12, 12));
        let req = w.next_page().unwrap();
        w.apply_failed(req.load_id, "timeout".into());

        assert_eq!(w.offset(), 0);
        match w.phase() {
            Phase::Failed { stage, .. } => {
                assert_eq!(*stage, FetchStage::Page(Direction::Forward))
            }
            other => panic!("unexpected phase: {other:?}"),
        }
        match w.view() {
            View::Card(CardBody::Issues { rows, error, .. }) => {
                assert_eq!(rows.map(|r| r.len()), Some(5));
                assert_eq!(error, Some("timeout"));
            }
            other => panic!("unexpected view: {other:?}"),
        }

        let retry = w.retry().unwrap();
        assert_eq!(retry.cursor, PageCursor::After("cursor-12".to_string()));
    }

    #[test]
    fn retry_on_ready_reloads_from_first_page() {
        let mut w = loaded(page(8..=12, 12));
        let req = w.next_page().unwrap();
        w.apply_loaded(req.load_id, page(3..=7, 12));
        let req = w.retry().unwrap();
        assert_eq!(req.cursor, PageCursor::First);
        assert_eq!(w.offset(), 0);
    }

    #[test]
    fn unresolved_widget_refuses_every_fetch() {
        let mut w = IssuesWidget::new(DEFAULT_PAGE_SIZE);
        assert!(w.retry().is_none());
        assert!(w.next_page().is_none());
        assert!(w.prev_page().is_none());
        assert!(!w.is_fetching());
        assert_eq!(w.phase(), &Phase::Unresolved);
    }

    #[test]
    fn reload_keeps_the_selected_issue_by_id() {
        let mut w = loaded(page(1..=5, 12));
        w.select_next();
        w.select_next();
        assert_eq!(w.selected_issue().map(|i| i.number), Some(3));

        // A new issue pushed the list down by one row.
        let req = w.retry().unwrap();
        assert!(w.apply_loaded(req.load_id, page(0..=4, 14)));
        assert_eq!(w.selected(), 3);
        assert_eq!(w.selected_issue().map(|i| i.number), Some(3));

        // Gone from the reloaded page: back to the top.
        let req = w.retry().unwrap();
        assert!(w.apply_loaded(req.load_id, page(6..=10, 14)));
        assert_eq!(w.selected(), 0);
    }

    #[test]
    fn page_change_starts_at_the_top() {
        let mut w = loaded(page(8..=12, 12));
        w.select_next();
        let req = w.next_page().unwrap();
        assert!(w.apply_loaded(req.load_id, page(3..=7, 12)));
        assert_eq!(w.selected(), 0);
    }

    #[test]
    fn selection_is_clamped_to_page() {
        let mut w = loaded(page(1..=3, 3));
        w.select_next();
        w.select_next();
        w.select_next();
        assert_eq!(w.selected(), 2);
        assert_eq!(w.selected_issue().map(|i| i.number), Some(3));
        w.select_prev();
        assert_eq!(w.selected(), 1);
    }
}
