use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::action::Action;
use crate::config;
use crate::error::Result;
use crate::event::Event;
use crate::source::IssueSource;
use crate::types::RepoRef;
use crate::widget::{FetchRequest, IssuesWidget};

pub struct App {
    pub widget: IssuesWidget,
    pub error: Option<String>,
    pub notice: Option<String>,
    pub should_quit: bool,
    target: Option<RepoRef>,
    source: Arc<dyn IssueSource>,
    detect_repo: fn() -> Result<RepoRef>,
    action_tx: mpsc::UnboundedSender<Action>,
}

impl App {
    /// `target` is the repository named on the command line; `None` means
    /// detect it from the git remote.
    pub fn new(
        source: Arc<dyn IssueSource>,
        target: Option<RepoRef>,
        page_size: u32,
        action_tx: mpsc::UnboundedSender<Action>,
    ) -> Self {
        Self {
            widget: IssuesWidget::new(page_size),
            error: None,
            notice: None,
            should_quit: false,
            target,
            source,
            detect_repo: config::detect_repo,
            action_tx,
        }
    }

    pub fn handle_event(&self, event: Event) -> Action {
        match event {
            Event::Init => Action::ResolveRepo,
            Event::Key(key) => self.handle_key(key),
            _ => Action::None,
        }
    }

    fn handle_key(&self, key: KeyEvent) -> Action {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
            KeyCode::Char('j') | KeyCode::Down => Action::ScrollDown,
            KeyCode::Char('k') | KeyCode::Up => Action::ScrollUp,
            KeyCode::Char('n') | KeyCode::Char('l') | KeyCode::Right => Action::NextPage,
            KeyCode::Char('p') | KeyCode::Char('h') | KeyCode::Left => Action::PrevPage,
            KeyCode::Char('r') => Action::Retry,
            KeyCode::Enter | KeyCode::Char('o') => Action::OpenInBrowser,
            KeyCode::Char('y') => Action::YankUrl,
            _ => Action::None,
        }
    }

    pub fn update(&mut self, action: Action) {
        if !matches!(action, Action::None) {
            self.notice = None;
        }

        match action {
            Action::Quit => {
                self.should_quit = true;
            }
            Action::ScrollUp => self.widget.select_prev(),
            Action::ScrollDown => self.widget.select_next(),

            Action::NextPage => {
                if let Some(req) = self.widget.next_page() {
                    self.spawn_fetch(req);
                }
            }
            Action::PrevPage => {
                if let Some(req) = self.widget.prev_page() {
                    self.spawn_fetch(req);
                }
            }
            Action::Retry => {
                if let Some(req) = self.widget.retry() {
                    self.error = None;
                    self.spawn_fetch(req);
                } else if self.widget.repo().is_none() {
                    self.error = None;
                    self.update(Action::ResolveRepo);
                }
            }

            Action::ResolveRepo => match self.target.clone() {
                Some(repo) => self.update(Action::RepoResolved(repo)),
                None => self.spawn_detect_repo(),
            },
            Action::RepoResolved(repo) => {
                debug!(%repo, "repository resolved");
                if let Some(req) = self.widget.resolve(repo) {
                    self.spawn_fetch(req);
                }
            }

            Action::IssuesLoaded(page, load_id) => {
                if self.widget.apply_loaded(load_id, *page) {
                    self.error = None;
                }
            }
            Action::IssuesFailed(msg, load_id) => {
                if self.widget.apply_failed(load_id, msg.clone()) {
                    self.error = Some(msg);
                }
            }

            Action::OpenInBrowser => {
                if let Some(issue) = self.widget.selected_issue() {
                    if let Err(e) = open::that(&issue.url) {
                        self.error = Some(format!("Failed to open browser: {}", e));
                    }
                }
            }
            Action::YankUrl => {
                if let Some(issue) = self.widget.selected_issue() {
                    let url = issue.url.clone();
                    match arboard::Clipboard::new().and_then(|mut c| c.set_text(url.clone())) {
                        Ok(()) => self.notice = Some(format!("Copied {}", url)),
                        Err(e) => self.error = Some(format!("Clipboard error: {}", e)),
                    }
                }
            }

            Action::Error(msg) => {
                warn!(error = %msg, "action error");
                self.error = Some(msg);
            }
            Action::None => {}
        }
    }

    fn spawn_fetch(&self, req: FetchRequest) {
        let tx = self.action_tx.clone();
        let source = Arc::clone(&self.source);
        tokio::spawn(async move {
            let FetchRequest {
                load_id,
                repo,
                size,
                cursor,
            } = req;
            match source
                .fetch_issues(&repo.owner, &repo.name, size, &cursor)
                .await
            {
                Ok(page) => {
                    tx.send(Action::IssuesLoaded(Box::new(page), load_id)).ok();
                }
                Err(e) => {
                    warn!(load_id, error = %e, source = source.name(), "issues fetch failed");
                    tx.send(Action::IssuesFailed(e.to_string(), load_id)).ok();
                }
            }
        });
    }

    fn spawn_detect_repo(&self) {
        let tx = self.action_tx.clone();
        let detect = self.detect_repo;
        tokio::spawn(async move {
            let action = match tokio::task::spawn_blocking(detect).await {
                Ok(Ok(repo)) => Action::RepoResolved(repo),
                Ok(Err(e)) => e.into(),
                Err(e) => Action::Error(e.to_string()),
            };
            tx.send(action).ok();
        });
    }
}
