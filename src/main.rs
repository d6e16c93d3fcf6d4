mod action;
mod app;
mod auth;
mod config;
mod error;
mod event;
mod github;
mod logging;
mod source;
mod tui;
mod types;
mod ui;
mod widget;

use std::panic;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::mpsc;

use crate::action::Action;
use crate::app::App;
use crate::config::Config;
use crate::error::PaneError;
use crate::event::Event;
use crate::github::GitHub;
use crate::source::IssueSource;
use crate::tui::EventHandler;
use crate::types::{IssueStateFilter, RepoRef};

#[derive(Debug, Parser)]
#[command(name = "issuepane", version, about = "Page through a GitHub repository's issues")]
struct Cli {
    /// Repository as OWNER/REPO; detected from the `origin` remote when omitted
    repo: Option<String>,

    /// Issues per page
    #[arg(long)]
    page_size: Option<u32>,

    /// Which issues to list
    #[arg(long, value_enum)]
    state: Option<IssueStateFilter>,

    /// Config file (default: <config dir>/issuepane/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to a file; the terminal is owned by the UI. Without a
    // writable config dir the app runs unlogged.
    let _log_guard = logging::log_dir().and_then(|dir| logging::init(&dir).ok());

    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref());
    if let Some(size) = cli.page_size {
        config.issues.page_size = size;
    }
    if let Some(state) = cli.state {
        config.issues.state = state;
    }
    config.validate()?;

    let target = match cli.repo.as_deref() {
        Some(s) => Some(RepoRef::parse(s).ok_or_else(|| {
            PaneError::Config(format!("expected OWNER/REPO, got '{}'", s))
        })?),
        None => None,
    };

    let token = auth::load_token(&config.github)?;
    let github = GitHub::new(token, config.github.api_url.as_deref(), config.issues.state)?;

    // Set up panic hook to restore terminal
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = tui::restore();
        original_hook(panic_info);
    }));

    // Run the application
    let result = run(Arc::new(github), target, config.issues.page_size).await;

    // Restore terminal
    tui::restore()?;

    result
}

async fn run(
    source: Arc<dyn IssueSource>,
    target: Option<RepoRef>,
    page_size: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    // Initialize terminal
    let mut terminal = tui::init()?;

    // Create action channel
    let (action_tx, mut action_rx) = mpsc::unbounded_channel::<Action>();

    // Create app state
    let mut app = App::new(source, target, page_size, action_tx.clone());

    // Create event handler
    let tick_rate = Duration::from_millis(250);
    let render_rate = Duration::from_millis(16); // ~60fps
    let mut events = EventHandler::new(tick_rate, render_rate);

    // Main loop
    loop {
        tokio::select! {
            Some(event) = events.next() => {
                if event.is_quit() {
                    break;
                }

                match event {
                    Event::Render => {
                        terminal.draw(|frame| ui::render(frame, &app))?;
                    }
                    _ => {
                        let action = app.handle_event(event);
                        if !matches!(action, Action::None) {
                            action_tx.send(action)?;
                        }
                    }
                }
            }
            Some(action) = action_rx.recv() => {
                app.update(action);
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
