use chrono::Utc;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use ratatui::Frame;

use crate::types::Issue;
use crate::widget::{CardBody, IssuesWidget, View};

const ISSUE_ICON: &str = "◎";

pub fn render(frame: &mut Frame, widget: &IssuesWidget, area: Rect) {
    let body = match widget.view() {
        View::Placeholder => {
            frame.render_widget(Paragraph::new("...Loading"), area);
            return;
        }
        View::Card(body) => body,
    };

    let block = Block::default().borders(Borders::ALL).title(Span::styled(
        " Issues ",
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    ));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    match body {
        CardBody::Issues {
            rows,
            show_prev,
            show_next,
            current_page,
            total_pages,
            error,
        } => {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Min(0),
                    Constraint::Length(u16::from(error.is_some())),
                    Constraint::Length(1),
                ])
                .split(inner);

            match rows {
                Some(rows) => render_rows(frame, rows, widget.selected(), chunks[0]),
                None => render_loading(frame, chunks[0]),
            }

            if let Some(error) = error {
                let line = Paragraph::new(Span::styled(
                    format!("{} (r: retry)", error),
                    Style::default().fg(Color::Red),
                ));
                frame.render_widget(line, chunks[1]);
            }

            let range = rows.filter(|r| !r.is_empty()).map(|r| {
                let first = widget.offset() + 1;
                (first, first + r.len() as u64 - 1, widget.total_count())
            });
            render_controls(
                frame,
                Controls {
                    show_prev,
                    show_next,
                    current_page,
                    total_pages,
                    range,
                },
                chunks[2],
            );
        }
        CardBody::Loading => render_loading(frame, inner),
        CardBody::Empty { enabled } => {
            let text = if enabled {
                "No Issues found"
            } else {
                "Issues not enabled"
            };
            let lines = vec![
                Line::from(""),
                Line::from(Span::styled(ISSUE_ICON, Style::default().fg(Color::DarkGray))),
                Line::from(Span::styled(text, Style::default().fg(Color::Gray))),
            ];
            frame.render_widget(Paragraph::new(lines).alignment(Alignment::Center), inner);
        }
        CardBody::Failed { message } => {
            let lines = vec![
                Line::from(""),
                Line::from(Span::styled(
                    "Could not load issues",
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                )),
                Line::from(Span::styled(message, Style::default().fg(Color::Red))),
                Line::from(""),
                Line::from(Span::styled(
                    "Press r to retry",
                    Style::default().fg(Color::Gray),
                )),
            ];
            frame.render_widget(Paragraph::new(lines).alignment(Alignment::Center), inner);
        }
    }
}

fn render_loading(frame: &mut Frame, area: Rect) {
    let loading = Paragraph::new("Loading issues...")
        .style(Style::default().fg(Color::Yellow))
        .alignment(Alignment::Center);
    frame.render_widget(loading, area);
}

fn render_rows(frame: &mut Frame, rows: &[Issue], selected: usize, area: Rect) {
    let w = area.width as usize;
    let fixed = 26; // #num(7) + labels(~18) + space(1)
    let flex = w.saturating_sub(fixed).max(10);

    let items: Vec<ListItem> = rows
        .iter()
        .enumerate()
        .map(|(i, issue)| {
            let style = if i == selected {
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };

            let mut title_line = vec![
                Span::styled(
                    format!("#{:<6}", issue.number),
                    Style::default().fg(Color::Cyan),
                ),
                Span::styled(truncate(&issue.title, flex), style),
            ];
            for label in issue.labels.iter().take(3) {
                title_line.push(Span::raw(" "));
                title_line.push(Span::styled(
                    format!("[{}]", truncate(&label.name, 16)),
                    Style::default().fg(label_color(&label.color)),
                ));
            }

            ListItem::new(vec![Line::from(title_line), meta_line(issue)])
        })
        .collect();

    let list = List::new(items).highlight_style(Style::default().bg(Color::DarkGray));

    let mut state = ListState::default();
    if !rows.is_empty() {
        state.select(Some(selected.min(rows.len() - 1)));
    }

    frame.render_stateful_widget(list, area, &mut state);
}

fn meta_line(issue: &Issue) -> Line<'static> {
    let mut parts = vec![
        format!("@{}", issue.author),
        format!("opened {} ago", format_age(issue.created_at)),
        participants(issue),
        plural(issue.comments, "comment"),
    ];
    if let Some(milestone) = &issue.milestone {
        parts.push(format!("⚑ {}", milestone));
    }

    Line::from(vec![
        Span::raw("       "),
        Span::styled(parts.join(" · "), Style::default().fg(Color::Gray)),
    ])
}

struct Controls {
    show_prev: bool,
    show_next: bool,
    current_page: u64,
    total_pages: u64,
    /// first, last and total issue numbers on display
    range: Option<(u64, u64, u64)>,
}

fn render_controls(frame: &mut Frame, controls: Controls, area: Rect) {
    let key_style = Style::default().fg(Color::Yellow);
    let mut spans = Vec::new();
    if controls.show_prev {
        spans.push(Span::styled("[p] Prev", key_style));
        spans.push(Span::raw("   "));
    }
    // The rounded page count can fall behind the page actually reached.
    let mut page = if controls.current_page <= controls.total_pages {
        format!("Page {} of {}", controls.current_page, controls.total_pages)
    } else {
        format!("Page {}", controls.current_page)
    };
    if let Some((first, last, total)) = controls.range {
        page.push_str(&format!(" · {}-{} of {}", first, last, total));
    }
    spans.push(Span::styled(page, Style::default().fg(Color::Gray)));
    if controls.show_next {
        spans.push(Span::raw("   "));
        spans.push(Span::styled("[n] Next", key_style));
    }

    frame.render_widget(
        Paragraph::new(Line::from(spans)).alignment(Alignment::Center),
        area,
    );
}

fn participants(issue: &Issue) -> String {
    let count = plural(issue.participant_count, "participant");
    if issue.participants.is_empty() {
        return count;
    }
    let shown: Vec<&str> = issue.participants.iter().take(3).map(String::as_str).collect();
    let more = issue.participant_count as usize - shown.len().min(issue.participant_count as usize);
    if more > 0 {
        format!("{} ({} +{})", count, shown.join(", "), more)
    } else {
        format!("{} ({})", count, shown.join(", "))
    }
}

/// GitHub label colors are six hex digits without a leading `#`.
fn label_color(hex: &str) -> Color {
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return Color::Magenta;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    match (channel(0), channel(2), channel(4)) {
        (Some(r), Some(g), Some(b)) => Color::Rgb(r, g, b),
        _ => Color::Magenta,
    }
}

fn plural(n: u32, word: &str) -> String {
    if n == 1 {
        format!("1 {}", word)
    } else {
        format!("{} {}s", n, word)
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    } else {
        s.to_string()
    }
}

fn format_age(dt: chrono::DateTime<chrono::Utc>) -> String {
    let now = Utc::now();
    let duration = now.signed_duration_since(dt);

    if duration.num_days() > 0 {
        format!("{}d", duration.num_days())
    } else if duration.num_hours() > 0 {
        format!("{}h", duration.num_hours())
    } else if duration.num_minutes() > 0 {
        format!("{}m", duration.num_minutes())
    } else {
        "0m".to_string()
    }
}
