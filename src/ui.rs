pub mod charting;

use itertools::Itertools;
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{BarChart, Block, Borders, Paragraph, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use crate::app::{App, AppState};
use crate::catalog::Game;
use crate::playground::Phase;
use crate::report::{ScoreSink, Summary};
use crate::session::{Session, POINTS_WITHOUT_HINT, POINTS_WITH_HINT};
use crate::store::DocumentStore;

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;
const LOW_TIME_SECS: u32 = 10;

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn dim() -> Style {
    Style::default().add_modifier(Modifier::DIM)
}

fn italic() -> Style {
    Style::default().add_modifier(Modifier::ITALIC)
}

impl<S: DocumentStore, K: ScoreSink> Widget for &App<S, K> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(VERTICAL_MARGIN.min(area.height / 4))
            .constraints([Constraint::Min(1), Constraint::Length(1)])
            .split(area);

        match self.state {
            AppState::Browse => render_browser(self, chunks[0], buf),
            AppState::Play => match self.playground.phase() {
                Phase::Empty => render_message("No game loaded", None, chunks[0], buf),
                Phase::NotFound(id) => render_message(
                    &format!("Game '{id}' not found"),
                    Some("It may have been removed from the catalog."),
                    chunks[0],
                    buf,
                ),
                Phase::Invalid(e) => render_message(
                    "This game cannot be played",
                    Some(&e.to_string()),
                    chunks[0],
                    buf,
                ),
                Phase::Ready(game) => render_ready(game, chunks[0], buf),
                Phase::Playing(session) => match session.summary() {
                    Some(summary) if session.state().showing_report => {
                        render_report(session, summary, chunks[0], buf)
                    }
                    _ => render_question(self, session, chunks[0], buf),
                },
            },
        }

        if let Some(notice) = &self.notice {
            Paragraph::new(Span::styled(
                notice.as_str(),
                Style::default().fg(Color::Yellow).add_modifier(Modifier::ITALIC),
            ))
            .alignment(Alignment::Center)
            .render(chunks[1], buf);
        }
    }
}

fn render_browser<S: DocumentStore, K: ScoreSink>(app: &App<S, K>, area: Rect, buf: &mut Buffer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // search box
            Constraint::Length(1), // padding
            Constraint::Min(1),    // games
            Constraint::Length(1), // legend
        ])
        .split(area);

    Paragraph::new(Line::from(vec![
        Span::styled("Search: ", bold()),
        Span::raw(app.browser.search.as_str()),
        Span::styled("_", dim()),
    ]))
    .render(chunks[0], buf);

    let filtered = app.filtered();
    let entries = filtered.entries();
    if entries.is_empty() {
        let message = if app.browser.search.trim().is_empty() {
            "No games available"
        } else {
            "No games match your search"
        };
        Paragraph::new(Span::styled(message, italic()))
            .alignment(Alignment::Center)
            .render(chunks[2], buf);
    } else {
        let subject_width = entries
            .iter()
            .map(|e| e.main_subject.width() + e.sub_subject.width() + 3)
            .max()
            .unwrap_or(0);
        let visible = chunks[2].height.max(1) as usize;
        let offset = app.browser.selected.saturating_sub(visible - 1);

        let lines: Vec<Line> = entries
            .iter()
            .enumerate()
            .skip(offset)
            .take(visible)
            .map(|(i, entry)| {
                let subject = format!("{} / {}", entry.main_subject, entry.sub_subject);
                let padding = " ".repeat(subject_width.saturating_sub(subject.width()));
                let marker = if i == app.browser.selected { "> " } else { "  " };
                let style = if i == app.browser.selected {
                    bold().add_modifier(Modifier::REVERSED)
                } else {
                    Style::default()
                };
                let mut spans = vec![
                    Span::styled(marker, style),
                    Span::styled(format!("{subject}{padding}  "), style.patch(dim())),
                    Span::styled(entry.game.name.clone(), style),
                ];
                if !entry.game.metadata.category.is_empty() {
                    spans.push(Span::styled(
                        format!("  [{}]", entry.game.metadata.category),
                        style.patch(italic()),
                    ));
                }
                Line::from(spans)
            })
            .collect();
        Paragraph::new(lines).render(chunks[2], buf);
    }

    Paragraph::new(Span::styled(
        "(type) search / (↑↓) select / (enter) open / (esc)ape",
        italic(),
    ))
    .render(chunks[3], buf);
}

fn render_message(title: &str, detail: Option<&str>, area: Rect, buf: &mut Buffer) {
    let mut lines = vec![
        Line::from(Span::styled(title, bold().fg(Color::Red))),
        Line::default(),
    ];
    if let Some(detail) = detail {
        lines.push(Line::from(detail));
        lines.push(Line::default());
    }
    lines.push(Line::from(Span::styled("(b)ack", italic())));

    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .render(area, buf);
}

fn render_ready(game: &Game, area: Rect, buf: &mut Buffer) {
    let meta = &game.metadata;
    let mut lines = vec![
        Line::from(Span::styled(game.name.as_str(), bold().fg(Color::Magenta))),
        Line::default(),
    ];

    let facts = [
        (!meta.category.is_empty()).then(|| meta.category.clone()),
        (!meta.difficulty.is_empty()).then(|| meta.difficulty.clone()),
        Some(format!("{} questions", game.question_count())),
        meta.seconds_per_question()
            .map(|secs| format!("{secs}s per question")),
        meta.passing_score.map(|p| format!("pass at {p}")),
    ];
    lines.push(Line::from(facts.into_iter().flatten().join("  ·  ")));
    lines.push(Line::default());

    if !meta.instructions.is_empty() {
        lines.push(Line::from(Span::styled("Instructions", bold())));
        lines.push(Line::from(meta.instructions.as_str()));
        lines.push(Line::default());
    }

    if let Some(criteria) = meta.evaluation_criteria.as_ref().filter(|c| !c.is_empty()) {
        lines.push(Line::from(Span::styled("Evaluation", bold())));
        lines.push(Line::from(
            criteria
                .iter()
                .map(|(name, weight)| format!("{name}: {}%", charting::format_label(*weight)))
                .join("  "),
        ));
        lines.push(Line::default());
    }

    lines.push(Line::from(Span::styled(
        format!(
            "{POINTS_WITHOUT_HINT} points per correct answer, {POINTS_WITH_HINT} with a hint"
        ),
        dim(),
    )));
    lines.push(Line::default());
    lines.push(Line::from(Span::styled("(enter) start / (b)ack", italic())));

    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .render(area, buf);
}

fn render_question<S: DocumentStore, K: ScoreSink>(
    app: &App<S, K>,
    session: &Session,
    area: Rect,
    buf: &mut Buffer,
) {
    let Some(current) = session.current_question() else {
        return;
    };
    let state = session.state();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // progress and timer
            Constraint::Length(1),
            Constraint::Min(3), // question, options, feedback
            Constraint::Length(1), // legend
        ])
        .split(area);

    Paragraph::new(Span::styled(
        format!(
            "Question {} of {}",
            state.index + 1,
            session.question_count()
        ),
        bold(),
    ))
    .render(chunks[0], buf);

    let timer_style = if state.remaining_secs <= LOW_TIME_SECS {
        bold().fg(Color::Red)
    } else {
        bold()
    };
    Paragraph::new(Span::styled(
        format!("Time Left: {}s", state.remaining_secs),
        timer_style,
    ))
    .alignment(Alignment::Right)
    .render(chunks[0], buf);

    let mut lines = vec![
        Line::from(Span::styled(current.question.question.as_str(), bold())),
        Line::default(),
    ];

    let correct_position = current.correct_position();
    for (position, option) in current.options.iter().enumerate() {
        let style = match (state.answered, state.selected) {
            (true, _) if position == correct_position => bold().fg(Color::Green),
            (true, Some(selected)) if selected == position => bold().fg(Color::Red),
            (true, _) => dim(),
            (false, _) => Style::default(),
        };
        lines.push(Line::from(Span::styled(
            format!("{}. {option}", position + 1),
            style,
        )));
    }
    lines.push(Line::default());

    if state.hint_visible {
        lines.push(Line::from(vec![
            Span::styled("Hint: ", bold().fg(Color::Yellow)),
            Span::raw(current.question.hint.as_str()),
        ]));
    } else if session.timer_running() && current.question.has_hint() {
        lines.push(Line::from(Span::styled(
            format!("(h) hint (-{} points)", POINTS_WITHOUT_HINT - POINTS_WITH_HINT),
            dim(),
        )));
    }

    if session.advance_pending() {
        let points = session.current_entry().map_or(0, |e| e.points);
        lines.push(Line::from(Span::styled(
            format!("Correct! +{points} points"),
            bold().fg(Color::Green),
        )));
    } else if session.awaiting_continue() {
        lines.push(Line::from(Span::styled("Incorrect", bold().fg(Color::Red))));
        if !current.question.solution.is_empty() {
            lines.push(Line::from(vec![
                Span::styled("Solution: ", bold()),
                Span::raw(current.question.solution.as_str()),
            ]));
        }
        lines.push(Line::default());
        lines.push(Line::from(Span::styled("(enter) continue", italic())));
    }

    Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .render(chunks[2], buf);

    let legend = if app.last_answer.is_some() || state.answered {
        "(e)nd / (esc) back"
    } else {
        "(1-9) answer / (h)int / (e)nd / (esc) back"
    };
    Paragraph::new(Span::styled(legend, italic())).render(chunks[3], buf);
}

fn render_report(session: &Session, summary: &Summary, area: Rect, buf: &mut Buffer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // title
            Constraint::Min(4),    // chart
            Constraint::Length(1), // stats
            Constraint::Length(1), // grade
            Constraint::Length(1), // padding
            Constraint::Length(1), // legend
        ])
        .split(area);

    Paragraph::new(Span::styled(
        session.game().name.as_str(),
        bold().fg(Color::Magenta),
    ))
    .alignment(Alignment::Center)
    .render(chunks[0], buf);

    let bars = charting::bar_data(summary);
    let data: Vec<(&str, u64)> = bars.iter().map(|(l, v)| (l.as_str(), *v)).collect();
    BarChart::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Performance Breakdown"),
        )
        .data(data.as_slice())
        .bar_width(charting::bar_width(chunks[1].width.saturating_sub(2), data.len()))
        .bar_gap(1)
        .max(POINTS_WITHOUT_HINT as u64)
        .bar_style(Style::default().fg(Color::Magenta))
        .value_style(bold().fg(Color::Black).bg(Color::Magenta))
        .render(chunks[1], buf);

    Paragraph::new(Span::styled(
        format!(
            "{} / {} points   {} correct   {} incorrect",
            summary.total_points, summary.max_possible, summary.correct, summary.incorrect
        ),
        bold(),
    ))
    .alignment(Alignment::Center)
    .render(chunks[2], buf);

    Paragraph::new(Span::styled(
        format!(
            "{}  {}%",
            summary.grade(),
            charting::format_label(summary.percentage())
        ),
        Style::default().fg(Color::Cyan).add_modifier(Modifier::ITALIC),
    ))
    .alignment(Alignment::Center)
    .render(chunks[3], buf);

    Paragraph::new(Span::styled("(r)etry / (b)ack / (esc)ape", italic())).render(chunks[5], buf);
}
