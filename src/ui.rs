use std::time::Instant;

use numtype::{
    player::PlayerSlot,
    session::{PlayerSnapshot, SessionSnapshot, SessionState},
};
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use crate::App;

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 1;
/// Typed text, status line and the two border rows
const PLAYER_PANEL_HEIGHT: u16 = 5;

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        render_snapshot(&self.session.snapshot(Instant::now()), area, buf);
    }
}

pub fn render_snapshot(snapshot: &SessionSnapshot, area: Rect, buf: &mut Buffer) {
    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let dim_bold_style = Style::default()
        .patch(bold_style)
        .add_modifier(Modifier::DIM);
    let italic_style = Style::default().add_modifier(Modifier::ITALIC);

    let max_chars_per_line = area.width.saturating_sub(HORIZONTAL_MARGIN * 2).max(1);
    let target_lines = (snapshot.target.width() as u16).div_ceil(max_chars_per_line).max(1);
    let assignment_lines = u16::from(snapshot.assignment.is_some()) * 2;

    let mut constraints = vec![
        Constraint::Length(1), // timer / state
        Constraint::Length(1),
        Constraint::Length(target_lines),
        Constraint::Length(1),
    ];
    constraints.extend(snapshot.players.iter().map(|_| Constraint::Length(PLAYER_PANEL_HEIGHT)));
    constraints.extend([
        Constraint::Length(assignment_lines),
        Constraint::Length(1), // verdict
        Constraint::Min(0),
        Constraint::Length(1), // legend
    ]);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints(constraints.as_slice())
        .split(area);

    header(snapshot, bold_style).render(chunks[0], buf);

    Paragraph::new(Span::styled(snapshot.target.clone(), dim_bold_style))
        .alignment(if target_lines == 1 {
            Alignment::Center
        } else {
            Alignment::Left
        })
        .wrap(Wrap { trim: false })
        .render(chunks[2], buf);

    let first_panel = 4;
    for (offset, player) in snapshot.players.iter().enumerate() {
        player_panel(player, &snapshot.target, snapshot.players.len() > 1)
            .render(chunks[first_panel + offset], buf);
    }

    let rest = first_panel + snapshot.players.len();
    if let Some(assignment) = &snapshot.assignment {
        let lines: Vec<Line> = assignment
            .iter()
            .map(|(slot, device)| {
                Line::from(Span::styled(
                    format!(
                        "{slot}: {}",
                        device.as_deref().unwrap_or("press a key on your keyboard")
                    ),
                    italic_style,
                ))
            })
            .collect();
        Paragraph::new(lines).render(chunks[rest], buf);
    }

    if snapshot.state == SessionState::Completed {
        let message = match snapshot.verdict {
            Some(verdict) => verdict.to_string(),
            None => "Time's up!".to_string(),
        };
        Paragraph::new(Span::styled(
            message,
            Style::default().patch(bold_style).fg(Color::Green),
        ))
        .alignment(Alignment::Center)
        .render(chunks[rest + 1], buf);
    }

    let legend = match snapshot.state {
        SessionState::Completed => "(enter) play again / (esc)ape",
        _ => "(tab) new sentence / (esc)ape",
    };
    Paragraph::new(Span::styled(legend, italic_style)).render(chunks[rest + 3], buf);
}

fn header(snapshot: &SessionSnapshot, bold_style: Style) -> Paragraph<'static> {
    let line = match snapshot.state {
        SessionState::Idle => Line::from(Span::styled(
            "Start typing to begin",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::ITALIC),
        )),
        SessionState::Active => {
            let style = if snapshot.low_time {
                Style::default().patch(bold_style).fg(Color::Red)
            } else {
                bold_style
            };
            Line::from(Span::styled(format!("{}s", snapshot.time_remaining), style))
        }
        SessionState::Completed => Line::from(Span::styled("Finished", bold_style)),
    };
    Paragraph::new(line).alignment(Alignment::Center)
}

fn player_panel<'a>(player: &'a PlayerSnapshot, target: &'a str, titled: bool) -> Paragraph<'a> {
    let title = if titled {
        format!(" {} [{}] ", player.slot, player.case_mode)
    } else {
        format!(" [{}] ", player.case_mode)
    };
    let border_color = match player.slot {
        PlayerSlot::One => Color::Cyan,
        PlayerSlot::Two => Color::Magenta,
    };

    let stats = Line::from(Span::styled(
        format!("{} wpm   {}% acc", player.wpm, player.accuracy),
        Style::default().add_modifier(Modifier::BOLD),
    ));

    Paragraph::new(vec![Line::from(typed_spans(&player.text, target)), stats])
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border_color))
                .title(title),
        )
}

/// Typed text colored against the target, position by position
pub fn typed_spans<'a>(typed: &str, target: &str) -> Vec<Span<'a>> {
    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let green_bold_style = Style::default().patch(bold_style).fg(Color::Green);
    let red_bold_style = Style::default().patch(bold_style).fg(Color::Red);

    let mut expected = target.chars();
    let mut spans: Vec<Span> = typed
        .chars()
        .map(|c| {
            if expected.next() == Some(c) {
                Span::styled(c.to_string(), green_bold_style)
            } else {
                Span::styled(
                    match c {
                        ' ' => "·".to_owned(),
                        c => c.to_string(),
                    },
                    red_bold_style,
                )
            }
        })
        .collect();

    spans.push(Span::styled(
        "_",
        Style::default().add_modifier(Modifier::SLOW_BLINK | Modifier::DIM),
    ));
    spans
}
