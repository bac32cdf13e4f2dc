//! Help component: keyboard shortcut reference.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Clear, Paragraph, Wrap},
    Frame,
};

use crate::action::{Action, Key, KeyCode};
use crate::app_state::AppState;
use crate::component::Component;
use crate::event_hub::Flow;
use crate::history::Widget;
use crate::theme::{C_MUTED, C_PRIMARY, C_SECONDARY};
use crate::widgets::pane_chrome::pane_chrome;

pub struct HelpOverlay {
    scroll: u16,
}

impl HelpOverlay {
    pub fn new() -> Self {
        Self { scroll: 0 }
    }
}

fn section(title: &str) -> Line<'_> {
    Line::from(Span::styled(
        format!(" {}", title),
        Style::default().fg(C_MUTED).add_modifier(Modifier::BOLD),
    ))
}

fn help_row<'a>(key: &'a str, desc: &'a str) -> Line<'a> {
    Line::from(vec![
        Span::raw(" "),
        Span::styled(
            format!("{:<22}", key),
            Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD),
        ),
        Span::styled(desc, Style::default().fg(C_SECONDARY)),
    ])
}

fn help_lines() -> Vec<Line<'static>> {
    vec![
        section("browsing"),
        help_row("↑ / ↓  or  j / k", "move selection"),
        help_row("pg up / pg dn", "jump 10 rows"),
        help_row("home / end", "first / last entry"),
        help_row("enter  or  →", "open, play or view the entry"),
        help_row("←  or  h", "parent container"),
        help_row("ctrl+← / ctrl+→", "previous / next sibling container"),
        help_row("i", "entry info"),
        help_row("/", "search this container (↑ / ↓ next match)"),
        help_row("f", "add entry to favorites"),
        help_row("c", "go to the current track"),
        help_row("g", "navigation popup"),
        help_row("tab", "entry menu"),
        Line::from(""),
        section("queue"),
        help_row("a / r", "append entry / replace queue with entry"),
        help_row("A / R", "append album / replace queue with album"),
        Line::from(""),
        section("playback"),
        help_row("space", "pause / resume"),
        help_row("s", "stop"),
        help_row("n / p", "next / previous track"),
        help_row("+ / -", "volume up / down"),
        help_row("m", "mute"),
        help_row("M", "cycle playback mode"),
        help_row("v", "next visualization"),
        help_row(", / .", "seek back / forward"),
        Line::from(""),
        section("history & widgets"),
        help_row("esc / backspace / alt+←", "back (closes popups first)"),
        help_row("alt+→", "forward"),
        help_row("P / l / o / ?", "player / log / settings / help"),
        help_row("q  or  ctrl+c", "quit"),
    ]
}

impl Component for HelpOverlay {
    fn id(&self) -> Widget {
        Widget::Help
    }

    fn handle_key(&mut self, key: Key, _state: &AppState) -> (Flow, Vec<Action>) {
        if !key.is_plain() {
            return (Flow::Continue, Vec::new());
        }
        match key.code {
            KeyCode::Down | KeyCode::Char('j') => self.scroll = self.scroll.saturating_add(1),
            KeyCode::Up | KeyCode::Char('k') => self.scroll = self.scroll.saturating_sub(1),
            KeyCode::Char('?') => return (Flow::Consumed, vec![Action::CloseWidget]),
            _ => return (Flow::Continue, Vec::new()),
        }
        (Flow::Consumed, Vec::new())
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, _state: &AppState) {
        frame.render_widget(Clear, area);
        let block = pane_chrome("help", true, None);
        frame.render_widget(
            Paragraph::new(help_lines())
                .block(block)
                .wrap(Wrap { trim: false })
                .scroll((self.scroll, 0)),
            area,
        );
    }
}
