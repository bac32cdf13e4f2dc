//! LogPanel component: the log viewer widget.
//!
//! Shows the bounded ring of forwarded log entries, newest last.  Handles its
//! own scroll state and follows the tail while scrolled to the bottom.

use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Clear, Paragraph},
    Frame,
};
use tracing::Level;

use crate::action::{Action, Key, KeyCode};
use crate::app_state::AppState;
use crate::component::Component;
use crate::event_hub::Flow;
use crate::history::{NavState, Widget};
use crate::logging::LogEntry;
use crate::theme::{C_LOG_ERROR, C_LOG_INFO, C_LOG_WARN, C_MUTED, C_SECONDARY};
use crate::widgets::pane_chrome::pane_chrome;

pub struct LogPanel {
    /// First visible entry; `usize::MAX` pins the view to the tail.
    scroll: usize,
}

impl LogPanel {
    pub fn new() -> Self {
        Self { scroll: usize::MAX }
    }
}

fn level_color(level: Level) -> ratatui::style::Color {
    match level {
        Level::ERROR => C_LOG_ERROR,
        Level::WARN => C_LOG_WARN,
        Level::INFO => C_LOG_INFO,
        _ => C_MUTED,
    }
}

fn entry_line(entry: &LogEntry) -> Line<'static> {
    Line::from(vec![
        Span::styled(
            format!("{} ", entry.time.format("%H:%M:%S")),
            Style::default().fg(C_MUTED),
        ),
        Span::styled(
            format!("{:<5} ", entry.level),
            Style::default().fg(level_color(entry.level)),
        ),
        Span::styled(entry.message.clone(), Style::default().fg(C_SECONDARY)),
    ])
}

impl Component for LogPanel {
    fn id(&self) -> Widget {
        Widget::LogViewer
    }

    fn show(&mut self, _nav: &NavState, _state: &AppState) -> Vec<Action> {
        self.scroll = usize::MAX;
        Vec::new()
    }

    fn handle_key(&mut self, key: Key, state: &AppState) -> (Flow, Vec<Action>) {
        if !key.is_plain() {
            return (Flow::Continue, Vec::new());
        }
        let total = state.logs.len();
        let current = self.scroll.min(total);
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.scroll = current.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => self.scroll = current + 1,
            KeyCode::PageUp => self.scroll = current.saturating_sub(10),
            KeyCode::PageDown => self.scroll = current + 10,
            KeyCode::Home | KeyCode::Char('g') => self.scroll = 0,
            KeyCode::End | KeyCode::Char('G') => self.scroll = usize::MAX,
            KeyCode::Char('l') => return (Flow::Consumed, vec![Action::CloseWidget]),
            _ => return (Flow::Continue, Vec::new()),
        }
        (Flow::Consumed, Vec::new())
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, state: &AppState) {
        frame.render_widget(Clear, area);
        let block = pane_chrome("log", true, None);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let height = inner.height as usize;
        let count = state.logs.len();
        if count == 0 {
            frame.render_widget(
                Paragraph::new(Span::styled(
                    "  no log entries yet",
                    Style::default().fg(C_MUTED),
                )),
                inner,
            );
            return;
        }

        // newest last, scroll 0 = oldest at the top
        let max_scroll = count.saturating_sub(height);
        if self.scroll >= max_scroll {
            self.scroll = usize::MAX;
        }
        let first = self.scroll.min(max_scroll);

        let lines: Vec<Line> = state
            .logs
            .iter()
            .skip(first)
            .take(height)
            .map(entry_line)
            .collect();
        frame.render_widget(Paragraph::new(lines), inner);
    }
}
