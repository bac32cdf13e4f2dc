//! SearchInput: wraps tui-input as the search bar of the browser.

use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use tui_input::{Input, InputRequest};

use crate::action::{Key, KeyCode};
use crate::theme::{C_FILTER_BG, C_FILTER_FG, C_MUTED};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchAction {
    Changed(String),
    Next,
    Prev,
    Confirmed,
    Cancelled,
    None,
}

pub struct SearchInput {
    input: Input,
    active: bool,
}

impl SearchInput {
    pub fn new() -> Self {
        Self {
            input: Input::default(),
            active: false,
        }
    }

    /// Open with an empty query.
    pub fn activate(&mut self) {
        self.input = Input::default();
        self.active = true;
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn text(&self) -> &str {
        self.input.value()
    }

    /// Enter and Esc close the bar; arrows step through matches.
    pub fn handle_key(&mut self, key: Key) -> SearchAction {
        let request = match key.code {
            KeyCode::Esc => {
                self.deactivate();
                return SearchAction::Cancelled;
            }
            KeyCode::Enter => {
                self.deactivate();
                return SearchAction::Confirmed;
            }
            KeyCode::Down => return SearchAction::Next,
            KeyCode::Up => return SearchAction::Prev,
            KeyCode::Char(c) if !key.ctrl && !key.alt => InputRequest::InsertChar(c),
            KeyCode::Backspace => InputRequest::DeletePrevChar,
            KeyCode::Left => InputRequest::GoToPrevChar,
            KeyCode::Right => InputRequest::GoToNextChar,
            KeyCode::Home => InputRequest::GoToStart,
            KeyCode::End => InputRequest::GoToEnd,
            _ => return SearchAction::None,
        };
        match self.input.handle(request) {
            Some(changed) if changed.value => SearchAction::Changed(self.input.value().to_string()),
            _ => SearchAction::None,
        }
    }

    pub fn draw(&self, frame: &mut Frame, area: Rect) {
        let scroll = self.input.visual_scroll(area.width.saturating_sub(4) as usize);
        let value = self.input.value();
        let display = if value.is_empty() {
            Span::styled("/ search...", Style::default().fg(C_MUTED))
        } else {
            let shown: String = value.chars().skip(scroll).collect();
            Span::styled(format!("/ {}", shown), Style::default().fg(C_FILTER_FG))
        };
        let paragraph = Paragraph::new(Line::from(display)).style(Style::default().bg(C_FILTER_BG));
        frame.render_widget(paragraph, area);

        if self.active && area.width > 0 {
            let cursor_x = area.x + 2 + (self.input.visual_cursor().saturating_sub(scroll)) as u16;
            frame.set_cursor_position((cursor_x.min(area.x + area.width - 1), area.y));
        }
    }
}

impl Default for SearchInput {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typing_reports_changes() {
        let mut search = SearchInput::new();
        search.activate();
        assert_eq!(search.handle_key(Key::char('a')), SearchAction::Changed("a".into()));
        assert_eq!(search.handle_key(Key::char('b')), SearchAction::Changed("ab".into()));
        assert_eq!(
            search.handle_key(Key::plain(KeyCode::Backspace)),
            SearchAction::Changed("a".into())
        );
        assert_eq!(search.handle_key(Key::plain(KeyCode::Down)), SearchAction::Next);
        assert_eq!(search.handle_key(Key::plain(KeyCode::Esc)), SearchAction::Cancelled);
        assert!(!search.is_active());
    }

    #[test]
    fn test_activate_clears_previous_query() {
        let mut search = SearchInput::new();
        search.activate();
        search.handle_key(Key::char('x'));
        search.handle_key(Key::plain(KeyCode::Enter));
        search.activate();
        assert_eq!(search.text(), "");
    }
}
