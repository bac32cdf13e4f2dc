//! NavPopup overlay: quick jump along the path of the displayed container.
//!
//! Lists the play queue, then every container from `/` down to the current
//! one.  Hides itself after a few idle seconds; any key restarts the clock.

use std::time::{Duration, Instant};

use mediatree_proto::tree::parent_id;
use mediatree_proto::{PLAYQUEUE_ID, ROOT_ID};
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Clear, Paragraph},
    Frame,
};

use crate::action::{Action, Key, KeyCode};
use crate::app_state::AppState;
use crate::idle::IdleTimer;
use crate::theme::{style_selected, C_CONTAINER, C_MUTED, C_PRIMARY};
use crate::widgets::pane_chrome::{centered_rect, pane_chrome};

pub struct NavPopup {
    /// Container ids, playqueue first, root to current after it.
    entries: Vec<String>,
    cursor: usize,
    idle: IdleTimer,
}

/// `/` down to `id`, inclusive.
pub fn path_to(id: &str) -> Vec<String> {
    let mut chain = vec![id.to_string()];
    let mut cur = id;
    while let Some(parent) = parent_id(cur) {
        chain.push(parent.to_string());
        cur = parent;
    }
    if chain.last().map(String::as_str) != Some(ROOT_ID) {
        chain.push(ROOT_ID.to_string());
    }
    chain.reverse();
    chain
}

impl NavPopup {
    pub fn new(idle: Duration) -> Self {
        Self {
            entries: Vec::new(),
            cursor: 0,
            idle: IdleTimer::new(idle),
        }
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn show(&mut self, state: &AppState) {
        let current = &state.nav.container_id;
        self.entries = std::iter::once(PLAYQUEUE_ID.to_string())
            .chain(path_to(current).into_iter().filter(|id| id != PLAYQUEUE_ID))
            .collect();
        self.cursor = self
            .entries
            .iter()
            .position(|id| id == current)
            .unwrap_or(0);
        self.idle.poke();
    }

    pub fn hide(&mut self) {
        self.idle.cancel();
    }

    /// Every key is swallowed while the popup is open.
    pub fn handle_key(&mut self, key: Key, state: &AppState) -> Vec<Action> {
        self.idle.poke();
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.cursor = self.cursor.saturating_sub(1);
                Vec::new()
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.cursor = (self.cursor + 1).min(self.entries.len().saturating_sub(1));
                Vec::new()
            }
            KeyCode::Enter | KeyCode::Right => match self.entries.get(self.cursor) {
                Some(id) => {
                    // keep the path visible: select the next step down
                    let current = &state.nav.container_id;
                    let select = path_to(current)
                        .into_iter()
                        .skip_while(|p| p != id)
                        .nth(1);
                    vec![
                        Action::CloseOverlay,
                        Action::JumpTo {
                            id: id.clone(),
                            select,
                        },
                    ]
                }
                None => vec![Action::CloseOverlay],
            },
            KeyCode::Esc | KeyCode::Char('g') => vec![Action::CloseOverlay],
            _ => Vec::new(),
        }
    }

    pub fn tick(&mut self, now: Instant) -> Vec<Action> {
        if self.idle.tick_at(now) {
            vec![Action::CloseOverlay]
        } else {
            Vec::new()
        }
    }

    pub fn draw(&self, frame: &mut Frame, area: Rect, state: &AppState) {
        let height = self.entries.len() as u16 + 2;
        let rect = centered_rect(area, 48, height);
        frame.render_widget(Clear, rect);
        let block = pane_chrome("go to", true, None);
        let width = rect.width.saturating_sub(4) as usize;

        let lines: Vec<Line> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, id)| {
                let label = state
                    .lookup(id)
                    .and_then(|n| n.label())
                    .map(str::to_string)
                    .unwrap_or_else(|| match id.as_str() {
                        ROOT_ID => "root".to_string(),
                        PLAYQUEUE_ID => "play queue".to_string(),
                        other => other.rsplit('/').next().unwrap_or(other).to_string(),
                    });
                let depth = if id == PLAYQUEUE_ID {
                    0
                } else {
                    i.saturating_sub(1)
                };
                let color = if id == PLAYQUEUE_ID { C_MUTED } else { C_CONTAINER };
                let text = format!("{}{}", "  ".repeat(depth), label);
                let text: String = text.chars().take(width).collect();
                let line = Line::from(vec![
                    Span::raw(" "),
                    Span::styled(text, Style::default().fg(color)),
                ]);
                if i == self.cursor {
                    line.style(style_selected())
                } else if *id == state.nav.container_id {
                    line.style(Style::default().fg(C_PRIMARY))
                } else {
                    line
                }
            })
            .collect();
        frame.render_widget(Paragraph::new(lines).block(block), rect);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::NavState;
    use mediatree_proto::config::Config;

    fn state_at(id: &str) -> AppState {
        let mut state = AppState::new(Config::default(), "t");
        state.nav = NavState::browse(id);
        state
    }

    #[test]
    fn test_path_to() {
        assert_eq!(path_to("/"), vec!["/"]);
        assert_eq!(path_to("/a/b"), vec!["/", "/a", "/a/b"]);
    }

    #[test]
    fn test_enter_on_ancestor_selects_path_child() {
        let state = state_at("/a/b/c");
        let mut popup = NavPopup::new(Duration::from_secs(5));
        popup.show(&state);
        assert_eq!(popup.entries(), &["/playqueue", "/", "/a", "/a/b", "/a/b/c"]);
        popup.handle_key(Key::plain(KeyCode::Up), &state);
        popup.handle_key(Key::plain(KeyCode::Up), &state);
        let actions = popup.handle_key(Key::plain(KeyCode::Enter), &state);
        assert_eq!(
            actions,
            vec![
                Action::CloseOverlay,
                Action::JumpTo {
                    id: "/a".into(),
                    select: Some("/a/b".into()),
                },
            ]
        );
    }

    #[test]
    fn test_idle_close_and_key_restarts_clock() {
        let state = state_at("/a");
        let mut popup = NavPopup::new(Duration::from_secs(5));
        popup.show(&state);
        assert!(popup.tick(Instant::now() + Duration::from_secs(2)).is_empty());
        popup.handle_key(Key::plain(KeyCode::Down), &state);
        assert!(popup.tick(Instant::now() + Duration::from_secs(4)).is_empty());
        assert_eq!(
            popup.tick(Instant::now() + Duration::from_secs(6)),
            vec![Action::CloseOverlay]
        );
        // single shot
        assert!(popup.tick(Instant::now() + Duration::from_secs(20)).is_empty());
    }

    #[test]
    fn test_hide_cancels() {
        let state = state_at("/a");
        let mut popup = NavPopup::new(Duration::from_secs(5));
        popup.show(&state);
        popup.hide();
        assert!(popup.tick(Instant::now() + Duration::from_secs(60)).is_empty());
    }
}
