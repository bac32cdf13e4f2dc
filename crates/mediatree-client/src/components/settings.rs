//! Settings component: effective configuration and renderer choice.
//!
//! Everything but the renderer is read-only here; the config file is the
//! place to change it.  The renderer list is the local player followed by
//! whatever the server advertises.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Clear, Paragraph},
    Frame,
};

use crate::action::{Action, Key, KeyCode};
use crate::app_state::{AppState, RendererLabel};
use crate::component::Component;
use crate::event_hub::Flow;
use crate::history::{NavState, Widget};
use crate::theme::{style_playing, style_selected, C_MUTED, C_PRIMARY, C_SECONDARY};
use crate::widgets::pane_chrome::pane_chrome;

pub const LOCAL_RENDERER: &str = "local";

pub struct Settings {
    cursor: usize,
}

impl Settings {
    pub fn new() -> Self {
        Self { cursor: 0 }
    }

    fn choices(state: &AppState) -> Vec<String> {
        std::iter::once(LOCAL_RENDERER.to_string())
            .chain(state.renderers.iter().cloned())
            .collect()
    }
}

fn setting_row(key: &str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("  {:<26}", key), Style::default().fg(C_SECONDARY)),
        Span::styled(value, Style::default().fg(C_PRIMARY)),
    ])
}

impl Component for Settings {
    fn id(&self) -> Widget {
        Widget::Settings
    }

    fn show(&mut self, _nav: &NavState, state: &AppState) -> Vec<Action> {
        let choices = Self::choices(state);
        self.cursor = match &state.renderer {
            RendererLabel::Remote(addr) => choices.iter().position(|c| c == addr).unwrap_or(0),
            _ => 0,
        };
        Vec::new()
    }

    fn handle_key(&mut self, key: Key, state: &AppState) -> (Flow, Vec<Action>) {
        if !key.is_plain() {
            return (Flow::Continue, Vec::new());
        }
        let choices = Self::choices(state);
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => {
                self.cursor = (self.cursor + 1).min(choices.len().saturating_sub(1))
            }
            KeyCode::Enter => {
                let actions = choices
                    .get(self.cursor)
                    .map(|c| vec![Action::UseRenderer(c.clone())])
                    .unwrap_or_default();
                return (Flow::Consumed, actions);
            }
            KeyCode::Char('o') => return (Flow::Consumed, vec![Action::CloseWidget]),
            _ => return (Flow::Continue, Vec::new()),
        }
        (Flow::Consumed, Vec::new())
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, state: &AppState) {
        frame.render_widget(Clear, area);
        let block = pane_chrome("settings", true, None);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let cfg = &state.config;
        let config_lines = vec![
            Line::from(Span::styled(
                " configuration",
                Style::default().fg(C_MUTED).add_modifier(Modifier::BOLD),
            )),
            setting_row("server.address", cfg.server.address.clone()),
            setting_row(
                "server.reconnect_delay_ms",
                cfg.server.reconnect_delay_ms.to_string(),
            ),
            setting_row("player.renderer", cfg.player.renderer.clone()),
            setting_row("player.volume", format!("{:.2}", cfg.player.volume)),
            setting_row(
                "browser.tracks_per_message",
                cfg.browser.tracks_per_message.to_string(),
            ),
            setting_row("ui.nav_popup_idle_secs", cfg.ui.nav_popup_idle_secs.to_string()),
            setting_row(
                "ui.image_controls_idle_secs",
                cfg.ui.image_controls_idle_secs.to_string(),
            ),
            setting_row("ui.log_capacity", cfg.ui.log_capacity.to_string()),
            Line::from(""),
            Line::from(Span::styled(
                " renderer  (enter to switch)",
                Style::default().fg(C_MUTED).add_modifier(Modifier::BOLD),
            )),
        ];

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(config_lines.len() as u16),
                Constraint::Min(0),
            ])
            .split(inner);
        frame.render_widget(Paragraph::new(config_lines), chunks[0]);

        let active = match &state.renderer {
            RendererLabel::Local => Some(LOCAL_RENDERER),
            RendererLabel::Remote(addr) => Some(addr.as_str()),
            RendererLabel::Searching => None,
        };
        let lines: Vec<Line> = Self::choices(state)
            .into_iter()
            .enumerate()
            .map(|(i, choice)| {
                let is_active = active == Some(choice.as_str());
                let marker = if is_active { "● " } else { "  " };
                let line = Line::from(vec![
                    Span::styled(format!("  {}", marker), style_playing()),
                    Span::styled(choice, Style::default().fg(C_PRIMARY)),
                ]);
                if i == self.cursor {
                    line.style(style_selected())
                } else {
                    line
                }
            })
            .collect();
        frame.render_widget(Paragraph::new(lines), chunks[1]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediatree_proto::config::Config;

    #[test]
    fn test_enter_picks_advertised_renderer() {
        let mut state = AppState::new(Config::default(), "t");
        state.renderers = vec!["10.0.0.5:10102".to_string()];
        let mut settings = Settings::new();
        settings.show(&NavState::default(), &state);
        settings.handle_key(Key::plain(KeyCode::Down), &state);
        let (_, actions) = settings.handle_key(Key::plain(KeyCode::Enter), &state);
        assert_eq!(actions, vec![Action::UseRenderer("10.0.0.5:10102".into())]);
    }
}
