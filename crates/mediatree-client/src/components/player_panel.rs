//! PlayerPanel component: now playing, transport state and queue position.

use mediatree_proto::tree::meta;
use mediatree_proto::{Payload, SwipeDirection};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Clear, Paragraph},
    Frame,
};

use crate::action::{Action, Key, KeyCode};
use crate::app_state::AppState;
use crate::component::Component;
use crate::event_hub::Flow;
use crate::history::Widget;
use crate::player_state::PlayerStatus;
use crate::render::display_label;
use crate::theme::{style_secondary, C_ACCENT, C_MUTED, C_PLAYING, C_PRIMARY};
use crate::widgets::pane_chrome::{pane_chrome, Badge};
use crate::widgets::progress_bar::{draw_progress, fmt_time_us};

/// Seek step as a fraction of the track.
pub const SEEK_STEP: f64 = 0.05;

/// Stateless; everything it shows lives in [`AppState::player`].
pub struct PlayerPanel;

impl PlayerPanel {
    pub fn new() -> Self {
        Self
    }
}

impl Component for PlayerPanel {
    fn id(&self) -> Widget {
        Widget::Player
    }

    fn handle_key(&mut self, key: Key, _state: &AppState) -> (Flow, Vec<Action>) {
        if !key.is_plain() {
            return (Flow::Continue, Vec::new());
        }
        let actions = match key.code {
            KeyCode::Left => vec![Action::Seek(-SEEK_STEP)],
            KeyCode::Right => vec![Action::Seek(SEEK_STEP)],
            KeyCode::Enter => vec![Action::Player(Payload::Pause)],
            KeyCode::Up => vec![Action::VolumeStep(0.05)],
            KeyCode::Down => vec![Action::VolumeStep(-0.05)],
            KeyCode::Char('P') => vec![Action::CloseWidget],
            _ => return (Flow::Continue, Vec::new()),
        };
        (Flow::Consumed, actions)
    }

    fn handle_swipe(&mut self, direction: SwipeDirection, _state: &AppState) -> Vec<Action> {
        match direction {
            SwipeDirection::Left | SwipeDirection::Down => vec![Action::Player(Payload::Next)],
            SwipeDirection::Right => vec![Action::Player(Payload::Prev)],
            SwipeDirection::Up => vec![Action::CloseWidget],
        }
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, state: &AppState) {
        frame.render_widget(Clear, area);
        let player = &state.player;
        let status_color = match player.status {
            PlayerStatus::Playing => C_PLAYING,
            PlayerStatus::Stopped => C_MUTED,
            _ => C_ACCENT,
        };
        let block = pane_chrome(
            "player",
            true,
            Some(Badge {
                text: player.status.label(),
                color: status_color,
            }),
        );
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(4),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Min(0),
            ])
            .split(inner);

        let track = player.track.as_ref();
        let title = track.map(display_label).unwrap_or_else(|| "nothing playing".to_string());
        let artist = track
            .and_then(|t| t.metadata.get_str(meta::ARTIST))
            .unwrap_or_default()
            .to_string();
        let album = track
            .and_then(|t| t.metadata.get_str(meta::ALBUM))
            .unwrap_or_default()
            .to_string();
        frame.render_widget(
            Paragraph::new(vec![
                Line::from(Span::styled(
                    title,
                    Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD),
                )),
                Line::from(Span::styled(artist, style_secondary())),
                Line::from(Span::styled(album, Style::default().fg(C_MUTED))),
            ]),
            chunks[0],
        );

        let duration = track
            .and_then(|t| t.metadata.get_int(meta::APPROX_DURATION))
            .filter(|d| *d > 0);
        draw_progress(
            frame,
            chunks[1],
            player.time_perc.unwrap_or(0.0),
            &fmt_time_us(player.time_us),
            &duration.map(fmt_time_us).unwrap_or_default(),
            C_PLAYING,
        );

        let volume = if player.mute {
            "muted".to_string()
        } else {
            format!("vol {:>3.0}%", player.volume * 100.0)
        };
        let position = if player.queue_len > 0 && player.queue_idx >= 0 {
            format!("{}/{}", player.queue_idx + 1, player.queue_len)
        } else {
            format!("-/{}", player.queue_len)
        };
        frame.render_widget(
            Paragraph::new(Line::from(vec![
                Span::styled(format!("mode {}", player.mode.label()), style_secondary()),
                Span::raw("   "),
                Span::styled(volume, style_secondary()),
                Span::raw("   "),
                Span::styled(format!("queue {}", position), style_secondary()),
            ])),
            chunks[2],
        );
    }
}
