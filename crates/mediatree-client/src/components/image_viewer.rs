//! ImageViewer component: one image item with auto-hiding step controls.
//!
//! The terminal cannot show pixels, so the viewer frames the image's source
//! and dimensions.  The control strip appears on any input and hides after
//! the configured idle time.

use std::time::{Duration, Instant};

use mediatree_proto::tree::meta;
use mediatree_proto::{ObjectNode, SwipeDirection};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::action::{Action, Key, KeyCode};
use crate::app_state::AppState;
use crate::component::Component;
use crate::event_hub::Flow;
use crate::history::{NavState, Widget};
use crate::idle::IdleTimer;
use crate::render::display_label;
use crate::sync::SyncEvent;
use crate::theme::{style_secondary, C_IMAGE, C_MUTED, C_PRIMARY};
use crate::widgets::pane_chrome::pane_chrome;

pub struct ImageViewer {
    id: Option<String>,
    node: Option<ObjectNode>,
    failed: bool,
    controls: IdleTimer,
    controls_visible: bool,
}

impl ImageViewer {
    pub fn new(idle: Duration) -> Self {
        Self {
            id: None,
            node: None,
            failed: false,
            controls: IdleTimer::new(idle),
            controls_visible: false,
        }
    }

    pub fn controls_visible(&self) -> bool {
        self.controls_visible
    }

    fn poke(&mut self) {
        self.controls_visible = true;
        self.controls.poke();
    }

    fn step(&self, forward: bool) -> Vec<Action> {
        let target = self.node.as_ref().and_then(|n| {
            if forward {
                n.next_sibling_id()
            } else {
                n.prev_sibling_id()
            }
        });
        match target {
            Some(id) => vec![Action::ReplaceImage(id.to_string())],
            None => Vec::new(),
        }
    }
}

impl Component for ImageViewer {
    fn id(&self) -> Widget {
        Widget::ImageViewer
    }

    fn show(&mut self, nav: &NavState, state: &AppState) -> Vec<Action> {
        self.poke();
        let Some(id) = nav.image_id.clone() else {
            self.id = None;
            self.node = None;
            return Vec::new();
        };
        if self.id.as_deref() == Some(id.as_str()) && self.node.is_some() {
            return Vec::new();
        }
        self.failed = false;
        self.node = state.lookup(&id).cloned();
        self.id = Some(id.clone());
        if self.node.is_none() {
            return vec![Action::FetchObject(id)];
        }
        Vec::new()
    }

    fn hide(&mut self) {
        self.controls.cancel();
        self.controls_visible = false;
        self.id = None;
        self.node = None;
    }

    fn handle_key(&mut self, key: Key, _state: &AppState) -> (Flow, Vec<Action>) {
        if !key.is_plain() {
            return (Flow::Continue, Vec::new());
        }
        let actions = match key.code {
            KeyCode::Right | KeyCode::Char('n') | KeyCode::Char(' ') => self.step(true),
            KeyCode::Left | KeyCode::Char('p') => self.step(false),
            KeyCode::Enter => {
                if self.controls_visible {
                    self.controls.cancel();
                    self.controls_visible = false;
                    return (Flow::Consumed, Vec::new());
                }
                Vec::new()
            }
            KeyCode::Char('i') => match &self.id {
                Some(id) => vec![Action::ShowInfo(id.clone())],
                None => Vec::new(),
            },
            _ => return (Flow::Continue, Vec::new()),
        };
        self.poke();
        (Flow::Consumed, actions)
    }

    fn handle_swipe(&mut self, direction: SwipeDirection, _state: &AppState) -> Vec<Action> {
        self.poke();
        match direction {
            SwipeDirection::Left | SwipeDirection::Down => self.step(true),
            SwipeDirection::Right => self.step(false),
            SwipeDirection::Up => vec![Action::CloseWidget],
        }
    }

    fn on_sync(&mut self, event: &SyncEvent, _state: &AppState) -> Vec<Action> {
        let Some(id) = self.id.as_deref() else {
            return Vec::new();
        };
        match event {
            SyncEvent::ObjectFetched(node) if node.id() == Some(id) => {
                self.node = Some(node.clone());
            }
            SyncEvent::FetchFailed { id: failed } if failed == id => self.failed = true,
            _ => {}
        }
        Vec::new()
    }

    fn tick(&mut self, now: Instant, _state: &AppState) -> Vec<Action> {
        if self.controls.tick_at(now) {
            self.controls_visible = false;
        }
        Vec::new()
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, _state: &AppState) {
        frame.render_widget(Clear, area);
        let title = self
            .node
            .as_ref()
            .map(display_label)
            .unwrap_or_else(|| "image".to_string());
        let block = pane_chrome(&title, true, None);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let controls_h = if self.controls_visible { 1 } else { 0 };
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(controls_h)])
            .split(inner);

        let Some(node) = &self.node else {
            let text = if self.failed { "not found" } else { "loading…" };
            frame.render_widget(Paragraph::new(Span::styled(text, style_secondary())), chunks[0]);
            return;
        };

        let source = node
            .metadata
            .get_str(meta::URI)
            .or_else(|| node.metadata.get_str(meta::SRC))
            .unwrap_or("(no source)");
        let mime = node.metadata.get_str(meta::MIMETYPE).unwrap_or("image");
        let frame_block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(C_IMAGE));
        let picture = Paragraph::new(vec![
            Line::default(),
            Line::from(Span::styled(display_label(node), Style::default().fg(C_PRIMARY))),
            Line::from(Span::styled(mime.to_string(), Style::default().fg(C_MUTED))),
            Line::from(Span::styled(source.to_string(), style_secondary())),
        ])
        .alignment(Alignment::Center)
        .block(frame_block);
        frame.render_widget(picture, chunks[0]);

        if self.controls_visible {
            let prev = if node.prev_sibling_id().is_some() { "◀ prev" } else { "      " };
            let next = if node.next_sibling_id().is_some() { "next ▶" } else { "      " };
            frame.render_widget(
                Paragraph::new(Line::from(vec![
                    Span::styled(prev, style_secondary()),
                    Span::raw("    "),
                    Span::styled("i info   esc close", Style::default().fg(C_MUTED)),
                    Span::raw("    "),
                    Span::styled(next, style_secondary()),
                ]))
                .alignment(Alignment::Center),
                chunks[1],
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediatree_proto::config::Config;
    use mediatree_proto::Dict;

    fn image(id: &str, prev: Option<&str>) -> ObjectNode {
        let mut md = Dict::new();
        md.set(meta::ID, id);
        md.set(meta::CLASS, "item.image");
        if let Some(p) = prev {
            md.set(meta::PREVIOUS_ID, p);
        }
        ObjectNode {
            metadata: md,
            children: None,
        }
    }

    fn nav(id: &str) -> NavState {
        let mut nav = NavState::browse("/pics");
        nav.widget = Widget::ImageViewer;
        nav.image_id = Some(id.to_string());
        nav
    }

    #[test]
    fn test_controls_hide_after_idle() {
        let state = AppState::new(Config::default(), "t");
        let mut viewer = ImageViewer::new(Duration::from_secs(3));
        viewer.show(&nav("/pics/2"), &state);
        assert!(viewer.controls_visible());
        viewer.tick(Instant::now() + Duration::from_secs(1), &state);
        assert!(viewer.controls_visible());
        viewer.tick(Instant::now() + Duration::from_secs(4), &state);
        assert!(!viewer.controls_visible());
    }

    #[test]
    fn test_hide_cancels_timer() {
        let state = AppState::new(Config::default(), "t");
        let mut viewer = ImageViewer::new(Duration::from_secs(3));
        viewer.show(&nav("/pics/2"), &state);
        viewer.hide();
        viewer.tick(Instant::now() + Duration::from_secs(10), &state);
        assert!(!viewer.controls_visible());
    }

    #[test]
    fn test_swipe_right_steps_back() {
        let state = AppState::new(Config::default(), "t");
        let mut viewer = ImageViewer::new(Duration::from_secs(3));
        viewer.show(&nav("/pics/2"), &state);
        viewer.on_sync(&SyncEvent::ObjectFetched(image("/pics/2", Some("/pics/1"))), &state);
        assert_eq!(
            viewer.handle_swipe(SwipeDirection::Right, &state),
            vec![Action::ReplaceImage("/pics/1".into())]
        );
        assert!(viewer.handle_swipe(SwipeDirection::Left, &state).is_empty());
    }
}
