//! ItemInfo component: metadata of one object, stepping through siblings.

use mediatree_proto::tree::meta;
use mediatree_proto::{ObjectNode, SwipeDirection, Value};
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
use crate::history::{NavState, Widget};
use crate::render::display_label;
use crate::sync::SyncEvent;
use crate::theme::{style_secondary, C_PRIMARY, C_SECONDARY};
use crate::widgets::pane_chrome::pane_chrome;

/// Metadata keys shown first, in this order.
const PRIORITY_KEYS: &[&str] = &[
    meta::LABEL,
    meta::TITLE,
    meta::ARTIST,
    meta::ALBUM,
    meta::CLASS,
    meta::APPROX_DURATION,
    meta::NUM_CHILDREN,
    meta::MIMETYPE,
    meta::ID,
];

pub struct ItemInfo {
    id: Option<String>,
    node: Option<ObjectNode>,
    failed: bool,
    scroll: u16,
}

impl ItemInfo {
    pub fn new() -> Self {
        Self {
            id: None,
            node: None,
            failed: false,
            scroll: 0,
        }
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
            Some(id) => vec![Action::ReplaceInfo(id.to_string())],
            None => Vec::new(),
        }
    }
}

/// `key: value` lines, known keys first.
pub fn metadata_lines(node: &ObjectNode) -> Vec<(String, String)> {
    let mut lines: Vec<(String, String)> = PRIORITY_KEYS
        .iter()
        .filter_map(|k| node.metadata.get(k).map(|v| (k.to_string(), format_value(v))))
        .collect();
    for (k, v) in node.metadata.iter() {
        if !PRIORITY_KEYS.contains(&k.as_str()) {
            lines.push((k.clone(), format_value(v)));
        }
    }
    lines
}

fn format_value(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Dictionary(_) | Value::Array(_) => "…".to_string(),
        other => other
            .as_f64()
            .map(|f| {
                if f.fract() == 0.0 {
                    format!("{}", f as i64)
                } else {
                    format!("{:.3}", f)
                }
            })
            .unwrap_or_else(|| format!("{:?}", other)),
    }
}

impl Component for ItemInfo {
    fn id(&self) -> Widget {
        Widget::ItemInfo
    }

    fn show(&mut self, nav: &NavState, state: &AppState) -> Vec<Action> {
        let Some(id) = nav.info_id.clone() else {
            self.id = None;
            self.node = None;
            return Vec::new();
        };
        if self.id.as_deref() == Some(id.as_str()) && self.node.is_some() {
            return Vec::new();
        }
        self.scroll = 0;
        self.failed = false;
        self.node = state.lookup(&id).cloned();
        self.id = Some(id.clone());
        if self.node.is_none() {
            return vec![Action::FetchObject(id)];
        }
        Vec::new()
    }

    fn hide(&mut self) {
        self.id = None;
        self.node = None;
    }

    fn handle_key(&mut self, key: Key, _state: &AppState) -> (Flow, Vec<Action>) {
        if !key.is_plain() {
            return (Flow::Continue, Vec::new());
        }
        let actions = match key.code {
            KeyCode::Right | KeyCode::Char('n') => self.step(true),
            KeyCode::Left | KeyCode::Char('p') => self.step(false),
            KeyCode::Down | KeyCode::Char('j') => {
                self.scroll = self.scroll.saturating_add(1);
                Vec::new()
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.scroll = self.scroll.saturating_sub(1);
                Vec::new()
            }
            KeyCode::Enter => match &self.id {
                Some(id) => vec![Action::Fire(id.clone())],
                None => Vec::new(),
            },
            KeyCode::Char('i') => vec![Action::CloseWidget],
            _ => return (Flow::Continue, Vec::new()),
        };
        (Flow::Consumed, actions)
    }

    fn handle_swipe(&mut self, direction: SwipeDirection, _state: &AppState) -> Vec<Action> {
        match direction {
            SwipeDirection::Left | SwipeDirection::Down => self.step(true),
            SwipeDirection::Right => self.step(false),
            SwipeDirection::Up => vec![Action::CloseWidget],
        }
    }

    fn on_sync(&mut self, event: &SyncEvent, state: &AppState) -> Vec<Action> {
        let Some(id) = self.id.as_deref() else {
            return Vec::new();
        };
        match event {
            SyncEvent::ObjectFetched(node) if node.id() == Some(id) => {
                self.node = Some(node.clone());
            }
            SyncEvent::FetchFailed { id: failed } if failed == id => {
                self.failed = true;
            }
            SyncEvent::RowChanged { id: changed } if changed == id => {
                self.node = state.lookup(id).cloned().or(self.node.take());
            }
            _ => {}
        }
        Vec::new()
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, _state: &AppState) {
        frame.render_widget(Clear, area);
        let title = self
            .node
            .as_ref()
            .map(display_label)
            .unwrap_or_else(|| "info".to_string());
        let block = pane_chrome(&title, true, None);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let Some(node) = &self.node else {
            let text = if self.failed { "not found" } else { "loading…" };
            frame.render_widget(Paragraph::new(Span::styled(text, style_secondary())), inner);
            return;
        };

        let key_w = metadata_lines(node)
            .iter()
            .map(|(k, _)| k.len())
            .max()
            .unwrap_or(0);
        let mut lines: Vec<Line> = metadata_lines(node)
            .into_iter()
            .map(|(k, v)| {
                Line::from(vec![
                    Span::styled(format!("{:>w$}  ", k, w = key_w), Style::default().fg(C_SECONDARY)),
                    Span::styled(v, Style::default().fg(C_PRIMARY)),
                ])
            })
            .collect();
        lines.push(Line::default());
        let nav_hint = match (node.prev_sibling_id(), node.next_sibling_id()) {
            (Some(_), Some(_)) => "← prev   next →",
            (Some(_), None) => "← prev",
            (None, Some(_)) => "next →",
            (None, None) => "",
        };
        lines.push(Line::from(Span::styled(
            nav_hint,
            style_secondary().add_modifier(Modifier::ITALIC),
        )));

        frame.render_widget(
            Paragraph::new(lines)
                .wrap(Wrap { trim: false })
                .scroll((self.scroll, 0)),
            inner,
        );
    }
}
