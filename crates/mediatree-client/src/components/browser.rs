//! Browser component: the displayed container as a scrollable list.
//!
//! Rows come straight from the sync cache; the component only keeps the
//! cursor window and the load indicator in step with [`SyncEvent`]s.  The
//! cursor itself belongs to the navigator: moving it emits
//! [`Action::Select`] and the App calls back into [`Component::select`].
//!
//! `/` opens a search bar over the loaded children.  Typing selects the
//! first row whose search title, title or label contains the query; the
//! arrows step to the next or previous match, wrapping around.

use mediatree_proto::tree::meta;
use mediatree_proto::{ObjectNode, SwipeDirection};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Clear, Paragraph},
    Frame,
};

use crate::action::{Action, Key, KeyCode};
use crate::app_state::AppState;
use crate::component::Component;
use crate::event_hub::Flow;
use crate::history::{NavState, Widget};
use crate::render::{display_label, Row};
use crate::sync::{LoadState, SyncEvent};
use crate::theme::{style_secondary, style_selected, C_LOADING, C_MUTED};
use crate::widgets::pane_chrome::{pane_chrome, Badge};
use crate::widgets::progress_bar::bar;
use crate::widgets::scrollable_list::ScrollableList;
use crate::widgets::search_input::{SearchAction, SearchInput};

const PAGE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    First,
    Next,
    Prev,
}

/// Case-insensitive substring match on the first present of search title,
/// title and label.
pub fn search_match(node: &ObjectNode, query: &str) -> bool {
    node.metadata
        .get_str(meta::SEARCH_TITLE)
        .or_else(|| node.metadata.get_str(meta::TITLE))
        .or_else(|| node.label())
        .is_some_and(|text| text.to_lowercase().contains(&query.to_lowercase()))
}

pub struct Browser {
    container_id: Option<String>,
    selected_id: Option<String>,
    list: ScrollableList,
    /// Waiting for the container object.
    pending: Option<String>,
    progress: Option<f32>,
    last_height: usize,
    search: SearchInput,
}

impl Browser {
    pub fn new() -> Self {
        Self {
            container_id: None,
            selected_id: None,
            list: ScrollableList::new(),
            pending: None,
            progress: None,
            last_height: PAGE,
            search: SearchInput::new(),
        }
    }

    pub fn is_searching(&self) -> bool {
        self.search.is_active()
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected_id.as_deref()
    }

    fn rows<'a>(&self, state: &'a AppState) -> &'a [ObjectNode] {
        match (state.sync.container(), self.container_id.as_deref()) {
            (Some(c), Some(id)) if c.id() == Some(id) => c.children(),
            _ => &[],
        }
    }

    /// Rebuild the window from the cache, keeping the selected row.
    fn resync(&mut self, state: &AppState) {
        let len = self.rows(state).len();
        self.list.reset(len);
        let index = self.selected_index(state);
        self.list.select(index);
        self.list.ensure_visible(self.last_height);
    }

    fn selected_index(&self, state: &AppState) -> Option<usize> {
        let sel = self.selected_id.as_deref()?;
        self.rows(state).iter().position(|r| r.id() == Some(sel))
    }

    fn select_action(&self, index: Option<usize>, state: &AppState) -> Vec<Action> {
        let id = index
            .and_then(|i| self.rows(state).get(i))
            .and_then(ObjectNode::id)
            .map(str::to_string);
        if id.is_none() || id == self.selected_id {
            return Vec::new();
        }
        vec![Action::Select(id)]
    }

    fn find_match(&self, state: &AppState, query: &str, step: Step) -> Option<usize> {
        let rows = self.rows(state);
        let len = rows.len();
        let sel = self.selected_index(state);
        let order: Vec<usize> = match (step, sel) {
            (Step::First, _) | (Step::Next, None) => (0..len).collect(),
            (Step::Next, Some(s)) => (s + 1..len).chain(0..s).collect(),
            (Step::Prev, None) => (0..len).rev().collect(),
            (Step::Prev, Some(s)) => (0..s).rev().chain((s..len).rev()).collect(),
        };
        order.into_iter().find(|&i| search_match(&rows[i], query))
    }

    fn search_key(&mut self, key: Key, state: &AppState) -> Vec<Action> {
        let step = match self.search.handle_key(key) {
            SearchAction::Changed(query) if query.is_empty() => return Vec::new(),
            SearchAction::Changed(_) => Step::First,
            SearchAction::Next => Step::Next,
            SearchAction::Prev => Step::Prev,
            SearchAction::Confirmed => {
                return self.selected_id.clone().map(Action::Fire).into_iter().collect();
            }
            SearchAction::Cancelled | SearchAction::None => return Vec::new(),
        };
        let query = self.search.text().to_string();
        let index = self.find_match(state, &query, step);
        self.select_action(index, state)
    }
}

impl Component for Browser {
    fn id(&self) -> Widget {
        Widget::Browser
    }

    fn show(&mut self, nav: &NavState, state: &AppState) -> Vec<Action> {
        if self.container_id.as_deref() != Some(nav.container_id.as_str()) {
            self.container_id = Some(nav.container_id.clone());
            self.progress = None;
            self.list.scroll_offset = 0;
            self.search.deactivate();
        }
        self.selected_id = nav.selection_id.clone();
        self.resync(state);
        Vec::new()
    }

    fn handle_key(&mut self, key: Key, state: &AppState) -> (Flow, Vec<Action>) {
        if self.search.is_active() {
            return (Flow::Consumed, self.search_key(key, state));
        }
        if key.ctrl {
            return match key.code {
                KeyCode::Right => (Flow::Consumed, vec![Action::NextSibling]),
                KeyCode::Left => (Flow::Consumed, vec![Action::PrevSibling]),
                _ => (Flow::Continue, Vec::new()),
            };
        }
        if key.alt {
            return (Flow::Continue, Vec::new());
        }
        let moved = match key.code {
            KeyCode::Up | KeyCode::Char('k') => Some(self.list.select_up(1)),
            KeyCode::Down | KeyCode::Char('j') => Some(self.list.select_down(1)),
            KeyCode::PageUp => Some(self.list.select_up(PAGE)),
            KeyCode::PageDown => Some(self.list.select_down(PAGE)),
            KeyCode::Home => Some(self.list.select_first()),
            KeyCode::End => Some(self.list.select_last()),
            _ => None,
        };
        if let Some(index) = moved {
            return (Flow::Consumed, self.select_action(index, state));
        }

        let selected = self.selected_id.clone();
        let actions = match (key.code, selected) {
            (KeyCode::Enter | KeyCode::Right | KeyCode::Char('l'), Some(id)) => {
                vec![Action::Fire(id)]
            }
            (KeyCode::Left | KeyCode::Char('h'), _) => vec![Action::ChangeUp],
            (KeyCode::Char('i'), Some(id)) => vec![Action::ShowInfo(id)],
            (KeyCode::Char('f'), Some(id)) => vec![Action::CopyToFavorites(id)],
            (KeyCode::Char('/'), _) => {
                self.search.activate();
                Vec::new()
            }
            (KeyCode::Char('a'), Some(id)) => vec![Action::AddEntry { id, replace: false }],
            (KeyCode::Char('r'), Some(id)) => vec![Action::AddEntry { id, replace: true }],
            (KeyCode::Char('A'), _) => vec![Action::AddAlbum { replace: false }],
            (KeyCode::Char('R'), _) => vec![Action::AddAlbum { replace: true }],
            _ => return (Flow::Continue, Vec::new()),
        };
        (Flow::Consumed, actions)
    }

    fn handle_swipe(&mut self, direction: SwipeDirection, _state: &AppState) -> Vec<Action> {
        match direction {
            SwipeDirection::Left | SwipeDirection::Down => vec![Action::NextSibling],
            SwipeDirection::Right => vec![Action::PrevSibling],
            SwipeDirection::Up => vec![Action::ChangeUp],
        }
    }

    fn on_sync(&mut self, event: &SyncEvent, state: &AppState) -> Vec<Action> {
        match event {
            SyncEvent::ContainerPending { id } => {
                self.pending = Some(id.clone());
                self.list.reset(0);
            }
            SyncEvent::ContainerShown { id } => {
                if self.container_id.as_deref() == Some(id.as_str()) {
                    self.pending = None;
                    self.resync(state);
                }
            }
            SyncEvent::RowsSpliced {
                index,
                deleted,
                inserted,
            } => {
                self.list.splice(*index, *deleted, *inserted);
                if self.list.len() != self.rows(state).len() {
                    self.resync(state);
                }
            }
            SyncEvent::Progress(p) => self.progress = *p,
            SyncEvent::Loaded { id } if self.container_id.as_deref() == Some(id.as_str()) => {
                self.progress = None;
                self.resync(state);
            }
            _ => {}
        }
        Vec::new()
    }

    fn hide(&mut self) {
        self.search.deactivate();
    }

    fn select(&mut self, id: Option<&str>, state: &AppState) {
        self.selected_id = id.map(str::to_string);
        let index = self.selected_index(state);
        self.list.select(index);
        self.list.ensure_visible(self.last_height);
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, state: &AppState) {
        frame.render_widget(Clear, area);

        let container = state
            .sync
            .container()
            .filter(|c| c.id().is_some() && c.id() == self.container_id.as_deref());
        let title = match (container, &self.pending) {
            (Some(c), _) => display_label(c),
            (None, Some(id)) => id.clone(),
            (None, None) => self.container_id.clone().unwrap_or_default(),
        };
        let badge_text = self
            .progress
            .map(|p| format!("{:>3.0}%", p * 100.0))
            .or_else(|| container.is_some_and(ObjectNode::is_locked).then(|| "LOCKED".to_string()));
        let badge = badge_text.as_deref().map(|text| Badge {
            text,
            color: C_LOADING,
        });
        let block = pane_chrome(&title, true, badge);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(1)])
            .split(inner);
        let list_area = chunks[0];
        let footer_area = chunks[1];

        let height = list_area.height as usize;
        self.last_height = height.max(1);
        if self.list.len() != self.rows(state).len() {
            self.resync(state);
        }
        self.list.ensure_visible(height);

        let rows = self.rows(state);
        let playing = state.playing();
        let width = list_area.width as usize;
        let lines: Vec<Line> = self
            .list
            .visible_range(height)
            .filter_map(|i| rows.get(i).map(|n| (i, n)))
            .map(|(i, node)| {
                let line = Row::from_node(node, playing).to_line(width);
                if Some(i) == self.list.selected {
                    line.style(style_selected())
                } else {
                    line
                }
            })
            .collect();

        if lines.is_empty() {
            let loaded = container.is_some() && state.sync.load_state() == LoadState::Loaded;
            let text = if loaded { "(empty)" } else { "loading…" };
            frame.render_widget(
                Paragraph::new(Span::styled(text, style_secondary())),
                list_area,
            );
        } else {
            frame.render_widget(Paragraph::new(lines), list_area);
        }

        if self.search.is_active() {
            self.search.draw(frame, footer_area);
            return;
        }

        let total = container.and_then(ObjectNode::num_children).unwrap_or(0);
        let footer = match self.progress {
            Some(p) => Line::from(vec![
                Span::styled(
                    bar(p as f64, footer_area.width.saturating_sub(12) as usize),
                    Style::default().fg(C_LOADING),
                ),
                Span::styled(format!(" {}/{}", self.list.len(), total), style_secondary()),
            ]),
            None => {
                let position = self
                    .list
                    .selected
                    .map(|i| format!("  ·  {}/{}", i + 1, self.list.len()))
                    .unwrap_or_default();
                Line::from(Span::styled(
                    format!("{} entries{}", self.list.len(), position),
                    Style::default().fg(C_MUTED),
                ))
            }
        };
        frame.render_widget(Paragraph::new(footer), footer_area);
    }
}
