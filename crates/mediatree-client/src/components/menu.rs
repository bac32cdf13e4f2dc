//! Menu overlay: actions for the selected entry and the displayed album.

use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Clear, Paragraph},
    Frame,
};

use crate::action::{Action, Key, KeyCode};
use crate::app_state::AppState;
use crate::theme::{style_selected, C_MUTED, C_PRIMARY};
use crate::widgets::pane_chrome::{centered_rect, pane_chrome};

struct MenuItem {
    label: &'static str,
    action: Action,
}

pub struct Menu {
    items: Vec<MenuItem>,
    cursor: usize,
    title: String,
}

impl Menu {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            cursor: 0,
            title: String::new(),
        }
    }

    pub fn labels(&self) -> Vec<&'static str> {
        self.items.iter().map(|i| i.label).collect()
    }

    pub fn show(&mut self, state: &AppState) {
        self.items.clear();
        self.cursor = 0;
        let selected = state
            .nav
            .selection_id
            .as_deref()
            .and_then(|id| state.lookup(id));
        match selected {
            Some(node) if !node.is_locked() => {
                let id = node.id().unwrap_or_default().to_string();
                self.title = node.label().unwrap_or(&id).to_string();
                self.items.push(MenuItem {
                    label: "open / play",
                    action: Action::Fire(id.clone()),
                });
                self.items.push(MenuItem {
                    label: "info",
                    action: Action::ShowInfo(id.clone()),
                });
                self.items.push(MenuItem {
                    label: "append to queue",
                    action: Action::AddEntry {
                        id: id.clone(),
                        replace: false,
                    },
                });
                let favorite = node.class().is_item()
                    && state.nav.container_id != mediatree_proto::FAVORITES_ID;
                self.items.push(MenuItem {
                    label: "replace queue",
                    action: Action::AddEntry {
                        id: id.clone(),
                        replace: true,
                    },
                });
                if favorite {
                    self.items.push(MenuItem {
                        label: "add to favorites",
                        action: Action::CopyToFavorites(id),
                    });
                }
            }
            Some(node) => {
                self.title = format!("{} (locked)", node.label().unwrap_or_default());
            }
            None => self.title = "menu".to_string(),
        }
        self.items.push(MenuItem {
            label: "append album",
            action: Action::AddAlbum { replace: false },
        });
        self.items.push(MenuItem {
            label: "replace queue with album",
            action: Action::AddAlbum { replace: true },
        });
    }

    pub fn hide(&mut self) {
        self.items.clear();
    }

    /// Every key is swallowed while the menu is open.
    pub fn handle_key(&mut self, key: Key) -> Vec<Action> {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.cursor = self.cursor.saturating_sub(1);
                Vec::new()
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.cursor = (self.cursor + 1).min(self.items.len().saturating_sub(1));
                Vec::new()
            }
            KeyCode::Enter => match self.items.get(self.cursor) {
                Some(item) => vec![Action::CloseOverlay, item.action.clone()],
                None => vec![Action::CloseOverlay],
            },
            KeyCode::Esc | KeyCode::Tab => vec![Action::CloseOverlay],
            _ => Vec::new(),
        }
    }

    pub fn draw(&self, frame: &mut Frame, area: Rect) {
        let rect = centered_rect(area, 40, self.items.len() as u16 + 2);
        frame.render_widget(Clear, rect);
        let block = pane_chrome(&self.title, true, None);
        let lines: Vec<Line> = self
            .items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let line = Line::from(vec![
                    Span::raw(" "),
                    Span::styled(item.label, Style::default().fg(C_PRIMARY)),
                ]);
                if i == self.cursor {
                    line.style(style_selected())
                } else {
                    line
                }
            })
            .collect();
        let lines = if lines.is_empty() {
            vec![Line::from(Span::styled(" nothing to do", Style::default().fg(C_MUTED)))]
        } else {
            lines
        };
        frame.render_widget(Paragraph::new(lines).block(block), rect);
    }
}
