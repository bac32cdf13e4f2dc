//! Navigation snapshots and the back/forward stack.
//!
//! ```text
//!  push:     [a, b, c*]        → [a, b, c, d*]
//!  back(1):  [a, b, c, d*]     → [a, b, c*, d]
//!  push:     [a, b, c*, d]     → [a, b, c, e*]     (d is gone)
//!  replace:  [a, b, c, e*]     → [a, b, c, f*]
//! ```
//!
//! The entry under the cursor is always the current state.

use mediatree_proto::ROOT_ID;

/// Top-level screens.  Exactly one is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Widget {
    #[default]
    Browser,
    ItemInfo,
    ImageViewer,
    Settings,
    LogViewer,
    Help,
    Player,
}

impl Widget {
    pub const ALL: [Widget; 7] = [
        Widget::Browser,
        Widget::ItemInfo,
        Widget::ImageViewer,
        Widget::Settings,
        Widget::LogViewer,
        Widget::Help,
        Widget::Player,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Widget::Browser => "browser",
            Widget::ItemInfo => "iteminfo",
            Widget::ImageViewer => "imageviewer",
            Widget::Settings => "settings",
            Widget::LogViewer => "logviewer",
            Widget::Help => "help",
            Widget::Player => "player",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|w| w.name() == name)
    }
}

/// One immutable navigation snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavState {
    pub widget: Widget,
    pub container_id: String,
    pub selection_id: Option<String>,
    pub info_id: Option<String>,
    pub image_id: Option<String>,
}

impl NavState {
    pub fn browse(container_id: &str) -> Self {
        Self {
            widget: Widget::Browser,
            container_id: container_id.to_string(),
            selection_id: None,
            info_id: None,
            image_id: None,
        }
    }

    pub fn with_selection(mut self, id: Option<&str>) -> Self {
        self.selection_id = id.map(str::to_string);
        self
    }
}

impl Default for NavState {
    fn default() -> Self {
        Self::browse(ROOT_ID)
    }
}

pub struct HistoryStack {
    entries: Vec<NavState>,
    cursor: usize,
}

impl HistoryStack {
    pub fn new(initial: NavState) -> Self {
        Self {
            entries: vec![initial],
            cursor: 0,
        }
    }

    pub fn current(&self) -> &NavState {
        &self.entries[self.cursor]
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[NavState] {
        &self.entries
    }

    /// Entry `offset` steps from the cursor, if it exists.
    pub fn peek(&self, offset: isize) -> Option<&NavState> {
        let idx = self.cursor.checked_add_signed(offset)?;
        self.entries.get(idx)
    }

    /// Drop everything after the cursor and append `state` as current.
    pub fn push(&mut self, state: NavState) {
        self.entries.truncate(self.cursor + 1);
        self.entries.push(state);
        self.cursor = self.entries.len() - 1;
    }

    /// Overwrite the current entry.
    pub fn replace(&mut self, state: NavState) {
        self.entries[self.cursor] = state;
    }

    /// Move the cursor by `delta`, clamped to the stack.  Returns the number
    /// of steps actually taken.
    pub fn go(&mut self, delta: isize) -> isize {
        let max = (self.entries.len() - 1) as isize;
        let target = (self.cursor as isize + delta).clamp(0, max);
        let moved = target - self.cursor as isize;
        self.cursor = target as usize;
        moved
    }

    pub fn can_go_back(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_go_forward(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }
}
