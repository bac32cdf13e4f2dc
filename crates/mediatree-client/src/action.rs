//! Action enum: everything a widget or key binding can ask the App to do,
//! plus the front-end independent key type widgets consume.

use mediatree_proto::Payload;

use crate::history::Widget;
use crate::nav::Overlay;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCode {
    Char(char),
    Enter,
    Esc,
    Backspace,
    Tab,
    Up,
    Down,
    Left,
    Right,
    PageUp,
    PageDown,
    Home,
    End,
    F(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Key {
    pub code: KeyCode,
    pub ctrl: bool,
    pub alt: bool,
}

impl Key {
    pub fn plain(code: KeyCode) -> Self {
        Self {
            code,
            ctrl: false,
            alt: false,
        }
    }

    pub fn ctrl(code: KeyCode) -> Self {
        Self {
            ctrl: true,
            ..Self::plain(code)
        }
    }

    pub fn alt(code: KeyCode) -> Self {
        Self {
            alt: true,
            ..Self::plain(code)
        }
    }

    pub fn char(c: char) -> Self {
        Self::plain(KeyCode::Char(c))
    }

    pub fn is_plain(&self) -> bool {
        !self.ctrl && !self.alt
    }
}

/// All actions that can flow through the system.
/// Widgets produce Actions; the App dispatches them.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    // ── Navigation ───────────────────────────────────────────────────────────
    JumpTo {
        id: String,
        select: Option<String>,
    },
    ChangeUp,
    /// Back, closing an open overlay first.
    Back,
    HistoryGo(isize),
    Select(Option<String>),
    NextSibling,
    PrevSibling,
    ShowWidget(Widget),
    CloseWidget,
    ShowInfo(String),
    ReplaceInfo(String),
    ShowImage(String),
    ReplaceImage(String),
    OpenOverlay(Overlay),
    CloseOverlay,

    // ── Entries ──────────────────────────────────────────────────────────────
    /// Activate an entry: open, play or view it.
    Fire(String),
    /// Queue one entry, replacing the queue or appending.
    AddEntry {
        id: String,
        replace: bool,
    },
    /// Queue every item of the displayed container.
    AddAlbum {
        replace: bool,
    },
    /// Play a queue track.
    PlayById(String),
    /// Append an item to the server's favorites container.
    CopyToFavorites(String),
    /// Show the queue with the playing track selected.
    GotoCurrentTrack,
    /// Fetch an object for a viewer.
    FetchObject(String),

    // ── Playback ─────────────────────────────────────────────────────────────
    /// Send a player command as is.
    Player(Payload),
    VolumeStep(f64),
    ToggleMute,
    CycleMode,
    /// Relative seek as a fraction of the track.
    Seek(f64),
    /// `"local"` or a renderer address.
    UseRenderer(String),

    // ── System ───────────────────────────────────────────────────────────────
    DismissAlert,
    Quit,
    Noop,
}
