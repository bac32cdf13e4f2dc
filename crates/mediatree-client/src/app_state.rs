//! AppState: shared read-only data passed to all components during render/event.
//!
//! Components read this for tree, player and log data, but never mutate it.
//! The App event-loop is the only thing that writes to AppState.

use mediatree_proto::config::Config;
use mediatree_proto::tree::meta;
use mediatree_proto::ObjectNode;

use crate::history::NavState;
use crate::logging::LogBuffer;
use crate::player_state::PlayerState;
use crate::render::Playing;
use crate::sync::SyncClient;

/// Where playback commands currently go, for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RendererLabel {
    Local,
    Remote(String),
    /// Waiting for the server to advertise renderers.
    Searching,
}

pub struct AppState {
    // ── Tree ──────────────────────────────────────────────────────────────
    pub sync: SyncClient,

    // ── Connections ───────────────────────────────────────────────────────
    pub server_connected: bool,
    pub player_connected: bool,
    pub renderer: RendererLabel,
    /// Renderers advertised by the server.
    pub renderers: Vec<String>,

    // ── Player ────────────────────────────────────────────────────────────
    pub player: PlayerState,

    // ── Session ───────────────────────────────────────────────────────────
    pub config: Config,
    /// Navigation state last applied.
    pub nav: NavState,
    pub token: String,
    pub logs: LogBuffer,
    /// Blocking alert; swallows input until dismissed.
    pub alert: Option<String>,
}

impl AppState {
    pub fn new(config: Config, client_id: &str) -> Self {
        Self {
            sync: SyncClient::new(client_id),
            server_connected: false,
            player_connected: false,
            renderer: RendererLabel::Searching,
            renderers: Vec::new(),
            player: PlayerState::new(),
            logs: LogBuffer::new(config.ui.log_capacity),
            nav: NavState::default(),
            token: String::new(),
            alert: None,
            config,
        }
    }

    /// Any locally known object.
    pub fn lookup(&self, id: &str) -> Option<&ObjectNode> {
        self.sync.lookup(id)
    }

    pub fn current_track_id(&self) -> Option<&str> {
        self.player.track_id()
    }

    pub fn playing(&self) -> Playing<'_> {
        Playing {
            id: self.player.track_id(),
            hash: self
                .player
                .track
                .as_ref()
                .and_then(|t| t.metadata.get_str(meta::HASH)),
        }
    }
}
