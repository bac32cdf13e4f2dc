//! App: the application context and its event loop.
//!
//! Everything mutable lives here and is touched only while one event is
//! handled to completion:
//!
//! ```text
//!  key ─────────► alert / overlay / EventHub(widgets) / global keys ─┐
//!  server link ─► dispatch::route ─► SyncClient / renderers / swipe ─┤
//!  player link ─► dispatch::route ─► playqueue mirror / PlayerState ─┤
//!  tick ────────► idle timers, local player clock ───────────────────┤
//!                                                                    ▼
//!                             pump: SyncEvents → widgets + Navigator
//!                                   Actions    → dispatch
//!                                   Outbox     → links / LocalPlayer
//! ```
//!
//! The [`Navigator`] drives the widgets through [`Shell`], the
//! [`NavigationHost`] implementation.  Widgets never mutate shared state;
//! they return [`Action`]s which the pump feeds back into `dispatch`.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use mediatree_proto::config::{Config, RendererChoice};
use mediatree_proto::tree::{parent_id, playqueue_track_id};
use mediatree_proto::{
    platform, Dict, Message, Payload, Splice, StateVar, FAVORITES_ID, PLAYQUEUE_ID,
};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Clear, Paragraph, Wrap},
    Frame,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::action::{Action, Key, KeyCode};
use crate::app_state::{AppState, RendererLabel};
use crate::component::Component;
use crate::components::browser::Browser;
use crate::components::help_overlay::HelpOverlay;
use crate::components::image_viewer::ImageViewer;
use crate::components::item_info::ItemInfo;
use crate::components::log_panel::LogPanel;
use crate::components::menu::Menu;
use crate::components::nav_popup::NavPopup;
use crate::components::player_panel::{PlayerPanel, SEEK_STEP};
use crate::components::settings::{Settings, LOCAL_RENDERER};
use crate::connection::{Link, TransportEvent};
use crate::dispatch::{route, Route, Source};
use crate::event_hub::{EventHub, Flow};
use crate::history::{NavState, Widget};
use crate::local_player::{LocalPlayer, SEEK_CTX, SEEK_VAR};
use crate::logging::LogEntry;
use crate::nav::{BackOutcome, ContainerStatus, NavigationHost, Navigator, Overlay};
use crate::outbox::Outbox;
use crate::player_state::{var, PlayerState, MDB_CTX, PLAYER_CTX, RENDERERS_VAR};
use crate::render::display_label;
use crate::sync::SyncEvent;
use crate::terminal;
use crate::theme::{style_accent, C_ACCENT, C_BG, C_PRIMARY};
use crate::token;
use crate::widgets::pane_chrome::centered_rect;
use crate::widgets::status_bar;

/// Upper bound on event → action → event rounds for one input.
const MAX_PUMP_ROUNDS: usize = 64;
const VOLUME_STEP: f64 = 0.05;
const NO_RENDERER: &str = "no renderer found";

/// Inputs of the event loop that do not come from a link.
#[derive(Debug)]
pub enum AppMessage {
    Key(Key),
    Resize,
}

/// Where the remote player link should go next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerLinkRequest {
    Connect(String),
    Disconnect,
}

/// Restorable navigation token, kept between sessions.
pub fn session_path() -> PathBuf {
    platform::data_dir().join("session")
}

// ── Widget registry ───────────────────────────────────────────────────────────

pub struct Components {
    pub browser: Browser,
    pub item_info: ItemInfo,
    pub image_viewer: ImageViewer,
    pub settings: Settings,
    pub log_panel: LogPanel,
    pub help: HelpOverlay,
    pub player: PlayerPanel,
}

impl Components {
    fn new(config: &Config) -> Self {
        Self {
            browser: Browser::new(),
            item_info: ItemInfo::new(),
            image_viewer: ImageViewer::new(Duration::from_secs(
                config.ui.image_controls_idle_secs,
            )),
            settings: Settings::new(),
            log_panel: LogPanel::new(),
            help: HelpOverlay::new(),
            player: PlayerPanel::new(),
        }
    }

    pub fn get_mut(&mut self, widget: Widget) -> &mut dyn Component {
        match widget {
            Widget::Browser => &mut self.browser,
            Widget::ItemInfo => &mut self.item_info,
            Widget::ImageViewer => &mut self.image_viewer,
            Widget::Settings => &mut self.settings,
            Widget::LogViewer => &mut self.log_panel,
            Widget::Help => &mut self.help,
            Widget::Player => &mut self.player,
        }
    }
}

// ── Navigation host ───────────────────────────────────────────────────────────

/// Everything the navigator acts on.  Side effects of a transition land in
/// `events` and `actions` and are processed by the pump afterwards.
struct Shell {
    state: AppState,
    components: Components,
    nav_popup: NavPopup,
    menu: Menu,
    hub: EventHub<Widget>,
    out: Outbox,
    events: Vec<SyncEvent>,
    actions: Vec<Action>,
}

impl NavigationHost for Shell {
    fn show_widget(&mut self, widget: Widget, state: &NavState) {
        self.state.nav = state.clone();
        let actions = self.components.get_mut(widget).show(state, &self.state);
        self.actions.extend(actions);
        self.hub.connect(widget);
    }

    fn hide_widget(&mut self, widget: Widget) {
        self.components.get_mut(widget).hide();
        self.hub.disconnect(widget);
    }

    fn load_container(&mut self, id: &str) {
        let events = self.state.sync.show(id, &mut self.out);
        self.events.extend(events);
    }

    fn container_status(&self, id: &str) -> ContainerStatus {
        self.state.sync.status(id)
    }

    fn has_child(&self, container: &str, id: &str) -> bool {
        self.state.sync.has_child(container, id)
    }

    fn select(&mut self, id: Option<&str>) {
        self.state.nav.selection_id = id.map(str::to_string);
        self.components.browser.select(id, &self.state);
    }

    fn show_overlay(&mut self, overlay: Overlay) {
        match overlay {
            Overlay::NavPopup => self.nav_popup.show(&self.state),
            Overlay::Menu => self.menu.show(&self.state),
        }
    }

    fn hide_overlay(&mut self, overlay: Overlay) {
        match overlay {
            Overlay::NavPopup => self.nav_popup.hide(),
            Overlay::Menu => self.menu.hide(),
        }
    }

    fn update_token(&mut self, token: &str) {
        if self.state.token != token {
            debug!("token {}", token);
            self.state.token = token.to_string();
        }
    }
}

// ── Player link ───────────────────────────────────────────────────────────────

enum PlayerLink {
    None,
    Local(LocalPlayer),
    Remote(String),
}

// ── App ───────────────────────────────────────────────────────────────────────

pub struct App {
    nav: Navigator,
    shell: Shell,
    player: PlayerLink,
    /// Messages ready for the links.
    outgoing: Outbox,
    player_request: Option<PlayerLinkRequest>,
    bootstrapped: bool,
    last_tick: Option<Instant>,
    should_quit: bool,
}

impl App {
    /// `token` restores navigation; an empty one starts at the root.
    pub fn new(config: Config, token: &str) -> Self {
        let client_id = format!("mediatree-{:08x}", rand::random::<u32>());
        let idle = Duration::from_secs(config.ui.nav_popup_idle_secs);
        let components = Components::new(&config);
        let state = AppState::new(config, &client_id);
        Self {
            nav: Navigator::new(token::decode(token)),
            shell: Shell {
                state,
                components,
                nav_popup: NavPopup::new(idle),
                menu: Menu::new(),
                hub: EventHub::new(),
                out: Outbox::new(),
                events: Vec::new(),
                actions: Vec::new(),
            },
            player: PlayerLink::None,
            outgoing: Outbox::new(),
            player_request: None,
            bootstrapped: false,
            last_tick: None,
            should_quit: false,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.shell.state
    }

    pub fn navigator(&self) -> &Navigator {
        &self.nav
    }

    pub fn token(&self) -> &str {
        &self.shell.state.token
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Push a forwarded log entry into the log viewer.
    pub fn push_log(&mut self, entry: LogEntry) {
        self.shell.state.logs.push(entry);
    }

    /// Messages for the server and remote player links.
    pub fn take_outgoing(&mut self) -> Outbox {
        std::mem::take(&mut self.outgoing)
    }

    pub fn take_player_request(&mut self) -> Option<PlayerLinkRequest> {
        self.player_request.take()
    }

    /// Show the restored state and pick the configured renderer.
    pub fn start(&mut self) {
        self.nav.apply(&mut self.shell);
        match self.shell.state.config.player.renderer_choice() {
            RendererChoice::Local => self.use_renderer(LOCAL_RENDERER),
            RendererChoice::Remote(addr) => self.use_renderer(&addr),
            RendererChoice::Auto => info!("waiting for the server to advertise renderers"),
        }
        self.pump();
    }

    pub fn save_session(&self) -> anyhow::Result<()> {
        let path = session_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, self.token())?;
        Ok(())
    }

    // ── Inputs ────────────────────────────────────────────────────────────────

    /// Returns whether a redraw is needed.
    pub fn handle_message(&mut self, msg: AppMessage) -> bool {
        match msg {
            AppMessage::Key(key) => self.handle_key(key),
            AppMessage::Resize => {}
        }
        true
    }

    pub fn handle_transport(&mut self, source: Source, event: TransportEvent) {
        match (source, event) {
            (Source::Server, TransportEvent::Open) => {
                info!(target: "mediatree::ui", "connected to server");
                self.shell.state.server_connected = true;
                let events = self.shell.state.sync.on_connected(&mut self.shell.out);
                self.shell.events.extend(events);
            }
            (Source::Server, TransportEvent::Closed) => {
                warn!("server connection lost");
                self.shell.state.server_connected = false;
                self.shell.out.server.clear();
                self.outgoing.server.clear();
                let events = self.shell.state.sync.on_disconnected();
                self.shell.events.extend(events);
            }
            (Source::Server, TransportEvent::Message(msg)) => self.on_server_message(&msg),
            (Source::Player, event) => {
                if !matches!(self.player, PlayerLink::Remote(_)) {
                    debug!("player link event without a remote renderer, ignored");
                    return;
                }
                match event {
                    TransportEvent::Open => {
                        info!(target: "mediatree::ui", "renderer connected");
                        self.shell.state.player_connected = true;
                        let events = self.shell.state.sync.set_player_ready(true, &mut self.shell.out);
                        self.shell.events.extend(events);
                    }
                    TransportEvent::Closed => {
                        warn!("renderer connection lost");
                        self.shell.state.player_connected = false;
                        self.shell.state.player = PlayerState::new();
                        self.outgoing.player.clear();
                        let events = self.shell.state.sync.set_player_ready(false, &mut self.shell.out);
                        self.shell.events.extend(events);
                    }
                    TransportEvent::Message(msg) => self.on_player_message(&msg),
                }
            }
        }
        self.pump();
    }

    pub fn handle_key(&mut self, key: Key) {
        if key.ctrl && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }

        if self.shell.state.alert.is_some() {
            if key.is_plain() && matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
                self.shell.actions.push(Action::DismissAlert);
            } else if key == Key::char('q') {
                self.shell.actions.push(Action::Quit);
            }
            self.pump();
            return;
        }

        if let Some(overlay) = self.nav.overlay() {
            let actions = match overlay {
                Overlay::NavPopup => self.shell.nav_popup.handle_key(key, &self.shell.state),
                Overlay::Menu => self.shell.menu.handle_key(key),
            };
            self.shell.actions.extend(actions);
            self.pump();
            return;
        }

        let order = self.shell.hub.snapshot();
        let shell = &mut self.shell;
        let flow = EventHub::fire(&order, |widget| {
            let (flow, actions) = shell.components.get_mut(widget).handle_key(key, &shell.state);
            shell.actions.extend(actions);
            flow
        });
        if flow == Flow::Continue {
            if let Some(action) = global_key(key) {
                self.shell.actions.push(action);
            }
        }
        self.pump();
    }

    pub fn tick(&mut self, now: Instant) {
        let elapsed = self
            .last_tick
            .map(|t| now.saturating_duration_since(t))
            .unwrap_or_default();
        self.last_tick = Some(now);
        if let PlayerLink::Local(player) = &mut self.player {
            player.advance_clock(elapsed);
        }
        if self.nav.overlay() == Some(Overlay::NavPopup) {
            let actions = self.shell.nav_popup.tick(now);
            self.shell.actions.extend(actions);
        }
        let widget = self.nav.state().widget;
        let shell = &mut self.shell;
        let actions = shell.components.get_mut(widget).tick(now, &shell.state);
        shell.actions.extend(actions);
        self.pump();
    }

    // ── Inbound messages ──────────────────────────────────────────────────────

    fn on_server_message(&mut self, msg: &Message) {
        match route(Source::Server, msg) {
            Route::Tree => {
                let events = self.shell.state.sync.handle_server(msg, &mut self.shell.out);
                self.shell.events.extend(events);
            }
            Route::ServerState => match msg.payload() {
                Ok(Payload::StateChanged(v)) => self.on_server_state(&v),
                Ok(_) => {}
                Err(e) => debug!("server state: {}", e),
            },
            Route::Gesture => match msg.payload() {
                Ok(Payload::Swipe(direction)) => {
                    let widget = self.nav.state().widget;
                    let shell = &mut self.shell;
                    let actions = shell
                        .components
                        .get_mut(widget)
                        .handle_swipe(direction, &shell.state);
                    shell.actions.extend(actions);
                }
                Ok(_) => {}
                Err(e) => debug!("swipe: {}", e),
            },
            Route::Queue | Route::PlayerState | Route::Drop => {
                debug!("dropping {}/{} from server", msg.ns(), msg.id());
            }
        }
    }

    fn on_server_state(&mut self, v: &StateVar) {
        if v.ctx != MDB_CTX || v.name != RENDERERS_VAR {
            debug!("server state {}/{} ignored", v.ctx, v.name);
            return;
        }
        let renderers: Vec<String> = v
            .value
            .as_array()
            .map(|a| a.iter().filter_map(|r| r.as_str().map(str::to_string)).collect())
            .unwrap_or_default();
        info!(target: "mediatree::ui", "{} renderer(s) available", renderers.len());
        let first = renderers.first().cloned();
        self.shell.state.renderers = renderers;
        let auto = self.shell.state.config.player.renderer_choice() == RendererChoice::Auto;
        if auto && matches!(self.player, PlayerLink::None) {
            if let Some(first) = first {
                self.use_renderer(&first);
            }
        }
    }

    fn on_player_message(&mut self, msg: &Message) {
        match route(Source::Player, msg) {
            Route::Queue => {
                let events = self.shell.state.sync.handle_player(msg);
                self.shell.events.extend(events);
            }
            Route::PlayerState => {
                let Ok(Payload::StateChanged(v)) = msg.payload() else {
                    return;
                };
                if v.ctx != PLAYER_CTX {
                    return;
                }
                if let Some(change) = self.shell.state.player.apply(&v) {
                    let shell = &mut self.shell;
                    for widget in Widget::ALL {
                        shell.components.get_mut(widget).on_player(change, &shell.state);
                    }
                }
            }
            _ => debug!("dropping {}/{} from player", msg.ns(), msg.id()),
        }
    }

    // ── Pump ──────────────────────────────────────────────────────────────────

    /// Run queued events, actions and in-process player traffic until
    /// nothing new is produced.
    fn pump(&mut self) {
        for _ in 0..MAX_PUMP_ROUNDS {
            self.flush_outbox();
            let events = std::mem::take(&mut self.shell.events);
            let actions = std::mem::take(&mut self.shell.actions);
            if events.is_empty() && actions.is_empty() {
                return;
            }
            for event in events {
                self.on_sync_event(event);
            }
            for action in actions {
                self.dispatch(action);
            }
        }
        warn!("event pump did not settle after {} rounds", MAX_PUMP_ROUNDS);
    }

    fn flush_outbox(&mut self) {
        let Outbox { server, player } = std::mem::take(&mut self.shell.out);
        self.outgoing.server.extend(server);
        let replies = match &mut self.player {
            PlayerLink::Local(local) => {
                for msg in &player {
                    local.handle_message(msg);
                }
                local.take_outbox()
            }
            PlayerLink::Remote(_) => {
                self.outgoing.player.extend(player);
                Vec::new()
            }
            PlayerLink::None => {
                if !player.is_empty() {
                    debug!("no renderer, {} player messages dropped", player.len());
                }
                Vec::new()
            }
        };
        for reply in &replies {
            self.on_player_message(reply);
        }
    }

    fn on_sync_event(&mut self, event: SyncEvent) {
        {
            let shell = &mut self.shell;
            for widget in Widget::ALL {
                let actions = shell.components.get_mut(widget).on_sync(&event, &shell.state);
                shell.actions.extend(actions);
            }
        }
        match event {
            SyncEvent::Loaded { id } => self.nav.container_updated(&mut self.shell, &id),
            SyncEvent::RowsSpliced { .. } => {
                if let Some(id) = self.shell.state.sync.container_id().map(str::to_string) {
                    self.nav.container_updated(&mut self.shell, &id);
                }
            }
            SyncEvent::BrowseFailed { id } => self.nav.container_missing(&mut self.shell, &id),
            SyncEvent::AncestorDeleted { ancestor } => {
                info!(target: "mediatree::ui", "container removed, showing {}", ancestor);
                self.nav.fall_back(&mut self.shell, &ancestor);
            }
            SyncEvent::RootLoaded => self.on_root_loaded(),
            _ => {}
        }
    }

    fn on_root_loaded(&mut self) {
        if self.bootstrapped {
            return;
        }
        self.bootstrapped = true;
        info!("root loaded, {} entries", self.shell.state.sync.root().children().len());
        let auto = self.shell.state.config.player.renderer_choice() == RendererChoice::Auto;
        if auto && matches!(self.player, PlayerLink::None) && self.shell.state.renderers.is_empty() {
            warn!("{}", NO_RENDERER);
            self.shell.state.alert = Some(NO_RENDERER.to_string());
        }
    }

    // ── Actions ───────────────────────────────────────────────────────────────

    fn dispatch(&mut self, action: Action) {
        let host = &mut self.shell;
        match action {
            Action::JumpTo { id, select } => self.nav.jump_to(host, &id, select.as_deref()),
            Action::ChangeUp => self.nav.change_up(host),
            Action::Back => {
                if self.nav.back(host) == BackOutcome::AtStart {
                    info!(target: "mediatree::ui", "at the start of history, q quits");
                }
            }
            Action::HistoryGo(delta) => {
                self.nav.platform_pop(host, delta);
            }
            Action::Select(id) => self.nav.select(host, id.as_deref()),
            Action::NextSibling => self.step_container(true),
            Action::PrevSibling => self.step_container(false),
            Action::ShowWidget(widget) => self.nav.show_widget(host, widget),
            Action::CloseWidget => self.nav.close_widget(host),
            Action::ShowInfo(id) => self.nav.show_info(host, &id),
            Action::ReplaceInfo(id) => self.nav.replace_info(host, &id),
            Action::ShowImage(id) => self.nav.show_image(host, &id),
            Action::ReplaceImage(id) => self.nav.replace_image(host, &id),
            Action::OpenOverlay(overlay) => self.nav.open_overlay(host, overlay),
            Action::CloseOverlay => self.nav.close_overlay(host),

            Action::Fire(id) => self.fire(&id),
            Action::AddEntry { id, replace } => self.add_entry(&id, replace),
            Action::AddAlbum { replace } => self.add_album(replace),
            Action::PlayById(id) => self.play_by_id(&id),
            Action::CopyToFavorites(id) => self.copy_to_favorites(&id),
            Action::GotoCurrentTrack => self.goto_current_track(),
            Action::FetchObject(id) => {
                let events = host.state.sync.request_object(&id, &mut host.out);
                host.events.extend(events);
            }

            Action::Player(payload) => self.send_player(payload),
            Action::VolumeStep(delta) => self.set_relative(var::VOLUME, delta),
            Action::ToggleMute => self.set_relative(var::MUTE, 1i32),
            Action::CycleMode => self.set_relative(var::MODE, 1i32),
            Action::Seek(delta) => self.seek(delta),
            Action::UseRenderer(renderer) => self.use_renderer(&renderer),

            Action::DismissAlert => self.shell.state.alert = None,
            Action::Quit => self.should_quit = true,
            Action::Noop => {}
        }
    }

    fn step_container(&mut self, forward: bool) {
        let target = self.shell.state.sync.container().and_then(|c| {
            if forward {
                c.next_sibling_id()
            } else {
                c.prev_sibling_id()
            }
        });
        if let Some(id) = target.map(str::to_string) {
            self.nav.jump_to(&mut self.shell, &id, None);
        }
    }

    /// Open, play or view an entry depending on what it is.
    fn fire(&mut self, id: &str) {
        let Some(node) = self.shell.state.lookup(id).cloned() else {
            debug!("fire: {} is not known locally", id);
            return;
        };
        if node.is_locked() {
            info!(target: "mediatree::ui", "{} is locked", node.label().unwrap_or(id));
            return;
        }
        let class = node.class();
        if class.is_container() {
            self.nav.jump_to(&mut self.shell, id, None);
        } else if parent_id(id) == Some(PLAYQUEUE_ID) {
            self.play_by_id(id);
        } else if class.is_image() {
            self.nav.show_image(&mut self.shell, id);
        } else {
            let in_album = self
                .shell
                .state
                .sync
                .container()
                .is_some_and(|c| c.child_by_id(id).is_some());
            if in_album {
                self.add_album(true);
            } else {
                self.add_entry(id, true);
            }
            self.play_by_id(&playqueue_track_id(&node.metadata));
        }
    }

    fn add_entry(&mut self, id: &str, replace: bool) {
        let Some(node) = self.shell.state.lookup(id) else {
            return;
        };
        if !node.class().is_item() || node.is_locked() {
            info!(target: "mediatree::ui", "only unlocked items can be queued");
            return;
        }
        let item = node.to_dict(false);
        let splice = if replace {
            Splice::new(0, -1, vec![item])
        } else {
            Splice::new(-1, 0, vec![item])
        };
        self.queue_command(splice);
    }

    /// Queue every item of the displayed container, in batches.
    fn add_album(&mut self, replace: bool) {
        let Some(container) = self.shell.state.sync.container() else {
            return;
        };
        if container.id() == Some(PLAYQUEUE_ID) {
            return;
        }
        let items: Vec<Dict> = container
            .children()
            .iter()
            .filter(|c| c.class().is_item() && !c.is_locked())
            .map(|c| c.to_dict(false))
            .collect();
        if items.is_empty() {
            info!(target: "mediatree::ui", "nothing to queue here");
            return;
        }
        let batch = self.shell.state.config.browser.tracks_per_message.max(1);
        let splices: Vec<Splice> = items
            .chunks(batch)
            .enumerate()
            .map(|(i, chunk)| {
                if i == 0 && replace {
                    Splice::new(0, -1, chunk.to_vec())
                } else {
                    Splice::new(-1, 0, chunk.to_vec())
                }
            })
            .collect();
        debug!("queueing {} items in {} commands", items.len(), splices.len());
        for splice in splices {
            self.queue_command(splice);
        }
    }

    fn copy_to_favorites(&mut self, id: &str) {
        if self.shell.state.sync.container_id() == Some(FAVORITES_ID) {
            return;
        }
        let Some(node) = self.shell.state.lookup(id) else {
            return;
        };
        if !node.class().is_item() {
            info!(target: "mediatree::ui", "only items can be added to favorites");
            return;
        }
        let label = display_label(node);
        let mut msg = Payload::SpliceChildrenCommand(Splice::new(-1, 0, vec![node.to_dict(false)]))
            .to_message()
            .with_context(FAVORITES_ID);
        msg.set_client_id(self.shell.state.sync.client_id());
        self.shell.out.server.push(msg);
        info!(target: "mediatree::ui", "{} added to favorites", label);
    }

    fn goto_current_track(&mut self) {
        let Some(track) = self.shell.state.current_track_id().map(str::to_string) else {
            info!(target: "mediatree::ui", "nothing is playing");
            return;
        };
        self.nav.jump_to(&mut self.shell, PLAYQUEUE_ID, Some(&track));
    }

    fn queue_command(&mut self, splice: Splice) {
        let mut msg = Payload::SpliceChildrenCommand(splice)
            .to_message()
            .with_context(PLAYQUEUE_ID);
        msg.set_client_id(self.shell.state.sync.client_id());
        self.push_player(msg);
    }

    fn play_by_id(&mut self, id: &str) {
        self.send_player(Payload::SetCurrentTrack(id.to_string()));
        self.send_player(Payload::Play);
    }

    fn set_relative(&mut self, name: &str, delta: impl Into<mediatree_proto::Value>) {
        self.send_player(Payload::SetStateRel(StateVar::new(PLAYER_CTX, name, delta)));
    }

    fn seek(&mut self, delta: f64) {
        let Some(perc) = self.shell.state.player.time_perc else {
            debug!("seek without a known position");
            return;
        };
        let target = (perc + delta).clamp(0.0, 1.0);
        self.send_player(Payload::SetState(StateVar::new(SEEK_CTX, SEEK_VAR, target)));
    }

    fn send_player(&mut self, payload: Payload) {
        let mut msg = payload.to_message();
        msg.set_client_id(self.shell.state.sync.client_id());
        self.push_player(msg);
    }

    fn push_player(&mut self, msg: Message) {
        if matches!(self.player, PlayerLink::None) {
            warn!(target: "mediatree::ui", "{}", NO_RENDERER);
            return;
        }
        self.shell.out.player.push(msg);
    }

    /// Switch playback to the in-process player or a renderer address.
    fn use_renderer(&mut self, renderer: &str) {
        let state = &mut self.shell.state;
        let events = if renderer == LOCAL_RENDERER {
            self.player = PlayerLink::Local(LocalPlayer::new(state.config.player.volume));
            self.player_request = Some(PlayerLinkRequest::Disconnect);
            state.renderer = RendererLabel::Local;
            state.player_connected = true;
            state.player = PlayerState::new();
            state.sync.set_player_ready(true, &mut self.shell.out)
        } else {
            self.player = PlayerLink::Remote(renderer.to_string());
            self.player_request = Some(PlayerLinkRequest::Connect(renderer.to_string()));
            state.renderer = RendererLabel::Remote(renderer.to_string());
            state.player_connected = false;
            state.player = PlayerState::new();
            self.outgoing.player.clear();
            state.sync.set_player_ready(false, &mut self.shell.out)
        };
        state.alert = None;
        self.shell.events.extend(events);
        info!(target: "mediatree::ui", "renderer: {}", renderer);
    }

    // ── Drawing ───────────────────────────────────────────────────────────────

    pub fn draw(&mut self, frame: &mut Frame) {
        let area = frame.area();
        frame.render_widget(Block::default().style(Style::default().bg(C_BG)), area);

        let outer = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(0),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .split(area);

        let widget = self.nav.state().widget;
        let shell = &mut self.shell;
        shell.components.get_mut(widget).draw(frame, outer[0], &shell.state);

        status_bar::draw_separator(frame, outer[1]);
        status_bar::draw_status_line(frame, outer[2], &shell.state);
        status_bar::draw_keys_bar(frame, outer[3], widget);

        match self.nav.overlay() {
            Some(Overlay::NavPopup) => shell.nav_popup.draw(frame, outer[0], &shell.state),
            Some(Overlay::Menu) => shell.menu.draw(frame, outer[0]),
            None => {}
        }

        if let Some(alert) = &shell.state.alert {
            draw_alert(frame, area, alert);
        }
    }

    // ── Event loop ────────────────────────────────────────────────────────────

    pub async fn run(mut self, mut log_rx: mpsc::UnboundedReceiver<LogEntry>) -> anyhow::Result<()> {
        let mut terminal = terminal::setup()?;

        let (tx, mut rx) = mpsc::channel::<AppMessage>(1024);
        let (link_tx, mut link_rx) = mpsc::channel::<(Source, TransportEvent)>(1024);

        let config = &self.shell.state.config;
        let delay = Duration::from_millis(config.server.reconnect_delay_ms);
        info!("connecting to {}", config.server.address);
        let mut server = Link::spawn(
            Source::Server,
            config.server.address.clone(),
            delay,
            link_tx.clone(),
        );
        let mut player_link: Option<Link> = None;

        // ── Background task: keyboard events ──────────────────────────────────
        terminal::spawn_event_reader(tx.clone());

        self.start();

        let mut ui_tick = tokio::time::interval(Duration::from_millis(100));
        ui_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        // ── Main loop ─────────────────────────────────────────────────────────
        let mut needs_redraw = true;
        loop {
            self.flush_links(&mut server, &mut player_link, &link_tx, delay);

            if needs_redraw {
                terminal.draw(|f| self.draw(f))?;
            }
            needs_redraw = false;

            if self.should_quit {
                break;
            }

            tokio::select! {
                Some(msg) = rx.recv() => {
                    needs_redraw = self.handle_message(msg);
                }

                Some((source, event)) = link_rx.recv() => {
                    const MAX_DRAIN: usize = 256;
                    self.handle_transport(source, event);
                    let mut drained = 0usize;
                    while drained < MAX_DRAIN {
                        let Ok((source, event)) = link_rx.try_recv() else {
                            break;
                        };
                        self.handle_transport(source, event);
                        drained += 1;
                    }
                    needs_redraw = true;
                }

                Some(entry) = log_rx.recv() => {
                    self.push_log(entry);
                    needs_redraw = true;
                }

                _ = ui_tick.tick() => {
                    self.tick(Instant::now());
                    needs_redraw = true;
                }
            }
        }

        // ── Teardown ──────────────────────────────────────────────────────────
        if let Err(e) = self.save_session() {
            warn!("could not save session: {}", e);
        }
        terminal::restore(&mut terminal)?;
        Ok(())
    }

    fn flush_links(
        &mut self,
        server: &mut Link,
        player_link: &mut Option<Link>,
        events: &mpsc::Sender<(Source, TransportEvent)>,
        delay: Duration,
    ) {
        if let Some(request) = self.take_player_request() {
            *player_link = match request {
                PlayerLinkRequest::Connect(addr) => {
                    info!("connecting to renderer {}", addr);
                    Some(Link::spawn(Source::Player, addr, delay, events.clone()))
                }
                PlayerLinkRequest::Disconnect => None,
            };
        }
        let mut out = self.take_outgoing();
        match player_link {
            Some(link) => out.flush(server, link),
            None => out.flush(server, &mut Vec::<Message>::new()),
        }
    }
}

/// Bindings that apply whatever widget is active.
fn global_key(key: Key) -> Option<Action> {
    if key.alt {
        return match key.code {
            KeyCode::Left => Some(Action::Back),
            KeyCode::Right => Some(Action::HistoryGo(1)),
            _ => None,
        };
    }
    if key.ctrl {
        return None;
    }
    let action = match key.code {
        KeyCode::Char(' ') => Action::Player(Payload::Pause),
        KeyCode::Char('s') => Action::Player(Payload::Stop),
        KeyCode::Char('n') => Action::Player(Payload::Next),
        KeyCode::Char('p') => Action::Player(Payload::Prev),
        KeyCode::Char('v') => Action::Player(Payload::NextVisualization),
        KeyCode::Char('+') | KeyCode::Char('=') => Action::VolumeStep(VOLUME_STEP),
        KeyCode::Char('-') => Action::VolumeStep(-VOLUME_STEP),
        KeyCode::Char('m') => Action::ToggleMute,
        KeyCode::Char('M') => Action::CycleMode,
        KeyCode::Char(',') => Action::Seek(-SEEK_STEP),
        KeyCode::Char('.') => Action::Seek(SEEK_STEP),
        KeyCode::Char('l') => Action::ShowWidget(Widget::LogViewer),
        KeyCode::Char('?') => Action::ShowWidget(Widget::Help),
        KeyCode::Char('o') => Action::ShowWidget(Widget::Settings),
        KeyCode::Char('P') => Action::ShowWidget(Widget::Player),
        KeyCode::Char('g') => Action::OpenOverlay(Overlay::NavPopup),
        KeyCode::Char('c') => Action::GotoCurrentTrack,
        KeyCode::Tab => Action::OpenOverlay(Overlay::Menu),
        KeyCode::Esc | KeyCode::Backspace => Action::Back,
        KeyCode::Char('q') => Action::Quit,
        _ => return None,
    };
    Some(action)
}

fn draw_alert(frame: &mut Frame, area: Rect, text: &str) {
    let rect = centered_rect(area, 44, 5);
    frame.render_widget(Clear, rect);
    let block = Block::default()
        .borders(ratatui::widgets::Borders::ALL)
        .border_style(style_accent())
        .title(Span::styled(
            " alert ",
            Style::default().fg(C_ACCENT).add_modifier(Modifier::BOLD),
        ));
    let lines = vec![
        Line::from(Span::styled(
            text.to_string(),
            Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled("enter to dismiss, q to quit", style_accent())),
    ];
    frame.render_widget(
        Paragraph::new(lines)
            .block(block)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true }),
        rect,
    );
}
