//! SyncClient: keeps the displayed container, the root cache and the
//! playqueue mirror in step with the server and the player.
//!
//! # Container lifecycle
//! ```text
//!  show(id) ──► cached?  yes ──► ContainerShown
//!               │no
//!               ▼
//!        BrowseObject(id) ──► response ──► install ──► BrowseChildren(id)
//!                                │ empty                  │ chunks (notLast)
//!                                ▼                        ▼
//!                          BrowseFailed            Loading(received, declared)
//!                                                         │ last chunk
//!                                                         ▼
//!                                                       Loaded
//! ```
//!
//! Three containers are held locally: the root (`/`, with the playqueue
//! entry kept at index 0 so server splices for `/` are shifted by one), the
//! playqueue mirror (fed by the player), and whatever other container is
//! displayed.  Responses for anything else are stale and dropped.
//!
//! # Ancestor deletion
//! A splice notification that deletes under an ancestor of the displayed
//! container may have removed it.  The ancestor is re-browsed and every
//! returned item checked; if neither the container nor one of its ancestors
//! shows up by the last chunk, [`SyncEvent::AncestorDeleted`] sends
//! navigation up.  One check runs at a time: a notification for the same
//! ancestor during a check schedules a rerun, a different ancestor replaces
//! the check.
//!
//! Every children browse sent to the server is queued with its purpose and
//! a sequence number.  The server answers a context in request order, so
//! the oldest queued browse for a context owns the next answer.  Answers of
//! a cancelled or replaced check, or of a superseded load, are discarded
//! without touching the caches.

use std::collections::VecDeque;

use mediatree_proto::tree::{get_by_id, is_ancestor, meta, parent_id, SpliceRange};
use mediatree_proto::{
    Dict, Message, ObjectNode, Payload, ProtoError, Splice, PLAYQUEUE_ID, ROOT_ID,
};
use tracing::{debug, info, warn};

use crate::nav::ContainerStatus;
use crate::outbox::Outbox;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum LoadState {
    #[default]
    Unloaded,
    Loading {
        received: usize,
        declared: Option<usize>,
    },
    Loaded,
}

impl LoadState {
    /// Fraction received while loading with a known size.
    pub fn progress(&self) -> Option<f32> {
        match *self {
            LoadState::Loading {
                received,
                declared: Some(declared),
            } if declared > 0 => Some((received as f32 / declared as f32).min(1.0)),
            _ => None,
        }
    }
}

/// What changed, for the renderer and the navigator.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// Waiting for the object of `id`; nothing to draw yet.
    ContainerPending { id: String },
    /// The displayed container (re)appeared; redraw header and rows.
    ContainerShown { id: String },
    RowsSpliced {
        index: usize,
        deleted: usize,
        inserted: usize,
    },
    RowChanged { id: String },
    HeaderChanged,
    /// `None` clears the indicator.
    Progress(Option<f32>),
    Loaded { id: String },
    /// Root object and children are both in.
    RootLoaded,
    /// The server does not know the container `id`.
    BrowseFailed { id: String },
    /// The displayed container disappeared under `ancestor`.
    AncestorDeleted { ancestor: String },
    ObjectFetched(ObjectNode),
    FetchFailed { id: String },
    /// The playqueue mirror changed.
    PlayqueueChanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Root,
    Playqueue,
    Node,
}

enum Slot {
    Root,
    Playqueue,
    Node { node: ObjectNode, load: LoadState },
}

#[derive(Debug, Clone)]
struct Reconciliation {
    ancestor: String,
    container: String,
    found: bool,
    rerun: bool,
    /// Browse whose answer decides this check.
    seq: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Purpose {
    Load,
    Check,
}

/// A children browse waiting for its last chunk.
#[derive(Debug, Clone)]
struct Browse {
    ctx: String,
    purpose: Purpose,
    seq: u64,
}

pub struct SyncClient {
    client_id: String,
    root: ObjectNode,
    root_object_loaded: bool,
    root_load: LoadState,
    root_announced: bool,
    playqueue: ObjectNode,
    playqueue_load: LoadState,
    player_ready: bool,
    displayed: Option<Slot>,
    /// Container whose object was requested and not answered yet.
    pending: Option<String>,
    /// Objects requested for viewers, not for display.
    fetches: Vec<String>,
    reconcile: Option<Reconciliation>,
    in_flight: VecDeque<Browse>,
    next_seq: u64,
    /// Latest load browse of the root and of the displayed node.
    root_seq: u64,
    node_seq: u64,
}

impl SyncClient {
    pub fn new(client_id: &str) -> Self {
        let mut playqueue = ObjectNode::new(PLAYQUEUE_ID);
        playqueue.metadata.set(meta::LABEL, "Playqueue");
        playqueue.metadata.set(meta::CLASS, "container.playlist");
        let mut root = ObjectNode::new(ROOT_ID);
        root.metadata.set(meta::CLASS, "container.root");
        root.children = Some(vec![queue_entry(&playqueue)]);
        Self {
            client_id: client_id.to_string(),
            root,
            root_object_loaded: false,
            root_load: LoadState::Unloaded,
            root_announced: false,
            playqueue,
            playqueue_load: LoadState::Unloaded,
            player_ready: false,
            displayed: None,
            pending: None,
            fetches: Vec::new(),
            reconcile: None,
            in_flight: VecDeque::new(),
            next_seq: 0,
            root_seq: 0,
            node_seq: 0,
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    // ── Queries ───────────────────────────────────────────────────────────────

    pub fn root(&self) -> &ObjectNode {
        &self.root
    }

    pub fn playqueue(&self) -> &ObjectNode {
        &self.playqueue
    }

    pub fn root_loaded(&self) -> bool {
        self.root_object_loaded && self.root_load == LoadState::Loaded
    }

    pub fn player_ready(&self) -> bool {
        self.player_ready
    }

    pub fn container(&self) -> Option<&ObjectNode> {
        match self.displayed.as_ref()? {
            Slot::Root => Some(&self.root),
            Slot::Playqueue => Some(&self.playqueue),
            Slot::Node { node, .. } => Some(node),
        }
    }

    pub fn container_id(&self) -> Option<&str> {
        self.container().and_then(ObjectNode::id)
    }

    pub fn load_state(&self) -> LoadState {
        match self.displayed {
            Some(Slot::Root) => self.root_load,
            Some(Slot::Playqueue) => self.playqueue_load,
            Some(Slot::Node { load, .. }) => load,
            None => LoadState::Unloaded,
        }
    }

    pub fn status(&self, id: &str) -> ContainerStatus {
        if self.container_id() == Some(id) {
            match self.load_state() {
                LoadState::Loaded => ContainerStatus::Loaded,
                _ => ContainerStatus::Loading,
            }
        } else if self.pending.as_deref() == Some(id) {
            ContainerStatus::Loading
        } else {
            ContainerStatus::Unknown
        }
    }

    pub fn has_child(&self, container: &str, id: &str) -> bool {
        self.container_id() == Some(container)
            && self.container().is_some_and(|c| c.child_by_id(id).is_some())
    }

    /// Any locally known object: the displayed container and its children,
    /// root entries, queue tracks.
    pub fn lookup(&self, id: &str) -> Option<&ObjectNode> {
        self.container()
            .and_then(|c| get_by_id(c, id))
            .or_else(|| get_by_id(&self.playqueue, id))
            .or_else(|| get_by_id(&self.root, id))
    }

    pub fn reconciling(&self) -> Option<&str> {
        self.reconcile.as_ref().map(|r| r.ancestor.as_str())
    }

    // ── Requests ──────────────────────────────────────────────────────────────

    fn request(&self, payload: Payload, ctx: &str) -> Message {
        let mut msg = payload.to_message().with_context(ctx);
        msg.set_client_id(&self.client_id);
        msg
    }

    fn browse_object(&self, id: &str) -> Message {
        self.request(Payload::BrowseObject, id)
    }

    fn browse_children(&self, id: &str) -> Message {
        self.request(Payload::BrowseChildren { start: 0, count: 0 }, id)
    }

    /// Children browse to the server, queued so its answer can be told apart.
    fn send_children(&mut self, id: &str, purpose: Purpose, out: &mut Outbox) -> u64 {
        self.next_seq += 1;
        let seq = self.next_seq;
        self.in_flight.push_back(Browse {
            ctx: id.to_string(),
            purpose,
            seq,
        });
        out.server.push(self.browse_children(id));
        seq
    }

    // ── Connection ────────────────────────────────────────────────────────────

    /// Fresh connection: reload the root and re-establish the display.
    pub fn on_connected(&mut self, out: &mut Outbox) -> Vec<SyncEvent> {
        self.root_object_loaded = false;
        self.root_announced = false;
        self.fetches.clear();
        self.in_flight.clear();
        let mut events = self.refresh_root(out);
        match &self.displayed {
            Some(Slot::Node { node, .. }) => {
                if let Some(id) = node.id().map(str::to_string) {
                    out.server.push(self.browse_object(&id));
                    self.pending = Some(id);
                }
            }
            None => {
                if let Some(id) = self.pending.clone() {
                    out.server.push(self.browse_object(&id));
                    events.push(SyncEvent::ContainerPending { id });
                }
            }
            _ => {}
        }
        events
    }

    /// Connection lost.  A pending ancestor check can no longer be decided,
    /// so the display goes up to the ancestor.
    pub fn on_disconnected(&mut self) -> Vec<SyncEvent> {
        self.in_flight.clear();
        match self.reconcile.take() {
            Some(r) => {
                info!("connection lost while checking {}", r.ancestor);
                self.displayed = None;
                vec![SyncEvent::AncestorDeleted {
                    ancestor: r.ancestor,
                }]
            }
            None => Vec::new(),
        }
    }

    fn refresh_root(&mut self, out: &mut Outbox) -> Vec<SyncEvent> {
        out.server.push(self.browse_object(ROOT_ID));
        self.root_seq = self.send_children(ROOT_ID, Purpose::Load, out);
        self.root.children = Some(vec![queue_entry(&self.playqueue)]);
        self.root_load = LoadState::Loading {
            received: 1,
            declared: self.root.num_children().map(|n| n.max(0) as usize),
        };
        match self.displayed {
            Some(Slot::Root) => vec![SyncEvent::ContainerShown {
                id: ROOT_ID.to_string(),
            }],
            _ => Vec::new(),
        }
    }

    /// The player link came up (or went away).  The mirror is rebuilt from
    /// a fresh browse.
    pub fn set_player_ready(&mut self, ready: bool, out: &mut Outbox) -> Vec<SyncEvent> {
        self.player_ready = ready;
        self.playqueue.children = None;
        self.playqueue_load = LoadState::Unloaded;
        if ready {
            out.player.push(self.browse_object(PLAYQUEUE_ID));
            out.player.push(self.browse_children(PLAYQUEUE_ID));
            self.playqueue_load = LoadState::Loading {
                received: 0,
                declared: None,
            };
        }
        let mut events = vec![SyncEvent::PlayqueueChanged];
        if matches!(self.displayed, Some(Slot::Playqueue)) {
            events.push(SyncEvent::ContainerShown {
                id: PLAYQUEUE_ID.to_string(),
            });
        }
        events
    }

    // ── Display ───────────────────────────────────────────────────────────────

    /// Make `id` the displayed container.
    pub fn show(&mut self, id: &str, out: &mut Outbox) -> Vec<SyncEvent> {
        if self.reconcile.as_ref().is_some_and(|r| r.container != id) {
            debug!("dropping ancestor check, display moved to {}", id);
            self.reconcile = None;
        }
        self.pending = None;

        if self.container_id() == Some(id) {
            let mut events = vec![SyncEvent::ContainerShown { id: id.to_string() }];
            if self.load_state() == LoadState::Loaded {
                events.push(SyncEvent::Loaded { id: id.to_string() });
            }
            return events;
        }

        if id == ROOT_ID {
            self.displayed = Some(Slot::Root);
            let mut events = vec![SyncEvent::ContainerShown { id: id.to_string() }];
            if self.root_load == LoadState::Loaded {
                events.push(SyncEvent::Loaded { id: id.to_string() });
            }
            return events;
        }

        if id == PLAYQUEUE_ID {
            self.displayed = Some(Slot::Playqueue);
            let mut events = vec![SyncEvent::ContainerShown { id: id.to_string() }];
            match self.playqueue_load {
                LoadState::Loaded => events.push(SyncEvent::Loaded { id: id.to_string() }),
                LoadState::Unloaded if self.player_ready => {
                    out.player.push(self.browse_children(PLAYQUEUE_ID));
                    self.playqueue_load = LoadState::Loading {
                        received: 0,
                        declared: None,
                    };
                }
                _ => {}
            }
            return events;
        }

        let cached = self
            .container()
            .and_then(|c| c.child_by_id(id))
            .filter(|c| c.class().is_container())
            .cloned();
        if let Some(node) = cached {
            return self.install(node, out);
        }

        self.displayed = None;
        self.pending = Some(id.to_string());
        out.server.push(self.browse_object(id));
        vec![SyncEvent::ContainerPending { id: id.to_string() }]
    }

    fn install(&mut self, mut node: ObjectNode, out: &mut Outbox) -> Vec<SyncEvent> {
        let Some(id) = node.id().map(str::to_string) else {
            warn!("browse answer without an id");
            return Vec::new();
        };
        node.children = None;
        let declared = node.num_children().map(|n| n.max(0) as usize);
        self.displayed = Some(Slot::Node {
            node,
            load: LoadState::Loading {
                received: 0,
                declared,
            },
        });
        self.node_seq = self.send_children(&id, Purpose::Load, out);
        vec![SyncEvent::ContainerShown { id }]
    }

    /// Fetch one object for a viewer.  Known objects answer immediately.
    pub fn request_object(&mut self, id: &str, out: &mut Outbox) -> Vec<SyncEvent> {
        if let Some(node) = self.lookup(id) {
            return vec![SyncEvent::ObjectFetched(node.clone())];
        }
        if !self.fetches.iter().any(|f| f == id) {
            self.fetches.push(id.to_string());
            out.server.push(self.browse_object(id));
        }
        Vec::new()
    }

    // ── Inbound ───────────────────────────────────────────────────────────────

    /// Database message from the server.
    pub fn handle_server(&mut self, msg: &Message, out: &mut Outbox) -> Vec<SyncEvent> {
        let Some(payload) = decode(msg) else {
            return Vec::new();
        };
        let ctx = msg.context_id().unwrap_or_default().to_string();
        match payload {
            Payload::BrowseObjectResponse(obj) => self.on_object(&ctx, obj, out),
            Payload::BrowseChildrenResponse(s) => self.on_children(&ctx, s, msg.is_last(), out),
            Payload::SpliceChildren(_) if ctx.is_empty() => {
                debug!("sync: splice notification without a context id dropped");
                Vec::new()
            }
            Payload::SpliceChildren(s) => self.on_splice(&ctx, s, out),
            Payload::ObjectChanged(obj) => self.on_object_changed(&ctx, &obj),
            Payload::RescanDone => self.on_rescan(out),
            other => {
                debug!("sync: ignoring {:?} from server", other.kind());
                Vec::new()
            }
        }
    }

    /// Playqueue message from the player.
    pub fn handle_player(&mut self, msg: &Message) -> Vec<SyncEvent> {
        let ctx = msg.context_id().unwrap_or_default().to_string();
        if ctx != PLAYQUEUE_ID && parent_id(&ctx) != Some(PLAYQUEUE_ID) {
            return Vec::new();
        }
        let Some(payload) = decode(msg) else {
            return Vec::new();
        };
        match payload {
            Payload::BrowseObjectResponse(Some(obj)) if ctx == PLAYQUEUE_ID => {
                let node = ObjectNode::from_dict(&obj);
                self.playqueue.metadata = node.metadata;
                self.playqueue.set_id(PLAYQUEUE_ID);
                self.queue_header_events()
            }
            Payload::BrowseChildrenResponse(s) if ctx == PLAYQUEUE_ID => {
                self.apply(Target::Playqueue, s, Some(msg.is_last()))
            }
            Payload::SpliceChildren(s) if ctx == PLAYQUEUE_ID => {
                if self.playqueue_load != LoadState::Loaded {
                    debug!("queue splice before the queue was browsed, dropped");
                    return Vec::new();
                }
                self.apply(Target::Playqueue, s, None)
            }
            Payload::ObjectChanged(obj) if ctx == PLAYQUEUE_ID => {
                self.playqueue.merge(&obj);
                self.queue_header_events()
            }
            Payload::ObjectChanged(obj) => match self.playqueue.child_by_id_mut(&ctx) {
                Some(track) => {
                    track.merge(&obj);
                    let mut events = vec![SyncEvent::PlayqueueChanged];
                    if matches!(self.displayed, Some(Slot::Playqueue)) {
                        events.push(SyncEvent::RowChanged { id: ctx });
                    }
                    events
                }
                None => Vec::new(),
            },
            other => {
                debug!("sync: ignoring {:?} from player", other.kind());
                Vec::new()
            }
        }
    }

    fn queue_header_events(&mut self) -> Vec<SyncEvent> {
        if let Some(entry) = self.root.child_by_id_mut(PLAYQUEUE_ID) {
            entry.metadata = self.playqueue.metadata.clone();
        }
        let mut events = vec![SyncEvent::PlayqueueChanged];
        match self.displayed {
            Some(Slot::Playqueue) => events.push(SyncEvent::HeaderChanged),
            Some(Slot::Root) => events.push(SyncEvent::RowChanged {
                id: PLAYQUEUE_ID.to_string(),
            }),
            _ => {}
        }
        events
    }

    fn on_object(&mut self, ctx: &str, obj: Option<Dict>, out: &mut Outbox) -> Vec<SyncEvent> {
        if ctx == ROOT_ID {
            if let Some(obj) = obj {
                let node = ObjectNode::from_dict(&obj);
                self.root.metadata = node.metadata;
                self.root.set_id(ROOT_ID);
                self.bump_root_count();
            }
            self.root_object_loaded = true;
            let mut events = Vec::new();
            if matches!(self.displayed, Some(Slot::Root)) {
                events.push(SyncEvent::HeaderChanged);
            }
            events.extend(self.announce_root());
            return events;
        }

        if self.pending.as_deref() == Some(ctx) {
            self.pending = None;
            return match obj {
                Some(obj) => self.install(ObjectNode::from_dict(&obj), out),
                None => {
                    info!(target: "mediatree::ui", "{} could not be found", ctx);
                    if self.container_id() == Some(ctx) {
                        self.displayed = None;
                    }
                    vec![SyncEvent::BrowseFailed { id: ctx.to_string() }]
                }
            };
        }

        if let Some(pos) = self.fetches.iter().position(|f| f == ctx) {
            self.fetches.remove(pos);
            return match obj {
                Some(obj) => vec![SyncEvent::ObjectFetched(ObjectNode::from_dict(&obj))],
                None => vec![SyncEvent::FetchFailed { id: ctx.to_string() }],
            };
        }

        debug!("stale browse-object answer for {}", ctx);
        Vec::new()
    }

    fn on_children(
        &mut self,
        ctx: &str,
        s: Splice,
        last: bool,
        out: &mut Outbox,
    ) -> Vec<SyncEvent> {
        let Some(pos) = self.in_flight.iter().position(|b| b.ctx == ctx) else {
            debug!("unrequested browse-children chunk for {}", ctx);
            return Vec::new();
        };
        let (purpose, seq) = (self.in_flight[pos].purpose, self.in_flight[pos].seq);
        if last {
            self.in_flight.remove(pos);
        }
        match purpose {
            Purpose::Check if self.reconcile.as_ref().is_some_and(|r| r.seq == seq) => {
                self.reconcile_chunk(&s, last, out)
            }
            Purpose::Check => {
                debug!("answer of an abandoned check of {} discarded", ctx);
                Vec::new()
            }
            Purpose::Load if ctx == ROOT_ID && seq == self.root_seq => {
                self.apply(Target::Root, s, Some(last))
            }
            Purpose::Load if self.node_id() == Some(ctx) && seq == self.node_seq => {
                self.apply(Target::Node, s, Some(last))
            }
            Purpose::Load => {
                debug!("stale browse-children chunk for {}", ctx);
                Vec::new()
            }
        }
    }

    fn on_splice(&mut self, ctx: &str, s: Splice, out: &mut Outbox) -> Vec<SyncEvent> {
        let deletes = s.delete != 0;
        let mut events = Vec::new();
        if ctx == ROOT_ID {
            events.extend(self.apply(Target::Root, s, None));
        } else if self.node_id() == Some(ctx) {
            events.extend(self.apply(Target::Node, s, None));
        }
        if deletes {
            if let Some(container) = self.node_id().map(str::to_string) {
                if is_ancestor(ctx, &container) {
                    self.start_reconcile(ctx, container, out);
                }
            }
        }
        events
    }

    fn on_object_changed(&mut self, ctx: &str, obj: &Dict) -> Vec<SyncEvent> {
        let mut events = Vec::new();
        let root_shown = matches!(self.displayed, Some(Slot::Root));
        if ctx == ROOT_ID {
            self.root.merge(obj);
            if obj
                .get_dict(meta::METADATA)
                .is_some_and(|m| m.contains(meta::NUM_CHILDREN))
            {
                self.bump_root_count();
            }
            if root_shown {
                events.push(SyncEvent::HeaderChanged);
            }
        } else if parent_id(ctx) == Some(ROOT_ID) {
            if let Some(child) = self.root.child_by_id_mut(ctx) {
                child.merge(obj);
                if root_shown {
                    events.push(SyncEvent::RowChanged { id: ctx.to_string() });
                }
            }
        }

        if let Some(Slot::Node { node, .. }) = self.displayed.as_mut() {
            if node.id() == Some(ctx) {
                node.merge(obj);
                events.push(SyncEvent::HeaderChanged);
            } else if parent_id(ctx).is_some_and(|p| node.id() == Some(p)) {
                if let Some(child) = node.child_by_id_mut(ctx) {
                    child.merge(obj);
                    events.push(SyncEvent::RowChanged { id: ctx.to_string() });
                }
            }
        }
        events
    }

    fn on_rescan(&mut self, out: &mut Outbox) -> Vec<SyncEvent> {
        info!(target: "mediatree::ui", "library rescan finished");
        self.root_announced = false;
        let mut events = self.refresh_root(out);
        let id = match self.displayed.as_mut() {
            Some(Slot::Node { node, load }) => {
                node.children = None;
                *load = LoadState::Loading {
                    received: 0,
                    declared: node.num_children().map(|n| n.max(0) as usize),
                };
                node.id().map(str::to_string)
            }
            _ => None,
        };
        if let Some(id) = id {
            self.node_seq = self.send_children(&id, Purpose::Load, out);
            events.push(SyncEvent::ContainerShown { id });
        }
        events
    }

    // ── Splice application ────────────────────────────────────────────────────

    fn node_id(&self) -> Option<&str> {
        match self.displayed.as_ref()? {
            Slot::Node { node, .. } => node.id(),
            _ => None,
        }
    }

    fn is_displayed(&self, target: Target) -> bool {
        matches!(
            (target, &self.displayed),
            (Target::Root, Some(Slot::Root))
                | (Target::Playqueue, Some(Slot::Playqueue))
                | (Target::Node, Some(Slot::Node { .. }))
        )
    }

    fn target_mut(&mut self, target: Target) -> Option<(&mut ObjectNode, &mut LoadState)> {
        match target {
            Target::Root => Some((&mut self.root, &mut self.root_load)),
            Target::Playqueue => Some((&mut self.playqueue, &mut self.playqueue_load)),
            Target::Node => match self.displayed.as_mut()? {
                Slot::Node { node, load } => Some((node, load)),
                _ => None,
            },
        }
    }

    /// Apply one splice.  `last` is `Some` for browse answers (which move
    /// the load state) and `None` for notifications.
    fn apply(&mut self, target: Target, s: Splice, last: Option<bool>) -> Vec<SyncEvent> {
        let displayed = self.is_displayed(target);
        // The playqueue entry occupies root index 0.
        let index = match target {
            Target::Root if s.index >= 0 => s.index + 1,
            _ => s.index,
        };
        let items: Vec<ObjectNode> = s.items.iter().map(ObjectNode::from_dict).collect();

        let Some((node, load)) = self.target_mut(target) else {
            return Vec::new();
        };
        let range: SpliceRange = match node.splice(index, s.delete, items) {
            Ok(r) => r,
            Err(e) => {
                debug!("inconsistent splice for {:?}: {}", node.id(), e);
                return Vec::new();
            }
        };
        let id = node.id().unwrap_or_default().to_string();
        match last {
            Some(true) => *load = LoadState::Loaded,
            Some(false) => {
                *load = LoadState::Loading {
                    received: node.children().len(),
                    declared: node.num_children().map(|n| n.max(0) as usize),
                }
            }
            None => {}
        }
        let progress = load.progress();

        let mut events = Vec::new();
        if displayed {
            events.push(SyncEvent::RowsSpliced {
                index: range.index,
                deleted: range.deleted,
                inserted: range.inserted,
            });
            match last {
                Some(false) => events.push(SyncEvent::Progress(progress)),
                Some(true) => {
                    events.push(SyncEvent::Progress(None));
                    events.push(SyncEvent::Loaded { id });
                }
                None => {}
            }
        }
        match target {
            Target::Root if last == Some(true) => events.extend(self.announce_root()),
            Target::Playqueue => events.push(SyncEvent::PlayqueueChanged),
            _ => {}
        }
        events
    }

    fn announce_root(&mut self) -> Option<SyncEvent> {
        if self.root_loaded() && !self.root_announced {
            self.root_announced = true;
            Some(SyncEvent::RootLoaded)
        } else {
            None
        }
    }

    /// The server counts root children without the playqueue entry.
    fn bump_root_count(&mut self) {
        if let Some(n) = self.root.num_children() {
            self.root.metadata.set(meta::NUM_CHILDREN, n + 1);
        }
    }

    // ── Reconciliation ────────────────────────────────────────────────────────

    fn start_reconcile(&mut self, ancestor: &str, container: String, out: &mut Outbox) {
        if let Some(r) = self.reconcile.as_mut() {
            if r.ancestor == ancestor {
                debug!("ancestor check of {} rescheduled", ancestor);
                r.rerun = true;
                r.container = container;
                return;
            }
        }
        debug!("checking whether {} survived a deletion in {}", container, ancestor);
        let seq = self.send_children(ancestor, Purpose::Check, out);
        self.reconcile = Some(Reconciliation {
            ancestor: ancestor.to_string(),
            container,
            found: false,
            rerun: false,
            seq,
        });
    }

    fn reconcile_chunk(&mut self, s: &Splice, last: bool, out: &mut Outbox) -> Vec<SyncEvent> {
        let Some(r) = self.reconcile.as_mut() else {
            return Vec::new();
        };
        if !r.rerun && !r.found {
            r.found = s.items.iter().filter_map(item_id).any(|id| {
                id == r.container || is_ancestor(id, &r.container)
            });
        }
        if !last {
            return Vec::new();
        }
        if r.rerun {
            r.rerun = false;
            r.found = false;
            let ancestor = r.ancestor.clone();
            let seq = self.send_children(&ancestor, Purpose::Check, out);
            if let Some(r) = self.reconcile.as_mut() {
                r.seq = seq;
            }
            return Vec::new();
        }
        let Some(r) = self.reconcile.take() else {
            return Vec::new();
        };
        if r.found {
            debug!("{} still present under {}", r.container, r.ancestor);
            return Vec::new();
        }
        info!(target: "mediatree::ui", "{} was removed, going up to {}", r.container, r.ancestor);
        self.displayed = None;
        vec![SyncEvent::AncestorDeleted {
            ancestor: r.ancestor,
        }]
    }
}

/// Metadata-only copy of the queue for the root listing.
fn queue_entry(playqueue: &ObjectNode) -> ObjectNode {
    ObjectNode {
        metadata: playqueue.metadata.clone(),
        children: None,
    }
}

/// Id of a wire item, `{metadata: {ID}}` or bare metadata.
fn item_id(item: &Dict) -> Option<&str> {
    item.get_dict(meta::METADATA)
        .and_then(|m| m.get_str(meta::ID))
        .or_else(|| item.get_str(meta::ID))
}

fn decode(msg: &Message) -> Option<Payload> {
    match msg.payload() {
        Ok(p) => Some(p),
        Err(e @ ProtoError::UnknownKind { .. }) => {
            debug!("sync: {}", e);
            None
        }
        Err(e) => {
            warn!("sync: dropping malformed message: {}", e);
            None
        }
    }
}
