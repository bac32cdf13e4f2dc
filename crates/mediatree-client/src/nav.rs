//! Navigator: the navigation state machine.
//!
//! Every transition edits the [`HistoryStack`] (push, replace or cursor move)
//! and then runs [`Navigator::apply`], the only place that talks to the
//! outside world:
//!
//! ```text
//!  jump_to / change_up / go / show_* / replace_*
//!        │  edit history
//!        ▼
//!  apply ──► hide old widget / show new widget
//!        ──► load container        (container or widget changed)
//!        ──► validate selection    (deferred while the container loads)
//!        ──► update token
//! ```
//!
//! The transient overlay (nav popup, menu) is owned here too and only ever
//! opened or closed through `apply`.  Back with an overlay open closes the
//! overlay and leaves history alone.

use mediatree_proto::tree::parent_id;
use mediatree_proto::ROOT_ID;
use tracing::{debug, info};

use crate::history::{HistoryStack, NavState, Widget};
use crate::token;

/// Load state of a container as far as navigation cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerStatus {
    /// Not displayed and not requested.
    Unknown,
    Loading,
    Loaded,
}

/// Transient layers drawn over the active widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overlay {
    NavPopup,
    Menu,
}

/// What a back request did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackOutcome {
    OverlayClosed,
    Moved,
    /// Nothing to go back to; the platform may leave the application.
    AtStart,
}

/// Side effects of applying a state.
pub trait NavigationHost {
    fn show_widget(&mut self, widget: Widget, state: &NavState);
    fn hide_widget(&mut self, widget: Widget);
    fn load_container(&mut self, id: &str);
    fn container_status(&self, id: &str) -> ContainerStatus;
    fn has_child(&self, container: &str, id: &str) -> bool;
    fn select(&mut self, id: Option<&str>);
    fn show_overlay(&mut self, overlay: Overlay);
    fn hide_overlay(&mut self, overlay: Overlay);
    fn update_token(&mut self, token: &str);
}

enum OverlayChange {
    Keep,
    Open(Overlay),
    Close,
}

pub struct Navigator {
    history: HistoryStack,
    last_applied: Option<NavState>,
    overlay: Option<Overlay>,
    /// Selection waits for the container to finish loading.
    selection_pending: bool,
}

impl Navigator {
    pub fn new(initial: NavState) -> Self {
        Self {
            history: HistoryStack::new(initial),
            last_applied: None,
            overlay: None,
            selection_pending: false,
        }
    }

    pub fn state(&self) -> &NavState {
        self.history.current()
    }

    pub fn history(&self) -> &HistoryStack {
        &self.history
    }

    pub fn overlay(&self) -> Option<Overlay> {
        self.overlay
    }

    pub fn selection_pending(&self) -> bool {
        self.selection_pending
    }

    // ── Funnel ────────────────────────────────────────────────────────────────

    pub fn apply(&mut self, host: &mut dyn NavigationHost) {
        self.apply_with(host, OverlayChange::Keep);
    }

    fn apply_with(&mut self, host: &mut dyn NavigationHost, overlay: OverlayChange) {
        match overlay {
            OverlayChange::Keep => {}
            OverlayChange::Open(o) => {
                if self.overlay != Some(o) {
                    if let Some(old) = self.overlay.take() {
                        host.hide_overlay(old);
                    }
                    host.show_overlay(o);
                    self.overlay = Some(o);
                }
            }
            OverlayChange::Close => {
                if let Some(old) = self.overlay.take() {
                    host.hide_overlay(old);
                }
            }
        }

        let state = self.history.current().clone();
        let prev = self.last_applied.take();
        let widget_changed = prev.as_ref().map_or(true, |p| p.widget != state.widget);
        let container_changed = prev
            .as_ref()
            .map_or(true, |p| p.container_id != state.container_id);

        if widget_changed {
            if let Some(p) = &prev {
                host.hide_widget(p.widget);
            }
        }
        if widget_changed || container_changed {
            debug!("loading container {}", state.container_id);
            host.load_container(&state.container_id);
        }
        host.show_widget(state.widget, &state);

        self.validate_selection(host);
        let state = self.history.current().clone();
        host.update_token(&token::encode(&state));
        self.last_applied = Some(state);
    }

    /// Select the stored selection if the container has it, clear it if the
    /// loaded container does not, wait if the container is still loading.
    fn validate_selection(&mut self, host: &mut dyn NavigationHost) {
        let state = self.history.current();
        let Some(sel) = state.selection_id.clone() else {
            self.selection_pending = false;
            host.select(None);
            return;
        };
        match host.container_status(&state.container_id) {
            ContainerStatus::Loaded => {
                self.selection_pending = false;
                if host.has_child(&state.container_id, &sel) {
                    host.select(Some(&sel));
                } else {
                    info!(
                        target: "mediatree::ui",
                        "{} is no longer in {}, clearing selection", sel, state.container_id
                    );
                    let cleared = state.clone().with_selection(None);
                    self.history.replace(cleared);
                    host.select(None);
                }
            }
            ContainerStatus::Loading | ContainerStatus::Unknown => {
                self.selection_pending = true;
            }
        }
    }

    // ── Container feedback ────────────────────────────────────────────────────

    /// The container `id` finished loading (or changed while displayed).
    pub fn container_updated(&mut self, host: &mut dyn NavigationHost, id: &str) {
        if self.state().container_id != id {
            return;
        }
        let before = self.state().selection_id.clone();
        self.validate_selection(host);
        if self.state().selection_id != before {
            let state = self.history.current().clone();
            host.update_token(&token::encode(&state));
            self.last_applied = Some(state);
        }
    }

    /// The server could not resolve `id`: show its parent instead.
    pub fn container_missing(&mut self, host: &mut dyn NavigationHost, id: &str) {
        if self.state().container_id != id {
            return;
        }
        let parent = parent_id(id).unwrap_or(ROOT_ID).to_string();
        info!(target: "mediatree::ui", "{} not found, showing {}", id, parent);
        self.fall_back(host, &parent);
    }

    /// Show `id` in place of the current entry.
    pub fn fall_back(&mut self, host: &mut dyn NavigationHost, id: &str) {
        self.history.replace(NavState::browse(id));
        self.apply(host);
    }

    // ── Transitions ───────────────────────────────────────────────────────────

    /// Browse `id`.  Pushes unless `id` is already the current container, in
    /// which case only the selection (if given) and widget change.
    pub fn jump_to(&mut self, host: &mut dyn NavigationHost, id: &str, select: Option<&str>) {
        let cur = self.history.current();
        if cur.container_id == id {
            let mut state = cur.clone();
            state.widget = Widget::Browser;
            state.info_id = None;
            if select.is_some() {
                state.selection_id = select.map(str::to_string);
            }
            self.history.replace(state);
        } else {
            self.history.push(NavState::browse(id).with_selection(select));
        }
        self.apply(host);
    }

    /// Go to the parent container with the current one selected.  Steps back
    /// instead when the previous entry already shows the parent.
    pub fn change_up(&mut self, host: &mut dyn NavigationHost) {
        let cur = self.history.current().container_id.clone();
        let Some(parent) = parent_id(&cur) else {
            return;
        };
        let back_is_parent = self
            .history
            .peek(-1)
            .is_some_and(|p| p.container_id == parent && p.widget == Widget::Browser);
        if back_is_parent {
            self.go(host, -1);
        } else {
            let parent = parent.to_string();
            self.jump_to(host, &parent, Some(&cur));
        }
    }

    /// Move through history by `delta`, clamped.  Always re-applies.
    pub fn go(&mut self, host: &mut dyn NavigationHost, delta: isize) -> isize {
        let moved = self.history.go(delta);
        self.apply(host);
        moved
    }

    /// Back request: close the overlay first, then move history.
    pub fn back(&mut self, host: &mut dyn NavigationHost) -> BackOutcome {
        if self.overlay.is_some() {
            self.apply_with(host, OverlayChange::Close);
            return BackOutcome::OverlayClosed;
        }
        if !self.history.can_go_back() {
            return BackOutcome::AtStart;
        }
        self.go(host, -1);
        BackOutcome::Moved
    }

    /// Platform back/forward trigger.  Negative deltas behave like
    /// [`Navigator::back`], zero refreshes the token.
    pub fn platform_pop(&mut self, host: &mut dyn NavigationHost, delta: isize) -> BackOutcome {
        match delta {
            d if d < 0 => self.back(host),
            0 => {
                self.apply(host);
                BackOutcome::Moved
            }
            d => {
                self.go(host, d);
                BackOutcome::Moved
            }
        }
    }

    /// Change the selection in place.
    pub fn select(&mut self, host: &mut dyn NavigationHost, id: Option<&str>) {
        if self.state().selection_id.as_deref() == id {
            return;
        }
        let state = self.state().clone().with_selection(id);
        self.history.replace(state);
        self.apply(host);
    }

    /// Open a full-screen widget on top of the current container.
    pub fn show_widget(&mut self, host: &mut dyn NavigationHost, widget: Widget) {
        if self.state().widget == widget {
            return;
        }
        let mut state = self.state().clone();
        state.widget = widget;
        self.history.push(state);
        self.apply(host);
    }

    /// Leave a non-browser widget: back when there is somewhere to go back
    /// to, otherwise turn the current entry into the browser.
    pub fn close_widget(&mut self, host: &mut dyn NavigationHost) {
        if self.state().widget == Widget::Browser {
            return;
        }
        if self.history.can_go_back() {
            self.go(host, -1);
        } else {
            let mut state = self.state().clone();
            state.widget = Widget::Browser;
            state.info_id = None;
            state.image_id = None;
            self.history.replace(state);
            self.apply(host);
        }
    }

    pub fn show_info(&mut self, host: &mut dyn NavigationHost, id: &str) {
        let mut state = self.state().clone().with_selection(Some(id));
        state.widget = Widget::ItemInfo;
        state.info_id = Some(id.to_string());
        self.history.push(state);
        self.apply(host);
    }

    /// Step the info widget to another object without a history entry.
    pub fn replace_info(&mut self, host: &mut dyn NavigationHost, id: &str) {
        let mut state = self.state().clone().with_selection(Some(id));
        state.info_id = Some(id.to_string());
        self.history.replace(state);
        self.apply(host);
    }

    pub fn show_image(&mut self, host: &mut dyn NavigationHost, id: &str) {
        let mut state = self.state().clone().with_selection(Some(id));
        state.widget = Widget::ImageViewer;
        state.image_id = Some(id.to_string());
        self.history.push(state);
        self.apply(host);
    }

    pub fn replace_image(&mut self, host: &mut dyn NavigationHost, id: &str) {
        let mut state = self.state().clone().with_selection(Some(id));
        state.image_id = Some(id.to_string());
        self.history.replace(state);
        self.apply(host);
    }

    pub fn open_overlay(&mut self, host: &mut dyn NavigationHost, overlay: Overlay) {
        self.apply_with(host, OverlayChange::Open(overlay));
    }

    pub fn close_overlay(&mut self, host: &mut dyn NavigationHost) {
        if self.overlay.is_some() {
            self.apply_with(host, OverlayChange::Close);
        }
    }
}
