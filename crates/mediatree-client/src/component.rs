//! Component trait: the interface every widget implements.
//!
//! Design principles:
//! - Components are self-contained: they own their view state and render themselves.
//! - Components receive `AppState` (read-only) for data they don't own.
//! - Components produce `Vec<Action>`; they never mutate shared state directly.
//! - Shown/hidden is driven by the navigator through the App; a hidden
//!   component still sees sync and player events so it is current when shown.

use std::time::Instant;

use mediatree_proto::SwipeDirection;
use ratatui::{layout::Rect, Frame};

use crate::action::{Action, Key};
use crate::app_state::AppState;
use crate::event_hub::Flow;
use crate::history::{NavState, Widget};
use crate::player_state::PlayerChange;
use crate::sync::SyncEvent;

pub trait Component {
    fn id(&self) -> Widget;

    /// Became the active widget for `nav`.  Called again with a new state
    /// when only the selection or the viewed object changed.
    fn show(&mut self, _nav: &NavState, _state: &AppState) -> Vec<Action> {
        Vec::new()
    }

    fn hide(&mut self) {}

    /// Handle a key while this component is subscribed.  `Flow::Consumed`
    /// stops later subscribers and the global bindings.
    fn handle_key(&mut self, key: Key, state: &AppState) -> (Flow, Vec<Action>);

    /// Swipe gesture forwarded from the server.
    fn handle_swipe(&mut self, _direction: SwipeDirection, _state: &AppState) -> Vec<Action> {
        Vec::new()
    }

    fn on_sync(&mut self, _event: &SyncEvent, _state: &AppState) -> Vec<Action> {
        Vec::new()
    }

    fn on_player(&mut self, _change: PlayerChange, _state: &AppState) {}

    /// Apply the navigator's selection.
    fn select(&mut self, _id: Option<&str>, _state: &AppState) {}

    /// Called each tick (~100ms). For idle timers.
    fn tick(&mut self, _now: Instant, _state: &AppState) -> Vec<Action> {
        Vec::new()
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, state: &AppState);
}
