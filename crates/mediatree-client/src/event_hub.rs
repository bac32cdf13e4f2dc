//! EventHub: ordered subscriber list with stop-on-consume fan-out.
//!
//! Subscribers are small `Copy` ids rather than callbacks, so the owner of the
//! hub keeps `&mut` access to everything a handler touches.  The newest
//! subscriber goes first: the widget shown last sees keys before the ones
//! underneath it.
//!
//! ```text
//!  connect(c)   →  [c, b, a]
//!  fire(key)    →  c: Continue → b: Consumed → (a never sees it)
//! ```

/// What a subscriber did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Consumed,
}

pub struct EventHub<K> {
    subscribers: Vec<K>,
}

impl<K: Copy + PartialEq> EventHub<K> {
    pub fn new() -> Self {
        Self {
            subscribers: Vec::new(),
        }
    }

    /// Subscribe `id` at the front.  A second connect moves it to the front
    /// instead of registering it twice.
    pub fn connect(&mut self, id: K) {
        self.disconnect(id);
        self.subscribers.insert(0, id);
    }

    pub fn disconnect(&mut self, id: K) {
        self.subscribers.retain(|&s| s != id);
    }

    pub fn is_connected(&self, id: K) -> bool {
        self.subscribers.contains(&id)
    }

    pub fn subscribers(&self) -> &[K] {
        &self.subscribers
    }

    /// Copy of the current order.  Handlers may connect or disconnect while
    /// an event is in flight; the snapshot decides who sees this one.
    pub fn snapshot(&self) -> Vec<K> {
        self.subscribers.clone()
    }

    /// Offer the event to each id in `order` until one consumes it.
    pub fn fire(order: &[K], mut handler: impl FnMut(K) -> Flow) -> Flow {
        for &id in order {
            if handler(id) == Flow::Consumed {
                return Flow::Consumed;
            }
        }
        Flow::Continue
    }
}

impl<K: Copy + PartialEq> Default for EventHub<K> {
    fn default() -> Self {
        Self::new()
    }
}
