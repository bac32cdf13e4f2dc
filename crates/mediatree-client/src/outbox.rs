//! Outbound message queues.
//!
//! Core components never touch a socket.  They push into an [`Outbox`] and
//! the application flushes it to whatever [`MessageSink`] currently stands
//! behind each peer.

use mediatree_proto::Message;

/// Something that accepts outbound messages.
pub trait MessageSink {
    fn send(&mut self, msg: Message);
}

impl MessageSink for Vec<Message> {
    fn send(&mut self, msg: Message) {
        self.push(msg);
    }
}

/// Messages produced by one step, split by destination.
#[derive(Debug, Default)]
pub struct Outbox {
    pub server: Vec<Message>,
    pub player: Vec<Message>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.server.is_empty() && self.player.is_empty()
    }

    /// Move everything into the sinks, server queue first.
    pub fn flush(&mut self, server: &mut dyn MessageSink, player: &mut dyn MessageSink) {
        for msg in self.server.drain(..) {
            server.send(msg);
        }
        for msg in self.player.drain(..) {
            player.send(msg);
        }
    }
}
