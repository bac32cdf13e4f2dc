//! Inbound routing: `(source, namespace, id)` → handler.
//!
//! ```text
//!  server  DB responses / notifications  → Tree        (SyncClient)
//!          stateChanged                  → ServerState (renderer discovery)
//!          swipe                         → Gesture     (active widget)
//!  player  DB responses / notifications  → Queue       (playqueue mirror)
//!          stateChanged                  → PlayerState (player widgets)
//! ```
//!
//! Commands arriving from the wrong side are dropped.

use mediatree_proto::{Message, MessageKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Server,
    Player,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Tree,
    ServerState,
    Gesture,
    Queue,
    PlayerState,
    Drop,
}

pub fn route(source: Source, msg: &Message) -> Route {
    let Some(kind) = msg.kind() else {
        return Route::Drop;
    };
    match (source, kind) {
        (
            Source::Server,
            MessageKind::BrowseObjectResponse
            | MessageKind::BrowseChildrenResponse
            | MessageKind::SpliceChildren
            | MessageKind::ObjectChanged
            | MessageKind::RescanDone,
        ) => Route::Tree,
        (Source::Server, MessageKind::StateChanged) => Route::ServerState,
        (Source::Server, MessageKind::Swipe) => Route::Gesture,
        (
            Source::Player,
            MessageKind::BrowseObjectResponse
            | MessageKind::BrowseChildrenResponse
            | MessageKind::SpliceChildren
            | MessageKind::ObjectChanged,
        ) => Route::Queue,
        (Source::Player, MessageKind::StateChanged) => Route::PlayerState,
        _ => Route::Drop,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_kind_has_a_route() {
        for kind in MessageKind::ALL {
            let msg = kind.message();
            let server = route(Source::Server, &msg);
            let player = route(Source::Player, &msg);
            match kind {
                MessageKind::SpliceChildren | MessageKind::ObjectChanged => {
                    assert_eq!(server, Route::Tree);
                    assert_eq!(player, Route::Queue);
                }
                MessageKind::StateChanged => {
                    assert_eq!(server, Route::ServerState);
                    assert_eq!(player, Route::PlayerState);
                }
                MessageKind::Play | MessageKind::SetState | MessageKind::BrowseObject => {
                    assert_eq!(server, Route::Drop);
                    assert_eq!(player, Route::Drop);
                }
                _ => {}
            }
        }
    }

    #[test]
    fn test_unknown_pair_dropped() {
        let msg = Message::new(999, 999);
        assert_eq!(route(Source::Server, &msg), Route::Drop);
    }

    #[test]
    fn test_rescan_only_from_server() {
        let msg = MessageKind::RescanDone.message();
        assert_eq!(route(Source::Server, &msg), Route::Tree);
        assert_eq!(route(Source::Player, &msg), Route::Drop);
    }
}
