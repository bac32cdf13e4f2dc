//! End-to-end sessions through `App`: a scripted server on one side, the
//! in-process player on the other, keys in between.

mod common;

use std::time::{Duration, Instant};

use common::{children_response, container, object_response, requests, splice_notification, track};
use mediatree_client::action::{Key, KeyCode};
use mediatree_client::app::App;
use mediatree_client::dispatch::Source;
use mediatree_client::connection::TransportEvent;
use mediatree_client::history::Widget;
use mediatree_client::player_state::PlayerStatus;
use mediatree_proto::config::Config;
use mediatree_proto::{Message, MessageKind, Payload};

fn server(app: &mut App, msg: Message) {
    app.handle_transport(Source::Server, TransportEvent::Message(msg));
}

/// Connect and answer the root browse.
fn connected(token: &str) -> App {
    let mut app = App::new(Config::default(), token);
    app.start();
    app.handle_transport(Source::Server, TransportEvent::Open);
    server(&mut app, object_response("/", Some(container("/", 1))));
    server(&mut app, children_response("/", vec![container("/a", 2)], true));
    app
}

#[test]
fn test_restored_selection_plays_album_on_enter() {
    let mut app = connected("#cntid=%2Fa;selid=%2Fa%2Ft1");
    let out = app.take_outgoing();
    assert!(requests(&out.server, MessageKind::BrowseObject).contains(&"/a".to_string()));

    server(&mut app, object_response("/a", Some(container("/a", 2))));
    let out = app.take_outgoing();
    assert_eq!(requests(&out.server, MessageKind::BrowseChildren), vec!["/a"]);
    server(
        &mut app,
        children_response("/a", vec![track("/a/t1", 1_000_000), track("/a/t2", 1_000_000)], true),
    );
    assert_eq!(app.navigator().state().selection_id.as_deref(), Some("/a/t1"));
    assert_eq!(app.token(), "#cntid=%2Fa;selid=%2Fa%2Ft1");

    app.handle_key(Key::plain(KeyCode::Enter));
    assert_eq!(app.state().player.status, PlayerStatus::Playing);
    assert_eq!(app.state().sync.playqueue().children().len(), 2);
    assert_eq!(app.state().current_track_id(), Some("/playqueue/_a_t1"));
    // the in-process player never goes through a link
    assert!(app.take_outgoing().player.is_empty());

    let t0 = Instant::now();
    app.tick(t0);
    app.tick(t0 + Duration::from_millis(1500));
    assert_eq!(app.state().current_track_id(), Some("/playqueue/_a_t2"));
}

#[test]
fn test_deleted_ancestor_sends_navigation_up() {
    let mut app = connected("#cntid=%2Fa%2Fb");
    server(&mut app, object_response("/a/b", Some(container("/a/b", 1))));
    server(&mut app, children_response("/a/b", vec![track("/a/b/t", 1_000_000)], true));
    app.take_outgoing();

    server(&mut app, splice_notification("/a", 0, 1));
    let out = app.take_outgoing();
    assert_eq!(requests(&out.server, MessageKind::BrowseChildren), vec!["/a"]);

    server(&mut app, children_response("/a", vec![container("/a/other", 0)], true));
    assert_eq!(app.navigator().state().container_id, "/a");
    assert_eq!(app.token(), "#cntid=%2Fa");
    let out = app.take_outgoing();
    assert!(requests(&out.server, MessageKind::BrowseObject).contains(&"/a".to_string()));
}

#[test]
fn test_unknown_container_falls_back_to_parent() {
    let mut app = connected("#cntid=%2Fa%2Fgone");
    server(&mut app, object_response("/a/gone", None));
    assert_eq!(app.navigator().state().container_id, "/a");
    assert_eq!(app.navigator().history().len(), 1);
}

#[test]
fn test_back_at_start_keeps_running() {
    let mut app = connected("");
    app.handle_key(Key::plain(KeyCode::Esc));
    assert!(!app.should_quit());
    app.handle_key(Key::char('q'));
    assert!(app.should_quit());
}

#[test]
fn test_widget_history() {
    let mut app = connected("");
    app.handle_key(Key::char('l'));
    app.handle_key(Key::char('?'));
    assert_eq!(app.navigator().state().widget, Widget::Help);
    app.handle_key(Key::alt(KeyCode::Left));
    assert_eq!(app.navigator().state().widget, Widget::LogViewer);
    app.handle_key(Key::alt(KeyCode::Right));
    assert_eq!(app.navigator().state().widget, Widget::Help);
}

#[test]
fn test_server_loss_reconnect_rebrowses_display() {
    let mut app = connected("#cntid=%2Fa");
    server(&mut app, object_response("/a", Some(container("/a", 0))));
    server(&mut app, children_response("/a", Vec::new(), true));
    app.take_outgoing();

    app.handle_transport(Source::Server, TransportEvent::Closed);
    assert!(!app.state().server_connected);
    assert!(app.take_outgoing().server.is_empty());

    app.handle_transport(Source::Server, TransportEvent::Open);
    let out = app.take_outgoing();
    let objects = requests(&out.server, MessageKind::BrowseObject);
    assert!(objects.contains(&"/".to_string()));
    assert!(objects.contains(&"/a".to_string()));
}

#[test]
fn test_favorites_and_current_track() {
    let mut app = connected("#cntid=%2Fa;selid=%2Fa%2Ft1");
    server(&mut app, object_response("/a", Some(container("/a", 2))));
    server(
        &mut app,
        children_response("/a", vec![track("/a/t1", 1_000_000), track("/a/t2", 1_000_000)], true),
    );
    app.take_outgoing();

    app.handle_key(Key::char('f'));
    let out = app.take_outgoing();
    let commands: Vec<&Message> = out
        .server
        .iter()
        .filter(|m| m.kind() == Some(MessageKind::SpliceChildrenCommand))
        .collect();
    assert_eq!(commands.len(), 1);
    assert_eq!(commands[0].context_id(), Some("/favorites"));
    match commands[0].payload().unwrap() {
        Payload::SpliceChildrenCommand(s) => {
            assert_eq!((s.index, s.delete), (-1, 0));
            assert_eq!(s.items.len(), 1);
        }
        _ => panic!("Wrong message type"),
    }

    // nothing playing yet
    app.handle_key(Key::char('c'));
    assert_eq!(app.navigator().state().container_id, "/a");

    app.handle_key(Key::plain(KeyCode::Enter));
    app.handle_key(Key::char('c'));
    assert_eq!(app.navigator().state().container_id, "/playqueue");
    assert_eq!(
        app.navigator().state().selection_id.as_deref(),
        Some("/playqueue/_a_t1")
    );
}
