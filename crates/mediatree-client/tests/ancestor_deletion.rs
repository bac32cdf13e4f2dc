//! A deletion under an ancestor of the displayed container is checked with a
//! fresh browse of the ancestor before navigation goes up.

mod common;

use common::{children_response, container, object_response, requests, splice_notification};
use mediatree_client::outbox::Outbox;
use mediatree_client::sync::{SyncClient, SyncEvent};
use mediatree_proto::MessageKind;

/// Root loaded and `/a/b/c` displayed and fully loaded.
fn showing_abc() -> SyncClient {
    let mut sync = SyncClient::new("test");
    let mut out = Outbox::new();
    sync.on_connected(&mut out);
    sync.handle_server(&object_response("/", Some(container("/", 1))), &mut out);
    sync.handle_server(&children_response("/", vec![container("/a", 1)], true), &mut out);

    sync.show("/a/b/c", &mut out);
    sync.handle_server(&object_response("/a/b/c", Some(container("/a/b/c", 0))), &mut out);
    sync.handle_server(&children_response("/a/b/c", Vec::new(), true), &mut out);
    assert_eq!(sync.container_id(), Some("/a/b/c"));
    sync
}

fn deleted(events: &[SyncEvent]) -> Option<&str> {
    events.iter().find_map(|e| match e {
        SyncEvent::AncestorDeleted { ancestor } => Some(ancestor.as_str()),
        _ => None,
    })
}

#[test]
fn test_survivor_stays_displayed() {
    let mut sync = showing_abc();
    let mut out = Outbox::new();
    sync.handle_server(&splice_notification("/a", 0, 1), &mut out);
    assert_eq!(sync.reconciling(), Some("/a"));
    assert_eq!(requests(&out.server, MessageKind::BrowseChildren), vec!["/a"]);

    let events = sync.handle_server(
        &children_response("/a", vec![container("/a/x", 0), container("/a/b", 1)], true),
        &mut out,
    );
    assert_eq!(deleted(&events), None);
    assert_eq!(sync.reconciling(), None);
    assert_eq!(sync.container_id(), Some("/a/b/c"));
}

#[test]
fn test_missing_path_goes_up_to_ancestor() {
    let mut sync = showing_abc();
    let mut out = Outbox::new();
    sync.handle_server(&splice_notification("/a", 0, 1), &mut out);
    let events = sync.handle_server(&children_response("/a", vec![container("/a/x", 0)], true), &mut out);
    assert_eq!(deleted(&events), Some("/a"));
    assert_eq!(sync.container_id(), None);
}

#[test]
fn test_match_in_an_early_chunk_counts() {
    let mut sync = showing_abc();
    let mut out = Outbox::new();
    sync.handle_server(&splice_notification("/a", 0, 1), &mut out);
    let events = sync.handle_server(&children_response("/a", vec![container("/a/b", 1)], false), &mut out);
    assert!(events.is_empty());
    let events = sync.handle_server(&children_response("/a", vec![container("/a/z", 0)], true), &mut out);
    assert_eq!(deleted(&events), None);
}

#[test]
fn test_second_deletion_reruns_the_check() {
    let mut sync = showing_abc();
    let mut out = Outbox::new();
    sync.handle_server(&splice_notification("/a", 0, 1), &mut out);
    sync.handle_server(&splice_notification("/a", 0, 1), &mut out);
    assert_eq!(requests(&out.server, MessageKind::BrowseChildren), vec!["/a"]);

    // the first answer predates the second deletion and decides nothing
    let events = sync.handle_server(&children_response("/a", vec![container("/a/b", 1)], true), &mut out);
    assert_eq!(deleted(&events), None);
    assert_eq!(sync.reconciling(), Some("/a"));
    assert_eq!(requests(&out.server, MessageKind::BrowseChildren), vec!["/a", "/a"]);

    let events = sync.handle_server(&children_response("/a", Vec::new(), true), &mut out);
    assert_eq!(deleted(&events), Some("/a"));
}

#[test]
fn test_insertions_do_not_trigger_a_check() {
    let mut sync = showing_abc();
    let mut out = Outbox::new();
    let insert = mediatree_proto::Payload::SpliceChildren(mediatree_proto::Splice::new(
        0,
        0,
        vec![container("/a/new", 0)],
    ))
    .to_message()
    .with_context("/a");
    sync.handle_server(&insert, &mut out);
    assert_eq!(sync.reconciling(), None);
    assert!(out.server.is_empty());
}

#[test]
fn test_disconnect_during_check_goes_up() {
    let mut sync = showing_abc();
    let mut out = Outbox::new();
    sync.handle_server(&splice_notification("/a", 0, 1), &mut out);
    let events = sync.on_disconnected();
    assert_eq!(deleted(&events), Some("/a"));
    assert_eq!(sync.reconciling(), None);
}

#[test]
fn test_moving_away_cancels_the_check() {
    let mut sync = showing_abc();
    let mut out = Outbox::new();
    sync.handle_server(&splice_notification("/a", 0, 1), &mut out);
    sync.show("/", &mut out);
    assert_eq!(sync.reconciling(), None);
    let events = sync.handle_server(&children_response("/a", Vec::new(), true), &mut out);
    assert_eq!(deleted(&events), None);
}

/// Root holding `/a` and `/x`, `/a/b` displayed, then `/x` deleted from the
/// root so a check of `/` is in flight.
fn checking_root() -> (SyncClient, Outbox) {
    let mut sync = SyncClient::new("test");
    let mut out = Outbox::new();
    sync.on_connected(&mut out);
    sync.handle_server(&object_response("/", Some(container("/", 2))), &mut out);
    sync.handle_server(
        &children_response("/", vec![container("/a", 1), container("/x", 0)], true),
        &mut out,
    );
    sync.show("/a/b", &mut out);
    sync.handle_server(&object_response("/a/b", Some(container("/a/b", 0))), &mut out);
    sync.handle_server(&children_response("/a/b", Vec::new(), true), &mut out);

    sync.handle_server(&splice_notification("/", 1, 1), &mut out);
    assert_eq!(sync.reconciling(), Some("/"));
    assert_eq!(root_ids(&sync), vec!["/playqueue", "/a"]);
    (sync, out)
}

fn root_ids(sync: &SyncClient) -> Vec<String> {
    sync.root()
        .children()
        .iter()
        .filter_map(|c| c.id().map(str::to_string))
        .collect()
}

#[test]
fn test_cancelled_root_check_leaves_cache_alone() {
    let (mut sync, mut out) = checking_root();
    sync.show("/", &mut out);
    assert_eq!(sync.reconciling(), None);

    let events = sync.handle_server(&children_response("/", vec![container("/a", 1)], true), &mut out);
    assert!(events.is_empty());
    assert_eq!(root_ids(&sync), vec!["/playqueue", "/a"]);
}

#[test]
fn test_replaced_root_check_leaves_cache_alone() {
    let (mut sync, mut out) = checking_root();
    sync.handle_server(&splice_notification("/a", 5, 1), &mut out);
    assert_eq!(sync.reconciling(), Some("/a"));

    let events = sync.handle_server(&children_response("/", vec![container("/a", 1)], true), &mut out);
    assert_eq!(deleted(&events), None);
    assert_eq!(root_ids(&sync), vec!["/playqueue", "/a"]);
    assert_eq!(sync.reconciling(), Some("/a"));

    // the replacing check still decides
    let events = sync.handle_server(&children_response("/a", vec![container("/a/b", 0)], true), &mut out);
    assert_eq!(deleted(&events), None);
    assert_eq!(sync.reconciling(), None);
    assert_eq!(sync.container_id(), Some("/a/b"));
}

#[test]
fn test_splice_without_context_is_ignored() {
    let mut sync = showing_abc();
    let mut out = Outbox::new();
    let notify = mediatree_proto::Payload::SpliceChildren(mediatree_proto::Splice::new(0, 1, Vec::new()))
        .to_message();
    sync.handle_server(&notify, &mut out);
    assert_eq!(sync.reconciling(), None);
    assert!(out.server.is_empty());
}
