//! The playqueue mirror fed by the in-process player must stay identical to
//! the player's own queue: same ids, same order, after every command.

mod common;

use common::track;
use mediatree_client::local_player::LocalPlayer;
use mediatree_client::outbox::Outbox;
use mediatree_client::player_state::{PlayerState, PlayerStatus, PLAYER_CTX};
use mediatree_client::sync::SyncClient;
use mediatree_proto::{Message, Payload, Splice, PLAYQUEUE_ID};

struct Rig {
    player: LocalPlayer,
    sync: SyncClient,
    state: PlayerState,
}

impl Rig {
    fn new() -> Self {
        let mut rig = Self {
            player: LocalPlayer::new(0.5),
            sync: SyncClient::new("contract"),
            state: PlayerState::new(),
        };
        let mut out = Outbox::new();
        rig.sync.set_player_ready(true, &mut out);
        rig.deliver(out.player);
        rig
    }

    fn deliver(&mut self, commands: Vec<Message>) {
        for cmd in &commands {
            self.player.handle_message(cmd);
        }
        for reply in self.player.take_outbox() {
            self.sync.handle_player(&reply);
            if let Ok(Payload::StateChanged(v)) = reply.payload() {
                if v.ctx == PLAYER_CTX {
                    self.state.apply(&v);
                }
            }
        }
    }

    fn splice(&mut self, index: i64, delete: i64, ids: &[&str]) {
        let items = ids.iter().map(|id| track(id, 2_000_000)).collect();
        let cmd = Payload::SpliceChildrenCommand(Splice::new(index, delete, items))
            .to_message()
            .with_context(PLAYQUEUE_ID);
        self.deliver(vec![cmd]);
    }

    fn command(&mut self, payload: Payload) {
        self.deliver(vec![payload.to_message()]);
    }

    fn assert_mirrored(&self) {
        let mirror: Vec<_> = self.sync.playqueue().children().iter().map(|t| t.id()).collect();
        let queue: Vec<_> = self.player.queue().tracks().iter().map(|t| t.id()).collect();
        assert_eq!(mirror, queue);
    }
}

#[test]
fn test_mirror_follows_every_splice() {
    let mut rig = Rig::new();
    rig.assert_mirrored();

    rig.splice(-1, 0, &["/m/1", "/m/2", "/m/3"]);
    rig.assert_mirrored();
    assert_eq!(rig.sync.playqueue().children().len(), 3);

    rig.splice(1, 1, &[]);
    rig.assert_mirrored();
    rig.splice(0, 0, &["/m/4"]);
    rig.assert_mirrored();
    rig.splice(0, -1, &["/m/5"]);
    rig.assert_mirrored();
    assert_eq!(rig.player.queue().len(), 1);
}

#[test]
fn test_state_follows_transport() {
    let mut rig = Rig::new();
    assert_eq!(rig.state.volume, 0.5);
    rig.splice(-1, 0, &["/m/1", "/m/2"]);
    assert_eq!(rig.state.queue_len, 2);

    rig.command(Payload::Play);
    assert_eq!(rig.state.status, PlayerStatus::Playing);
    assert_eq!(rig.state.track_id(), Some("/playqueue/_m_1"));

    rig.command(Payload::Next);
    assert_eq!(rig.state.track_id(), Some("/playqueue/_m_2"));
    assert_eq!(rig.state.status, PlayerStatus::Playing);

    rig.command(Payload::Pause);
    assert_eq!(rig.state.status, PlayerStatus::Paused);
    rig.command(Payload::Stop);
    assert_eq!(rig.state.status, PlayerStatus::Stopped);
    assert_eq!(rig.state.track_id(), None);
}

#[test]
fn test_rebrowse_after_reconnect_rebuilds_mirror() {
    let mut rig = Rig::new();
    rig.splice(-1, 0, &["/m/1", "/m/2"]);

    let mut out = Outbox::new();
    rig.sync.set_player_ready(false, &mut out);
    assert!(rig.sync.playqueue().children().is_empty());
    rig.sync.set_player_ready(true, &mut out);
    rig.deliver(out.player);
    rig.assert_mirrored();
    assert_eq!(rig.sync.playqueue().children().len(), 2);
}
