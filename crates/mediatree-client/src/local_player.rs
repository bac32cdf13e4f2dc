//! In-process reference player.
//!
//! Speaks exactly the message contract a networked renderer speaks: it takes
//! player, state and playqueue commands and answers with state-changed and
//! splice notifications in its outbox.  There is no audio output; the host
//! drives time with [`LocalPlayer::set_time`] and end-of-track with
//! [`LocalPlayer::track_ended`].
//!
//! ```text
//!  Play     Stopped → play current (or first)     Paused → Playing
//!  Pause    Playing ⇄ Paused
//!  Stop     Playing|Paused → Stopped
//!  Next/Prev  forced advance; keeps Playing/Paused, only moves when Stopped
//!  end of track  automatic advance per mode, Stopped when it yields nothing
//! ```

use std::collections::BTreeMap;
use std::time::Duration;

use mediatree_proto::tree::meta;
use mediatree_proto::{Dict, Message, ObjectNode, Payload, Splice, StateVar, Value, PLAYQUEUE_ID};
use tracing::{debug, warn};

use crate::player_state::{time_value, var, PlaybackMode, PlayerStatus, PLAYER_CTX};
use crate::playqueue::{Direction, PlayqueueEngine};

/// Seek context: `SetState("player/time", "time_perc", f)`.
pub const SEEK_CTX: &str = "player/time";
pub const SEEK_VAR: &str = "time_perc";

pub struct LocalPlayer {
    queue: PlayqueueEngine,
    status: PlayerStatus,
    /// Published variables, by context then name.
    state: BTreeMap<String, Dict>,
    duration_us: Option<i64>,
    time_us: i64,
    uri: Option<String>,
    outbox: Vec<Message>,
}

impl LocalPlayer {
    pub fn new(volume: f64) -> Self {
        let mut player = Self {
            queue: PlayqueueEngine::new("Playqueue"),
            status: PlayerStatus::Stopped,
            state: BTreeMap::new(),
            duration_us: None,
            time_us: 0,
            uri: None,
            outbox: Vec::new(),
        };
        player.publish(PLAYER_CTX, var::STATUS, PlayerStatus::Stopped.as_i32());
        player.publish(PLAYER_CTX, var::MODE, PlaybackMode::Normal.as_i32());
        player.publish(PLAYER_CTX, var::VOLUME, volume.clamp(0.0, 1.0));
        player.publish(PLAYER_CTX, var::MUTE, 0);
        player.publish(PLAYER_CTX, var::QUEUE_IDX, 0);
        player.publish(PLAYER_CTX, var::QUEUE_LEN, 0);
        player.publish(PLAYER_CTX, var::TIME, time_value(0, None));
        player
    }

    pub fn status(&self) -> PlayerStatus {
        self.status
    }

    pub fn queue(&self) -> &PlayqueueEngine {
        &self.queue
    }

    /// Source of the loaded track.
    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    pub fn state_var(&self, ctx: &str, name: &str) -> Option<&Value> {
        self.state.get(ctx).and_then(|d| d.get(name))
    }

    /// Drain the notifications produced so far.
    pub fn take_outbox(&mut self) -> Vec<Message> {
        std::mem::take(&mut self.outbox)
    }

    // ── Commands ──────────────────────────────────────────────────────────────

    pub fn handle_message(&mut self, msg: &Message) {
        let payload = match msg.payload() {
            Ok(p) => p,
            Err(e) => {
                warn!("local player: dropping message: {}", e);
                return;
            }
        };
        match payload {
            Payload::Play => match self.status {
                PlayerStatus::Paused => self.set_status(PlayerStatus::Playing),
                PlayerStatus::Stopped => self.play(false),
                _ => {}
            },
            Payload::Stop => {
                if matches!(self.status, PlayerStatus::Playing | PlayerStatus::Paused) {
                    self.stop();
                }
            }
            Payload::Pause => match self.status {
                PlayerStatus::Playing => self.set_status(PlayerStatus::Paused),
                PlayerStatus::Paused => self.set_status(PlayerStatus::Playing),
                _ => {}
            },
            Payload::Next => self.skip(Direction::Forward),
            Payload::Prev => self.skip(Direction::Backward),
            Payload::PlayById(id) => {
                self.set_current_track_by_id(&id);
                self.play(false);
            }
            Payload::SetCurrentTrack(id) => self.set_current_track_by_id(&id),
            Payload::NextVisualization => debug!("local player has no visualizations"),
            Payload::SetState(v) => self.set_state(v),
            Payload::SetStateRel(v) => self.set_state_rel(v),
            Payload::SpliceChildrenCommand(s) => {
                if msg.context_id() == Some(PLAYQUEUE_ID) {
                    self.splice_queue(&s);
                } else {
                    debug!("local player: splice for foreign context {:?}", msg.context_id());
                }
            }
            Payload::BrowseChildren { start, count } => self.browse_children(msg, start, count),
            Payload::BrowseObject => self.browse_object(msg),
            other => debug!("local player: ignoring {:?}", other.kind()),
        }
    }

    /// End of the current track: advance per mode or stop.
    pub fn track_ended(&mut self) {
        match self.queue.advance(Direction::Forward, false) {
            None => self.stop(),
            Some(next) => {
                self.set_current_track(Some(next));
                self.play(false);
            }
        }
    }

    /// Playback position report.
    pub fn set_time(&mut self, time_us: i64) {
        self.time_us = time_us;
        let perc = self
            .duration_us
            .filter(|d| *d > 0)
            .map(|d| (time_us as f64 / d as f64).clamp(0.0, 1.0));
        self.publish(PLAYER_CTX, var::TIME, time_value(time_us, perc));
    }

    pub fn time_us(&self) -> i64 {
        self.time_us
    }

    /// Move the clock while playing; past the track's duration this is the
    /// end of the track.
    pub fn advance_clock(&mut self, elapsed: Duration) {
        if self.status != PlayerStatus::Playing {
            return;
        }
        let time_us = self.time_us + elapsed.as_micros() as i64;
        match self.duration_us {
            Some(d) if time_us >= d => self.track_ended(),
            _ => self.set_time(time_us),
        }
    }

    // ── Transport ─────────────────────────────────────────────────────────────

    fn play(&mut self, paused: bool) {
        if self.queue.current_index().is_none() {
            if self.queue.is_empty() {
                warn!("local player: nothing to play");
                return;
            }
            if self.queue.mode() == PlaybackMode::Shuffle {
                self.queue.reshuffle(&mut rand::thread_rng());
            }
            let first = self.queue.shuffle_index(0);
            self.set_current_track(Some(first));
        }
        let Some(track) = self.queue.current_track().cloned() else {
            return;
        };
        self.uri = playable_uri(&track);
        if self.uri.is_none() {
            warn!("local player: no playable source for {:?}", track.id());
        }
        self.duration_us = track.metadata.get_int(meta::APPROX_DURATION).filter(|d| *d > 0);
        self.publish(PLAYER_CTX, var::TRACK, track.to_dict(false));
        self.set_time(0);
        self.set_status(if paused {
            PlayerStatus::Paused
        } else {
            PlayerStatus::Playing
        });
    }

    fn stop(&mut self) {
        self.uri = None;
        self.time_us = 0;
        self.publish(PLAYER_CTX, var::TIME, time_value(0, None));
        self.set_status(PlayerStatus::Stopped);
        self.publish(PLAYER_CTX, var::TRACK, Dict::new());
    }

    /// User skip: always moves, and resumes in the state it found.
    fn skip(&mut self, direction: Direction) {
        let was = self.status;
        if matches!(was, PlayerStatus::Playing | PlayerStatus::Paused) {
            self.stop();
        }
        let Some(next) = self.queue.advance(direction, true) else {
            return;
        };
        match was {
            PlayerStatus::Playing => {
                self.set_current_track(Some(next));
                self.play(false);
            }
            PlayerStatus::Paused => {
                self.set_current_track(Some(next));
                self.play(true);
            }
            _ => self.set_current_track(Some(next)),
        }
    }

    fn set_current_track_by_id(&mut self, id: &str) {
        match self.queue.index_of(id) {
            Some(real) => self.set_current_track(Some(real)),
            None => warn!("local player: no track {} in queue", id),
        }
    }

    fn set_current_track(&mut self, real: Option<usize>) {
        if self.status != PlayerStatus::Stopped {
            self.stop();
        }
        self.queue.set_current(real);
        let idx = real.map_or(-1, |i| i as i64);
        self.publish(PLAYER_CTX, var::QUEUE_IDX, idx);
    }

    fn set_status(&mut self, status: PlayerStatus) {
        self.status = status;
        self.publish(PLAYER_CTX, var::STATUS, status.as_i32());
    }

    // ── State variables ───────────────────────────────────────────────────────

    fn set_state(&mut self, v: StateVar) {
        if v.ctx == SEEK_CTX && v.name == SEEK_VAR {
            self.seek(v.value.as_f64().unwrap_or(0.0));
            return;
        }
        if v.ctx != PLAYER_CTX {
            self.publish(&v.ctx, &v.name, v.value);
            return;
        }
        match v.name.as_str() {
            var::MODE => {
                let mode = v
                    .value
                    .as_i64()
                    .and_then(PlaybackMode::from_i64)
                    .unwrap_or_default();
                self.set_mode(mode);
            }
            var::VOLUME => {
                let volume = v.value.as_f64().unwrap_or(0.5).clamp(0.0, 1.0);
                self.publish(PLAYER_CTX, var::VOLUME, volume);
            }
            var::MUTE => {
                let mute = v.value.as_i64().map_or(0, |m| i32::from(m != 0));
                self.publish(PLAYER_CTX, var::MUTE, mute);
            }
            _ => self.publish(PLAYER_CTX, &v.name, v.value),
        }
    }

    fn set_state_rel(&mut self, v: StateVar) {
        if v.ctx != PLAYER_CTX {
            debug!("local player: relative change for {}:{}", v.ctx, v.name);
            return;
        }
        match v.name.as_str() {
            var::MODE => {
                let delta = v.value.as_i64().unwrap_or(0);
                let mode = self.current_mode().cycle(delta);
                self.set_mode(mode);
            }
            var::VOLUME => {
                let current = self
                    .state_var(PLAYER_CTX, var::VOLUME)
                    .and_then(Value::as_f64)
                    .unwrap_or(0.5);
                let volume = (current + v.value.as_f64().unwrap_or(0.0)).clamp(0.0, 1.0);
                self.publish(PLAYER_CTX, var::VOLUME, volume);
            }
            var::MUTE => {
                let current = self
                    .state_var(PLAYER_CTX, var::MUTE)
                    .and_then(Value::as_i64)
                    .unwrap_or(0);
                self.publish(PLAYER_CTX, var::MUTE, i32::from(current == 0));
            }
            other => debug!("local player: no relative change for {}", other),
        }
    }

    fn current_mode(&self) -> PlaybackMode {
        self.queue.mode()
    }

    fn set_mode(&mut self, mode: PlaybackMode) {
        self.queue.set_mode(mode);
        self.publish(PLAYER_CTX, var::MODE, mode.as_i32());
    }

    fn seek(&mut self, perc: f64) {
        let Some(duration) = self.duration_us else {
            return;
        };
        if !matches!(self.status, PlayerStatus::Playing | PlayerStatus::Paused) {
            return;
        }
        let resume = self.status;
        self.set_status(PlayerStatus::Seeking);
        self.set_time((perc.clamp(0.0, 1.0) * duration as f64) as i64);
        self.set_status(resume);
    }

    /// Store and broadcast one variable.
    fn publish(&mut self, ctx: &str, name: &str, value: impl Into<Value>) {
        let value = value.into();
        self.state
            .entry(ctx.to_string())
            .or_default()
            .set(name, value.clone());
        let mut msg = Payload::StateChanged(StateVar::new(ctx, name, value)).to_message();
        msg.set_context_id(ctx);
        self.outbox.push(msg);
    }

    // ── Queue ─────────────────────────────────────────────────────────────────

    fn splice_queue(&mut self, s: &Splice) {
        let was_empty = self.queue.is_empty();
        let (range, converted) = match self.queue.splice(s) {
            Ok(r) => r,
            Err(e) => {
                warn!("local player: rejecting queue splice: {}", e);
                return;
            }
        };
        let notify = Splice::new(range.index as i64, range.deleted as i64, converted);
        self.outbox
            .push(Payload::SpliceChildren(notify).to_message().with_context(PLAYQUEUE_ID));
        self.publish(PLAYER_CTX, var::QUEUE_LEN, self.queue.len() as i64);
        let changed = Payload::ObjectChanged(self.queue.summary_update()).to_message();
        self.outbox.push(changed.with_context(PLAYQUEUE_ID));
        if was_empty && !self.queue.is_empty() {
            self.queue.set_current(None);
        }
    }

    fn browse_children(&mut self, request: &Message, start: i64, count: i64) {
        let tracks = self.queue.tracks();
        let start = (start.max(0) as usize).min(tracks.len());
        let end = if count <= 0 {
            tracks.len()
        } else {
            start
                .saturating_add(usize::try_from(count).unwrap_or(usize::MAX))
                .min(tracks.len())
        };
        let items = tracks[start..end].iter().map(|t| t.to_dict(false)).collect();
        let mut msg = Payload::BrowseChildrenResponse(Splice::new(start as i64, 0, items)).to_message();
        msg.set_context_id(request.context_id().unwrap_or(PLAYQUEUE_ID));
        msg.copy_routing_from(request);
        self.outbox.push(msg);
    }

    fn browse_object(&mut self, request: &Message) {
        let mut msg = Payload::BrowseObjectResponse(Some(self.queue.node().to_dict(false))).to_message();
        msg.set_context_id(PLAYQUEUE_ID);
        msg.copy_routing_from(request);
        self.outbox.push(msg);
    }
}

/// First source location of a track: `Src` (string, dictionary with `URI`,
/// or array of either), falling back to a top-level `URI`.
fn playable_uri(track: &ObjectNode) -> Option<String> {
    fn from_value(v: &Value) -> Option<String> {
        match v {
            Value::String(s) => Some(s.clone()),
            Value::Dictionary(d) => d.get_string(meta::URI),
            Value::Array(a) => a.iter().find_map(from_value),
            _ => None,
        }
    }
    track
        .metadata
        .get(meta::SRC)
        .and_then(from_value)
        .or_else(|| track.metadata.get_string(meta::URI))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(hash: &str) -> Dict {
        let mut md = Dict::new();
        md.set(meta::ID, format!("/music/{hash}"));
        md.set(meta::HASH, hash);
        md.set(meta::CLASS, "item.audio.song");
        md.set(meta::SRC, format!("http://host/{hash}.mp3"));
        md.set(meta::APPROX_DURATION, 10_000_000i64);
        let mut d = Dict::new();
        d.set(meta::METADATA, md);
        d
    }

    fn command(payload: Payload) -> Message {
        payload.to_message()
    }

    fn fill(player: &mut LocalPlayer, n: usize) {
        let items = (0..n).map(|i| item(&format!("h{i}"))).collect();
        let msg = command(Payload::SpliceChildrenCommand(Splice::new(0, -1, items)))
            .with_context(PLAYQUEUE_ID);
        player.handle_message(&msg);
    }

    fn last_state(out: &[Message], name: &str) -> Option<Value> {
        out.iter().rev().find_map(|m| match m.payload() {
            Ok(Payload::StateChanged(v)) if v.name == name => Some(v.value),
            _ => None,
        })
    }

    #[test]
    fn test_initial_state_published() {
        let mut player = LocalPlayer::new(0.5);
        let out = player.take_outbox();
        assert_eq!(last_state(&out, var::STATUS), Some(Value::Int(0)));
        assert_eq!(last_state(&out, var::VOLUME), Some(Value::Float(0.5)));
        assert_eq!(last_state(&out, var::QUEUE_LEN), Some(Value::Int(0)));
    }

    #[test]
    fn test_splice_command_notifies() {
        let mut player = LocalPlayer::new(0.5);
        player.take_outbox();
        fill(&mut player, 3);
        let out = player.take_outbox();
        let splice = out
            .iter()
            .find_map(|m| match m.payload() {
                Ok(Payload::SpliceChildren(s)) => Some((m.context_id().map(str::to_string), s)),
                _ => None,
            })
            .unwrap();
        assert_eq!(splice.0.as_deref(), Some(PLAYQUEUE_ID));
        assert_eq!(splice.1.index, 0);
        assert_eq!(splice.1.items.len(), 3);
        assert_eq!(last_state(&out, var::QUEUE_LEN), Some(Value::Long(3)));
        assert!(out
            .iter()
            .any(|m| m.kind() == Some(mediatree_proto::MessageKind::ObjectChanged)));
    }

    #[test]
    fn test_play_starts_first_track() {
        let mut player = LocalPlayer::new(0.5);
        fill(&mut player, 2);
        player.take_outbox();
        player.handle_message(&command(Payload::Play));
        assert_eq!(player.status(), PlayerStatus::Playing);
        assert_eq!(player.uri(), Some("http://host/h0.mp3"));
        let out = player.take_outbox();
        assert_eq!(last_state(&out, var::STATUS), Some(Value::Int(1)));
        assert_eq!(last_state(&out, var::QUEUE_IDX), Some(Value::Long(0)));
    }

    #[test]
    fn test_pause_toggles() {
        let mut player = LocalPlayer::new(0.5);
        fill(&mut player, 1);
        player.handle_message(&command(Payload::Play));
        player.handle_message(&command(Payload::Pause));
        assert_eq!(player.status(), PlayerStatus::Paused);
        player.handle_message(&command(Payload::Pause));
        assert_eq!(player.status(), PlayerStatus::Playing);
        player.handle_message(&command(Payload::Stop));
        assert_eq!(player.status(), PlayerStatus::Stopped);
        player.handle_message(&command(Payload::Pause));
        assert_eq!(player.status(), PlayerStatus::Stopped);
    }

    #[test]
    fn test_next_wraps_and_keeps_paused() {
        let mut player = LocalPlayer::new(0.5);
        fill(&mut player, 3);
        player.handle_message(&command(Payload::PlayById("/playqueue/h2".into())));
        assert_eq!(player.queue().current_index(), Some(2));
        player.handle_message(&command(Payload::Pause));
        player.handle_message(&command(Payload::Next));
        assert_eq!(player.queue().current_index(), Some(0));
        assert_eq!(player.status(), PlayerStatus::Paused);
    }

    #[test]
    fn test_next_while_stopped_only_moves() {
        let mut player = LocalPlayer::new(0.5);
        fill(&mut player, 3);
        player.handle_message(&command(Payload::SetCurrentTrack("/playqueue/h1".into())));
        player.handle_message(&command(Payload::Prev));
        assert_eq!(player.queue().current_index(), Some(0));
        assert_eq!(player.status(), PlayerStatus::Stopped);
    }

    #[test]
    fn test_track_end_in_normal_mode_stops_at_end() {
        let mut player = LocalPlayer::new(0.5);
        fill(&mut player, 2);
        player.handle_message(&command(Payload::Play));
        player.track_ended();
        assert_eq!(player.queue().current_index(), Some(1));
        assert_eq!(player.status(), PlayerStatus::Playing);
        player.track_ended();
        assert_eq!(player.status(), PlayerStatus::Stopped);
    }

    #[test]
    fn test_clock_runs_into_next_track() {
        let mut player = LocalPlayer::new(0.5);
        fill(&mut player, 2);
        player.handle_message(&command(Payload::Play));
        player.advance_clock(Duration::from_secs(4));
        assert_eq!(player.time_us(), 4_000_000);
        player.handle_message(&command(Payload::Pause));
        player.advance_clock(Duration::from_secs(60));
        assert_eq!(player.time_us(), 4_000_000);
        player.handle_message(&command(Payload::Pause));
        player.advance_clock(Duration::from_secs(7));
        assert_eq!(player.queue().current_index(), Some(1));
        assert_eq!(player.time_us(), 0);
    }

    #[test]
    fn test_relative_state_changes() {
        let mut player = LocalPlayer::new(0.9);
        player.handle_message(&command(Payload::SetStateRel(StateVar::new(
            PLAYER_CTX,
            var::VOLUME,
            0.5,
        ))));
        assert_eq!(
            player.state_var(PLAYER_CTX, var::VOLUME),
            Some(&Value::Float(1.0))
        );
        player.handle_message(&command(Payload::SetStateRel(StateVar::new(
            PLAYER_CTX,
            var::MODE,
            -1,
        ))));
        assert_eq!(player.queue().mode(), PlaybackMode::Loop);
        player.handle_message(&command(Payload::SetStateRel(StateVar::new(
            PLAYER_CTX,
            var::MUTE,
            1,
        ))));
        assert_eq!(player.state_var(PLAYER_CTX, var::MUTE), Some(&Value::Int(1)));
    }

    #[test]
    fn test_browse_children_answers_range() {
        let mut player = LocalPlayer::new(0.5);
        fill(&mut player, 5);
        player.take_outbox();
        let mut req = command(Payload::BrowseChildren { start: 1, count: 2 }).with_context(PLAYQUEUE_ID);
        req.set_client_id("client-1");
        player.handle_message(&req);
        let out = player.take_outbox();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].client_id(), Some("client-1"));
        assert!(out[0].is_last());
        match out[0].payload().unwrap() {
            Payload::BrowseChildrenResponse(s) => {
                assert_eq!(s.index, 1);
                assert_eq!(s.delete, 0);
                assert_eq!(s.items.len(), 2);
            }
            _ => panic!("Wrong message type"),
        }
    }

    #[test]
    fn test_browse_children_huge_count_clamps_to_queue() {
        let mut player = LocalPlayer::new(0.5);
        fill(&mut player, 3);
        player.take_outbox();
        let req = command(Payload::BrowseChildren { start: 2, count: i64::MAX }).with_context(PLAYQUEUE_ID);
        player.handle_message(&req);
        let out = player.take_outbox();
        match out[0].payload().unwrap() {
            Payload::BrowseChildrenResponse(s) => {
                assert_eq!(s.index, 2);
                assert_eq!(s.items.len(), 1);
            }
            _ => panic!("Wrong message type"),
        }
    }

    #[test]
    fn test_browse_object_returns_queue_without_children() {
        let mut player = LocalPlayer::new(0.5);
        fill(&mut player, 2);
        player.take_outbox();
        player.handle_message(&command(Payload::BrowseObject).with_context(PLAYQUEUE_ID));
        let out = player.take_outbox();
        match out[0].payload().unwrap() {
            Payload::BrowseObjectResponse(Some(obj)) => {
                let node = ObjectNode::from_dict(&obj);
                assert_eq!(node.id(), Some(PLAYQUEUE_ID));
                assert_eq!(node.num_children(), Some(2));
                assert!(node.children.is_none());
            }
            _ => panic!("Wrong message type"),
        }
    }

    #[test]
    fn test_seek_sets_time() {
        let mut player = LocalPlayer::new(0.5);
        fill(&mut player, 1);
        player.handle_message(&command(Payload::Play));
        player.take_outbox();
        player.handle_message(&command(Payload::SetState(StateVar::new(SEEK_CTX, SEEK_VAR, 0.5))));
        let out = player.take_outbox();
        let time = last_state(&out, var::TIME).unwrap();
        assert_eq!(time.as_dict().unwrap().get_int("time"), Some(5_000_000));
        assert_eq!(player.status(), PlayerStatus::Playing);
    }
}
