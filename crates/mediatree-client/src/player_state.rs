//! Player state variables as seen by the client.
//!
//! Players publish their state as `StateChanged(ctx, name, value)` messages
//! under the `"player"` context.  [`PlayerState`] folds those into a typed
//! snapshot and reports which part moved so only that part is redrawn.

use mediatree_proto::tree::meta;
use mediatree_proto::{Dict, ObjectNode, StateVar, Value};
use tracing::debug;

pub const PLAYER_CTX: &str = "player";

/// Variable names in the `"player"` context.
pub mod var {
    pub const VOLUME: &str = "volume";
    pub const STATUS: &str = "status";
    pub const TRACK: &str = "track";
    pub const TIME: &str = "time";
    pub const MODE: &str = "mode";
    pub const MUTE: &str = "mute";
    pub const QUEUE_IDX: &str = "QueueIdx";
    pub const QUEUE_LEN: &str = "QueueLen";
}

/// Keys of the `time` dictionary.
pub mod time_key {
    /// Elapsed time in microseconds.
    pub const TIME: &str = "time";
    /// Elapsed fraction in `0..=1`, negative when the duration is unknown.
    pub const PERC: &str = "time_perc";
}

/// Renderer-discovery state lives in the media database context.
pub const MDB_CTX: &str = "mdb";
pub const RENDERERS_VAR: &str = "renderers";

// ── Status ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayerStatus {
    Init,
    #[default]
    Stopped,
    Playing,
    Seeking,
    Changing,
    Interrupted,
    Paused,
    Starting,
    Error,
    Quit,
}

impl PlayerStatus {
    pub fn from_i64(v: i64) -> Option<Self> {
        Some(match v {
            -1 => Self::Init,
            0 => Self::Stopped,
            1 => Self::Playing,
            2 => Self::Seeking,
            3 => Self::Changing,
            4 => Self::Interrupted,
            5 => Self::Paused,
            7 => Self::Starting,
            8 => Self::Error,
            9 => Self::Quit,
            _ => return None,
        })
    }

    pub fn as_i32(self) -> i32 {
        match self {
            Self::Init => -1,
            Self::Stopped => 0,
            Self::Playing => 1,
            Self::Seeking => 2,
            Self::Changing => 3,
            Self::Interrupted => 4,
            Self::Paused => 5,
            Self::Starting => 7,
            Self::Error => 8,
            Self::Quit => 9,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Stopped => "stopped",
            Self::Playing => "playing",
            Self::Seeking => "seeking",
            Self::Changing => "changing",
            Self::Interrupted => "interrupted",
            Self::Paused => "paused",
            Self::Starting => "starting",
            Self::Error => "error",
            Self::Quit => "quit",
        }
    }
}

// ── Mode ──────────────────────────────────────────────────────────────────────

/// Track-order policy of the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackMode {
    #[default]
    Normal,
    /// Wrap around at either end.
    Repeat,
    /// Wrap around a random permutation.
    Shuffle,
    /// Stop after the current track.
    One,
    /// Repeat the current track.
    Loop,
}

impl PlaybackMode {
    pub const COUNT: i64 = 5;

    pub fn from_i64(v: i64) -> Option<Self> {
        Some(match v {
            0 => Self::Normal,
            1 => Self::Repeat,
            2 => Self::Shuffle,
            3 => Self::One,
            4 => Self::Loop,
            _ => return None,
        })
    }

    pub fn as_i32(self) -> i32 {
        match self {
            Self::Normal => 0,
            Self::Repeat => 1,
            Self::Shuffle => 2,
            Self::One => 3,
            Self::Loop => 4,
        }
    }

    /// Step `delta` modes forward, wrapping in both directions.
    pub fn cycle(self, delta: i64) -> Self {
        let v = (i64::from(self.as_i32()) + delta).rem_euclid(Self::COUNT);
        Self::from_i64(v).unwrap_or_default()
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Repeat => "repeat all",
            Self::Shuffle => "shuffle",
            Self::One => "play one",
            Self::Loop => "loop one",
        }
    }
}

// ── Snapshot ──────────────────────────────────────────────────────────────────

/// Which part of [`PlayerState`] an update touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerChange {
    Status,
    Track,
    Time,
    Volume,
    Mode,
    Mute,
    QueuePosition,
}

#[derive(Debug, Clone, Default)]
pub struct PlayerState {
    pub status: PlayerStatus,
    pub mode: PlaybackMode,
    pub volume: f64,
    pub mute: bool,
    pub time_us: i64,
    /// `None` while the duration is unknown.
    pub time_perc: Option<f64>,
    pub track: Option<ObjectNode>,
    pub queue_idx: i64,
    pub queue_len: i64,
}

impl PlayerState {
    pub fn new() -> Self {
        Self {
            volume: 0.5,
            ..Self::default()
        }
    }

    /// Fold one state variable in.  Variables outside the `"player"` context
    /// or with an unusable value are ignored.
    pub fn apply(&mut self, v: &StateVar) -> Option<PlayerChange> {
        if v.ctx != PLAYER_CTX {
            return None;
        }
        match v.name.as_str() {
            var::STATUS => {
                self.status = v.value.as_i64().and_then(PlayerStatus::from_i64)?;
                Some(PlayerChange::Status)
            }
            var::MODE => {
                self.mode = v.value.as_i64().and_then(PlaybackMode::from_i64)?;
                Some(PlayerChange::Mode)
            }
            var::VOLUME => {
                self.volume = v.value.as_f64()?;
                Some(PlayerChange::Volume)
            }
            var::MUTE => {
                self.mute = v.value.as_i64()? != 0;
                Some(PlayerChange::Mute)
            }
            var::TIME => {
                let (time, perc) = parse_time(&v.value)?;
                self.time_us = time;
                self.time_perc = perc;
                Some(PlayerChange::Time)
            }
            var::TRACK => {
                let dict = v.value.as_dict()?;
                self.track = track_from_dict(dict);
                Some(PlayerChange::Track)
            }
            var::QUEUE_IDX => {
                self.queue_idx = v.value.as_i64()?;
                Some(PlayerChange::QueuePosition)
            }
            var::QUEUE_LEN => {
                self.queue_len = v.value.as_i64()?;
                Some(PlayerChange::QueuePosition)
            }
            other => {
                debug!("ignoring player variable {}", other);
                None
            }
        }
    }

    /// Id of the playing track, if any.
    pub fn track_id(&self) -> Option<&str> {
        self.track.as_ref().and_then(ObjectNode::id)
    }

    /// One-line summary for status bars: `"playing  Artist - Title"`.
    pub fn summary(&self) -> String {
        let title = self
            .track
            .as_ref()
            .and_then(|t| t.label())
            .unwrap_or("-");
        match self.track.as_ref().and_then(|t| t.metadata.get_str(meta::ARTIST)) {
            Some(artist) => format!("{}  {} - {}", self.status.label(), artist, title),
            None => format!("{}  {}", self.status.label(), title),
        }
    }
}

/// Build the `time` variable value.
pub fn time_value(time_us: i64, perc: Option<f64>) -> Value {
    let mut dict = Dict::new();
    dict.set(time_key::TIME, time_us);
    dict.set(time_key::PERC, perc.unwrap_or(-1.0));
    Value::Dictionary(dict)
}

fn parse_time(value: &Value) -> Option<(i64, Option<f64>)> {
    match value {
        Value::Dictionary(d) => {
            let time = d.get_int(time_key::TIME).unwrap_or(0);
            let perc = d.get_float(time_key::PERC).filter(|p| *p >= 0.0);
            Some((time, perc))
        }
        other => Some((other.as_i64()?, None)),
    }
}

/// The `track` variable is either `{metadata: {...}}` or a bare metadata
/// dictionary; an empty dictionary means nothing is loaded.
fn track_from_dict(dict: &Dict) -> Option<ObjectNode> {
    if dict.is_empty() {
        return None;
    }
    if dict.contains(meta::METADATA) {
        Some(ObjectNode::from_dict(dict))
    } else {
        Some(ObjectNode {
            metadata: dict.clone(),
            children: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_cycle_wraps_both_ways() {
        assert_eq!(PlaybackMode::Loop.cycle(1), PlaybackMode::Normal);
        assert_eq!(PlaybackMode::Normal.cycle(-1), PlaybackMode::Loop);
        assert_eq!(PlaybackMode::Repeat.cycle(6), PlaybackMode::Shuffle);
    }

    #[test]
    fn test_status_codes() {
        for v in [-1, 0, 1, 2, 3, 4, 5, 7, 8, 9] {
            let s = PlayerStatus::from_i64(v).unwrap();
            assert_eq!(i64::from(s.as_i32()), v);
        }
        assert!(PlayerStatus::from_i64(6).is_none());
    }

    #[test]
    fn test_apply_status_and_track() {
        let mut state = PlayerState::new();
        let change = state.apply(&StateVar::new(PLAYER_CTX, var::STATUS, 1));
        assert_eq!(change, Some(PlayerChange::Status));
        assert_eq!(state.status, PlayerStatus::Playing);

        let mut md = Dict::new();
        md.set(meta::ID, "/playqueue/abc");
        md.set(meta::LABEL, "Song");
        let mut track = Dict::new();
        track.set(meta::METADATA, md);
        state.apply(&StateVar::new(PLAYER_CTX, var::TRACK, track));
        assert_eq!(state.track_id(), Some("/playqueue/abc"));

        state.apply(&StateVar::new(PLAYER_CTX, var::TRACK, Dict::new()));
        assert!(state.track.is_none());
    }

    #[test]
    fn test_summary_without_track() {
        let mut state = PlayerState::new();
        state.status = PlayerStatus::Stopped;
        assert_eq!(state.summary(), "stopped  -");
    }

    #[test]
    fn test_apply_time_dictionary() {
        let mut state = PlayerState::new();
        state.apply(&StateVar::new(PLAYER_CTX, var::TIME, time_value(2_000_000, Some(0.25))));
        assert_eq!(state.time_us, 2_000_000);
        assert_eq!(state.time_perc, Some(0.25));
        state.apply(&StateVar::new(PLAYER_CTX, var::TIME, time_value(0, None)));
        assert_eq!(state.time_perc, None);
    }

    #[test]
    fn test_other_context_ignored() {
        let mut state = PlayerState::new();
        assert!(state.apply(&StateVar::new("mdb", var::STATUS, 1)).is_none());
        assert_eq!(state.status, PlayerStatus::Stopped);
    }
}
