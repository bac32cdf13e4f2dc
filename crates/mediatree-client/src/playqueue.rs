//! PlayqueueEngine: the playback queue as a splice-able object plus the
//! track-order policy.
//!
//! The queue is an [`ObjectNode`] at `/playqueue` whose children are tracks
//! with synthesized ids (`/playqueue/<hash>`).  Positions are tracked in two
//! spaces:
//!
//! ```text
//!  real index   position in the child list (what splices address)
//!  order index  position in play order; equal to the real index unless
//!               shuffling, in which case  real = shuffle[order]
//! ```
//!
//! The current track is remembered by id, so splices that move it keep it
//! current and splices that delete it clear it.

use mediatree_proto::tree::{meta, playqueue_track_id, SpliceRange};
use mediatree_proto::{Dict, ObjectNode, Splice, TreeError, PLAYQUEUE_ID};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::player_state::PlaybackMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

pub struct PlayqueueEngine {
    node: ObjectNode,
    mode: PlaybackMode,
    current: Option<String>,
    /// `shuffle[order] = real`; present only in shuffle mode.
    shuffle: Option<Vec<usize>>,
}

impl PlayqueueEngine {
    pub fn new(label: &str) -> Self {
        let mut node = ObjectNode::new(PLAYQUEUE_ID);
        node.metadata.set(meta::LABEL, label);
        node.metadata.set(meta::CLASS, "container.playlist");
        node.children = Some(Vec::new());
        let mut engine = Self {
            node,
            mode: PlaybackMode::Normal,
            current: None,
            shuffle: None,
        };
        engine.update_summary();
        engine
    }

    pub fn node(&self) -> &ObjectNode {
        &self.node
    }

    pub fn tracks(&self) -> &[ObjectNode] {
        self.node.children()
    }

    pub fn len(&self) -> usize {
        self.tracks().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks().is_empty()
    }

    pub fn mode(&self) -> PlaybackMode {
        self.mode
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.node.child_index(id)
    }

    pub fn track(&self, real: usize) -> Option<&ObjectNode> {
        self.tracks().get(real)
    }

    /// Real index of the current track.
    pub fn current_index(&self) -> Option<usize> {
        self.current.as_deref().and_then(|id| self.index_of(id))
    }

    pub fn current_track(&self) -> Option<&ObjectNode> {
        self.current_index().and_then(|i| self.track(i))
    }

    pub fn set_current(&mut self, real: Option<usize>) {
        self.current = real
            .and_then(|i| self.track(i))
            .and_then(ObjectNode::id)
            .map(str::to_string);
    }

    pub fn shuffle_order(&self) -> Option<&[usize]> {
        self.shuffle.as_deref()
    }

    // ── Mode ──────────────────────────────────────────────────────────────────

    pub fn set_mode(&mut self, mode: PlaybackMode) {
        self.set_mode_with_rng(mode, &mut rand::thread_rng());
    }

    /// Entering shuffle builds a fresh permutation, leaving it drops it.
    pub fn set_mode_with_rng<R: Rng + ?Sized>(&mut self, mode: PlaybackMode, rng: &mut R) {
        self.mode = mode;
        if mode == PlaybackMode::Shuffle {
            self.reshuffle(rng);
        } else {
            self.shuffle = None;
        }
    }

    /// Fisher–Yates permutation of the real indices.
    pub fn reshuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.shuffle(rng);
        self.shuffle = Some(order);
    }

    /// Order index → real index.
    pub fn shuffle_index(&self, order: usize) -> usize {
        match &self.shuffle {
            Some(s) => s.get(order).copied().unwrap_or(order),
            None => order,
        }
    }

    /// Real index → order index.
    pub fn unshuffle_index(&self, real: usize) -> usize {
        match &self.shuffle {
            Some(s) => s.iter().position(|&r| r == real).unwrap_or(real),
            None => real,
        }
    }

    // ── Order policy ──────────────────────────────────────────────────────────

    /// Real index of the track after (or before) the current one, `None`
    /// when playback should stop.
    ///
    /// `forced` is a user skip and always wraps.  Automatic advance follows
    /// the mode: normal stops at the ends, repeat and shuffle wrap, one stops
    /// after the current track, loop repeats it.
    pub fn advance(&self, direction: Direction, forced: bool) -> Option<usize> {
        let n = self.len();
        if n == 0 {
            return None;
        }
        let pos = match self.current_index() {
            Some(real) => self.unshuffle_index(real),
            None => {
                let start = match direction {
                    Direction::Forward => 0,
                    Direction::Backward => n - 1,
                };
                return Some(self.shuffle_index(start));
            }
        };
        let wrapped = match direction {
            Direction::Forward => (pos + 1) % n,
            Direction::Backward => (pos + n - 1) % n,
        };
        let next = if forced {
            wrapped
        } else {
            match self.mode {
                PlaybackMode::Normal => match direction {
                    Direction::Forward if pos + 1 < n => pos + 1,
                    Direction::Backward if pos > 0 => pos - 1,
                    _ => return None,
                },
                PlaybackMode::Repeat | PlaybackMode::Shuffle => wrapped,
                PlaybackMode::One => return None,
                PlaybackMode::Loop => pos,
            }
        };
        Some(self.shuffle_index(next))
    }

    // ── Splice ────────────────────────────────────────────────────────────────

    /// Apply an add/remove command.  Inserted tracks are copies of the source
    /// objects with a queue id and without sibling links.  Returns the
    /// normalised range and the converted items as inserted.
    pub fn splice(&mut self, splice: &Splice) -> Result<(SpliceRange, Vec<Dict>), TreeError> {
        let items: Vec<ObjectNode> = splice.items.iter().map(queue_track).collect();
        let converted: Vec<Dict> = items.iter().map(|t| t.to_dict(false)).collect();
        let range = self.node.splice(splice.index, splice.delete, items)?;
        if self.mode == PlaybackMode::Shuffle {
            self.reshuffle(&mut rand::thread_rng());
        }
        if self.current_index().is_none() {
            self.current = None;
        }
        self.update_summary();
        Ok((range, converted))
    }

    /// Recompute the queue's own child counts and total duration.
    fn update_summary(&mut self) {
        let n = self.len() as i64;
        let total: i64 = self
            .tracks()
            .iter()
            .filter_map(|t| t.metadata.get_int(meta::APPROX_DURATION))
            .filter(|d| *d > 0)
            .sum();
        let md = &mut self.node.metadata;
        md.set(meta::NUM_CHILDREN, n);
        md.set(meta::NUM_ITEM_CHILDREN, n);
        md.set(meta::NUM_CONTAINER_CHILDREN, 0i64);
        md.set(meta::APPROX_DURATION, total);
    }

    /// `{metadata: {...}}` of the queue itself, for change notifications.
    pub fn summary_update(&self) -> Dict {
        self.node.to_dict(false)
    }
}

/// Queue copy of a browsed object (`{metadata, ...}` or bare metadata).
fn queue_track(item: &Dict) -> ObjectNode {
    let mut node = if item.contains(meta::METADATA) {
        ObjectNode::from_dict(item)
    } else {
        ObjectNode {
            metadata: item.clone(),
            children: None,
        }
    };
    node.children = None;
    let id = playqueue_track_id(&node.metadata);
    node.set_id(&id);
    node.metadata.remove(meta::NEXT_ID);
    node.metadata.remove(meta::PREVIOUS_ID);
    node
}
