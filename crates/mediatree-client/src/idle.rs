//! Idle timers for transient UI (nav popup, image-viewer controls).
//!
//! A timer is single-shot but rescheduling: every [`IdleTimer::poke`]
//! pushes the deadline out again, and the first [`IdleTimer::tick`] past the
//! deadline fires once and disarms.  Navigation away must
//! [`IdleTimer::cancel`] so a late tick never hides something that belongs
//! to a state no longer shown.

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct IdleTimer {
    timeout: Duration,
    deadline: Option<Instant>,
}

impl IdleTimer {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            deadline: None,
        }
    }

    pub fn from_secs(secs: u64) -> Self {
        Self::new(Duration::from_secs(secs))
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Arm, or push an armed deadline out by a full timeout.
    pub fn poke(&mut self) {
        self.poke_at(Instant::now());
    }

    pub fn poke_at(&mut self, now: Instant) {
        self.deadline = Some(now + self.timeout);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// `true` exactly once, on the first tick at or past the deadline.
    pub fn tick(&mut self) -> bool {
        self.tick_at(Instant::now())
    }

    pub fn tick_at(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn remaining_at(&self, now: Instant) -> Option<Duration> {
        self.deadline.map(|d| d.saturating_duration_since(now))
    }
}
