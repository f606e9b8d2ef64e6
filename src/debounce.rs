//! Debouncing of per-frame gesture conditions into discrete events.
//!
//! Two filters live here:
//! - [`HysteresisTrigger`] fires once per rising edge. A value must climb
//!   above `trigger` to fire and fall below the lower `reset` level before
//!   it can fire again; a cooldown (frame count or wall-clock) additionally
//!   rate-limits fires.
//! - [`SustainedHold`] reports success once a condition has held without a
//!   break for a required duration.
//!
//! A frame without an observation is passed as `None`: nothing fires, but
//! frame cooldowns still decay.

use crate::{Error, Result};
use std::time::{Duration, Instant};

/// Minimum wall-clock spacing between fires
#[derive(Debug, Clone)]
pub struct RateLimiter {
    min_interval: Duration,
    last_fired: Option<Instant>,
}

impl RateLimiter {
    #[must_use]
    pub const fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_fired: None,
        }
    }

    /// True when strictly more than `min_interval` has passed since the last fire
    #[must_use]
    pub fn is_ready(&self, now: Instant) -> bool {
        self.last_fired
            .map_or(true, |last| now.saturating_duration_since(last) > self.min_interval)
    }

    /// Record a fire at `now`
    pub fn mark(&mut self, now: Instant) {
        self.last_fired = Some(now);
    }

    /// Fire if ready; returns whether it fired
    pub fn try_fire(&mut self, now: Instant) -> bool {
        if self.is_ready(now) {
            self.mark(now);
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        self.last_fired = None;
    }
}

/// Rate limit applied after a trigger fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cooldown {
    /// Block this many subsequent processed frames
    Frames(u32),
    /// Block until this much wall-clock time has passed
    Duration(Duration),
}

#[derive(Debug, Clone)]
enum CooldownState {
    Frames { length: u32, remaining: u32 },
    Timed(RateLimiter),
}

/// Edge-triggered hysteresis filter with cooldown
#[derive(Debug, Clone)]
pub struct HysteresisTrigger {
    trigger: f64,
    reset: f64,
    active: bool,
    cooldown: CooldownState,
}

impl HysteresisTrigger {
    /// Create a trigger.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Debounce`] if either level is not finite or `reset`
    /// is not strictly below `trigger`.
    pub fn new(trigger: f64, reset: f64, cooldown: Cooldown) -> Result<Self> {
        if !trigger.is_finite() || !reset.is_finite() {
            return Err(Error::Debounce(format!(
                "Thresholds must be finite (trigger {trigger}, reset {reset})"
            )));
        }
        if reset >= trigger {
            return Err(Error::Debounce(format!(
                "Reset level {reset} must be below trigger level {trigger}"
            )));
        }

        let cooldown = match cooldown {
            Cooldown::Frames(length) => CooldownState::Frames { length, remaining: 0 },
            Cooldown::Duration(interval) => CooldownState::Timed(RateLimiter::new(interval)),
        };

        Ok(Self {
            trigger,
            reset,
            active: false,
            cooldown,
        })
    }

    /// Process one frame. Returns true on the frame the event fires.
    ///
    /// The frame that fires starts a frame cooldown of N; each later
    /// processed frame, observed or not, consumes one.
    pub fn update(&mut self, value: Option<f64>, now: Instant) -> bool {
        let cooling = match &self.cooldown {
            CooldownState::Frames { remaining, .. } => *remaining > 0,
            CooldownState::Timed(limiter) => !limiter.is_ready(now),
        };

        let mut fired = false;
        if let Some(value) = value {
            if value > self.trigger {
                fired = !self.active && !cooling;
                // A raise blocked by the cooldown still has to be released
                // below the reset level before it can fire.
                self.active = true;
            } else if value < self.reset {
                self.active = false;
            }
        }

        match &mut self.cooldown {
            CooldownState::Frames { length, remaining } => {
                if fired {
                    *remaining = *length;
                } else {
                    *remaining = remaining.saturating_sub(1);
                }
            }
            CooldownState::Timed(limiter) => {
                if fired {
                    limiter.mark(now);
                }
            }
        }

        fired
    }

    /// Whether the value is currently latched above the reset level
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Frames left in a frame cooldown (always 0 for timed cooldowns)
    #[must_use]
    pub fn cooldown_remaining(&self) -> u32 {
        match &self.cooldown {
            CooldownState::Frames { remaining, .. } => *remaining,
            CooldownState::Timed(_) => 0,
        }
    }

    #[must_use]
    pub const fn trigger_level(&self) -> f64 {
        self.trigger
    }

    #[must_use]
    pub const fn reset_level(&self) -> f64 {
        self.reset
    }

    /// Re-arm and clear any cooldown
    pub fn reset(&mut self) {
        self.active = false;
        match &mut self.cooldown {
            CooldownState::Frames { remaining, .. } => *remaining = 0,
            CooldownState::Timed(limiter) => limiter.reset(),
        }
    }
}

/// Outcome of one sustained-hold update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldStatus {
    /// Condition not held and no hold in progress
    Idle,
    /// Condition held on this frame for the first time since a break
    Started,
    /// Hold in progress
    Holding { elapsed: Duration },
    /// The hold just reached the required duration
    Succeeded,
    /// A hold in progress was broken on this frame
    Lost,
    /// Success was already reported; no further credit
    Complete,
}

/// Requires a condition to hold continuously for a duration
#[derive(Debug, Clone)]
pub struct SustainedHold {
    required: Duration,
    started: Option<Instant>,
    succeeded: bool,
}

impl SustainedHold {
    #[must_use]
    pub const fn new(required: Duration) -> Self {
        Self {
            required,
            started: None,
            succeeded: false,
        }
    }

    /// Process one frame. Any frame where `condition` is false clears the
    /// start time; there is no partial credit across breaks.
    pub fn update(&mut self, condition: bool, now: Instant) -> HoldStatus {
        if self.succeeded {
            return HoldStatus::Complete;
        }

        if !condition {
            return if self.started.take().is_some() {
                HoldStatus::Lost
            } else {
                HoldStatus::Idle
            };
        }

        let (started, fresh) = match self.started {
            Some(started) => (started, false),
            None => {
                self.started = Some(now);
                (now, true)
            }
        };

        let elapsed = now.saturating_duration_since(started);
        if elapsed >= self.required {
            self.succeeded = true;
            self.started = None;
            HoldStatus::Succeeded
        } else if fresh {
            HoldStatus::Started
        } else {
            HoldStatus::Holding { elapsed }
        }
    }

    #[must_use]
    pub const fn is_succeeded(&self) -> bool {
        self.succeeded
    }

    /// Time still needed, if a hold is in progress
    #[must_use]
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.started
            .map(|started| self.required.saturating_sub(now.saturating_duration_since(started)))
    }

    #[must_use]
    pub const fn required(&self) -> Duration {
        self.required
    }

    pub fn reset(&mut self) {
        self.started = None;
        self.succeeded = false;
    }
}
