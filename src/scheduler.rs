//! Instruction scheduling: debounce, cooldown and the no-detection grace period.
//!
//! The scheduler is the only stateful part of the guidance pipeline. It owns
//! the current announced state and the two monotonic timestamps, and it is
//! driven exclusively from the evaluation loop.

use std::time::{Duration, Instant};

use crate::guidance::GuidanceState;

pub const DEFAULT_INSTRUCTION_COOLDOWN: Duration = Duration::from_secs(3);
pub const DEFAULT_NO_DETECTION_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SchedulerSettings {
    /// Minimum time between two announcements.
    pub instruction_cooldown: Duration,
    /// Grace period after the last detection before the object counts as lost.
    pub no_detection_timeout: Duration,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            instruction_cooldown: DEFAULT_INSTRUCTION_COOLDOWN,
            no_detection_timeout: DEFAULT_NO_DETECTION_TIMEOUT,
        }
    }
}

/// Monotonic timestamps owned by the scheduler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SchedulerClock {
    /// `None` until the first announcement.
    pub last_instruction_time: Option<Instant>,
    /// Session start until the first detection.
    pub last_detection_time: Instant,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchedulerPhase {
    Idle,
    Announcing(GuidanceState),
}

/// An instruction the scheduler decided to announce.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Announcement {
    pub state: GuidanceState,
    /// Monotonically increasing, starting at 1.
    pub sequence: u64,
    pub decided_at: Instant,
}

pub struct InstructionScheduler {
    settings: SchedulerSettings,
    clock: SchedulerClock,
    phase: SchedulerPhase,
    sequence: u64,
}

impl InstructionScheduler {
    pub fn new(settings: SchedulerSettings, start: Instant) -> Self {
        Self {
            settings,
            clock: SchedulerClock {
                last_instruction_time: None,
                last_detection_time: start,
            },
            phase: SchedulerPhase::Idle,
            sequence: 0,
        }
    }

    pub fn settings(&self) -> SchedulerSettings {
        self.settings
    }

    pub fn clock(&self) -> SchedulerClock {
        self.clock
    }

    pub fn phase(&self) -> SchedulerPhase {
        self.phase
    }

    pub fn current_state(&self) -> Option<GuidanceState> {
        match self.phase {
            SchedulerPhase::Idle => None,
            SchedulerPhase::Announcing(state) => Some(state),
        }
    }

    /// Number of announcements emitted so far.
    pub fn announcements(&self) -> u64 {
        self.sequence
    }

    /// Advance one tick with this tick's candidate state.
    ///
    /// `GuidanceState::NoObject` means there was no valid detection this tick;
    /// any other candidate means a valid detection was seen at `now`.
    pub fn tick(&mut self, candidate: GuidanceState, now: Instant) -> Option<Announcement> {
        if candidate == GuidanceState::NoObject {
            return self.tick_without_detection(now);
        }

        self.clock.last_detection_time = now;
        if self.current_state() == Some(candidate) || !self.cooldown_elapsed(now) {
            return None;
        }
        self.phase = SchedulerPhase::Announcing(candidate);
        Some(self.emit(candidate, now))
    }

    fn tick_without_detection(&mut self, now: Instant) -> Option<Announcement> {
        let lost_for = now.saturating_duration_since(self.clock.last_detection_time);
        if lost_for <= self.settings.no_detection_timeout || !self.cooldown_elapsed(now) {
            return None;
        }
        // Back to idle so the next detection is always announced, even if it
        // repeats the state from before the loss.
        self.phase = SchedulerPhase::Idle;
        Some(self.emit(GuidanceState::NoObject, now))
    }

    fn cooldown_elapsed(&self, now: Instant) -> bool {
        match self.clock.last_instruction_time {
            None => true,
            Some(last) => {
                now.saturating_duration_since(last) >= self.settings.instruction_cooldown
            }
        }
    }

    fn emit(&mut self, state: GuidanceState, now: Instant) -> Announcement {
        self.clock.last_instruction_time = Some(now);
        self.sequence += 1;
        log::debug!("scheduler: announce #{} {}", self.sequence, state);
        Announcement {
            state,
            sequence: self.sequence,
            decided_at: now,
        }
    }
}
