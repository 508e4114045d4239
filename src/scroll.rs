use std::time::Duration;

use crate::{
    config::{BarConfig, ResumeMode},
    foundation::{
        core::{Affine, check_non_negative},
        error::CollabResult,
    },
};

/// Scroll animation state. Time is measured from mount.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ScrollState {
    /// Looping leftwards, starting from `anchor_offset` at `since`.
    Running { anchor_offset: f64, since: Duration },
    /// Pinned at the offset observed when the pointer entered.
    Paused { frozen_offset: f64 },
}

/// Two-state hover-pause machine over a looping horizontal translation.
///
/// Offsets are horizontal translations of the strip, in `(-loop_distance, 0]`. The visual
/// transform is derived from the state and the caller's clock only.
#[derive(Clone, Debug, PartialEq)]
pub struct ScrollController {
    state: ScrollState,
    speed: f64,
    loop_distance: f64,
    resume_mode: ResumeMode,
}

impl ScrollController {
    pub fn new(speed: f64, resume_mode: ResumeMode) -> CollabResult<Self> {
        check_non_negative("speed", speed)?;
        Ok(Self {
            state: ScrollState::Running {
                anchor_offset: 0.0,
                since: Duration::ZERO,
            },
            speed,
            loop_distance: 0.0,
            resume_mode,
        })
    }

    pub fn from_config(config: &BarConfig) -> CollabResult<Self> {
        Self::new(config.speed, config.resume_mode)
    }

    pub fn state(&self) -> ScrollState {
        self.state
    }

    pub fn is_paused(&self) -> bool {
        matches!(self.state, ScrollState::Paused { .. })
    }

    pub fn loop_distance(&self) -> f64 {
        self.loop_distance
    }

    /// Change the loop length, keeping the strip where it currently is.
    pub fn set_loop_distance(&mut self, distance: f64, now: Duration) -> CollabResult<()> {
        check_non_negative("loop distance", distance)?;
        if let ScrollState::Running { .. } = self.state {
            let current = self.offset_at(now);
            self.loop_distance = distance;
            self.state = ScrollState::Running {
                anchor_offset: self.wrap_offset(current),
                since: now,
            };
        } else {
            self.loop_distance = distance;
        }
        Ok(())
    }

    /// Translation at `now`.
    pub fn offset_at(&self, now: Duration) -> f64 {
        match self.state {
            ScrollState::Paused { frozen_offset } => frozen_offset,
            ScrollState::Running {
                anchor_offset,
                since,
            } => {
                if self.loop_distance <= 0.0 {
                    return anchor_offset;
                }
                let travelled = self.speed * now.saturating_sub(since).as_secs_f64();
                self.wrap_offset(anchor_offset - travelled)
            }
        }
    }

    pub fn transform_at(&self, now: Duration) -> Affine {
        Affine::translate((self.offset_at(now), 0.0))
    }

    /// Pointer entered the strip. Returns `true` if this paused the scroll.
    pub fn pointer_enter(&mut self, now: Duration) -> bool {
        if self.is_paused() {
            return false;
        }
        let frozen_offset = self.offset_at(now);
        tracing::debug!(frozen_offset, "scroll paused");
        self.state = ScrollState::Paused { frozen_offset };
        true
    }

    /// Pointer left the strip. Returns `true` if this resumed the scroll.
    pub fn pointer_leave(&mut self, now: Duration) -> bool {
        let ScrollState::Paused { frozen_offset } = self.state else {
            return false;
        };
        self.state = match self.resume_mode {
            ResumeMode::Continue => ScrollState::Running {
                anchor_offset: frozen_offset,
                since: now,
            },
            ResumeMode::Rejoin => ScrollState::Running {
                anchor_offset: 0.0,
                since: Duration::ZERO,
            },
        };
        tracing::debug!(frozen_offset, mode = ?self.resume_mode, "scroll resumed");
        true
    }

    // Maps any offset into (-loop_distance, 0].
    fn wrap_offset(&self, offset: f64) -> f64 {
        if self.loop_distance <= 0.0 {
            return offset;
        }
        let w = (-offset).rem_euclid(self.loop_distance);
        if w == 0.0 { 0.0 } else { -w }
    }
}
