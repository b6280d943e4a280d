//! Global tick clock.

use serde::{Deserialize, Serialize};
use world_model::Tick;

use crate::error::{KernelError, Result};

pub const DEFAULT_START_TICK: Tick = 0;
pub const DEFAULT_STEP: u64 = 1;

/// Monotonic tick counter for one simulation session.
///
/// `advance` is the only mutator and takes `&mut self`, so two advances for the
/// same session can never be in flight at once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clock {
    tick: Tick,
}

impl Clock {
    /// Create a clock positioned at `start_tick`.
    pub fn new(start_tick: Tick) -> Self {
        Self { tick: start_tick }
    }

    /// Tick the clock currently points at.
    pub fn current_tick(&self) -> Tick {
        self.tick
    }

    /// Move forward by `step` ticks and return the new tick.
    ///
    /// Fails on a zero step or on overflow, leaving the clock unchanged.
    pub fn advance(&mut self, step: u64) -> Result<Tick> {
        let next = self.peek(step)?;
        tracing::trace!(from = self.tick, to = next, "clock advanced");
        self.tick = next;
        Ok(next)
    }

    /// Advance by [`DEFAULT_STEP`] and return the new tick.
    pub fn advance_one(&mut self) -> Result<Tick> {
        self.advance(DEFAULT_STEP)
    }

    /// The tick `advance(step)` would return, without moving the clock.
    pub fn peek(&self, step: u64) -> Result<Tick> {
        if step == 0 {
            return Err(KernelError::InvalidArgument("step must be > 0".to_string()));
        }
        self.tick.checked_add(step).ok_or_else(|| {
            KernelError::InvalidArgument(format!("tick overflow: {} + {}", self.tick, step))
        })
    }

    /// Tick one [`DEFAULT_STEP`] ahead, without moving.
    pub fn peek_next(&self) -> Result<Tick> {
        self.peek(DEFAULT_STEP)
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new(DEFAULT_START_TICK)
    }
}
