//! Delayed parameter changes
//!
//! Two-step governance for a single parameter: a proposal opens a grace
//! window, anyone may apply it once the window has elapsed, and it can only
//! be discarded while the window is still running. At most one proposal is
//! pending at a time.
//!
//! Authorization and value validation are the caller's concern; this type
//! only enforces ordering and timing.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use types::time::{deadline, Seconds, Timestamp};

use crate::errors::TimelockError;

/// Lifecycle of a proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeState<T> {
    NoPending,
    PendingGrace { value: T, proposed_at: Timestamp },
}

/// A parameter guarded by a propose / finalize / cancel protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayedChange<T> {
    current: T,
    state: ChangeState<T>,
    delay: Seconds,
}

impl<T: Clone + PartialEq + Debug> DelayedChange<T> {
    pub fn new(current: T, delay: Seconds) -> Self {
        Self {
            current,
            state: ChangeState::NoPending,
            delay,
        }
    }

    pub fn current(&self) -> &T {
        &self.current
    }

    pub fn delay(&self) -> Seconds {
        self.delay
    }

    pub fn state(&self) -> &ChangeState<T> {
        &self.state
    }

    pub fn pending(&self) -> Option<&T> {
        match &self.state {
            ChangeState::PendingGrace { value, .. } => Some(value),
            ChangeState::NoPending => None,
        }
    }

    pub fn proposed_at(&self) -> Option<Timestamp> {
        match &self.state {
            ChangeState::PendingGrace { proposed_at, .. } => Some(*proposed_at),
            ChangeState::NoPending => None,
        }
    }

    /// Earliest time the pending value can be finalized.
    pub fn effective_at(&self) -> Option<Timestamp> {
        self.proposed_at().map(|at| deadline(at, self.delay))
    }

    /// Open a grace window for `value`. Returns when it becomes final.
    pub fn propose(&mut self, value: T, now: Timestamp) -> Result<Timestamp, TimelockError> {
        if self.pending().is_some() {
            return Err(TimelockError::AlreadyPending);
        }
        if value == self.current {
            return Err(TimelockError::SameAsCurrent);
        }
        self.state = ChangeState::PendingGrace {
            value,
            proposed_at: now,
        };
        Ok(deadline(now, self.delay))
    }

    /// Discard the pending value. Only valid strictly before the delay elapses.
    pub fn cancel(&mut self, now: Timestamp) -> Result<T, TimelockError> {
        let effective_at = self.effective_at().ok_or(TimelockError::NoPending)?;
        if now >= effective_at {
            return Err(TimelockError::DelayElapsed {
                elapsed_at: effective_at,
            });
        }
        match std::mem::replace(&mut self.state, ChangeState::NoPending) {
            ChangeState::PendingGrace { value, .. } => Ok(value),
            ChangeState::NoPending => Err(TimelockError::NoPending),
        }
    }

    /// Non-mutating readiness check; returns the value `finalize` would apply.
    pub fn ready(&self, now: Timestamp) -> Result<&T, TimelockError> {
        let effective_at = self.effective_at().ok_or(TimelockError::NoPending)?;
        if now < effective_at {
            return Err(TimelockError::DelayNotElapsed {
                available_at: effective_at,
            });
        }
        self.pending().ok_or(TimelockError::NoPending)
    }

    /// Apply the pending value. Returns `(old, new)`.
    pub fn finalize(&mut self, now: Timestamp) -> Result<(T, T), TimelockError> {
        self.ready(now)?;
        match std::mem::replace(&mut self.state, ChangeState::NoPending) {
            ChangeState::PendingGrace { value, .. } => {
                let old = std::mem::replace(&mut self.current, value.clone());
                Ok((old, value))
            }
            ChangeState::NoPending => Err(TimelockError::NoPending),
        }
    }
}
