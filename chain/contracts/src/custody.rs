//! Rage-quit custody book
//!
//! Holders lock part of their balance for a cooldown before they may exit.
//! At most one entry exists per holder; it is created by `initiate`, shrinks
//! as withdrawals consume it, and disappears when cancelled or exhausted.
//! Locked shares stay in the holder's balance but cannot be transferred.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use types::ids::AccountId;
use types::time::{deadline, Seconds, Timestamp};

use crate::errors::CustodyError;

/// Locked allocation of one holder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustodyEntry {
    pub locked_shares: u128,
    pub unlock_time: Timestamp,
}

/// Where a holder is in the rage-quit lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CustodyState {
    NoCustody,
    /// Cooldown still running
    Locked { locked_shares: u128, unlock_time: Timestamp },
    /// Cooldown over; remaining shares may be withdrawn
    Unlocked { locked_shares: u128 },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustodyBook {
    entries: HashMap<AccountId, CustodyEntry>,
}

impl CustodyBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(&self, holder: &AccountId) -> Option<&CustodyEntry> {
        self.entries.get(holder)
    }

    pub fn state(&self, holder: &AccountId, now: Timestamp) -> CustodyState {
        match self.entries.get(holder) {
            None => CustodyState::NoCustody,
            Some(entry) if now < entry.unlock_time => CustodyState::Locked {
                locked_shares: entry.locked_shares,
                unlock_time: entry.unlock_time,
            },
            Some(entry) => CustodyState::Unlocked {
                locked_shares: entry.locked_shares,
            },
        }
    }

    pub fn locked_shares(&self, holder: &AccountId) -> u128 {
        self.entries.get(holder).map_or(0, |e| e.locked_shares)
    }

    /// Locked shares available for withdrawal right now.
    pub fn unlocked_shares(&self, holder: &AccountId, now: Timestamp) -> u128 {
        match self.state(holder, now) {
            CustodyState::Unlocked { locked_shares } => locked_shares,
            _ => 0,
        }
    }

    pub fn active_count(&self) -> usize {
        self.entries.len()
    }

    /// Lock `shares` of a holder's `balance` until `now + cooldown`.
    pub fn initiate(
        &mut self,
        holder: AccountId,
        shares: u128,
        balance: u128,
        now: Timestamp,
        cooldown: Seconds,
    ) -> Result<CustodyEntry, CustodyError> {
        if self.entries.contains_key(&holder) {
            return Err(CustodyError::AlreadyActive);
        }
        if shares == 0 || shares > balance {
            return Err(CustodyError::InvalidShares {
                requested: shares,
                balance,
            });
        }
        let entry = CustodyEntry {
            locked_shares: shares,
            unlock_time: deadline(now, cooldown),
        };
        self.entries.insert(holder, entry);
        Ok(entry)
    }

    /// Drop the holder's entry. Returns the shares that were locked.
    pub fn cancel(&mut self, holder: &AccountId) -> Result<u128, CustodyError> {
        self.entries
            .remove(holder)
            .map(|e| e.locked_shares)
            .ok_or(CustodyError::NoActiveCustody)
    }

    /// Fail unless `shares` may leave custody at `now`.
    pub fn check_withdrawable(&self, holder: &AccountId, shares: u128, now: Timestamp) -> Result<(), CustodyError> {
        let entry = self.entries.get(holder).ok_or(CustodyError::NoActiveCustody)?;
        if now < entry.unlock_time {
            return Err(CustodyError::SharesStillLocked {
                unlock_time: entry.unlock_time,
            });
        }
        if shares > entry.locked_shares {
            return Err(CustodyError::ExceedsLockedShares {
                requested: shares,
                locked: entry.locked_shares,
            });
        }
        Ok(())
    }

    /// Deduct withdrawn shares; the entry is removed once exhausted.
    /// Returns what is still locked.
    pub fn consume(&mut self, holder: &AccountId, shares: u128, now: Timestamp) -> Result<u128, CustodyError> {
        self.check_withdrawable(holder, shares, now)?;
        let remaining = match self.entries.get_mut(holder) {
            Some(entry) => {
                entry.locked_shares -= shares;
                entry.locked_shares
            }
            None => return Err(CustodyError::NoActiveCustody),
        };
        if remaining == 0 {
            self.entries.remove(holder);
        }
        Ok(remaining)
    }

    /// Fail if sending `shares` out of `balance` would dip into locked shares.
    pub fn check_transfer(&self, holder: &AccountId, shares: u128, balance: u128) -> Result<(), CustodyError> {
        let locked = self.locked_shares(holder);
        if locked == 0 {
            return Ok(());
        }
        let unlocked = balance.saturating_sub(locked);
        if shares > unlocked {
            return Err(CustodyError::TransferExceedsUnlocked {
                requested: shares,
                unlocked,
            });
        }
        Ok(())
    }
}
