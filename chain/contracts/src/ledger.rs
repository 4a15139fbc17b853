//! Share ledger
//!
//! Share balances, total supply and allowances, with the buffer account kept
//! apart from ordinary holders. Every holder is classified once through
//! [`ShareLedger::kind_of`]; the buffer's balance lives in its own field so
//! user debt is always `total_supply - buffer_shares`.
//!
//! Invariant: `sum(ordinary balances) + buffer_shares == total_supply`.
//!
//! Mutators validate before writing; a returned error means nothing changed.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use types::ids::AccountId;

use crate::errors::StrategyError;
use types::errors::MathError;

/// Who a holder is to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HolderKind {
    Ordinary,
    Buffer,
}

#[derive(Debug, Clone)]
pub struct ShareLedger {
    balances: HashMap<AccountId, u128>,
    buffer_account: AccountId,
    buffer_shares: u128,
    total_supply: u128,
    allowances: HashMap<(AccountId, AccountId), u128>,
}

impl ShareLedger {
    pub fn new(buffer_account: AccountId) -> Self {
        Self {
            balances: HashMap::new(),
            buffer_account,
            buffer_shares: 0,
            total_supply: 0,
            allowances: HashMap::new(),
        }
    }

    pub fn kind_of(&self, holder: &AccountId) -> HolderKind {
        if *holder == self.buffer_account {
            HolderKind::Buffer
        } else {
            HolderKind::Ordinary
        }
    }

    pub fn buffer_account(&self) -> &AccountId {
        &self.buffer_account
    }

    pub fn buffer_shares(&self) -> u128 {
        self.buffer_shares
    }

    pub fn total_supply(&self) -> u128 {
        self.total_supply
    }

    /// Shares owed to ordinary holders.
    pub fn user_debt(&self) -> u128 {
        self.total_supply - self.buffer_shares
    }

    pub fn balance_of(&self, holder: &AccountId) -> u128 {
        match self.kind_of(holder) {
            HolderKind::Buffer => self.buffer_shares,
            HolderKind::Ordinary => self.balances.get(holder).copied().unwrap_or(0),
        }
    }

    /// Number of ordinary holders with a non-zero balance.
    pub fn holder_count(&self) -> usize {
        self.balances.len()
    }

    pub fn mint(&mut self, to: &AccountId, shares: u128) -> Result<(), StrategyError> {
        let new_supply = self
            .total_supply
            .checked_add(shares)
            .ok_or(MathError::Overflow { context: "total supply" })?;
        let new_balance = self
            .balance_of(to)
            .checked_add(shares)
            .ok_or(MathError::Overflow { context: "share balance" })?;

        self.write_balance(to, new_balance);
        self.total_supply = new_supply;
        Ok(())
    }

    pub fn burn(&mut self, from: &AccountId, shares: u128) -> Result<(), StrategyError> {
        let available = self.balance_of(from);
        if available < shares {
            return Err(StrategyError::InsufficientBalance {
                required: shares,
                available,
            });
        }
        self.write_balance(from, available - shares);
        self.total_supply -= shares;
        Ok(())
    }

    /// Move shares between holders. Supply is unchanged.
    pub fn move_shares(&mut self, from: &AccountId, to: &AccountId, shares: u128) -> Result<(), StrategyError> {
        let available = self.balance_of(from);
        if available < shares {
            return Err(StrategyError::InsufficientBalance {
                required: shares,
                available,
            });
        }
        if from == to {
            return Ok(());
        }
        let new_to = self
            .balance_of(to)
            .checked_add(shares)
            .ok_or(MathError::Overflow { context: "share balance" })?;

        self.write_balance(from, available - shares);
        self.write_balance(to, new_to);
        Ok(())
    }

    pub fn allowance(&self, owner: &AccountId, spender: &AccountId) -> u128 {
        self.allowances.get(&(*owner, *spender)).copied().unwrap_or(0)
    }

    pub fn approve(&mut self, owner: AccountId, spender: AccountId, shares: u128) {
        if shares == 0 {
            self.allowances.remove(&(owner, spender));
        } else {
            self.allowances.insert((owner, spender), shares);
        }
    }

    /// Fail unless `spender` may move `shares` of `owner`'s balance.
    pub fn check_allowance(&self, owner: &AccountId, spender: &AccountId, shares: u128) -> Result<(), StrategyError> {
        if owner == spender {
            return Ok(());
        }
        let available = self.allowance(owner, spender);
        if available < shares {
            return Err(StrategyError::InsufficientAllowance {
                required: shares,
                available,
            });
        }
        Ok(())
    }

    /// Consume allowance. An unlimited (`u128::MAX`) allowance is not reduced.
    pub fn spend_allowance(&mut self, owner: &AccountId, spender: &AccountId, shares: u128) -> Result<(), StrategyError> {
        self.check_allowance(owner, spender, shares)?;
        if owner == spender {
            return Ok(());
        }
        let current = self.allowance(owner, spender);
        if current != u128::MAX {
            self.approve(*owner, *spender, current - shares);
        }
        Ok(())
    }

    /// Hand the buffer role (and its balance) to `new_buffer`.
    ///
    /// Rejected when the new account holds ordinary shares, since those would
    /// silently turn from user claims into buffer claims.
    pub fn reassign_buffer(&mut self, new_buffer: AccountId) -> Result<u128, StrategyError> {
        if let Some(&shares) = self.balances.get(&new_buffer) {
            return Err(StrategyError::BufferHoldsShares { shares });
        }
        self.buffer_account = new_buffer;
        Ok(self.buffer_shares)
    }

    /// Check `sum(balances) == total_supply`.
    pub fn check_invariant(&self) -> bool {
        let ordinary: Option<u128> = self
            .balances
            .values()
            .try_fold(0u128, |acc, b| acc.checked_add(*b));
        ordinary.and_then(|sum| sum.checked_add(self.buffer_shares)) == Some(self.total_supply)
    }

    fn write_balance(&mut self, holder: &AccountId, balance: u128) {
        match self.kind_of(holder) {
            HolderKind::Buffer => self.buffer_shares = balance,
            HolderKind::Ordinary => {
                if balance == 0 {
                    self.balances.remove(holder);
                } else {
                    self.balances.insert(*holder, balance);
                }
            }
        }
    }
}
