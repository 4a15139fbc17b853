//! Asset custodian
//!
//! The strategy never touches token balances directly. It asks a custodian
//! to pull assets from a depositor, push assets to a receiver, and report
//! how much it currently holds. Each call is all-or-nothing.

use std::collections::HashMap;
use types::ids::{AccountId, AssetId};

use crate::errors::CustodianError;

/// Movement and balance primitive for the managed asset.
pub trait AssetCustodian {
    /// Identity of the managed token.
    fn asset(&self) -> &AssetId;

    /// Units currently held on behalf of the vault.
    fn balance_of_vault(&self) -> u128;

    /// Move `amount` from `from` into the vault.
    fn pull(&mut self, from: &AccountId, amount: u128) -> Result<(), CustodianError>;

    /// Move `amount` from the vault to `to`.
    fn push(&mut self, to: &AccountId, amount: u128) -> Result<(), CustodianError>;
}

/// In-memory token ledger acting as custodian.
///
/// Used by hosts that settle off-chain and by the test-suite.
#[derive(Debug, Clone)]
pub struct InMemoryAsset {
    asset: AssetId,
    balances: HashMap<AccountId, u128>,
    vault_balance: u128,
}

impl InMemoryAsset {
    pub fn new(asset: AssetId) -> Self {
        Self {
            asset,
            balances: HashMap::new(),
            vault_balance: 0,
        }
    }

    /// Credit an external holder (faucet / bridge-in).
    pub fn fund(&mut self, holder: AccountId, amount: u128) -> Result<(), CustodianError> {
        let balance = self.balances.entry(holder).or_insert(0);
        *balance = balance.checked_add(amount).ok_or(CustodianError::Overflow)?;
        Ok(())
    }

    pub fn balance_of(&self, holder: &AccountId) -> u128 {
        self.balances.get(holder).copied().unwrap_or(0)
    }

    /// Add units to the vault without minting shares (donation, rebase).
    pub fn credit_vault(&mut self, amount: u128) -> Result<(), CustodianError> {
        self.vault_balance = self
            .vault_balance
            .checked_add(amount)
            .ok_or(CustodianError::Overflow)?;
        Ok(())
    }

    /// Remove units from the vault without burning shares (slashing, hack).
    pub fn debit_vault(&mut self, amount: u128) -> Result<(), CustodianError> {
        self.vault_balance = self.vault_balance.checked_sub(amount).ok_or_else(|| {
            CustodianError::InsufficientFunds {
                asset: self.asset.to_string(),
                holder: "vault".to_string(),
                required: amount,
                available: self.vault_balance,
            }
        })?;
        Ok(())
    }
}

impl AssetCustodian for InMemoryAsset {
    fn asset(&self) -> &AssetId {
        &self.asset
    }

    fn balance_of_vault(&self) -> u128 {
        self.vault_balance
    }

    fn pull(&mut self, from: &AccountId, amount: u128) -> Result<(), CustodianError> {
        let available = self.balance_of(from);
        if available < amount {
            return Err(CustodianError::InsufficientFunds {
                asset: self.asset.to_string(),
                holder: from.to_string(),
                required: amount,
                available,
            });
        }
        let new_vault = self
            .vault_balance
            .checked_add(amount)
            .ok_or(CustodianError::Overflow)?;

        self.balances.insert(*from, available - amount);
        self.vault_balance = new_vault;
        Ok(())
    }

    fn push(&mut self, to: &AccountId, amount: u128) -> Result<(), CustodianError> {
        if self.vault_balance < amount {
            return Err(CustodianError::InsufficientFunds {
                asset: self.asset.to_string(),
                holder: "vault".to_string(),
                required: amount,
                available: self.vault_balance,
            });
        }
        let new_receiver = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(CustodianError::Overflow)?;

        self.vault_balance -= amount;
        self.balances.insert(*to, new_receiver);
        Ok(())
    }
}
