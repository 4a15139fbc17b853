//! Yield-Skimming Strategy & Rage-Quit Locked Vault
//!
//! Share accounting for a vault over an appreciating asset. Shares track
//! asset *value* at the oracle rate; value growth is skimmed into a buffer
//! account that also absorbs losses first. A locked-vault wrapper adds
//! cooldown-gated exits on top of any base vault.
//!
//! # Modules
//! - `ledger`: Share balances, allowances and the buffer account
//! - `strategy`: Conversion engine, deposits/exits, settlement, buffer migration
//! - `oracle`: Exchange rate source and RAY normalization
//! - `asset`: Custodian moving the underlying token
//! - `custody`: Per-holder rage-quit locks
//! - `locked_vault`: Custody-gated wrapper and cooldown governance
//! - `timelock`: Delayed parameter changes
//! - `shared`: Serialized, all-or-nothing access across threads
//! - `security`: Roles, governance authority, shutdown switch
//! - `config`, `events`, `errors`

pub mod asset;
pub mod config;
pub mod custody;
pub mod errors;
pub mod events;
pub mod ledger;
pub mod locked_vault;
pub mod oracle;
pub mod security;
pub mod shared;
pub mod strategy;
pub mod timelock;

pub use locked_vault::{BaseVault, LockedVault};
pub use shared::SharedVault;
pub use strategy::{StrategyRoles, StrategySnapshot, YieldSkimmingStrategy};
