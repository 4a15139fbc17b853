//! Contract-specific error types
//!
//! Error taxonomy for the strategy ledger, the asset custodian, delayed
//! parameter changes and rage-quit custody. Every error aborts the operation
//! before any state is written.

use thiserror::Error;
use types::errors::MathError;
use types::time::Timestamp;

/// Strategy ledger errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StrategyError {
    #[error("Vault is insolvent: user debt exceeds backing value")]
    InsolventVault,

    #[error("Buffer account cannot receive deposited or minted shares")]
    BufferReceiver,

    #[error("Buffer account cannot transfer shares to itself")]
    BufferSelfTransfer,

    #[error("Buffer operation would uncover user debt: required {required}, available {available}")]
    BufferSolvency { required: u128, available: u128 },

    #[error("New buffer account already holds {shares} ordinary shares")]
    BufferHoldsShares { shares: u128 },

    #[error("Operation would produce zero shares")]
    ZeroShares,

    #[error("Operation would produce zero assets")]
    ZeroAssets,

    #[error("Deposit exceeds max: requested {requested}, max {max}")]
    ExceedsMaxDeposit { requested: u128, max: u128 },

    #[error("Mint exceeds max: requested {requested}, max {max}")]
    ExceedsMaxMint { requested: u128, max: u128 },

    #[error("Withdraw exceeds max: requested {requested}, max {max}")]
    ExceedsMaxWithdraw { requested: u128, max: u128 },

    #[error("Redeem exceeds max: requested {requested}, max {max}")]
    ExceedsMaxRedeem { requested: u128, max: u128 },

    #[error("Too much loss: expected {expected} assets, got {actual}")]
    TooMuchLoss { expected: u128, actual: u128 },

    #[error("Invalid max loss: {0} bps")]
    InvalidMaxLoss(u16),

    #[error("Insufficient shares: required {required}, available {available}")]
    InsufficientBalance { required: u128, available: u128 },

    #[error("Insufficient allowance: required {required}, available {available}")]
    InsufficientAllowance { required: u128, available: u128 },

    #[error("Oracle returned a zero exchange rate")]
    InvalidExchangeRate,

    #[error("Strategy is shut down")]
    Shutdown,

    #[error("Unauthorized caller")]
    Unauthorized,

    #[error("Custodian error: {0}")]
    Custodian(#[from] CustodianError),

    #[error("Timelock error: {0}")]
    Timelock(#[from] TimelockError),

    #[error("Math error: {0}")]
    Math(#[from] MathError),
}

/// Asset custodian errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CustodianError {
    #[error("Insufficient {asset} funds for {holder}: required {required}, available {available}")]
    InsufficientFunds {
        asset: String,
        holder: String,
        required: u128,
        available: u128,
    },

    #[error("Arithmetic overflow in asset balance")]
    Overflow,
}

/// Delayed parameter change errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TimelockError {
    #[error("Invalid value: {reason}")]
    InvalidValue { reason: String },

    #[error("Proposed value equals the current value")]
    SameAsCurrent,

    #[error("A change is already pending")]
    AlreadyPending,

    #[error("No pending change")]
    NoPending,

    #[error("Change delay not elapsed: available at {available_at}")]
    DelayNotElapsed { available_at: Timestamp },

    #[error("Change delay already elapsed at {elapsed_at}: cancellation no longer allowed")]
    DelayElapsed { elapsed_at: Timestamp },

    #[error("Unauthorized: caller is not the governance authority")]
    Unauthorized,
}

/// Rage-quit custody errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CustodyError {
    #[error("Rage quit already active for this holder")]
    AlreadyActive,

    #[error("No active rage quit for this holder")]
    NoActiveCustody,

    #[error("Invalid share amount: requested {requested}, balance {balance}")]
    InvalidShares { requested: u128, balance: u128 },

    #[error("Shares still locked until {unlock_time}")]
    SharesStillLocked { unlock_time: Timestamp },

    #[error("Request exceeds locked shares: requested {requested}, locked {locked}")]
    ExceedsLockedShares { requested: u128, locked: u128 },

    #[error("Transfer exceeds unlocked balance: requested {requested}, unlocked {unlocked}")]
    TransferExceedsUnlocked { requested: u128, unlocked: u128 },

    #[error("Buffer account exits are not subject to rage quit")]
    BufferAccount,

    #[error("Incoming buffer account has an open rage quit")]
    BufferInCustody,

    #[error("Governance error: {0}")]
    Timelock(#[from] TimelockError),

    #[error("Vault error: {0}")]
    Vault(#[from] StrategyError),
}

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid config field {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}
