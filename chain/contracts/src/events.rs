//! Contract events
//!
//! Events are immutable records emitted by ledger, settlement and custody
//! operations. Each instance keeps an append-only log that hosts drain.

use serde::{Deserialize, Serialize};
use types::ids::AccountId;
use types::numeric::Ray;
use types::time::{Seconds, Timestamp};

/// Assets deposited in exchange for newly minted shares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deposit {
    pub caller: AccountId,
    pub owner: AccountId,
    pub assets: u128,
    pub shares: u128,
}

/// Shares burned in exchange for assets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Withdraw {
    pub caller: AccountId,
    pub receiver: AccountId,
    pub owner: AccountId,
    pub assets: u128,
    pub shares: u128,
}

/// Share movement. `from == None` is a mint, `to == None` a burn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub from: Option<AccountId>,
    pub to: Option<AccountId>,
    pub shares: u128,
}

/// Settlement outcome.
///
/// `profit` and `loss` are gross asset amounts; the share columns record
/// what the buffer account actually absorbed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reported {
    pub profit: u128,
    pub loss: u128,
    pub buffer_shares_minted: u128,
    pub buffer_shares_burned: u128,
    pub rate: Ray,
    pub total_assets: u128,
    pub reported_at: Timestamp,
}

/// Holder moved shares into rage-quit custody.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RageQuitInitiated {
    pub holder: AccountId,
    pub shares: u128,
    pub unlock_time: Timestamp,
}

/// Custodied shares consumed by a withdrawal or redemption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustodyConsumed {
    pub holder: AccountId,
    pub shares: u128,
    pub remaining: u128,
}

/// Enum wrapper for all contract events, enabling uniform handling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VaultEvent {
    Deposit(Deposit),
    Withdraw(Withdraw),
    Transfer(Transfer),
    Approval {
        owner: AccountId,
        spender: AccountId,
        shares: u128,
    },
    Reported(Reported),
    BurningToggled {
        enabled: bool,
    },
    StrategyShutdown,
    BufferChangeProposed {
        new_buffer: AccountId,
        effective_at: Timestamp,
    },
    BufferChangeCancelled {
        discarded: AccountId,
    },
    BufferChanged {
        old_buffer: AccountId,
        new_buffer: AccountId,
        shares_moved: u128,
    },
    RageQuitInitiated(RageQuitInitiated),
    RageQuitCancelled {
        holder: AccountId,
        freed_shares: u128,
    },
    CustodyConsumed(CustodyConsumed),
    CooldownChangeProposed {
        new_period: Seconds,
        effective_at: Timestamp,
    },
    CooldownChangeCancelled {
        discarded: Seconds,
    },
    CooldownChanged {
        old_period: Seconds,
        new_period: Seconds,
    },
    GovernanceTransferred {
        old: AccountId,
        new: AccountId,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deposit_serialization() {
        let event = Deposit {
            caller: AccountId::new(),
            owner: AccountId::new(),
            assets: 100,
            shares: 110,
        };
        let json = serde_json::to_string(&event).unwrap();
        let deser: Deposit = serde_json::from_str(&json).unwrap();
        assert_eq!(event, deser);
    }

    #[test]
    fn test_reported_carries_ray_as_string() {
        let event = Reported {
            profit: 9,
            loss: 0,
            buffer_shares_minted: 10,
            buffer_shares_burned: 0,
            rate: Ray::from_ratio(11, 10).unwrap(),
            total_assets: 100,
            reported_at: 1_700_000_000,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"1100000000000000000000000000\""));
        let deser: Reported = serde_json::from_str(&json).unwrap();
        assert_eq!(event, deser);
    }

    #[test]
    fn test_vault_event_enum_variant() {
        let event = VaultEvent::RageQuitInitiated(RageQuitInitiated {
            holder: AccountId::new(),
            shares: 400,
            unlock_time: 604_800,
        });
        assert!(matches!(event, VaultEvent::RageQuitInitiated(_)));
    }

    #[test]
    fn test_mint_transfer_has_no_sender() {
        let event = Transfer {
            from: None,
            to: Some(AccountId::new()),
            shares: 10,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"from\":null"));
    }
}
