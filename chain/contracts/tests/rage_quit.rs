//! Rage Quit Tests
//!
//! Custody lock manager over a yield-skimming strategy:
//! - Exclusivity of custody entries
//! - Partial withdrawals and monotonic decrease
//! - Cooldown captured at initiation time
//! - Transfer cap on locked holders
//! - Buffer account and management through the wrapper
//! - Fuzz testing (proptest)

use std::sync::Arc;

use skim_vault::asset::InMemoryAsset;
use skim_vault::config::{LockedVaultConfig, StrategyConfig, BUFFER_CHANGE_COOLDOWN};
use skim_vault::custody::CustodyState;
use skim_vault::errors::{CustodyError, StrategyError, TimelockError};
use skim_vault::events::VaultEvent;
use skim_vault::oracle::ManualRateOracle;
use skim_vault::{LockedVault, StrategyRoles, YieldSkimmingStrategy};
use types::ids::{AccountId, AssetId};
use types::numeric::{Ray, MAX_BPS};
use types::time::{Timestamp, DAY};

const T0: Timestamp = 1_750_000_000;

type Vault = LockedVault<YieldSkimmingStrategy<Arc<ManualRateOracle>, InMemoryAsset>>;

// ═══════════════════════════════════════════════════════════════════
// Custody lifecycle
// ═══════════════════════════════════════════════════════════════════

#[test]
fn test_custody_exclusive_until_exhausted() {
    let (mut vault, holders, _) = setup(1_000);
    let alice = holders[0];
    vault.initiate_rage_quit(alice, 100, T0).unwrap();
    assert_eq!(
        vault.initiate_rage_quit(alice, 1, T0 + DAY),
        Err(CustodyError::AlreadyActive)
    );

    let unlock = T0 + 7 * DAY;
    vault.redeem(alice, 100, alice, alice, MAX_BPS, unlock).unwrap();
    assert_eq!(vault.custody_state(&alice, unlock), CustodyState::NoCustody);

    // Fresh request permitted once the entry is gone.
    vault.initiate_rage_quit(alice, 50, unlock).unwrap();
}

#[test]
fn test_cancel_from_unlocked_partial() {
    let (mut vault, holders, _) = setup(1_000);
    let alice = holders[0];
    vault.initiate_rage_quit(alice, 300, T0).unwrap();
    vault.redeem(alice, 100, alice, alice, MAX_BPS, T0 + 7 * DAY).unwrap();
    assert_eq!(
        vault.custody_state(&alice, T0 + 7 * DAY),
        CustodyState::Unlocked { locked_shares: 200 }
    );

    assert_eq!(vault.cancel_rage_quit(alice).unwrap(), 200);
    assert_eq!(vault.max_redeem(&alice, T0 + 8 * DAY).unwrap(), 0);
    // Remaining 900 shares are freely transferable again.
    vault.transfer(alice, holders[1], 900).unwrap();
}

#[test]
fn test_cancel_without_custody() {
    let (mut vault, holders, _) = setup(1_000);
    assert_eq!(vault.cancel_rage_quit(holders[0]), Err(CustodyError::NoActiveCustody));
}

#[test]
fn test_third_party_redeem_consumes_owner_custody() {
    let (mut vault, holders, _) = setup(1_000);
    let (alice, bob) = (holders[0], holders[1]);
    vault.approve(alice, bob, 500);
    vault.initiate_rage_quit(alice, 500, T0).unwrap();
    vault.redeem(bob, 200, bob, alice, MAX_BPS, T0 + 7 * DAY).unwrap();
    assert_eq!(vault.custody_info(&alice).unwrap().locked_shares, 300);
    assert_eq!(vault.inner().custodian().balance_of(&bob), 1_000_000 - 1_000 + 200);
}

#[test]
fn test_failed_base_redeem_leaves_custody_intact() {
    let (mut vault, holders, _) = setup(1_000);
    let (alice, bob) = (holders[0], holders[1]);
    vault.initiate_rage_quit(alice, 500, T0).unwrap();
    // Bob has no allowance.
    assert!(matches!(
        vault.redeem(bob, 200, bob, alice, MAX_BPS, T0 + 7 * DAY),
        Err(CustodyError::Vault(_))
    ));
    assert_eq!(vault.custody_info(&alice).unwrap().locked_shares, 500);
}

// ═══════════════════════════════════════════════════════════════════
// Cooldown governance
// ═══════════════════════════════════════════════════════════════════

#[test]
fn test_cooldown_captured_at_initiation() {
    let (mut vault, holders, governance) = setup(1_000);
    let (alice, bob) = (holders[0], holders[1]);

    let effective = vault
        .propose_rage_quit_cooldown_period_change(governance, 14 * DAY, T0)
        .unwrap();
    assert_eq!(effective, T0 + 14 * DAY);

    // Inside the grace window: old 7-day period applies.
    let entry = vault.initiate_rage_quit(alice, 10, T0 + 10 * DAY).unwrap();
    assert_eq!(entry.unlock_time, T0 + 10 * DAY + 7 * DAY);

    assert!(matches!(
        vault.finalize_rage_quit_cooldown_period_change(T0 + 14 * DAY - 1),
        Err(CustodyError::Timelock(TimelockError::DelayNotElapsed { .. }))
    ));
    vault
        .finalize_rage_quit_cooldown_period_change(T0 + 14 * DAY + 1)
        .unwrap();

    let entry = vault.initiate_rage_quit(bob, 10, T0 + 14 * DAY + 1).unwrap();
    assert_eq!(entry.unlock_time, T0 + 14 * DAY + 1 + 14 * DAY);

    // Alice's lock is unaffected by the change.
    assert_eq!(vault.custody_info(&alice).unwrap().unlock_time, T0 + 17 * DAY);
}

#[test]
fn test_single_pending_proposal() {
    let (mut vault, _, governance) = setup(1_000);
    vault
        .propose_rage_quit_cooldown_period_change(governance, 10 * DAY, T0)
        .unwrap();
    assert_eq!(
        vault.propose_rage_quit_cooldown_period_change(governance, 12 * DAY, T0 + 1),
        Err(CustodyError::Timelock(TimelockError::AlreadyPending))
    );
}

#[test]
fn test_cooldown_events() {
    let (mut vault, _, governance) = setup(1_000);
    vault
        .propose_rage_quit_cooldown_period_change(governance, 2 * DAY, T0)
        .unwrap();
    vault
        .finalize_rage_quit_cooldown_period_change(T0 + 14 * DAY)
        .unwrap();
    let events = vault.drain_events();
    assert_eq!(
        events,
        vec![
            VaultEvent::CooldownChangeProposed {
                new_period: 2 * DAY,
                effective_at: T0 + 14 * DAY,
            },
            VaultEvent::CooldownChanged {
                old_period: 7 * DAY,
                new_period: 2 * DAY,
            },
        ]
    );
}

// ═══════════════════════════════════════════════════════════════════
// Transfer cap
// ═══════════════════════════════════════════════════════════════════

#[test]
fn test_transfer_cap_boundary() {
    let (mut vault, holders, _) = setup(1_000);
    let (alice, bob) = (holders[0], holders[1]);
    vault.initiate_rage_quit(alice, 400, T0).unwrap();

    assert_eq!(
        vault.transfer(alice, bob, 601),
        Err(CustodyError::TransferExceedsUnlocked { requested: 601, unlocked: 600 })
    );
    vault.transfer(alice, bob, 600).unwrap();
    assert_eq!(vault.inner().balance_of(&alice), 400);
    assert_eq!(vault.inner().balance_of(&bob), 1_600);
}

#[test]
fn test_locked_shares_cannot_be_laundered() {
    let (mut vault, holders, _) = setup(1_000);
    let (alice, bob) = (holders[0], holders[1]);
    vault.initiate_rage_quit(alice, 1_000, T0).unwrap();
    assert!(vault.transfer(alice, bob, 1).is_err());
    // Bob never rage-quit, so cannot exit either.
    assert_eq!(
        vault.redeem(bob, 1, bob, bob, MAX_BPS, T0 + 30 * DAY),
        Err(CustodyError::NoActiveCustody)
    );
}

// ═══════════════════════════════════════════════════════════════════
// Buffer account
// ═══════════════════════════════════════════════════════════════════

#[test]
fn test_buffer_cannot_rage_quit_and_settlement_keeps_custody_consistent() {
    let (mut vault, _, _, oracle, roles) = setup_full(1_000);
    let buffer = roles.buffer;

    oracle.set_ray(Ray::from_ratio(110, 100).unwrap());
    let outcome = vault.report(roles.keeper, T0).unwrap();
    assert_eq!(outcome.buffer_shares_minted, 300);

    assert_eq!(
        vault.initiate_rage_quit(buffer, 100, T0),
        Err(CustodyError::BufferAccount)
    );
    assert!(vault.custody_info(&buffer).is_none());

    // Loss burns half the buffer; no lock can outlive the balance.
    oracle.set_ray(Ray::from_ratio(105, 100).unwrap());
    let outcome = vault.report(roles.keeper, T0 + DAY).unwrap();
    assert_eq!(outcome.buffer_shares_burned, 150);
    assert_eq!(vault.inner().balance_of(&buffer), 150);
    assert!(vault.custody_info(&buffer).is_none());
}

#[test]
fn test_buffer_exits_follow_solvency_rules_not_custody() {
    let (mut vault, _, _, oracle, roles) = setup_full(1_000);
    let buffer = roles.buffer;
    oracle.set_ray(Ray::from_ratio(110, 100).unwrap());
    vault.report(roles.keeper, T0).unwrap();

    // Value 3300 against 3000 of user debt.
    assert_eq!(vault.max_redeem(&buffer, T0).unwrap(), 300);
    vault.redeem(buffer, 100, buffer, buffer, MAX_BPS, T0).unwrap();
    assert_eq!(vault.inner().balance_of(&buffer), 200);
    assert!(matches!(
        vault.redeem(buffer, 201, buffer, buffer, MAX_BPS, T0),
        Err(CustodyError::Vault(_))
    ));
}

#[test]
fn test_buffer_change_refused_while_incoming_account_in_custody() {
    let (mut vault, holders, _, oracle, roles) = setup_full(1_000);
    let alice = holders[0];
    oracle.set_ray(Ray::from_ratio(110, 100).unwrap());
    vault.report(roles.keeper, T0).unwrap();

    vault.initiate_rage_quit(alice, 100, T0).unwrap();
    vault.propose_buffer_change(roles.management, alice, T0).unwrap();
    let ready = T0 + BUFFER_CHANGE_COOLDOWN;
    assert_eq!(vault.finalize_buffer_change(ready), Err(CustodyError::BufferInCustody));

    // Cancelling custody is not enough: alice still holds ordinary shares.
    vault.cancel_rage_quit(alice).unwrap();
    assert_eq!(
        vault.finalize_buffer_change(ready),
        Err(CustodyError::Vault(StrategyError::BufferHoldsShares { shares: 1_000 }))
    );

    vault.cancel_buffer_change(roles.management, T0 + DAY).unwrap();
    let fresh = AccountId::new();
    vault.propose_buffer_change(roles.management, fresh, T0 + DAY).unwrap();
    assert_eq!(vault.finalize_buffer_change(T0 + DAY + BUFFER_CHANGE_COOLDOWN).unwrap(), fresh);
    assert_eq!(vault.inner().balance_of(&fresh), 300);
    assert_eq!(
        vault.initiate_rage_quit(fresh, 1, T0 + 20 * DAY),
        Err(CustodyError::BufferAccount)
    );
}

// ═══════════════════════════════════════════════════════════════════
// Management through the wrapper
// ═══════════════════════════════════════════════════════════════════

#[test]
fn test_management_operations_reach_strategy() {
    let (mut vault, holders, _, oracle, roles) = setup_full(1_000);
    let alice = holders[0];

    assert_eq!(vault.preview_mint(100).unwrap(), 100);
    assert_eq!(vault.mint(alice, 100, alice).unwrap(), 100);
    assert_eq!(vault.snapshot().unwrap().total_supply, 3_100);

    let keeper = AccountId::new();
    assert_eq!(vault.grant_keeper(alice, keeper), Err(StrategyError::Unauthorized));
    vault.grant_keeper(roles.management, keeper).unwrap();
    oracle.set_ray(Ray::from_ratio(110, 100).unwrap());
    vault.report(keeper, T0).unwrap();
    vault.revoke_keeper(roles.management, keeper).unwrap();
    assert_eq!(vault.report(keeper, T0 + 1), Err(StrategyError::Unauthorized));

    vault.set_enable_burning(roles.management, false).unwrap();
    assert!(!vault.inner().enable_burning());

    let successor = AccountId::new();
    vault.transfer_management(roles.management, successor).unwrap();
    assert_eq!(vault.shutdown_strategy(roles.management), Err(StrategyError::Unauthorized));
    vault.shutdown_strategy(successor).unwrap();
    assert_eq!(
        vault.deposit(alice, 10, alice),
        Err(CustodyError::Vault(StrategyError::Shutdown))
    );
}

// ═══════════════════════════════════════════════════════════════════
// Fuzz Testing
// ═══════════════════════════════════════════════════════════════════

mod fuzz {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Invariant: initiation always fails while an entry exists.
        #[test]
        fn fuzz_custody_exclusivity(first in 1u128..=1_000, second in 0u128..=2_000, later in 0i64..60 * DAY) {
            let (mut vault, holders, _) = setup(1_000);
            vault.initiate_rage_quit(holders[0], first, T0).unwrap();
            prop_assert_eq!(
                vault.initiate_rage_quit(holders[0], second, T0 + later),
                Err(CustodyError::AlreadyActive)
            );
        }

        /// Invariant: partial exits strictly decrease the lock, never exceed
        /// it in aggregate, and remove the entry once exhausted.
        #[test]
        fn fuzz_custody_monotonicity(locked in 1u128..=1_000, chunks in prop::collection::vec(1u128..=300, 1..20)) {
            let (mut vault, holders, _) = setup(1_000);
            let alice = holders[0];
            let unlock = T0 + 7 * DAY;
            vault.initiate_rage_quit(alice, locked, T0).unwrap();

            let mut withdrawn = 0u128;
            for chunk in chunks {
                let before = vault.custody_info(&alice).map_or(0, |e| e.locked_shares);
                let result = vault.redeem(alice, chunk, alice, alice, MAX_BPS, unlock);
                if withdrawn + chunk <= locked {
                    prop_assert!(result.is_ok());
                    withdrawn += chunk;
                    let after = vault.custody_info(&alice).map_or(0, |e| e.locked_shares);
                    prop_assert!(after < before);
                } else {
                    prop_assert!(result.is_err());
                }
                prop_assert!(withdrawn <= locked);
            }
            prop_assert_eq!(vault.custody_info(&alice).is_none(), withdrawn == locked);
        }

        /// Invariant: transfers by a locked holder never dip into custody.
        #[test]
        fn fuzz_transfer_cap(locked in 1u128..=1_000, amount in 0u128..=1_000) {
            let (mut vault, holders, _) = setup(1_000);
            let (alice, bob) = (holders[0], holders[1]);
            vault.initiate_rage_quit(alice, locked, T0).unwrap();
            let result = vault.transfer(alice, bob, amount);
            prop_assert_eq!(result.is_ok(), amount <= 1_000 - locked);
            prop_assert!(vault.inner().balance_of(&alice) >= locked);
        }
    }
}

// ═══════════════════════════════════════════════════════════════════
// Helpers
// ═══════════════════════════════════════════════════════════════════

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn setup(each: u128) -> (Vault, Vec<AccountId>, AccountId) {
    let (vault, holders, governance, _, _) = setup_full(each);
    (vault, holders, governance)
}

/// Locked vault at rate 1.0 where each of three holders deposited `each`.
fn setup_full(each: u128) -> (Vault, Vec<AccountId>, AccountId, Arc<ManualRateOracle>, StrategyRoles) {
    init_tracing();
    let governance = AccountId::new();
    let holders: Vec<AccountId> = (0..3).map(|_| AccountId::new()).collect();
    let mut asset = InMemoryAsset::new(AssetId::new("sUSDS"));
    for holder in &holders {
        asset.fund(*holder, 1_000_000).unwrap();
    }
    let roles = StrategyRoles {
        management: AccountId::new(),
        keeper: AccountId::new(),
        buffer: AccountId::new(),
    };
    let oracle = Arc::new(ManualRateOracle::from_ray(Ray::one()));
    let strategy =
        YieldSkimmingStrategy::new(StrategyConfig::default(), roles, Arc::clone(&oracle), asset).unwrap();
    let mut vault = LockedVault::new(strategy, governance, LockedVaultConfig::default()).unwrap();
    for holder in &holders {
        vault.deposit(*holder, each, *holder).unwrap();
    }
    (vault, holders, governance, oracle, roles)
}
