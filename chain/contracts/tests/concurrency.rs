//! Concurrency test
//!
//! Many threads drive one strategy through `SharedVault`. Every operation is
//! serialized, so share supply and asset balances must reconcile exactly.

use std::sync::Arc;
use std::thread;

use skim_vault::asset::{AssetCustodian, InMemoryAsset};
use skim_vault::config::StrategyConfig;
use skim_vault::errors::StrategyError;
use skim_vault::oracle::ManualRateOracle;
use skim_vault::{SharedVault, StrategyRoles, YieldSkimmingStrategy};
use types::ids::{AccountId, AssetId};
use types::numeric::Ray;

type TestStrategy = YieldSkimmingStrategy<Arc<ManualRateOracle>, InMemoryAsset>;

fn setup(users: &[AccountId]) -> (SharedVault<TestStrategy>, Arc<ManualRateOracle>, StrategyRoles) {
    let roles = StrategyRoles {
        management: AccountId::new(),
        keeper: AccountId::new(),
        buffer: AccountId::new(),
    };
    let mut asset = InMemoryAsset::new(AssetId::new("wstETH"));
    for user in users {
        asset.fund(*user, 1_000_000).unwrap();
    }
    let oracle = Arc::new(ManualRateOracle::from_ray(Ray::one()));
    let strategy =
        YieldSkimmingStrategy::new(StrategyConfig::default(), roles, Arc::clone(&oracle), asset).unwrap();
    (SharedVault::new(strategy), oracle, roles)
}

#[test]
fn test_concurrent_deposits_and_redeems() {
    let users: Vec<AccountId> = (0..8).map(|_| AccountId::new()).collect();
    let (shared, _, _) = setup(&users);

    let handles: Vec<_> = users
        .iter()
        .map(|user| {
            let shared = shared.clone();
            let user = *user;
            thread::spawn(move || {
                for _ in 0..250 {
                    shared.apply(|s| s.deposit(user, 100, user)).unwrap();
                }
                for _ in 0..50 {
                    shared.apply(|s| s.redeem(user, 100, user, user, 0)).unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    shared.read(|s| {
        assert_eq!(s.total_supply(), 8 * 200 * 100);
        assert_eq!(s.total_assets(), 8 * 200 * 100);
        assert_eq!(s.custodian().balance_of_vault(), s.total_assets());
        assert!(s.check_invariant());
        for user in &users {
            assert_eq!(s.balance_of(user), 20_000);
        }
    });
}

#[test]
fn test_reports_interleaved_with_deposits() {
    let users: Vec<AccountId> = (0..4).map(|_| AccountId::new()).collect();
    let (shared, oracle, roles) = setup(&users);

    let keeper = {
        let shared = shared.clone();
        let oracle = Arc::clone(&oracle);
        thread::spawn(move || {
            for step in 1..=50u128 {
                oracle.set_ray(Ray::from_ratio(1_000 + step, 1_000).unwrap());
                shared.transact(|s| s.report(roles.keeper, step as i64)).unwrap();
            }
        })
    };

    let depositors: Vec<_> = users
        .iter()
        .map(|user| {
            let shared = shared.clone();
            let user = *user;
            thread::spawn(move || {
                for _ in 0..100 {
                    shared.transact(|s| s.deposit(user, 1_000, user)).unwrap();
                }
            })
        })
        .collect();

    keeper.join().unwrap();
    for handle in depositors {
        handle.join().unwrap();
    }

    shared.read(|s| {
        // Rate only rose, so the vault never dipped below user debt.
        assert!(!s.is_vault_insolvent().unwrap());
        assert!(s.vault_value().unwrap() >= s.user_debt());
        assert!(s.check_invariant());
        assert_eq!(s.total_assets(), 4 * 100 * 1_000);
    });
}

#[test]
fn test_failed_single_operation_writes_nothing() {
    let users: Vec<AccountId> = (0..1).map(|_| AccountId::new()).collect();
    let (shared, _, _) = setup(&users);
    let alice = users[0];
    shared.apply(|s| s.deposit(alice, 500, alice)).unwrap();
    let before = shared.read(|s| s.snapshot().unwrap());

    let result = shared.apply(|s| s.redeem(alice, 501, alice, alice, 0));
    assert!(result.is_err());
    let result = shared.apply(|s| s.deposit(alice, 2_000_000, alice));
    assert!(result.is_err());

    shared.read(|s| {
        assert_eq!(s.snapshot().unwrap(), before);
        assert_eq!(s.custodian().balance_of(&alice), 1_000_000 - 500);
        assert_eq!(s.events().len(), 2);
    });
}

#[test]
fn test_failed_batch_is_not_observable() {
    let users: Vec<AccountId> = (0..2).map(|_| AccountId::new()).collect();
    let (shared, _, _) = setup(&users);
    let (alice, bob) = (users[0], users[1]);

    shared.transact(|s| s.deposit(alice, 500, alice)).unwrap();

    // Deposit succeeds, then the transfer fails: the whole batch rolls back.
    let result = shared.transact(|s| {
        s.deposit(bob, 100, bob)?;
        s.transfer(bob, alice, 101)
    });
    assert!(matches!(result, Err(StrategyError::InsufficientBalance { .. })));

    shared.read(|s| {
        assert_eq!(s.balance_of(&bob), 0);
        assert_eq!(s.total_supply(), 500);
        assert_eq!(s.custodian().balance_of(&bob), 1_000_000);
    });
}
