//! Yield-skimming strategy: value-debt ledger and conversion engine
//!
//! While solvent, one share is one unit of asset *value* (`assets * rate`).
//! Appreciation of the underlying is skimmed into the buffer account as new
//! shares at settlement; depreciation burns buffer shares first. Whatever
//! the buffer cannot absorb leaves the ledger insolvent, and conversions then
//! fall back to pro-rata so ordinary holders share the shortfall.
//!
//! All state-changing operations:
//! 1. read a fresh rate and classify solvency once ([`Pricing`])
//! 2. validate every precondition
//! 3. move assets through the custodian (all-or-nothing)
//! 4. commit ledger writes that can no longer fail
//!
//! Rounding always favors the vault: shares out and assets out round down,
//! shares in and assets in round up.

mod governance;
mod report;

pub use report::ReportOutcome;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use types::errors::MathError;
use types::ids::{AccountId, AssetId};
use types::numeric::{apply_bps, mul_div, Ray, Rounding, MAX_BPS};
use types::time::Timestamp;

use crate::asset::AssetCustodian;
use crate::config::StrategyConfig;
use crate::errors::{ConfigError, StrategyError};
use crate::events::{Deposit, Transfer, VaultEvent, Withdraw};
use crate::ledger::{HolderKind, ShareLedger};
use crate::oracle::{normalized_rate, ExchangeRateOracle};
use crate::security::{AccessControl, ShutdownGuard};
use crate::timelock::DelayedChange;

/// Default loss tolerance for `withdraw`: none.
pub const DEFAULT_WITHDRAW_MAX_LOSS: u16 = 0;
/// Default loss tolerance for `redeem`: any.
pub const DEFAULT_REDEEM_MAX_LOSS: u16 = MAX_BPS;

/// Accounts a strategy is created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyRoles {
    pub management: AccountId,
    pub keeper: AccountId,
    pub buffer: AccountId,
}

/// Rate and solvency observed once at the start of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pricing {
    pub rate: Ray,
    /// `total_assets * rate`, rounded down
    pub vault_value: u128,
    pub user_debt: u128,
    pub insolvent: bool,
}

/// Serializable view of a strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategySnapshot {
    pub name: String,
    pub asset: AssetId,
    pub total_assets: u128,
    pub total_supply: u128,
    pub buffer_account: AccountId,
    pub buffer_shares: u128,
    pub user_debt: u128,
    pub vault_value: u128,
    pub current_rate: Ray,
    pub last_reported_rate: Ray,
    pub last_report: Timestamp,
    pub insolvent: bool,
    pub enable_burning: bool,
    pub shutdown: bool,
    /// Assets redeemable for one whole share (18 decimals)
    pub price_per_share: Option<Decimal>,
}

/// Tokenized strategy over an appreciating asset.
#[derive(Debug, Clone)]
pub struct YieldSkimmingStrategy<O, A> {
    name: String,
    asset: AssetId,
    ledger: ShareLedger,
    total_assets: u128,
    enable_burning: bool,
    last_reported_rate: Ray,
    last_report: Timestamp,
    buffer_change: DelayedChange<AccountId>,
    access: AccessControl,
    shutdown: ShutdownGuard,
    oracle: O,
    custodian: A,
    events: Vec<VaultEvent>,
}

impl<O: ExchangeRateOracle, A: AssetCustodian> YieldSkimmingStrategy<O, A> {
    /// Build a strategy. The keeper role is granted on top of management.
    pub fn new(
        config: StrategyConfig,
        roles: StrategyRoles,
        oracle: O,
        custodian: A,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        if roles.buffer == roles.management {
            return Err(ConfigError::Invalid {
                field: "buffer",
                reason: "buffer account must differ from management".to_string(),
            });
        }

        let mut access = AccessControl::new(roles.management);
        if roles.keeper != roles.management {
            access.grant_keeper(&roles.management, roles.keeper);
        }

        info!(
            name = %config.name,
            asset = %custodian.asset(),
            buffer = %roles.buffer,
            enable_burning = config.enable_burning,
            "Strategy initialized"
        );

        Ok(Self {
            name: config.name,
            asset: custodian.asset().clone(),
            ledger: ShareLedger::new(roles.buffer),
            total_assets: 0,
            enable_burning: config.enable_burning,
            last_reported_rate: Ray::zero(),
            last_report: 0,
            buffer_change: DelayedChange::new(roles.buffer, config.buffer_change_cooldown),
            access,
            shutdown: ShutdownGuard::new(),
            oracle,
            custodian,
            events: Vec::new(),
        })
    }

    // ───────────────────────── Queries ─────────────────────────

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn asset(&self) -> &AssetId {
        &self.asset
    }

    pub fn total_assets(&self) -> u128 {
        self.total_assets
    }

    pub fn total_supply(&self) -> u128 {
        self.ledger.total_supply()
    }

    pub fn balance_of(&self, holder: &AccountId) -> u128 {
        self.ledger.balance_of(holder)
    }

    pub fn allowance(&self, owner: &AccountId, spender: &AccountId) -> u128 {
        self.ledger.allowance(owner, spender)
    }

    pub fn kind_of(&self, holder: &AccountId) -> HolderKind {
        self.ledger.kind_of(holder)
    }

    pub fn buffer_account(&self) -> &AccountId {
        self.ledger.buffer_account()
    }

    pub fn buffer_balance(&self) -> u128 {
        self.ledger.buffer_shares()
    }

    /// `total_supply - balance_of(buffer)`
    pub fn user_debt(&self) -> u128 {
        self.ledger.user_debt()
    }

    pub fn enable_burning(&self) -> bool {
        self.enable_burning
    }

    pub fn last_reported_rate(&self) -> Ray {
        self.last_reported_rate
    }

    pub fn last_report(&self) -> Timestamp {
        self.last_report
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.is_shutdown()
    }

    pub fn management(&self) -> &AccountId {
        self.access.management()
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    pub fn custodian(&self) -> &A {
        &self.custodian
    }

    /// Direct custodian access for hosts simulating external balance changes.
    pub fn custodian_mut(&mut self) -> &mut A {
        &mut self.custodian
    }

    /// Sanity check of the share ledger.
    pub fn check_invariant(&self) -> bool {
        self.ledger.check_invariant()
    }

    pub fn current_rate(&self) -> Result<Ray, StrategyError> {
        normalized_rate(&self.oracle)
    }

    pub fn pricing(&self) -> Result<Pricing, StrategyError> {
        let rate = self.current_rate()?;
        let vault_value = rate.value_of(self.total_assets, Rounding::Floor)?;
        let user_debt = self.ledger.user_debt();
        Ok(Pricing {
            rate,
            vault_value,
            user_debt,
            insolvent: user_debt > 0 && vault_value < user_debt,
        })
    }

    /// `user_debt > 0 && total_assets * rate < user_debt`
    pub fn is_vault_insolvent(&self) -> Result<bool, StrategyError> {
        Ok(self.pricing()?.insolvent)
    }

    pub fn vault_value(&self) -> Result<u128, StrategyError> {
        Ok(self.pricing()?.vault_value)
    }

    pub fn convert_to_shares(&self, assets: u128) -> Result<u128, StrategyError> {
        let pricing = self.pricing()?;
        self.to_shares(assets, Rounding::Floor, &pricing)
    }

    pub fn convert_to_assets(&self, shares: u128) -> Result<u128, StrategyError> {
        let pricing = self.pricing()?;
        self.to_assets(shares, Rounding::Floor, &pricing)
    }

    pub fn preview_deposit(&self, assets: u128) -> Result<u128, StrategyError> {
        self.convert_to_shares(assets)
    }

    pub fn preview_mint(&self, shares: u128) -> Result<u128, StrategyError> {
        let pricing = self.pricing()?;
        self.to_assets(shares, Rounding::Ceil, &pricing)
    }

    pub fn preview_withdraw(&self, assets: u128) -> Result<u128, StrategyError> {
        let pricing = self.pricing()?;
        self.to_shares(assets, Rounding::Ceil, &pricing)
    }

    pub fn preview_redeem(&self, shares: u128) -> Result<u128, StrategyError> {
        self.convert_to_assets(shares)
    }

    pub fn max_deposit(&self, receiver: &AccountId) -> Result<u128, StrategyError> {
        let pricing = self.pricing()?;
        if self.deposits_blocked(receiver, &pricing) {
            return Ok(0);
        }
        Ok(u128::MAX - self.total_assets)
    }

    pub fn max_mint(&self, receiver: &AccountId) -> Result<u128, StrategyError> {
        let pricing = self.pricing()?;
        if self.deposits_blocked(receiver, &pricing) {
            return Ok(0);
        }
        Ok(u128::MAX - self.ledger.total_supply())
    }

    pub fn max_redeem(&self, owner: &AccountId) -> Result<u128, StrategyError> {
        let pricing = self.pricing()?;
        Ok(self.max_redeem_at(owner, &pricing))
    }

    pub fn max_withdraw(&self, owner: &AccountId) -> Result<u128, StrategyError> {
        let pricing = self.pricing()?;
        self.max_withdraw_at(owner, &pricing)
    }

    /// Assets per whole share (1e18 base units) as a decimal.
    pub fn price_per_share(&self) -> Result<Option<Decimal>, StrategyError> {
        let pricing = self.pricing()?;
        let assets = self.to_assets(1_000_000_000_000_000_000, Rounding::Floor, &pricing)?;
        Ok(i128::try_from(assets)
            .ok()
            .and_then(|a| Decimal::try_from_i128_with_scale(a, 18).ok())
            .map(|d| d.normalize()))
    }

    pub fn snapshot(&self) -> Result<StrategySnapshot, StrategyError> {
        let pricing = self.pricing()?;
        Ok(StrategySnapshot {
            name: self.name.clone(),
            asset: self.asset.clone(),
            total_assets: self.total_assets,
            total_supply: self.ledger.total_supply(),
            buffer_account: *self.ledger.buffer_account(),
            buffer_shares: self.ledger.buffer_shares(),
            user_debt: pricing.user_debt,
            vault_value: pricing.vault_value,
            current_rate: pricing.rate,
            last_reported_rate: self.last_reported_rate,
            last_report: self.last_report,
            insolvent: pricing.insolvent,
            enable_burning: self.enable_burning,
            shutdown: self.shutdown.is_shutdown(),
            price_per_share: self.price_per_share()?,
        })
    }

    // ───────────────────────── Deposit / Mint ─────────────────────────

    /// Deposit `assets` from `caller`, minting `assets * rate` shares to `receiver`.
    pub fn deposit(
        &mut self,
        caller: AccountId,
        assets: u128,
        receiver: AccountId,
    ) -> Result<u128, StrategyError> {
        let pricing = self.check_deposit_allowed(&receiver)?;
        let shares = self.to_shares(assets, Rounding::Floor, &pricing)?;
        if shares == 0 {
            return Err(StrategyError::ZeroShares);
        }
        self.execute_deposit(caller, receiver, assets, shares, &pricing)?;
        Ok(shares)
    }

    /// Mint exactly `shares` to `receiver`, pulling `ceil(shares / rate)` assets.
    pub fn mint(
        &mut self,
        caller: AccountId,
        shares: u128,
        receiver: AccountId,
    ) -> Result<u128, StrategyError> {
        let pricing = self.check_deposit_allowed(&receiver)?;
        let assets = self.to_assets(shares, Rounding::Ceil, &pricing)?;
        if assets == 0 {
            return Err(StrategyError::ZeroAssets);
        }
        self.execute_deposit(caller, receiver, assets, shares, &pricing)?;
        Ok(assets)
    }

    fn check_deposit_allowed(&self, receiver: &AccountId) -> Result<Pricing, StrategyError> {
        if self.shutdown.is_shutdown() {
            return Err(StrategyError::Shutdown);
        }
        if self.ledger.kind_of(receiver) == HolderKind::Buffer {
            return Err(StrategyError::BufferReceiver);
        }
        let pricing = self.pricing()?;
        if pricing.insolvent {
            warn!(
                user_debt = pricing.user_debt,
                vault_value = pricing.vault_value,
                "Deposit rejected: vault insolvent"
            );
            return Err(StrategyError::InsolventVault);
        }
        Ok(pricing)
    }

    fn execute_deposit(
        &mut self,
        caller: AccountId,
        receiver: AccountId,
        assets: u128,
        shares: u128,
        pricing: &Pricing,
    ) -> Result<(), StrategyError> {
        let max_deposit = u128::MAX - self.total_assets;
        if assets > max_deposit {
            return Err(StrategyError::ExceedsMaxDeposit {
                requested: assets,
                max: max_deposit,
            });
        }
        let max_mint = u128::MAX - self.ledger.total_supply();
        if shares > max_mint {
            return Err(StrategyError::ExceedsMaxMint {
                requested: shares,
                max: max_mint,
            });
        }

        self.custodian.pull(&caller, assets)?;
        self.ledger.mint(&receiver, shares)?;
        self.total_assets += assets;
        if self.last_reported_rate.is_zero() {
            self.last_reported_rate = pricing.rate;
        }

        debug!(%caller, %receiver, assets, shares, rate = %pricing.rate, "Deposit");
        self.events.push(VaultEvent::Transfer(Transfer {
            from: None,
            to: Some(receiver),
            shares,
        }));
        self.events.push(VaultEvent::Deposit(Deposit {
            caller,
            owner: receiver,
            assets,
            shares,
        }));
        Ok(())
    }

    // ───────────────────────── Withdraw / Redeem ─────────────────────────

    /// Withdraw exactly `assets` to `receiver`, burning the shares they cost.
    ///
    /// `max_loss` is in basis points of the value-based entitlement of the
    /// burned shares; it only bites while insolvent.
    pub fn withdraw(
        &mut self,
        caller: AccountId,
        assets: u128,
        receiver: AccountId,
        owner: AccountId,
        max_loss: u16,
    ) -> Result<u128, StrategyError> {
        check_max_loss(max_loss)?;
        let pricing = self.pricing()?;
        self.check_buffer_open(&owner, &pricing)?;

        let max = self.max_withdraw_at(&owner, &pricing)?;
        if assets > max {
            return Err(StrategyError::ExceedsMaxWithdraw { requested: assets, max });
        }
        let shares = self.to_shares(assets, Rounding::Ceil, &pricing)?;
        if shares == 0 {
            return Err(StrategyError::ZeroShares);
        }
        self.execute_withdraw(caller, receiver, owner, assets, shares, max_loss, &pricing)?;
        Ok(shares)
    }

    /// Burn exactly `shares` of `owner`, sending the assets to `receiver`.
    pub fn redeem(
        &mut self,
        caller: AccountId,
        shares: u128,
        receiver: AccountId,
        owner: AccountId,
        max_loss: u16,
    ) -> Result<u128, StrategyError> {
        check_max_loss(max_loss)?;
        let pricing = self.pricing()?;
        self.check_buffer_open(&owner, &pricing)?;

        let max = self.max_redeem_at(&owner, &pricing);
        if shares > max {
            return Err(StrategyError::ExceedsMaxRedeem { requested: shares, max });
        }
        let assets = self.to_assets(shares, Rounding::Floor, &pricing)?;
        if assets == 0 {
            return Err(StrategyError::ZeroAssets);
        }
        self.execute_withdraw(caller, receiver, owner, assets, shares, max_loss, &pricing)?;
        Ok(assets)
    }

    #[allow(clippy::too_many_arguments)]
    fn execute_withdraw(
        &mut self,
        caller: AccountId,
        receiver: AccountId,
        owner: AccountId,
        assets: u128,
        shares: u128,
        max_loss: u16,
        pricing: &Pricing,
    ) -> Result<(), StrategyError> {
        self.ledger.check_allowance(&owner, &caller, shares)?;
        let balance = self.ledger.balance_of(&owner);
        if balance < shares {
            return Err(StrategyError::InsufficientBalance {
                required: shares,
                available: balance,
            });
        }
        let new_total_assets = self
            .total_assets
            .checked_sub(assets)
            .ok_or(MathError::Underflow { context: "total assets" })?;

        if self.ledger.kind_of(&owner) == HolderKind::Buffer {
            // Buffer shares are not part of user debt, so debt is unchanged.
            let remaining_value = pricing.rate.value_of(new_total_assets, Rounding::Floor)?;
            if remaining_value < pricing.user_debt {
                return Err(StrategyError::BufferSolvency {
                    required: pricing.user_debt,
                    available: remaining_value,
                });
            }
        }

        let entitled = pricing.rate.assets_for(shares, Rounding::Floor)?;
        if assets < entitled {
            let tolerated = apply_bps(entitled, max_loss, Rounding::Floor)?;
            if entitled - assets > tolerated {
                return Err(StrategyError::TooMuchLoss {
                    expected: entitled,
                    actual: assets,
                });
            }
        }

        self.custodian.push(&receiver, assets)?;
        self.ledger.spend_allowance(&owner, &caller, shares)?;
        self.ledger.burn(&owner, shares)?;
        self.total_assets = new_total_assets;

        debug!(
            %caller, %receiver, %owner, assets, shares,
            insolvent = pricing.insolvent,
            "Withdraw"
        );
        self.events.push(VaultEvent::Transfer(Transfer {
            from: Some(owner),
            to: None,
            shares,
        }));
        self.events.push(VaultEvent::Withdraw(Withdraw {
            caller,
            receiver,
            owner,
            assets,
            shares,
        }));
        Ok(())
    }

    // ───────────────────────── Transfers ─────────────────────────

    pub fn transfer(&mut self, from: AccountId, to: AccountId, shares: u128) -> Result<(), StrategyError> {
        self.check_transfer(&from, &to, shares)?;
        self.ledger.move_shares(&from, &to, shares)?;
        self.record_transfer(from, to, shares);
        Ok(())
    }

    pub fn transfer_from(
        &mut self,
        spender: AccountId,
        from: AccountId,
        to: AccountId,
        shares: u128,
    ) -> Result<(), StrategyError> {
        self.ledger.check_allowance(&from, &spender, shares)?;
        self.check_transfer(&from, &to, shares)?;
        self.ledger.move_shares(&from, &to, shares)?;
        self.ledger.spend_allowance(&from, &spender, shares)?;
        self.record_transfer(from, to, shares);
        Ok(())
    }

    pub fn approve(&mut self, owner: AccountId, spender: AccountId, shares: u128) {
        self.ledger.approve(owner, spender, shares);
        self.events.push(VaultEvent::Approval { owner, spender, shares });
    }

    /// Transfer preconditions, including the buffer solvency rules.
    ///
    /// Buffer -> holder turns buffer claims into user debt, so the new debt
    /// must stay backed. Holder -> buffer is refused while insolvent so that
    /// a deficit cannot be hidden by shrinking user debt.
    pub fn check_transfer(&self, from: &AccountId, to: &AccountId, shares: u128) -> Result<(), StrategyError> {
        let from_kind = self.ledger.kind_of(from);
        let to_kind = self.ledger.kind_of(to);
        if from_kind == HolderKind::Buffer && to_kind == HolderKind::Buffer {
            return Err(StrategyError::BufferSelfTransfer);
        }
        let balance = self.ledger.balance_of(from);
        if balance < shares {
            return Err(StrategyError::InsufficientBalance {
                required: shares,
                available: balance,
            });
        }
        if from_kind == HolderKind::Ordinary && to_kind == HolderKind::Ordinary {
            return Ok(());
        }

        let pricing = self.pricing()?;
        if pricing.insolvent {
            return Err(StrategyError::InsolventVault);
        }
        let post_debt = if from_kind == HolderKind::Buffer {
            pricing
                .user_debt
                .checked_add(shares)
                .ok_or(MathError::Overflow { context: "user debt" })?
        } else {
            pricing.user_debt - shares
        };
        if post_debt > pricing.vault_value {
            return Err(StrategyError::BufferSolvency {
                required: post_debt,
                available: pricing.vault_value,
            });
        }
        Ok(())
    }

    fn record_transfer(&mut self, from: AccountId, to: AccountId, shares: u128) {
        debug!(%from, %to, shares, "Transfer");
        self.events.push(VaultEvent::Transfer(Transfer {
            from: Some(from),
            to: Some(to),
            shares,
        }));
    }

    // ───────────────────────── Events ─────────────────────────

    pub fn events(&self) -> &[VaultEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<VaultEvent> {
        std::mem::take(&mut self.events)
    }

    // ───────────────────────── Conversion internals ─────────────────────────

    fn to_shares(&self, assets: u128, rounding: Rounding, pricing: &Pricing) -> Result<u128, StrategyError> {
        if !pricing.insolvent {
            return Ok(pricing.rate.value_of(assets, rounding)?);
        }
        let supply = self.ledger.total_supply();
        Ok(mul_div(assets, supply, self.total_assets, rounding)?)
    }

    fn to_assets(&self, shares: u128, rounding: Rounding, pricing: &Pricing) -> Result<u128, StrategyError> {
        if !pricing.insolvent {
            return Ok(pricing.rate.assets_for(shares, rounding)?);
        }
        // Insolvent implies user debt > 0, hence supply > 0.
        let supply = self.ledger.total_supply();
        Ok(mul_div(shares, self.total_assets, supply, rounding)?)
    }

    fn deposits_blocked(&self, receiver: &AccountId, pricing: &Pricing) -> bool {
        self.shutdown.is_shutdown()
            || pricing.insolvent
            || self.ledger.kind_of(receiver) == HolderKind::Buffer
    }

    fn check_buffer_open(&self, owner: &AccountId, pricing: &Pricing) -> Result<(), StrategyError> {
        if pricing.insolvent && self.ledger.kind_of(owner) == HolderKind::Buffer {
            return Err(StrategyError::InsolventVault);
        }
        Ok(())
    }

    fn max_redeem_at(&self, owner: &AccountId, pricing: &Pricing) -> u128 {
        let balance = self.ledger.balance_of(owner);
        match self.ledger.kind_of(owner) {
            HolderKind::Ordinary => balance,
            HolderKind::Buffer if pricing.insolvent => 0,
            HolderKind::Buffer if self.enable_burning => {
                balance.min(pricing.vault_value.saturating_sub(pricing.user_debt))
            }
            HolderKind::Buffer => balance,
        }
    }

    fn max_withdraw_at(&self, owner: &AccountId, pricing: &Pricing) -> Result<u128, StrategyError> {
        let shares = self.max_redeem_at(owner, pricing);
        let assets = self.to_assets(shares, Rounding::Floor, pricing)?;
        Ok(assets.min(self.total_assets))
    }
}

fn check_max_loss(max_loss: u16) -> Result<(), StrategyError> {
    if max_loss > MAX_BPS {
        return Err(StrategyError::InvalidMaxLoss(max_loss));
    }
    Ok(())
}
