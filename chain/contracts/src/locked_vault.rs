//! Locked vault: rage-quit custody over a base vault
//!
//! Wraps any [`BaseVault`] and gates its exits: a holder must first lock
//! shares with `initiate_rage_quit`, wait out the cooldown active at that
//! moment, and may then withdraw or redeem up to the locked amount. Locked
//! shares cannot be transferred away while custody is open.
//!
//! The cooldown itself changes through a [`DelayedChange`]: governance
//! proposes and may cancel, anyone finalizes once the grace window has run.

use tracing::{debug, info};
use types::ids::AccountId;
use types::time::{Seconds, Timestamp};

use crate::asset::AssetCustodian;
use crate::config::{cooldown_in_range, LockedVaultConfig};
use crate::custody::{CustodyBook, CustodyEntry, CustodyState};
use crate::errors::{ConfigError, CustodyError, StrategyError, TimelockError};
use crate::events::{CustodyConsumed, RageQuitInitiated, VaultEvent};
use crate::ledger::HolderKind;
use crate::oracle::ExchangeRateOracle;
use crate::security::GovernanceAuthority;
use crate::strategy::{ReportOutcome, StrategySnapshot, YieldSkimmingStrategy};
use crate::timelock::DelayedChange;

/// Share vault operations the locked vault builds on.
///
/// `withdraw` must burn exactly `preview_withdraw(assets)` shares.
pub trait BaseVault {
    fn balance_of(&self, holder: &AccountId) -> u128;
    /// Holders whose balance the base vault can shrink on its own, such as
    /// the buffer account during settlement. They never enter custody.
    fn is_buffer(&self, holder: &AccountId) -> bool;
    fn max_withdraw(&self, owner: &AccountId) -> Result<u128, StrategyError>;
    fn max_redeem(&self, owner: &AccountId) -> Result<u128, StrategyError>;
    fn preview_withdraw(&self, assets: u128) -> Result<u128, StrategyError>;
    fn convert_to_assets(&self, shares: u128) -> Result<u128, StrategyError>;
    fn deposit(&mut self, caller: AccountId, assets: u128, receiver: AccountId) -> Result<u128, StrategyError>;
    fn withdraw(
        &mut self,
        caller: AccountId,
        assets: u128,
        receiver: AccountId,
        owner: AccountId,
        max_loss: u16,
    ) -> Result<u128, StrategyError>;
    fn redeem(
        &mut self,
        caller: AccountId,
        shares: u128,
        receiver: AccountId,
        owner: AccountId,
        max_loss: u16,
    ) -> Result<u128, StrategyError>;
    fn transfer(&mut self, from: AccountId, to: AccountId, shares: u128) -> Result<(), StrategyError>;
    fn transfer_from(
        &mut self,
        spender: AccountId,
        from: AccountId,
        to: AccountId,
        shares: u128,
    ) -> Result<(), StrategyError>;
    fn approve(&mut self, owner: AccountId, spender: AccountId, shares: u128);
}

impl<O: ExchangeRateOracle, A: AssetCustodian> BaseVault for YieldSkimmingStrategy<O, A> {
    fn balance_of(&self, holder: &AccountId) -> u128 {
        YieldSkimmingStrategy::balance_of(self, holder)
    }

    fn is_buffer(&self, holder: &AccountId) -> bool {
        self.kind_of(holder) == HolderKind::Buffer
    }

    fn max_withdraw(&self, owner: &AccountId) -> Result<u128, StrategyError> {
        YieldSkimmingStrategy::max_withdraw(self, owner)
    }

    fn max_redeem(&self, owner: &AccountId) -> Result<u128, StrategyError> {
        YieldSkimmingStrategy::max_redeem(self, owner)
    }

    fn preview_withdraw(&self, assets: u128) -> Result<u128, StrategyError> {
        YieldSkimmingStrategy::preview_withdraw(self, assets)
    }

    fn convert_to_assets(&self, shares: u128) -> Result<u128, StrategyError> {
        YieldSkimmingStrategy::convert_to_assets(self, shares)
    }

    fn deposit(&mut self, caller: AccountId, assets: u128, receiver: AccountId) -> Result<u128, StrategyError> {
        YieldSkimmingStrategy::deposit(self, caller, assets, receiver)
    }

    fn withdraw(
        &mut self,
        caller: AccountId,
        assets: u128,
        receiver: AccountId,
        owner: AccountId,
        max_loss: u16,
    ) -> Result<u128, StrategyError> {
        YieldSkimmingStrategy::withdraw(self, caller, assets, receiver, owner, max_loss)
    }

    fn redeem(
        &mut self,
        caller: AccountId,
        shares: u128,
        receiver: AccountId,
        owner: AccountId,
        max_loss: u16,
    ) -> Result<u128, StrategyError> {
        YieldSkimmingStrategy::redeem(self, caller, shares, receiver, owner, max_loss)
    }

    fn transfer(&mut self, from: AccountId, to: AccountId, shares: u128) -> Result<(), StrategyError> {
        YieldSkimmingStrategy::transfer(self, from, to, shares)
    }

    fn transfer_from(
        &mut self,
        spender: AccountId,
        from: AccountId,
        to: AccountId,
        shares: u128,
    ) -> Result<(), StrategyError> {
        YieldSkimmingStrategy::transfer_from(self, spender, from, to, shares)
    }

    fn approve(&mut self, owner: AccountId, spender: AccountId, shares: u128) {
        YieldSkimmingStrategy::approve(self, owner, spender, shares)
    }
}

#[derive(Debug, Clone)]
pub struct LockedVault<V> {
    vault: V,
    custody: CustodyBook,
    cooldown: DelayedChange<Seconds>,
    governance: GovernanceAuthority,
    events: Vec<VaultEvent>,
}

impl<V: BaseVault> LockedVault<V> {
    pub fn new(vault: V, governance: AccountId, config: LockedVaultConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        info!(
            %governance,
            cooldown = config.initial_cooldown_period,
            change_delay = config.cooldown_change_delay,
            "Locked vault initialized"
        );
        Ok(Self {
            vault,
            custody: CustodyBook::new(),
            cooldown: DelayedChange::new(config.initial_cooldown_period, config.cooldown_change_delay),
            governance: GovernanceAuthority::new(governance),
            events: Vec::new(),
        })
    }

    /// Read access to the wrapped vault.
    pub fn inner(&self) -> &V {
        &self.vault
    }

    pub fn governance(&self) -> &AccountId {
        self.governance.account()
    }

    pub fn rage_quit_cooldown_period(&self) -> Seconds {
        *self.cooldown.current()
    }

    /// Proposed cooldown, `0` when nothing is pending.
    pub fn pending_rage_quit_cooldown_period(&self) -> Seconds {
        self.cooldown.pending().copied().unwrap_or(0)
    }

    /// When the pending proposal was made, `0` when nothing is pending.
    pub fn rage_quit_cooldown_period_change_timestamp(&self) -> Timestamp {
        self.cooldown.proposed_at().unwrap_or(0)
    }

    pub fn custody_info(&self, holder: &AccountId) -> Option<CustodyEntry> {
        self.custody.entry(holder).copied()
    }

    pub fn custody_state(&self, holder: &AccountId, now: Timestamp) -> CustodyState {
        self.custody.state(holder, now)
    }

    pub fn events(&self) -> &[VaultEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<VaultEvent> {
        std::mem::take(&mut self.events)
    }

    // ───────────────────────── Rage quit ─────────────────────────

    /// Lock `shares` until `now + cooldown`, using the cooldown active now.
    ///
    /// The buffer account is refused: settlement burns its shares, which
    /// would leave a lock larger than its balance.
    pub fn initiate_rage_quit(
        &mut self,
        holder: AccountId,
        shares: u128,
        now: Timestamp,
    ) -> Result<CustodyEntry, CustodyError> {
        if self.vault.is_buffer(&holder) {
            return Err(CustodyError::BufferAccount);
        }
        let balance = self.vault.balance_of(&holder);
        let cooldown = *self.cooldown.current();
        let entry = self.custody.initiate(holder, shares, balance, now, cooldown)?;

        info!(%holder, shares, unlock_time = entry.unlock_time, "Rage quit initiated");
        self.events.push(VaultEvent::RageQuitInitiated(RageQuitInitiated {
            holder,
            shares,
            unlock_time: entry.unlock_time,
        }));
        Ok(entry)
    }

    pub fn cancel_rage_quit(&mut self, holder: AccountId) -> Result<u128, CustodyError> {
        let freed_shares = self.custody.cancel(&holder)?;
        info!(%holder, freed_shares, "Rage quit cancelled");
        self.events.push(VaultEvent::RageQuitCancelled { holder, freed_shares });
        Ok(freed_shares)
    }

    // ───────────────────────── Exits ─────────────────────────

    /// Zero unless the owner's custody has unlocked; then the base limit
    /// capped by the locked allocation. The buffer gets the base limit.
    pub fn max_redeem(&self, owner: &AccountId, now: Timestamp) -> Result<u128, CustodyError> {
        if self.vault.is_buffer(owner) {
            return Ok(self.vault.max_redeem(owner)?);
        }
        let unlocked = self.custody.unlocked_shares(owner, now);
        if unlocked == 0 {
            return Ok(0);
        }
        Ok(self.vault.max_redeem(owner)?.min(unlocked))
    }

    pub fn max_withdraw(&self, owner: &AccountId, now: Timestamp) -> Result<u128, CustodyError> {
        if self.vault.is_buffer(owner) {
            return Ok(self.vault.max_withdraw(owner)?);
        }
        let unlocked = self.custody.unlocked_shares(owner, now);
        if unlocked == 0 {
            return Ok(0);
        }
        let base = self.vault.max_withdraw(owner)?;
        Ok(base.min(self.vault.convert_to_assets(unlocked)?))
    }

    pub fn withdraw(
        &mut self,
        caller: AccountId,
        assets: u128,
        receiver: AccountId,
        owner: AccountId,
        max_loss: u16,
        now: Timestamp,
    ) -> Result<u128, CustodyError> {
        if self.vault.is_buffer(&owner) {
            return Ok(self.vault.withdraw(caller, assets, receiver, owner, max_loss)?);
        }
        let shares = self.vault.preview_withdraw(assets)?;
        self.custody.check_withdrawable(&owner, shares, now)?;
        let burned = self.vault.withdraw(caller, assets, receiver, owner, max_loss)?;
        self.consume_custody(owner, burned, now)?;
        Ok(burned)
    }

    pub fn redeem(
        &mut self,
        caller: AccountId,
        shares: u128,
        receiver: AccountId,
        owner: AccountId,
        max_loss: u16,
        now: Timestamp,
    ) -> Result<u128, CustodyError> {
        if self.vault.is_buffer(&owner) {
            return Ok(self.vault.redeem(caller, shares, receiver, owner, max_loss)?);
        }
        self.custody.check_withdrawable(&owner, shares, now)?;
        let assets = self.vault.redeem(caller, shares, receiver, owner, max_loss)?;
        self.consume_custody(owner, shares, now)?;
        Ok(assets)
    }

    fn consume_custody(&mut self, holder: AccountId, shares: u128, now: Timestamp) -> Result<(), CustodyError> {
        let remaining = self.custody.consume(&holder, shares, now)?;
        debug!(%holder, shares, remaining, "Custody consumed");
        self.events.push(VaultEvent::CustodyConsumed(CustodyConsumed {
            holder,
            shares,
            remaining,
        }));
        Ok(())
    }

    // ───────────────────────── Share movement ─────────────────────────

    pub fn deposit(&mut self, caller: AccountId, assets: u128, receiver: AccountId) -> Result<u128, CustodyError> {
        Ok(self.vault.deposit(caller, assets, receiver)?)
    }

    pub fn approve(&mut self, owner: AccountId, spender: AccountId, shares: u128) {
        self.vault.approve(owner, spender, shares);
    }

    pub fn transfer(&mut self, from: AccountId, to: AccountId, shares: u128) -> Result<(), CustodyError> {
        self.custody
            .check_transfer(&from, shares, self.vault.balance_of(&from))?;
        Ok(self.vault.transfer(from, to, shares)?)
    }

    pub fn transfer_from(
        &mut self,
        spender: AccountId,
        from: AccountId,
        to: AccountId,
        shares: u128,
    ) -> Result<(), CustodyError> {
        self.custody
            .check_transfer(&from, shares, self.vault.balance_of(&from))?;
        Ok(self.vault.transfer_from(spender, from, to, shares)?)
    }

    // ───────────────────────── Cooldown governance ─────────────────────────

    fn require_governance(&self, caller: &AccountId) -> Result<(), CustodyError> {
        if !self.governance.is_governance(caller) {
            return Err(TimelockError::Unauthorized.into());
        }
        Ok(())
    }

    pub fn propose_rage_quit_cooldown_period_change(
        &mut self,
        caller: AccountId,
        new_period: Seconds,
        now: Timestamp,
    ) -> Result<Timestamp, CustodyError> {
        self.require_governance(&caller)?;
        if !cooldown_in_range(new_period) {
            return Err(TimelockError::InvalidValue {
                reason: format!("cooldown {} s outside [1, 30] days", new_period),
            }
            .into());
        }
        let effective_at = self.cooldown.propose(new_period, now)?;

        info!(new_period, effective_at, "Rage quit cooldown change proposed");
        self.events.push(VaultEvent::CooldownChangeProposed {
            new_period,
            effective_at,
        });
        Ok(effective_at)
    }

    pub fn cancel_rage_quit_cooldown_period_change(
        &mut self,
        caller: AccountId,
        now: Timestamp,
    ) -> Result<(), CustodyError> {
        self.require_governance(&caller)?;
        let discarded = self.cooldown.cancel(now)?;
        info!(discarded, "Rage quit cooldown change cancelled");
        self.events.push(VaultEvent::CooldownChangeCancelled { discarded });
        Ok(())
    }

    /// Apply a matured cooldown change. Anyone may call.
    pub fn finalize_rage_quit_cooldown_period_change(&mut self, now: Timestamp) -> Result<Seconds, CustodyError> {
        let (old_period, new_period) = self.cooldown.finalize(now)?;
        info!(old_period, new_period, "Rage quit cooldown changed");
        self.events.push(VaultEvent::CooldownChanged {
            old_period,
            new_period,
        });
        Ok(new_period)
    }

    pub fn set_governance(&mut self, caller: AccountId, new_governance: AccountId) -> Result<(), CustodyError> {
        let old = *self.governance.account();
        if !self.governance.transfer(&caller, new_governance) {
            return Err(TimelockError::Unauthorized.into());
        }
        info!(%old, new = %new_governance, "Governance transferred");
        self.events.push(VaultEvent::GovernanceTransferred {
            old,
            new: new_governance,
        });
        Ok(())
    }
}

/// Strategy operations reached through the locked vault. None of them
/// moves an ordinary holder's shares out, so custody is untouched except
/// where a buffer change could hand the role to a locked holder.
impl<O: ExchangeRateOracle, A: AssetCustodian> LockedVault<YieldSkimmingStrategy<O, A>> {
    pub fn mint(&mut self, caller: AccountId, shares: u128, receiver: AccountId) -> Result<u128, CustodyError> {
        Ok(self.vault.mint(caller, shares, receiver)?)
    }

    pub fn preview_deposit(&self, assets: u128) -> Result<u128, StrategyError> {
        self.vault.preview_deposit(assets)
    }

    pub fn preview_mint(&self, shares: u128) -> Result<u128, StrategyError> {
        self.vault.preview_mint(shares)
    }

    pub fn preview_withdraw(&self, assets: u128) -> Result<u128, StrategyError> {
        self.vault.preview_withdraw(assets)
    }

    pub fn preview_redeem(&self, shares: u128) -> Result<u128, StrategyError> {
        self.vault.preview_redeem(shares)
    }

    pub fn snapshot(&self) -> Result<StrategySnapshot, StrategyError> {
        self.vault.snapshot()
    }

    pub fn report(&mut self, caller: AccountId, now: Timestamp) -> Result<ReportOutcome, StrategyError> {
        self.vault.report(caller, now)
    }

    pub fn custodian_mut(&mut self) -> &mut A {
        self.vault.custodian_mut()
    }

    // ───────────────────────── Management ─────────────────────────

    pub fn set_enable_burning(&mut self, caller: AccountId, enabled: bool) -> Result<(), StrategyError> {
        self.vault.set_enable_burning(caller, enabled)
    }

    pub fn shutdown_strategy(&mut self, caller: AccountId) -> Result<(), StrategyError> {
        self.vault.shutdown_strategy(caller)
    }

    pub fn grant_keeper(&mut self, caller: AccountId, keeper: AccountId) -> Result<(), StrategyError> {
        self.vault.grant_keeper(caller, keeper)
    }

    pub fn revoke_keeper(&mut self, caller: AccountId, keeper: AccountId) -> Result<(), StrategyError> {
        self.vault.revoke_keeper(caller, keeper)
    }

    pub fn transfer_management(&mut self, caller: AccountId, new_management: AccountId) -> Result<(), StrategyError> {
        self.vault.transfer_management(caller, new_management)
    }

    pub fn propose_buffer_change(
        &mut self,
        caller: AccountId,
        new_buffer: AccountId,
        now: Timestamp,
    ) -> Result<Timestamp, StrategyError> {
        self.vault.propose_buffer_change(caller, new_buffer, now)
    }

    pub fn cancel_buffer_change(&mut self, caller: AccountId, now: Timestamp) -> Result<(), StrategyError> {
        self.vault.cancel_buffer_change(caller, now)
    }

    /// Apply a matured buffer change. Fails while the incoming account has
    /// an open rage quit; it must cancel first.
    pub fn finalize_buffer_change(&mut self, now: Timestamp) -> Result<AccountId, CustodyError> {
        if let Some(next) = self.vault.pending_buffer() {
            if self.custody.entry(next).is_some() {
                return Err(CustodyError::BufferInCustody);
            }
        }
        Ok(self.vault.finalize_buffer_change(now)?)
    }
}
