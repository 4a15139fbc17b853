//! Management operations: burning toggle, shutdown, keeper roles, and the
//! delayed buffer account migration.

use tracing::info;
use types::ids::AccountId;
use types::time::Timestamp;

use super::YieldSkimmingStrategy;
use crate::asset::AssetCustodian;
use crate::errors::{StrategyError, TimelockError};
use crate::events::VaultEvent;
use crate::oracle::ExchangeRateOracle;

impl<O: ExchangeRateOracle, A: AssetCustodian> YieldSkimmingStrategy<O, A> {
    fn require_management(&self, caller: &AccountId) -> Result<(), StrategyError> {
        if !self.access.is_management(caller) {
            return Err(StrategyError::Unauthorized);
        }
        Ok(())
    }

    pub fn set_enable_burning(&mut self, caller: AccountId, enabled: bool) -> Result<(), StrategyError> {
        self.require_management(&caller)?;
        self.enable_burning = enabled;
        info!(enabled, "Buffer burning toggled");
        self.events.push(VaultEvent::BurningToggled { enabled });
        Ok(())
    }

    /// Stop accepting deposits and mints. Exits stay open. Irreversible.
    pub fn shutdown_strategy(&mut self, caller: AccountId) -> Result<(), StrategyError> {
        self.require_management(&caller)?;
        if !self.shutdown.is_shutdown() {
            self.shutdown.shutdown();
            info!(name = %self.name, "Strategy shut down");
            self.events.push(VaultEvent::StrategyShutdown);
        }
        Ok(())
    }

    pub fn grant_keeper(&mut self, caller: AccountId, keeper: AccountId) -> Result<(), StrategyError> {
        if !self.access.grant_keeper(&caller, keeper) {
            return Err(StrategyError::Unauthorized);
        }
        Ok(())
    }

    pub fn revoke_keeper(&mut self, caller: AccountId, keeper: AccountId) -> Result<(), StrategyError> {
        if !self.access.revoke_keeper(&caller, &keeper) {
            return Err(StrategyError::Unauthorized);
        }
        Ok(())
    }

    pub fn transfer_management(&mut self, caller: AccountId, new_management: AccountId) -> Result<(), StrategyError> {
        if new_management == *self.ledger.buffer_account() {
            return Err(StrategyError::BufferReceiver);
        }
        if !self.access.transfer_management(&caller, new_management) {
            return Err(StrategyError::Unauthorized);
        }
        info!(old = %caller, new = %new_management, "Management transferred");
        Ok(())
    }

    pub fn pending_buffer(&self) -> Option<&AccountId> {
        self.buffer_change.pending()
    }

    pub fn buffer_change_effective_at(&self) -> Option<Timestamp> {
        self.buffer_change.effective_at()
    }

    /// Propose a new buffer account. Management only.
    pub fn propose_buffer_change(
        &mut self,
        caller: AccountId,
        new_buffer: AccountId,
        now: Timestamp,
    ) -> Result<Timestamp, StrategyError> {
        self.require_management(&caller)?;
        if new_buffer == *self.access.management() {
            return Err(TimelockError::InvalidValue {
                reason: "buffer account must differ from management".to_string(),
            }
            .into());
        }
        let effective_at = self.buffer_change.propose(new_buffer, now)?;
        info!(%new_buffer, effective_at, "Buffer change proposed");
        self.events.push(VaultEvent::BufferChangeProposed {
            new_buffer,
            effective_at,
        });
        Ok(effective_at)
    }

    pub fn cancel_buffer_change(&mut self, caller: AccountId, now: Timestamp) -> Result<(), StrategyError> {
        self.require_management(&caller)?;
        let discarded = self.buffer_change.cancel(now)?;
        info!(%discarded, "Buffer change cancelled");
        self.events.push(VaultEvent::BufferChangeCancelled { discarded });
        Ok(())
    }

    /// Apply a matured buffer change. Anyone may call.
    ///
    /// The buffer balance follows the role, so user debt is unchanged. The
    /// new account must not hold ordinary shares.
    pub fn finalize_buffer_change(&mut self, now: Timestamp) -> Result<AccountId, StrategyError> {
        let new_buffer = *self.buffer_change.ready(now)?;
        let shares_moved = self.ledger.reassign_buffer(new_buffer)?;
        let (old_buffer, _) = self.buffer_change.finalize(now)?;

        info!(%old_buffer, %new_buffer, shares_moved, "Buffer account changed");
        self.events.push(VaultEvent::BufferChanged {
            old_buffer,
            new_buffer,
            shares_moved,
        });
        Ok(new_buffer)
    }
}
