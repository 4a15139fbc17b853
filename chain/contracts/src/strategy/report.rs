//! Settlement
//!
//! Compares the vault's value against total share supply and books the
//! difference against the buffer account. Profit mints new buffer shares
//! worth exactly the excess value; loss burns buffer shares up to the
//! buffer's balance when burning is enabled. A deficit the buffer cannot
//! cover stays on the books and shows up as insolvency.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use types::ids::AccountId;
use types::numeric::{Ray, Rounding};
use types::time::Timestamp;

use super::YieldSkimmingStrategy;
use crate::asset::AssetCustodian;
use crate::errors::StrategyError;
use crate::events::{Reported, Transfer, VaultEvent};
use crate::oracle::{normalized_rate, ExchangeRateOracle};

/// Result of one settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportOutcome {
    /// Gross excess value, expressed in assets at the current rate
    pub profit: u128,
    /// Gross deficit, expressed in assets at the current rate
    pub loss: u128,
    pub buffer_shares_minted: u128,
    pub buffer_shares_burned: u128,
    pub rate: Ray,
    pub total_assets: u128,
}

impl<O: ExchangeRateOracle, A: AssetCustodian> YieldSkimmingStrategy<O, A> {
    /// Harvest and settle. Keeper or management only.
    ///
    /// Running it twice without a rate or balance change leaves the ledger
    /// unchanged: after a profit settlement value equals supply.
    pub fn report(&mut self, caller: AccountId, now: Timestamp) -> Result<ReportOutcome, StrategyError> {
        if !self.access.is_keeper(&caller) {
            return Err(StrategyError::Unauthorized);
        }

        let total_assets = self.custodian.balance_of_vault();
        let rate = normalized_rate(&self.oracle)?;
        let current_value = rate.value_of(total_assets, Rounding::Floor)?;
        let total_debt = self.ledger.total_supply();

        let mut outcome = ReportOutcome {
            profit: 0,
            loss: 0,
            buffer_shares_minted: 0,
            buffer_shares_burned: 0,
            rate,
            total_assets,
        };

        if current_value > total_debt {
            let excess = current_value - total_debt;
            outcome.profit = rate.assets_for(excess, Rounding::Floor)?;
            outcome.buffer_shares_minted = excess;
        } else if current_value < total_debt {
            let deficit = total_debt - current_value;
            outcome.loss = rate.assets_for(deficit, Rounding::Floor)?;
            if self.enable_burning {
                outcome.buffer_shares_burned = deficit.min(self.ledger.buffer_shares());
            }
        }

        let buffer = *self.ledger.buffer_account();
        if outcome.buffer_shares_minted > 0 {
            self.ledger.mint(&buffer, outcome.buffer_shares_minted)?;
            self.events.push(VaultEvent::Transfer(Transfer {
                from: None,
                to: Some(buffer),
                shares: outcome.buffer_shares_minted,
            }));
        }
        if outcome.buffer_shares_burned > 0 {
            self.ledger.burn(&buffer, outcome.buffer_shares_burned)?;
            self.events.push(VaultEvent::Transfer(Transfer {
                from: Some(buffer),
                to: None,
                shares: outcome.buffer_shares_burned,
            }));
        }

        self.total_assets = total_assets;
        self.last_reported_rate = rate;
        self.last_report = now;

        info!(
            %caller,
            profit = outcome.profit,
            loss = outcome.loss,
            minted = outcome.buffer_shares_minted,
            burned = outcome.buffer_shares_burned,
            rate = %rate,
            total_assets,
            "Strategy reported"
        );

        let user_debt = self.ledger.user_debt();
        if current_value < user_debt {
            warn!(
                user_debt,
                vault_value = current_value,
                shortfall = user_debt - current_value,
                "Vault insolvent after report"
            );
        }

        self.events.push(VaultEvent::Reported(Reported {
            profit: outcome.profit,
            loss: outcome.loss,
            buffer_shares_minted: outcome.buffer_shares_minted,
            buffer_shares_burned: outcome.buffer_shares_burned,
            rate,
            total_assets,
            reported_at: now,
        }));

        Ok(outcome)
    }
}
