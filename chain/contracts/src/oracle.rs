//! Exchange rate oracle adapter
//!
//! Oracles report `(rate, decimals)` in whatever precision the underlying
//! yield source uses. [`normalized_rate`] rescales to RAY and rejects a zero
//! rate here, so nothing downstream ever divides by it.

use std::sync::{Arc, PoisonError, RwLock};
use types::numeric::{Ray, U256, RAY_DECIMALS};

use crate::errors::StrategyError;

/// Source of the current exchange rate of an appreciating asset.
pub trait ExchangeRateOracle {
    /// Current rate and the number of decimals it carries.
    fn current_exchange_rate(&self) -> (U256, u8);
}

impl<T: ExchangeRateOracle + ?Sized> ExchangeRateOracle for Arc<T> {
    fn current_exchange_rate(&self) -> (U256, u8) {
        (**self).current_exchange_rate()
    }
}

/// Read the oracle and normalize to RAY.
pub fn normalized_rate<O: ExchangeRateOracle + ?Sized>(oracle: &O) -> Result<Ray, StrategyError> {
    let (rate, decimals) = oracle.current_exchange_rate();
    let ray = Ray::from_scaled(rate, decimals)?;
    if ray.is_zero() {
        return Err(StrategyError::InvalidExchangeRate);
    }
    Ok(ray)
}

/// Oracle whose rate is set by the host (keeper bot, simulation, tests).
///
/// Shared through an `Arc` so the host can move the rate while a strategy
/// holds the same oracle.
#[derive(Debug)]
pub struct ManualRateOracle {
    rate: RwLock<(U256, u8)>,
}

impl ManualRateOracle {
    pub fn new(rate: U256, decimals: u8) -> Self {
        Self {
            rate: RwLock::new((rate, decimals)),
        }
    }

    /// Oracle reporting `ray` at 27 decimals.
    pub fn from_ray(ray: Ray) -> Self {
        Self::new(ray.raw(), RAY_DECIMALS)
    }

    pub fn set_rate(&self, rate: U256, decimals: u8) {
        // A panic while holding the lock cannot leave a torn tuple behind.
        let mut guard = self.rate.write().unwrap_or_else(PoisonError::into_inner);
        *guard = (rate, decimals);
    }

    pub fn set_ray(&self, ray: Ray) {
        self.set_rate(ray.raw(), RAY_DECIMALS);
    }
}

impl ExchangeRateOracle for ManualRateOracle {
    fn current_exchange_rate(&self) -> (U256, u8) {
        *self.rate.read().unwrap_or_else(PoisonError::into_inner)
    }
}
