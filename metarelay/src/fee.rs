//! Relayer fee policy.
//!
//! The minimum fee for a meta-transaction is its gas budget priced at the
//! relayer's gas price, scaled by a multiplier in basis points:
//!
//! ```text
//! minimum_fee = gas * gas_price * fee_multiplier / 10_000
//! ```
//!
//! Division truncates toward zero, so a relayer quoting a fee should round up.
//! Converting the result into another price unit is left to the caller.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

use crate::error::{AdministrationError, PolicyViolation};

/// Basis-point denominator; a multiplier of this value charges raw cost.
pub const BASIS_POINTS: u32 = 10_000;

/// Default upper bound on a meta-transaction gas limit.
pub const DEFAULT_MAX_GAS_LIMIT: u64 = 1_000_000;

/// Default lower bound on a meta-transaction gas limit.
pub const DEFAULT_MIN_GAS_LIMIT: u64 = 21_000;

/// Default fee multiplier (1.10x).
pub const DEFAULT_FEE_MULTIPLIER: u32 = 11_000;

/// Default gas price used by [`FeePolicy::estimate_fee`] when the network reads zero (1 gwei).
pub const DEFAULT_FALLBACK_GAS_PRICE: u128 = 1_000_000_000;

/// Source of the current network gas price.
pub trait GasPriceOracle {
    /// Returns the current base gas price, or `None` if unavailable.
    fn base_gas_price(&self) -> Option<U256>;
}

/// A [`GasPriceOracle`] returning a fixed reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticGasPrice(pub Option<U256>);

impl GasPriceOracle for StaticGasPrice {
    fn base_gas_price(&self) -> Option<U256> {
        self.0
    }
}

/// Gas bounds and pricing parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeConfiguration {
    /// Largest gas limit a meta-transaction may request.
    pub max_gas_limit: u64,
    /// Smallest gas limit a meta-transaction may request.
    pub min_gas_limit: u64,
    /// Fee multiplier in basis points, never below [`BASIS_POINTS`].
    pub fee_multiplier: u32,
    /// Gas price used for estimates when the network reading is missing or zero.
    pub fallback_gas_price: U256,
}

impl Default for FeeConfiguration {
    fn default() -> Self {
        Self {
            max_gas_limit: DEFAULT_MAX_GAS_LIMIT,
            min_gas_limit: DEFAULT_MIN_GAS_LIMIT,
            fee_multiplier: DEFAULT_FEE_MULTIPLIER,
            fallback_gas_price: U256::from(DEFAULT_FALLBACK_GAS_PRICE),
        }
    }
}

impl FeeConfiguration {
    /// Checks the configuration invariants.
    ///
    /// # Errors
    ///
    /// Returns an [`AdministrationError`] naming the violated invariant.
    pub fn validate(&self) -> Result<(), AdministrationError> {
        if self.fee_multiplier < BASIS_POINTS {
            return Err(AdministrationError::MultiplierTooLow(self.fee_multiplier));
        }
        if self.min_gas_limit >= self.max_gas_limit {
            return Err(AdministrationError::InvalidGasBounds {
                min: self.min_gas_limit,
                max: self.max_gas_limit,
            });
        }
        if self.fallback_gas_price.is_zero() {
            return Err(AdministrationError::ZeroFallbackGasPrice);
        }
        Ok(())
    }
}

/// Applies a [`FeeConfiguration`] to gas budgets.
#[derive(Debug, Clone, Default)]
pub struct FeePolicy {
    config: FeeConfiguration,
}

impl FeePolicy {
    /// Creates a policy from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns an [`AdministrationError`] if the configuration is invalid.
    pub fn new(config: FeeConfiguration) -> Result<Self, AdministrationError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Returns the current configuration.
    #[must_use]
    pub const fn config(&self) -> &FeeConfiguration {
        &self.config
    }

    /// Minimum fee for `gas` units at `gas_price`.
    #[must_use]
    pub fn minimum_fee(&self, gas: u64, gas_price: U256) -> U256 {
        U256::from(gas)
            .saturating_mul(gas_price)
            .saturating_mul(U256::from(self.config.fee_multiplier))
            / U256::from(BASIS_POINTS)
    }

    /// Estimates the fee for `gas` units at the oracle's current gas price.
    ///
    /// Falls back to the configured gas price when the oracle has no reading
    /// or reads zero.
    #[must_use]
    pub fn estimate_fee<O>(&self, gas: u64, oracle: &O) -> U256
    where
        O: GasPriceOracle + ?Sized,
    {
        let gas_price = oracle
            .base_gas_price()
            .filter(|price| !price.is_zero())
            .unwrap_or(self.config.fallback_gas_price);
        self.minimum_fee(gas, gas_price)
    }

    /// Checks `gas_limit` against the configured bounds, inclusive.
    ///
    /// # Errors
    ///
    /// Returns a [`PolicyViolation`] naming the bound that failed.
    pub const fn check_gas_limit(&self, gas_limit: u64) -> Result<(), PolicyViolation> {
        if gas_limit < self.config.min_gas_limit {
            return Err(PolicyViolation::GasLimitTooLow {
                gas_limit,
                min_gas_limit: self.config.min_gas_limit,
            });
        }
        if gas_limit > self.config.max_gas_limit {
            return Err(PolicyViolation::GasLimitTooHigh {
                gas_limit,
                max_gas_limit: self.config.max_gas_limit,
            });
        }
        Ok(())
    }

    /// Checks that `supplied` covers the minimum fee for `gas_limit` at `gas_price`.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyViolation::InsufficientFee`] if it does not.
    pub fn check_fee(
        &self,
        supplied: U256,
        gas_limit: u64,
        gas_price: U256,
    ) -> Result<(), PolicyViolation> {
        let required = self.minimum_fee(gas_limit, gas_price);
        if supplied < required {
            return Err(PolicyViolation::InsufficientFee { supplied, required });
        }
        Ok(())
    }

    /// Replaces the fee multiplier, returning the previous value.
    ///
    /// # Errors
    ///
    /// Returns [`AdministrationError::MultiplierTooLow`] below [`BASIS_POINTS`].
    pub const fn set_fee_multiplier(&mut self, value: u32) -> Result<u32, AdministrationError> {
        if value < BASIS_POINTS {
            return Err(AdministrationError::MultiplierTooLow(value));
        }
        let old = self.config.fee_multiplier;
        self.config.fee_multiplier = value;
        Ok(old)
    }

    /// Replaces the maximum gas limit, returning the previous value.
    ///
    /// # Errors
    ///
    /// Returns [`AdministrationError::InvalidGasBounds`] unless `min < value`.
    pub const fn set_max_gas_limit(&mut self, value: u64) -> Result<u64, AdministrationError> {
        if self.config.min_gas_limit >= value {
            return Err(AdministrationError::InvalidGasBounds {
                min: self.config.min_gas_limit,
                max: value,
            });
        }
        let old = self.config.max_gas_limit;
        self.config.max_gas_limit = value;
        Ok(old)
    }

    /// Replaces the minimum gas limit, returning the previous value.
    ///
    /// # Errors
    ///
    /// Returns [`AdministrationError::InvalidGasBounds`] unless `value < max`.
    pub const fn set_min_gas_limit(&mut self, value: u64) -> Result<u64, AdministrationError> {
        if value >= self.config.max_gas_limit {
            return Err(AdministrationError::InvalidGasBounds {
                min: value,
                max: self.config.max_gas_limit,
            });
        }
        let old = self.config.min_gas_limit;
        self.config.min_gas_limit = value;
        Ok(old)
    }

    /// Replaces the fallback gas price, returning the previous value.
    ///
    /// # Errors
    ///
    /// Returns [`AdministrationError::ZeroFallbackGasPrice`] for zero.
    pub fn set_fallback_gas_price(&mut self, value: U256) -> Result<U256, AdministrationError> {
        if value.is_zero() {
            return Err(AdministrationError::ZeroFallbackGasPrice);
        }
        Ok(std::mem::replace(&mut self.config.fallback_gas_price, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GWEI: u64 = 1_000_000_000;

    fn policy(multiplier: u32) -> FeePolicy {
        FeePolicy::new(FeeConfiguration {
            fee_multiplier: multiplier,
            ..FeeConfiguration::default()
        })
        .unwrap()
    }

    #[test]
    fn test_minimum_fee_formula() {
        let policy = policy(12_000);
        let fee = policy.minimum_fee(100_000, U256::from(20 * GWEI));
        assert_eq!(fee, U256::from(100_000u64 * 20 * GWEI * 12 / 10));
    }

    #[test]
    fn test_minimum_fee_truncates() {
        let policy = policy(11_000);
        // 7 * 1 * 11000 / 10000 = 7.7 -> 7
        assert_eq!(policy.minimum_fee(7, U256::from(1)), U256::from(7));
    }

    #[test]
    fn test_fee_sufficiency_boundary() {
        let policy = policy(12_000);
        let gas_price = U256::from(3 * GWEI);
        let exact = U256::from(100_000u64) * gas_price * U256::from(12_000) / U256::from(10_000);
        assert!(policy.check_fee(exact, 100_000, gas_price).is_ok());
        assert_eq!(
            policy.check_fee(exact - U256::from(1), 100_000, gas_price),
            Err(PolicyViolation::InsufficientFee {
                supplied: exact - U256::from(1),
                required: exact,
            })
        );
    }

    #[test]
    fn test_minimum_fee_saturates_instead_of_overflowing() {
        let policy = policy(BASIS_POINTS);
        let fee = policy.minimum_fee(u64::MAX, U256::MAX);
        assert_eq!(fee, U256::MAX / U256::from(BASIS_POINTS));
    }

    #[test]
    fn test_estimate_uses_network_price() {
        let policy = policy(BASIS_POINTS);
        let oracle = StaticGasPrice(Some(U256::from(5 * GWEI)));
        assert_eq!(policy.estimate_fee(21_000, &oracle), U256::from(21_000 * 5 * GWEI));
    }

    #[test]
    fn test_estimate_falls_back_on_missing_or_zero_price() {
        let policy = policy(BASIS_POINTS);
        let expected = U256::from(21_000u64) * U256::from(DEFAULT_FALLBACK_GAS_PRICE);
        assert_eq!(policy.estimate_fee(21_000, &StaticGasPrice(None)), expected);
        assert_eq!(
            policy.estimate_fee(21_000, &StaticGasPrice(Some(U256::ZERO))),
            expected
        );
    }

    #[test]
    fn test_gas_limit_bounds_inclusive() {
        let policy = FeePolicy::default();
        assert!(policy.check_gas_limit(DEFAULT_MIN_GAS_LIMIT).is_ok());
        assert!(policy.check_gas_limit(DEFAULT_MAX_GAS_LIMIT).is_ok());
        assert!(matches!(
            policy.check_gas_limit(DEFAULT_MIN_GAS_LIMIT - 1),
            Err(PolicyViolation::GasLimitTooLow { .. })
        ));
        assert!(matches!(
            policy.check_gas_limit(DEFAULT_MAX_GAS_LIMIT + 1),
            Err(PolicyViolation::GasLimitTooHigh { .. })
        ));
    }

    #[test]
    fn test_multiplier_floor() {
        let mut policy = FeePolicy::default();
        assert_eq!(
            policy.set_fee_multiplier(9_999),
            Err(AdministrationError::MultiplierTooLow(9_999))
        );
        assert_eq!(policy.set_fee_multiplier(10_000), Ok(DEFAULT_FEE_MULTIPLIER));
        assert_eq!(policy.config().fee_multiplier, 10_000);
    }

    #[test]
    fn test_gas_limit_setters_keep_min_below_max() {
        let mut policy = FeePolicy::default();
        assert!(policy.set_max_gas_limit(DEFAULT_MIN_GAS_LIMIT).is_err());
        assert_eq!(policy.set_max_gas_limit(500_000), Ok(DEFAULT_MAX_GAS_LIMIT));
        assert!(policy.set_min_gas_limit(500_000).is_err());
        assert_eq!(policy.set_min_gas_limit(30_000), Ok(DEFAULT_MIN_GAS_LIMIT));
    }

    #[test]
    fn test_invalid_configuration_rejected() {
        let config = FeeConfiguration {
            min_gas_limit: 10,
            max_gas_limit: 10,
            ..FeeConfiguration::default()
        };
        assert_eq!(
            FeePolicy::new(config).unwrap_err(),
            AdministrationError::InvalidGasBounds { min: 10, max: 10 }
        );
        let config = FeeConfiguration {
            fallback_gas_price: U256::ZERO,
            ..FeeConfiguration::default()
        };
        assert_eq!(
            FeePolicy::new(config).unwrap_err(),
            AdministrationError::ZeroFallbackGasPrice
        );
    }
}
