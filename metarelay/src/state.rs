//! Persistent forwarder state.
//!
//! All state that outlives a single call lives in [`ForwarderState`]: nonce
//! counters, both allow-lists, the fee policy, fee recipient and access
//! control. Operations receive it explicitly rather than reaching for globals.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::access::AccessControl;
use crate::allowlist::{AllowListRegistry, ListKind};
use crate::fee::{FeeConfiguration, FeePolicy};
use crate::nonce::NonceRegistry;

/// Every piece of state that survives between calls.
#[derive(Debug, Clone)]
pub struct ForwarderState {
    /// Per-account nonce counters.
    pub nonces: NonceRegistry,
    /// Fee-token and target allow-lists.
    pub allow_lists: AllowListRegistry,
    /// Gas bounds and fee pricing.
    pub fees: FeePolicy,
    /// Owner and pause flag.
    pub access: AccessControl,
    /// Where collected fees go; `None` sends them to the submitting relayer.
    pub fee_recipient: Option<Address>,
}

impl ForwarderState {
    /// Creates state with empty registries.
    #[must_use]
    pub fn new(access: AccessControl, fees: FeePolicy) -> Self {
        Self {
            nonces: NonceRegistry::new(),
            allow_lists: AllowListRegistry::new(),
            fees,
            access,
            fee_recipient: None,
        }
    }

    /// Snapshot of the configuration values.
    #[must_use]
    pub fn configuration(&self) -> ConfigurationView {
        let fees = *self.fees.config();
        ConfigurationView {
            owner: self.access.owner(),
            paused: self.access.is_paused(),
            fee_recipient: self.fee_recipient,
            max_gas_limit: fees.max_gas_limit,
            min_gas_limit: fees.min_gas_limit,
            fee_multiplier: fees.fee_multiplier,
            fallback_gas_price: fees.fallback_gas_price,
            fee_tokens: self
                .allow_lists
                .list(ListKind::FeeToken)
                .iter()
                .copied()
                .collect(),
            targets: self
                .allow_lists
                .list(ListKind::Target)
                .iter()
                .copied()
                .collect(),
        }
    }
}

/// Read-only snapshot of the forwarder configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationView {
    /// Current owner.
    pub owner: Address,
    /// Whether execution is paused.
    pub paused: bool,
    /// Configured fee recipient, if any.
    pub fee_recipient: Option<Address>,
    /// Maximum gas limit.
    pub max_gas_limit: u64,
    /// Minimum gas limit.
    pub min_gas_limit: u64,
    /// Fee multiplier in basis points.
    pub fee_multiplier: u32,
    /// Fallback gas price for estimates.
    pub fallback_gas_price: U256,
    /// Allowed fee tokens, in address order.
    pub fee_tokens: Vec<Address>,
    /// Allowed call targets, in address order.
    pub targets: Vec<Address>,
}

impl ConfigurationView {
    /// The fee part of the snapshot.
    #[must_use]
    pub const fn fee_configuration(&self) -> FeeConfiguration {
        FeeConfiguration {
            max_gas_limit: self.max_gas_limit,
            min_gas_limit: self.min_gas_limit,
            fee_multiplier: self.fee_multiplier,
            fallback_gas_price: self.fallback_gas_price,
        }
    }
}
