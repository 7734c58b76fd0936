//! Forwarder events.
//!
//! Events are the durable audit trail consumed by relayers and indexers. Each
//! state change emits exactly one event through an [`EventSink`].

use std::sync::{Mutex, PoisonError};

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// An observable forwarder state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all_fields = "camelCase")]
pub enum ForwarderEvent {
    /// A token was added to the fee-token allow-list.
    FeeTokenAdded {
        /// The added token.
        token: Address,
    },
    /// A token was removed from the fee-token allow-list.
    FeeTokenRemoved {
        /// The removed token.
        token: Address,
    },
    /// A contract was added to the target allow-list.
    TargetAdded {
        /// The added target.
        target: Address,
    },
    /// A contract was removed from the target allow-list.
    TargetRemoved {
        /// The removed target.
        target: Address,
    },
    /// A meta-transaction was executed.
    TransactionExecuted {
        /// Authorizing account.
        from: Address,
        /// Call target.
        to: Address,
        /// Consumed nonce.
        nonce: U256,
        /// Token the fee was paid in.
        fee_token: Address,
        /// Fee collected.
        fee_amount: U256,
    },
    /// A meta-transaction's forwarded call failed.
    TransactionFailed {
        /// Authorizing account.
        from: Address,
        /// Call target.
        to: Address,
        /// Consumed nonce.
        nonce: U256,
        /// Decoded revert reason.
        reason: String,
    },
    /// The maximum gas limit changed.
    GasLimitUpdated {
        /// Previous value.
        old: u64,
        /// New value.
        new: u64,
    },
    /// The minimum gas limit changed.
    MinGasLimitUpdated {
        /// Previous value.
        old: u64,
        /// New value.
        new: u64,
    },
    /// The fee multiplier changed.
    FeeMultiplierUpdated {
        /// Previous value in basis points.
        old: u32,
        /// New value in basis points.
        new: u32,
    },
    /// The fallback gas price for estimates changed.
    FallbackGasPriceUpdated {
        /// Previous value.
        old: U256,
        /// New value.
        new: U256,
    },
    /// The fee recipient changed. `None` means fees go to the relayer.
    FeeRecipientUpdated {
        /// Previous recipient.
        old: Option<Address>,
        /// New recipient.
        new: Option<Address>,
    },
    /// Ownership moved to a new account.
    OwnershipTransferred {
        /// Previous owner.
        previous_owner: Address,
        /// New owner.
        new_owner: Address,
    },
}

impl ForwarderEvent {
    /// Short event name, as used in the serialized `event` tag.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::FeeTokenAdded { .. } => "FeeTokenAdded",
            Self::FeeTokenRemoved { .. } => "FeeTokenRemoved",
            Self::TargetAdded { .. } => "TargetAdded",
            Self::TargetRemoved { .. } => "TargetRemoved",
            Self::TransactionExecuted { .. } => "TransactionExecuted",
            Self::TransactionFailed { .. } => "TransactionFailed",
            Self::GasLimitUpdated { .. } => "GasLimitUpdated",
            Self::MinGasLimitUpdated { .. } => "MinGasLimitUpdated",
            Self::FeeMultiplierUpdated { .. } => "FeeMultiplierUpdated",
            Self::FallbackGasPriceUpdated { .. } => "FallbackGasPriceUpdated",
            Self::FeeRecipientUpdated { .. } => "FeeRecipientUpdated",
            Self::OwnershipTransferred { .. } => "OwnershipTransferred",
        }
    }
}

/// Receives forwarder events.
pub trait EventSink: Send + Sync {
    /// Records `event`.
    fn emit(&self, event: ForwarderEvent);
}

/// An [`EventSink`] that keeps events in memory.
#[derive(Debug, Default)]
pub struct MemoryEventLog {
    events: Mutex<Vec<ForwarderEvent>>,
}

impl MemoryEventLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every event recorded so far, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<ForwarderEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the most recent event.
    #[must_use]
    pub fn last(&self) -> Option<ForwarderEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    /// Number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no events have been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventSink for MemoryEventLog {
    fn emit(&self, event: ForwarderEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

impl<T: EventSink + ?Sized> EventSink for std::sync::Arc<T> {
    fn emit(&self, event: ForwarderEvent) {
        (**self).emit(event);
    }
}
