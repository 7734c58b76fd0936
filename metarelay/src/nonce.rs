//! Per-account replay protection.
//!
//! Every account starts at nonce `0`. A meta-transaction is valid only when its
//! nonce equals the current counter, so nonces are strictly sequential: no
//! gaps, no replay, no pre-authorized future nonces.

use std::collections::HashMap;

use alloy_primitives::{Address, U256};

use crate::error::AuthorizationError;

/// Mapping from account to its next expected nonce.
#[derive(Debug, Clone, Default)]
pub struct NonceRegistry {
    counters: HashMap<Address, U256>,
}

impl NonceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the nonce the next meta-transaction from `account` must carry.
    #[must_use]
    pub fn current(&self, account: &Address) -> U256 {
        self.counters.get(account).copied().unwrap_or(U256::ZERO)
    }

    /// Checks that `nonce` is the current counter for `account`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthorizationError::InvalidNonce`] for any other value,
    /// including already used and future nonces.
    pub fn check(&self, account: &Address, nonce: U256) -> Result<(), AuthorizationError> {
        let expected = self.current(account);
        if nonce == expected {
            Ok(())
        } else {
            Err(AuthorizationError::InvalidNonce {
                account: *account,
                expected,
                actual: nonce,
            })
        }
    }

    /// Consumes the current nonce of `account` and returns it.
    pub(crate) fn advance(&mut self, account: &Address) -> U256 {
        let counter = self.counters.entry(*account).or_insert(U256::ZERO);
        let consumed = *counter;
        *counter = consumed.saturating_add(U256::from(1));
        consumed
    }

    /// Undoes an [`advance`](Self::advance) that returned `consumed`.
    pub(crate) fn rewind(&mut self, account: &Address, consumed: U256) {
        if consumed.is_zero() {
            self.counters.remove(account);
        } else {
            self.counters.insert(*account, consumed);
        }
    }
}
