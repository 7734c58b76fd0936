//! Error types for meta-transaction forwarding.
//!
//! Failures fall into four families, each fatal to the call that raised it:
//!
//! - [`AuthorizationError`] - bad signature, wrong nonce, expired deadline
//! - [`PolicyViolation`] - disallowed token or target, gas bounds, insufficient fee
//! - [`ExecutionFailure`] - the forwarded call itself failed
//! - [`AdministrationError`] - non-owner mutation, duplicate add, missing remove
//!
//! Every error maps to a machine-readable [`ErrorReason`] so a relayer can
//! report failures without parsing messages.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::timestamp::UnixTimestamp;

/// Top-level error returned by [`Forwarder`](crate::forwarder::Forwarder) operations.
#[derive(Debug, thiserror::Error)]
pub enum ForwarderError {
    /// Execution is paused by the owner.
    #[error("Forwarder is paused")]
    Paused,
    /// `execute` was called again from inside a forwarded call.
    #[error("Reentrant call to execute rejected")]
    Reentrancy,
    /// Another thread is running `execute` on the same forwarder.
    #[error("Forwarder is busy with another execution")]
    Busy,
    /// The meta-transaction could not be authenticated.
    #[error(transparent)]
    Authorization(#[from] AuthorizationError),
    /// The request breaks a fee, gas or allow-list policy.
    #[error(transparent)]
    Policy(#[from] PolicyViolation),
    /// The forwarded call failed after the fee was collected.
    #[error(transparent)]
    Execution(#[from] ExecutionFailure),
    /// An administrative mutation was rejected.
    #[error(transparent)]
    Administration(#[from] AdministrationError),
}

/// Errors raised while authenticating a meta-transaction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthorizationError {
    /// The `from` or `to` field is the zero address.
    #[error("Meta-transaction field `{0}` must not be the zero address")]
    ZeroAddress(&'static str),
    /// The deadline is before the current time.
    #[error("Meta-transaction expired at {deadline} (now {now})")]
    Expired {
        /// Deadline carried by the meta-transaction.
        deadline: UnixTimestamp,
        /// Time at verification.
        now: UnixTimestamp,
    },
    /// The signature bytes could not be parsed or no signer could be recovered.
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),
    /// The recovered signer is not the `from` account.
    #[error("Signature was produced by {recovered}, expected {expected}")]
    SignerMismatch {
        /// The `from` field of the meta-transaction.
        expected: Address,
        /// The address recovered from the signature.
        recovered: Address,
    },
    /// The nonce does not equal the account's current counter.
    #[error("Invalid nonce for {account}: expected {expected}, got {actual}")]
    InvalidNonce {
        /// The authorizing account.
        account: Address,
        /// The account's current counter value.
        expected: U256,
        /// The nonce carried by the meta-transaction.
        actual: U256,
    },
}

/// Errors raised when a request breaks the forwarder's policy.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyViolation {
    /// The fee token is not on the fee-token allow-list.
    #[error("Fee token {0} is not allowed")]
    FeeTokenNotAllowed(Address),
    /// The call target is not on the target allow-list.
    #[error("Call target {0} is not allowed")]
    TargetNotAllowed(Address),
    /// The gas limit is below the configured minimum.
    #[error("Gas limit {gas_limit} is below the minimum of {min_gas_limit}")]
    GasLimitTooLow {
        /// Requested gas limit.
        gas_limit: u64,
        /// Configured minimum.
        min_gas_limit: u64,
    },
    /// The gas limit is above the configured maximum.
    #[error("Gas limit {gas_limit} exceeds the maximum of {max_gas_limit}")]
    GasLimitTooHigh {
        /// Requested gas limit.
        gas_limit: u64,
        /// Configured maximum.
        max_gas_limit: u64,
    },
    /// The supplied fee is below the minimum fee for the gas limit.
    #[error("Fee {supplied} is below the required minimum of {required}")]
    InsufficientFee {
        /// Fee offered by the relayer request.
        supplied: U256,
        /// Minimum fee computed by the fee policy.
        required: U256,
    },
    /// The native value attached to the enclosing call does not match `value`.
    #[error("Attached value {attached} does not match meta-transaction value {expected}")]
    ValueMismatch {
        /// The meta-transaction `value`.
        expected: U256,
        /// The value attached by the relayer.
        attached: U256,
    },
    /// The payer's fee-token balance is below the fee.
    #[error("Fee token balance {balance} is below the fee of {fee}")]
    InsufficientBalance {
        /// Payer balance.
        balance: U256,
        /// Fee amount.
        fee: U256,
    },
    /// The payer's allowance to the forwarder is below the fee.
    #[error("Fee token allowance {allowance} is below the fee of {fee}")]
    InsufficientAllowance {
        /// Allowance granted to the forwarder.
        allowance: U256,
        /// Fee amount.
        fee: U256,
    },
    /// The fee transfer was rejected by the token.
    #[error("Fee transfer failed: {0}")]
    FeeTransferFailed(String),
}

/// The forwarded call failed.
///
/// The fee was already collected and the nonce already consumed when this is
/// raised; only the forwarded call's own effects are undone.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Forwarded call failed: {reason}")]
pub struct ExecutionFailure {
    /// Decoded revert reason, or a generic fallback.
    pub reason: String,
    /// The account that authorized the call.
    pub from: Address,
    /// The nonce consumed by the call.
    pub nonce: U256,
    /// Fee collected before the call was attempted.
    pub fee_charged: U256,
}

/// Errors raised by owner-gated administration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdministrationError {
    /// The caller is not the owner.
    #[error("Caller {0} is not the owner")]
    NotOwner(Address),
    /// The zero address was supplied where an identity is required.
    #[error("Zero address is not a valid {0}")]
    ZeroAddress(&'static str),
    /// The identity is already on the list.
    #[error("{list} already contains {address}")]
    AlreadyListed {
        /// Which list.
        list: &'static str,
        /// The offending identity.
        address: Address,
    },
    /// The identity is not on the list.
    #[error("{list} does not contain {address}")]
    NotListed {
        /// Which list.
        list: &'static str,
        /// The offending identity.
        address: Address,
    },
    /// The fee multiplier would charge less than raw cost.
    #[error("Fee multiplier {0} is below the 10000 basis point floor")]
    MultiplierTooLow(u32),
    /// The gas limits would violate `min < max`.
    #[error("Invalid gas limit bounds: min {min} must be below max {max}")]
    InvalidGasBounds {
        /// Minimum gas limit.
        min: u64,
        /// Maximum gas limit.
        max: u64,
    },
    /// The fallback gas price must be non-zero.
    #[error("Fallback gas price must be non-zero")]
    ZeroFallbackGasPrice,
    /// The forwarder is already paused.
    #[error("Forwarder is already paused")]
    AlreadyPaused,
    /// The forwarder is not paused.
    #[error("Forwarder is not paused")]
    NotPaused,
}

/// Machine-readable error reason codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorReason {
    /// Execution is paused.
    Paused,
    /// `execute` re-entered from a forwarded call.
    Reentrancy,
    /// `execute` already running on another thread.
    Busy,
    /// A zero address in the meta-transaction.
    ZeroAddress,
    /// The deadline has passed.
    Expired,
    /// Unparseable or unrecoverable signature.
    InvalidSignature,
    /// Signature from someone other than `from`.
    SignerMismatch,
    /// Nonce does not match the counter.
    InvalidNonce,
    /// Fee token not allowed.
    FeeTokenNotAllowed,
    /// Target not allowed.
    TargetNotAllowed,
    /// Gas limit outside bounds.
    GasLimitOutOfBounds,
    /// Fee below the minimum.
    InsufficientFee,
    /// Attached native value mismatch.
    ValueMismatch,
    /// Payer cannot cover the fee.
    InsufficientFunds,
    /// Fee transfer rejected.
    FeeTransferFailed,
    /// The forwarded call reverted.
    ExecutionFailed,
    /// Caller is not the owner.
    Unauthorized,
    /// Invalid administrative input.
    InvalidConfiguration,
}

impl ErrorReason {
    /// Returns the `snake_case` string representation matching the wire format.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Paused => "paused",
            Self::Reentrancy => "reentrancy",
            Self::Busy => "busy",
            Self::ZeroAddress => "zero_address",
            Self::Expired => "expired",
            Self::InvalidSignature => "invalid_signature",
            Self::SignerMismatch => "signer_mismatch",
            Self::InvalidNonce => "invalid_nonce",
            Self::FeeTokenNotAllowed => "fee_token_not_allowed",
            Self::TargetNotAllowed => "target_not_allowed",
            Self::GasLimitOutOfBounds => "gas_limit_out_of_bounds",
            Self::InsufficientFee => "insufficient_fee",
            Self::ValueMismatch => "value_mismatch",
            Self::InsufficientFunds => "insufficient_funds",
            Self::FeeTransferFailed => "fee_transfer_failed",
            Self::ExecutionFailed => "execution_failed",
            Self::Unauthorized => "unauthorized",
            Self::InvalidConfiguration => "invalid_configuration",
        }
    }
}

impl core::fmt::Display for ErrorReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ForwarderError {
    /// Returns the machine-readable reason for this error.
    #[must_use]
    pub const fn reason(&self) -> ErrorReason {
        match self {
            Self::Paused => ErrorReason::Paused,
            Self::Reentrancy => ErrorReason::Reentrancy,
            Self::Busy => ErrorReason::Busy,
            Self::Authorization(e) => e.reason(),
            Self::Policy(e) => e.reason(),
            Self::Execution(_) => ErrorReason::ExecutionFailed,
            Self::Administration(e) => e.reason(),
        }
    }
}

impl AuthorizationError {
    /// Returns the machine-readable reason for this error.
    #[must_use]
    pub const fn reason(&self) -> ErrorReason {
        match self {
            Self::ZeroAddress(_) => ErrorReason::ZeroAddress,
            Self::Expired { .. } => ErrorReason::Expired,
            Self::InvalidSignature(_) => ErrorReason::InvalidSignature,
            Self::SignerMismatch { .. } => ErrorReason::SignerMismatch,
            Self::InvalidNonce { .. } => ErrorReason::InvalidNonce,
        }
    }
}

impl PolicyViolation {
    /// Returns the machine-readable reason for this error.
    #[must_use]
    pub const fn reason(&self) -> ErrorReason {
        match self {
            Self::FeeTokenNotAllowed(_) => ErrorReason::FeeTokenNotAllowed,
            Self::TargetNotAllowed(_) => ErrorReason::TargetNotAllowed,
            Self::GasLimitTooLow { .. } | Self::GasLimitTooHigh { .. } => {
                ErrorReason::GasLimitOutOfBounds
            }
            Self::InsufficientFee { .. } => ErrorReason::InsufficientFee,
            Self::ValueMismatch { .. } => ErrorReason::ValueMismatch,
            Self::InsufficientBalance { .. } | Self::InsufficientAllowance { .. } => {
                ErrorReason::InsufficientFunds
            }
            Self::FeeTransferFailed(_) => ErrorReason::FeeTransferFailed,
        }
    }
}

impl AdministrationError {
    /// Returns the machine-readable reason for this error.
    #[must_use]
    pub const fn reason(&self) -> ErrorReason {
        match self {
            Self::NotOwner(_) => ErrorReason::Unauthorized,
            _ => ErrorReason::InvalidConfiguration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_wire_format() {
        let json = serde_json::to_string(&ErrorReason::GasLimitOutOfBounds).unwrap();
        assert_eq!(json, "\"gas_limit_out_of_bounds\"");
        assert_eq!(ErrorReason::GasLimitOutOfBounds.as_str(), "gas_limit_out_of_bounds");
    }

    #[test]
    fn test_policy_message_names_bound() {
        let err = PolicyViolation::GasLimitTooHigh {
            gas_limit: 2_000_000,
            max_gas_limit: 1_000_000,
        };
        assert_eq!(
            err.to_string(),
            "Gas limit 2000000 exceeds the maximum of 1000000"
        );
    }

    #[test]
    fn test_nested_reason() {
        let err: ForwarderError = AdministrationError::NotOwner(Address::ZERO).into();
        assert_eq!(err.reason(), ErrorReason::Unauthorized);
        let err: ForwarderError = AuthorizationError::ZeroAddress("to").into();
        assert_eq!(err.reason(), ErrorReason::ZeroAddress);
    }
}
