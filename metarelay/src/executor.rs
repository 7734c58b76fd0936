//! The forwarded-call seam.
//!
//! Dispatching a call to an arbitrary target is the one open-ended operation
//! in the forwarder. It is modelled as an injected [`CallExecutor`] so the
//! authorization logic can run against a fake executor in tests and against a
//! real execution environment in production.

use alloy_primitives::{Address, Bytes, U256, hex};
use alloy_sol_types::{Panic, Revert, SolError};

/// Reason reported when a failed call carries no decodable revert data.
pub const FALLBACK_REVERT_REASON: &str = "execution failed";

/// A bounded call to perform on behalf of a meta-transaction signer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    /// The account the call is made for.
    pub from: Address,
    /// The call target.
    pub to: Address,
    /// Native value to transfer with the call.
    pub value: U256,
    /// Gas available to the call.
    pub gas_limit: u64,
    /// Call payload, unmodified.
    pub data: Bytes,
}

/// Outcome of a [`CallRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallResult {
    /// Whether the call completed without reverting.
    pub success: bool,
    /// Return data on success, revert data on failure.
    pub output: Bytes,
}

impl CallResult {
    /// A successful call returning `output`.
    #[must_use]
    pub const fn success(output: Bytes) -> Self {
        Self {
            success: true,
            output,
        }
    }

    /// A reverted call with `output` as revert data.
    #[must_use]
    pub const fn revert(output: Bytes) -> Self {
        Self {
            success: false,
            output,
        }
    }

    /// Human-readable reason for a failed call.
    #[must_use]
    pub fn revert_reason(&self) -> String {
        decode_revert_reason(&self.output)
    }
}

/// Performs calls against the execution environment.
///
/// Implementations must undo every effect of a call that reports
/// `success == false`. A call may re-enter the forwarder; the forwarder
/// guards against that, not the executor.
pub trait CallExecutor: Send + Sync {
    /// Performs `request` and reports its outcome.
    fn call(&self, request: CallRequest) -> CallResult;
}

impl<T: CallExecutor + ?Sized> CallExecutor for std::sync::Arc<T> {
    fn call(&self, request: CallRequest) -> CallResult {
        (**self).call(request)
    }
}

/// Decodes revert data into a human-readable reason.
///
/// Supports `Error(string)` and `Panic(uint256)`. Data too short to carry a
/// selector yields [`FALLBACK_REVERT_REASON`]; unknown selectors are reported
/// in hex.
#[must_use]
pub fn decode_revert_reason(output: &[u8]) -> String {
    if let Ok(revert) = Revert::abi_decode(output) {
        return revert.reason;
    }
    if let Ok(panic) = Panic::abi_decode(output) {
        return format!("Panic({:#x})", panic.code);
    }
    if output.len() >= 4 {
        return format!(
            "{FALLBACK_REVERT_REASON}: unknown error 0x{}",
            hex::encode(&output[..4])
        );
    }
    FALLBACK_REVERT_REASON.to_owned()
}
