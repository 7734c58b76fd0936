//! Wire types for signed meta-transactions.
//!
//! The field names and their order in [`MetaTransaction`] are a wire contract:
//! the digest covers `(from, to, value, gas, nonce, data, deadline)` in exactly
//! this order, so any off-chain signer must build the same tuple.

use alloy_primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};

use crate::timestamp::UnixTimestamp;

/// A user-signed description of a call to be executed by a relayer.
///
/// Constructed off-chain, validated once, then discarded; it is never persisted.
///
/// ```json
/// {
///   "from": "0x70997970C51812dc3A010C7d01b50e0d17dc79C8",
///   "to": "0x5FbDB2315678afecb367f032d93F642f64180aa3",
///   "value": "0x0",
///   "gas": 100000,
///   "nonce": "0x0",
///   "data": "0xa9059cbb",
///   "deadline": "1700000300"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaTransaction {
    /// The authorizing account; must be the signer.
    pub from: Address,
    /// The call target.
    pub to: Address,
    /// Native value forwarded with the call.
    pub value: U256,
    /// Gas limit for the forwarded call.
    #[serde(rename = "gas")]
    pub gas_limit: u64,
    /// Must equal the account's current counter at verification.
    pub nonce: U256,
    /// Opaque call payload, passed verbatim.
    pub data: Bytes,
    /// Latest time at which the call may execute.
    pub deadline: UnixTimestamp,
}

/// The payload a relayer receives and submits to
/// [`Forwarder::execute`](crate::forwarder::Forwarder::execute).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayRequest {
    /// The signed meta-transaction.
    pub meta_tx: MetaTransaction,
    /// Detached signature over the meta-transaction digest.
    pub signature: Bytes,
    /// Token the fee is paid in.
    pub fee_token: Address,
    /// Fee offered to the relayer, in `fee_token` base units.
    pub fee_amount: U256,
}

impl RelayRequest {
    /// Parses a relay request from its JSON wire form.
    ///
    /// # Errors
    ///
    /// Returns a [`serde_json::Error`] if the payload is malformed.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// What the enclosing transaction supplies to an `execute` invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
    /// The relayer submitting the request.
    pub caller: Address,
    /// Gas price the relayer pays for the enclosing transaction.
    pub gas_price: U256,
    /// Native value attached by the relayer.
    pub value: U256,
    /// Current time.
    pub timestamp: UnixTimestamp,
}

impl CallContext {
    /// Creates a context with no attached value at the current system time.
    #[must_use]
    pub fn new(caller: Address, gas_price: U256) -> Self {
        Self {
            caller,
            gas_price,
            value: U256::ZERO,
            timestamp: UnixTimestamp::now(),
        }
    }

    /// Sets the attached native value.
    #[must_use]
    pub const fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    /// Sets the current time.
    #[must_use]
    pub const fn at(mut self, timestamp: UnixTimestamp) -> Self {
        self.timestamp = timestamp;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    #[test]
    fn test_relay_request_wire_names() {
        let json = r#"{
            "metaTx": {
                "from": "0x70997970C51812dc3A010C7d01b50e0d17dc79C8",
                "to": "0x5FbDB2315678afecb367f032d93F642f64180aa3",
                "value": "0x0",
                "gas": 100000,
                "nonce": "0x3",
                "data": "0xa9059cbb",
                "deadline": "1700000300"
            },
            "signature": "0x",
            "feeToken": "0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512",
            "feeAmount": "0x2710"
        }"#;
        let request = RelayRequest::from_json(json).unwrap();
        assert_eq!(
            request.meta_tx.from,
            address!("0x70997970C51812dc3A010C7d01b50e0d17dc79C8")
        );
        assert_eq!(request.meta_tx.gas_limit, 100_000);
        assert_eq!(request.meta_tx.nonce, U256::from(3));
        assert_eq!(request.meta_tx.deadline, UnixTimestamp::from_secs(1_700_000_300));
        assert_eq!(request.fee_amount, U256::from(10_000));
        assert!(request.signature.is_empty());

        let back = serde_json::to_value(&request).unwrap();
        assert_eq!(back["metaTx"]["gas"], 100_000);
        assert!(back["metaTx"].get("gasLimit").is_none());
    }

    #[test]
    fn test_relay_request_missing_field() {
        let json = r#"{"metaTx": {"from": "0x70997970C51812dc3A010C7d01b50e0d17dc79C8"}}"#;
        assert!(RelayRequest::from_json(json).is_err());
    }
}
