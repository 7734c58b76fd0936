//! Digest construction and signer recovery for meta-transactions.
//!
//! The signed digest is built in two steps:
//!
//! 1. The struct hash, `keccak256(abi.encode(from, to, value, gas, nonce, data, deadline))`.
//! 2. A wrapping convention selected by [`DigestScheme`]:
//!    - [`DigestScheme::PersonalSign`] applies the EIP-191 `"\x19Ethereum Signed Message:\n32"`
//!      prefix to the struct hash, which is what `signMessage(structHash)` produces.
//!    - [`DigestScheme::TypedData`] hashes an EIP-712 `ForwardRequest` under a domain,
//!      binding the signature to one chain and one verifying contract.
//!
//! The verifier and the off-chain signer must agree on the scheme. A mismatch
//! does not fail loudly; every signature simply recovers to the wrong address.

use alloy_primitives::{Address, B256, Bytes, Signature, U256, eip191_hash_message, keccak256};
use alloy_signer::SignerSync;
use alloy_sol_types::{Eip712Domain, SolStruct, SolValue, sol};
#[cfg(feature = "telemetry")]
use tracing::instrument;

use crate::error::AuthorizationError;
use crate::nonce::NonceRegistry;
use crate::timestamp::UnixTimestamp;
use crate::types::MetaTransaction;

sol! {
    /// EIP-712 typed form of a meta-transaction.
    ///
    /// Field order and types mirror the struct hash tuple.
    #[allow(missing_docs)]
    #[derive(Debug)]
    struct ForwardRequest {
        address from;
        address to;
        uint256 value;
        uint256 gas;
        uint256 nonce;
        bytes data;
        uint256 deadline;
    }
}

impl From<&MetaTransaction> for ForwardRequest {
    fn from(tx: &MetaTransaction) -> Self {
        Self {
            from: tx.from,
            to: tx.to,
            value: tx.value,
            gas: U256::from(tx.gas_limit),
            nonce: tx.nonce,
            data: tx.data.clone(),
            deadline: tx.deadline.into(),
        }
    }
}

/// The "signed message" wrapping convention applied to the struct hash.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DigestScheme {
    /// EIP-191 personal message over the 32-byte struct hash.
    #[default]
    PersonalSign,
    /// EIP-712 typed data under the given domain.
    TypedData(Eip712Domain),
}

impl DigestScheme {
    /// Computes the final digest a signer must sign for `tx`.
    #[must_use]
    pub fn digest(&self, tx: &MetaTransaction) -> B256 {
        match self {
            Self::PersonalSign => eip191_hash_message(struct_hash(tx)),
            Self::TypedData(domain) => ForwardRequest::from(tx).eip712_signing_hash(domain),
        }
    }
}

/// Hashes the fixed-order meta-transaction tuple.
#[must_use]
pub fn struct_hash(tx: &MetaTransaction) -> B256 {
    let encoded = (
        tx.from,
        tx.to,
        tx.value,
        U256::from(tx.gas_limit),
        tx.nonce,
        tx.data.clone(),
        U256::from(tx.deadline.as_secs()),
    )
        .abi_encode_params();
    keccak256(encoded)
}

/// Parses a detached signature.
///
/// Accepts 65-byte `r || s || v` (with `v` in `{0, 1, 27, 28}`) and 64-byte
/// ERC-2098 compact signatures. High-`s` signatures are rejected so each
/// authorization has exactly one valid encoding.
///
/// # Errors
///
/// Returns [`AuthorizationError::InvalidSignature`] for any other input.
pub fn parse_signature(bytes: &[u8]) -> Result<Signature, AuthorizationError> {
    let signature = match bytes.len() {
        65 => {
            let v = bytes[64];
            if !matches!(v, 0 | 1 | 27 | 28) {
                return Err(AuthorizationError::InvalidSignature(format!(
                    "unsupported recovery id {v}"
                )));
            }
            Signature::from_raw(bytes)
                .map_err(|e| AuthorizationError::InvalidSignature(e.to_string()))?
        }
        64 => Signature::from_erc2098(bytes),
        len => {
            return Err(AuthorizationError::InvalidSignature(format!(
                "unsupported signature length {len}"
            )));
        }
    };
    if signature.normalize_s().is_some() {
        return Err(AuthorizationError::InvalidSignature(
            "signature s value is not in the lower half order".to_owned(),
        ));
    }
    Ok(signature)
}

/// Recovers the signer of `digest` from raw signature bytes.
///
/// # Errors
///
/// Returns [`AuthorizationError::InvalidSignature`] if parsing or recovery fails.
pub fn recover_signer(digest: &B256, signature: &[u8]) -> Result<Address, AuthorizationError> {
    parse_signature(signature)?
        .recover_address_from_prehash(digest)
        .map_err(|e| AuthorizationError::InvalidSignature(e.to_string()))
}

/// Signs `tx` with `signer` under `scheme`, returning 65-byte `r || s || v`.
///
/// # Errors
///
/// Returns an [`alloy_signer::Error`] if the signer fails.
pub fn sign_meta_transaction<S>(
    signer: &S,
    scheme: &DigestScheme,
    tx: &MetaTransaction,
) -> alloy_signer::Result<Bytes>
where
    S: SignerSync + ?Sized,
{
    let signature = match scheme {
        DigestScheme::PersonalSign => signer.sign_message_sync(struct_hash(tx).as_slice())?,
        DigestScheme::TypedData(_) => signer.sign_hash_sync(&scheme.digest(tx))?,
    };
    Ok(Bytes::copy_from_slice(&signature.as_bytes()))
}

/// Authenticates meta-transactions against a [`NonceRegistry`].
///
/// Verification is a pure read; it never advances a nonce.
#[derive(Debug, Clone, Default)]
pub struct SignatureVerifier {
    scheme: DigestScheme,
}

impl SignatureVerifier {
    /// Creates a verifier for the given wrapping convention.
    #[must_use]
    pub const fn new(scheme: DigestScheme) -> Self {
        Self { scheme }
    }

    /// Returns the wrapping convention in use.
    #[must_use]
    pub const fn scheme(&self) -> &DigestScheme {
        &self.scheme
    }

    /// Computes the digest for `tx` under this verifier's scheme.
    #[must_use]
    pub fn digest(&self, tx: &MetaTransaction) -> B256 {
        self.scheme.digest(tx)
    }

    /// Authenticates `tx`, returning the signer on success.
    ///
    /// Checks, in order: non-zero `from`/`to`, deadline, signer recovery and
    /// match against `from`, and the nonce counter.
    ///
    /// # Errors
    ///
    /// Returns the first [`AuthorizationError`] encountered.
    #[cfg_attr(feature = "telemetry", instrument(skip_all, err, fields(
        from = %tx.from,
        to = %tx.to,
        nonce = %tx.nonce,
    )))]
    pub fn authenticate(
        &self,
        tx: &MetaTransaction,
        signature: &[u8],
        nonces: &NonceRegistry,
        now: UnixTimestamp,
    ) -> Result<Address, AuthorizationError> {
        if tx.from.is_zero() {
            return Err(AuthorizationError::ZeroAddress("from"));
        }
        if tx.to.is_zero() {
            return Err(AuthorizationError::ZeroAddress("to"));
        }
        if tx.deadline.is_expired_at(now) {
            return Err(AuthorizationError::Expired {
                deadline: tx.deadline,
                now,
            });
        }
        let recovered = recover_signer(&self.digest(tx), signature)?;
        if recovered != tx.from {
            return Err(AuthorizationError::SignerMismatch {
                expected: tx.from,
                recovered,
            });
        }
        nonces.check(&tx.from, tx.nonce)?;
        Ok(recovered)
    }

    /// Returns whether `tx` would authenticate right now.
    #[must_use]
    pub fn verify(
        &self,
        tx: &MetaTransaction,
        signature: &[u8],
        nonces: &NonceRegistry,
        now: UnixTimestamp,
    ) -> bool {
        self.authenticate(tx, signature, nonces, now).is_ok()
    }
}
