#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Meta-transaction forwarding core.
//!
//! A user signs a description of a call off-chain; a relayer submits it and
//! fronts the execution cost in exchange for a fee paid in an allow-listed
//! ERC-20 token. This crate validates such requests and executes them through
//! an injected execution environment.
//!
//! # Features
//!
//! - **Signature Verification**: EIP-191 personal-sign or EIP-712 typed-data
//!   digests, 65-byte and ERC-2098 compact signatures, high-`s` rejection
//! - **Replay Protection**: strictly sequential per-account nonces
//! - **Allow-Lists**: separate fee-token and call-target lists
//! - **Fee Policy**: gas bounds and a basis-point fee multiplier priced at the
//!   relayer's gas price
//! - **Execution Engine**: pause switch, single owner and a reentrancy guard
//!
//! # Architecture
//!
//! - [`forwarder`] - The [`Forwarder`] execution engine and its read surface
//! - [`signature`] - Digest construction, signer recovery and signing helpers
//! - [`nonce`], [`allowlist`], [`fee`], [`access`] - State components
//! - [`admin`] - Owner-gated mutations
//! - [`executor`], [`token`], [`events`] - Seams to the execution environment
//! - [`config`] - TOML configuration
//!
//! # Feature Flags
//!
//! - `telemetry` - `tracing` spans and events
//!
//! # Example
//!
//! ```ignore
//! let config = ForwarderConfig::load()?;
//! let forwarder = config.build_forwarder(executor, ledger, events)?;
//!
//! let request = RelayRequest::from_json(&body)?;
//! let ctx = CallContext::new(relayer, gas_price);
//! let receipt = forwarder.execute(&request, &ctx)?;
//! ```

pub mod access;
pub mod admin;
pub mod allowlist;
pub mod config;
pub mod error;
pub mod events;
pub mod executor;
pub mod fee;
pub mod forwarder;
pub mod nonce;
pub mod signature;
pub mod state;
pub mod timestamp;
pub mod token;
pub mod types;

#[cfg(test)]
mod test_support;

pub use config::{ConfigError, ForwarderConfig, SigningConfig};
pub use error::{
    AdministrationError, AuthorizationError, ErrorReason, ExecutionFailure, ForwarderError,
    PolicyViolation,
};
pub use events::{EventSink, ForwarderEvent, MemoryEventLog};
pub use executor::{CallExecutor, CallRequest, CallResult};
pub use fee::{FeeConfiguration, FeePolicy, GasPriceOracle, StaticGasPrice};
pub use forwarder::{ExecutionReceipt, Forwarder};
pub use signature::{DigestScheme, SignatureVerifier, sign_meta_transaction};
pub use state::{ConfigurationView, ForwarderState};
pub use timestamp::UnixTimestamp;
pub use token::{ContractTokenLedger, TokenError, TokenLedger};
pub use types::{CallContext, MetaTransaction, RelayRequest};
