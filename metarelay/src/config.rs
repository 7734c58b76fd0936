//! Forwarder configuration.
//!
//! Loads configuration from a TOML file with support for environment variable
//! expansion in string values. Variables use `$VAR` or `${VAR}` syntax.
//!
//! # Example Configuration
//!
//! ```toml
//! owner = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
//! forwarder_address = "$FORWARDER_ADDRESS"
//! fee_multiplier = 12000
//! fee_tokens = ["0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512"]
//! targets = ["0x5FbDB2315678afecb367f032d93F642f64180aa3"]
//!
//! [signing]
//! scheme = "eip712"
//! name = "MetaRelayForwarder"
//! version = "1"
//! chain_id = 8453
//! verifying_contract = "$FORWARDER_ADDRESS"
//! ```
//!
//! # Environment Variables
//!
//! - `CONFIG` - Path to configuration file (default: `metarelay.toml`)
//! - Any variable referenced by `$VAR` in the config file

use std::path::Path;
use std::sync::Arc;

use alloy_primitives::{Address, U256};
use alloy_sol_types::Eip712Domain;
use serde::{Deserialize, Serialize};

use crate::access::AccessControl;
use crate::allowlist::ListKind;
use crate::error::AdministrationError;
use crate::events::EventSink;
use crate::executor::CallExecutor;
use crate::fee::{
    DEFAULT_FALLBACK_GAS_PRICE, DEFAULT_FEE_MULTIPLIER, DEFAULT_MAX_GAS_LIMIT,
    DEFAULT_MIN_GAS_LIMIT, FeeConfiguration, FeePolicy,
};
use crate::forwarder::Forwarder;
use crate::signature::{DigestScheme, SignatureVerifier};
use crate::state::ForwarderState;
use crate::token::TokenLedger;

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    /// The TOML did not parse into a [`ForwarderConfig`].
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    /// The values parsed but describe an invalid forwarder.
    #[error("Invalid configuration: {0}")]
    Invalid(#[from] AdministrationError),
}

/// Top-level forwarder configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForwarderConfig {
    /// Initial owner.
    pub owner: Address,

    /// Identity the forwarder spends fee allowances as.
    pub forwarder_address: Address,

    /// Fee recipient. Fees go to the submitting relayer when unset.
    #[serde(default)]
    pub fee_recipient: Option<Address>,

    /// Largest gas limit a meta-transaction may request (default: `1_000_000`).
    #[serde(default = "default_max_gas_limit")]
    pub max_gas_limit: u64,

    /// Smallest gas limit a meta-transaction may request (default: `21_000`).
    #[serde(default = "default_min_gas_limit")]
    pub min_gas_limit: u64,

    /// Fee multiplier in basis points (default: `11_000`).
    #[serde(default = "default_fee_multiplier")]
    pub fee_multiplier: u32,

    /// Gas price for estimates without a network reading (default: 1 gwei).
    #[serde(default = "default_fallback_gas_price")]
    pub fallback_gas_price: U256,

    /// Initial fee-token allow-list.
    #[serde(default)]
    pub fee_tokens: Vec<Address>,

    /// Initial target allow-list.
    #[serde(default)]
    pub targets: Vec<Address>,

    /// Signed-message wrapping convention.
    #[serde(default)]
    pub signing: SigningConfig,
}

/// Signed-message wrapping convention.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "snake_case")]
pub enum SigningConfig {
    /// EIP-191 personal message over the struct hash.
    #[default]
    PersonalSign,
    /// EIP-712 typed data under the given domain.
    Eip712 {
        /// Domain name.
        name: String,
        /// Domain version.
        version: String,
        /// Chain the signatures are valid on.
        chain_id: u64,
        /// Contract the signatures are bound to.
        verifying_contract: Address,
    },
}

impl SigningConfig {
    /// The digest scheme this configuration selects.
    #[must_use]
    pub fn scheme(&self) -> DigestScheme {
        match self {
            Self::PersonalSign => DigestScheme::PersonalSign,
            Self::Eip712 {
                name,
                version,
                chain_id,
                verifying_contract,
            } => DigestScheme::TypedData(Eip712Domain::new(
                Some(name.clone().into()),
                Some(version.clone().into()),
                Some(U256::from(*chain_id)),
                Some(*verifying_contract),
                None,
            )),
        }
    }
}

const fn default_max_gas_limit() -> u64 {
    DEFAULT_MAX_GAS_LIMIT
}

const fn default_min_gas_limit() -> u64 {
    DEFAULT_MIN_GAS_LIMIT
}

const fn default_fee_multiplier() -> u32 {
    DEFAULT_FEE_MULTIPLIER
}

fn default_fallback_gas_price() -> U256 {
    U256::from(DEFAULT_FALLBACK_GAS_PRICE)
}

impl ForwarderConfig {
    /// Loads configuration from the path given by the `CONFIG` environment
    /// variable, falling back to `metarelay.toml` in the current directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("CONFIG").unwrap_or_else(|_| "metarelay.toml".to_owned());
        Self::load_from(path)
    }

    /// Loads configuration from a specific file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parses configuration from TOML, expanding `$VAR` references from the
    /// process environment first.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the expanded TOML is malformed.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let expanded = expand_vars(content, |name| std::env::var(name).ok());
        Ok(toml::from_str(&expanded)?)
    }

    /// The fee part of the configuration.
    #[must_use]
    pub const fn fee_configuration(&self) -> FeeConfiguration {
        FeeConfiguration {
            max_gas_limit: self.max_gas_limit,
            min_gas_limit: self.min_gas_limit,
            fee_multiplier: self.fee_multiplier,
            fallback_gas_price: self.fallback_gas_price,
        }
    }

    /// A verifier for the configured signing scheme.
    #[must_use]
    pub fn verifier(&self) -> SignatureVerifier {
        SignatureVerifier::new(self.signing.scheme())
    }

    /// Builds the initial forwarder state.
    ///
    /// # Errors
    ///
    /// Fails on a zero owner or recipient, invalid fee bounds, and zero or
    /// duplicate allow-list entries.
    pub fn build_state(&self) -> Result<ForwarderState, AdministrationError> {
        let mut state = ForwarderState::new(
            AccessControl::new(self.owner)?,
            FeePolicy::new(self.fee_configuration())?,
        );
        if self.fee_recipient.is_some_and(|r| r.is_zero()) {
            return Err(AdministrationError::ZeroAddress("fee recipient"));
        }
        state.fee_recipient = self.fee_recipient;
        for token in &self.fee_tokens {
            state.allow_lists.list_mut(ListKind::FeeToken).add(*token)?;
        }
        for target in &self.targets {
            state.allow_lists.list_mut(ListKind::Target).add(*target)?;
        }
        Ok(state)
    }

    /// Builds a forwarder from this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the configuration is rejected.
    pub fn build_forwarder(
        &self,
        executor: Arc<dyn CallExecutor>,
        ledger: Arc<dyn TokenLedger>,
        events: Arc<dyn EventSink>,
    ) -> Result<Forwarder, ConfigError> {
        let forwarder = Forwarder::new(
            self.forwarder_address,
            self.build_state()?,
            self.verifier(),
            executor,
            ledger,
            events,
        )?;
        Ok(forwarder)
    }
}

/// Expands `$VAR` and `${VAR}` patterns in a string using `lookup`.
///
/// Unresolved variables are left as-is.
fn expand_vars<F>(input: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' {
            result.push(ch);
            continue;
        }
        let braced = chars.next_if_eq(&'{').is_some();

        let mut var_name = String::new();
        let mut closed = false;
        while let Some(&c) = chars.peek() {
            if braced {
                if c == '}' {
                    chars.next();
                    closed = true;
                    break;
                }
            } else if !c.is_ascii_alphanumeric() && c != '_' {
                break;
            }
            var_name.push(c);
            chars.next();
        }

        if let Some(value) = (!var_name.is_empty()).then(|| lookup(&var_name)).flatten() {
            result.push_str(&value);
            continue;
        }
        result.push('$');
        if braced {
            result.push('{');
        }
        result.push_str(&var_name);
        if closed {
            result.push('}');
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FEE_TOKEN, FORWARDER, OWNER, TARGET};
    use std::collections::HashMap;

    const MINIMAL: &str = r#"
        owner = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
        forwarder_address = "0x9fE46736679d2D9a65F0992F2272dE9f3c7fa6e0"
    "#;

    #[test]
    fn test_defaults() {
        let config = ForwarderConfig::from_toml_str(MINIMAL).unwrap();
        assert_eq!(config.owner, OWNER);
        assert_eq!(config.forwarder_address, FORWARDER);
        assert_eq!(config.fee_configuration(), FeeConfiguration::default());
        assert_eq!(config.signing, SigningConfig::PersonalSign);
        assert!(config.fee_tokens.is_empty());
        assert_eq!(config.fee_recipient, None);
    }

    #[test]
    fn test_full_config_builds_state() {
        let toml = r#"
            owner = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
            forwarder_address = "0x9fE46736679d2D9a65F0992F2272dE9f3c7fa6e0"
            fee_multiplier = 12000
            max_gas_limit = 2000000
            fallback_gas_price = "0x77359400"
            fee_tokens = ["0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512"]
            targets = ["0x5FbDB2315678afecb367f032d93F642f64180aa3"]

            [signing]
            scheme = "eip712"
            name = "MetaRelayForwarder"
            version = "1"
            chain_id = 8453
            verifying_contract = "0x9fE46736679d2D9a65F0992F2272dE9f3c7fa6e0"
        "#;
        let config = ForwarderConfig::from_toml_str(toml).unwrap();
        let state = config.build_state().unwrap();
        let view = state.configuration();
        assert_eq!(view.fee_multiplier, 12_000);
        assert_eq!(view.max_gas_limit, 2_000_000);
        assert_eq!(view.fallback_gas_price, U256::from(2_000_000_000u64));
        assert_eq!(view.fee_tokens, vec![FEE_TOKEN]);
        assert_eq!(view.targets, vec![TARGET]);

        let DigestScheme::TypedData(domain) = config.signing.scheme() else {
            panic!("expected typed data scheme");
        };
        assert_eq!(domain.chain_id, Some(U256::from(8453)));
        assert_eq!(domain.verifying_contract, Some(FORWARDER));
    }

    #[test]
    fn test_invalid_values_rejected_at_build() {
        let mut config = ForwarderConfig::from_toml_str(MINIMAL).unwrap();
        config.min_gas_limit = config.max_gas_limit;
        assert!(matches!(
            config.build_state(),
            Err(AdministrationError::InvalidGasBounds { .. })
        ));

        let mut config = ForwarderConfig::from_toml_str(MINIMAL).unwrap();
        config.fee_tokens = vec![FEE_TOKEN, FEE_TOKEN];
        assert!(matches!(
            config.build_state(),
            Err(AdministrationError::AlreadyListed { .. })
        ));

        let mut config = ForwarderConfig::from_toml_str(MINIMAL).unwrap();
        config.fee_recipient = Some(Address::ZERO);
        assert_eq!(
            config.build_state().unwrap_err(),
            AdministrationError::ZeroAddress("fee recipient")
        );
    }

    #[test]
    fn test_missing_owner_is_a_parse_error() {
        let err = ForwarderConfig::from_toml_str("fee_multiplier = 12000").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_expand_vars() {
        let vars = HashMap::from([
            ("FORWARDER_ADDRESS", "0x9fE46736679d2D9a65F0992F2272dE9f3c7fa6e0"),
            ("CHAIN", "8453"),
        ]);
        let lookup = |name: &str| vars.get(name).map(|v| (*v).to_owned());

        assert_eq!(
            expand_vars("addr = \"$FORWARDER_ADDRESS\"", lookup),
            "addr = \"0x9fE46736679d2D9a65F0992F2272dE9f3c7fa6e0\""
        );
        assert_eq!(expand_vars("chain_id = ${CHAIN}", lookup), "chain_id = 8453");
        assert_eq!(expand_vars("x = \"$UNSET\"", lookup), "x = \"$UNSET\"");
        assert_eq!(expand_vars("x = \"${UNSET}\"", lookup), "x = \"${UNSET}\"");
        assert_eq!(expand_vars("cost = $ 5", lookup), "cost = $ 5");
    }
}
