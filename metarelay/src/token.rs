//! Fee-token interface.
//!
//! The forwarder collects fees through the standard allowance mechanism: the
//! signer approves the forwarder, and the forwarder pulls the fee with
//! `transferFrom`. [`TokenLedger`] is the minimal surface it needs;
//! [`ContractTokenLedger`] implements it against ERC-20 contracts through a
//! [`CallExecutor`].

use alloy_primitives::{Address, U256};
use alloy_sol_types::{SolCall, sol};

use crate::executor::{CallExecutor, CallRequest};

/// Gas given to each ERC-20 call issued by [`ContractTokenLedger`].
pub const TOKEN_CALL_GAS: u64 = 100_000;

sol! {
    /// Minimal ERC-20 interface for fee collection.
    #[allow(missing_docs)]
    #[derive(Debug)]
    interface IERC20 {
        function balanceOf(address account) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function transferFrom(address from, address to, uint256 value) external returns (bool);
    }
}

/// Errors reported by a [`TokenLedger`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// The token call reverted.
    #[error("Token call reverted: {0}")]
    Reverted(String),
    /// The token returned `false` from `transferFrom`.
    #[error("Token rejected the transfer")]
    Rejected,
    /// The token returned data that does not decode.
    #[error("Malformed token return data: {0}")]
    InvalidReturn(String),
}

/// Balance, allowance and allowance-based transfer for fee tokens.
pub trait TokenLedger: Send + Sync {
    /// Balance of `account` in `token`.
    ///
    /// # Errors
    ///
    /// Returns a [`TokenError`] if the query fails.
    fn balance_of(&self, token: Address, account: Address) -> Result<U256, TokenError>;

    /// Amount `spender` may pull from `owner` in `token`.
    ///
    /// # Errors
    ///
    /// Returns a [`TokenError`] if the query fails.
    fn allowance(&self, token: Address, owner: Address, spender: Address)
    -> Result<U256, TokenError>;

    /// Moves `amount` of `token` from `from` to `to`, spending `spender`'s allowance.
    ///
    /// # Errors
    ///
    /// Returns a [`TokenError`] if the transfer does not happen.
    fn transfer_from(
        &self,
        token: Address,
        spender: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), TokenError>;
}

impl<T: TokenLedger + ?Sized> TokenLedger for std::sync::Arc<T> {
    fn balance_of(&self, token: Address, account: Address) -> Result<U256, TokenError> {
        (**self).balance_of(token, account)
    }

    fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, TokenError> {
        (**self).allowance(token, owner, spender)
    }

    fn transfer_from(
        &self,
        token: Address,
        spender: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), TokenError> {
        (**self).transfer_from(token, spender, from, to, amount)
    }
}

/// A [`TokenLedger`] that ABI-encodes ERC-20 calls and runs them through a
/// [`CallExecutor`].
///
/// `transferFrom` is accepted when it returns `true` or returns nothing, which
/// covers tokens that predate the boolean return value.
#[derive(Debug, Clone)]
pub struct ContractTokenLedger<E> {
    executor: E,
}

impl<E: CallExecutor> ContractTokenLedger<E> {
    /// Wraps `executor`.
    pub const fn new(executor: E) -> Self {
        Self { executor }
    }

    fn invoke<C: SolCall>(
        &self,
        caller: Address,
        token: Address,
        call: &C,
    ) -> Result<C::Return, TokenError> {
        let result = self.executor.call(CallRequest {
            from: caller,
            to: token,
            value: U256::ZERO,
            gas_limit: TOKEN_CALL_GAS,
            data: call.abi_encode().into(),
        });
        if !result.success {
            return Err(TokenError::Reverted(result.revert_reason()));
        }
        C::abi_decode_returns(&result.output).map_err(|e| TokenError::InvalidReturn(e.to_string()))
    }
}

impl<E: CallExecutor> TokenLedger for ContractTokenLedger<E> {
    fn balance_of(&self, token: Address, account: Address) -> Result<U256, TokenError> {
        self.invoke(account, token, &IERC20::balanceOfCall { account })
    }

    fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, TokenError> {
        self.invoke(spender, token, &IERC20::allowanceCall { owner, spender })
    }

    fn transfer_from(
        &self,
        token: Address,
        spender: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), TokenError> {
        let call = IERC20::transferFromCall {
            from,
            to,
            value: amount,
        };
        let result = self.executor.call(CallRequest {
            from: spender,
            to: token,
            value: U256::ZERO,
            gas_limit: TOKEN_CALL_GAS,
            data: call.abi_encode().into(),
        });
        if !result.success {
            return Err(TokenError::Reverted(result.revert_reason()));
        }
        if result.output.is_empty() {
            return Ok(());
        }
        let accepted = IERC20::transferFromCall::abi_decode_returns(&result.output)
            .map_err(|e| TokenError::InvalidReturn(e.to_string()))?;
        if accepted {
            Ok(())
        } else {
            Err(TokenError::Rejected)
        }
    }
}
