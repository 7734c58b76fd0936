//! The execution engine.
//!
//! [`Forwarder::execute`] takes a relay request through
//! `Received -> Validated -> Executing -> {Succeeded | Failed}` in a single
//! invocation:
//!
//! 1. reject while paused, then enter the reentrancy guard
//! 2. check the fee token, target, gas bounds and attached value
//! 3. authenticate the signature, deadline and nonce
//! 4. check the fee against the minimum at the relayer's gas price
//! 5. check the payer's balance and allowance, advance the nonce, pull the fee
//! 6. perform the forwarded call
//!
//! The fee is collected before the forwarded call and kept whatever its
//! outcome, as is the nonce advance. A failed fee pull rolls the nonce back.
//!
//! The state lock is never held across a call into the [`CallExecutor`] or the
//! [`TokenLedger`], so a forwarded call may read the forwarder. Re-entering
//! [`Forwarder::execute`] is rejected by the reentrancy guard, which also
//! serializes concurrent executions.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use alloy_primitives::{Address, B256, Bytes, U256};
#[cfg(feature = "telemetry")]
use tracing::instrument;

use crate::access::{LockConflict, ReentrancyLock};
use crate::admin;
use crate::allowlist::ListKind;
use crate::error::{
    AdministrationError, AuthorizationError, ExecutionFailure, ForwarderError, PolicyViolation,
};
use crate::events::{EventSink, ForwarderEvent};
use crate::executor::{CallExecutor, CallRequest};
use crate::fee::GasPriceOracle;
use crate::signature::SignatureVerifier;
use crate::state::{ConfigurationView, ForwarderState};
use crate::timestamp::UnixTimestamp;
use crate::token::TokenLedger;
use crate::types::{CallContext, MetaTransaction, RelayRequest};

/// Outcome of a successful [`Forwarder::execute`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionReceipt {
    /// The authorizing account.
    pub from: Address,
    /// The call target.
    pub to: Address,
    /// The nonce that was consumed.
    pub nonce: U256,
    /// Token the fee was paid in.
    pub fee_token: Address,
    /// Fee collected.
    pub fee_amount: U256,
    /// Account that received the fee.
    pub fee_recipient: Address,
    /// Return data of the forwarded call.
    pub output: Bytes,
}

/// A meta-transaction forwarder bound to one deployment address.
pub struct Forwarder {
    address: Address,
    verifier: SignatureVerifier,
    state: Mutex<ForwarderState>,
    reentrancy: ReentrancyLock,
    executor: Arc<dyn CallExecutor>,
    ledger: Arc<dyn TokenLedger>,
    events: Arc<dyn EventSink>,
}

impl std::fmt::Debug for Forwarder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Forwarder")
            .field("address", &self.address)
            .field("verifier", &self.verifier)
            .field("state", &self.state)
            .field("reentrancy", &self.reentrancy)
            .finish_non_exhaustive()
    }
}

/// Fee collection resolved during validation.
struct FeeCharge {
    token: Address,
    amount: U256,
    recipient: Address,
}

impl Forwarder {
    /// Creates a forwarder.
    ///
    /// `address` is the identity the forwarder spends fee allowances as.
    ///
    /// # Errors
    ///
    /// Returns [`AdministrationError::ZeroAddress`] if `address` is zero.
    pub fn new(
        address: Address,
        state: ForwarderState,
        verifier: SignatureVerifier,
        executor: Arc<dyn CallExecutor>,
        ledger: Arc<dyn TokenLedger>,
        events: Arc<dyn EventSink>,
    ) -> Result<Self, AdministrationError> {
        if address.is_zero() {
            return Err(AdministrationError::ZeroAddress("forwarder"));
        }
        Ok(Self {
            address,
            verifier,
            state: Mutex::new(state),
            reentrancy: ReentrancyLock::new(),
            executor,
            ledger,
            events,
        })
    }

    fn state(&self) -> MutexGuard<'_, ForwarderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Validates and executes a relay request.
    ///
    /// # Errors
    ///
    /// - [`ForwarderError::Paused`] while paused
    /// - [`ForwarderError::Reentrancy`] when called from inside a forwarded call
    /// - [`ForwarderError::Busy`] while another thread is executing
    /// - [`ForwarderError::Policy`] or [`ForwarderError::Authorization`] when
    ///   validation fails; no state changes
    /// - [`ForwarderError::Execution`] when the forwarded call fails; the nonce
    ///   and fee stay consumed
    #[cfg_attr(feature = "telemetry", instrument(skip_all, err, fields(
        from = %request.meta_tx.from,
        to = %request.meta_tx.to,
        nonce = %request.meta_tx.nonce,
        relayer = %ctx.caller,
    )))]
    pub fn execute(
        &self,
        request: &RelayRequest,
        ctx: &CallContext,
    ) -> Result<ExecutionReceipt, ForwarderError> {
        if self.is_paused() {
            return Err(ForwarderError::Paused);
        }
        let _guard = self.reentrancy.enter().map_err(|conflict| match conflict {
            LockConflict::Reentrant => ForwarderError::Reentrancy,
            LockConflict::Busy => ForwarderError::Busy,
        })?;

        let tx = &request.meta_tx;
        let charge = self.validate(request, ctx)?;
        self.check_fee_funds(tx.from, &charge)?;

        let nonce = self.state().nonces.advance(&tx.from);
        if let Err(violation) = self.collect_fee(tx.from, &charge) {
            self.state().nonces.rewind(&tx.from, nonce);
            return Err(violation.into());
        }

        let result = self.executor.call(CallRequest {
            from: tx.from,
            to: tx.to,
            value: tx.value,
            gas_limit: tx.gas_limit,
            data: tx.data.clone(),
        });

        if !result.success {
            let reason = result.revert_reason();
            #[cfg(feature = "telemetry")]
            tracing::warn!(%reason, "Forwarded call failed");
            self.events.emit(ForwarderEvent::TransactionFailed {
                from: tx.from,
                to: tx.to,
                nonce,
                reason: reason.clone(),
            });
            return Err(ExecutionFailure {
                reason,
                from: tx.from,
                nonce,
                fee_charged: charge.amount,
            }
            .into());
        }

        #[cfg(feature = "telemetry")]
        tracing::info!(fee = %charge.amount, "Meta-transaction executed");
        self.events.emit(ForwarderEvent::TransactionExecuted {
            from: tx.from,
            to: tx.to,
            nonce,
            fee_token: charge.token,
            fee_amount: charge.amount,
        });
        Ok(ExecutionReceipt {
            from: tx.from,
            to: tx.to,
            nonce,
            fee_token: charge.token,
            fee_amount: charge.amount,
            fee_recipient: charge.recipient,
            output: result.output,
        })
    }

    /// Policy and authorization checks. Reads state only.
    fn validate(
        &self,
        request: &RelayRequest,
        ctx: &CallContext,
    ) -> Result<FeeCharge, ForwarderError> {
        let tx = &request.meta_tx;
        let state = self.state();

        if !state.allow_lists.is_fee_token_allowed(&request.fee_token) {
            return Err(PolicyViolation::FeeTokenNotAllowed(request.fee_token).into());
        }
        if !state.allow_lists.is_target_allowed(&tx.to) {
            return Err(PolicyViolation::TargetNotAllowed(tx.to).into());
        }
        state.fees.check_gas_limit(tx.gas_limit)?;
        if ctx.value != tx.value {
            return Err(PolicyViolation::ValueMismatch {
                expected: tx.value,
                attached: ctx.value,
            }
            .into());
        }

        self.verifier
            .authenticate(tx, &request.signature, &state.nonces, ctx.timestamp)?;

        state
            .fees
            .check_fee(request.fee_amount, tx.gas_limit, ctx.gas_price)?;

        Ok(FeeCharge {
            token: request.fee_token,
            amount: request.fee_amount,
            recipient: state.fee_recipient.unwrap_or(ctx.caller),
        })
    }

    fn check_fee_funds(&self, payer: Address, charge: &FeeCharge) -> Result<(), PolicyViolation> {
        if charge.amount.is_zero() {
            return Ok(());
        }
        let balance = self
            .ledger
            .balance_of(charge.token, payer)
            .map_err(|e| PolicyViolation::FeeTransferFailed(e.to_string()))?;
        if balance < charge.amount {
            return Err(PolicyViolation::InsufficientBalance {
                balance,
                fee: charge.amount,
            });
        }
        let allowance = self
            .ledger
            .allowance(charge.token, payer, self.address)
            .map_err(|e| PolicyViolation::FeeTransferFailed(e.to_string()))?;
        if allowance < charge.amount {
            return Err(PolicyViolation::InsufficientAllowance {
                allowance,
                fee: charge.amount,
            });
        }
        Ok(())
    }

    fn collect_fee(&self, payer: Address, charge: &FeeCharge) -> Result<(), PolicyViolation> {
        if charge.amount.is_zero() {
            return Ok(());
        }
        self.ledger
            .transfer_from(
                charge.token,
                self.address,
                payer,
                charge.recipient,
                charge.amount,
            )
            .map_err(|e| PolicyViolation::FeeTransferFailed(e.to_string()))
    }

    /// The forwarder's own identity.
    #[must_use]
    pub const fn address(&self) -> Address {
        self.address
    }

    /// The signature verifier in use.
    #[must_use]
    pub const fn verifier(&self) -> &SignatureVerifier {
        &self.verifier
    }

    /// Nonce the next meta-transaction from `account` must carry.
    #[must_use]
    pub fn current_nonce(&self, account: &Address) -> U256 {
        self.state().nonces.current(account)
    }

    /// Whether `token` is accepted for fees.
    #[must_use]
    pub fn is_fee_token_allowed(&self, token: &Address) -> bool {
        self.state().allow_lists.is_fee_token_allowed(token)
    }

    /// Whether `target` may be called.
    #[must_use]
    pub fn is_target_allowed(&self, target: &Address) -> bool {
        self.state().allow_lists.is_target_allowed(target)
    }

    /// Whether execution is paused.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.state().access.is_paused()
    }

    /// The current owner.
    #[must_use]
    pub fn owner(&self) -> Address {
        self.state().access.owner()
    }

    /// Snapshot of the current configuration.
    #[must_use]
    pub fn configuration(&self) -> ConfigurationView {
        self.state().configuration()
    }

    /// Minimum fee for `gas` units at `gas_price`.
    #[must_use]
    pub fn minimum_fee(&self, gas: u64, gas_price: U256) -> U256 {
        self.state().fees.minimum_fee(gas, gas_price)
    }

    /// Fee estimate for `gas` units at the oracle's gas price.
    #[must_use]
    pub fn estimate_fee<O>(&self, gas: u64, oracle: &O) -> U256
    where
        O: GasPriceOracle + ?Sized,
    {
        self.state().fees.estimate_fee(gas, oracle)
    }

    /// The digest a signer must sign for `tx`.
    #[must_use]
    pub fn digest(&self, tx: &MetaTransaction) -> B256 {
        self.verifier.digest(tx)
    }

    /// Authenticates `tx` against the current nonces without consuming anything.
    ///
    /// # Errors
    ///
    /// Returns the first [`AuthorizationError`] encountered.
    pub fn authenticate(
        &self,
        tx: &MetaTransaction,
        signature: &[u8],
        now: UnixTimestamp,
    ) -> Result<Address, AuthorizationError> {
        self.verifier
            .authenticate(tx, signature, &self.state().nonces, now)
    }

    /// Whether `tx` would authenticate at `now`.
    #[must_use]
    pub fn verify(&self, tx: &MetaTransaction, signature: &[u8], now: UnixTimestamp) -> bool {
        self.authenticate(tx, signature, now).is_ok()
    }

    fn administer<F>(&self, mutation: F) -> Result<(), AdministrationError>
    where
        F: FnOnce(&mut ForwarderState) -> Result<ForwarderEvent, AdministrationError>,
    {
        let event = {
            let mut state = self.state();
            mutation(&mut state)?
        };
        #[cfg(feature = "telemetry")]
        tracing::info!(event = event.name(), "Forwarder configuration changed");
        self.events.emit(event);
        Ok(())
    }

    /// Adds `token` to the fee-token allow-list.
    ///
    /// # Errors
    ///
    /// Fails for a non-owner caller, the zero address or a listed token.
    pub fn add_fee_token(&self, caller: Address, token: Address) -> Result<(), AdministrationError> {
        self.administer(|state| admin::add_to_list(state, caller, ListKind::FeeToken, token))
    }

    /// Removes `token` from the fee-token allow-list.
    ///
    /// # Errors
    ///
    /// Fails for a non-owner caller or an unlisted token.
    pub fn remove_fee_token(
        &self,
        caller: Address,
        token: Address,
    ) -> Result<(), AdministrationError> {
        self.administer(|state| admin::remove_from_list(state, caller, ListKind::FeeToken, token))
    }

    /// Adds `target` to the target allow-list.
    ///
    /// # Errors
    ///
    /// Fails for a non-owner caller, the zero address or a listed target.
    pub fn add_target(&self, caller: Address, target: Address) -> Result<(), AdministrationError> {
        self.administer(|state| admin::add_to_list(state, caller, ListKind::Target, target))
    }

    /// Removes `target` from the target allow-list.
    ///
    /// # Errors
    ///
    /// Fails for a non-owner caller or an unlisted target.
    pub fn remove_target(
        &self,
        caller: Address,
        target: Address,
    ) -> Result<(), AdministrationError> {
        self.administer(|state| admin::remove_from_list(state, caller, ListKind::Target, target))
    }

    /// Sets the maximum gas limit.
    ///
    /// # Errors
    ///
    /// Fails for a non-owner caller or a value not above the minimum.
    pub fn set_max_gas_limit(&self, caller: Address, value: u64) -> Result<(), AdministrationError> {
        self.administer(|state| admin::set_max_gas_limit(state, caller, value))
    }

    /// Sets the minimum gas limit.
    ///
    /// # Errors
    ///
    /// Fails for a non-owner caller or a value not below the maximum.
    pub fn set_min_gas_limit(&self, caller: Address, value: u64) -> Result<(), AdministrationError> {
        self.administer(|state| admin::set_min_gas_limit(state, caller, value))
    }

    /// Sets the fee multiplier in basis points.
    ///
    /// # Errors
    ///
    /// Fails for a non-owner caller or a value below `10_000`.
    pub fn set_fee_multiplier(&self, caller: Address, value: u32) -> Result<(), AdministrationError> {
        self.administer(|state| admin::set_fee_multiplier(state, caller, value))
    }

    /// Sets the fallback gas price for estimates.
    ///
    /// # Errors
    ///
    /// Fails for a non-owner caller or zero.
    pub fn set_fallback_gas_price(
        &self,
        caller: Address,
        value: U256,
    ) -> Result<(), AdministrationError> {
        self.administer(|state| admin::set_fallback_gas_price(state, caller, value))
    }

    /// Sets the fee recipient; `None` pays fees to the submitting relayer.
    ///
    /// # Errors
    ///
    /// Fails for a non-owner caller or `Some(Address::ZERO)`.
    pub fn set_fee_recipient(
        &self,
        caller: Address,
        recipient: Option<Address>,
    ) -> Result<(), AdministrationError> {
        self.administer(|state| admin::set_fee_recipient(state, caller, recipient))
    }

    /// Hands ownership to `new_owner`.
    ///
    /// # Errors
    ///
    /// Fails for a non-owner caller or the zero address.
    pub fn transfer_ownership(
        &self,
        caller: Address,
        new_owner: Address,
    ) -> Result<(), AdministrationError> {
        self.administer(|state| admin::transfer_ownership(state, caller, new_owner))
    }

    /// Pauses execution. Emits no event.
    ///
    /// # Errors
    ///
    /// Fails for a non-owner caller or when already paused.
    pub fn pause(&self, caller: Address) -> Result<(), AdministrationError> {
        self.state().access.pause(caller)?;
        #[cfg(feature = "telemetry")]
        tracing::info!(%caller, "Forwarder paused");
        Ok(())
    }

    /// Resumes execution. Emits no event.
    ///
    /// # Errors
    ///
    /// Fails for a non-owner caller or when not paused.
    pub fn unpause(&self, caller: Address) -> Result<(), AdministrationError> {
        self.state().access.unpause(caller)?;
        #[cfg(feature = "telemetry")]
        tracing::info!(%caller, "Forwarder unpaused");
        Ok(())
    }
}
