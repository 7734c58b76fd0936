//! Shared fixtures for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier, Mutex, OnceLock, Weak};

use alloy_primitives::{Address, B256, Bytes, U256, address, b256};
use alloy_signer_local::PrivateKeySigner;

use crate::error::ForwarderError;
use crate::executor::{CallExecutor, CallRequest, CallResult};
use crate::forwarder::{ExecutionReceipt, Forwarder};
use crate::timestamp::UnixTimestamp;
use crate::token::{TokenError, TokenLedger};
use crate::types::{CallContext, MetaTransaction, RelayRequest};

/// Well-known development key; address `0x7099...79C8`.
pub const ALICE_KEY: B256 =
    b256!("0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d");
/// Well-known development key; address `0x3C44...93BC`.
pub const BOB_KEY: B256 =
    b256!("0x5de4111afa1a4b94908f83103eb1f1706367c2e68ca870fc3fb9a804cdab365a");

pub const ALICE: Address = address!("0x70997970C51812dc3A010C7d01b50e0d17dc79C8");
pub const OWNER: Address = address!("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
pub const RELAYER: Address = address!("0x90F79bf6EB2c4f870365E785982E1f101E93b906");
pub const TARGET: Address = address!("0x5FbDB2315678afecb367f032d93F642f64180aa3");
pub const FEE_TOKEN: Address = address!("0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512");
pub const FORWARDER: Address = address!("0x9fE46736679d2D9a65F0992F2272dE9f3c7fa6e0");

pub fn signer(key: B256) -> PrivateKeySigner {
    PrivateKeySigner::from_bytes(&key).unwrap()
}

/// A zero-value call to [`TARGET`] with a 100k gas limit.
pub fn meta_tx(from: Address, nonce: U256, deadline: UnixTimestamp) -> MetaTransaction {
    MetaTransaction {
        from,
        to: TARGET,
        value: U256::ZERO,
        gas_limit: 100_000,
        nonce,
        data: Bytes::new(),
        deadline,
    }
}

/// Token balances and allowances held in memory.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    balances: Mutex<HashMap<(Address, Address), U256>>,
    allowances: Mutex<HashMap<(Address, Address, Address), U256>>,
    transfers: Mutex<Vec<(Address, Address, Address, U256)>>,
    failing: AtomicBool,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_balance(&self, token: Address, account: Address, amount: U256) {
        self.balances.lock().unwrap().insert((token, account), amount);
    }

    pub fn approve(&self, token: Address, owner: Address, spender: Address, amount: U256) {
        self.allowances
            .lock()
            .unwrap()
            .insert((token, owner, spender), amount);
    }

    pub fn balance(&self, token: Address, account: Address) -> U256 {
        self.balances
            .lock()
            .unwrap()
            .get(&(token, account))
            .copied()
            .unwrap_or_default()
    }

    /// Every completed transfer as `(token, from, to, amount)`.
    pub fn transfers(&self) -> Vec<(Address, Address, Address, U256)> {
        self.transfers.lock().unwrap().clone()
    }

    /// Makes every subsequent `transfer_from` revert.
    pub fn fail_transfers(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl TokenLedger for InMemoryLedger {
    fn balance_of(&self, token: Address, account: Address) -> Result<U256, TokenError> {
        Ok(self.balance(token, account))
    }

    fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, TokenError> {
        Ok(self
            .allowances
            .lock()
            .unwrap()
            .get(&(token, owner, spender))
            .copied()
            .unwrap_or_default())
    }

    fn transfer_from(
        &self,
        token: Address,
        spender: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), TokenError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(TokenError::Reverted("transfer paused".to_owned()));
        }
        let allowance = self.allowance(token, from, spender)?;
        let balance = self.balance(token, from);
        if allowance < amount || balance < amount {
            return Err(TokenError::Rejected);
        }
        if allowance != U256::MAX {
            self.approve(token, from, spender, allowance - amount);
        }
        self.set_balance(token, from, balance - amount);
        let credited = self.balance(token, to) + amount;
        self.set_balance(token, to, credited);
        self.transfers
            .lock()
            .unwrap()
            .push((token, from, to, amount));
        Ok(())
    }
}

/// Records requests and answers each with a configurable result.
#[derive(Debug)]
pub struct RecordingExecutor {
    response: Mutex<CallResult>,
    calls: Mutex<Vec<CallRequest>>,
}

impl RecordingExecutor {
    /// Succeeds with empty output until told otherwise.
    pub fn new() -> Self {
        Self {
            response: Mutex::new(CallResult::success(Bytes::new())),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn respond_with(&self, result: CallResult) {
        *self.response.lock().unwrap() = result;
    }

    pub fn calls(&self) -> Vec<CallRequest> {
        self.calls.lock().unwrap().clone()
    }
}

impl CallExecutor for RecordingExecutor {
    fn call(&self, request: CallRequest) -> CallResult {
        self.calls.lock().unwrap().push(request);
        self.response.lock().unwrap().clone()
    }
}

/// A forwarded call that tries to execute another relay request through the
/// same forwarder before returning.
#[derive(Default)]
pub struct ReentrantExecutor {
    forwarder: OnceLock<Weak<Forwarder>>,
    replay: Mutex<Option<(RelayRequest, CallContext)>>,
    inner_outcome: Mutex<Option<Result<ExecutionReceipt, ForwarderError>>>,
}

impl ReentrantExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&self, forwarder: &Arc<Forwarder>) {
        self.forwarder
            .set(Arc::downgrade(forwarder))
            .unwrap();
    }

    pub fn replay(&self, request: RelayRequest, ctx: CallContext) {
        *self.replay.lock().unwrap() = Some((request, ctx));
    }

    pub fn take_inner_outcome(&self) -> Option<Result<ExecutionReceipt, ForwarderError>> {
        self.inner_outcome.lock().unwrap().take()
    }
}

impl CallExecutor for ReentrantExecutor {
    fn call(&self, _request: CallRequest) -> CallResult {
        let forwarder = self.forwarder.get().and_then(Weak::upgrade);
        let replay = self.replay.lock().unwrap().take();
        if let (Some(forwarder), Some((request, ctx))) = (forwarder, replay) {
            let outcome = forwarder.execute(&request, &ctx);
            *self.inner_outcome.lock().unwrap() = Some(outcome);
        }
        CallResult::success(Bytes::new())
    }
}

/// Reads an account's nonce from the forwarder while the forwarded call runs.
pub struct NonceObservingExecutor {
    forwarder: OnceLock<Weak<Forwarder>>,
    account: Address,
    observed: Mutex<Vec<U256>>,
}

impl NonceObservingExecutor {
    pub fn new(account: Address) -> Self {
        Self {
            forwarder: OnceLock::new(),
            account,
            observed: Mutex::new(Vec::new()),
        }
    }

    pub fn bind(&self, forwarder: &Arc<Forwarder>) {
        self.forwarder
            .set(Arc::downgrade(forwarder))
            .unwrap();
    }

    /// Nonces seen from inside each forwarded call, in call order.
    pub fn observed(&self) -> Vec<U256> {
        self.observed.lock().unwrap().clone()
    }
}

impl CallExecutor for NonceObservingExecutor {
    fn call(&self, _request: CallRequest) -> CallResult {
        if let Some(forwarder) = self.forwarder.get().and_then(Weak::upgrade) {
            let nonce = forwarder.current_nonce(&self.account);
            self.observed.lock().unwrap().push(nonce);
        }
        CallResult::success(Bytes::new())
    }
}

/// Holds the first forwarded call open until the test releases it.
///
/// `call` meets the test at [`entered`](Self::entered), then waits at
/// [`release`](Self::release) before returning.
pub struct BlockingExecutor {
    entered: Barrier,
    release: Barrier,
}

impl BlockingExecutor {
    pub fn new() -> Self {
        Self {
            entered: Barrier::new(2),
            release: Barrier::new(2),
        }
    }

    /// Returns once a forwarded call is in flight.
    pub fn entered(&self) {
        self.entered.wait();
    }

    /// Lets the in-flight call return.
    pub fn release(&self) {
        self.release.wait();
    }
}

impl CallExecutor for BlockingExecutor {
    fn call(&self, _request: CallRequest) -> CallResult {
        self.entered.wait();
        self.release.wait();
        CallResult::success(Bytes::new())
    }
}
