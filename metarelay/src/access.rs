//! Ownership, pause and reentrancy state.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use alloy_primitives::Address;

use crate::error::AdministrationError;

/// Single-owner access control with a pause flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessControl {
    owner: Address,
    paused: bool,
}

impl AccessControl {
    /// Creates an unpaused control owned by `owner`.
    ///
    /// # Errors
    ///
    /// Returns [`AdministrationError::ZeroAddress`] if `owner` is zero.
    pub fn new(owner: Address) -> Result<Self, AdministrationError> {
        if owner.is_zero() {
            return Err(AdministrationError::ZeroAddress("owner"));
        }
        Ok(Self {
            owner,
            paused: false,
        })
    }

    /// The current owner.
    #[must_use]
    pub const fn owner(&self) -> Address {
        self.owner
    }

    /// Whether execution is paused.
    #[must_use]
    pub const fn is_paused(&self) -> bool {
        self.paused
    }

    /// Checks that `caller` is the owner.
    ///
    /// # Errors
    ///
    /// Returns [`AdministrationError::NotOwner`] otherwise.
    pub fn require_owner(&self, caller: Address) -> Result<(), AdministrationError> {
        if caller == self.owner {
            Ok(())
        } else {
            Err(AdministrationError::NotOwner(caller))
        }
    }

    /// Hands ownership to `new_owner`, returning the previous owner.
    ///
    /// # Errors
    ///
    /// Fails if `caller` is not the owner or `new_owner` is zero.
    pub fn transfer_ownership(
        &mut self,
        caller: Address,
        new_owner: Address,
    ) -> Result<Address, AdministrationError> {
        self.require_owner(caller)?;
        if new_owner.is_zero() {
            return Err(AdministrationError::ZeroAddress("owner"));
        }
        Ok(std::mem::replace(&mut self.owner, new_owner))
    }

    /// Sets the pause flag.
    ///
    /// # Errors
    ///
    /// Fails if `caller` is not the owner or execution is already paused.
    pub fn pause(&mut self, caller: Address) -> Result<(), AdministrationError> {
        self.require_owner(caller)?;
        if self.paused {
            return Err(AdministrationError::AlreadyPaused);
        }
        self.paused = true;
        Ok(())
    }

    /// Clears the pause flag.
    ///
    /// # Errors
    ///
    /// Fails if `caller` is not the owner or execution is not paused.
    pub fn unpause(&mut self, caller: Address) -> Result<(), AdministrationError> {
        self.require_owner(caller)?;
        if !self.paused {
            return Err(AdministrationError::NotPaused);
        }
        self.paused = false;
        Ok(())
    }
}

/// Why a [`ReentrancyLock`] could not be entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockConflict {
    /// The current thread already holds the section.
    Reentrant,
    /// Another thread holds the section.
    Busy,
}

/// A non-reentrant section that remembers which thread holds it.
///
/// Entering from the holding thread is reentry. Entering from any other
/// thread while the section is held is contention.
#[derive(Debug, Default)]
pub struct ReentrancyLock {
    holder: Mutex<Option<ThreadId>>,
}

impl ReentrancyLock {
    /// Creates an unlocked section.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            holder: Mutex::new(None),
        }
    }

    fn holder(&self) -> MutexGuard<'_, Option<ThreadId>> {
        self.holder.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Enters the section for the current thread.
    ///
    /// The section is left when the returned guard is dropped, on every exit path.
    ///
    /// # Errors
    ///
    /// Returns [`LockConflict::Reentrant`] if the current thread is already
    /// inside, or [`LockConflict::Busy`] if another thread is.
    pub fn enter(&self) -> Result<ReentrancyGuard<'_>, LockConflict> {
        let current = thread::current().id();
        let mut holder = self.holder();
        match *holder {
            Some(id) if id == current => Err(LockConflict::Reentrant),
            Some(_) => Err(LockConflict::Busy),
            None => {
                *holder = Some(current);
                Ok(ReentrancyGuard { lock: self })
            }
        }
    }

    /// Whether the section is currently entered by any thread.
    #[must_use]
    pub fn is_entered(&self) -> bool {
        self.holder().is_some()
    }
}

/// Scope of a [`ReentrancyLock`] section.
#[derive(Debug)]
pub struct ReentrancyGuard<'a> {
    lock: &'a ReentrancyLock,
}

impl Drop for ReentrancyGuard<'_> {
    fn drop(&mut self) {
        *self.lock.holder() = None;
    }
}
