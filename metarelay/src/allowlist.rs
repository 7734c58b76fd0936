//! Fee-token and call-target allow-lists.
//!
//! The two lists are independent: a token accepted for fees is not thereby a
//! permitted call target, and the reverse.

use std::collections::BTreeSet;

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use crate::error::AdministrationError;

/// Which allow-list an identity belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListKind {
    /// Tokens accepted for fee payment.
    FeeToken,
    /// Contracts a meta-transaction may call.
    Target,
}

impl ListKind {
    /// Human-readable list name used in error messages.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::FeeToken => "fee token allow-list",
            Self::Target => "target allow-list",
        }
    }
}

/// A set of permitted identities.
///
/// The zero address is never a member. Adding a present member and removing
/// an absent one are errors, not no-ops.
#[derive(Debug, Clone)]
pub struct AllowList {
    kind: ListKind,
    members: BTreeSet<Address>,
}

impl AllowList {
    /// Creates an empty list.
    #[must_use]
    pub const fn new(kind: ListKind) -> Self {
        Self {
            kind,
            members: BTreeSet::new(),
        }
    }

    /// Returns which list this is.
    #[must_use]
    pub const fn kind(&self) -> ListKind {
        self.kind
    }

    /// Whether `address` is on the list.
    #[must_use]
    pub fn contains(&self, address: &Address) -> bool {
        self.members.contains(address)
    }

    /// Iterates over members in address order.
    pub fn iter(&self) -> impl Iterator<Item = &Address> {
        self.members.iter()
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the list has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Adds `address`.
    ///
    /// # Errors
    ///
    /// Fails if `address` is zero or already present.
    pub fn add(&mut self, address: Address) -> Result<(), AdministrationError> {
        if address.is_zero() {
            return Err(AdministrationError::ZeroAddress(self.kind.as_str()));
        }
        if !self.members.insert(address) {
            return Err(AdministrationError::AlreadyListed {
                list: self.kind.as_str(),
                address,
            });
        }
        Ok(())
    }

    /// Removes `address`.
    ///
    /// # Errors
    ///
    /// Fails if `address` is not present.
    pub fn remove(&mut self, address: Address) -> Result<(), AdministrationError> {
        if !self.members.remove(&address) {
            return Err(AdministrationError::NotListed {
                list: self.kind.as_str(),
                address,
            });
        }
        Ok(())
    }
}

/// Both allow-lists consulted by the forwarder.
#[derive(Debug, Clone)]
pub struct AllowListRegistry {
    fee_tokens: AllowList,
    targets: AllowList,
}

impl Default for AllowListRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AllowListRegistry {
    /// Creates a registry with both lists empty.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            fee_tokens: AllowList::new(ListKind::FeeToken),
            targets: AllowList::new(ListKind::Target),
        }
    }

    /// Returns the list of the given kind.
    #[must_use]
    pub const fn list(&self, kind: ListKind) -> &AllowList {
        match kind {
            ListKind::FeeToken => &self.fee_tokens,
            ListKind::Target => &self.targets,
        }
    }

    /// Returns the mutable list of the given kind.
    pub const fn list_mut(&mut self, kind: ListKind) -> &mut AllowList {
        match kind {
            ListKind::FeeToken => &mut self.fee_tokens,
            ListKind::Target => &mut self.targets,
        }
    }

    /// Whether `token` may be used to pay fees.
    #[must_use]
    pub fn is_fee_token_allowed(&self, token: &Address) -> bool {
        self.fee_tokens.contains(token)
    }

    /// Whether `target` may be called.
    #[must_use]
    pub fn is_target_allowed(&self, target: &Address) -> bool {
        self.targets.contains(target)
    }
}
