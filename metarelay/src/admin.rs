//! Owner-gated administration.
//!
//! Each mutation checks the caller against the owner before touching state and
//! returns the event describing the change. Rejected mutations leave state
//! untouched.

use alloy_primitives::{Address, U256};

use crate::allowlist::ListKind;
use crate::error::AdministrationError;
use crate::events::ForwarderEvent;
use crate::state::ForwarderState;

/// Adds `address` to the `kind` allow-list.
///
/// # Errors
///
/// Fails for a non-owner caller, the zero address, or an existing member.
pub fn add_to_list(
    state: &mut ForwarderState,
    caller: Address,
    kind: ListKind,
    address: Address,
) -> Result<ForwarderEvent, AdministrationError> {
    state.access.require_owner(caller)?;
    state.allow_lists.list_mut(kind).add(address)?;
    Ok(match kind {
        ListKind::FeeToken => ForwarderEvent::FeeTokenAdded { token: address },
        ListKind::Target => ForwarderEvent::TargetAdded { target: address },
    })
}

/// Removes `address` from the `kind` allow-list.
///
/// # Errors
///
/// Fails for a non-owner caller or an absent member.
pub fn remove_from_list(
    state: &mut ForwarderState,
    caller: Address,
    kind: ListKind,
    address: Address,
) -> Result<ForwarderEvent, AdministrationError> {
    state.access.require_owner(caller)?;
    state.allow_lists.list_mut(kind).remove(address)?;
    Ok(match kind {
        ListKind::FeeToken => ForwarderEvent::FeeTokenRemoved { token: address },
        ListKind::Target => ForwarderEvent::TargetRemoved { target: address },
    })
}

/// Sets the maximum gas limit.
///
/// # Errors
///
/// Fails for a non-owner caller or a value not above the minimum.
pub fn set_max_gas_limit(
    state: &mut ForwarderState,
    caller: Address,
    value: u64,
) -> Result<ForwarderEvent, AdministrationError> {
    state.access.require_owner(caller)?;
    let old = state.fees.set_max_gas_limit(value)?;
    Ok(ForwarderEvent::GasLimitUpdated { old, new: value })
}

/// Sets the minimum gas limit.
///
/// # Errors
///
/// Fails for a non-owner caller or a value not below the maximum.
pub fn set_min_gas_limit(
    state: &mut ForwarderState,
    caller: Address,
    value: u64,
) -> Result<ForwarderEvent, AdministrationError> {
    state.access.require_owner(caller)?;
    let old = state.fees.set_min_gas_limit(value)?;
    Ok(ForwarderEvent::MinGasLimitUpdated { old, new: value })
}

/// Sets the fee multiplier in basis points.
///
/// # Errors
///
/// Fails for a non-owner caller or a value below `10_000`.
pub fn set_fee_multiplier(
    state: &mut ForwarderState,
    caller: Address,
    value: u32,
) -> Result<ForwarderEvent, AdministrationError> {
    state.access.require_owner(caller)?;
    let old = state.fees.set_fee_multiplier(value)?;
    Ok(ForwarderEvent::FeeMultiplierUpdated { old, new: value })
}

/// Sets the gas price used for estimates when the network has no reading.
///
/// # Errors
///
/// Fails for a non-owner caller or zero.
pub fn set_fallback_gas_price(
    state: &mut ForwarderState,
    caller: Address,
    value: U256,
) -> Result<ForwarderEvent, AdministrationError> {
    state.access.require_owner(caller)?;
    let old = state.fees.set_fallback_gas_price(value)?;
    Ok(ForwarderEvent::FallbackGasPriceUpdated { old, new: value })
}

/// Sets where fees go; `None` sends them to the submitting relayer.
///
/// # Errors
///
/// Fails for a non-owner caller or `Some(Address::ZERO)`.
pub fn set_fee_recipient(
    state: &mut ForwarderState,
    caller: Address,
    recipient: Option<Address>,
) -> Result<ForwarderEvent, AdministrationError> {
    state.access.require_owner(caller)?;
    if recipient.is_some_and(|r| r.is_zero()) {
        return Err(AdministrationError::ZeroAddress("fee recipient"));
    }
    let old = std::mem::replace(&mut state.fee_recipient, recipient);
    Ok(ForwarderEvent::FeeRecipientUpdated {
        old,
        new: recipient,
    })
}

/// Hands ownership to `new_owner`.
///
/// # Errors
///
/// Fails for a non-owner caller or the zero address.
pub fn transfer_ownership(
    state: &mut ForwarderState,
    caller: Address,
    new_owner: Address,
) -> Result<ForwarderEvent, AdministrationError> {
    let previous_owner = state.access.transfer_ownership(caller, new_owner)?;
    Ok(ForwarderEvent::OwnershipTransferred {
        previous_owner,
        new_owner,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::AccessControl;
    use crate::fee::FeePolicy;
    use crate::test_support::{FEE_TOKEN, OWNER, RELAYER, TARGET};

    fn state() -> ForwarderState {
        ForwarderState::new(AccessControl::new(OWNER).unwrap(), FeePolicy::default())
    }

    #[test]
    fn test_non_owner_mutations_rejected_without_side_effects() {
        let mut state = state();
        let denied = AdministrationError::NotOwner(RELAYER);
        assert_eq!(
            add_to_list(&mut state, RELAYER, ListKind::FeeToken, FEE_TOKEN),
            Err(denied.clone())
        );
        assert_eq!(set_fee_multiplier(&mut state, RELAYER, 12_000), Err(denied.clone()));
        assert_eq!(set_max_gas_limit(&mut state, RELAYER, 2_000_000), Err(denied.clone()));
        assert_eq!(
            set_fee_recipient(&mut state, RELAYER, Some(RELAYER)),
            Err(denied.clone())
        );
        assert_eq!(transfer_ownership(&mut state, RELAYER, RELAYER), Err(denied));

        let view = state.configuration();
        assert!(view.fee_tokens.is_empty());
        assert_eq!(view.owner, OWNER);
        assert_eq!(view.fee_recipient, None);
    }

    #[test]
    fn test_list_events() {
        let mut state = state();
        assert_eq!(
            add_to_list(&mut state, OWNER, ListKind::Target, TARGET),
            Ok(ForwarderEvent::TargetAdded { target: TARGET })
        );
        assert_eq!(
            remove_from_list(&mut state, OWNER, ListKind::Target, TARGET),
            Ok(ForwarderEvent::TargetRemoved { target: TARGET })
        );
        assert!(remove_from_list(&mut state, OWNER, ListKind::Target, TARGET).is_err());
    }

    #[test]
    fn test_config_events_carry_before_and_after() {
        let mut state = state();
        assert_eq!(
            set_fee_multiplier(&mut state, OWNER, 12_000),
            Ok(ForwarderEvent::FeeMultiplierUpdated {
                old: 11_000,
                new: 12_000,
            })
        );
        assert_eq!(
            set_max_gas_limit(&mut state, OWNER, 2_000_000),
            Ok(ForwarderEvent::GasLimitUpdated {
                old: 1_000_000,
                new: 2_000_000,
            })
        );
        assert_eq!(
            set_min_gas_limit(&mut state, OWNER, 50_000),
            Ok(ForwarderEvent::MinGasLimitUpdated {
                old: 21_000,
                new: 50_000,
            })
        );
        assert_eq!(state.configuration().max_gas_limit, 2_000_000);
    }

    #[test]
    fn test_fee_recipient_rejects_zero() {
        let mut state = state();
        assert_eq!(
            set_fee_recipient(&mut state, OWNER, Some(Address::ZERO)),
            Err(AdministrationError::ZeroAddress("fee recipient"))
        );
        assert!(set_fee_recipient(&mut state, OWNER, Some(TARGET)).is_ok());
        assert_eq!(
            set_fee_recipient(&mut state, OWNER, None),
            Ok(ForwarderEvent::FeeRecipientUpdated {
                old: Some(TARGET),
                new: None,
            })
        );
    }
}
