use crate::error::MarketError;
use crate::id::ParcelId;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// External payment-asset collaborator
///
/// A transferable-balance asset with allowance-based pre-authorization.
/// The engine depends only on debit-from-caller-into-escrow,
/// credit-from-escrow-to-recipient, and refund-from-escrow-to-payer, all
/// succeeding or failing atomically and synchronously.
pub trait PaymentAsset {
    /// Current balance held by `holder`
    fn balance_of(&self, holder: &ParcelId) -> u128;

    /// Remaining amount `spender` may move out of `owner`'s balance
    fn allowance(&self, owner: &ParcelId, spender: &ParcelId) -> u128;

    /// Pre-authorize `spender` to move up to `amount` of `owner`'s balance.
    /// Replaces any prior approval for the pair.
    fn approve(&mut self, owner: &ParcelId, spender: &ParcelId, amount: u128);

    /// Move `amount` from `from` to `to`
    fn transfer(&mut self, from: &ParcelId, to: &ParcelId, amount: u128) -> Result<(), MarketError>;

    /// Move `amount` from `owner` to `to` on the authority of `spender`,
    /// consuming allowance
    fn transfer_from(
        &mut self,
        spender: &ParcelId,
        owner: &ParcelId,
        to: &ParcelId,
        amount: u128,
    ) -> Result<(), MarketError>;
}

/// In-memory reference implementation of [`PaymentAsset`]
///
/// Used by tests and demos; a production deployment supplies its own
/// implementation backed by the surrounding execution environment.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct VaultPaymentAsset {
    balances: HashMap<ParcelId, u128>,
    allowances: HashMap<(ParcelId, ParcelId), u128>,
}

impl VaultPaymentAsset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `amount` to `to` out of thin air. Stands in for the external
    /// asset's own issuance; not reachable through the engine.
    pub fn mint(&mut self, to: &ParcelId, amount: u128) {
        *self.balances.entry(*to).or_insert(0) += amount;
        debug!("minted {} payment units to {}", amount, to);
    }
}

impl PaymentAsset for VaultPaymentAsset {
    fn balance_of(&self, holder: &ParcelId) -> u128 {
        self.balances.get(holder).copied().unwrap_or(0)
    }

    fn allowance(&self, owner: &ParcelId, spender: &ParcelId) -> u128 {
        self.allowances.get(&(*owner, *spender)).copied().unwrap_or(0)
    }

    fn approve(&mut self, owner: &ParcelId, spender: &ParcelId, amount: u128) {
        self.allowances.insert((*owner, *spender), amount);
    }

    fn transfer(&mut self, from: &ParcelId, to: &ParcelId, amount: u128) -> Result<(), MarketError> {
        if to.is_zero() {
            return Err(MarketError::ZeroAddress);
        }
        let available = self.balance_of(from);
        if available < amount {
            return Err(MarketError::InsufficientBalance {
                needed: amount,
                available,
            });
        }
        *self.balances.entry(*from).or_insert(0) -= amount;
        *self.balances.entry(*to).or_insert(0) += amount;
        Ok(())
    }

    fn transfer_from(
        &mut self,
        spender: &ParcelId,
        owner: &ParcelId,
        to: &ParcelId,
        amount: u128,
    ) -> Result<(), MarketError> {
        let approved = self.allowance(owner, spender);
        if approved < amount {
            return Err(MarketError::InsufficientApproval {
                needed: amount,
                approved,
            });
        }
        self.transfer(owner, to, amount)?;
        self.allowances.insert((*owner, *spender), approved - amount);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_and_balances() {
        let a = ParcelId::new([1; 32]);
        let b = ParcelId::new([2; 32]);

        let mut vault = VaultPaymentAsset::new();
        vault.mint(&a, 100);

        vault.transfer(&a, &b, 40).unwrap();
        assert_eq!(vault.balance_of(&a), 60);
        assert_eq!(vault.balance_of(&b), 40);
    }

    #[test]
    fn test_insufficient_balance() {
        let a = ParcelId::new([1; 32]);
        let b = ParcelId::new([2; 32]);

        let mut vault = VaultPaymentAsset::new();
        vault.mint(&a, 10);

        let err = vault.transfer(&a, &b, 11).unwrap_err();
        assert!(matches!(
            err,
            MarketError::InsufficientBalance {
                needed: 11,
                available: 10
            }
        ));
        // Failed transfer leaves balances untouched
        assert_eq!(vault.balance_of(&a), 10);
        assert_eq!(vault.balance_of(&b), 0);
    }

    #[test]
    fn test_zero_address_rejected() {
        let a = ParcelId::new([1; 32]);
        let mut vault = VaultPaymentAsset::new();
        vault.mint(&a, 10);

        let err = vault.transfer(&a, &ParcelId::zero(), 5).unwrap_err();
        assert!(matches!(err, MarketError::ZeroAddress));
    }

    #[test]
    fn test_allowance_is_consumed() {
        let owner = ParcelId::new([1; 32]);
        let spender = ParcelId::new([2; 32]);
        let dest = ParcelId::new([3; 32]);

        let mut vault = VaultPaymentAsset::new();
        vault.mint(&owner, 100);
        vault.approve(&owner, &spender, 60);

        vault.transfer_from(&spender, &owner, &dest, 50).unwrap();
        assert_eq!(vault.allowance(&owner, &spender), 10);

        // Remaining allowance no longer covers another 50
        let err = vault.transfer_from(&spender, &owner, &dest, 50).unwrap_err();
        assert!(matches!(
            err,
            MarketError::InsufficientApproval {
                needed: 50,
                approved: 10
            }
        ));
    }
}
