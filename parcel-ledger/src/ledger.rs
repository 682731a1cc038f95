use crate::checkpoint::{CheckpointHistory, SequenceNumber};
use log::debug;
use parcel_core::{MarketError, ParcelId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-asset fungible ownership-unit ledger with checkpointed balances
///
/// One ledger exists per registered asset. The total supply is fixed at
/// creation and never re-minted. Every transfer appends a checkpoint entry
/// for both parties tagged with the current global sequence counter, so
/// "who owned what at sequence N" stays answerable forever; past entries
/// are never rewritten by later transfers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnershipLedger {
    asset_id: ParcelId,
    total_supply: u128,
    balances: HashMap<ParcelId, u128>,
    history: HashMap<ParcelId, CheckpointHistory>,
    allowances: HashMap<(ParcelId, ParcelId), u128>,
    sequence: SequenceNumber,
}

impl OwnershipLedger {
    /// Create a ledger with the full supply assigned to `initial_holder`
    ///
    /// The (asset id, holder, supply) triple comes from the asset registry
    /// collaborator at registration time; the ledger never re-queries it.
    pub fn new(
        asset_id: ParcelId,
        initial_holder: ParcelId,
        total_supply: u128,
    ) -> Result<Self, MarketError> {
        if initial_holder.is_zero() {
            return Err(MarketError::ZeroAddress);
        }
        if total_supply == 0 {
            return Err(MarketError::Other(
                "total supply must be positive".to_string(),
            ));
        }

        let mut balances = HashMap::new();
        balances.insert(initial_holder, total_supply);

        let mut history = HashMap::new();
        let mut initial = CheckpointHistory::default();
        initial.record(0, total_supply);
        history.insert(initial_holder, initial);

        Ok(Self {
            asset_id,
            total_supply,
            balances,
            history,
            allowances: HashMap::new(),
            sequence: 1,
        })
    }

    pub fn asset_id(&self) -> &ParcelId {
        &self.asset_id
    }

    /// The fixed total supply of ownership units
    pub fn total_supply(&self) -> u128 {
        self.total_supply
    }

    /// Total supply at a historical sequence
    ///
    /// Supply is constant for the ledger's lifetime (no mint or burn after
    /// creation); the named operation bounds a future extension to burns
    /// without changing callers.
    pub fn total_supply_at(&self, _sequence: SequenceNumber) -> u128 {
        self.total_supply
    }

    /// Current balance of `holder`
    pub fn balance_of(&self, holder: &ParcelId) -> u128 {
        self.balances.get(holder).copied().unwrap_or(0)
    }

    /// Balance of `holder` at the latest checkpoint entry at or before
    /// `sequence`; 0 if the holder held nothing at that point
    pub fn balance_at(&self, holder: &ParcelId, sequence: SequenceNumber) -> u128 {
        self.history
            .get(holder)
            .map(|h| h.balance_at(sequence))
            .unwrap_or(0)
    }

    /// The next sequence value the ledger will stamp
    pub fn current_sequence(&self) -> SequenceNumber {
        self.sequence
    }

    /// Holders with a non-zero current balance
    pub fn holders(&self) -> impl Iterator<Item = (&ParcelId, u128)> {
        self.balances
            .iter()
            .filter(|(_, balance)| **balance > 0)
            .map(|(holder, balance)| (holder, *balance))
    }

    /// Move `amount` units from `from` to `to`
    ///
    /// The only balance mutator. Appends a checkpoint entry for both
    /// parties at the current sequence, then advances the counter.
    pub fn transfer(
        &mut self,
        from: &ParcelId,
        to: &ParcelId,
        amount: u128,
    ) -> Result<(), MarketError> {
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

        let sequence = self.sequence;
        let from_balance = self.balance_of(from);
        let to_balance = self.balance_of(to);
        self.history
            .entry(*from)
            .or_default()
            .record(sequence, from_balance);
        self.history
            .entry(*to)
            .or_default()
            .record(sequence, to_balance);
        self.sequence += 1;

        debug!(
            "asset {}: transferred {} units {} -> {} at sequence {}",
            self.asset_id, amount, from, to, sequence
        );
        Ok(())
    }

    /// Remaining units `spender` may move out of `owner`'s balance
    pub fn allowance(&self, owner: &ParcelId, spender: &ParcelId) -> u128 {
        self.allowances.get(&(*owner, *spender)).copied().unwrap_or(0)
    }

    /// Pre-authorize `spender` to move up to `amount` of `owner`'s units.
    /// Does not touch balances or checkpoint history.
    pub fn approve(&mut self, owner: &ParcelId, spender: &ParcelId, amount: u128) {
        self.allowances.insert((*owner, *spender), amount);
    }

    /// Transfer on the authority of a pre-approved `spender`, consuming
    /// allowance
    pub fn transfer_from(
        &mut self,
        spender: &ParcelId,
        from: &ParcelId,
        to: &ParcelId,
        amount: u128,
    ) -> Result<(), MarketError> {
        let approved = self.allowance(from, spender);
        if approved < amount {
            return Err(MarketError::InsufficientApproval {
                needed: amount,
                approved,
            });
        }
        self.transfer(from, to, amount)?;
        self.allowances.insert((*from, *spender), approved - amount);
        Ok(())
    }

    /// Stamp the current point in the global operation order
    ///
    /// Returns the current sequence counter and advances it without
    /// touching any balance. Later historical queries pinned to the
    /// returned value see every transfer made before this call and none
    /// made after it.
    pub fn take_checkpoint(&mut self) -> SequenceNumber {
        let sequence = self.sequence;
        self.sequence += 1;
        debug!("asset {}: checkpoint taken at sequence {}", self.asset_id, sequence);
        sequence
    }
}
