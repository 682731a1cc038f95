use parcel_core::{MarketError, ParcelId};
use parcel_ledger::SequenceNumber;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Opaque revenue round identifier (arena index)
pub type RoundId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundStatus {
    /// Accepting claims (and authorized revenue extensions)
    Open,
    /// Terminally closed by the operator; no further claims
    Closed,
}

/// A distribution event over a fixed payment amount
///
/// Opened atomically with lease acceptance: the checkpoint pins the holder
/// set, and each holder's share is recomputed on demand from the
/// checkpointed balance and the round totals. Only the per-holder claimed
/// flag is persisted, so the stored state can never drift out of sync with
/// the entitlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevenueRound {
    /// Asset whose checkpointed holders the round pays out to
    pub asset_id: ParcelId,

    /// Ledger sequence the entitlement is pinned to
    pub checkpoint_sequence: SequenceNumber,

    /// Total distributable amount, in minor units of the payment asset
    pub total_amount: u128,

    /// Ownership-unit supply at the checkpoint
    pub total_supply_at_checkpoint: u128,

    pub status: RoundStatus,

    /// Holders who have already claimed this round
    pub claimed: BTreeSet<ParcelId>,
}

impl RevenueRound {
    pub fn new(
        asset_id: ParcelId,
        checkpoint_sequence: SequenceNumber,
        total_amount: u128,
        total_supply_at_checkpoint: u128,
    ) -> Self {
        Self {
            asset_id,
            checkpoint_sequence,
            total_amount,
            total_supply_at_checkpoint,
            status: RoundStatus::Open,
            claimed: BTreeSet::new(),
        }
    }

    /// Pro-rata share for a checkpointed balance
    ///
    /// `floor(total_amount * balance / supply)`; truncating division, so
    /// across all claimants up to holder-count minus one minor units of
    /// dust stay unclaimed. That residual is expected, not a defect.
    pub fn share_of(&self, checkpointed_balance: u128) -> Result<u128, MarketError> {
        self.total_amount
            .checked_mul(checkpointed_balance)
            .map(|scaled| scaled / self.total_supply_at_checkpoint)
            .ok_or_else(|| MarketError::Other("revenue share computation overflow".to_string()))
    }
}
