use serde::{Deserialize, Serialize};

/// Lifecycle of a sale or lease offer
///
/// `Open -> Accepted` and `Open -> Cancelled` are the only transitions;
/// both closed states are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListingStatus {
    /// Accepting bids
    Open,
    /// Exactly one bid was accepted and settled
    Accepted,
    /// Withdrawn by its creator before any acceptance
    Cancelled,
}

impl ListingStatus {
    pub fn is_open(&self) -> bool {
        matches!(self, ListingStatus::Open)
    }
}

/// Lifecycle of a single bid
///
/// `Active -> Won` for exactly one bid per accepted listing;
/// `Active -> Refunded` for every other bid. Both are terminal, which is
/// what guarantees an escrow is released at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BidState {
    /// Escrow held by the engine, awaiting resolution
    Active,
    /// Escrow returned in full to the bidder
    Refunded,
    /// Bid accepted; escrow released to settlement
    Won,
}

impl BidState {
    pub fn is_active(&self) -> bool {
        matches!(self, BidState::Active)
    }
}
