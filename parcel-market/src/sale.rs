use crate::listing::{BidState, ListingStatus};
use parcel_core::ParcelId;
use serde::{Deserialize, Serialize};

/// Opaque sale identifier (arena index)
pub type SaleId = u64;

/// A funded bid on a sale listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleBid {
    /// The bidding party
    pub bidder: ParcelId,

    /// Ownership units the bid covers (always the full listed lot)
    pub amount: u128,

    /// Offered payment for the lot
    pub price: u128,

    /// Funds held by the engine on the bidder's behalf
    pub escrow: u128,

    pub state: BidState,
}

/// A listing offering ownership units for sale
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sale {
    pub seller: ParcelId,

    /// Asset whose ownership ledger the listed units live on
    pub asset_id: ParcelId,

    /// Units offered
    pub amount: u128,

    /// Seller's asking price, informational; bids may come in above or
    /// below it and the seller picks which one to accept
    pub ask_price: u128,

    pub status: ListingStatus,

    pub bids: Vec<SaleBid>,
}

impl Sale {
    pub fn new(seller: ParcelId, asset_id: ParcelId, amount: u128, ask_price: u128) -> Self {
        Self {
            seller,
            asset_id,
            amount,
            ask_price,
            status: ListingStatus::Open,
            bids: Vec::new(),
        }
    }

    /// Indices and records of bids still awaiting resolution
    pub fn active_bids(&self) -> impl Iterator<Item = (usize, &SaleBid)> {
        self.bids
            .iter()
            .enumerate()
            .filter(|(_, bid)| bid.state.is_active())
    }
}
