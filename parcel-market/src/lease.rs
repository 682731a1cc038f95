use crate::listing::{BidState, ListingStatus};
use parcel_agreement::{LeaseTerms, TermsSignature};
use parcel_core::ParcelId;
use serde::{Deserialize, Serialize};

/// Opaque lease offer identifier (arena index)
pub type OfferId = u64;

/// A funded bid on a lease offer
///
/// The bidder is the candidate lessee; their signature covers the offer
/// terms with themselves filled in as lessee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaseBid {
    pub bidder: ParcelId,

    /// Funds held by the engine on the bidder's behalf
    pub escrow: u128,

    /// The bidder's structured-data signature over the completed terms
    pub signature: TermsSignature,

    pub state: BidState,
}

/// A listing offering an asset for lease
///
/// The terms are a skeleton: the lessee slot is the zero id until a bid is
/// accepted and the winning bidder is filled in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaseOffer {
    pub lessor: ParcelId,

    pub terms: LeaseTerms,

    /// Latest point (unix seconds) at which bids may be placed or accepted
    pub deadline: u64,

    pub status: ListingStatus,

    pub bids: Vec<LeaseBid>,
}

impl LeaseOffer {
    pub fn new(lessor: ParcelId, terms: LeaseTerms, deadline: u64) -> Self {
        Self {
            lessor,
            terms,
            deadline,
            status: ListingStatus::Open,
            bids: Vec::new(),
        }
    }

    /// Indices and records of bids still awaiting resolution
    pub fn active_bids(&self) -> impl Iterator<Item = (usize, &LeaseBid)> {
        self.bids
            .iter()
            .enumerate()
            .filter(|(_, bid)| bid.state.is_active())
    }
}
