pub mod engine;
pub mod lease;
pub mod listing;
pub mod revenue;
pub mod sale;

// Re-export the main types for convenience
pub use engine::MarketplaceEngine;
pub use lease::{LeaseBid, LeaseOffer, OfferId};
pub use listing::{BidState, ListingStatus};
pub use revenue::{RevenueRound, RoundId, RoundStatus};
pub use sale::{Sale, SaleBid, SaleId};
