use crate::id::ParcelId;
use thiserror::Error;

/// Represents all possible errors surfaced by the PARCEL engine
///
/// Every error is a local, synchronous, non-retryable rejection of a single
/// operation; a failed operation leaves all ledgers, escrows and records
/// exactly as they were before the call.
#[derive(Error, Debug)]
pub enum MarketError {
    /// A structured-data signature did not verify against the named party
    #[error("invalid signature from {0}")]
    InvalidSignature(ParcelId),

    /// Signed authorization material was presented after its deadline
    #[error("authorization expired: deadline {deadline}, now {now}")]
    ExpiredAuthorization { deadline: u64, now: u64 },

    /// A transfer exceeds the sender's current balance
    #[error("insufficient balance: needed {needed}, available {available}")]
    InsufficientBalance { needed: u128, available: u128 },

    /// A bidder cannot fund the escrow for their bid
    #[error("insufficient escrow funds: needed {needed}, available {available}")]
    InsufficientEscrow { needed: u128, available: u128 },

    /// A pre-authorized allowance does not cover the requested transfer
    #[error("insufficient approval: needed {needed}, approved {approved}")]
    InsufficientApproval { needed: u128, approved: u128 },

    /// Unknown sale, offer, round or bid index, or one already resolved
    #[error("unknown or already resolved index {0}")]
    InvalidIndex(usize),

    /// Accepting into, bidding on, or cancelling a non-open listing or round
    #[error("listing or round is no longer open")]
    AlreadyClosed,

    /// A holder attempted to claim the same revenue round twice
    #[error("revenue round already claimed by {0}")]
    AlreadyClaimed(ParcelId),

    /// The caller held no units at the round's checkpoint
    #[error("nothing to claim")]
    NothingToClaim,

    /// Caller is not the owner of the listing, certificate or engine role
    #[error("unauthorized caller {0}")]
    Unauthorized(ParcelId),

    /// The null identity is not a valid counterparty
    #[error("the zero address is not a valid counterparty")]
    ZeroAddress,

    /// No ownership ledger is registered for the asset
    #[error("unknown asset {0}")]
    UnknownAsset(ParcelId),

    /// An asset can only be registered once
    #[error("asset {0} is already registered")]
    DuplicateAsset(ParcelId),

    /// No lease certificate exists under the id
    #[error("unknown certificate {0}")]
    UnknownCertificate(ParcelId),

    /// Serialization/deserialization errors
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Generic errors that don't fit in other categories
    #[error("other error: {0}")]
    Other(String),

    /// Anyhow error wrapper for error context
    #[error(transparent)]
    Context(#[from] anyhow::Error),
}

// Additional From conversions for common error types

impl From<bincode::Error> for MarketError {
    fn from(err: bincode::Error) -> Self {
        MarketError::Serialization(err.to_string())
    }
}

impl From<String> for MarketError {
    fn from(err: String) -> Self {
        MarketError::Other(err)
    }
}

impl From<&str> for MarketError {
    fn from(err: &str) -> Self {
        MarketError::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bincode_errors_map_to_serialization() {
        // A single byte cannot hold a u128
        let err: MarketError = bincode::deserialize::<u128>(&[1u8][..]).unwrap_err().into();
        assert!(matches!(err, MarketError::Serialization(_)));
    }

    #[test]
    fn test_anyhow_context_is_transparent() {
        let err: MarketError = anyhow::anyhow!("ledger snapshot missing").into();
        assert!(matches!(err, MarketError::Context(_)));
        assert_eq!(err.to_string(), "ledger snapshot missing");
    }

    #[test]
    fn test_string_conversions() {
        assert!(matches!(MarketError::from("boom"), MarketError::Other(_)));
        assert!(matches!(
            MarketError::from(String::from("boom")),
            MarketError::Other(_)
        ));
    }
}
