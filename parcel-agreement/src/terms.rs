use parcel_core::ParcelId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The complete terms of a lease agreement
///
/// Immutable once signed: both parties sign the canonical digest of the
/// exact same payload (see [`crate::digest::lease_terms_digest`]), so any
/// later change to any field invalidates both signatures.
///
/// The field declaration order here is load-bearing: the canonical digest
/// folds the fields in exactly this order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaseTerms {
    /// Party granting use of the asset
    pub lessor: ParcelId,

    /// Party receiving use of the asset. Left as the zero id in an open
    /// lease offer skeleton; filled in with the bidder before signing.
    pub lessee: ParcelId,

    /// The asset under lease
    pub asset_id: ParcelId,

    /// Payment asset rent and deposits are denominated in
    pub payment_asset: ParcelId,

    /// Rent due per period, in minor units of the payment asset
    pub rent_amount: u128,

    /// Length of one rent period in seconds
    pub rent_period_secs: u64,

    /// Refundable security deposit, in minor units of the payment asset
    pub security_deposit: u128,

    /// Lease start, unix seconds
    pub start_time: u64,

    /// Lease end, unix seconds
    pub end_time: u64,

    /// Hash of the off-band legal document the parties agreed to
    pub document_hash: [u8; 32],

    /// Version of the terms encoding
    pub terms_version: u32,

    /// Free-form metadata. Ordered so the canonical digest is reproducible.
    pub metadata: BTreeMap<String, String>,
}

impl LeaseTerms {
    /// A copy of these terms with the lessee filled in
    pub fn with_lessee(&self, lessee: ParcelId) -> Self {
        Self {
            lessee,
            ..self.clone()
        }
    }

    /// Whether the lessee slot is still open
    pub fn is_skeleton(&self) -> bool {
        self.lessee.is_zero()
    }
}
