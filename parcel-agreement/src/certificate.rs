use crate::terms::LeaseTerms;
use parcel_core::{MarketError, ParcelId};
use serde::{Deserialize, Serialize};

/// Proof that a binding, dual-signed lease agreement exists
///
/// Uniquely owned: one holder at a time, transferable by the holder.
/// Everything except the holder is immutable after issuance; the terms
/// hash makes tampering with the embedded terms evident.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaseCertificate {
    /// Fresh off-curve id minted at issuance
    pub id: ParcelId,

    /// Current holder; initially the lessee
    pub holder: ParcelId,

    /// The dual-signed terms
    pub terms: LeaseTerms,

    /// Canonical digest of `terms` at issuance
    pub terms_hash: [u8; 32],

    /// Issuance time, unix seconds
    pub issued_at: u64,
}

impl LeaseCertificate {
    /// Transfer the certificate to a new holder
    ///
    /// Holder-only; the zero id is not a valid recipient.
    pub fn transfer(&mut self, caller: &ParcelId, to: &ParcelId) -> Result<(), MarketError> {
        if *caller != self.holder {
            return Err(MarketError::Unauthorized(*caller));
        }
        if to.is_zero() {
            return Err(MarketError::ZeroAddress);
        }
        self.holder = *to;
        Ok(())
    }
}
