//! Canonical, byte-reproducible encoding of lease terms.
//!
//! Both parties sign the digest produced here, so it must come out
//! identical regardless of implementation language: domain separator
//! first, then the hashed type tag, then every `LeaseTerms` field in
//! declared order with fixed-width little-endian integers, with nested
//! structures pre-hashed before being folded into the parent. Generic
//! structure-hashing (serde/bincode derivation) is deliberately not used
//! here: derived encodings are known to diverge from the reference
//! algorithm for nested records, which silently produces an unverifiable
//! signature.

use crate::terms::LeaseTerms;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Domain separator for the lease terms digest
pub const LEASE_TERMS_DOMAIN: &[u8] = b"PARCEL_LeaseTerms";

/// Type tag naming the record and its field order
pub const LEASE_TERMS_TYPE_TAG: &[u8] = b"LeaseTerms(lessor,lessee,asset_id,payment_asset,\
rent_amount,rent_period_secs,security_deposit,start_time,end_time,document_hash,\
terms_version,metadata)";

/// Domain separator for the nested metadata sub-hash
const METADATA_DOMAIN: &[u8] = b"PARCEL_LeaseTermsMetadata";

/// Pre-hash the free-form metadata map
///
/// Entry count, then each (key, value) pair in map order, every string
/// length-prefixed so adjacent fields cannot be confused.
pub fn metadata_digest(metadata: &BTreeMap<String, String>) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(METADATA_DOMAIN);
    hasher.update((metadata.len() as u64).to_le_bytes());
    for (key, value) in metadata {
        hasher.update((key.len() as u64).to_le_bytes());
        hasher.update(key.as_bytes());
        hasher.update((value.len() as u64).to_le_bytes());
        hasher.update(value.as_bytes());
    }
    hasher.finalize().into()
}

/// Canonical digest both parties sign
///
/// The fold order must match the declared field order of [`LeaseTerms`]
/// exactly.
pub fn lease_terms_digest(terms: &LeaseTerms) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(LEASE_TERMS_DOMAIN);
    hasher.update(Sha256::digest(LEASE_TERMS_TYPE_TAG));
    hasher.update(terms.lessor.bytes());
    hasher.update(terms.lessee.bytes());
    hasher.update(terms.asset_id.bytes());
    hasher.update(terms.payment_asset.bytes());
    hasher.update(terms.rent_amount.to_le_bytes());
    hasher.update(terms.rent_period_secs.to_le_bytes());
    hasher.update(terms.security_deposit.to_le_bytes());
    hasher.update(terms.start_time.to_le_bytes());
    hasher.update(terms.end_time.to_le_bytes());
    hasher.update(terms.document_hash);
    hasher.update(terms.terms_version.to_le_bytes());
    hasher.update(metadata_digest(&terms.metadata));
    hasher.finalize().into()
}
