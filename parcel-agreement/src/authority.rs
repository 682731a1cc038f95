use crate::certificate::LeaseCertificate;
use crate::digest::lease_terms_digest;
use crate::signature::{SignatureScheme, TermsSignature};
use crate::terms::LeaseTerms;
use log::info;
use parcel_core::{MarketError, ParcelId};

/// Issues lease certificates once both parties have signed identical terms
///
/// A lease becomes binding only when the lessor and the named lessee have
/// each signed the canonical digest of the exact same `LeaseTerms`. The
/// authority verifies both signatures against the parties named in the
/// terms and, on success, mints exactly one uniquely-identified
/// certificate. It keeps no record of which terms it has seen; the caller
/// is responsible for preventing re-issuance.
#[derive(Debug, Clone)]
pub struct AgreementAuthority<S: SignatureScheme> {
    scheme: S,
    issued: u64,
}

impl<S: SignatureScheme> AgreementAuthority<S> {
    pub fn new(scheme: S) -> Self {
        Self { scheme, issued: 0 }
    }

    /// Number of certificates minted so far
    pub fn issued(&self) -> u64 {
        self.issued
    }

    /// Verify both signatures over `terms` and mint a certificate
    ///
    /// Fails with `ExpiredAuthorization` past `deadline`, `ZeroAddress` if
    /// either party slot is null, and `InvalidSignature` naming whichever
    /// party's signature does not verify. Any failure leaves the authority
    /// unchanged.
    pub fn verify_and_issue(
        &mut self,
        terms: LeaseTerms,
        lessor_signature: &TermsSignature,
        lessee_signature: &TermsSignature,
        deadline: u64,
        now: u64,
    ) -> Result<LeaseCertificate, MarketError> {
        if now > deadline {
            return Err(MarketError::ExpiredAuthorization { deadline, now });
        }
        if terms.lessor.is_zero() || terms.lessee.is_zero() {
            return Err(MarketError::ZeroAddress);
        }

        let digest = lease_terms_digest(&terms);
        if !self.scheme.verify(&digest, lessor_signature, &terms.lessor) {
            return Err(MarketError::InvalidSignature(terms.lessor));
        }
        if !self.scheme.verify(&digest, lessee_signature, &terms.lessee) {
            return Err(MarketError::InvalidSignature(terms.lessee));
        }

        let (id, _) = ParcelId::find_id(&[
            b"lease_certificate",
            &digest,
            &self.issued.to_le_bytes(),
        ]);
        self.issued += 1;

        info!(
            "issued lease certificate {} for asset {} (lessor {}, lessee {})",
            id, terms.asset_id, terms.lessor, terms.lessee
        );

        Ok(LeaseCertificate {
            id,
            holder: terms.lessee,
            terms,
            terms_hash: digest,
            issued_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::{party_id_from_seed, sign_digest, Ed25519Scheme};
    use std::collections::BTreeMap;

    const LESSOR_SEED: [u8; 32] = [11; 32];
    const LESSEE_SEED: [u8; 32] = [22; 32];

    fn signed_terms() -> (LeaseTerms, TermsSignature, TermsSignature) {
        let terms = LeaseTerms {
            lessor: party_id_from_seed(&LESSOR_SEED),
            lessee: party_id_from_seed(&LESSEE_SEED),
            asset_id: ParcelId::new([3; 32]),
            payment_asset: ParcelId::new([4; 32]),
            rent_amount: 1_000,
            rent_period_secs: 86_400,
            security_deposit: 2_000,
            start_time: 100,
            end_time: 1_000,
            document_hash: [5; 32],
            terms_version: 1,
            metadata: BTreeMap::new(),
        };
        let digest = lease_terms_digest(&terms);
        let lessor_sig = sign_digest(&LESSOR_SEED, &digest);
        let lessee_sig = sign_digest(&LESSEE_SEED, &digest);
        (terms, lessor_sig, lessee_sig)
    }

    #[test]
    fn test_issue_on_valid_dual_signatures() {
        let (terms, lessor_sig, lessee_sig) = signed_terms();
        let mut authority = AgreementAuthority::new(Ed25519Scheme);

        let cert = authority
            .verify_and_issue(terms.clone(), &lessor_sig, &lessee_sig, 500, 400)
            .unwrap();

        assert_eq!(cert.holder, terms.lessee);
        assert_eq!(cert.terms_hash, lease_terms_digest(&terms));
        assert_eq!(cert.issued_at, 400);
        assert!(ParcelId::is_off_curve(cert.id.as_array()));
        assert_eq!(authority.issued(), 1);
    }

    #[test]
    fn test_two_issuances_get_distinct_ids() {
        let (terms, lessor_sig, lessee_sig) = signed_terms();
        let mut authority = AgreementAuthority::new(Ed25519Scheme);

        let a = authority
            .verify_and_issue(terms.clone(), &lessor_sig, &lessee_sig, 500, 400)
            .unwrap();
        let b = authority
            .verify_and_issue(terms, &lessor_sig, &lessee_sig, 500, 401)
            .unwrap();

        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_expired_deadline_rejected() {
        let (terms, lessor_sig, lessee_sig) = signed_terms();
        let mut authority = AgreementAuthority::new(Ed25519Scheme);

        let err = authority
            .verify_and_issue(terms, &lessor_sig, &lessee_sig, 500, 501)
            .unwrap_err();
        assert!(matches!(
            err,
            MarketError::ExpiredAuthorization {
                deadline: 500,
                now: 501
            }
        ));
        assert_eq!(authority.issued(), 0);
    }

    #[test]
    fn test_swapped_signatures_rejected() {
        let (terms, lessor_sig, lessee_sig) = signed_terms();
        let mut authority = AgreementAuthority::new(Ed25519Scheme);

        let err = authority
            .verify_and_issue(terms.clone(), &lessee_sig, &lessor_sig, 500, 400)
            .unwrap_err();
        assert!(matches!(err, MarketError::InvalidSignature(p) if p == terms.lessor));
    }

    #[test]
    fn test_tampered_terms_invalidate_both_signatures() {
        let (terms, lessor_sig, lessee_sig) = signed_terms();
        let mut authority = AgreementAuthority::new(Ed25519Scheme);

        // Raise the rent after signing; the lessor's signature no longer
        // covers the presented terms.
        let mut tampered = terms;
        tampered.rent_amount += 1;

        let err = authority
            .verify_and_issue(tampered.clone(), &lessor_sig, &lessee_sig, 500, 400)
            .unwrap_err();
        assert!(matches!(err, MarketError::InvalidSignature(p) if p == tampered.lessor));
    }

    #[test]
    fn test_open_lessee_slot_rejected() {
        let (terms, lessor_sig, lessee_sig) = signed_terms();
        let mut authority = AgreementAuthority::new(Ed25519Scheme);

        let skeleton = terms.with_lessee(ParcelId::zero());
        let err = authority
            .verify_and_issue(skeleton, &lessor_sig, &lessee_sig, 500, 400)
            .unwrap_err();
        assert!(matches!(err, MarketError::ZeroAddress));
    }

    #[test]
    fn test_certificate_transfer_is_holder_only() {
        let (terms, lessor_sig, lessee_sig) = signed_terms();
        let mut authority = AgreementAuthority::new(Ed25519Scheme);
        let mut cert = authority
            .verify_and_issue(terms.clone(), &lessor_sig, &lessee_sig, 500, 400)
            .unwrap();

        let stranger = ParcelId::new([9; 32]);
        let err = cert.transfer(&stranger, &stranger).unwrap_err();
        assert!(matches!(err, MarketError::Unauthorized(p) if p == stranger));

        let holder = terms.lessee;
        assert!(matches!(
            cert.transfer(&holder, &ParcelId::zero()),
            Err(MarketError::ZeroAddress)
        ));

        cert.transfer(&holder, &stranger).unwrap();
        assert_eq!(cert.holder, stranger);
    }
}
