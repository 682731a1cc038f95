use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use parcel_core::ParcelId;
use serde::{Deserialize, Serialize};

/// A structured-data signature over a canonical terms digest
///
/// Stored as raw bytes; the scheme in use decides what counts as
/// well-formed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermsSignature(pub Vec<u8>);

impl TermsSignature {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Signature-verification collaborator
///
/// A pure function with no side effects: given a digest and a signature,
/// decide whether the named party produced it. The engine treats a
/// mismatch as `InvalidSignature` naming the party.
pub trait SignatureScheme {
    fn verify(&self, digest: &[u8; 32], signature: &TermsSignature, signer: &ParcelId) -> bool;
}

/// Ed25519 signatures; a party id is the verifying-key bytes
#[derive(Debug, Default, Clone, Copy)]
pub struct Ed25519Scheme;

impl SignatureScheme for Ed25519Scheme {
    fn verify(&self, digest: &[u8; 32], signature: &TermsSignature, signer: &ParcelId) -> bool {
        let Ok(key) = VerifyingKey::from_bytes(signer.as_array()) else {
            return false;
        };
        let Ok(sig) = Signature::from_slice(signature.as_bytes()) else {
            return false;
        };
        key.verify_strict(digest, &sig).is_ok()
    }
}

/// Derive the party id for a raw ed25519 seed - exposed for tests in other
/// crates
pub fn party_id_from_seed(seed: &[u8; 32]) -> ParcelId {
    let key = SigningKey::from_bytes(seed);
    ParcelId::new(key.verifying_key().to_bytes())
}

/// Sign a digest with a raw ed25519 seed - exposed for tests in other
/// crates
pub fn sign_digest(seed: &[u8; 32], digest: &[u8; 32]) -> TermsSignature {
    let key = SigningKey::from_bytes(seed);
    TermsSignature(key.sign(digest).to_bytes().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify() {
        let seed = [42u8; 32];
        let party = party_id_from_seed(&seed);
        let digest = [7u8; 32];

        let sig = sign_digest(&seed, &digest);
        assert!(Ed25519Scheme.verify(&digest, &sig, &party));
    }

    #[test]
    fn test_wrong_party_fails() {
        let digest = [7u8; 32];
        let sig = sign_digest(&[42u8; 32], &digest);
        let other = party_id_from_seed(&[43u8; 32]);

        assert!(!Ed25519Scheme.verify(&digest, &sig, &other));
    }

    #[test]
    fn test_wrong_digest_fails() {
        let seed = [42u8; 32];
        let party = party_id_from_seed(&seed);
        let sig = sign_digest(&seed, &[7u8; 32]);

        assert!(!Ed25519Scheme.verify(&[8u8; 32], &sig, &party));
    }

    #[test]
    fn test_malformed_material_fails_closed() {
        let digest = [7u8; 32];
        let party = party_id_from_seed(&[42u8; 32]);

        // Truncated signature bytes
        assert!(!Ed25519Scheme.verify(&digest, &TermsSignature(vec![0u8; 10]), &party));
        // A signer id that is not a valid verifying key (off-curve id)
        let (off_curve, _) = ParcelId::find_id(&[b"not_a_key"]);
        let sig = sign_digest(&[42u8; 32], &digest);
        assert!(!Ed25519Scheme.verify(&digest, &sig, &off_curve));
    }
}
