use curve25519_dalek::edwards::CompressedEdwardsY;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::ops::Deref;

// ParcelId identifies every participant and object in the system: party
// identities (ed25519 verifying-key bytes), asset ledgers, and minted
// lease certificates. 32 bytes, resembling a public key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParcelId([u8; 32]);

impl fmt::Display for ParcelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Format as a hex string with a prefix of the first 6 bytes
        let prefix = hex::encode(&self.0[0..6]);
        write!(f, "pid:{}", prefix)
    }
}

impl Ord for ParcelId {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

impl PartialOrd for ParcelId {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Default for ParcelId {
    fn default() -> Self {
        ParcelId([0; 32])
    }
}

impl Deref for ParcelId {
    type Target = [u8; 32];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl ParcelId {
    pub fn new(id: [u8; 32]) -> Self {
        ParcelId(id)
    }

    /// Get a reference to the internal bytes
    pub fn bytes(&self) -> &[u8] {
        &self.0
    }

    /// Get the internal bytes as a fixed-size array reference
    pub fn as_array(&self) -> &[u8; 32] {
        &self.0
    }

    /// The all-zero identity. Used as the null counterparty and as the
    /// open-lessee placeholder in lease offer terms.
    pub fn zero() -> Self {
        ParcelId([0; 32])
    }

    /// Whether this is the null identity
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    pub fn create_id(seeds: &[&[u8]], bump: u8) -> [u8; 32] {
        let mut hasher = Sha256::new();

        // Domain separator
        hasher.update(b"PARCEL_Id");

        // Add all seeds
        for seed in seeds {
            hasher.update(seed);
        }

        // Add bump
        hasher.update([bump]);

        hasher.finalize().into()
    }

    /// Verify that a 32-byte array is not a valid point on the ed25519 curve
    ///
    /// Minted object ids (assets, certificates) are kept off-curve so they
    /// can never collide with a party's verifying key.
    pub fn is_off_curve(bytes: &[u8; 32]) -> bool {
        let Ok(compressed_edwards_y) = CompressedEdwardsY::from_slice(bytes.as_ref()) else {
            return true;
        };
        compressed_edwards_y.decompress().is_none()
    }

    /// Try to derive an off-curve ParcelId for the given seeds
    pub fn try_find_id(seeds: &[&[u8]]) -> Option<(ParcelId, u8)> {
        for bump in 0..255 {
            let id = ParcelId::create_id(seeds, bump);
            if ParcelId::is_off_curve(&id) {
                return Some((ParcelId(id), bump));
            }
        }
        None
    }

    /// Derive an off-curve ParcelId for the given seeds
    pub fn find_id(seeds: &[&[u8]]) -> (ParcelId, u8) {
        ParcelId::try_find_id(seeds).expect("Failed to find a valid ParcelId")
    }

    /// Create a random ParcelId for testing - exposed for tests in other crates
    pub fn random() -> Self {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
            .to_le_bytes();

        let (id, _) = Self::find_id(&[&now, &[9, 8, 7, 6]]);
        id
    }
}
