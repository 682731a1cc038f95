pub mod authority;
pub mod certificate;
pub mod digest;
pub mod signature;
pub mod terms;

// Re-export the main types for convenience
pub use authority::AgreementAuthority;
pub use certificate::LeaseCertificate;
pub use digest::lease_terms_digest;
pub use signature::{Ed25519Scheme, SignatureScheme, TermsSignature};
pub use terms::LeaseTerms;
