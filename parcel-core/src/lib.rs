pub mod error;
pub mod id;
pub mod payment;

// Re-export the main types for convenience
pub use error::MarketError;
pub use id::ParcelId;
pub use payment::{PaymentAsset, VaultPaymentAsset};
