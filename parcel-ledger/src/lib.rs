pub mod checkpoint;
pub mod ledger;

// Re-export the main types for convenience
pub use checkpoint::{CheckpointEntry, CheckpointHistory, SequenceNumber};
pub use ledger::OwnershipLedger;
