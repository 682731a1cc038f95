//! Fractional real-asset ownership, leasing and revenue distribution (PARCEL)
//!
//! This crate re-exports all the components of the PARCEL engine.

pub use parcel_core::*;
pub use parcel_ledger::*;
pub use parcel_agreement::*;
pub use parcel_market::*;
