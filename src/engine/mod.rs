//! Pure computation engine(s) for deterministic ledger logic.

pub mod accrual;
pub mod locks;

pub use accrual::{AccrualEngine, AccrualError};
pub use locks::KeyedLocks;
