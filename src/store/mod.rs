//! Storage backends for rates and transactions.

pub mod disk;
pub mod memory;

pub use disk::DiskStore;
pub use memory::{MemoryRateRepository, MemoryTransactionStore};
