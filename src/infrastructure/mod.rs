//! Adapters for the domain ports.

pub mod channels;
pub mod in_memory;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
