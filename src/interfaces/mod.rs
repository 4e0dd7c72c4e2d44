//! CSV adapters used by the replay binary.

pub mod csv;
