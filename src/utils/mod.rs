//! Small shared helpers.

/// Cryptographic hash calculation utilities
pub mod hash;
