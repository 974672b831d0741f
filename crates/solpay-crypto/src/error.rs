//! # Cryptographic Error Types
//!
//! Structured errors for signing, verification, and address derivation.

use thiserror::Error;

/// Errors from cryptographic operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Ed25519 signature verification failed.
    #[error("signature verification failed: {0}")]
    VerificationFailed(String),

    /// Key parsing failed.
    #[error("key error: {0}")]
    KeyError(String),

    /// More seeds than a derivation accepts (bump included).
    #[error("too many derivation seeds: {count} (maximum {max})")]
    MaxSeedsExceeded {
        /// Number of seeds supplied.
        count: usize,
        /// Maximum accepted.
        max: usize,
    },

    /// A single seed is longer than a derivation accepts.
    #[error("derivation seed {index} is {len} bytes (maximum {max})")]
    SeedTooLong {
        /// Position of the offending seed.
        index: usize,
        /// Its length.
        len: usize,
        /// Maximum accepted.
        max: usize,
    },

    /// The derived hash is a valid Ed25519 point, so a private key could
    /// exist for it; the candidate is rejected.
    #[error("derived address lies on the ed25519 curve")]
    OnCurve,

    /// Every bump from 255 down to 0 produced an on-curve point.
    #[error("no viable bump seed found for derivation")]
    NoViableBump,
}
