//! # Error Types
//!
//! Defines the foundational error types shared across the workspace. All
//! errors use `thiserror` for derive-based `Display` and `Error`
//! implementations.
//!
//! ## Design
//!
//! - Validation errors carry the rejected input and the expected format.
//! - Canonicalization errors fail loudly; a command that cannot be
//!   canonicalized cannot be signed.
//! - Subsystem crates (`solpay-crypto`, `solpay-ledger`, `solpay-escrow`)
//!   define their own enums and wrap these where needed.

use thiserror::Error;

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical representations.
    /// Amounts must be integers.
    #[error("float values are not permitted in canonical representations; use integer amounts: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Validation errors for domain primitive newtypes.
///
/// Each newtype enforces its format at construction time so that a
/// malformed address is rejected at the parsing boundary rather than deep
/// inside a ledger operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Address is not 64 lowercase/uppercase hex characters.
    #[error("invalid address: \"{value}\" ({reason})")]
    InvalidAddress {
        /// The rejected input.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Instance id is not an unsigned 64-bit integer.
    #[error("invalid instance id: \"{0}\" (expected unsigned 64-bit integer)")]
    InvalidInstanceId(String),
}
