#![deny(missing_docs)]

//! # solpay-core: Foundational Types
//!
//! Every other crate in the workspace depends on this one. It has no
//! internal crate dependencies and pulls in only `serde`, `serde_json`,
//! `serde_jcs`, `thiserror`, `chrono`, and `sha2`.
//!
//! ## Design Principles
//!
//! 1. **Newtype wrappers for domain primitives.** Ledger and escrow
//!    addresses are [`Address`]; escrow nonces are [`InstanceId`]. A raw
//!    `[u8; 32]` or `u64` never crosses a crate boundary.
//!
//! 2. **[`CanonicalBytes`] is the sole signing input.** Every signed command
//!    flows through `CanonicalBytes::new()` (JCS, sorted keys, no floats), so
//!    the signer and the verifier always hash the same bytes.
//!
//! 3. **Structured errors.** [`ValidationError`] and
//!    [`CanonicalizationError`] derive `thiserror`; no `Box<dyn Error>`, no
//!    `.unwrap()` outside tests.

pub mod canonical;
pub mod digest;
pub mod error;
pub mod identity;
pub mod temporal;

// Re-export primary types at crate root for ergonomic imports.
pub use canonical::CanonicalBytes;
pub use digest::{sha256_digest, sha256_raw, ContentDigest, Sha256Accumulator};
pub use error::{CanonicalizationError, ValidationError};
pub use identity::{Address, InstanceId};
pub use temporal::Timestamp;
