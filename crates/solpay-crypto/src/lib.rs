//! # solpay-crypto: Cryptographic Primitives
//!
//! - **Ed25519** ([`ed25519`]): key pairs whose public key *is* the party's
//!   ledger [`Address`](solpay_core::Address), and signatures over
//!   [`CanonicalBytes`](solpay_core::CanonicalBytes) used to authenticate
//!   escrow commands.
//!
//! - **Program-derived addresses** ([`derivation`]): SHA-256 over seeds, a
//!   bump byte, and the program id, rejected while the result is a valid
//!   curve point. The surviving address has no private key, so only the
//!   program (presenting the seeds as a [`ProgramSigner`]) can authorize
//!   movements out of accounts it owns.

pub mod derivation;
pub mod ed25519;
pub mod error;

// Re-export primary types.
pub use derivation::{
    create_program_address, find_program_address, is_on_curve, ProgramSigner, MAX_SEEDS,
    MAX_SEED_LEN,
};
pub use ed25519::{verify, Ed25519Signature, Keypair};
pub use error::CryptoError;
