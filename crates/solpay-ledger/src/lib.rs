//! # solpay-ledger: Token Account Store
//!
//! The external ledger the escrow program debits and credits through. It
//! knows about three things:
//!
//! - **Mints** ([`Mint`]): a fungible asset with a mint authority and a
//!   running supply.
//! - **Token accounts** ([`TokenAccount`]): a balance of one mint held for
//!   one owner. Owners are either wallets (Ed25519 public keys) or
//!   program-derived addresses.
//! - **Lamports**: the native balance wallets use to pay account rent.
//!   Every token account holds exactly [`LedgerConfig::account_rent`]
//!   lamports, returned to a named wallet when the account is closed.
//!
//! All state changes go through [`TokenLedger::execute`], which applies a
//! [`Transaction`] of [`Instruction`]s atomically: either every instruction
//! succeeds and the whole batch becomes visible at once, or none of it does.
//!
//! ## Authority
//!
//! Moving tokens out of, or closing, an account requires an [`Authority`]
//! matching the account owner. A wallet owner is matched directly; a
//! program-derived owner is matched by re-deriving it from the seeds in a
//! [`ProgramSigner`](solpay_crypto::ProgramSigner), and only inside a
//! transaction invoked by that same program.

pub mod account;
pub mod config;
pub mod error;
pub mod instruction;
pub mod ledger;

pub use account::{associated_account_address, associated_program_id, Mint, TokenAccount};
pub use config::{ConfigError, LedgerConfig};
pub use error::LedgerError;
pub use instruction::{Authority, Instruction, Transaction};
pub use ledger::{InMemoryLedger, LedgerSnapshot, TokenLedger};
