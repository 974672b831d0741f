//! # solpay-cli: Local Escrow Toolchain
//!
//! Drives the escrow program against a ledger persisted as JSON files in a
//! state directory, so a full escrow lifecycle can be exercised from the
//! shell:
//!
//! ```bash
//! solpay keygen --name alice
//! solpay keygen --name bob
//! solpay ledger airdrop --to $(cat alice.pub) --lamports 100000000
//! solpay ledger create-mint --authority alice.key
//! solpay ledger mint-to --mint $MINT --authority alice.key --owner $(cat alice.pub) --amount 1337000000
//! solpay escrow open --sender-key alice.key --recipient $(cat bob.pub) --mint $MINT --id 1 --amount 20000000
//! solpay escrow complete --recipient-key bob.key --sender $(cat alice.pub) --mint $MINT --id 1
//! ```
//!
//! ## Subcommands
//!
//! - `solpay keygen`: Ed25519 key pair files.
//! - `solpay ledger`: mints, airdrops, balances, associated accounts.
//! - `solpay escrow`: derive, open, complete, cancel, status.
//!
//! ## Crate Policy
//!
//! - Handlers return `anyhow::Result<u8>`; the `u8` is the process exit code.
//! - Business rules live in `solpay-escrow` and `solpay-ledger`; handlers
//!   only parse, load state, call, save state, and print.

pub mod config;
pub mod escrow;
pub mod keygen;
pub mod ledger;
pub mod workspace;
