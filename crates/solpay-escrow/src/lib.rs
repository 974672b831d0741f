//! # solpay-escrow: Two-Party Token Escrow
//!
//! A sender locks `amount` units of one asset in a program-controlled vault
//! for one recipient. Exactly one of two things happens next: the
//! recipient claims the funds ([`EscrowProgram::complete`]) or the sender
//! takes them back ([`EscrowProgram::cancel`]).
//!
//! ## Addresses
//!
//! Every escrow instance is named by an [`EscrowKey`]: `(sender, recipient,
//! asset, instance_id)`. From it [`EscrowAddresses::derive`] computes two
//! program-derived addresses, one for the state record and one for the
//! vault token account. Nobody holds a private key for either; the vault
//! is owned by the state address and only moves when the program presents
//! the state seeds to the ledger.
//!
//! ## Lifecycle
//!
//! ```text
//!            open              complete (recipient)
//! (none) ──────────▶ Initialized ─────────────────▶ Completed
//!                        │
//!                        │ cancel (sender)
//!                        ▼
//!                    Cancelled
//! ```
//!
//! Terminal records are retained, so the same key can never be reopened
//! and a late Complete or Cancel observes `WrongStage`.
//!
//! ## Concurrency
//!
//! Each instance has its own lock. Check-stage, move-funds, and
//! set-stage happen under it as one unit, and the ledger applies the
//! funds movement as a single atomic transaction. Different instances
//! never contend on a shared lock.

pub mod address;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod state;
pub mod store;

pub use address::{DerivedAddress, EscrowAddresses, EscrowKey, STATE_SEED, VAULT_SEED};
pub use command::{CancelEscrow, Command, CompleteEscrow, OpenEscrow, SignedCommand};
pub use config::{ConfigError, ProgramConfig};
pub use engine::{EscrowProgram, EscrowView};
pub use error::EscrowError;
pub use state::{EscrowStateRecord, Stage, TransitionRecord, PACKED_LEN};
pub use store::{RecordSnapshot, RecordStore};
