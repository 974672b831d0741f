//! # Escrow Error Types
//!
//! Every variant carries the addresses and values needed to diagnose the
//! rejection without reading logs. All errors are terminal for the
//! request that produced them; nothing is retried and nothing is
//! partially applied.

use solpay_core::{Address, CanonicalizationError};
use solpay_crypto::CryptoError;
use solpay_ledger::LedgerError;
use thiserror::Error;

use crate::config::ConfigError;
use crate::state::Stage;

/// Errors from escrow operations.
#[derive(Error, Debug)]
pub enum EscrowError {
    /// Escrowed amount must be positive.
    #[error("invalid amount {amount}: escrow amount must be greater than zero")]
    InvalidAmount {
        /// The rejected amount.
        amount: u64,
    },

    /// A record already exists for this key, open or archived.
    #[error("escrow instance at {state_address} already exists")]
    DuplicateInstance {
        /// Derived state address of the instance.
        state_address: Address,
    },

    /// The source holds fewer tokens, or the payer fewer lamports, than
    /// the operation needs.
    #[error("insufficient funds in {account}: requested {requested}, available {available}")]
    InsufficientFunds {
        /// Debited account or paying wallet.
        account: Address,
        /// Amount requested.
        requested: u64,
        /// Amount available.
        available: u64,
    },

    /// No record at the derived state address.
    #[error("no escrow record at {state_address}")]
    RecordNotFound {
        /// Derived state address that was looked up.
        state_address: Address,
    },

    /// The record is not in a stage that permits the operation.
    #[error("escrow {state_address} cannot {operation} in stage {stage}")]
    WrongStage {
        /// Derived state address of the instance.
        state_address: Address,
        /// Attempted operation.
        operation: &'static str,
        /// Current stage.
        stage: Stage,
    },

    /// The authenticated caller is not the party allowed to act.
    #[error("{caller} may not {operation} escrow {state_address}; only {expected} may")]
    NotAuthorized {
        /// Derived state address of the instance.
        state_address: Address,
        /// Attempted operation.
        operation: &'static str,
        /// The authenticated caller.
        caller: Address,
        /// The party the record requires.
        expected: Address,
    },

    /// A source or destination account does not belong to the expected
    /// party or does not hold the escrowed asset.
    #[error("account {account} rejected: {reason}")]
    AccountMismatch {
        /// Offending token account.
        account: Address,
        /// Why it was rejected.
        reason: String,
    },

    /// The command signature did not verify against the named signer.
    #[error("command authentication failed: {0}")]
    Authentication(CryptoError),

    /// No bump produced an off-curve address; choose another instance id.
    #[error("address derivation failed: {0}")]
    Derivation(CryptoError),

    /// Account data could not be decoded as an escrow record.
    #[error("corrupt escrow record: {reason}")]
    CorruptRecord {
        /// What was wrong with the bytes.
        reason: String,
    },

    /// Stage byte outside the known codes.
    #[error("unknown stage code {0}")]
    UnknownStage(u8),

    /// Any other ledger rejection.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Program configuration is invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A command could not be canonicalized for signing.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),
}

impl EscrowError {
    /// Stable short name for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidAmount { .. } => "invalid_amount",
            Self::DuplicateInstance { .. } => "duplicate_instance",
            Self::InsufficientFunds { .. } => "insufficient_funds",
            Self::RecordNotFound { .. } => "record_not_found",
            Self::WrongStage { .. } => "wrong_stage",
            Self::NotAuthorized { .. } => "not_authorized",
            Self::AccountMismatch { .. } => "account_mismatch",
            Self::Authentication(_) => "authentication",
            Self::Derivation(_) => "derivation",
            Self::CorruptRecord { .. } => "corrupt_record",
            Self::UnknownStage(_) => "unknown_stage",
            Self::Ledger(_) => "ledger",
            Self::Config(_) => "config",
            Self::Canonicalization(_) => "canonicalization",
        }
    }
}
