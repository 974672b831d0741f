//! # Ledger Errors

use solpay_core::Address;
use solpay_crypto::CryptoError;
use thiserror::Error;

/// Reasons the ledger rejects an instruction or administrative call.
///
/// A rejected transaction leaves no partial effects; the error names the
/// first instruction that failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// No token account at this address.
    #[error("token account {0} not found")]
    AccountNotFound(Address),

    /// An account or mint already exists at this address.
    #[error("account {0} already exists")]
    AccountExists(Address),

    /// The mint is not registered.
    #[error("mint {0} not found")]
    MintNotFound(Address),

    /// The account holds a different asset than required.
    #[error("account {account} holds mint {actual}, expected {expected}")]
    MintMismatch {
        /// Offending account.
        account: Address,
        /// Mint the operation required.
        expected: Address,
        /// Mint the account actually holds.
        actual: Address,
    },

    /// The account belongs to a different owner than required.
    #[error("account {account} is owned by {actual}, expected {expected}")]
    OwnerMismatch {
        /// Offending account.
        account: Address,
        /// Owner the operation required.
        expected: Address,
        /// Owner the account actually has.
        actual: Address,
    },

    /// The presented authority may not act for the account.
    #[error("unauthorized for account {account}: {reason}")]
    Unauthorized {
        /// Account the authority tried to act on.
        account: Address,
        /// Why it was refused.
        reason: String,
    },

    /// Token balance too low for a transfer.
    #[error("insufficient funds in {account}: requested {requested}, available {available}")]
    InsufficientFunds {
        /// Debited account.
        account: Address,
        /// Amount requested.
        requested: u64,
        /// Amount held.
        available: u64,
    },

    /// Lamport balance too low to pay account rent.
    #[error("insufficient lamports in {payer}: requested {requested}, available {available}")]
    InsufficientLamports {
        /// Paying wallet.
        payer: Address,
        /// Rent required.
        requested: u64,
        /// Lamports held.
        available: u64,
    },

    /// Only empty token accounts can be closed.
    #[error("account {account} still holds {amount} tokens")]
    NonZeroBalance {
        /// Account that could not be closed.
        account: Address,
        /// Remaining balance.
        amount: u64,
    },

    /// A credit would overflow `u64`.
    #[error("arithmetic overflow crediting {0}")]
    Overflow(Address),

    /// Associated-account derivation failed.
    #[error("derivation failed: {0}")]
    Derivation(#[from] CryptoError),
}
