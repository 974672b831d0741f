//! # Mints and Token Accounts

use serde::{Deserialize, Serialize};
use solpay_core::Address;
use solpay_crypto::find_program_address;

use crate::error::LedgerError;

/// A registered fungible asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mint {
    /// Address identifying the asset.
    pub address: Address,
    /// The only party allowed to issue new units.
    pub authority: Address,
    /// Display precision. Amounts are always integer base units.
    pub decimals: u8,
    /// Total units issued.
    pub supply: u64,
}

/// A balance of one mint held for one owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAccount {
    /// Where the account lives.
    pub address: Address,
    /// The asset it holds.
    pub mint: Address,
    /// The party (wallet or program-derived address) that controls it.
    pub owner: Address,
    /// Token balance in base units.
    pub amount: u64,
    /// Rent deposit held by the account.
    pub lamports: u64,
}

/// Program id under which associated accounts are derived.
pub fn associated_program_id() -> Address {
    Address::from_label("solpay:associated-token-account")
}

/// The canonical token account for `owner` holding `mint`.
///
/// Deterministic, so a recipient's destination can be named before it
/// exists and created on demand.
pub fn associated_account_address(owner: &Address, mint: &Address) -> Result<Address, LedgerError> {
    let (address, _bump) =
        find_program_address(&[owner.as_ref(), mint.as_ref()], &associated_program_id())?;
    Ok(address)
}
