//! # Escrow Address Derivation
//!
//! Both addresses of an instance are program-derived from the same four
//! inputs under different prefixes:
//!
//! ```text
//! state = PDA(["escrow_state",  sender, recipient, asset, id_le], program)
//! vault = PDA(["escrow_wallet", sender, recipient, asset, id_le], program)
//! ```
//!
//! `id_le` is the instance id as 8 little-endian bytes. Any party that
//! knows the four inputs can recompute both addresses, so no index of
//! escrows is kept anywhere.

use serde::{Deserialize, Serialize};
use solpay_core::{Address, InstanceId};
use solpay_crypto::{find_program_address, ProgramSigner};

use crate::error::EscrowError;

/// Seed prefix of the state record address.
pub const STATE_SEED: &[u8] = b"escrow_state";

/// Seed prefix of the vault account address.
pub const VAULT_SEED: &[u8] = b"escrow_wallet";

/// The four inputs naming one escrow instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EscrowKey {
    /// Party funding the escrow.
    pub sender: Address,
    /// Party entitled to claim it.
    pub recipient: Address,
    /// Mint of the escrowed asset.
    pub asset: Address,
    /// Caller-chosen nonce.
    pub instance_id: InstanceId,
}

impl EscrowKey {
    /// Assemble a key.
    pub fn new(sender: Address, recipient: Address, asset: Address, instance_id: InstanceId) -> Self {
        Self {
            sender,
            recipient,
            asset,
            instance_id,
        }
    }
}

/// A derived address and the bump that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedAddress {
    /// The off-curve address.
    pub address: Address,
    /// Bump byte appended to the seeds.
    pub bump: u8,
}

/// Both derived addresses of one instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowAddresses {
    /// The instance these addresses belong to.
    pub key: EscrowKey,
    /// Where the state record lives. Also the vault's owner.
    pub state: DerivedAddress,
    /// The vault token account.
    pub vault: DerivedAddress,
}

impl EscrowAddresses {
    /// Derive the state and vault addresses for `key` under `program_id`.
    ///
    /// # Errors
    ///
    /// [`EscrowError::Derivation`] if no bump yields an off-curve address.
    /// The caller must pick another instance id.
    pub fn derive(key: &EscrowKey, program_id: &Address) -> Result<Self, EscrowError> {
        let id = key.instance_id.to_le_bytes();
        let state = derive_one(STATE_SEED, key, &id, program_id)?;
        let vault = derive_one(VAULT_SEED, key, &id, program_id)?;
        tracing::debug!(
            state = %state.address,
            state_bump = state.bump,
            vault = %vault.address,
            vault_bump = vault.bump,
            "derived escrow addresses"
        );
        Ok(Self {
            key: *key,
            state,
            vault,
        })
    }

    /// The signer the program presents to move or close the vault.
    pub fn state_signer(&self, program_id: &Address) -> ProgramSigner {
        let id = self.key.instance_id.to_le_bytes();
        ProgramSigner::new(
            *program_id,
            &seeds(STATE_SEED, &self.key, &id),
            self.state.bump,
        )
    }
}

fn seeds<'a>(prefix: &'a [u8], key: &'a EscrowKey, id: &'a [u8; 8]) -> [&'a [u8]; 5] {
    [
        prefix,
        key.sender.as_ref(),
        key.recipient.as_ref(),
        key.asset.as_ref(),
        id.as_slice(),
    ]
}

fn derive_one(
    prefix: &[u8],
    key: &EscrowKey,
    id: &[u8; 8],
    program_id: &Address,
) -> Result<DerivedAddress, EscrowError> {
    let (address, bump) =
        find_program_address(&seeds(prefix, key, id), program_id).map_err(EscrowError::Derivation)?;
    Ok(DerivedAddress { address, bump })
}
