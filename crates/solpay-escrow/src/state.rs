//! # Escrow State Record
//!
//! One record per instance, stored at the derived state address. All
//! fields except the stage are fixed at Open. The stage only moves
//! forward: `Initialized` to exactly one of `Completed` or `Cancelled`.
//!
//! ## Account Layout
//!
//! [`EscrowStateRecord::pack`] produces the fixed-width account image:
//!
//! | Offset | Size | Field |
//! |---|---|---|
//! | 0 | 8 | discriminator, `sha256("account:EscrowState")[..8]` |
//! | 8 | 8 | instance id, u64 LE |
//! | 16 | 8 | amount, u64 LE |
//! | 24 | 32 | sender |
//! | 56 | 32 | recipient |
//! | 88 | 32 | asset |
//! | 120 | 32 | vault address |
//! | 152 | 1 | stage code |
//! | 153 | 1 | state bump |
//! | 154 | 1 | vault bump |
//!
//! The transition log is not part of the account image.

use serde::{Deserialize, Serialize};
use solpay_core::{sha256_raw, Address, ContentDigest, InstanceId, Timestamp};

use crate::address::{DerivedAddress, EscrowAddresses, EscrowKey};
use crate::error::EscrowError;

/// Size of the packed account image in bytes.
pub const PACKED_LEN: usize = 8 + 8 + 8 + 32 * 4 + 3;

const DISCRIMINATOR_PREIMAGE: &[u8] = b"account:EscrowState";

// ── Stage ────────────────────────────────────────────────────────────

/// Lifecycle position of an escrow instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// Funds deposited in the vault.
    Initialized,
    /// Recipient claimed the funds. Terminal.
    Completed,
    /// Sender reclaimed the funds. Terminal.
    Cancelled,
}

impl Stage {
    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// The canonical string name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initialized => "INITIALIZED",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Account-layout code.
    pub fn code(&self) -> u8 {
        match self {
            Self::Initialized => 1,
            Self::Completed => 2,
            Self::Cancelled => 3,
        }
    }

    /// Decode an account-layout code.
    pub fn from_code(code: u8) -> Result<Self, EscrowError> {
        match code {
            1 => Ok(Self::Initialized),
            2 => Ok(Self::Completed),
            3 => Ok(Self::Cancelled),
            other => Err(EscrowError::UnknownStage(other)),
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Transition Log ───────────────────────────────────────────────────

/// One entry in a record's audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// Stage before the transition; `None` for the Open that created the record.
    pub from_stage: Option<Stage>,
    /// Stage after the transition.
    pub to_stage: Stage,
    /// Authenticated party that triggered it.
    pub actor: Address,
    /// When the transition was applied.
    pub timestamp: Timestamp,
    /// Digest of the signed command bytes.
    pub command_digest: ContentDigest,
}

// ── Record ───────────────────────────────────────────────────────────

/// Durable metadata and stage of one escrow instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowStateRecord {
    instance_id: InstanceId,
    sender: Address,
    recipient: Address,
    asset: Address,
    amount: u64,
    stage: Stage,
    state_address: Address,
    state_bump: u8,
    vault_address: Address,
    vault_bump: u8,
    transitions: Vec<TransitionRecord>,
}

impl EscrowStateRecord {
    pub(crate) fn initialized(
        addresses: &EscrowAddresses,
        amount: u64,
        command_digest: ContentDigest,
    ) -> Self {
        let key = addresses.key;
        Self {
            instance_id: key.instance_id,
            sender: key.sender,
            recipient: key.recipient,
            asset: key.asset,
            amount,
            stage: Stage::Initialized,
            state_address: addresses.state.address,
            state_bump: addresses.state.bump,
            vault_address: addresses.vault.address,
            vault_bump: addresses.vault.bump,
            transitions: vec![TransitionRecord {
                from_stage: None,
                to_stage: Stage::Initialized,
                actor: key.sender,
                timestamp: Timestamp::now(),
                command_digest,
            }],
        }
    }

    /// Move an `Initialized` record to a terminal stage.
    pub(crate) fn settle(
        &mut self,
        to: Stage,
        operation: &'static str,
        actor: Address,
        command_digest: ContentDigest,
    ) -> Result<(), EscrowError> {
        if self.stage != Stage::Initialized || !to.is_terminal() {
            return Err(EscrowError::WrongStage {
                state_address: self.state_address,
                operation,
                stage: self.stage,
            });
        }
        self.transitions.push(TransitionRecord {
            from_stage: Some(self.stage),
            to_stage: to,
            actor,
            timestamp: Timestamp::now(),
            command_digest,
        });
        self.stage = to;
        Ok(())
    }

    /// The caller-chosen nonce.
    pub fn instance_id(&self) -> InstanceId {
        self.instance_id
    }

    /// Funding party.
    pub fn sender(&self) -> &Address {
        &self.sender
    }

    /// Claiming party.
    pub fn recipient(&self) -> &Address {
        &self.recipient
    }

    /// Escrowed mint.
    pub fn asset(&self) -> &Address {
        &self.asset
    }

    /// Escrowed amount.
    pub fn amount(&self) -> u64 {
        self.amount
    }

    /// Current stage.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Where this record lives.
    pub fn state_address(&self) -> &Address {
        &self.state_address
    }

    /// The vault token account.
    pub fn vault_address(&self) -> &Address {
        &self.vault_address
    }

    /// The instance key.
    pub fn key(&self) -> EscrowKey {
        EscrowKey::new(self.sender, self.recipient, self.asset, self.instance_id)
    }

    /// Derived addresses with their bumps, as recorded at Open.
    pub fn addresses(&self) -> EscrowAddresses {
        EscrowAddresses {
            key: self.key(),
            state: DerivedAddress {
                address: self.state_address,
                bump: self.state_bump,
            },
            vault: DerivedAddress {
                address: self.vault_address,
                bump: self.vault_bump,
            },
        }
    }

    /// Audit trail, oldest first.
    pub fn transitions(&self) -> &[TransitionRecord] {
        &self.transitions
    }

    /// Encode the fixed-width account image.
    pub fn pack(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(PACKED_LEN);
        out.extend_from_slice(&discriminator());
        out.extend_from_slice(&self.instance_id.to_le_bytes());
        out.extend_from_slice(&self.amount.to_le_bytes());
        out.extend_from_slice(self.sender.as_bytes());
        out.extend_from_slice(self.recipient.as_bytes());
        out.extend_from_slice(self.asset.as_bytes());
        out.extend_from_slice(self.vault_address.as_bytes());
        out.push(self.stage.code());
        out.push(self.state_bump);
        out.push(self.vault_bump);
        out
    }

    /// Decode an account image stored at `state_address`. The transition
    /// log comes back empty.
    pub fn unpack(state_address: Address, data: &[u8]) -> Result<Self, EscrowError> {
        if data.len() != PACKED_LEN {
            return Err(EscrowError::CorruptRecord {
                reason: format!("expected {PACKED_LEN} bytes, got {}", data.len()),
            });
        }
        if data[..8] != discriminator() {
            return Err(EscrowError::CorruptRecord {
                reason: "account discriminator mismatch".to_string(),
            });
        }
        let mut reader = Reader { data, pos: 8 };
        let instance_id = InstanceId::new(u64::from_le_bytes(reader.take()?));
        let amount = u64::from_le_bytes(reader.take()?);
        let sender = Address::new(reader.take()?);
        let recipient = Address::new(reader.take()?);
        let asset = Address::new(reader.take()?);
        let vault_address = Address::new(reader.take()?);
        let [stage_code, state_bump, vault_bump] = reader.take::<3>()?;
        Ok(Self {
            instance_id,
            sender,
            recipient,
            asset,
            amount,
            stage: Stage::from_code(stage_code)?,
            state_address,
            state_bump,
            vault_address,
            vault_bump,
            transitions: Vec::new(),
        })
    }
}

fn discriminator() -> [u8; 8] {
    let hash = sha256_raw(DISCRIMINATOR_PREIMAGE);
    let mut out = [0u8; 8];
    out.copy_from_slice(&hash[..8]);
    out
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl Reader<'_> {
    fn take<const N: usize>(&mut self) -> Result<[u8; N], EscrowError> {
        let end = self.pos + N;
        let slice = self
            .data
            .get(self.pos..end)
            .ok_or_else(|| EscrowError::CorruptRecord {
                reason: format!("truncated at offset {}", self.pos),
            })?;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        self.pos = end;
        Ok(out)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn unpack_never_panics(data in proptest::collection::vec(any::<u8>(), 0..200)) {
            let _ = EscrowStateRecord::unpack(Address::new([0; 32]), &data);
        }

        #[test]
        fn unpack_rejects_unknown_stage_codes(code in 4u8..=255) {
            let mut data = vec![0u8; PACKED_LEN];
            data[..8].copy_from_slice(&discriminator());
            data[PACKED_LEN - 3] = code;
            prop_assert!(matches!(
                EscrowStateRecord::unpack(Address::new([0; 32]), &data),
                Err(EscrowError::UnknownStage(c)) if c == code
            ));
        }
    }
}
