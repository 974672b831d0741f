//! # Signed Escrow Commands
//!
//! Each operation takes a typed command wrapped in a [`SignedCommand`]. The
//! signature covers the canonical bytes of
//!
//! ```json
//! {"command": {...}, "kind": "open", "program_id": "<hex>", "signer": "<hex>"}
//! ```
//!
//! so a command signed for one program, one operation, or one signer does
//! not verify as any other. The verified signer is the caller identity the
//! state machine checks against the record.

use serde::{Deserialize, Serialize};
use solpay_core::{sha256_digest, Address, CanonicalBytes, ContentDigest};
use solpay_crypto::{verify, Ed25519Signature, Keypair};

use crate::address::EscrowKey;
use crate::error::EscrowError;

/// A command payload the state machine accepts.
pub trait Command: Serialize {
    /// Operation tag bound into the signature.
    const KIND: &'static str;

    /// The instance the command targets.
    fn key(&self) -> &EscrowKey;
}

/// Lock `amount` of the key's asset from `source` into a new vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenEscrow {
    /// Target instance.
    pub key: EscrowKey,
    /// Units to lock. Must be positive.
    pub amount: u64,
    /// Sender's token account to debit.
    pub source: Address,
}

/// Release the vault to the recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteEscrow {
    /// Target instance.
    pub key: EscrowKey,
    /// Recipient's token account to credit. Created on demand when it is
    /// the recipient's associated account.
    pub destination: Address,
}

/// Return the vault to the sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelEscrow {
    /// Target instance.
    pub key: EscrowKey,
    /// Sender's token account to credit. Created on demand when it is the
    /// sender's associated account.
    pub destination: Address,
}

impl Command for OpenEscrow {
    const KIND: &'static str = "open";

    fn key(&self) -> &EscrowKey {
        &self.key
    }
}

impl Command for CompleteEscrow {
    const KIND: &'static str = "complete";

    fn key(&self) -> &EscrowKey {
        &self.key
    }
}

impl Command for CancelEscrow {
    const KIND: &'static str = "cancel";

    fn key(&self) -> &EscrowKey {
        &self.key
    }
}

/// A command with its signer's Ed25519 signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedCommand<C> {
    /// The payload.
    pub command: C,
    /// Claimed signer. Trusted only after [`SignedCommand::verify`].
    pub signer: Address,
    /// Signature over the canonical signing payload.
    pub signature: Ed25519Signature,
}

#[derive(Serialize)]
struct SigningPayload<'a, C> {
    command: &'a C,
    kind: &'static str,
    program_id: &'a Address,
    signer: &'a Address,
}

fn signing_bytes<C: Command>(
    command: &C,
    program_id: &Address,
    signer: &Address,
) -> Result<CanonicalBytes, EscrowError> {
    Ok(CanonicalBytes::new(&SigningPayload {
        command,
        kind: C::KIND,
        program_id,
        signer,
    })?)
}

impl<C: Command> SignedCommand<C> {
    /// Sign `command` for `program_id` with `keypair`.
    pub fn sign(command: C, program_id: &Address, keypair: &Keypair) -> Result<Self, EscrowError> {
        let signer = keypair.address();
        let bytes = signing_bytes(&command, program_id, &signer)?;
        let signature = keypair.sign(&bytes);
        Ok(Self {
            command,
            signer,
            signature,
        })
    }

    /// Check the signature and return the digest of the signed bytes.
    ///
    /// # Errors
    ///
    /// [`EscrowError::Authentication`] if the signature does not verify
    /// against `signer` under `program_id`.
    pub fn verify(&self, program_id: &Address) -> Result<ContentDigest, EscrowError> {
        let bytes = signing_bytes(&self.command, program_id, &self.signer)?;
        verify(&bytes, &self.signature, &self.signer).map_err(EscrowError::Authentication)?;
        Ok(sha256_digest(&bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solpay_core::InstanceId;

    fn program() -> Address {
        Address::from_label("solpay:escrow-program")
    }

    fn open_for(sender: &Keypair) -> OpenEscrow {
        OpenEscrow {
            key: EscrowKey::new(
                sender.address(),
                Address::from_label("recipient"),
                Address::from_label("usd"),
                InstanceId::new(1),
            ),
            amount: 20_000_000,
            source: Address::from_label("source"),
        }
    }

    #[test]
    fn signed_command_verifies() {
        let kp = Keypair::generate();
        let signed = SignedCommand::sign(open_for(&kp), &program(), &kp).unwrap();
        assert_eq!(signed.signer, kp.address());
        signed.verify(&program()).unwrap();
    }

    #[test]
    fn digest_is_stable_per_command() {
        let kp = Keypair::from_seed(&[3; 32]);
        let a = SignedCommand::sign(open_for(&kp), &program(), &kp).unwrap();
        let b = SignedCommand::sign(open_for(&kp), &program(), &kp).unwrap();
        assert_eq!(a.verify(&program()).unwrap(), b.verify(&program()).unwrap());
    }

    #[test]
    fn tampered_amount_fails() {
        let kp = Keypair::generate();
        let mut signed = SignedCommand::sign(open_for(&kp), &program(), &kp).unwrap();
        signed.command.amount += 1;
        assert!(matches!(
            signed.verify(&program()),
            Err(EscrowError::Authentication(_))
        ));
    }

    #[test]
    fn substituted_signer_fails() {
        let kp = Keypair::generate();
        let mut signed = SignedCommand::sign(open_for(&kp), &program(), &kp).unwrap();
        signed.signer = Keypair::generate().address();
        assert!(signed.verify(&program()).is_err());
    }

    #[test]
    fn other_program_fails() {
        let kp = Keypair::generate();
        let signed = SignedCommand::sign(open_for(&kp), &program(), &kp).unwrap();
        assert!(signed.verify(&Address::from_label("other")).is_err());
    }

    #[test]
    fn kind_is_bound_into_signature() {
        let kp = Keypair::generate();
        let key = open_for(&kp).key;
        let complete = SignedCommand::sign(
            CompleteEscrow {
                key,
                destination: Address::from_label("dest"),
            },
            &program(),
            &kp,
        )
        .unwrap();
        let as_cancel = SignedCommand {
            command: CancelEscrow {
                key,
                destination: Address::from_label("dest"),
            },
            signer: complete.signer,
            signature: complete.signature.clone(),
        };
        assert!(complete.verify(&program()).is_ok());
        assert!(as_cancel.verify(&program()).is_err());
    }

    #[test]
    fn signed_command_serde_roundtrip() {
        let kp = Keypair::generate();
        let signed = SignedCommand::sign(open_for(&kp), &program(), &kp).unwrap();
        let json = serde_json::to_string(&signed).unwrap();
        let back: SignedCommand<OpenEscrow> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, signed);
        back.verify(&program()).unwrap();
    }
}
