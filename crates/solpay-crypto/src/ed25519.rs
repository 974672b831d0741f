//! # Ed25519 Command Signing
//!
//! A party's ledger [`Address`] is its Ed25519 public key. Escrow commands
//! are signed by the acting party over their canonical bytes, and the state
//! machine verifies the signature against the address named in the command
//! before touching any funds.
//!
//! ## Security Invariant
//!
//! - Signing input MUST be `&CanonicalBytes`; raw byte slices cannot be
//!   signed, so a command hashes identically on both ends.
//! - `Keypair` does not implement `Serialize`. The seed only leaves the
//!   type through [`Keypair::seed_hex`], which exists for key files.
//! - Verification against a program-derived address always fails: such
//!   addresses are off-curve and cannot be decoded as a verifying key.

use ed25519_dalek::{Signer, Verifier};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use solpay_core::{Address, CanonicalBytes};

use crate::error::CryptoError;

/// An Ed25519 signature (64 bytes).
///
/// Serializes as a 128-character hex string.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Ed25519Signature(pub [u8; 64]);

/// An Ed25519 key pair controlling one wallet address.
pub struct Keypair {
    signing_key: ed25519_dalek::SigningKey,
}

// ── Ed25519Signature ─────────────────────────────────────────────────

impl Ed25519Signature {
    /// Create a signature from raw 64 bytes.
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Return the raw 64-byte signature.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// Render the signature as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Parse a signature from a 128-character hex string.
    pub fn from_hex(hex: &str) -> Result<Self, CryptoError> {
        let hex = hex.trim();
        if hex.len() != 128 {
            return Err(CryptoError::VerificationFailed(format!(
                "signature hex must be 128 chars, got {}",
                hex.len()
            )));
        }
        let bytes = hex_to_bytes(hex).map_err(CryptoError::VerificationFailed)?;
        let mut arr = [0u8; 64];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl Serialize for Ed25519Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Ed25519Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Self::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Debug for Ed25519Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix: String = self.0.iter().take(4).map(|b| format!("{b:02x}")).collect();
        write!(f, "Ed25519Signature({prefix}...)")
    }
}

impl std::fmt::Display for Ed25519Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

// ── Keypair ──────────────────────────────────────────────────────────

impl Keypair {
    /// Generate a new random key pair from the OS RNG.
    pub fn generate() -> Self {
        let mut csprng = rand::rngs::OsRng;
        let signing_key = ed25519_dalek::SigningKey::generate(&mut csprng);
        Self { signing_key }
    }

    /// Create a key pair from a raw 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let signing_key = ed25519_dalek::SigningKey::from_bytes(seed);
        Self { signing_key }
    }

    /// Create a key pair from a 64-character hex seed, as written by
    /// [`Keypair::seed_hex`].
    pub fn from_seed_hex(hex: &str) -> Result<Self, CryptoError> {
        let hex = hex.trim();
        if hex.len() != 64 {
            return Err(CryptoError::KeyError(format!(
                "seed hex must be 64 chars, got {}",
                hex.len()
            )));
        }
        let bytes = hex_to_bytes(hex).map_err(CryptoError::KeyError)?;
        let mut seed = [0u8; 32];
        seed.copy_from_slice(&bytes);
        Ok(Self::from_seed(&seed))
    }

    /// The seed as lowercase hex. Only for persisting to a key file.
    pub fn seed_hex(&self) -> String {
        self.signing_key
            .to_bytes()
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect()
    }

    /// The wallet address controlled by this key pair.
    pub fn address(&self) -> Address {
        Address::new(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign canonical bytes.
    pub fn sign(&self, data: &CanonicalBytes) -> Ed25519Signature {
        let sig = self.signing_key.sign(data.as_bytes());
        Ed25519Signature(sig.to_bytes())
    }
}

impl std::fmt::Debug for Keypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Keypair(<private>)")
    }
}

// ── Verification ─────────────────────────────────────────────────────

/// Verify that `signer` produced `signature` over `data`.
///
/// # Errors
///
/// [`CryptoError::KeyError`] if `signer` is not a valid curve point (every
/// program-derived address), [`CryptoError::VerificationFailed`] if the
/// signature does not match.
pub fn verify(
    data: &CanonicalBytes,
    signature: &Ed25519Signature,
    signer: &Address,
) -> Result<(), CryptoError> {
    let vk = ed25519_dalek::VerifyingKey::from_bytes(signer.as_bytes())
        .map_err(|e| CryptoError::KeyError(format!("address {signer} is not a public key: {e}")))?;
    let sig = ed25519_dalek::Signature::from_bytes(&signature.0);
    vk.verify(data.as_bytes(), &sig)
        .map_err(|e| CryptoError::VerificationFailed(format!("Ed25519 verification failed: {e}")))
}

fn hex_to_bytes(hex: &str) -> Result<Vec<u8>, String> {
    if hex.len() % 2 != 0 {
        return Err("hex string must have even length".to_string());
    }
    hex.as_bytes()
        .chunks(2)
        .enumerate()
        .map(|(i, pair)| {
            std::str::from_utf8(pair)
                .ok()
                .and_then(|s| u8::from_str_radix(s, 16).ok())
                .ok_or_else(|| format!("invalid hex at position {}", i * 2))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derivation::find_program_address;

    fn canonical(value: serde_json::Value) -> CanonicalBytes {
        CanonicalBytes::new(&value).unwrap()
    }

    #[test]
    fn sign_and_verify() {
        let kp = Keypair::generate();
        let data = canonical(serde_json::json!({"kind": "open", "amount": 100}));
        let sig = kp.sign(&data);
        verify(&data, &sig, &kp.address()).expect("valid signature should verify");
    }

    #[test]
    fn verify_wrong_signer_fails() {
        let kp1 = Keypair::generate();
        let kp2 = Keypair::generate();
        let data = canonical(serde_json::json!({"test": true}));
        let sig = kp1.sign(&data);
        assert!(matches!(
            verify(&data, &sig, &kp2.address()),
            Err(CryptoError::VerificationFailed(_))
        ));
    }

    #[test]
    fn verify_tampered_message_fails() {
        let kp = Keypair::generate();
        let sig = kp.sign(&canonical(serde_json::json!({"amount": 100})));
        let tampered = canonical(serde_json::json!({"amount": 101}));
        assert!(verify(&tampered, &sig, &kp.address()).is_err());
    }

    #[test]
    fn verify_against_derived_address_is_key_error() {
        let program = Address::from_label("program");
        let (pda, _) = find_program_address(&[b"vault"], &program).unwrap();
        let kp = Keypair::generate();
        let data = canonical(serde_json::json!({"x": 1}));
        let sig = kp.sign(&data);
        assert!(matches!(
            verify(&data, &sig, &pda),
            Err(CryptoError::KeyError(_))
        ));
    }

    #[test]
    fn deterministic_from_seed() {
        let kp1 = Keypair::from_seed(&[42u8; 32]);
        let kp2 = Keypair::from_seed(&[42u8; 32]);
        assert_eq!(kp1.address(), kp2.address());
        let data = canonical(serde_json::json!({"test": "deterministic"}));
        assert_eq!(kp1.sign(&data), kp2.sign(&data));
    }

    #[test]
    fn seed_hex_roundtrip() {
        let kp = Keypair::generate();
        let hex = kp.seed_hex();
        assert_eq!(hex.len(), 64);
        let restored = Keypair::from_seed_hex(&format!("{hex}\n")).unwrap();
        assert_eq!(restored.address(), kp.address());
    }

    #[test]
    fn seed_hex_rejects_garbage() {
        assert!(Keypair::from_seed_hex("abcd").is_err());
        assert!(Keypair::from_seed_hex(&"zz".repeat(32)).is_err());
    }

    #[test]
    fn signature_serde_is_hex_string() {
        let kp = Keypair::generate();
        let sig = kp.sign(&canonical(serde_json::json!({"y": 2})));
        let json = serde_json::to_string(&sig).unwrap();
        assert_eq!(json.len(), 128 + 2);
        let back: Ed25519Signature = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sig);
    }

    #[test]
    fn signature_invalid_hex() {
        assert!(Ed25519Signature::from_hex("not-hex").is_err());
        assert!(Ed25519Signature::from_hex(&"g".repeat(128)).is_err());
    }

    #[test]
    fn debug_does_not_leak_private_key() {
        let kp = Keypair::generate();
        assert_eq!(format!("{kp:?}"), "Keypair(<private>)");
    }
}
