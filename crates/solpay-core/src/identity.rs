//! # Identity Newtypes
//!
//! Domain-primitive newtypes for everything that names a party, an account,
//! or an escrow instance.
//!
//! - [`Address`]: a 32-byte ledger address. Wallet addresses are Ed25519
//!   public keys; derived (program) addresses are SHA-256 outputs that are
//!   deliberately *not* valid curve points, so no private key exists for them.
//! - [`InstanceId`]: the caller-chosen 64-bit nonce that distinguishes two
//!   escrows between the same parties over the same asset.
//!
//! ## Serde
//!
//! `Address` serializes as a 64-character lowercase hex string.
//! `InstanceId` serializes as a plain JSON integer.

use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::digest::sha256_raw;
use crate::error::ValidationError;

/// A 32-byte ledger address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; 32]);

impl Address {
    /// Byte length of an address.
    pub const LEN: usize = 32;

    /// Create an address from raw bytes.
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Deterministic address for a well-known label (program ids, test
    /// fixtures). The result is `sha256(label)`.
    pub fn from_label(label: &str) -> Self {
        Self(sha256_raw(label.as_bytes()))
    }

    /// Access the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Copy out the raw bytes.
    pub fn to_bytes(self) -> [u8; 32] {
        self.0
    }

    /// Render as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Parse a 64-character hex string (case-insensitive, surrounding
    /// whitespace ignored).
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidAddress`] on wrong length or
    /// non-hex characters.
    pub fn from_hex(hex: &str) -> Result<Self, ValidationError> {
        decode_hex_32(hex).map(Self)
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for Address {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl FromStr for Address {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl std::fmt::Debug for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix: String = self.0.iter().take(4).map(|b| format!("{b:02x}")).collect();
        write!(f, "Address({prefix}...)")
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Self::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}

/// Caller-chosen escrow nonce.
///
/// Unique per `(sender, recipient, asset)` triple; reuse is rejected by the
/// state machine as a duplicate instance. Encoded little-endian inside
/// derivation seeds and the on-ledger record layout.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct InstanceId(u64);

impl InstanceId {
    /// Wrap a raw nonce.
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Derive an instance id from the current Unix time in seconds.
    ///
    /// Two escrows opened by the same parties within the same second
    /// collide and the second one is rejected as a duplicate.
    pub fn from_unix_time() -> Self {
        let secs = crate::Timestamp::now().epoch_secs();
        Self(u64::try_from(secs).unwrap_or_default())
    }

    /// The raw nonce value.
    pub fn value(&self) -> u64 {
        self.0
    }

    /// Little-endian encoding used in derivation seeds.
    pub fn to_le_bytes(&self) -> [u8; 8] {
        self.0.to_le_bytes()
    }
}

impl From<u64> for InstanceId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl FromStr for InstanceId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(Self)
            .map_err(|_| ValidationError::InvalidInstanceId(s.to_string()))
    }
}

impl std::fmt::Display for InstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub(crate) fn decode_hex_32(input: &str) -> Result<[u8; 32], ValidationError> {
    let hex = input.trim();
    let invalid = |reason: String| ValidationError::InvalidAddress {
        value: input.to_string(),
        reason,
    };
    if hex.len() != 64 {
        return Err(invalid(format!(
            "expected 64 hex characters, got {}",
            hex.len()
        )));
    }
    let mut out = [0u8; 32];
    for (i, chunk) in hex.as_bytes().chunks(2).enumerate() {
        let pair = std::str::from_utf8(chunk).map_err(|_| invalid("non-ASCII input".to_string()))?;
        out[i] = u8::from_str_radix(pair, 16)
            .map_err(|e| invalid(format!("invalid hex at position {}: {e}", i * 2)))?;
    }
    Ok(out)
}
