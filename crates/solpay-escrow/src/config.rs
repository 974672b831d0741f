//! Escrow program configuration.
//!
//! The program id is the namespace all escrow addresses are derived
//! under. Two deployments with different ids never share an address.

use solpay_core::Address;

/// Label hashed into the default program id.
pub const DEFAULT_PROGRAM_LABEL: &str = "solpay:escrow-program";

/// Configuration for an [`EscrowProgram`](crate::EscrowProgram).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramConfig {
    /// Namespace for derived addresses and signing domain for commands.
    pub program_id: Address,
}

impl Default for ProgramConfig {
    fn default() -> Self {
        Self {
            program_id: Address::from_label(DEFAULT_PROGRAM_LABEL),
        }
    }
}

impl ProgramConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `SOLPAY_PROGRAM_ID` (64 hex chars; default: `sha256("solpay:escrow-program")`)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        match lookup("SOLPAY_PROGRAM_ID") {
            Some(raw) => {
                let program_id = Address::from_hex(&raw).map_err(|e| ConfigError::InvalidValue {
                    var: "SOLPAY_PROGRAM_ID".to_string(),
                    reason: e.to_string(),
                })?;
                Ok(Self { program_id })
            }
            None => Ok(Self::default()),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable is set but unparseable.
    #[error("invalid value for {var}: {reason}")]
    InvalidValue {
        /// Variable name.
        var: String,
        /// Parse failure.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_program_id_is_label_hash() {
        let cfg = ProgramConfig::from_lookup(|_| None).unwrap();
        assert_eq!(cfg.program_id, Address::from_label(DEFAULT_PROGRAM_LABEL));
    }

    #[test]
    fn reads_hex_override() {
        let id = Address::new([7; 32]);
        let cfg = ProgramConfig::from_lookup(|_| Some(id.to_hex())).unwrap();
        assert_eq!(cfg.program_id, id);
    }

    #[test]
    fn rejects_bad_hex() {
        let err = ProgramConfig::from_lookup(|_| Some("xyz".to_string())).unwrap_err();
        assert!(format!("{err}").contains("SOLPAY_PROGRAM_ID"));
    }
}
