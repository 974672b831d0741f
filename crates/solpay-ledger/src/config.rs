//! Ledger configuration.
//!
//! Rent is the only tunable. Override via `SOLPAY_ACCOUNT_RENT` or explicit
//! construction in tests.

/// Default rent deposit per token account, in lamports.
pub const DEFAULT_ACCOUNT_RENT: u64 = 2_039_280;

/// Configuration for an [`InMemoryLedger`](crate::InMemoryLedger).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Lamports moved from the payer into every newly created token
    /// account, and released when it closes.
    pub account_rent: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            account_rent: DEFAULT_ACCOUNT_RENT,
        }
    }
}

impl LedgerConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `SOLPAY_ACCOUNT_RENT` (default: 2039280)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let account_rent = match lookup("SOLPAY_ACCOUNT_RENT") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|e| ConfigError::InvalidValue {
                    var: "SOLPAY_ACCOUNT_RENT".to_string(),
                    reason: format!("{e}"),
                })?,
            None => DEFAULT_ACCOUNT_RENT,
        };
        Ok(Self { account_rent })
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
