//! # CLI Configuration
//!
//! Settings are layered, lowest precedence first:
//!
//! 1. Built-in defaults.
//! 2. Environment (`SOLPAY_PROGRAM_ID`, `SOLPAY_ACCOUNT_RENT`).
//! 3. `--config <file.yaml>`.
//! 4. `--state-dir`.
//!
//! ```yaml
//! program_id: 2f1c...e9   # 64 hex chars
//! account_rent: 2039280
//! state_dir: ./.solpay
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use solpay_core::Address;
use solpay_escrow::ProgramConfig;
use solpay_ledger::LedgerConfig;

/// Default state directory, relative to the current directory.
pub const DEFAULT_STATE_DIR: &str = ".solpay";

/// Optional overrides read from a YAML file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Program id override.
    pub program_id: Option<Address>,
    /// Rent per token account override.
    pub account_rent: Option<u64>,
    /// State directory override. Relative paths resolve against the
    /// config file's directory.
    pub state_dir: Option<PathBuf>,
}

impl FileConfig {
    /// Parse a YAML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }
}

/// Fully resolved settings for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Escrow program configuration.
    pub program: ProgramConfig,
    /// Ledger configuration.
    pub ledger: LedgerConfig,
    /// Where `state.json` lives.
    pub state_dir: PathBuf,
}

impl Settings {
    /// Layer environment, config file, and flag.
    pub fn resolve(config_file: Option<&Path>, state_dir_flag: Option<&Path>) -> Result<Self> {
        let program = ProgramConfig::from_env().context("invalid program configuration")?;
        let ledger = LedgerConfig::from_env().context("invalid ledger configuration")?;
        let file = match config_file {
            Some(path) => Some((FileConfig::load(path)?, path)),
            None => None,
        };
        Ok(Self::layer(program, ledger, file, state_dir_flag))
    }

    fn layer(
        mut program: ProgramConfig,
        mut ledger: LedgerConfig,
        file: Option<(FileConfig, &Path)>,
        state_dir_flag: Option<&Path>,
    ) -> Self {
        let mut state_dir = PathBuf::from(DEFAULT_STATE_DIR);
        if let Some((file, path)) = file {
            if let Some(id) = file.program_id {
                program.program_id = id;
            }
            if let Some(rent) = file.account_rent {
                ledger.account_rent = rent;
            }
            if let Some(dir) = file.state_dir {
                let base = path.parent().unwrap_or_else(|| Path::new("."));
                state_dir = if dir.is_absolute() { dir } else { base.join(dir) };
            }
        }
        if let Some(dir) = state_dir_flag {
            state_dir = dir.to_path_buf();
        }
        Self {
            program,
            ledger,
            state_dir,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_file_or_flag() {
        let s = Settings::layer(
            ProgramConfig::default(),
            LedgerConfig::default(),
            None,
            None,
        );
        assert_eq!(s.state_dir, PathBuf::from(DEFAULT_STATE_DIR));
        assert_eq!(s.program, ProgramConfig::default());
    }

    #[test]
    fn file_overrides_env_and_flag_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("solpay.yaml");
        let id = Address::new([5; 32]);
        std::fs::write(
            &path,
            format!(
                "program_id: {}\naccount_rent: 10\nstate_dir: state\n",
                id.to_hex()
            ),
        )
        .unwrap();
        let file = FileConfig::load(&path).unwrap();
        let s = Settings::layer(
            ProgramConfig::default(),
            LedgerConfig::default(),
            Some((file.clone(), &path)),
            None,
        );
        assert_eq!(s.program.program_id, id);
        assert_eq!(s.ledger.account_rent, 10);
        assert_eq!(s.state_dir, dir.path().join("state"));

        let flagged = Settings::layer(
            ProgramConfig::default(),
            LedgerConfig::default(),
            Some((file, &path)),
            Some(Path::new("/tmp/override")),
        );
        assert_eq!(flagged.state_dir, PathBuf::from("/tmp/override"));
    }

    #[test]
    fn unknown_keys_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, "rent: 5\n").unwrap();
        assert!(FileConfig::load(&path).is_err());
    }

    #[test]
    fn bad_program_id_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, "program_id: nothex\n").unwrap();
        let err = FileConfig::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("invalid address"));
    }
}
