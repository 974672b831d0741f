//! # Keygen Subcommand
//!
//! Writes `<name>.key` (hex seed) and `<name>.pub` (hex address). The
//! public half is the party's wallet address on the ledger.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use solpay_crypto::Keypair;

/// Arguments for `solpay keygen`.
#[derive(Args, Debug)]
pub struct KeygenArgs {
    /// Output directory for the key files.
    #[arg(long, short, default_value = ".")]
    pub output: PathBuf,
    /// File name stem for the key files.
    #[arg(long, default_value = "solpay")]
    pub name: String,
}

/// Execute the keygen subcommand.
pub fn run_keygen(args: &KeygenArgs) -> Result<u8> {
    let dir = &args.output;
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output directory: {}", dir.display()))?;

    let keypair = Keypair::generate();
    let address = keypair.address().to_hex();
    let key_path = dir.join(format!("{}.key", args.name));
    let pub_path = dir.join(format!("{}.pub", args.name));
    if key_path.exists() {
        bail!("refusing to overwrite existing key: {}", key_path.display());
    }

    std::fs::write(&key_path, keypair.seed_hex())
        .with_context(|| format!("failed to write private key: {}", key_path.display()))?;
    std::fs::write(&pub_path, &address)
        .with_context(|| format!("failed to write public key: {}", pub_path.display()))?;

    println!("OK: generated Ed25519 keypair");
    println!("  Private key: {}", key_path.display());
    println!("  Public key:  {}", pub_path.display());
    println!("  Address: {address}");
    Ok(0)
}

/// Read a key pair from a hex seed file.
pub fn load_keypair(path: &Path) -> Result<Keypair> {
    let hex = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read private key: {}", path.display()))?;
    Keypair::from_seed_hex(&hex)
        .with_context(|| format!("invalid private key: {}", path.display()))
}
