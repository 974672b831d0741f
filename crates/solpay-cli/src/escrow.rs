//! # Escrow Subcommand
//!
//! Signs commands with local key files and applies them to the workspace.
//! Destinations default to the beneficiary's associated token account,
//! which the program creates on demand.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use solpay_core::{Address, InstanceId};
use solpay_escrow::{
    CancelEscrow, CompleteEscrow, EscrowKey, EscrowProgram, OpenEscrow, SignedCommand,
};
use solpay_ledger::{associated_account_address, InMemoryLedger, TokenLedger};

use crate::config::Settings;
use crate::keygen::load_keypair;
use crate::workspace::Workspace;

/// Arguments for `solpay escrow`.
#[derive(Args, Debug)]
pub struct EscrowArgs {
    #[command(subcommand)]
    pub command: EscrowCommand,
}

/// Identifies an instance when the caller's own key is not involved.
#[derive(Args, Debug, Clone)]
pub struct InstanceArgs {
    /// Sender address.
    #[arg(long)]
    pub sender: Address,
    /// Recipient address.
    #[arg(long)]
    pub recipient: Address,
    /// Mint of the escrowed asset.
    #[arg(long)]
    pub mint: Address,
    /// Instance id.
    #[arg(long)]
    pub id: InstanceId,
}

impl InstanceArgs {
    fn key(&self) -> EscrowKey {
        EscrowKey::new(self.sender, self.recipient, self.mint, self.id)
    }
}

/// Escrow subcommands.
#[derive(Subcommand, Debug)]
pub enum EscrowCommand {
    /// Print the state and vault addresses of an instance.
    Derive(InstanceArgs),
    /// Lock tokens from the sender into a new vault.
    Open {
        /// Sender key file.
        #[arg(long)]
        sender_key: PathBuf,
        /// Recipient address.
        #[arg(long)]
        recipient: Address,
        /// Mint of the escrowed asset.
        #[arg(long)]
        mint: Address,
        /// Instance id. Defaults to the current Unix time.
        #[arg(long)]
        id: Option<InstanceId>,
        /// Units to lock.
        #[arg(long)]
        amount: u64,
        /// Source token account. Defaults to the sender's associated account.
        #[arg(long)]
        source: Option<Address>,
    },
    /// Release the vault to the recipient.
    Complete {
        /// Recipient key file.
        #[arg(long)]
        recipient_key: PathBuf,
        /// Sender address.
        #[arg(long)]
        sender: Address,
        /// Mint of the escrowed asset.
        #[arg(long)]
        mint: Address,
        /// Instance id.
        #[arg(long)]
        id: InstanceId,
        /// Destination token account. Defaults to the recipient's
        /// associated account.
        #[arg(long)]
        destination: Option<Address>,
    },
    /// Return the vault to the sender.
    Cancel {
        /// Sender key file.
        #[arg(long)]
        sender_key: PathBuf,
        /// Recipient address.
        #[arg(long)]
        recipient: Address,
        /// Mint of the escrowed asset.
        #[arg(long)]
        mint: Address,
        /// Instance id.
        #[arg(long)]
        id: InstanceId,
        /// Destination token account. Defaults to the sender's associated
        /// account.
        #[arg(long)]
        destination: Option<Address>,
    },
    /// Show the record, vault balance, and transition log of an instance.
    Status {
        #[command(flatten)]
        instance: InstanceArgs,
        /// Print the full view as JSON.
        #[arg(long)]
        json: bool,
    },
}

/// Execute the escrow subcommand.
pub fn run_escrow(args: &EscrowArgs, settings: &Settings) -> Result<u8> {
    let ws = Workspace::load(settings)?;
    let program = ws.program();
    match &args.command {
        EscrowCommand::Derive(instance) => {
            let addresses = program.derive(&instance.key())?;
            println!("Program: {}", program.program_id());
            println!(
                "  State: {} (bump {})",
                addresses.state.address, addresses.state.bump
            );
            println!(
                "  Vault: {} (bump {})",
                addresses.vault.address, addresses.vault.bump
            );
        }
        EscrowCommand::Open {
            sender_key,
            recipient,
            mint,
            id,
            amount,
            source,
        } => {
            let sender = load_keypair(sender_key)?;
            let id = id.unwrap_or_else(InstanceId::from_unix_time);
            let key = EscrowKey::new(sender.address(), *recipient, *mint, id);
            let source = match source {
                Some(source) => *source,
                None => associated_account_address(&sender.address(), mint)?,
            };
            let command = OpenEscrow {
                key,
                amount: *amount,
                source,
            };
            let signed = SignedCommand::sign(command, program.program_id(), &sender)?;
            let record = program.open(&signed).context("open rejected")?;
            ws.save()?;
            println!("OK: opened escrow {}", record.instance_id());
            println!("  State: {}", record.state_address());
            println!("  Vault: {}", record.vault_address());
            println!("  Amount: {}", record.amount());
        }
        EscrowCommand::Complete {
            recipient_key,
            sender,
            mint,
            id,
            destination,
        } => {
            let recipient = load_keypair(recipient_key)?;
            let key = EscrowKey::new(*sender, recipient.address(), *mint, *id);
            let destination = default_destination(destination, &recipient.address(), mint)?;
            let signed = SignedCommand::sign(
                CompleteEscrow { key, destination },
                program.program_id(),
                &recipient,
            )?;
            program.complete(&signed).context("complete rejected")?;
            ws.save()?;
            println!("OK: completed escrow {id}");
            print_settlement(program, &key, &destination)?;
        }
        EscrowCommand::Cancel {
            sender_key,
            recipient,
            mint,
            id,
            destination,
        } => {
            let sender = load_keypair(sender_key)?;
            let key = EscrowKey::new(sender.address(), *recipient, *mint, *id);
            let destination = default_destination(destination, &sender.address(), mint)?;
            let signed = SignedCommand::sign(
                CancelEscrow { key, destination },
                program.program_id(),
                &sender,
            )?;
            program.cancel(&signed).context("cancel rejected")?;
            ws.save()?;
            println!("OK: cancelled escrow {id}");
            print_settlement(program, &key, &destination)?;
        }
        EscrowCommand::Status { instance, json } => {
            let view = program.inspect(&instance.key())?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&view)?);
                return Ok(0);
            }
            let record = &view.record;
            println!("Escrow {}", record.instance_id());
            println!("  Stage: {}", record.stage());
            println!("  Sender: {}", record.sender());
            println!("  Recipient: {}", record.recipient());
            println!("  Asset: {}", record.asset());
            println!("  Amount: {}", record.amount());
            println!("  State: {}", record.state_address());
            match view.vault_balance {
                Some(balance) => println!("  Vault: {} ({balance})", record.vault_address()),
                None => println!("  Vault: {} (closed)", record.vault_address()),
            }
            for t in record.transitions() {
                let from = t.from_stage.map_or("-", |s| s.as_str());
                println!(
                    "  {} {from} -> {} by {} [{}]",
                    t.timestamp, t.to_stage, t.actor, t.command_digest
                );
            }
        }
    }
    Ok(0)
}

fn default_destination(
    destination: &Option<Address>,
    beneficiary: &Address,
    mint: &Address,
) -> Result<Address> {
    match destination {
        Some(d) => Ok(*d),
        None => Ok(associated_account_address(beneficiary, mint)?),
    }
}

fn print_settlement(
    program: &EscrowProgram<InMemoryLedger>,
    key: &EscrowKey,
    destination: &Address,
) -> Result<()> {
    let record = program.get_state(key)?;
    let balance = program
        .ledger()
        .account(destination)
        .map(|a| a.amount)
        .unwrap_or_default();
    println!("  Stage: {}", record.stage());
    println!("  Destination: {destination} ({balance})");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keygen::{run_keygen, KeygenArgs};
    use crate::ledger::{run_ledger, LedgerArgs, LedgerCommand};
    use solpay_escrow::{ProgramConfig, Stage};
    use solpay_ledger::LedgerConfig;

    const RENT: u64 = 2_039_280;

    struct Fixture {
        _dir: tempfile::TempDir,
        settings: Settings,
        alice_key: PathBuf,
        alice: Address,
        bob_key: PathBuf,
        bob: Address,
        mint: Address,
    }

    fn keygen(dir: &std::path::Path, name: &str) -> (PathBuf, Address) {
        run_keygen(&KeygenArgs {
            output: dir.to_path_buf(),
            name: name.to_string(),
        })
        .unwrap();
        let key = dir.join(format!("{name}.key"));
        let address = load_keypair(&key).unwrap().address();
        (key, address)
    }

    fn ledger(settings: &Settings, command: LedgerCommand) {
        run_ledger(&LedgerArgs { command }, settings).unwrap();
    }

    fn escrow(settings: &Settings, command: EscrowCommand) -> Result<u8> {
        run_escrow(&EscrowArgs { command }, settings)
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            program: ProgramConfig::default(),
            ledger: LedgerConfig { account_rent: RENT },
            state_dir: dir.path().join("state"),
        };
        let (alice_key, alice) = keygen(dir.path(), "alice");
        let (bob_key, bob) = keygen(dir.path(), "bob");
        for wallet in [alice, bob] {
            ledger(
                &settings,
                LedgerCommand::Airdrop {
                    to: wallet,
                    lamports: 10 * RENT,
                },
            );
        }
        ledger(
            &settings,
            LedgerCommand::CreateMint {
                authority: alice_key.clone(),
                decimals: 6,
            },
        );
        let mint = *Workspace::load(&settings)
            .unwrap()
            .ledger()
            .snapshot()
            .mints
            .keys()
            .next()
            .unwrap();
        ledger(
            &settings,
            LedgerCommand::MintTo {
                mint,
                authority: alice_key.clone(),
                owner: alice,
                amount: 1_337_000_000,
            },
        );
        Fixture {
            _dir: dir,
            settings,
            alice_key,
            alice,
            bob_key,
            bob,
            mint,
        }
    }

    fn open(f: &Fixture, id: u64) -> Result<u8> {
        escrow(
            &f.settings,
            EscrowCommand::Open {
                sender_key: f.alice_key.clone(),
                recipient: f.bob,
                mint: f.mint,
                id: Some(InstanceId::new(id)),
                amount: 20_000_000,
                source: None,
            },
        )
    }

    fn key(f: &Fixture, id: u64) -> EscrowKey {
        EscrowKey::new(f.alice, f.bob, f.mint, InstanceId::new(id))
    }

    #[test]
    fn open_then_complete_pays_recipient() {
        let f = fixture();
        open(&f, 1).unwrap();
        escrow(
            &f.settings,
            EscrowCommand::Complete {
                recipient_key: f.bob_key.clone(),
                sender: f.alice,
                mint: f.mint,
                id: InstanceId::new(1),
                destination: None,
            },
        )
        .unwrap();

        let ws = Workspace::load(&f.settings).unwrap();
        let bob_ata = associated_account_address(&f.bob, &f.mint).unwrap();
        assert_eq!(ws.ledger().account(&bob_ata).unwrap().amount, 20_000_000);
        let record = ws.program().get_state(&key(&f, 1)).unwrap();
        assert_eq!(record.stage(), Stage::Completed);
        assert!(ws.ledger().account(record.vault_address()).is_none());
    }

    #[test]
    fn open_then_cancel_refunds_sender() {
        let f = fixture();
        open(&f, 7).unwrap();
        escrow(
            &f.settings,
            EscrowCommand::Cancel {
                sender_key: f.alice_key.clone(),
                recipient: f.bob,
                mint: f.mint,
                id: InstanceId::new(7),
                destination: None,
            },
        )
        .unwrap();

        let ws = Workspace::load(&f.settings).unwrap();
        let alice_ata = associated_account_address(&f.alice, &f.mint).unwrap();
        assert_eq!(ws.ledger().account(&alice_ata).unwrap().amount, 1_337_000_000);
        let instance = InstanceArgs {
            sender: f.alice,
            recipient: f.bob,
            mint: f.mint,
            id: InstanceId::new(7),
        };
        assert_eq!(
            escrow(
                &f.settings,
                EscrowCommand::Status {
                    instance,
                    json: true
                }
            )
            .unwrap(),
            0
        );
    }

    #[test]
    fn wrong_party_cannot_complete() {
        let f = fixture();
        open(&f, 2).unwrap();
        let err = escrow(
            &f.settings,
            EscrowCommand::Complete {
                recipient_key: f.alice_key.clone(),
                sender: f.alice,
                mint: f.mint,
                id: InstanceId::new(2),
                destination: None,
            },
        )
        .unwrap_err();
        // Alice signing as recipient derives a different instance.
        assert!(format!("{err:#}").contains("no escrow record"));

        let ws = Workspace::load(&f.settings).unwrap();
        let record = ws.program().get_state(&key(&f, 2)).unwrap();
        assert_eq!(record.stage(), Stage::Initialized);
    }

    #[test]
    fn duplicate_open_rejected_across_invocations() {
        let f = fixture();
        open(&f, 3).unwrap();
        let err = open(&f, 3).unwrap_err();
        assert!(format!("{err:#}").contains("open rejected"));
    }

    #[test]
    fn status_of_unknown_instance_fails() {
        let f = fixture();
        let instance = InstanceArgs {
            sender: f.alice,
            recipient: f.bob,
            mint: f.mint,
            id: InstanceId::new(99),
        };
        assert!(escrow(
            &f.settings,
            EscrowCommand::Status {
                instance: instance.clone(),
                json: false
            }
        )
        .is_err());
        assert_eq!(
            escrow(&f.settings, EscrowCommand::Derive(instance)).unwrap(),
            0
        );
    }
}
