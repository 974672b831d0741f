//! # Ledger Subcommand
//!
//! Administrative access to the local ledger: register mints, fund
//! wallets with lamports, issue tokens, and read balances.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use solpay_core::Address;
use solpay_crypto::Keypair;
use solpay_ledger::{associated_account_address, Instruction, TokenLedger, Transaction};

use crate::config::Settings;
use crate::keygen::load_keypair;
use crate::workspace::Workspace;

/// Arguments for `solpay ledger`.
#[derive(Args, Debug)]
pub struct LedgerArgs {
    #[command(subcommand)]
    pub command: LedgerCommand,
}

/// Ledger subcommands.
#[derive(Subcommand, Debug)]
pub enum LedgerCommand {
    /// Register a new mint controlled by the given key.
    CreateMint {
        /// Mint authority key file.
        #[arg(long)]
        authority: PathBuf,
        /// Display precision.
        #[arg(long, default_value_t = 6)]
        decimals: u8,
    },
    /// Credit a wallet with lamports for rent.
    Airdrop {
        /// Wallet address.
        #[arg(long)]
        to: Address,
        /// Lamports to credit.
        #[arg(long)]
        lamports: u64,
    },
    /// Issue tokens into the owner's associated account, creating it if
    /// needed. The mint authority pays the account rent.
    MintTo {
        /// Mint address.
        #[arg(long)]
        mint: Address,
        /// Mint authority key file.
        #[arg(long)]
        authority: PathBuf,
        /// Owner of the receiving account.
        #[arg(long)]
        owner: Address,
        /// Units to issue.
        #[arg(long)]
        amount: u64,
    },
    /// Show a token account's balance, or a wallet's lamports.
    Balance {
        /// Token account or wallet address.
        #[arg(long)]
        account: Address,
    },
    /// Print the associated token account of an owner for a mint.
    Associated {
        /// Owner address.
        #[arg(long)]
        owner: Address,
        /// Mint address.
        #[arg(long)]
        mint: Address,
    },
}

/// Execute the ledger subcommand.
pub fn run_ledger(args: &LedgerArgs, settings: &Settings) -> Result<u8> {
    let ws = Workspace::load(settings)?;
    match &args.command {
        LedgerCommand::CreateMint {
            authority,
            decimals,
        } => {
            let authority = load_keypair(authority)?;
            let mint_address = Keypair::generate().address();
            let mint = ws
                .ledger()
                .create_mint(mint_address, authority.address(), *decimals)?;
            ws.save()?;
            println!("OK: created mint {}", mint.address);
            println!("  Authority: {}", mint.authority);
            println!("  Decimals: {}", mint.decimals);
        }
        LedgerCommand::Airdrop { to, lamports } => {
            let balance = ws.ledger().airdrop(to, *lamports)?;
            ws.save()?;
            println!("OK: airdropped {lamports} lamports to {to}");
            println!("  Balance: {balance}");
        }
        LedgerCommand::MintTo {
            mint,
            authority,
            owner,
            amount,
        } => {
            let authority = load_keypair(authority)?;
            let destination = associated_account_address(owner, mint)?;
            ws.ledger()
                .execute(&Transaction::new().with(Instruction::CreateAccountIdempotent {
                    address: destination,
                    mint: *mint,
                    owner: *owner,
                    payer: authority.address(),
                }))
                .context("failed to provision destination account")?;
            ws.ledger()
                .mint_to(mint, &authority.address(), &destination, *amount)?;
            ws.save()?;
            println!("OK: minted {amount} to {destination}");
        }
        LedgerCommand::Balance { account } => match ws.ledger().account(account) {
            Some(acct) => {
                println!("Token account: {}", acct.address);
                println!("  Mint: {}", acct.mint);
                println!("  Owner: {}", acct.owner);
                println!("  Amount: {}", acct.amount);
                println!("  Rent: {}", acct.lamports);
            }
            None => {
                println!("Wallet: {account}");
                println!("  Lamports: {}", ws.ledger().lamports(account));
                for acct in ws.ledger().accounts_by_owner(account) {
                    println!("  {} ({}): {}", acct.address, acct.mint, acct.amount);
                }
            }
        },
        LedgerCommand::Associated { owner, mint } => {
            println!("{}", associated_account_address(owner, mint)?);
        }
    }
    Ok(0)
}
