//! Shared setup: a ledger with one mint, a funded sender, and a recipient
//! with lamports but no token account.

#![allow(dead_code)]

use std::sync::Arc;

use solpay_core::{Address, InstanceId};
use solpay_crypto::Keypair;
use solpay_escrow::{
    CancelEscrow, CompleteEscrow, EscrowError, EscrowKey, EscrowProgram, EscrowStateRecord,
    OpenEscrow, ProgramConfig, SignedCommand,
};
use solpay_ledger::{
    associated_account_address, Authority, InMemoryLedger, Instruction, LedgerConfig,
    LedgerError, TokenLedger, Transaction,
};

pub const RENT: u64 = 2_039_280;
pub const STARTING_BALANCE: u64 = 1_337_000_000;
pub const ESCROW_AMOUNT: u64 = 20_000_000;

pub fn mint_authority() -> Keypair {
    Keypair::from_seed(&[1; 32])
}

pub struct World {
    pub program: EscrowProgram<InMemoryLedger>,
    pub sender: Keypair,
    pub recipient: Keypair,
    pub mint: Address,
}

impl World {
    pub fn new() -> Self {
        Self::with_balance(STARTING_BALANCE)
    }

    pub fn with_balance(balance: u64) -> Self {
        let ledger = Arc::new(InMemoryLedger::new(LedgerConfig { account_rent: RENT }));
        let authority = mint_authority();
        let mint = Keypair::from_seed(&[2; 32]).address();
        ledger
            .create_mint(mint, authority.address(), 6)
            .expect("create mint");
        let sender = Keypair::generate();
        let recipient = Keypair::generate();
        ledger
            .airdrop(&sender.address(), 1_000 * RENT)
            .expect("fund sender");
        ledger
            .airdrop(&recipient.address(), 1_000 * RENT)
            .expect("fund recipient");
        let source = associated_account_address(&sender.address(), &mint).expect("derive ata");
        ledger
            .execute(&Transaction::new().with(Instruction::CreateAccount {
                address: source,
                mint,
                owner: sender.address(),
                payer: sender.address(),
            }))
            .expect("create source account");
        if balance > 0 {
            ledger
                .mint_to(&mint, &authority.address(), &source, balance)
                .expect("mint starting balance");
        }
        Self {
            program: EscrowProgram::new(ProgramConfig::default(), ledger),
            sender,
            recipient,
            mint,
        }
    }

    pub fn key(&self, id: u64) -> EscrowKey {
        EscrowKey::new(
            self.sender.address(),
            self.recipient.address(),
            self.mint,
            InstanceId::new(id),
        )
    }

    pub fn sender_account(&self) -> Address {
        associated_account_address(&self.sender.address(), &self.mint).expect("derive ata")
    }

    pub fn recipient_account(&self) -> Address {
        associated_account_address(&self.recipient.address(), &self.mint).expect("derive ata")
    }

    pub fn open(&self, id: u64, amount: u64) -> Result<EscrowStateRecord, EscrowError> {
        let cmd = OpenEscrow {
            key: self.key(id),
            amount,
            source: self.sender_account(),
        };
        let signed =
            SignedCommand::sign(cmd, self.program.program_id(), &self.sender).expect("sign open");
        self.program.open(&signed)
    }

    pub fn complete_by(&self, signer: &Keypair, id: u64) -> Result<(), EscrowError> {
        let cmd = CompleteEscrow {
            key: self.key(id),
            destination: self.recipient_account(),
        };
        let signed =
            SignedCommand::sign(cmd, self.program.program_id(), signer).expect("sign complete");
        self.program.complete(&signed)
    }

    pub fn cancel_by(&self, signer: &Keypair, id: u64) -> Result<(), EscrowError> {
        let cmd = CancelEscrow {
            key: self.key(id),
            destination: self.sender_account(),
        };
        let signed =
            SignedCommand::sign(cmd, self.program.program_id(), signer).expect("sign cancel");
        self.program.cancel(&signed)
    }

    pub fn complete(&self, id: u64) -> Result<(), EscrowError> {
        self.complete_by(&self.recipient, id)
    }

    pub fn cancel(&self, id: u64) -> Result<(), EscrowError> {
        self.cancel_by(&self.sender, id)
    }

    /// Sends tokens from the sender's account straight into the vault of
    /// instance `id`, bypassing the program.
    pub fn deposit_into_vault(&self, id: u64, amount: u64) -> Result<(), LedgerError> {
        let vault = self.program.derive(&self.key(id)).expect("derive").vault.address;
        self.program
            .ledger()
            .execute(&Transaction::new().with(Instruction::Transfer {
                source: self.sender_account(),
                destination: vault,
                amount,
                authority: Authority::Wallet(self.sender.address()),
            }))
    }

    pub fn vault_balance(&self, id: u64) -> u64 {
        let vault = self.program.derive(&self.key(id)).expect("derive").vault.address;
        self.balance(&vault)
    }

    /// Token balance, zero for an absent account.
    pub fn balance(&self, account: &Address) -> u64 {
        self.program
            .ledger()
            .account(account)
            .map(|a| a.amount)
            .unwrap_or_default()
    }

    /// Sender + recipient + every open vault.
    pub fn tokens_in_play(&self) -> u128 {
        self.program.ledger().circulating(&self.mint)
    }
}
