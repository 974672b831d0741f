//! # Instructions and Transactions

use solpay_core::Address;
use solpay_crypto::ProgramSigner;

/// Who is authorizing a debit or close.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authority {
    /// A wallet that has already authenticated the request. The address
    /// must be a curve point; derived addresses cannot act as wallets.
    Wallet(Address),
    /// A program acting for one of its derived addresses.
    Program(ProgramSigner),
}

/// One ledger mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// Create an empty token account. Fails if anything lives at `address`.
    CreateAccount {
        /// New account address.
        address: Address,
        /// Asset it will hold.
        mint: Address,
        /// Controlling party.
        owner: Address,
        /// Wallet paying the rent deposit.
        payer: Address,
    },
    /// Create the account unless it already exists with the same mint and
    /// owner. An existing account with a different mint or owner fails.
    CreateAccountIdempotent {
        /// Account address.
        address: Address,
        /// Asset it holds.
        mint: Address,
        /// Controlling party.
        owner: Address,
        /// Wallet paying the rent deposit if creation happens.
        payer: Address,
    },
    /// Move tokens between two accounts of the same mint.
    Transfer {
        /// Debited account.
        source: Address,
        /// Credited account.
        destination: Address,
        /// Units moved.
        amount: u64,
        /// Must match the owner of `source`.
        authority: Authority,
    },
    /// Delete an empty account and release its rent to a wallet.
    CloseAccount {
        /// Account to close.
        account: Address,
        /// Wallet credited with the rent deposit.
        rent_destination: Address,
        /// Must match the owner of `account`.
        authority: Authority,
    },
}

/// An ordered batch of instructions applied all-or-nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transaction {
    invoker: Option<Address>,
    instructions: Vec<Instruction>,
}

impl Transaction {
    /// A transaction submitted directly by wallets.
    pub fn new() -> Self {
        Self::default()
    }

    /// A transaction submitted by a program. [`Authority::Program`] signers
    /// are accepted only when their program id equals `program_id`.
    pub fn invoked_by(program_id: Address) -> Self {
        Self {
            invoker: Some(program_id),
            instructions: Vec::new(),
        }
    }

    /// Append an instruction.
    pub fn with(mut self, instruction: Instruction) -> Self {
        self.instructions.push(instruction);
        self
    }

    /// Append an instruction in place.
    pub fn push(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    /// The invoking program, if any.
    pub fn invoker(&self) -> Option<&Address> {
        self.invoker.as_ref()
    }

    /// Instructions in execution order.
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Number of instructions.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// True if the transaction carries no instructions.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}
