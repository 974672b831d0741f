//! # Escrow State Machine
//!
//! [`EscrowProgram`] validates signed commands against the record and the
//! ledger, then moves funds and advances the stage.
//!
//! ## Security Invariant
//!
//! For one instance, the stage check, the ledger transaction, and the stage
//! write all happen while holding that instance's slot lock. The ledger
//! transaction is all-or-nothing and the record is only written after it
//! commits, so no caller ever observes funds moved without the matching
//! stage, or the reverse. A Complete racing a Cancel serializes on the lock
//! and the second one sees a terminal stage.
//!
//! Settlement pays out the recorded amount, never the live vault balance.
//! Anything else found in the vault goes back to the sender before the
//! vault closes.

use std::sync::Arc;

use serde::Serialize;
use solpay_core::{Address, ContentDigest};
use solpay_ledger::{
    associated_account_address, Authority, Instruction, LedgerError, TokenAccount, TokenLedger,
    Transaction,
};

use crate::address::{EscrowAddresses, EscrowKey};
use crate::command::{CancelEscrow, Command, CompleteEscrow, OpenEscrow, SignedCommand};
use crate::config::ProgramConfig;
use crate::error::EscrowError;
use crate::state::{EscrowStateRecord, Stage};
use crate::store::{RecordStore, Slot};

/// A record together with its vault balance, read under the instance lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EscrowView {
    /// The state record.
    pub record: EscrowStateRecord,
    /// Vault balance, or `None` once the vault is closed.
    pub vault_balance: Option<u64>,
}

/// The escrow program bound to one ledger.
#[derive(Debug)]
pub struct EscrowProgram<L> {
    config: ProgramConfig,
    ledger: Arc<L>,
    records: RecordStore,
}

impl<L: TokenLedger> EscrowProgram<L> {
    /// Create a program with no records.
    pub fn new(config: ProgramConfig, ledger: Arc<L>) -> Self {
        Self::with_records(config, ledger, RecordStore::new())
    }

    /// Create a program over existing records.
    pub fn with_records(config: ProgramConfig, ledger: Arc<L>, records: RecordStore) -> Self {
        Self {
            config,
            ledger,
            records,
        }
    }

    /// Create a program configured from the environment.
    pub fn from_env(ledger: Arc<L>) -> Result<Self, EscrowError> {
        Ok(Self::new(ProgramConfig::from_env()?, ledger))
    }

    /// Namespace of every derived address.
    pub fn program_id(&self) -> &Address {
        &self.config.program_id
    }

    /// The underlying ledger.
    pub fn ledger(&self) -> &Arc<L> {
        &self.ledger
    }

    /// The record store.
    pub fn records(&self) -> &RecordStore {
        &self.records
    }

    /// Derive the state and vault addresses of an instance.
    pub fn derive(&self, key: &EscrowKey) -> Result<EscrowAddresses, EscrowError> {
        EscrowAddresses::derive(key, self.program_id())
    }

    /// Lock funds from the sender's source account into a fresh vault.
    ///
    /// Signed by the sender. The sender also pays the vault's rent.
    pub fn open(
        &self,
        command: &SignedCommand<OpenEscrow>,
    ) -> Result<EscrowStateRecord, EscrowError> {
        observe(OpenEscrow::KIND, self.open_inner(command))
    }

    /// Release the vault to the recipient. Signed by the recipient.
    pub fn complete(&self, command: &SignedCommand<CompleteEscrow>) -> Result<(), EscrowError> {
        let destination = command.command.destination;
        observe(
            CompleteEscrow::KIND,
            self.settle(command, &destination, Stage::Completed),
        )
    }

    /// Return the vault to the sender. Signed by the sender.
    pub fn cancel(&self, command: &SignedCommand<CancelEscrow>) -> Result<(), EscrowError> {
        let destination = command.command.destination;
        observe(
            CancelEscrow::KIND,
            self.settle(command, &destination, Stage::Cancelled),
        )
    }

    /// The record of an instance, open or settled.
    pub fn get_state(&self, key: &EscrowKey) -> Result<EscrowStateRecord, EscrowError> {
        let addresses = self.derive(key)?;
        self.records
            .get(&addresses.state.address)
            .ok_or(EscrowError::RecordNotFound {
                state_address: addresses.state.address,
            })
    }

    /// The record and vault balance, read together under the instance lock.
    pub fn inspect(&self, key: &EscrowKey) -> Result<EscrowView, EscrowError> {
        let addresses = self.derive(key)?;
        let not_found = || EscrowError::RecordNotFound {
            state_address: addresses.state.address,
        };
        let slot = self.records.existing(&addresses.state.address).ok_or_else(not_found)?;
        let guard = slot.lock();
        let record = guard.as_ref().ok_or_else(not_found)?.clone();
        let vault_balance = self
            .ledger
            .account(record.vault_address())
            .map(|vault| vault.amount);
        Ok(EscrowView {
            record,
            vault_balance,
        })
    }

    // ── Open ─────────────────────────────────────────────────────────

    fn open_inner(
        &self,
        command: &SignedCommand<OpenEscrow>,
    ) -> Result<EscrowStateRecord, EscrowError> {
        let digest = command.verify(self.program_id())?;
        let OpenEscrow {
            key,
            amount,
            source,
        } = &command.command;
        if *amount == 0 {
            return Err(EscrowError::InvalidAmount { amount: *amount });
        }
        let addresses = self.derive(key)?;
        let state_address = addresses.state.address;
        if command.signer != key.sender {
            return Err(EscrowError::NotAuthorized {
                state_address,
                operation: OpenEscrow::KIND,
                caller: command.signer,
                expected: key.sender,
            });
        }

        let slot = self.records.slot(&state_address);
        let result = self.open_locked(&slot, &addresses, *amount, source, digest);
        drop(slot);
        if result.is_err() {
            self.records.discard_if_empty(&state_address);
        }
        result
    }

    fn open_locked(
        &self,
        slot: &Slot,
        addresses: &EscrowAddresses,
        amount: u64,
        source: &Address,
        digest: ContentDigest,
    ) -> Result<EscrowStateRecord, EscrowError> {
        let mut guard = slot.lock();
        let key = &addresses.key;
        let state_address = addresses.state.address;
        if guard.is_some() {
            return Err(EscrowError::DuplicateInstance { state_address });
        }
        if self.ledger.mint(&key.asset).is_none() {
            return Err(LedgerError::MintNotFound(key.asset).into());
        }
        let source_account = self
            .ledger
            .account(source)
            .ok_or_else(|| EscrowError::AccountMismatch {
                account: *source,
                reason: "source account does not exist".to_string(),
            })?;
        check_account(&source_account, &key.sender, &key.asset)?;
        if source_account.amount < amount {
            return Err(EscrowError::InsufficientFunds {
                account: *source,
                requested: amount,
                available: source_account.amount,
            });
        }

        let tx = Transaction::invoked_by(*self.program_id())
            .with(Instruction::CreateAccount {
                address: addresses.vault.address,
                mint: key.asset,
                owner: state_address,
                payer: key.sender,
            })
            .with(Instruction::Transfer {
                source: *source,
                destination: addresses.vault.address,
                amount,
                authority: Authority::Wallet(key.sender),
            });
        self.ledger
            .execute(&tx)
            .map_err(|e| map_ledger_error(e, addresses))?;

        let record = EscrowStateRecord::initialized(addresses, amount, digest);
        *guard = Some(record.clone());
        tracing::info!(
            state = %state_address,
            vault = %addresses.vault.address,
            instance_id = %key.instance_id,
            amount,
            "escrow opened"
        );
        Ok(record)
    }

    // ── Complete / Cancel ────────────────────────────────────────────

    fn settle<C: Command>(
        &self,
        command: &SignedCommand<C>,
        destination: &Address,
        to: Stage,
    ) -> Result<(), EscrowError> {
        let digest = command.verify(self.program_id())?;
        let addresses = self.derive(command.command.key())?;
        let state_address = addresses.state.address;
        let not_found = || EscrowError::RecordNotFound { state_address };

        let slot = self.records.existing(&state_address).ok_or_else(not_found)?;
        let mut guard = slot.lock();
        let record = guard.as_mut().ok_or_else(not_found)?;

        let beneficiary = match to {
            Stage::Completed => *record.recipient(),
            Stage::Cancelled => *record.sender(),
            Stage::Initialized => {
                return Err(EscrowError::WrongStage {
                    state_address,
                    operation: C::KIND,
                    stage: record.stage(),
                })
            }
        };
        if command.signer != beneficiary {
            return Err(EscrowError::NotAuthorized {
                state_address,
                operation: C::KIND,
                caller: command.signer,
                expected: beneficiary,
            });
        }
        let mut settled = record.clone();
        settled.settle(to, C::KIND, command.signer, digest)?;

        let vault = self
            .ledger
            .account(record.vault_address())
            .ok_or_else(|| EscrowError::CorruptRecord {
                reason: format!("vault {} missing for open escrow", record.vault_address()),
            })?;
        let amount = record.amount();
        let surplus = vault
            .amount
            .checked_sub(amount)
            .ok_or_else(|| EscrowError::CorruptRecord {
                reason: format!(
                    "vault {} holds {}, less than the escrowed {amount}",
                    vault.address, vault.amount
                ),
            })?;
        let sender = *record.sender();
        let signer = Authority::Program(addresses.state_signer(self.program_id()));
        let mut tx = Transaction::invoked_by(*self.program_id());
        self.provision_destination(&mut tx, destination, &beneficiary, record.asset())?;
        tx.push(Instruction::Transfer {
            source: vault.address,
            destination: *destination,
            amount,
            authority: signer.clone(),
        });
        if surplus > 0 {
            // Deposits beyond the escrowed amount belong to the sender.
            let refund = if beneficiary == sender {
                *destination
            } else {
                let refund = associated_account_address(&sender, record.asset())?;
                self.provision_destination(&mut tx, &refund, &sender, record.asset())?;
                refund
            };
            tx.push(Instruction::Transfer {
                source: vault.address,
                destination: refund,
                amount: surplus,
                authority: signer.clone(),
            });
            tracing::debug!(vault = %vault.address, refund = %refund, surplus, "returning vault surplus");
        }
        tx.push(Instruction::CloseAccount {
            account: vault.address,
            rent_destination: sender,
            authority: signer,
        });
        self.ledger
            .execute(&tx)
            .map_err(|e| map_ledger_error(e, &addresses))?;

        *record = settled;
        tracing::info!(
            state = %state_address,
            destination = %destination,
            amount,
            surplus,
            stage = %to,
            "escrow settled"
        );
        Ok(())
    }

    /// Require `destination` to be `owner`'s account for `asset`, queueing
    /// its creation when it is the owner's associated account and absent.
    fn provision_destination(
        &self,
        tx: &mut Transaction,
        destination: &Address,
        owner: &Address,
        asset: &Address,
    ) -> Result<(), EscrowError> {
        if let Some(existing) = self.ledger.account(destination) {
            return check_account(&existing, owner, asset);
        }
        if *destination != associated_account_address(owner, asset)? {
            return Err(EscrowError::AccountMismatch {
                account: *destination,
                reason: format!(
                    "destination does not exist and is not the associated account of {owner}"
                ),
            });
        }
        tx.push(Instruction::CreateAccountIdempotent {
            address: *destination,
            mint: *asset,
            owner: *owner,
            payer: *owner,
        });
        tracing::debug!(destination = %destination, owner = %owner, "provisioning destination");
        Ok(())
    }
}

fn check_account(
    account: &TokenAccount,
    owner: &Address,
    asset: &Address,
) -> Result<(), EscrowError> {
    if account.owner != *owner {
        return Err(EscrowError::AccountMismatch {
            account: account.address,
            reason: format!("owned by {}, expected {owner}", account.owner),
        });
    }
    if account.mint != *asset {
        return Err(EscrowError::AccountMismatch {
            account: account.address,
            reason: format!("holds mint {}, expected {asset}", account.mint),
        });
    }
    Ok(())
}

fn map_ledger_error(err: LedgerError, addresses: &EscrowAddresses) -> EscrowError {
    match err {
        LedgerError::InsufficientFunds {
            account,
            requested,
            available,
        } => EscrowError::InsufficientFunds {
            account,
            requested,
            available,
        },
        LedgerError::InsufficientLamports {
            payer,
            requested,
            available,
        } => EscrowError::InsufficientFunds {
            account: payer,
            requested,
            available,
        },
        LedgerError::AccountExists(address) if address == addresses.vault.address => {
            EscrowError::DuplicateInstance {
                state_address: addresses.state.address,
            }
        }
        other => EscrowError::Ledger(other),
    }
}

fn observe<T>(operation: &'static str, result: Result<T, EscrowError>) -> Result<T, EscrowError> {
    if let Err(err) = &result {
        tracing::warn!(operation, kind = err.kind(), error = %err, "escrow command rejected");
    }
    result
}
