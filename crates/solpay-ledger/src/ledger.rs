//! # Ledger Store
//!
//! [`InMemoryLedger`] keeps all state behind one `parking_lot::RwLock`.
//! Reads take the read lock. [`TokenLedger::execute`] takes the write lock,
//! stages every instruction against an overlay of the current state, and
//! writes the overlay back only if the whole transaction succeeded.

use std::collections::BTreeMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use solpay_core::Address;
use solpay_crypto::is_on_curve;

use crate::account::{Mint, TokenAccount};
use crate::config::LedgerConfig;
use crate::error::LedgerError;
use crate::instruction::{Authority, Instruction, Transaction};

/// The ledger surface the escrow program depends on.
pub trait TokenLedger: Send + Sync {
    /// Look up a token account.
    fn account(&self, address: &Address) -> Option<TokenAccount>;

    /// Look up a mint.
    fn mint(&self, address: &Address) -> Option<Mint>;

    /// Native balance of a wallet.
    fn lamports(&self, wallet: &Address) -> u64;

    /// Rent deposit required per token account.
    fn account_rent(&self) -> u64;

    /// Apply a transaction atomically.
    fn execute(&self, tx: &Transaction) -> Result<(), LedgerError>;
}

/// Serializable image of the full ledger state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    /// Registered mints.
    pub mints: BTreeMap<Address, Mint>,
    /// Open token accounts.
    pub accounts: BTreeMap<Address, TokenAccount>,
    /// Wallet lamport balances. Zero balances are omitted.
    pub lamports: BTreeMap<Address, u64>,
}

/// Thread-safe in-memory ledger.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    config: LedgerConfig,
    state: RwLock<LedgerSnapshot>,
}

impl InMemoryLedger {
    /// Create an empty ledger.
    pub fn new(config: LedgerConfig) -> Self {
        Self {
            config,
            state: RwLock::new(LedgerSnapshot::default()),
        }
    }

    /// Rebuild a ledger from a snapshot.
    pub fn from_snapshot(config: LedgerConfig, snapshot: LedgerSnapshot) -> Self {
        Self {
            config,
            state: RwLock::new(snapshot),
        }
    }

    /// Copy out the current state.
    pub fn snapshot(&self) -> LedgerSnapshot {
        self.state.read().clone()
    }

    /// The ledger configuration.
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Register a new mint with zero supply.
    pub fn create_mint(
        &self,
        address: Address,
        authority: Address,
        decimals: u8,
    ) -> Result<Mint, LedgerError> {
        let mut state = self.state.write();
        if state.mints.contains_key(&address) || state.accounts.contains_key(&address) {
            return Err(LedgerError::AccountExists(address));
        }
        let mint = Mint {
            address,
            authority,
            decimals,
            supply: 0,
        };
        state.mints.insert(address, mint.clone());
        tracing::debug!(mint = %address, decimals, "mint created");
        Ok(mint)
    }

    /// Issue `amount` new units of `mint` into `destination`.
    pub fn mint_to(
        &self,
        mint: &Address,
        authority: &Address,
        destination: &Address,
        amount: u64,
    ) -> Result<(), LedgerError> {
        let mut state = self.state.write();
        let current = state
            .mints
            .get(mint)
            .ok_or(LedgerError::MintNotFound(*mint))?;
        if current.authority != *authority {
            return Err(LedgerError::Unauthorized {
                account: *mint,
                reason: format!("{authority} is not the mint authority"),
            });
        }
        let supply = current
            .supply
            .checked_add(amount)
            .ok_or(LedgerError::Overflow(*mint))?;
        let account = state
            .accounts
            .get(destination)
            .ok_or(LedgerError::AccountNotFound(*destination))?;
        if account.mint != *mint {
            return Err(LedgerError::MintMismatch {
                account: *destination,
                expected: *mint,
                actual: account.mint,
            });
        }
        let balance = account
            .amount
            .checked_add(amount)
            .ok_or(LedgerError::Overflow(*destination))?;

        if let Some(acct) = state.accounts.get_mut(destination) {
            acct.amount = balance;
        }
        if let Some(m) = state.mints.get_mut(mint) {
            m.supply = supply;
        }
        tracing::debug!(mint = %mint, destination = %destination, amount, "minted");
        Ok(())
    }

    /// Credit a wallet with native lamports. Returns the new balance.
    pub fn airdrop(&self, wallet: &Address, lamports: u64) -> Result<u64, LedgerError> {
        let mut state = self.state.write();
        let current = state.lamports.get(wallet).copied().unwrap_or(0);
        let updated = current
            .checked_add(lamports)
            .ok_or(LedgerError::Overflow(*wallet))?;
        if updated > 0 {
            state.lamports.insert(*wallet, updated);
        }
        Ok(updated)
    }

    /// All token accounts controlled by `owner`.
    pub fn accounts_by_owner(&self, owner: &Address) -> Vec<TokenAccount> {
        self.state
            .read()
            .accounts
            .values()
            .filter(|a| a.owner == *owner)
            .cloned()
            .collect()
    }

    /// Sum of all balances of `mint` across open accounts.
    pub fn circulating(&self, mint: &Address) -> u128 {
        self.state
            .read()
            .accounts
            .values()
            .filter(|a| a.mint == *mint)
            .map(|a| u128::from(a.amount))
            .sum()
    }

    /// Lamports held by wallets plus rent held by token accounts.
    pub fn total_lamports(&self) -> u128 {
        let state = self.state.read();
        let wallets: u128 = state.lamports.values().map(|l| u128::from(*l)).sum();
        let deposits: u128 = state.accounts.values().map(|a| u128::from(a.lamports)).sum();
        wallets + deposits
    }
}

impl TokenLedger for InMemoryLedger {
    fn account(&self, address: &Address) -> Option<TokenAccount> {
        self.state.read().accounts.get(address).cloned()
    }

    fn mint(&self, address: &Address) -> Option<Mint> {
        self.state.read().mints.get(address).cloned()
    }

    fn lamports(&self, wallet: &Address) -> u64 {
        self.state.read().lamports.get(wallet).copied().unwrap_or(0)
    }

    fn account_rent(&self) -> u64 {
        self.config.account_rent
    }

    fn execute(&self, tx: &Transaction) -> Result<(), LedgerError> {
        let mut state = self.state.write();
        let changes = {
            let mut staged = Staged::new(&state, self.config.account_rent, tx.invoker());
            for (index, instruction) in tx.instructions().iter().enumerate() {
                staged.apply(instruction).map_err(|e| {
                    tracing::debug!(index, error = %e, "transaction rejected");
                    e
                })?;
            }
            staged.into_changes()
        };
        changes.commit(&mut state);
        tracing::debug!(instructions = tx.len(), "transaction committed");
        Ok(())
    }
}

// ── Staging ──────────────────────────────────────────────────────────

struct Staged<'a> {
    base: &'a LedgerSnapshot,
    rent: u64,
    invoker: Option<&'a Address>,
    accounts: BTreeMap<Address, Option<TokenAccount>>,
    lamports: BTreeMap<Address, u64>,
}

struct Changes {
    accounts: BTreeMap<Address, Option<TokenAccount>>,
    lamports: BTreeMap<Address, u64>,
}

impl Changes {
    fn commit(self, state: &mut LedgerSnapshot) {
        for (address, entry) in self.accounts {
            match entry {
                Some(account) => {
                    state.accounts.insert(address, account);
                }
                None => {
                    state.accounts.remove(&address);
                }
            }
        }
        for (wallet, balance) in self.lamports {
            if balance == 0 {
                state.lamports.remove(&wallet);
            } else {
                state.lamports.insert(wallet, balance);
            }
        }
    }
}

impl<'a> Staged<'a> {
    fn new(base: &'a LedgerSnapshot, rent: u64, invoker: Option<&'a Address>) -> Self {
        Self {
            base,
            rent,
            invoker,
            accounts: BTreeMap::new(),
            lamports: BTreeMap::new(),
        }
    }

    fn into_changes(self) -> Changes {
        Changes {
            accounts: self.accounts,
            lamports: self.lamports,
        }
    }

    fn account(&self, address: &Address) -> Option<TokenAccount> {
        match self.accounts.get(address) {
            Some(staged) => staged.clone(),
            None => self.base.accounts.get(address).cloned(),
        }
    }

    fn require_account(&self, address: &Address) -> Result<TokenAccount, LedgerError> {
        self.account(address)
            .ok_or(LedgerError::AccountNotFound(*address))
    }

    fn lamports(&self, wallet: &Address) -> u64 {
        self.lamports
            .get(wallet)
            .or_else(|| self.base.lamports.get(wallet))
            .copied()
            .unwrap_or(0)
    }

    fn apply(&mut self, instruction: &Instruction) -> Result<(), LedgerError> {
        match instruction {
            Instruction::CreateAccount {
                address,
                mint,
                owner,
                payer,
            } => self.create(*address, *mint, *owner, *payer),
            Instruction::CreateAccountIdempotent {
                address,
                mint,
                owner,
                payer,
            } => match self.account(address) {
                Some(existing) => {
                    if existing.mint != *mint {
                        return Err(LedgerError::MintMismatch {
                            account: *address,
                            expected: *mint,
                            actual: existing.mint,
                        });
                    }
                    if existing.owner != *owner {
                        return Err(LedgerError::OwnerMismatch {
                            account: *address,
                            expected: *owner,
                            actual: existing.owner,
                        });
                    }
                    Ok(())
                }
                None => self.create(*address, *mint, *owner, *payer),
            },
            Instruction::Transfer {
                source,
                destination,
                amount,
                authority,
            } => self.transfer(source, destination, *amount, authority),
            Instruction::CloseAccount {
                account,
                rent_destination,
                authority,
            } => self.close(account, rent_destination, authority),
        }
    }

    fn create(
        &mut self,
        address: Address,
        mint: Address,
        owner: Address,
        payer: Address,
    ) -> Result<(), LedgerError> {
        if !self.base.mints.contains_key(&mint) {
            return Err(LedgerError::MintNotFound(mint));
        }
        if self.account(&address).is_some() || self.base.mints.contains_key(&address) {
            return Err(LedgerError::AccountExists(address));
        }
        let available = self.lamports(&payer);
        if available < self.rent {
            return Err(LedgerError::InsufficientLamports {
                payer,
                requested: self.rent,
                available,
            });
        }
        self.lamports.insert(payer, available - self.rent);
        self.accounts.insert(
            address,
            Some(TokenAccount {
                address,
                mint,
                owner,
                amount: 0,
                lamports: self.rent,
            }),
        );
        Ok(())
    }

    fn transfer(
        &mut self,
        source: &Address,
        destination: &Address,
        amount: u64,
        authority: &Authority,
    ) -> Result<(), LedgerError> {
        let mut from = self.require_account(source)?;
        let mut to = self.require_account(destination)?;
        if from.mint != to.mint {
            return Err(LedgerError::MintMismatch {
                account: *destination,
                expected: from.mint,
                actual: to.mint,
            });
        }
        self.authorize(&from, authority)?;
        if from.amount < amount {
            return Err(LedgerError::InsufficientFunds {
                account: *source,
                requested: amount,
                available: from.amount,
            });
        }
        if source == destination {
            return Ok(());
        }
        from.amount -= amount;
        to.amount = to
            .amount
            .checked_add(amount)
            .ok_or(LedgerError::Overflow(*destination))?;
        self.accounts.insert(*source, Some(from));
        self.accounts.insert(*destination, Some(to));
        Ok(())
    }

    fn close(
        &mut self,
        account: &Address,
        rent_destination: &Address,
        authority: &Authority,
    ) -> Result<(), LedgerError> {
        let closing = self.require_account(account)?;
        self.authorize(&closing, authority)?;
        if closing.amount != 0 {
            return Err(LedgerError::NonZeroBalance {
                account: *account,
                amount: closing.amount,
            });
        }
        let credited = self
            .lamports(rent_destination)
            .checked_add(closing.lamports)
            .ok_or(LedgerError::Overflow(*rent_destination))?;
        self.lamports.insert(*rent_destination, credited);
        self.accounts.insert(*account, None);
        Ok(())
    }

    fn authorize(&self, account: &TokenAccount, authority: &Authority) -> Result<(), LedgerError> {
        let refuse = |reason: String| LedgerError::Unauthorized {
            account: account.address,
            reason,
        };
        match authority {
            Authority::Wallet(wallet) => {
                if !is_on_curve(wallet) {
                    return Err(refuse(format!(
                        "{wallet} is a derived address and cannot sign as a wallet"
                    )));
                }
                if *wallet != account.owner {
                    return Err(refuse(format!("{wallet} is not the owner")));
                }
                Ok(())
            }
            Authority::Program(signer) => {
                if self.invoker != Some(signer.program_id()) {
                    return Err(refuse(format!(
                        "program {} did not invoke this transaction",
                        signer.program_id()
                    )));
                }
                let derived = signer
                    .signer_address()
                    .map_err(|e| refuse(format!("seeds do not derive an address: {e}")))?;
                if derived != account.owner {
                    return Err(refuse(format!("seeds derive {derived}, not the owner")));
                }
                Ok(())
            }
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use solpay_crypto::Keypair;

    proptest! {
        #[test]
        fn transfers_conserve_supply_and_lamports(
            initial in 1u64..1_000_000,
            moves in prop::collection::vec((0usize..3, 0usize..3, 0u64..2_000_000), 1..20),
        ) {
            let ledger = InMemoryLedger::new(LedgerConfig { account_rent: 10 });
            let authority = Keypair::generate().address();
            let mint = Address::from_label("asset");
            ledger.create_mint(mint, authority, 0).unwrap();

            let owners: Vec<Address> = (0..3).map(|_| Keypair::generate().address()).collect();
            let accounts: Vec<Address> = (0..3)
                .map(|i| Address::from_label(&format!("acct-{i}")))
                .collect();
            for (owner, acct) in owners.iter().zip(&accounts) {
                ledger.airdrop(owner, 100).unwrap();
                ledger
                    .execute(&Transaction::new().with(Instruction::CreateAccount {
                        address: *acct,
                        mint,
                        owner: *owner,
                        payer: *owner,
                    }))
                    .unwrap();
            }
            ledger.mint_to(&mint, &authority, &accounts[0], initial).unwrap();
            let lamports_before = ledger.total_lamports();

            for (from, to, amount) in moves {
                let _ = ledger.execute(&Transaction::new().with(Instruction::Transfer {
                    source: accounts[from],
                    destination: accounts[to],
                    amount,
                    authority: Authority::Wallet(owners[from]),
                }));
                prop_assert_eq!(ledger.circulating(&mint), u128::from(initial));
            }
            prop_assert_eq!(ledger.total_lamports(), lamports_before);
        }
    }
}
