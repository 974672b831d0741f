//! # File-Backed State
//!
//! The ledger and the escrow records share one snapshot,
//! `<state-dir>/state.json`, written after every mutating command and
//! reloaded at the start of the next one. A missing file is an empty store.
//!
//! Saves never leave a half-written snapshot behind: the new state goes to a
//! temporary file in the same directory and is renamed over the old one.
//! Every snapshot carries a revision number. A save takes `state.lock` for
//! its duration and refuses to overwrite a snapshot whose revision moved
//! since this workspace loaded it, so two commands racing on the same state
//! directory cannot silently drop each other's effects.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use solpay_escrow::{EscrowProgram, RecordSnapshot, RecordStore};
use solpay_ledger::{InMemoryLedger, LedgerSnapshot};

use crate::config::Settings;

/// Snapshot file name.
pub const STATE_FILE: &str = "state.json";

/// Held while a save is in progress.
pub const LOCK_FILE: &str = "state.lock";

/// On-disk layout of [`STATE_FILE`].
#[derive(Debug, Default, Serialize, Deserialize)]
struct StateFile {
    revision: u64,
    ledger: LedgerSnapshot,
    escrows: RecordSnapshot,
}

/// A loaded state directory.
#[derive(Debug)]
pub struct Workspace {
    dir: PathBuf,
    revision: AtomicU64,
    program: EscrowProgram<InMemoryLedger>,
}

impl Workspace {
    /// Load ledger and records from `settings.state_dir`.
    pub fn load(settings: &Settings) -> Result<Self> {
        let dir = settings.state_dir.clone();
        let state = read_state(&dir.join(STATE_FILE))?;
        let ledger = Arc::new(InMemoryLedger::from_snapshot(settings.ledger, state.ledger));
        let program = EscrowProgram::with_records(
            settings.program,
            ledger,
            RecordStore::from_snapshot(state.escrows),
        );
        tracing::debug!(state_dir = %dir.display(), revision = state.revision, "workspace loaded");
        Ok(Self {
            dir,
            revision: AtomicU64::new(state.revision),
            program,
        })
    }

    /// Write ledger and records back as one snapshot.
    ///
    /// Fails without touching the snapshot if another save is in progress
    /// or another command saved since this workspace was loaded.
    pub fn save(&self) -> Result<()> {
        std::fs::create_dir_all(&self.dir).with_context(|| {
            format!("failed to create state directory: {}", self.dir.display())
        })?;
        let _lock = SaveLock::acquire(&self.dir)?;

        let path = self.dir.join(STATE_FILE);
        let loaded = self.revision.load(Ordering::SeqCst);
        let on_disk = read_state(&path)?.revision;
        if on_disk != loaded {
            bail!(
                "{} changed since it was loaded (revision {loaded}, now {on_disk}); rerun the command",
                path.display()
            );
        }

        let state = StateFile {
            revision: loaded + 1,
            ledger: self.ledger().snapshot(),
            escrows: self.program.records().snapshot(),
        };
        write_atomic(&self.dir, &path, &state)?;
        self.revision.store(state.revision, Ordering::SeqCst);
        tracing::debug!(state_dir = %self.dir.display(), revision = state.revision, "workspace saved");
        Ok(())
    }

    /// The escrow program.
    pub fn program(&self) -> &EscrowProgram<InMemoryLedger> {
        &self.program
    }

    /// The ledger.
    pub fn ledger(&self) -> &InMemoryLedger {
        self.program.ledger()
    }

    /// The state directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Exclusive marker for the duration of a save. Removed on drop.
struct SaveLock {
    path: PathBuf,
}

impl SaveLock {
    fn acquire(dir: &Path) -> Result<Self> {
        let path = dir.join(LOCK_FILE);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => Ok(Self { path }),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => bail!(
                "{} exists: another solpay command is saving (delete it if none is running)",
                path.display()
            ),
            Err(e) => Err(e).with_context(|| format!("failed to create {}", path.display())),
        }
    }
}

impl Drop for SaveLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to release state lock");
        }
    }
}

fn read_state(path: &Path) -> Result<StateFile> {
    if !path.exists() {
        return Ok(StateFile::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
}

fn write_atomic(dir: &Path, path: &Path, state: &StateFile) -> Result<()> {
    let json = serde_json::to_vec_pretty(state)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("failed to create temporary file in {}", dir.display()))?;
    tmp.write_all(&json)
        .and_then(|()| tmp.as_file().sync_all())
        .with_context(|| format!("failed to write {}", tmp.path().display()))?;
    tmp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("failed to replace {}", path.display()))?;
    Ok(())
}
