//! Append-only hash-chained ledger
//!
//! Entries live in memory behind a reader-writer lock and, for persistent
//! ledgers, in a JSON-lines file with one entry per line. An append is
//! written and synced before it becomes visible in memory.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::event::{EventStatus, EventType, FinancialEvent, LedgerEntry, GENESIS_HASH};
use crate::error::{Error, Result};

/// Outcome of a chain verification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationResult {
    pub valid: bool,
    /// Entries examined, including the first invalid one
    pub entries_checked: usize,
    pub first_invalid_index: Option<u64>,
    pub reason: Option<String>,
}

impl VerificationResult {
    fn valid(entries_checked: usize) -> Self {
        Self {
            valid: true,
            entries_checked,
            first_invalid_index: None,
            reason: None,
        }
    }

    fn invalid(index: u64, reason: String) -> Self {
        Self {
            valid: false,
            entries_checked: index as usize + 1,
            first_invalid_index: Some(index),
            reason: Some(reason),
        }
    }

    /// Turn an invalid report into `Error::LedgerIntegrity`
    pub fn into_result(self) -> Result<Self> {
        match self.first_invalid_index {
            Some(index) if !self.valid => Err(Error::LedgerIntegrity {
                index,
                reason: self.reason.unwrap_or_default(),
            }),
            _ => Ok(self),
        }
    }
}

/// An append-only, hash-chained sequence of financial events
#[derive(Debug)]
pub struct Ledger {
    name: String,
    /// None for in-memory ledgers
    path: Option<PathBuf>,
    sync: bool,
    entries: RwLock<Vec<LedgerEntry>>,
}

impl Ledger {
    /// Open the ledger stored at `path`; a missing file is an empty ledger
    ///
    /// The chain is not verified on load.
    pub fn open(name: impl Into<String>, path: impl Into<PathBuf>, sync: bool) -> Result<Self> {
        let name = name.into();
        let path = path.into();
        let entries = match File::open(&path) {
            Ok(file) => read_entries(&path, file)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        debug!(ledger = %name, entries = entries.len(), "ledger opened");

        Ok(Self {
            name,
            path: Some(path),
            sync,
            entries: RwLock::new(entries),
        })
    }

    /// A ledger that is never written to disk
    pub fn in_memory(name: impl Into<String>) -> Self {
        Self::from_entries(name, Vec::new())
    }

    /// An in-memory ledger holding already recorded entries, unverified
    pub fn from_entries(name: impl Into<String>, entries: Vec<LedgerEntry>) -> Self {
        Self {
            name: name.into(),
            path: None,
            sync: false,
            entries: RwLock::new(entries),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Backing file, if persistent
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Hash of the last entry, or the genesis hash when empty
    pub fn head_hash(&self) -> String {
        self.entries
            .read()
            .last()
            .map(|e| e.hash.clone())
            .unwrap_or_else(|| GENESIS_HASH.to_string())
    }

    /// All entries, in append order
    pub fn entries(&self) -> Vec<LedgerEntry> {
        self.entries.read().clone()
    }

    /// Append `event` as the next entry
    ///
    /// Appends are serialized, so every entry gets a distinct index. If the
    /// write fails the file is cut back to its previous length and the
    /// in-memory chain is unchanged.
    pub fn append(&self, event: FinancialEvent) -> Result<LedgerEntry> {
        let mut entries = self.entries.write();
        let index = entries.len() as u64;
        let previous_hash = entries
            .last()
            .map(|e| e.hash.clone())
            .unwrap_or_else(|| GENESIS_HASH.to_string());

        let entry = LedgerEntry::new(index, Utc::now(), event, previous_hash)?;
        if let Some(path) = &self.path {
            self.write_entry(path, &entry)?;
        }

        info!(
            ledger = %self.name,
            index,
            event_type = %entry.payload.event_type,
            transaction_id = %entry.payload.transaction_id,
            "ledger entry appended"
        );
        entries.push(entry.clone());
        Ok(entry)
    }

    fn write_entry(&self, path: &Path, entry: &LedgerEntry) -> Result<()> {
        let mut line = serde_json::to_string(entry)
            .map_err(|e| Error::Internal(format!("failed to encode ledger entry: {}", e)))?;
        line.push('\n');

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        let previous_len = file.metadata()?.len();

        let written = file.write_all(line.as_bytes()).and_then(|_| {
            if self.sync {
                file.sync_data()
            } else {
                Ok(())
            }
        });

        if let Err(e) = written {
            warn!(ledger = %self.name, error = %e, "ledger append failed, truncating");
            let _ = file.set_len(previous_len);
            return Err(e.into());
        }
        Ok(())
    }

    /// Recompute the chain from entry 0 and report the first broken link
    pub fn verify_chain(&self) -> VerificationResult {
        let entries = self.entries.read();
        let result = verify_entries(&entries);
        if let (false, Some(index)) = (result.valid, result.first_invalid_index) {
            warn!(
                ledger = %self.name,
                index,
                reason = result.reason.as_deref().unwrap_or(""),
                "ledger chain is broken"
            );
        }
        result
    }

    /// Entries whose transaction or either account is `entity_id`, in
    /// append order
    pub fn entries_for(&self, entity_id: &str) -> Vec<LedgerEntry> {
        self.entries
            .read()
            .iter()
            .filter(|e| e.payload.involves(entity_id))
            .cloned()
            .collect()
    }

    /// Per-currency balance of `account_id`, replayed from completed events
    pub fn balance_for(&self, account_id: &str) -> BTreeMap<String, Decimal> {
        let mut balances: BTreeMap<String, Decimal> = BTreeMap::new();
        for entry in self.entries.read().iter() {
            let event = &entry.payload;
            if event.status != EventStatus::Completed {
                continue;
            }
            let delta = balance_delta(event, account_id);
            if let Some(delta) = delta {
                *balances.entry(event.currency.clone()).or_default() += delta;
            }
        }
        balances
    }
}

/// Effect of `event` on `account_id`, if it touches it
fn balance_delta(event: &FinancialEvent, account_id: &str) -> Option<Decimal> {
    let own = event.account_id == account_id;
    match event.event_type {
        EventType::Deposit | EventType::Refund | EventType::Adjustment if own => {
            Some(event.amount)
        }
        EventType::Withdrawal | EventType::Payment | EventType::Fee if own => Some(-event.amount),
        EventType::Transfer => {
            let credited = event.counterparty_account_id.as_deref() == Some(account_id);
            match (own, credited) {
                (true, true) => Some(Decimal::ZERO),
                (true, false) => Some(-event.amount),
                (false, true) => Some(event.amount),
                (false, false) => None,
            }
        }
        _ => None,
    }
}

/// Check index continuity, previous-hash links and hashes in order
pub fn verify_entries(entries: &[LedgerEntry]) -> VerificationResult {
    let mut expected_previous = GENESIS_HASH;
    for (position, entry) in entries.iter().enumerate() {
        let index = position as u64;
        if entry.sequence_index != index {
            return VerificationResult::invalid(
                index,
                format!("expected sequence index {}, found {}", index, entry.sequence_index),
            );
        }
        if entry.previous_hash != expected_previous {
            return VerificationResult::invalid(
                index,
                "previous hash does not match the preceding entry".to_string(),
            );
        }
        match entry.recompute_hash() {
            Ok(hash) if hash == entry.hash => {}
            Ok(_) => {
                return VerificationResult::invalid(index, "stored hash does not match contents".to_string())
            }
            Err(e) => return VerificationResult::invalid(index, e.to_string()),
        }
        expected_previous = &entry.hash;
    }
    VerificationResult::valid(entries.len())
}

fn read_entries(path: &Path, file: File) -> Result<Vec<LedgerEntry>> {
    let mut entries = Vec::new();
    for (number, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let entry: LedgerEntry = serde_json::from_str(&line).map_err(|e| {
            Error::CorruptData(format!(
                "ledger '{}' line {}: {}",
                path.display(),
                number + 1,
                e
            ))
        })?;
        entries.push(entry);
    }
    Ok(entries)
}
