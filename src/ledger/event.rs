//! Ledger entries and the financial events they carry
//!
//! An entry's hash covers the canonical JSON of its payload, the previous
//! entry's hash and its own sequence index, so changing any of them breaks
//! the chain from that entry on.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// `previous_hash` of entry 0
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Kind of financial event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    Deposit,
    Withdrawal,
    Transfer,
    Payment,
    Refund,
    Fee,
    Adjustment,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Deposit => "DEPOSIT",
            EventType::Withdrawal => "WITHDRAWAL",
            EventType::Transfer => "TRANSFER",
            EventType::Payment => "PAYMENT",
            EventType::Refund => "REFUND",
            EventType::Fee => "FEE",
            EventType::Adjustment => "ADJUSTMENT",
        }
    }

    /// Parse a type name, case-insensitively
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_uppercase().as_str() {
            "DEPOSIT" => Some(EventType::Deposit),
            "WITHDRAWAL" => Some(EventType::Withdrawal),
            "TRANSFER" => Some(EventType::Transfer),
            "PAYMENT" => Some(EventType::Payment),
            "REFUND" => Some(EventType::Refund),
            "FEE" => Some(EventType::Fee),
            "ADJUSTMENT" => Some(EventType::Adjustment),
            _ => None,
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Settlement status of an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventStatus {
    Pending,
    #[default]
    Completed,
    Failed,
    Reversed,
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventStatus::Pending => write!(f, "PENDING"),
            EventStatus::Completed => write!(f, "COMPLETED"),
            EventStatus::Failed => write!(f, "FAILED"),
            EventStatus::Reversed => write!(f, "REVERSED"),
        }
    }
}

/// A financial state change recorded in a ledger
///
/// Field order is the canonical serialization order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancialEvent {
    pub event_type: EventType,
    pub transaction_id: String,
    pub account_id: String,
    #[serde(default)]
    pub counterparty_account_id: Option<String>,
    /// Exact amount, serialized as a string
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
    /// ISO 4217 code
    pub currency: String,
    #[serde(default)]
    pub status: EventStatus,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl FinancialEvent {
    /// A completed event without counterparty or metadata
    pub fn new(
        event_type: EventType,
        transaction_id: impl Into<String>,
        account_id: impl Into<String>,
        amount: Decimal,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            event_type,
            transaction_id: transaction_id.into(),
            account_id: account_id.into(),
            counterparty_account_id: None,
            amount,
            currency: currency.into(),
            status: EventStatus::Completed,
            metadata: BTreeMap::new(),
        }
    }

    /// A completed transfer from `from` to `to`
    pub fn transfer(
        transaction_id: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
        amount: Decimal,
        currency: impl Into<String>,
    ) -> Self {
        Self::new(EventType::Transfer, transaction_id, from, amount, currency).counterparty(to)
    }

    pub fn counterparty(mut self, account_id: impl Into<String>) -> Self {
        self.counterparty_account_id = Some(account_id.into());
        self
    }

    pub fn status(mut self, status: EventStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Does `id` name this event's transaction or one of its accounts?
    pub fn involves(&self, id: &str) -> bool {
        self.transaction_id == id
            || self.account_id == id
            || self.counterparty_account_id.as_deref() == Some(id)
    }

    /// Deterministic JSON used for hashing
    pub fn canonical_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| Error::Internal(format!("failed to encode event: {}", e)))
    }
}

/// One link of a ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub sequence_index: u64,
    pub timestamp: DateTime<Utc>,
    pub payload: FinancialEvent,
    pub previous_hash: String,
    pub hash: String,
}

impl LedgerEntry {
    /// Build and hash entry `sequence_index`
    pub fn new(
        sequence_index: u64,
        timestamp: DateTime<Utc>,
        payload: FinancialEvent,
        previous_hash: impl Into<String>,
    ) -> Result<Self> {
        let previous_hash = previous_hash.into();
        let hash = compute_hash(&payload, &previous_hash, sequence_index)?;
        Ok(Self {
            sequence_index,
            timestamp,
            payload,
            previous_hash,
            hash,
        })
    }

    /// Recompute the hash from the stored fields
    pub fn recompute_hash(&self) -> Result<String> {
        compute_hash(&self.payload, &self.previous_hash, self.sequence_index)
    }
}

/// `SHA-256(canonical payload ‖ previous hash ‖ index as 8 big-endian bytes)`, hex
pub fn compute_hash(payload: &FinancialEvent, previous_hash: &str, index: u64) -> Result<String> {
    let mut hasher = Sha256::new();
    hasher.update(payload.canonical_json()?.as_bytes());
    hasher.update(previous_hash.as_bytes());
    hasher.update(index.to_be_bytes());
    Ok(hex::encode(hasher.finalize()))
}
