// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded ledger store backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! A single transfers table whose name is taken from configuration:
//!
//! - key: `recipient | sender | ordered_timestamp_be | tx_hash`
//! - value: serialized [`StoredTransfer`] (JSON bytes)
//!
//! Addresses are lowercased in keys. The timestamp is stored as milliseconds
//! with the sign bit flipped so that byte order equals time order, which makes
//! a payment lookup a single ascending prefix range scan.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};

use super::{parse_amount, Ledger, LedgerError, LedgerResult, PaymentEvent, PaymentQuery};

/// Table names the gate may read transfers from.
pub const KNOWN_LEDGER_TABLES: &[&str] = &["transactions", "transfers", "ctn_transfers"];

/// Default transfers table.
pub const DEFAULT_LEDGER_TABLE: &str = "transactions";

/// Key component separator.
const KEY_SEPARATOR: u8 = b'|';

// =============================================================================
// Table Name
// =============================================================================

/// A ledger table name that passed startup validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerTable(String);

impl LedgerTable {
    /// Accept `name` only if it is one of [`KNOWN_LEDGER_TABLES`].
    pub fn parse(name: &str) -> Result<Self, LedgerError> {
        if KNOWN_LEDGER_TABLES.contains(&name) {
            Ok(Self(name.to_string()))
        } else {
            Err(LedgerError::UnknownTable(name.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn definition(&self) -> TableDefinition<'_, &'static [u8], &'static [u8]> {
        TableDefinition::new(&self.0)
    }
}

impl Default for LedgerTable {
    fn default() -> Self {
        Self(DEFAULT_LEDGER_TABLE.to_string())
    }
}

// =============================================================================
// Stored Record
// =============================================================================

/// Transfer record as written by the ingester.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredTransfer {
    /// Transaction hash
    pub tx_hash: String,
    /// Sender address
    pub from: String,
    /// Recipient address
    pub to: String,
    /// Amount in human-readable format
    pub amount: String,
    /// When the transfer was recorded on the ledger
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Key Helpers
// =============================================================================

/// Map a signed timestamp onto bytes that sort in time order.
fn ordered_timestamp(millis: i64) -> [u8; 8] {
    ((millis as u64) ^ (1 << 63)).to_be_bytes()
}

fn make_prefix(recipient: &str, sender: &str) -> Vec<u8> {
    let recipient = recipient.to_lowercase();
    let sender = sender.to_lowercase();
    let mut prefix = Vec::with_capacity(recipient.len() + sender.len() + 2);
    prefix.extend_from_slice(recipient.as_bytes());
    prefix.push(KEY_SEPARATOR);
    prefix.extend_from_slice(sender.as_bytes());
    prefix.push(KEY_SEPARATOR);
    prefix
}

/// Exclusive upper bound of a prefix scan: the trailing separator bumped by one.
fn make_prefix_end(recipient: &str, sender: &str) -> Vec<u8> {
    let mut end = make_prefix(recipient, sender);
    if let Some(last) = end.last_mut() {
        *last = KEY_SEPARATOR + 1;
    }
    end
}

fn make_key(transfer: &StoredTransfer) -> Vec<u8> {
    let mut key = make_prefix(&transfer.to, &transfer.from);
    key.extend_from_slice(&ordered_timestamp(transfer.created_at.timestamp_millis()));
    key.push(KEY_SEPARATOR);
    key.extend_from_slice(transfer.tx_hash.as_bytes());
    key
}

// =============================================================================
// RedbLedger
// =============================================================================

/// Embedded ACID ledger of transfers.
#[derive(Clone)]
pub struct RedbLedger {
    db: Arc<Database>,
    table: LedgerTable,
    decimals: u8,
}

impl RedbLedger {
    /// Open (or create) the ledger at the given path.
    ///
    /// `decimals` is the token precision used to parse stored amounts.
    pub fn open(path: &Path, table: LedgerTable, decimals: u8) -> LedgerResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = Database::create(path)?;

        // Pre-create the table so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(table.definition())?;
        }
        write_txn.commit()?;

        Ok(Self {
            db: Arc::new(db),
            table,
            decimals,
        })
    }

    /// Insert or replace a transfer record.
    ///
    /// This is the ingester's write path; the gate itself only reads.
    pub fn record_transfer(&self, transfer: &StoredTransfer) -> LedgerResult<()> {
        for address in [&transfer.from, &transfer.to] {
            if address.is_empty() || address.as_bytes().contains(&KEY_SEPARATOR) {
                return Err(LedgerError::InvalidRecord(format!(
                    "address '{address}' of {} is empty or contains '|'",
                    transfer.tx_hash
                )));
            }
        }

        let json = serde_json::to_vec(transfer)?;
        let key = make_key(transfer);

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(self.table.definition())?;
            table.insert(key.as_slice(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Check that the table can be opened for reading.
    pub fn ping(&self) -> LedgerResult<()> {
        let read_txn = self.db.begin_read()?;
        let _ = read_txn.open_table(self.table.definition())?;
        Ok(())
    }

    /// Blocking scan of all transfers `sender -> recipient`, oldest first.
    ///
    /// Transfers recorded in the same millisecond come back in `tx_hash`
    /// byte order, which is the key order of the table.
    pub fn scan_payments(&self, query: &PaymentQuery) -> LedgerResult<Vec<PaymentEvent>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(self.table.definition())?;

        let start = make_prefix(&query.recipient, &query.sender);
        let end = make_prefix_end(&query.recipient, &query.sender);

        let mut events = Vec::new();
        for entry in table.range(start.as_slice()..end.as_slice())? {
            let (_, value) = entry?;
            let transfer: StoredTransfer = serde_json::from_slice(value.value())?;
            let amount = parse_amount(&transfer.amount, self.decimals).map_err(|source| {
                LedgerError::MalformedAmount {
                    tx_hash: transfer.tx_hash.clone(),
                    source,
                }
            })?;
            events.push(PaymentEvent {
                sender: transfer.from,
                recipient: transfer.to,
                timestamp: transfer.created_at,
                amount,
            });
        }

        tracing::debug!(
            table = %self.table.as_str(),
            sender = %query.sender,
            count = events.len(),
            "Ledger scan complete"
        );

        Ok(events)
    }
}

impl Ledger for RedbLedger {
    async fn payments(&self, query: &PaymentQuery) -> LedgerResult<Vec<PaymentEvent>> {
        let ledger = self.clone();
        let query = query.clone();
        tokio::task::spawn_blocking(move || ledger.scan_payments(&query))
            .await
            .map_err(|e| LedgerError::Task(e.to_string()))?
    }
}

// =============================================================================
// Tests
// =============================================================================
