// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Ledger Collaborator
//!
//! The gate never owns the ledger. It only reads value transfers that an
//! external ingester has already recorded, through the [`Ledger`] trait.
//!
//! ## Query Contract
//!
//! Given a sender address and the configured destination wallet, a ledger
//! returns every transfer `sender -> recipient` in ascending timestamp order.
//! Transfers with equal timestamps keep the store's natural order. A ledger
//! may drop records that cannot affect the current entitlement, but the
//! coalescing in `gate::entitlement` is correct over the full history too.
//!
//! Value inputs are always bound as data. The only identifier a ledger
//! uses (its table name) comes from trusted configuration and is validated
//! once at startup, see [`LedgerTable`].

pub mod amount;
pub mod redb_ledger;

use std::future::Future;

use alloy::primitives::U256;
use chrono::{DateTime, Utc};

pub use amount::{format_amount, parse_amount, AmountError};
pub use redb_ledger::{LedgerTable, RedbLedger, StoredTransfer};

/// A transfer of value read from the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentEvent {
    /// Paying address
    pub sender: String,
    /// Receiving address (the destination wallet for qualifying payments)
    pub recipient: String,
    /// When the transfer was recorded
    pub timestamp: DateTime<Utc>,
    /// Amount in token base units
    pub amount: U256,
}

/// Parameters of a ledger lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentQuery {
    pub sender: String,
    pub recipient: String,
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("malformed ledger row {tx_hash}: {source}")]
    MalformedAmount {
        tx_hash: String,
        #[source]
        source: AmountError,
    },

    #[error("ledger table '{0}' is not a known transfers table")]
    UnknownTable(String),

    #[error("invalid ledger record: {0}")]
    InvalidRecord(String),

    #[error("ledger task failed: {0}")]
    Task(String),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Read access to the ledger of transfers.
pub trait Ledger: Send + Sync {
    /// All transfers from `query.sender` to `query.recipient`, oldest first.
    fn payments(
        &self,
        query: &PaymentQuery,
    ) -> impl Future<Output = LedgerResult<Vec<PaymentEvent>>> + Send;
}
