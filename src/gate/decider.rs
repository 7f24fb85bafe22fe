// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Access Decision
//!
//! Orchestrates one access decision per request:
//!
//! 1. No identity → deny (`MissingIdentity`)
//! 2. Allow-listed identity → grant, without touching cache or ledger
//! 3. Live cache record → grant, without touching the ledger
//! 4. Derive the ledger address (`InvalidKey` on failure)
//! 5. Compute active days from the ledger (`LedgerQueryFailed` on failure)
//! 6. Zero days → deny (`Expired`), nothing cached
//! 7. Otherwise cache `days * 86400` seconds and grant
//!
//! ## Concurrency
//!
//! The decider holds no locks of its own. Two first-time requests for the
//! same identity may both miss the cache, both query the ledger and both
//! write the same record. Both writes carry the same value.
//!
//! Nothing is retried here. Timeouts and cancellation belong to the caller,
//! which passes a [`CancellationToken`]; cancelling it abandons any in-flight
//! cache or ledger call.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use super::address::AddressDeriver;
use super::allow_list::AllowList;
use super::cache::{CacheError, DecisionCache, DecisionStore};
use super::entitlement::{EntitlementCalculator, SECONDS_PER_DAY};
use super::error::DenyReason;
use crate::ledger::Ledger;

/// Which step granted access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum GrantSource {
    AllowList,
    Cache,
    Ledger,
}

/// A granted decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant {
    pub source: GrantSource,
    /// Active entitlement days, when computed from the ledger
    pub active_days: Option<u64>,
    /// Seconds of access left (absent for allow-listed callers)
    pub seconds_remaining: Option<u64>,
}

impl Grant {
    fn allow_listed() -> Self {
        Self {
            source: GrantSource::AllowList,
            active_days: None,
            seconds_remaining: None,
        }
    }
}

/// Outcome of one evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Grant(Grant),
    Deny(DenyReason),
}

impl Decision {
    pub fn is_granted(&self) -> bool {
        matches!(self, Decision::Grant(_))
    }
}

/// Entitlement engine: allow-list, decision cache, address derivation and
/// ledger evaluation wired together.
pub struct AccessDecider<L, S> {
    allow_list: AllowList,
    deriver: AddressDeriver,
    calculator: EntitlementCalculator,
    cache: DecisionCache<S>,
    ledger: L,
}

impl<L: Ledger, S: DecisionStore> AccessDecider<L, S> {
    pub fn new(
        allow_list: AllowList,
        deriver: AddressDeriver,
        calculator: EntitlementCalculator,
        ledger: L,
        store: S,
    ) -> Self {
        Self {
            allow_list,
            deriver,
            calculator,
            cache: DecisionCache::new(store),
            ledger,
        }
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn cache(&self) -> &DecisionCache<S> {
        &self.cache
    }

    /// Decide at the current wall-clock time.
    pub async fn decide(&self, identity: Option<&str>, cancel: &CancellationToken) -> Decision {
        self.decide_at(identity, Utc::now(), cancel).await
    }

    /// Decide as of `now`, giving up as soon as `cancel` fires.
    pub async fn decide_at(
        &self,
        identity: Option<&str>,
        now: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Decision {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Access decision cancelled");
                Decision::Deny(DenyReason::Cancelled)
            }
            decision = self.evaluate(identity, now) => decision,
        }
    }

    async fn evaluate(&self, identity: Option<&str>, now: DateTime<Utc>) -> Decision {
        let Some(identity) = identity.map(str::trim).filter(|id| !id.is_empty()) else {
            return Decision::Deny(DenyReason::MissingIdentity);
        };

        if self.allow_list.contains(identity) {
            debug!("Identity is allow-listed");
            return Decision::Grant(Grant::allow_listed());
        }

        match self.cache.get(identity).await {
            Ok(Some(seconds)) => {
                debug!(seconds_remaining = seconds, "Decision cache hit");
                return Decision::Grant(Grant {
                    source: GrantSource::Cache,
                    active_days: None,
                    seconds_remaining: Some(seconds),
                });
            }
            Ok(None) => {}
            Err(CacheError::Corrupted { key, value }) => {
                warn!(key = %key, value = %value, "Corrupted cache record, recomputing");
            }
            Err(e) => {
                warn!(error = %e, "Decision cache lookup failed");
                return Decision::Deny(DenyReason::CacheUnavailable);
            }
        }

        let address = match self.deriver.derive_hex(identity) {
            Ok(address) => address,
            Err(e) => {
                debug!(error = %e, "Rejecting invalid public key");
                return Decision::Deny(DenyReason::InvalidKey);
            }
        };

        let active_days = match self
            .calculator
            .active_days(&self.ledger, &address, now)
            .await
        {
            Ok(days) => days,
            Err(e) => {
                warn!(address = %address, error = %e, "Ledger query failed");
                return Decision::Deny(DenyReason::LedgerQueryFailed);
            }
        };

        if active_days == 0 {
            info!(address = %address, "No active entitlement");
            return Decision::Deny(DenyReason::Expired);
        }

        let seconds = active_days.saturating_mul(SECONDS_PER_DAY);
        if let Err(e) = self.cache.put(identity, seconds).await {
            warn!(address = %address, error = %e, "Failed to cache access decision");
        }

        info!(
            address = %address,
            active_days,
            ttl_secs = seconds,
            "Access granted from ledger"
        );

        Decision::Grant(Grant {
            source: GrantSource::Ledger,
            active_days: Some(active_days),
            seconds_remaining: Some(seconds),
        })
    }
}
