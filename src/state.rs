// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config::{GateConfig, DEFAULT_DECISION_TIMEOUT_MS};
use crate::gate::{AccessDecider, AddressDeriver, EntitlementCalculator, LruDecisionStore};
use crate::ledger::RedbLedger;

/// The entitlement engine as deployed: redb ledger and in-process cache.
pub type Gate = AccessDecider<RedbLedger, LruDecisionStore>;

#[derive(Clone)]
pub struct AppState {
    pub gate: Arc<Gate>,
    /// Cancelled on shutdown; every in-flight decision runs under a child token.
    pub shutdown: CancellationToken,
    pub decision_timeout: Duration,
}

impl AppState {
    pub fn new(gate: Gate) -> Self {
        Self {
            gate: Arc::new(gate),
            shutdown: CancellationToken::new(),
            decision_timeout: Duration::from_millis(DEFAULT_DECISION_TIMEOUT_MS),
        }
    }

    /// Wire the gate from validated configuration and an opened ledger.
    pub fn from_config(config: &GateConfig, ledger: RedbLedger) -> Self {
        let gate = AccessDecider::new(
            config.allow_list.clone(),
            AddressDeriver::new(config.address_scheme),
            EntitlementCalculator::new(config.destination.clone(), config.price_per_day),
            ledger,
            LruDecisionStore::new(config.cache_capacity),
        );
        Self::new(gate).with_decision_timeout(config.decision_timeout)
    }

    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn with_decision_timeout(mut self, timeout: Duration) -> Self {
        self.decision_timeout = timeout;
        self
    }
}
