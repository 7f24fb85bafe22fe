// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Entitlement Calculation
//!
//! Turns a caller's payment history into the number of days of access that
//! are active right now.
//!
//! ## Coalescing Rule
//!
//! Payments are walked oldest first. Each payment is worth
//! `floor(amount / price_per_day)` days and reaches
//! `timestamp + days` on its own.
//!
//! - The first payment opens a service period `[timestamp, reach]`.
//! - A payment made after the open period's end starts a new period at its
//!   own timestamp. Unused days of a lapsed period are not carried forward.
//! - A payment made while the period is open extends it: the day count
//!   accumulates, but the period end becomes the new payment's own reach.
//!   End dates are replaced, not summed.
//!
//! The active entitlement is the sum of day counts over every period whose
//! closed interval contains `now`.

use alloy::primitives::U256;
use chrono::{DateTime, TimeDelta, Utc};

use super::address::Address;
use crate::ledger::{Ledger, LedgerResult, PaymentEvent, PaymentQuery};

/// Seconds in one entitlement day.
pub const SECONDS_PER_DAY: u64 = 86_400;

/// Contiguous span of paid-for access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServicePeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub days: u64,
}

impl ServicePeriod {
    /// Whether `now` lies in `[start, end]`.
    pub fn covers(&self, now: DateTime<Utc>) -> bool {
        self.start <= now && now <= self.end
    }
}

/// Whole days bought by `amount` at `price_per_day`.
pub fn days_paid(amount: U256, price_per_day: U256) -> u64 {
    if price_per_day.is_zero() {
        return 0;
    }
    (amount / price_per_day).saturating_to::<u64>()
}

/// `start + days`, saturating at the latest representable instant.
fn reach(start: DateTime<Utc>, days: u64) -> DateTime<Utc> {
    i64::try_from(days)
        .ok()
        .and_then(TimeDelta::try_days)
        .and_then(|span| start.checked_add_signed(span))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Total days of all periods covering `now`.
pub fn active_days_at(periods: &[ServicePeriod], now: DateTime<Utc>) -> u64 {
    periods
        .iter()
        .filter(|period| period.covers(now))
        .fold(0u64, |total, period| total.saturating_add(period.days))
}

/// Computes active entitlement days for one destination wallet and price.
#[derive(Debug, Clone)]
pub struct EntitlementCalculator {
    destination: String,
    price_per_day: U256,
}

impl EntitlementCalculator {
    /// `price_per_day` is in token base units and must be non-zero.
    pub fn new(destination: impl Into<String>, price_per_day: U256) -> Self {
        Self {
            destination: destination.into(),
            price_per_day,
        }
    }

    /// Coalesce the qualifying payments of `address` into service periods.
    ///
    /// Events from other senders or to other recipients are ignored. Input
    /// order does not matter; equal timestamps keep their input order.
    pub fn coalesce(&self, address: &Address, events: &[PaymentEvent]) -> Vec<ServicePeriod> {
        let mut qualifying: Vec<&PaymentEvent> = events
            .iter()
            .filter(|event| {
                event.sender.eq_ignore_ascii_case(address.as_str())
                    && event.recipient.eq_ignore_ascii_case(&self.destination)
            })
            .collect();
        qualifying.sort_by_key(|event| event.timestamp);

        let mut periods: Vec<ServicePeriod> = Vec::new();
        for event in qualifying {
            let days = days_paid(event.amount, self.price_per_day);
            let end = reach(event.timestamp, days);

            match periods.last_mut() {
                Some(open) if event.timestamp <= open.end => {
                    open.end = end;
                    open.days = open.days.saturating_add(days);
                }
                _ => periods.push(ServicePeriod {
                    start: event.timestamp,
                    end,
                    days,
                }),
            }
        }
        periods
    }

    /// Active days of `address` at `now` over an already fetched history.
    pub fn evaluate(&self, address: &Address, now: DateTime<Utc>, events: &[PaymentEvent]) -> u64 {
        active_days_at(&self.coalesce(address, events), now)
    }

    /// Query the ledger for `address` and compute its active days at `now`.
    pub async fn active_days<L: Ledger>(
        &self,
        ledger: &L,
        address: &Address,
        now: DateTime<Utc>,
    ) -> LedgerResult<u64> {
        let query = PaymentQuery {
            sender: address.as_str().to_string(),
            recipient: self.destination.clone(),
        };
        let events = ledger.payments(&query).await?;
        Ok(self.evaluate(address, now, &events))
    }
}
