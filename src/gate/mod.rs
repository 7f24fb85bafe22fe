// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Entitlement Gate
//!
//! Decides whether a caller presenting a public key may reach the protected
//! resource, based on what that key's ledger address has paid.
//!
//! ## Decision Flow
//!
//! 1. Caller sends `X-Pub-Key: <hex public key>`
//! 2. Allow-listed keys pass immediately
//! 3. A cached decision (`access:<key>`) passes until its TTL runs out
//! 4. Otherwise:
//!    - the key is turned into a ledger address
//!    - the address's payments to the destination wallet are coalesced into
//!      service periods
//!    - active days are cached for `days * 86400` seconds and access granted,
//!      or access is denied as expired
//!
//! ## Failure Semantics
//!
//! Denials (missing or invalid key, expired entitlement) are 4xx responses.
//! Ledger and cache outages are 5xx and are never reported as "not paid".

pub mod address;
pub mod allow_list;
pub mod cache;
pub mod decider;
pub mod entitlement;
pub mod error;
pub mod middleware;

pub use address::{Address, AddressDeriver, AddressScheme, InvalidKey};
pub use allow_list::AllowList;
pub use cache::{CacheError, CacheStats, DecisionCache, DecisionStore, LruDecisionStore};
pub use decider::{AccessDecider, Decision, Grant, GrantSource};
pub use entitlement::{EntitlementCalculator, ServicePeriod, SECONDS_PER_DAY};
pub use error::DenyReason;
pub use middleware::{require_entitlement, PUB_KEY_HEADER};
