// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ledger Gate - Paid-Access Entitlement Service
//!
//! Grants or denies access to a protected resource based on the payments a
//! caller's public key has made to a destination wallet, as recorded on a
//! value-transfer ledger.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `gate` - Entitlement engine and its middleware
//! - `ledger` - Ledger contract and the embedded redb ledger
//! - `config` - Environment configuration

pub mod api;
pub mod config;
pub mod error;
pub mod gate;
pub mod ledger;
pub mod logging;
pub mod state;
