// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is read from the environment once at startup. Any invalid
//! value aborts the process before the listener is bound.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `LEDGER_PATH` | Path of the redb ledger file | `/data/ledger.redb` |
//! | `LEDGER_TABLE` | Ledger table name (validated against a fixed list) | `transactions` |
//! | `DEST_WALLET` | Destination wallet that receives payments | Required |
//! | `PRICE_PER_DAY` | Price of one day of access, decimal token units | Required |
//! | `TOKEN_DECIMALS` | Token precision used for amounts | `18` |
//! | `ALLOW_LIST` | Comma-separated public keys that bypass payment | empty |
//! | `ADDRESS_SCHEME` | `truncated` or `checksummed` | `checksummed` |
//! | `NETWORK_ID` | Network identifier for checksummed addresses | `1` |
//! | `CACHE_CAPACITY` | Identities kept in the decision cache | `10000` |
//! | `DECISION_TIMEOUT_MS` | Per-request decision deadline | `5000` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use alloy::primitives::U256;

use crate::gate::cache::DEFAULT_CACHE_CAPACITY;
use crate::gate::{AddressScheme, AllowList};
use crate::ledger::redb_ledger::DEFAULT_LEDGER_TABLE;
use crate::ledger::{format_amount, parse_amount, LedgerTable};

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";

/// Path of the embedded ledger database.
///
/// # Default
/// `/data/ledger.redb`
pub const LEDGER_PATH_ENV: &str = "LEDGER_PATH";

/// Ledger table name. Only names in
/// [`KNOWN_LEDGER_TABLES`](crate::ledger::redb_ledger::KNOWN_LEDGER_TABLES)
/// are accepted.
pub const LEDGER_TABLE_ENV: &str = "LEDGER_TABLE";

/// Wallet address that receives access payments.
pub const DEST_WALLET_ENV: &str = "DEST_WALLET";

/// Price of one day of access, as a decimal token amount (e.g. `0.5`).
pub const PRICE_PER_DAY_ENV: &str = "PRICE_PER_DAY";

pub const TOKEN_DECIMALS_ENV: &str = "TOKEN_DECIMALS";
pub const ALLOW_LIST_ENV: &str = "ALLOW_LIST";
pub const ADDRESS_SCHEME_ENV: &str = "ADDRESS_SCHEME";
pub const NETWORK_ID_ENV: &str = "NETWORK_ID";
pub const CACHE_CAPACITY_ENV: &str = "CACHE_CAPACITY";
pub const DECISION_TIMEOUT_MS_ENV: &str = "DECISION_TIMEOUT_MS";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_LEDGER_PATH: &str = "/data/ledger.redb";
pub const DEFAULT_TOKEN_DECIMALS: u8 = 18;
pub const DEFAULT_NETWORK_ID: u64 = 1;
pub const DEFAULT_DECISION_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("invalid {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            name,
            reason: reason.into(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

impl LogFormat {
    /// Read `LOG_FORMAT` directly, before the rest of the configuration.
    pub fn from_env() -> Self {
        match std::env::var(LOG_FORMAT_ENV) {
            Ok(value) if value.trim().eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// Fully validated gate configuration.
#[derive(Debug, Clone)]
pub struct GateConfig {
    pub host: String,
    pub port: u16,
    pub ledger_path: PathBuf,
    pub ledger_table: LedgerTable,
    pub destination: String,
    /// Price per day in token base units
    pub price_per_day: U256,
    pub token_decimals: u8,
    pub allow_list: AllowList,
    pub address_scheme: AddressScheme,
    pub cache_capacity: usize,
    pub decision_timeout: Duration,
    pub log_format: LogFormat,
}

impl GateConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    ///
    /// Blank values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let host = get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = parse_or(get(PORT_ENV), PORT_ENV, DEFAULT_PORT)?;

        let ledger_path = PathBuf::from(
            get(LEDGER_PATH_ENV).unwrap_or_else(|| DEFAULT_LEDGER_PATH.to_string()),
        );
        let ledger_table = LedgerTable::parse(
            &get(LEDGER_TABLE_ENV).unwrap_or_else(|| DEFAULT_LEDGER_TABLE.to_string()),
        )
        .map_err(|e| ConfigError::invalid(LEDGER_TABLE_ENV, e.to_string()))?;

        let destination = get(DEST_WALLET_ENV).ok_or(ConfigError::Missing(DEST_WALLET_ENV))?;

        let token_decimals = parse_or(get(TOKEN_DECIMALS_ENV), TOKEN_DECIMALS_ENV, DEFAULT_TOKEN_DECIMALS)?;
        let price_text = get(PRICE_PER_DAY_ENV).ok_or(ConfigError::Missing(PRICE_PER_DAY_ENV))?;
        let price_per_day = parse_amount(&price_text, token_decimals)
            .map_err(|e| ConfigError::invalid(PRICE_PER_DAY_ENV, e.to_string()))?;
        if price_per_day.is_zero() {
            return Err(ConfigError::invalid(PRICE_PER_DAY_ENV, "must be greater than zero"));
        }

        let allow_list = AllowList::new(
            get(ALLOW_LIST_ENV)
                .map(|list| list.split(',').map(str::to_string).collect::<Vec<_>>())
                .unwrap_or_default(),
        );

        let network_id = parse_or(get(NETWORK_ID_ENV), NETWORK_ID_ENV, DEFAULT_NETWORK_ID)?;
        let scheme_name = get(ADDRESS_SCHEME_ENV).unwrap_or_else(|| "checksummed".to_string());
        let address_scheme = AddressScheme::parse(&scheme_name, network_id).ok_or_else(|| {
            ConfigError::invalid(
                ADDRESS_SCHEME_ENV,
                format!("unknown scheme '{scheme_name}', expected truncated or checksummed"),
            )
        })?;

        let cache_capacity = parse_or(get(CACHE_CAPACITY_ENV), CACHE_CAPACITY_ENV, DEFAULT_CACHE_CAPACITY)?;
        if cache_capacity == 0 {
            return Err(ConfigError::invalid(CACHE_CAPACITY_ENV, "must be greater than zero"));
        }

        let timeout_ms = parse_or(
            get(DECISION_TIMEOUT_MS_ENV),
            DECISION_TIMEOUT_MS_ENV,
            DEFAULT_DECISION_TIMEOUT_MS,
        )?;
        if timeout_ms == 0 {
            return Err(ConfigError::invalid(DECISION_TIMEOUT_MS_ENV, "must be greater than zero"));
        }

        let log_format = match get(LOG_FORMAT_ENV).map(|v| v.to_lowercase()).as_deref() {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::invalid(
                    LOG_FORMAT_ENV,
                    format!("unknown format '{other}', expected json or pretty"),
                ))
            }
        };

        Ok(Self {
            host,
            port,
            ledger_path,
            ledger_table,
            destination,
            price_per_day,
            token_decimals,
            allow_list,
            address_scheme,
            cache_capacity,
            decision_timeout: Duration::from_millis(timeout_ms),
            log_format,
        })
    }

    /// Price per day as a decimal token amount, for logging.
    pub fn price_per_day_display(&self) -> String {
        format_amount(self.price_per_day, self.token_decimals)
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::invalid(HOST_ENV, e.to_string()))
    }
}

fn parse_or<T>(value: Option<String>, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        None => Ok(default),
        Some(text) => text
            .parse()
            .map_err(|e: T::Err| ConfigError::invalid(name, format!("'{text}': {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    const REQUIRED: [(&str, &str); 2] = [(DEST_WALLET_ENV, "cbdest"), (PRICE_PER_DAY_ENV, "1.5")];

    #[test]
    fn defaults_apply_when_only_required_vars_are_set() {
        let config = GateConfig::from_lookup(lookup(&REQUIRED)).unwrap();

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert_eq!(config.ledger_table.as_str(), "transactions");
        assert_eq!(config.destination, "cbdest");
        assert_eq!(
            config.price_per_day,
            U256::from(1_500_000_000_000_000_000u128)
        );
        assert_eq!(config.address_scheme, AddressScheme::Checksummed { network_id: 1 });
        assert_eq!(config.cache_capacity, DEFAULT_CACHE_CAPACITY);
        assert_eq!(config.decision_timeout, Duration::from_secs(5));
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(config.allow_list.is_empty());
        assert_eq!(config.bind_addr().unwrap().port(), 8080);
        assert_eq!(config.price_per_day_display(), "1.5");
    }

    #[test]
    fn missing_destination_is_rejected() {
        let err = GateConfig::from_lookup(lookup(&[(PRICE_PER_DAY_ENV, "1")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(DEST_WALLET_ENV)));
    }

    #[test]
    fn zero_price_is_rejected() {
        let err = GateConfig::from_lookup(lookup(&[
            (DEST_WALLET_ENV, "cbdest"),
            (PRICE_PER_DAY_ENV, "0.000"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: PRICE_PER_DAY_ENV, .. }));
    }

    #[test]
    fn unknown_table_is_rejected() {
        let mut vars = REQUIRED.to_vec();
        vars.push((LEDGER_TABLE_ENV, "users; drop table users"));
        let err = GateConfig::from_lookup(lookup(&vars)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: LEDGER_TABLE_ENV, .. }));
    }

    #[test]
    fn optional_values_are_parsed() {
        let mut vars = REQUIRED.to_vec();
        vars.extend([
            (PORT_ENV, "9000"),
            (TOKEN_DECIMALS_ENV, "6"),
            (ALLOW_LIST_ENV, " AA , bb,, "),
            (ADDRESS_SCHEME_ENV, "truncated"),
            (CACHE_CAPACITY_ENV, "50"),
            (DECISION_TIMEOUT_MS_ENV, "250"),
            (LOG_FORMAT_ENV, "JSON"),
        ]);
        let config = GateConfig::from_lookup(lookup(&vars)).unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.price_per_day, U256::from(1_500_000u64));
        assert_eq!(config.allow_list.len(), 2);
        assert!(config.allow_list.contains("aa"));
        assert_eq!(config.address_scheme, AddressScheme::Truncated);
        assert_eq!(config.cache_capacity, 50);
        assert_eq!(config.decision_timeout, Duration::from_millis(250));
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn malformed_numbers_name_the_variable() {
        let mut vars = REQUIRED.to_vec();
        vars.push((PORT_ENV, "eighty"));
        let err = GateConfig::from_lookup(lookup(&vars)).unwrap_err();
        assert!(err.to_string().contains(PORT_ENV));
    }

    #[test]
    fn blank_values_count_as_unset() {
        let err = GateConfig::from_lookup(lookup(&[
            (DEST_WALLET_ENV, "   "),
            (PRICE_PER_DAY_ENV, "1"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Missing(DEST_WALLET_ENV)));
    }
}
