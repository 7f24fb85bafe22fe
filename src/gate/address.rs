// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ledger address derivation from a caller's public key.
//!
//! Two schemes exist. A deployment picks exactly one at startup and never
//! changes it, since every previously paid address depends on it:
//!
//! - **Truncated**: `"cb…"` followed by the hex of the first 16 bytes of
//!   `SHA-256(public_key)`.
//! - **Checksummed**: Core-style ICAN address. `Keccak-256(public_key)[12..]`
//!   is the 20-byte account, preceded by a network prefix byte and a
//!   mod-97 checksum byte, hex encoded (44 characters).

use std::fmt;

use alloy::primitives::keccak256;
use sha2::{Digest, Sha256};

/// Ed448 public key size in bytes.
pub const ED448_PUBLIC_KEY_SIZE: usize = 57;

/// Marker prepended to truncated addresses.
pub const TRUNCATED_ADDRESS_MARKER: &str = "cb…";

/// Number of SHA-256 bytes kept by the truncated scheme.
const TRUNCATED_DIGEST_LEN: usize = 16;

/// Offset of the 20-byte account inside the 32-byte digest.
const ACCOUNT_OFFSET: usize = 12;

/// The public key could not be turned into an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum InvalidKey {
    #[error("public key is not valid hex")]
    NotHex,

    #[error("public key must be {expected} bytes, got {actual}")]
    WrongLength { expected: usize, actual: usize },
}

/// Derivation scheme, fixed for the lifetime of a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressScheme {
    Truncated,
    Checksummed { network_id: u64 },
}

impl AddressScheme {
    /// Parse a scheme name (`truncated` or `checksummed`).
    pub fn parse(name: &str, network_id: u64) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "truncated" | "sha256" => Some(Self::Truncated),
            "checksummed" | "ican" => Some(Self::Checksummed { network_id }),
            _ => None,
        }
    }
}

impl fmt::Display for AddressScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated => write!(f, "truncated"),
            Self::Checksummed { network_id } => write!(f, "checksummed(network {network_id})"),
        }
    }
}

/// Network prefix byte of a checksummed address.
pub fn network_prefix(network_id: u64) -> u8 {
    match network_id {
        1 => 0xcb,
        3 => 0xab,
        _ => 0xce,
    }
}

/// Canonical ledger address of a caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address(String);

impl Address {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        value.0
    }
}

/// Pure public key → address function for the configured scheme.
#[derive(Debug, Clone, Copy)]
pub struct AddressDeriver {
    scheme: AddressScheme,
}

impl AddressDeriver {
    pub fn new(scheme: AddressScheme) -> Self {
        Self { scheme }
    }

    /// Derive the address of a raw public key.
    pub fn derive(&self, public_key: &[u8]) -> Result<Address, InvalidKey> {
        if public_key.len() != ED448_PUBLIC_KEY_SIZE {
            return Err(InvalidKey::WrongLength {
                expected: ED448_PUBLIC_KEY_SIZE,
                actual: public_key.len(),
            });
        }

        Ok(match self.scheme {
            AddressScheme::Truncated => truncated_address(public_key),
            AddressScheme::Checksummed { network_id } => {
                checksummed_address(public_key, network_prefix(network_id))
            }
        })
    }

    /// Derive the address of a hex-encoded public key (optional `0x`).
    pub fn derive_hex(&self, public_key_hex: &str) -> Result<Address, InvalidKey> {
        let bytes = alloy::hex::decode(public_key_hex.trim()).map_err(|_| InvalidKey::NotHex)?;
        self.derive(&bytes)
    }
}

fn truncated_address(public_key: &[u8]) -> Address {
    let hash = Sha256::digest(public_key);
    Address(format!(
        "{TRUNCATED_ADDRESS_MARKER}{}",
        alloy::hex::encode(&hash[..TRUNCATED_DIGEST_LEN])
    ))
}

fn checksummed_address(public_key: &[u8], prefix: u8) -> Address {
    let hash = keccak256(public_key);
    let account = &hash[ACCOUNT_OFFSET..];
    let checksum = ican_checksum(account, prefix);

    let mut raw = Vec::with_capacity(2 + account.len());
    raw.push(prefix);
    raw.push(checksum);
    raw.extend_from_slice(account);
    Address(alloy::hex::encode(raw))
}

/// Mod-97 remainder of the decimal number spelled by the hex nibbles of
/// `bytes`, where nibbles `a..=f` count as the two-digit numbers 10..=15.
fn ican_remainder(bytes: impl IntoIterator<Item = u8>) -> u32 {
    bytes
        .into_iter()
        .flat_map(|b| [b >> 4, b & 0x0f])
        .fold(0u32, |rem, nibble| {
            let nibble = u32::from(nibble);
            if nibble < 10 {
                (rem * 10 + nibble) % 97
            } else {
                (rem * 100 + nibble) % 97
            }
        })
}

/// ISO 7064 mod-97-10 check digits over `account || prefix`, as one BCD byte.
fn ican_checksum(account: &[u8], prefix: u8) -> u8 {
    let rem = ican_remainder(account.iter().copied().chain([prefix, 0x00]));
    let check = 98 - rem;
    (((check / 10) << 4) | (check % 10)) as u8
}
