// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Static bypass list of identities exempt from ledger evaluation.

use std::collections::HashSet;

/// Case-insensitive set of allow-listed public keys.
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    entries: HashSet<String>,
}

impl AllowList {
    /// Build from configured identities. Blank entries are ignored.
    pub fn new<I, S>(identities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entries = identities
            .into_iter()
            .map(|identity| identity.as_ref().trim().to_lowercase())
            .filter(|identity| !identity.is_empty())
            .collect();
        Self { entries }
    }

    /// Exact match after case folding.
    pub fn contains(&self, identity: &str) -> bool {
        !self.entries.is_empty() && self.entries.contains(&identity.trim().to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
