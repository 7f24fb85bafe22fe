// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{Extension, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::gate::{error::DenyBody, Grant, GrantSource};

/// Forward-auth answer for a granted caller.
#[derive(Debug, Serialize, ToSchema)]
pub struct AccessResponse {
    pub granted: bool,
    pub source: GrantSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_days: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seconds_remaining: Option<u64>,
}

impl From<Grant> for AccessResponse {
    fn from(grant: Grant) -> Self {
        Self {
            granted: true,
            source: grant.source,
            active_days: grant.active_days,
            seconds_remaining: grant.seconds_remaining,
        }
    }
}

/// Check whether the caller in `X-Pub-Key` has paid access.
///
/// Reverse proxies call this as a forward-auth endpoint and pass the request
/// through on 200.
#[utoipa::path(
    get,
    path = "/v1/access",
    tag = "Access",
    params(
        ("X-Pub-Key" = String, Header, description = "Hex-encoded public key of the caller")
    ),
    responses(
        (status = 200, description = "Access granted", body = AccessResponse),
        (status = 401, description = "No public key supplied", body = DenyBody),
        (status = 402, description = "Service expired", body = DenyBody),
        (status = 403, description = "Invalid public key", body = DenyBody),
        (status = 500, description = "Ledger or cache failure", body = DenyBody),
        (status = 503, description = "Decision cancelled or timed out", body = DenyBody)
    )
)]
pub async fn check_access(Extension(grant): Extension<Grant>) -> Json<AccessResponse> {
    Json(grant.into())
}
