// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Access denial reasons and their HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

/// Why a request was not granted access.
///
/// Caller mistakes and unpaid access map to 4xx. Infrastructure failures map
/// to 5xx so that an outage never looks like a missing payment.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DenyReason {
    /// No public key header present
    #[error("X-Pub-Key header is required")]
    MissingIdentity,
    /// Public key is not hex or has the wrong length
    #[error("Invalid public key")]
    InvalidKey,
    /// Entitlement computed and found to be zero
    #[error("Service expired")]
    Expired,
    /// The ledger could not be queried or returned bad data
    #[error("Ledger query failed")]
    LedgerQueryFailed,
    /// A cached decision could not be parsed
    #[error("Cached decision is corrupted")]
    CacheCorrupted,
    /// The decision cache could not be reached
    #[error("Decision cache unavailable")]
    CacheUnavailable,
    /// The request was cancelled or hit its deadline
    #[error("Request cancelled before a decision was reached")]
    Cancelled,
}

#[derive(Serialize, ToSchema)]
pub struct DenyBody {
    pub error: String,
    pub error_code: String,
}

impl DenyReason {
    /// Get the error code for this reason.
    pub fn error_code(&self) -> &'static str {
        match self {
            DenyReason::MissingIdentity => "missing_identity",
            DenyReason::InvalidKey => "invalid_key",
            DenyReason::Expired => "expired",
            DenyReason::LedgerQueryFailed => "ledger_query_failed",
            DenyReason::CacheCorrupted => "cache_corrupted",
            DenyReason::CacheUnavailable => "cache_unavailable",
            DenyReason::Cancelled => "cancelled",
        }
    }

    /// Get the HTTP status code for this reason.
    pub fn status_code(&self) -> StatusCode {
        match self {
            DenyReason::MissingIdentity => StatusCode::UNAUTHORIZED,
            DenyReason::InvalidKey => StatusCode::FORBIDDEN,
            DenyReason::Expired => StatusCode::PAYMENT_REQUIRED,
            DenyReason::LedgerQueryFailed
            | DenyReason::CacheCorrupted
            | DenyReason::CacheUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
            DenyReason::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Whether the denial is the caller's doing rather than an outage.
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

impl IntoResponse for DenyReason {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(DenyBody {
            error: self.to_string(),
            error_code: self.error_code().to_string(),
        });
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn missing_identity_returns_401() {
        let response = DenyReason::MissingIdentity.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(body["error_code"], "missing_identity");
    }

    #[test]
    fn denial_and_outage_never_share_a_status() {
        let denials = [
            DenyReason::MissingIdentity,
            DenyReason::InvalidKey,
            DenyReason::Expired,
        ];
        let outages = [
            DenyReason::LedgerQueryFailed,
            DenyReason::CacheCorrupted,
            DenyReason::CacheUnavailable,
            DenyReason::Cancelled,
        ];

        for denial in &denials {
            assert!(denial.is_client_error());
            for outage in &outages {
                assert_ne!(denial.status_code(), outage.status_code());
            }
        }
        for outage in &outages {
            assert!(outage.status_code().is_server_error());
        }
    }

    #[test]
    fn denials_have_distinct_statuses() {
        assert_ne!(
            DenyReason::MissingIdentity.status_code(),
            DenyReason::InvalidKey.status_code()
        );
        assert_ne!(
            DenyReason::InvalidKey.status_code(),
            DenyReason::Expired.status_code()
        );
        assert_eq!(DenyReason::Expired.status_code(), StatusCode::PAYMENT_REQUIRED);
    }
}
