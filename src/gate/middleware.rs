// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Entitlement middleware for Axum.
//!
//! Apply to any router subtree that requires paid access:
//!
//! ```rust,ignore
//! let protected = Router::new()
//!     .route("/content", get(handler))
//!     .route_layer(axum::middleware::from_fn_with_state(
//!         state.clone(),
//!         require_entitlement,
//!     ));
//! ```
//!
//! Granted requests carry the [`Grant`] in their extensions.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

use super::decider::{Decision, Grant};
use super::error::DenyReason;
use crate::state::AppState;

/// Header carrying the caller's hex-encoded public key.
pub const PUB_KEY_HEADER: &str = "x-pub-key";

/// Authorise a request against the entitlement gate.
pub async fn require_entitlement(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let identity = match request.headers().get(PUB_KEY_HEADER) {
        None => None,
        Some(value) => match value.to_str() {
            Ok(text) => Some(text.to_string()),
            Err(_) => return DenyReason::InvalidKey.into_response(),
        },
    };

    let cancel = state.shutdown.child_token();
    let decision = match tokio::time::timeout(
        state.decision_timeout,
        state.gate.decide(identity.as_deref(), &cancel),
    )
    .await
    {
        Ok(decision) => decision,
        Err(_) => {
            cancel.cancel();
            warn!(timeout = ?state.decision_timeout, "Access decision timed out");
            Decision::Deny(DenyReason::Cancelled)
        }
    };

    match decision {
        Decision::Grant(grant) => {
            request.extensions_mut().insert::<Grant>(grant);
            next.run(request).await
        }
        Decision::Deny(reason) => {
            if reason.is_client_error() {
                debug!(reason = reason.error_code(), "Access denied");
            } else {
                warn!(reason = reason.error_code(), "Access decision failed");
            }
            reason.into_response()
        }
    }
}
