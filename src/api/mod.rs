// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{middleware::from_fn_with_state, routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    gate::{error::DenyBody, require_entitlement, CacheStats, GrantSource},
    state::AppState,
};

pub mod access;
pub mod health;

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/access", get(access::check_access))
        .route_layer(from_fn_with_state(state.clone(), require_entitlement))
        .with_state(state.clone());

    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(state);

    Router::new()
        .nest("/v1", v1_routes)
        .merge(health_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        access::check_access,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            access::AccessResponse,
            GrantSource,
            DenyBody,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse,
            CacheStats
        )
    ),
    tags(
        (name = "Access", description = "Paid-access decisions"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::{DecisionStore, PUB_KEY_HEADER};
    use crate::state::test_support::{identity, payment_for, test_state};
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    fn access_request(pub_key: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri("/v1/access");
        if let Some(key) = pub_key {
            builder = builder.header(PUB_KEY_HEADER, key);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn router_builds_with_all_routes() {
        let (state, _dir) = test_state(&[], &[]);
        let _ = router(state).into_make_service();
    }

    #[tokio::test]
    async fn missing_header_is_401() {
        let (state, _dir) = test_state(&[], &[]);
        let response = router(state).oneshot(access_request(None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["error_code"], "missing_identity");
    }

    #[tokio::test]
    async fn malformed_key_is_403() {
        let (state, _dir) = test_state(&[], &[]);
        let response = router(state)
            .oneshot(access_request(Some("zz-not-hex")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(json_body(response).await["error_code"], "invalid_key");
    }

    #[tokio::test]
    async fn allow_listed_key_is_granted_without_payment() {
        let (state, _dir) = test_state(&["TRUSTED-OPERATOR"], &[]);
        let response = router(state)
            .oneshot(access_request(Some("trusted-operator")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["source"], "allow_list");
    }

    #[tokio::test]
    async fn unpaid_key_is_402() {
        let (state, _dir) = test_state(&[], &[]);
        let response = router(state)
            .oneshot(access_request(Some(&identity(4))))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
        assert_eq!(json_body(response).await["error_code"], "expired");
    }

    #[tokio::test]
    async fn paid_key_is_granted_and_cached() {
        let id = identity(5);
        let (state, _dir) = test_state(&[], &[payment_for(&id, 3)]);
        let app = router(state.clone());

        let response = app
            .clone()
            .oneshot(access_request(Some(&id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["source"], "ledger");
        assert_eq!(body["active_days"], 3);
        assert_eq!(body["seconds_remaining"], 3 * 86_400);

        let cached = state
            .gate
            .cache()
            .store()
            .get(&format!("access:{id}"))
            .await
            .unwrap();
        assert_eq!(cached, Some((3 * 86_400).to_string()));

        let response = app.oneshot(access_request(Some(&id))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["source"], "cache");
    }

    #[tokio::test]
    async fn health_routes_respond() {
        let (state, _dir) = test_state(&[], &[]);
        let app = router(state);

        for uri in ["/health", "/health/live", "/health/ready"] {
            let response = app
                .clone()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK, "{uri}");
        }
    }
}
