//! Same-origin HTTP endpoints
//!
//! - `GET /api/blockhash?network=test|production` passthrough used for the
//!   proactive blockhash refresh
//! - `GET /health`
//! - `GET /metrics` (Prometheus text format)

use crate::metrics::metrics;
use crate::rpc_manager::LedgerRpc;
use crate::types::Network;
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;

/// Shared handler state: one ledger client per network
#[derive(Clone)]
pub struct AppState {
    pub default_network: Network,
    pub test_rpc: Arc<dyn LedgerRpc>,
    pub production_rpc: Arc<dyn LedgerRpc>,
}

impl AppState {
    fn rpc(&self, network: Network) -> &Arc<dyn LedgerRpc> {
        match network {
            Network::Test => &self.test_rpc,
            Network::Production => &self.production_rpc,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BlockhashQuery {
    pub network: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BlockhashResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blockhash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_valid_block_height: Option<u64>,
    pub network: String,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BlockhashResponse {
    fn failure(network: String, error: String) -> Self {
        Self {
            success: false,
            blockhash: None,
            last_valid_block_height: None,
            network,
            timestamp: chrono::Utc::now().to_rfc3339(),
            error: Some(error),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/blockhash", get(latest_blockhash))
        .route("/health", get(health))
        .route("/metrics", get(render_metrics))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

async fn latest_blockhash(
    State(state): State<AppState>,
    Query(query): Query<BlockhashQuery>,
) -> (StatusCode, Json<BlockhashResponse>) {
    let network = match query.network.as_deref() {
        None => state.default_network,
        Some(raw) => match raw.parse::<Network>() {
            Ok(network) => network,
            Err(_) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(BlockhashResponse::failure(
                        raw.to_string(),
                        format!("Unknown network '{}'; expected test or production", raw),
                    )),
                )
            }
        },
    };

    match state.rpc(network).get_latest_blockhash().await {
        Ok(latest) => (
            StatusCode::OK,
            Json(BlockhashResponse {
                success: true,
                blockhash: Some(latest.blockhash.to_string()),
                last_valid_block_height: Some(latest.last_valid_block_height),
                network: network.as_str().to_string(),
                timestamp: chrono::Utc::now().to_rfc3339(),
                error: None,
            }),
        ),
        Err(e) => {
            warn!(network = %network, error = %e, "Blockhash fetch failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(BlockhashResponse::failure(
                    network.as_str().to_string(),
                    e.to_string(),
                )),
            )
        }
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn render_metrics() -> impl IntoResponse {
    match metrics().render() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(header::CONTENT_TYPE, "text/plain")],
            e.to_string(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockLedgerRpc;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn state() -> (AppState, Arc<MockLedgerRpc>, Arc<MockLedgerRpc>) {
        let test = Arc::new(MockLedgerRpc::new());
        let production = Arc::new(MockLedgerRpc::new());
        let state = AppState {
            default_network: Network::Test,
            test_rpc: test.clone(),
            production_rpc: production.clone(),
        };
        (state, test, production)
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, Vec<u8>) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    #[tokio::test]
    async fn test_blockhash_routes_by_network() {
        let (state, test, production) = state();

        let (status, body) = get(router(state.clone()), "/api/blockhash?network=production").await;
        assert_eq!(status, StatusCode::OK);
        let parsed: BlockhashResponse = serde_json::from_slice(&body).unwrap();
        assert!(parsed.success);
        assert_eq!(parsed.network, "production");
        assert!(parsed.blockhash.is_some());
        assert_eq!(parsed.last_valid_block_height, Some(1_000));
        assert_eq!(production.blockhash_query_count(), 1);
        assert_eq!(test.blockhash_query_count(), 0);

        // default network
        let (status, _) = get(router(state), "/api/blockhash").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(test.blockhash_query_count(), 1);
    }

    #[tokio::test]
    async fn test_blockhash_accepts_cluster_aliases() {
        let (state, _, production) = state();
        let (status, _) = get(router(state), "/api/blockhash?network=mainnet").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(production.blockhash_query_count(), 1);
    }

    #[tokio::test]
    async fn test_blockhash_bad_network() {
        let (state, test, _) = state();
        let (status, body) = get(router(state), "/api/blockhash?network=moon").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["success"], false);
        assert!(parsed["error"].as_str().unwrap().contains("moon"));
        assert_eq!(test.blockhash_query_count(), 0);
    }

    #[tokio::test]
    async fn test_blockhash_rpc_failure() {
        let (state, test, _) = state();
        test.fail_blockhash_with("connection refused");
        let (status, body) = get(router(state), "/api/blockhash?network=test").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["success"], false);
        assert_eq!(parsed["network"], "test");
        assert!(parsed.get("blockhash").is_none());
        assert!(parsed["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_health_and_metrics() {
        let (state, _, _) = state();
        let (status, body) = get(router(state.clone()), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, br#"{"status":"ok"}"#.to_vec());

        metrics().transfers_total.inc();
        let (status, body) = get(router(state), "/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert!(String::from_utf8(body).unwrap().contains("transfers_total"));
    }
}
