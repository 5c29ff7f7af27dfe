//! API Handlers
//!
//! HTTP request handlers for each admin endpoint. Values are arbitrary JSON.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::Value;
use tracing::info;

use crate::cache::{LayerBackend, SharedStore};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::layered::{CacheMetrics, GetOptions, Orchestrator, L1, L2, L3};
use crate::models::{
    DeleteResponse, GetResponse, HealthResponse, InvalidateResponse, LayerQuery,
    MessageResponse, SetRequest, SetResponse,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<Orchestrator<Value>>,
}

impl AppState {
    pub fn new(cache: Orchestrator<Value>) -> Self {
        Self {
            cache: Arc::new(cache),
        }
    }

    /// Builds the L1/L2/L3 stack with the default routing table.
    ///
    /// Each layer starts its own expiry sweep, so this must run inside a
    /// tokio runtime.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let cache = Orchestrator::with_default_patterns()?;
        let layers = [
            (L1, config.l1_max_memory, 1),
            (L2, config.l2_max_memory, 2),
            (L3, config.l3_max_memory, 3),
        ];

        for (name, max_memory, priority) in layers {
            let store: Arc<dyn LayerBackend<Value>> = Arc::new(SharedStore::with_sweeper(
                config.store_config(max_memory),
                config.sweep_interval(),
            ));
            cache.add_layer(name, store, priority, true).await?;
        }

        Ok(Self::new(cache))
    }
}

/// Handler for PUT /set
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let opts = req.options();
    state.cache.set(&req.key, req.value, &opts).await?;

    Ok(Json(SetResponse::new(req.key)))
}

/// Handler for GET /get/:key
///
/// `?layer=` names the layer to probe first.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<LayerQuery>,
) -> Result<Json<GetResponse>> {
    let opts = GetOptions {
        preferred_layer: query.layer,
    };
    let value = state
        .cache
        .get(&key, &opts)
        .await
        .ok_or_else(|| CacheError::NotFound(key.clone()))?;

    Ok(Json(GetResponse::new(key, value)))
}

/// Handler for DELETE /del/:key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    if !state.cache.delete(&key).await? {
        return Err(CacheError::NotFound(key));
    }

    Ok(Json(DeleteResponse::new(key)))
}

/// Handler for DELETE /tags/:tag
pub async fn invalidate_tag_handler(
    State(state): State<AppState>,
    Path(tag): Path<String>,
) -> Result<Json<InvalidateResponse>> {
    let removed = state.cache.invalidate_by_tag(&tag).await?;
    Ok(Json(InvalidateResponse { removed }))
}

/// Handler for DELETE /patterns/:name
pub async fn invalidate_pattern_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<InvalidateResponse>> {
    let removed = state.cache.invalidate_by_pattern(&name).await?;
    Ok(Json(InvalidateResponse { removed }))
}

/// Handler for POST /clear
///
/// Without `?layer=` every layer and all metrics are cleared.
pub async fn clear_handler(
    State(state): State<AppState>,
    Query(query): Query<LayerQuery>,
) -> Result<Json<MessageResponse>> {
    state.cache.clear(query.layer.as_deref()).await?;

    let message = match query.layer {
        Some(layer) => format!("Layer '{}' cleared", layer),
        None => "All layers cleared".to_string(),
    };
    info!(%message, "Admin clear");
    Ok(Json(MessageResponse::new(message)))
}

/// Handler for POST /layers/:name/enable
pub async fn enable_layer_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<MessageResponse>> {
    state.cache.enable_layer(&name).await?;
    Ok(Json(MessageResponse::new(format!("Layer '{}' enabled", name))))
}

/// Handler for POST /layers/:name/disable
pub async fn disable_layer_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<MessageResponse>> {
    state.cache.disable_layer(&name).await?;
    Ok(Json(MessageResponse::new(format!("Layer '{}' disabled", name))))
}

/// Handler for GET /metrics
pub async fn metrics_handler(State(state): State<AppState>) -> Json<CacheMetrics> {
    Json(state.cache.get_metrics().await)
}

/// Handler for GET /health
///
/// Always 200; the body's `status` tells whether every layer probe passed.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::new(state.cache.health_check().await))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn test_state() -> AppState {
        AppState::from_config(&Config::default()).await.unwrap()
    }

    fn set_request(value: Value) -> SetRequest {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn test_set_and_get_handler() {
        let state = test_state().await;

        let req = set_request(json!({"key": "user:1", "value": {"name": "Ada"}}));
        let result = set_handler(State(state.clone()), Json(req)).await;
        assert!(result.is_ok());

        let response = get_handler(
            State(state.clone()),
            Path("user:1".to_string()),
            Query(LayerQuery::default()),
        )
        .await
        .unwrap();
        assert_eq!(response.value, json!({"name": "Ada"}));
    }

    #[tokio::test]
    async fn test_get_nonexistent_key() {
        let state = test_state().await;

        let result = get_handler(
            State(state),
            Path("nonexistent".to_string()),
            Query(LayerQuery::default()),
        )
        .await;
        assert!(matches!(result, Err(CacheError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_handler() {
        let state = test_state().await;

        let req = set_request(json!({"key": "to_delete", "value": 1}));
        set_handler(State(state.clone()), Json(req)).await.unwrap();

        let result = delete_handler(State(state.clone()), Path("to_delete".to_string())).await;
        assert!(result.is_ok());

        // Second delete finds nothing
        let result = delete_handler(State(state), Path("to_delete".to_string())).await;
        assert!(matches!(result, Err(CacheError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_invalidate_tag_handler() {
        let state = test_state().await;
        for key in ["user:1", "route:1"] {
            let req = set_request(json!({"key": key, "value": 1, "tags": ["journey"]}));
            set_handler(State(state.clone()), Json(req)).await.unwrap();
        }

        let response = invalidate_tag_handler(State(state), Path("journey".to_string()))
            .await
            .unwrap();
        assert_eq!(response.removed, 2);
    }

    #[tokio::test]
    async fn test_unknown_layer_toggle() {
        let state = test_state().await;

        let result = disable_layer_handler(State(state), Path("L9".to_string())).await;
        assert!(matches!(result, Err(CacheError::LayerNotFound(_))));
    }

    #[tokio::test]
    async fn test_health_handler() {
        let state = test_state().await;

        let response = health_handler(State(state)).await;
        assert!(response.report.is_healthy());
        assert_eq!(response.report.details.layer_count, 3);
    }

    #[tokio::test]
    async fn test_set_invalid_request() {
        let state = test_state().await;

        let req = set_request(json!({"key": "", "value": 1}));
        let result = set_handler(State(state), Json(req)).await;
        assert!(matches!(result, Err(CacheError::InvalidRequest(_))));
    }
}
