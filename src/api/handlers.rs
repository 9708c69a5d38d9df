//! API Handlers
//!
//! HTTP request handlers for each cache server endpoint.

use std::time::Duration;

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::Value;

use crate::cache::ExpiringCache;
use crate::config::Config;
use crate::error::{ApiError, Result};
use crate::models::{
    AliasRequest, AliasResponse, DeleteResponse, EntryResponse, HealthResponse, InsertRequest,
    InsertResponse, ResendResponse, StatsResponse,
};
use crate::schedule::Scheduler;
use crate::throttle::{ResendDecision, ResendThrottle};

/// Application state shared across all handlers.
///
/// The cache and throttle lock internally and share one scheduler.
#[derive(Clone)]
pub struct AppState {
    pub scheduler: Scheduler,
    pub cache: ExpiringCache<Value>,
    pub throttle: ResendThrottle,
}

impl AppState {
    pub fn new(scheduler: Scheduler, cache: ExpiringCache<Value>, throttle: ResendThrottle) -> Self {
        Self {
            scheduler,
            cache,
            throttle,
        }
    }

    /// Builds the cache and throttle from configuration on `scheduler`.
    pub fn from_config(config: &Config, scheduler: Scheduler) -> Self {
        let cache = ExpiringCache::new(scheduler.clone(), config.default_expiration());
        let throttle =
            ResendThrottle::new(scheduler.clone(), config.resend_limit, config.resend_window());
        Self::new(scheduler, cache, throttle)
    }

    /// Teardown for graceful shutdown: caches first, then the scheduler.
    pub fn close(&self) {
        self.cache.close();
        self.throttle.close();
        self.scheduler.shutdown();
    }
}

/// Handler for PUT /entries
pub async fn insert_handler(
    State(state): State<AppState>,
    Json(req): Json<InsertRequest>,
) -> Result<Json<InsertResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(ApiError::InvalidRequest(error_msg));
    }
    let stored = state
        .cache
        .insert(req.id.clone(), req.value, req.ttl.map(Duration::from_secs));
    if !stored {
        return Err(ApiError::Internal(format!(
            "Id '{}' not stored, cache is shutting down",
            req.id
        )));
    }
    let expires_at = state.cache.expiration_time(&req.id);

    Ok(Json(InsertResponse::new(req.id, expires_at)))
}

/// Handler for GET /entries/:id
///
/// Accepts a primary id or an alias.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<EntryResponse>> {
    let entry = state
        .cache
        .get_entry(&id)
        .ok_or_else(|| ApiError::NotFound(id.clone()))?;

    Ok(Json(EntryResponse::from_entry(id, entry)))
}

/// Handler for DELETE /entries/:id
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>> {
    if !state.cache.delete(&id) {
        return Err(ApiError::NotFound(id));
    }

    Ok(Json(DeleteResponse::new(id)))
}

/// Handler for PUT /entries/:id/aliases
pub async fn alias_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<AliasRequest>,
) -> Result<Json<AliasResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(ApiError::InvalidRequest(error_msg));
    }
    if !state.cache.add_alias(&id, req.alias.clone()) {
        return Err(ApiError::NotFound(id));
    }

    Ok(Json(AliasResponse::new(id, req.alias)))
}

/// Handler for POST /verification/:token/resend
///
/// Rejects with 429 and a `Retry-In` header once the resend limit is spent.
pub async fn resend_handler(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<ResendResponse>> {
    match state.throttle.register(&token) {
        ResendDecision::Allowed { resend_count } => {
            Ok(Json(ResendResponse::new(
                token,
                resend_count,
                state.throttle.limit(),
            )))
        }
        ResendDecision::Throttled { retry_in } => Err(ApiError::TooManyRequests {
            retry_in: retry_in.as_secs(),
        }),
    }
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let stats = state.cache.stats();
    Json(StatsResponse::new(&stats, state.scheduler.job_count()))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_state() -> AppState {
        AppState::from_config(&Config::default(), Scheduler::new())
    }

    #[tokio::test]
    async fn test_insert_and_get_handler() {
        let state = test_state();

        let req = InsertRequest {
            id: "cfg".to_string(),
            value: json!({"limit": 5}),
            ttl: None,
        };
        let response = insert_handler(State(state.clone()), Json(req)).await.unwrap();
        assert!(response.expires_at.is_some());

        let response = get_handler(State(state), Path("cfg".to_string()))
            .await
            .unwrap();
        assert_eq!(response.value, json!({"limit": 5}));
    }

    #[tokio::test]
    async fn test_insert_zero_ttl_never_expires() {
        let state = test_state();

        let req = InsertRequest {
            id: "pinned".to_string(),
            value: json!(true),
            ttl: Some(0),
        };
        let response = insert_handler(State(state), Json(req)).await.unwrap();
        assert!(response.expires_at.is_none());
    }

    #[tokio::test]
    async fn test_get_nonexistent_id() {
        let state = test_state();

        let result = get_handler(State(state), Path("nonexistent".to_string())).await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_alias_and_delete_handlers() {
        let state = test_state();
        state.cache.insert("token_a", json!({"email": "alice@example.com"}), None);

        let req = AliasRequest {
            alias: "alice@example.com".to_string(),
        };
        alias_handler(State(state.clone()), Path("token_a".to_string()), Json(req))
            .await
            .unwrap();
        let response = get_handler(State(state.clone()), Path("alice@example.com".to_string()))
            .await
            .unwrap();
        assert_eq!(response.value["email"], "alice@example.com");

        delete_handler(State(state.clone()), Path("token_a".to_string()))
            .await
            .unwrap();
        let result = get_handler(State(state), Path("alice@example.com".to_string())).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_alias_missing_primary() {
        let state = test_state();

        let req = AliasRequest {
            alias: "ghost@example.com".to_string(),
        };
        let result = alias_handler(State(state), Path("ghost".to_string()), Json(req)).await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_resend_handler_throttles() {
        let state = test_state();

        for expected in 1..=3 {
            let response = resend_handler(State(state.clone()), Path("token_a".to_string()))
                .await
                .unwrap();
            assert_eq!(response.resend_count, expected);
            assert_eq!(response.remaining, 3 - expected);
        }
        let result = resend_handler(State(state), Path("token_a".to_string())).await;
        assert!(matches!(result, Err(ApiError::TooManyRequests { retry_in }) if retry_in > 0));
    }

    #[tokio::test]
    async fn test_insert_after_close_rejected() {
        let state = test_state();
        state.close();

        let req = InsertRequest {
            id: "late".to_string(),
            value: json!(1),
            ttl: None,
        };
        let result = insert_handler(State(state), Json(req)).await;
        assert!(matches!(result, Err(ApiError::Internal(_))));
    }

    #[tokio::test]
    async fn test_stats_handler() {
        let state = test_state();
        state.cache.insert("cfg", json!(1), None);

        let response = stats_handler(State(state)).await;
        assert_eq!(response.total_entries, 1);
        assert_eq!(response.scheduled_jobs, 1);
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await;
        assert_eq!(response.status, "healthy");
    }
}
