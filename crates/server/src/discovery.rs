//! Discovery HTTP surface.
//!
//! Endpoints:
//! - `GET  /api/v1/discovery/offers`          — enriched offers (≤ max_restaurants)
//! - `POST /api/v1/discovery/recommendations` — ranked items + rails, cached by fingerprint
//! - `POST /api/v1/discovery/compare`         — cost breakdown per selection, never cached
//! - `POST /api/v1/assist/chat`               — assist collaborator, degrades to the engine
//!
//! Every response carries a `traceId` (caller-supplied `x-trace-id` or a
//! fresh uuid) and the `strategyVersion` that produced it.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

use plateful_core::config::RankingConfig;
use plateful_core::domain::compare::{CompareOption, CompareSelection};
use plateful_core::errors::{ApplicationError, DomainError, InterfaceError};
use plateful_core::{
    compare_options, compose_rails, enrich_offers, verify_compare_response, verify_offers,
    verify_recommendation_payload, Constraints, Coordinates, Fingerprint, Ranker, RankingRequest,
    RecommendationCache, RecommendationPayload, RestaurantOffer, STRATEGY_VERSION,
};
use plateful_db::DiscoveryStore;

use crate::assist::{complete_with_retry, AssistProvider, AssistReply};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DiscoveryStore>,
    pub cache: Arc<RecommendationCache>,
    pub ranking: Arc<RankingConfig>,
    pub assist: Option<Arc<dyn AssistProvider>>,
    pub assist_max_retries: u32,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/discovery/offers", get(list_offers))
        .route("/api/v1/discovery/recommendations", post(recommend))
        .route("/api/v1/discovery/compare", post(compare))
        .route("/api/v1/assist/chat", post(chat))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OffersResponse {
    trace_id: String,
    strategy_version: String,
    offers: Vec<RestaurantOffer>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RecommendationResponse {
    trace_id: String,
    #[serde(flatten)]
    payload: RecommendationPayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompareRequest {
    selections: Vec<CompareSelection>,
    #[serde(default)]
    location: Option<Coordinates>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompareResponse {
    trace_id: String,
    strategy_version: String,
    options: Vec<CompareOption>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatRequest {
    message: String,
    #[serde(default)]
    location: Option<Coordinates>,
    #[serde(default)]
    constraints: Option<Constraints>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatResponse {
    trace_id: String,
    strategy_version: String,
    reply: Option<String>,
    /// True when the provider could not contribute and the deterministic
    /// engine answered alone.
    degraded: bool,
    #[serde(flatten)]
    payload: RecommendationPayload,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(rename = "traceId")]
    trace_id: String,
}

struct ApiError(InterfaceError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            InterfaceError::BadRequest { message, .. } => {
                (StatusCode::BAD_REQUEST, message.clone())
            }
            InterfaceError::ServiceUnavailable { .. } => {
                (StatusCode::SERVICE_UNAVAILABLE, self.0.user_message().to_owned())
            }
            InterfaceError::Internal { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.0.user_message().to_owned())
            }
        };
        let body = ErrorBody { error: message, trace_id: self.0.trace_id().to_owned() };
        (status, Json(body)).into_response()
    }
}

fn fail(error: ApplicationError, trace_id: &str) -> ApiError {
    warn!(
        event_name = "discovery.request.failed",
        trace_id = %trace_id,
        error = %error,
        "discovery request failed"
    );
    ApiError(error.into_interface(trace_id))
}

fn trace_id_from(headers: &HeaderMap) -> String {
    headers
        .get("x-trace-id")
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Batched fetch + enrichment. One round of store calls per request, never
/// per restaurant; any store failure aborts the whole request.
async fn load_offers(state: &AppState) -> Result<Vec<RestaurantOffer>, ApplicationError> {
    let now = Utc::now();
    let bundles = state
        .store
        .active_restaurants(state.ranking.max_restaurants)
        .await
        .map_err(ApplicationError::from)?;
    let branch_ids: Vec<String> = bundles
        .iter()
        .flat_map(|bundle| bundle.branches.iter().map(|branch| branch.id.clone()))
        .collect();
    let deals = state
        .store
        .deals_for_branches(&branch_ids, now)
        .await
        .map_err(ApplicationError::from)?;
    let fee_rules = state
        .store
        .fee_rules_for_branches(&branch_ids)
        .await
        .map_err(ApplicationError::from)?;
    Ok(enrich_offers(&bundles, &deals, &fee_rules, now))
}

async fn load_offers_by_ids(
    state: &AppState,
    ids: &[String],
) -> Result<Vec<RestaurantOffer>, ApplicationError> {
    let now = Utc::now();
    let bundles =
        state.store.restaurants_by_ids(ids).await.map_err(ApplicationError::from)?;
    let branch_ids: Vec<String> = bundles
        .iter()
        .flat_map(|bundle| bundle.branches.iter().map(|branch| branch.id.clone()))
        .collect();
    let deals = state
        .store
        .deals_for_branches(&branch_ids, now)
        .await
        .map_err(ApplicationError::from)?;
    let fee_rules = state
        .store
        .fee_rules_for_branches(&branch_ids)
        .await
        .map_err(ApplicationError::from)?;
    Ok(enrich_offers(&bundles, &deals, &fee_rules, now))
}

async fn list_offers(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<OffersResponse>, ApiError> {
    let trace_id = trace_id_from(&headers);
    let offers = load_offers(&state).await.map_err(|error| fail(error, &trace_id))?;
    verify_offers(&offers).map_err(|violation| {
        fail(
            DomainError::InvariantViolation(violation.to_string()).into(),
            &trace_id,
        )
    })?;
    info!(
        event_name = "discovery.offers.served",
        trace_id = %trace_id,
        offers = offers.len(),
        "served enriched offers"
    );
    Ok(Json(OffersResponse {
        trace_id,
        strategy_version: STRATEGY_VERSION.to_owned(),
        offers,
    }))
}

async fn recommend(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<RankingRequest>,
) -> Result<Json<RecommendationResponse>, ApiError> {
    let trace_id = trace_id_from(&headers);
    request.validate().map_err(|error| fail(error, &trace_id))?;

    let limit = request.limit.unwrap_or(state.ranking.default_limit);
    let fingerprint = Fingerprint::compute(
        &request.location,
        &request.constraints,
        &request.intent,
        limit,
    );
    if let Some(payload) = state.cache.get(&fingerprint) {
        info!(
            event_name = "discovery.recommendations.served",
            trace_id = %trace_id,
            cache = "hit",
            items = payload.items.len(),
            "served recommendations from cache"
        );
        return Ok(Json(RecommendationResponse { trace_id, payload }));
    }

    let payload = compute_recommendations(&state, &request).await.map_err(|error| {
        fail(error, &trace_id)
    })?;
    verify_recommendation_payload(&trace_id, &payload).map_err(|violation| {
        fail(
            DomainError::InvariantViolation(violation.to_string()).into(),
            &trace_id,
        )
    })?;
    state.cache.insert(&fingerprint, payload.clone());
    info!(
        event_name = "discovery.recommendations.served",
        trace_id = %trace_id,
        cache = "miss",
        items = payload.items.len(),
        "served freshly ranked recommendations"
    );
    Ok(Json(RecommendationResponse { trace_id, payload }))
}

async fn compute_recommendations(
    state: &AppState,
    request: &RankingRequest,
) -> Result<RecommendationPayload, ApplicationError> {
    let offers = load_offers(state).await?;
    let ranker = Ranker::from_config(&state.ranking);
    let items = ranker.rank(&offers, request);
    let rails = compose_rails(&items);
    Ok(RecommendationPayload {
        strategy_version: STRATEGY_VERSION.to_owned(),
        items,
        rails,
    })
}

async fn compare(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CompareRequest>,
) -> Result<Json<CompareResponse>, ApiError> {
    let trace_id = trace_id_from(&headers);
    if let Some(location) = &request.location {
        location.validate().map_err(|error| fail(error, &trace_id))?;
    }

    let mut ids: Vec<String> = Vec::new();
    for selection in &request.selections {
        if !ids.contains(&selection.restaurant_id) {
            ids.push(selection.restaurant_id.clone());
        }
    }
    let offers = load_offers_by_ids(&state, &ids)
        .await
        .map_err(|error| fail(error, &trace_id))?;
    let options = compare_options(&offers, &request.selections)
        .map_err(|error| fail(error, &trace_id))?;
    verify_compare_response(&options, request.selections.len()).map_err(|violation| {
        fail(
            DomainError::InvariantViolation(violation.to_string()).into(),
            &trace_id,
        )
    })?;
    info!(
        event_name = "discovery.compare.served",
        trace_id = %trace_id,
        options = options.len(),
        "served price comparison"
    );
    Ok(Json(CompareResponse {
        trace_id,
        strategy_version: STRATEGY_VERSION.to_owned(),
        options,
    }))
}

async fn chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let trace_id = trace_id_from(&headers);
    if request.message.trim().is_empty() {
        return Err(fail(
            ApplicationError::InvalidInput("message must not be empty".to_owned()),
            &trace_id,
        ));
    }
    if let Some(location) = &request.location {
        location.validate().map_err(|error| fail(error, &trace_id))?;
    }
    if let Some(constraints) = &request.constraints {
        constraints.validate().map_err(|error| fail(error, &trace_id))?;
    }

    let (reply, degraded) = match &state.assist {
        Some(provider) => {
            let prompt = format!(
                "You help diners pick a restaurant. Reply as JSON with `reply` and an \
                 optional `intentHint` (cheap|fast|healthy|family_combo|promotions|\
                 best_rated). User message: {}",
                request.message
            );
            match complete_with_retry(provider.as_ref(), &prompt, state.assist_max_retries)
                .await
            {
                Ok(raw) => (AssistReply::parse(&raw), false),
                Err(error) => {
                    warn!(
                        event_name = "assist.degraded",
                        trace_id = %trace_id,
                        error = %error,
                        "assist provider failed, serving deterministic output"
                    );
                    (AssistReply::default(), true)
                }
            }
        }
        None => (AssistReply::default(), true),
    };

    let ranking_request = RankingRequest {
        intent: reply.intent(),
        location: request.location,
        constraints: request.constraints,
        limit: None,
    };
    let payload = compute_recommendations(&state, &ranking_request)
        .await
        .map_err(|error| fail(error, &trace_id))?;
    verify_recommendation_payload(&trace_id, &payload).map_err(|violation| {
        fail(
            DomainError::InvariantViolation(violation.to_string()).into(),
            &trace_id,
        )
    })?;

    Ok(Json(ChatResponse {
        trace_id,
        strategy_version: STRATEGY_VERSION.to_owned(),
        reply: reply.reply,
        degraded,
        payload,
    }))
}
